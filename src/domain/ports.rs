use super::errors::DomainError;
use super::order::{FindResult, NewOrder, Order, Page};

pub trait OrderRepository: Send + Sync + 'static {
    fn create(&self, new_order: NewOrder) -> Result<Order, DomainError>;
    fn list(&self, page: Page) -> Result<FindResult, DomainError>;
    fn get_by_id(&self, order_id: u64) -> Result<Order, DomainError>;
    fn update_by_id(&self, order: &Order) -> Result<(), DomainError>;
    fn delete_by_id(&self, order_id: u64) -> Result<(), DomainError>;
    fn health(&self) -> Result<(), DomainError>;
}

impl<R: OrderRepository + ?Sized> OrderRepository for Box<R> {
    fn create(&self, new_order: NewOrder) -> Result<Order, DomainError> {
        (**self).create(new_order)
    }

    fn list(&self, page: Page) -> Result<FindResult, DomainError> {
        (**self).list(page)
    }

    fn get_by_id(&self, order_id: u64) -> Result<Order, DomainError> {
        (**self).get_by_id(order_id)
    }

    fn update_by_id(&self, order: &Order) -> Result<(), DomainError> {
        (**self).update_by_id(order)
    }

    fn delete_by_id(&self, order_id: u64) -> Result<(), DomainError> {
        (**self).delete_by_id(order_id)
    }

    fn health(&self) -> Result<(), DomainError> {
        (**self).health()
    }
}
