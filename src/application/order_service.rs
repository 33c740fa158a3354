use crate::domain::errors::DomainError;
use crate::domain::order::{FindResult, NewOrder, Order, Page};
use crate::domain::ports::OrderRepository;

pub struct OrderService<R> {
    repo: R,
}

impl<R: OrderRepository> OrderService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_order(&self, new_order: NewOrder) -> Result<Order, DomainError> {
        self.repo.create(new_order)
    }

    pub fn list_orders(&self, page: Page) -> Result<FindResult, DomainError> {
        self.repo.list(page)
    }

    pub fn get_order(&self, order_id: u64) -> Result<Order, DomainError> {
        self.repo.get_by_id(order_id)
    }

    /// Replaces the customer and line items of an existing order.
    ///
    /// The stored `order_id` and `created_at` are kept. A concurrent delete
    /// between the read and the write surfaces as [`DomainError::NotExist`].
    pub fn update_order(&self, order_id: u64, changes: NewOrder) -> Result<Order, DomainError> {
        let existing = self.repo.get_by_id(order_id)?;
        let updated = Order {
            order_id: existing.order_id,
            customer_id: changes.customer_id,
            line_items: changes.line_items,
            created_at: existing.created_at,
        };
        self.repo.update_by_id(&updated)?;
        Ok(updated)
    }

    pub fn delete_order(&self, order_id: u64) -> Result<(), DomainError> {
        self.repo.delete_by_id(order_id)
    }

    pub fn health(&self) -> Result<(), DomainError> {
        self.repo.health()
    }
}

/// Service over a type-erased repository, as registered with the HTTP server.
pub type DynOrderService = OrderService<Box<dyn OrderRepository>>;
