pub mod keys;
pub mod models;
pub mod order_repo;
pub mod store;
