//! Mock fulfillment data: customers, stock, shipping lanes, zones, orders

pub mod model;
pub mod repository;

pub use model::*;
pub use repository::{DataError, DataTables, InMemoryRepository, IntegrityViolation, Repository};
