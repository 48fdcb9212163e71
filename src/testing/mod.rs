//! Testing utilities and mock implementations
//!
//! Mocks for running the routing workflow without a completion service.

pub mod mocks;

pub use mocks::*;
