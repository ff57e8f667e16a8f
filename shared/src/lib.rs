//! Shared types and rules for the injera back-office
//!
//! Domain models, the low-stock policy, threshold resolution and order
//! pricing rules. Nothing in this crate performs I/O.

pub mod inventory;
pub mod models;
pub mod ordering;
pub mod types;
pub mod validation;

pub use inventory::*;
pub use models::*;
pub use ordering::*;
pub use types::*;
pub use validation::*;
