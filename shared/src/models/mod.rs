//! Domain models for the injera back-office

mod activity;
mod order;
mod settings;
mod stock;
mod user;

pub use activity::*;
pub use order::*;
pub use settings::*;
pub use stock::*;
pub use user::*;

/// A string that does not name any variant of a closed enum
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
