use thiserror::Error;

use super::session::{Action, Role};
use super::status::LineStatus;

/// Client-side rule violations. Raised before any network call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Requested quantity for {product_code} ({requested}) exceeds available quantity ({available})")]
    QuantityExceedsAvailability {
        product_code: String,
        requested: u32,
        available: u32,
    },
    #[error("Cannot move a line item from {from} to {to}")]
    InvalidTransition { from: LineStatus, to: LineStatus },
    #[error("Quantity can only be edited while Pending (current status: {0})")]
    EditNotAllowed(LineStatus),
    #[error("Role {role} may not {action}")]
    Forbidden { role: Role, action: Action },
    #[error("Unknown product: {0}")]
    UnknownProduct(String),
    #[error("No batch entry at index {0}")]
    IndexOutOfRange(usize),
    #[error("The request list is empty")]
    EmptyBatch,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
