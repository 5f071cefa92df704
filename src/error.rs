//! Error taxonomy shared by the record, store, engine and contract layers

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("{kind} {key} already exists")]
    AlreadyExists { kind: String, key: String },
    #[error("{kind} {key} does not exist")]
    NotFound { kind: String, key: String },
    #[error("{key} is not owned by {asserted}. Current owner = {}", .owner.as_deref().unwrap_or("<unset>"))]
    OwnershipMismatch {
        key: String,
        owner: Option<String>,
        asserted: String,
    },
    #[error("Cannot apply '{operation}' to {key}. Current state = {current_state}")]
    InvalidStateTransition {
        key: String,
        operation: String,
        current_state: String,
    },
    #[error("{key} already redeemed. Current state = {state}")]
    AlreadyRedeemed { key: String, state: String },
    #[error("Failed to decode {kind} record: {reason}")]
    Deserialization { kind: String, reason: String },
    #[error("Failed to encode record: {0}")]
    Serialization(String),
    #[error("World state unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<sled::Error> for LedgerError {
    fn from(value: sled::Error) -> Self {
        LedgerError::StoreUnavailable(value.to_string())
    }
}
