// ⚠️ Error taxonomy for the parking core
//
// Every variant is recoverable: callers report it as a message and carry on.
// Validation runs before any write, so an Err never leaves half-applied state.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParkingError {
    /// Malformed or missing input (empty plate, empty rate name, no rate selected)
    #[error("validation failed: {0}")]
    Validation(String),

    /// A record required by the operation does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The plate already has an open (parked) transaction
    #[error("vehicle {plate} is already registered as parked")]
    DuplicateVehicle { plate: String },

    /// Entries can only be registered while a shift is open
    #[error("the shift must be opened before registering entries")]
    ShiftClosed,

    /// Persistence collaborator failure
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl ParkingError {
    pub fn validation(message: impl Into<String>) -> Self {
        ParkingError::Validation(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        ParkingError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ParkingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_user_facing() {
        let err = ParkingError::not_found("rate", 42);
        assert_eq!(err.to_string(), "rate not found: 42");

        let err = ParkingError::DuplicateVehicle {
            plate: "ABC123".to_string(),
        };
        assert!(err.to_string().contains("ABC123"));

        let err = ParkingError::validation("plate is required");
        assert_eq!(err.to_string(), "validation failed: plate is required");
    }

    #[test]
    fn test_storage_error_is_transparent() {
        let err: ParkingError = anyhow::anyhow!("disk full").into();
        assert_eq!(err.to_string(), "disk full");
        assert!(matches!(err, ParkingError::Storage(_)));
    }
}
