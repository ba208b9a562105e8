//! Unified error types for the rental core.
//!
//! Precondition failures (wrong status, wrong actor, duplicate rating) are not
//! errors; the lifecycle operations report them as `false` / `None`.

use chrono::NaiveDate;
use thiserror::Error;

/// All errors surfaced by the rental core.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input such as an inverted or past date range
    #[error("Validation error: {message}")]
    Validation {
        /// What was wrong with the input
        message: String,
    },

    /// Rating score outside 1.0..=5.0
    #[error("Invalid rating score: {score} (must be between 1 and 5)")]
    InvalidScore {
        /// The rejected score
        score: f64,
    },

    /// The requested range overlaps an existing reservation for the car
    #[error("Car {car_id} is already booked between {start} and {end}")]
    DateConflict {
        /// Car being booked
        car_id: String,
        /// Requested first day
        start: NaiveDate,
        /// Requested last day
        end: NaiveDate,
    },

    /// No car with this id
    #[error("Car not found: {id}")]
    CarNotFound {
        /// Missing car id
        id: String,
    },

    /// No user with this id
    #[error("User not found: {id}")]
    UserNotFound {
        /// Missing user id
        id: String,
    },

    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },

    /// Underlying store failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl Error {
    /// Message suitable for showing to an end user.
    ///
    /// Validation and conflict errors carry their own wording; storage and
    /// configuration failures collapse into a generic message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { message } => message.clone(),
            Self::InvalidScore { .. } => "Rating must be between 1 and 5".to_string(),
            Self::DateConflict { .. } => {
                "These dates are already booked. Please select different dates.".to_string()
            }
            Self::CarNotFound { .. } => "Car not found".to_string(),
            Self::UserNotFound { .. } => "User not found".to_string(),
            Self::Config { .. } | Self::Database(_) => {
                "Something went wrong. Please try again.".to_string()
            }
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_hides_storage_details() {
        let err = Error::Database(sea_orm::DbErr::Custom("disk I/O error".to_string()));
        assert!(!err.user_message().contains("disk"));

        let err = Error::validation("Start date cannot be in the past");
        assert_eq!(err.user_message(), "Start date cannot be in the past");
    }
}
