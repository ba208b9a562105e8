//! Reservation entity - A renter's booking of one car for an inclusive date range.
//!
//! Rows are only mutated through the lifecycle operations in
//! [`crate::core::reservation`]. `is_paid` is independent of `status` but only
//! meaningful once the reservation is `Approved`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Reservation lifecycle states.
///
/// `Pending -> Approved | Rejected | Cancelled`, `Approved -> Cancelled | Completed`.
/// `Rejected`, `Cancelled` and `Completed` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum ReservationStatus {
    /// Waiting for the owner's answer
    #[sea_orm(string_value = "PENDING")]
    Pending,
    /// Accepted by the owner
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    /// Declined by the owner
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
    /// Withdrawn by the renter
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
    /// Rental finished; unlocks rating
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
}

impl ReservationStatus {
    /// True for states with no outgoing transition.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Cancelled | Self::Completed)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved | Self::Rejected | Self::Cancelled)
                | (Self::Approved, Self::Cancelled | Self::Completed)
        )
    }
}

/// Reservation database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reservations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub car_id: String,
    /// User who requested the booking
    pub renter_id: String,
    /// First rented day (inclusive)
    pub start_date: Date,
    /// Last rented day (inclusive)
    pub end_date: Date,
    /// `price_per_day * days`, fixed at creation
    pub total_price: f64,
    pub status: ReservationStatus,
    pub is_paid: bool,
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Reservation and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::car::Entity",
        from = "Column::CarId",
        to = "super::car::Column::Id"
    )]
    Car,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::RenterId",
        to = "super::user::Column::Id"
    )]
    Renter,
    /// A completed reservation authorizes at most one rating
    #[sea_orm(has_one = "super::rating::Entity")]
    Rating,
}

impl Related<super::car::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Car.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Renter.def()
    }
}

impl Related<super::rating::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rating.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
