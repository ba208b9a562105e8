//! User entity - Represents both car owners and renters.
//!
//! The `user_type` is fixed when the user is created. The `rating` and
//! `rating_count` columns hold the owner aggregate across all of the user's cars.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Whether a user lists cars or rents them
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum UserType {
    /// Lists cars and answers reservation requests
    #[sea_orm(string_value = "OWNER")]
    Owner,
    /// Books cars and rates completed rentals
    #[sea_orm(string_value = "RENTER")]
    Renter,
}

/// User database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// UUID string identifying the user
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Login email, unique across users
    #[sea_orm(unique)]
    pub email: String,
    pub full_name: String,
    pub phone_number: String,
    pub address: String,
    pub user_type: UserType,
    pub profile_image_url: Option<String>,
    /// Weighted mean of the user's car ratings, 0 when unrated
    pub rating: f64,
    /// Number of ratings behind `rating`
    pub rating_count: i32,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One owner has many cars
    #[sea_orm(has_many = "super::car::Entity")]
    Cars,
    /// One renter has many reservations
    #[sea_orm(has_many = "super::reservation::Entity")]
    Reservations,
    /// One user writes many ratings
    #[sea_orm(has_many = "super::rating::Entity")]
    Ratings,
}

impl Related<super::car::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cars.def()
    }
}

impl Related<super::reservation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reservations.def()
    }
}

impl Related<super::rating::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ratings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
