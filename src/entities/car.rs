//! Car entity - A vehicle listed by an owner.
//!
//! `rating` is the mean of every rating score for the car and `rating_count`
//! the number of ratings; both are zero for an unrated car.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Car database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cars")]
pub struct Model {
    /// UUID string identifying the car
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// User who listed the car
    pub owner_id: String,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub description: String,
    /// Daily price in the marketplace currency
    pub price_per_day: f64,
    /// Free-form city or address used by location search
    pub location: String,
    /// Hidden from browsing when false
    pub is_available: bool,
    pub rating: f64,
    pub rating_count: i32,
    /// Mirror of the primary `car_images` url
    pub image_uri: Option<String>,
}

/// Defines relationships between Car and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each car belongs to one owner
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id"
    )]
    Owner,
    #[sea_orm(has_many = "super::car_image::Entity")]
    Images,
    #[sea_orm(has_many = "super::reservation::Entity")]
    Reservations,
    #[sea_orm(has_many = "super::rating::Entity")]
    Ratings,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::car_image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Images.def()
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
