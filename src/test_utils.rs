//! Shared test utilities for the rental core.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

#![allow(clippy::unwrap_used)]

use crate::{
    config::settings::ConflictPolicy,
    core::{
        car::{self, NewCar},
        reservation,
        user::{self, NewUser},
    },
    entities::{self, UserType},
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;

/// "Today" used by helpers that create reservations, before every test date.
pub const TEST_TODAY: (i32, u32, u32) = (2024, 1, 1);

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Shorthand for a calendar date; panics on an invalid date.
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// The fixed date passed as "today" by the reservation helpers.
pub fn test_today() -> NaiveDate {
    date(TEST_TODAY.0, TEST_TODAY.1, TEST_TODAY.2)
}

fn test_new_user(email: &str, user_type: UserType) -> NewUser {
    NewUser {
        email: email.to_string(),
        full_name: "Test User".to_string(),
        phone_number: "555-0100".to_string(),
        address: "1 Test Street".to_string(),
        user_type,
    }
}

/// Creates an owner account.
pub async fn create_test_owner(
    db: &DatabaseConnection,
    email: &str,
) -> Result<entities::user::Model> {
    user::create_user(db, test_new_user(email, UserType::Owner)).await
}

/// Creates a renter account.
pub async fn create_test_renter(
    db: &DatabaseConnection,
    email: &str,
) -> Result<entities::user::Model> {
    user::create_user(db, test_new_user(email, UserType::Renter)).await
}

/// Listing input with sensible defaults.
///
/// # Defaults
/// * `year`: 2020
/// * `location`: "Lisbon"
pub fn test_new_car(brand: &str, model: &str, price_per_day: f64) -> NewCar {
    NewCar {
        brand: brand.to_string(),
        model: model.to_string(),
        year: 2020,
        description: "Test car".to_string(),
        price_per_day,
        location: "Lisbon".to_string(),
    }
}

/// Lists a Toyota Corolla at `price_per_day` for `owner_id`.
pub async fn create_test_car(
    db: &DatabaseConnection,
    owner_id: &str,
    price_per_day: f64,
) -> Result<entities::car::Model> {
    car::create_car(db, owner_id, test_new_car("Toyota", "Corolla", price_per_day)).await
}

/// Books a car with the default conflict policy and [`test_today`].
pub async fn create_test_reservation(
    db: &DatabaseConnection,
    car_id: &str,
    renter_id: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<entities::reservation::Model> {
    reservation::create_reservation(
        db,
        ConflictPolicy::AllStatuses,
        car_id,
        renter_id,
        start,
        end,
        test_today(),
    )
    .await
}

/// Books `[start, start + 1 day]` and walks it through approve, pay and complete.
pub async fn create_completed_reservation(
    db: &DatabaseConnection,
    car_id: &str,
    renter_id: &str,
    start: NaiveDate,
) -> Result<entities::reservation::Model> {
    let end = start.succ_opt().unwrap();
    let booking = create_test_reservation(db, car_id, renter_id, start, end).await?;
    assert!(reservation::respond_to_reservation(db, &booking.id, true).await?);
    assert!(reservation::mark_reservation_paid(db, &booking.id).await?);
    assert!(reservation::complete_reservation(db, &booking.id).await?);
    Ok(reservation::get_reservation_by_id(db, &booking.id)
        .await?
        .unwrap())
}

/// Sets up a database with one owner.
pub async fn setup_with_owner() -> Result<(DatabaseConnection, entities::user::Model)> {
    let db = setup_test_db().await?;
    let owner = create_test_owner(&db, "owner@example.com").await?;
    Ok((db, owner))
}

/// Sets up a database with an owner's car at 50 per day and a renter.
/// Returns (db, car, renter).
pub async fn setup_with_car_and_renter() -> Result<(
    DatabaseConnection,
    entities::car::Model,
    entities::user::Model,
)> {
    let (db, owner) = setup_with_owner().await?;
    let car = create_test_car(&db, &owner.id, 50.0).await?;
    let renter = create_test_renter(&db, "renter@example.com").await?;
    Ok((db, car, renter))
}
