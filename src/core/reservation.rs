//! Reservation lifecycle - Booking cars and moving reservations through their states.
//!
//! Creation validates the date range, checks for overlapping bookings and
//! inserts inside one database transaction. Each state transition is a single
//! conditional `UPDATE ... WHERE status IN (...)`, so a reservation that moved on
//! between read and write is never transitioned twice. Transitions that are not
//! permitted return `Ok(false)` without detail, leaving the row untouched.

use crate::{
    config::settings::ConflictPolicy,
    core::conflict,
    entities::{Car, Reservation, ReservationStatus, User, car, reservation},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::debug;
use uuid::Uuid;

/// Number of rented days in the inclusive range `[start, end]`.
#[must_use]
pub fn rental_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

/// Price of renting at `price_per_day` for every day of `[start, end]`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn calculate_total_price(price_per_day: f64, start: NaiveDate, end: NaiveDate) -> f64 {
    price_per_day * rental_days(start, end) as f64
}

/// Rejects inverted ranges and ranges starting before `today`.
pub fn validate_date_range(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> Result<()> {
    if start > end {
        return Err(Error::validation("End date cannot be before start date"));
    }
    if start < today {
        return Err(Error::validation("Start date cannot be in the past"));
    }
    Ok(())
}

/// Books `car_id` for `renter_id` over `[start, end]`.
///
/// # Errors
/// * `Error::Validation` if the range is inverted or starts before `today`
/// * `Error::CarNotFound` / `Error::UserNotFound` for unknown ids
/// * `Error::DateConflict` if an existing reservation overlaps under `policy`
pub async fn create_reservation(
    db: &DatabaseConnection,
    policy: ConflictPolicy,
    car_id: &str,
    renter_id: &str,
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
) -> Result<reservation::Model> {
    validate_date_range(start, end, today)?;

    // Conflict check and insert commit together
    let txn = db.begin().await?;

    let car = Car::find_by_id(car_id.to_string())
        .one(&txn)
        .await?
        .ok_or_else(|| Error::CarNotFound {
            id: car_id.to_string(),
        })?;

    if User::find_by_id(renter_id.to_string())
        .one(&txn)
        .await?
        .is_none()
    {
        return Err(Error::UserNotFound {
            id: renter_id.to_string(),
        });
    }

    if conflict::has_conflict(&txn, policy, car_id, start, end).await? {
        return Err(Error::DateConflict {
            car_id: car_id.to_string(),
            start,
            end,
        });
    }

    let reservation = reservation::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        car_id: Set(car.id),
        renter_id: Set(renter_id.to_string()),
        start_date: Set(start),
        end_date: Set(end),
        total_price: Set(calculate_total_price(car.price_per_day, start, end)),
        status: Set(ReservationStatus::Pending),
        is_paid: Set(false),
        created_at: Set(Utc::now()),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    Ok(reservation)
}

/// Finds a reservation by primary key.
pub async fn get_reservation_by_id<C>(
    db: &C,
    reservation_id: &str,
) -> Result<Option<reservation::Model>>
where
    C: ConnectionTrait,
{
    Reservation::find_by_id(reservation_id.to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Every reservation for a car, in date order.
pub async fn get_reservations_for_car<C>(db: &C, car_id: &str) -> Result<Vec<reservation::Model>>
where
    C: ConnectionTrait,
{
    Reservation::find()
        .filter(reservation::Column::CarId.eq(car_id))
        .order_by_asc(reservation::Column::StartDate)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Every reservation made by a renter, newest first.
pub async fn get_reservations_for_renter<C>(
    db: &C,
    renter_id: &str,
) -> Result<Vec<reservation::Model>>
where
    C: ConnectionTrait,
{
    Reservation::find()
        .filter(reservation::Column::RenterId.eq(renter_id))
        .order_by_desc(reservation::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Reservations on any of the owner's cars, optionally limited to one status.
pub async fn get_reservations_for_owner<C>(
    db: &C,
    owner_id: &str,
    status: Option<ReservationStatus>,
) -> Result<Vec<reservation::Model>>
where
    C: ConnectionTrait,
{
    let car_ids: Vec<String> = Car::find()
        .filter(car::Column::OwnerId.eq(owner_id))
        .all(db)
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();

    if car_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = Reservation::find().filter(reservation::Column::CarId.is_in(car_ids));
    if let Some(status) = status {
        query = query.filter(reservation::Column::Status.eq(status));
    }

    query
        .order_by_asc(reservation::Column::StartDate)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Moves `reservation_id` to `next` if its current status is one of `from`.
async fn transition<C>(
    db: &C,
    reservation_id: &str,
    from: &[ReservationStatus],
    next: ReservationStatus,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    debug_assert!(from.iter().all(|s| s.can_transition_to(next)));

    let mut update = Reservation::update_many()
        .col_expr(reservation::Column::Status, Expr::value(next))
        .filter(reservation::Column::Id.eq(reservation_id))
        .filter(reservation::Column::Status.is_in(from.iter().copied()));

    // Completion additionally needs the rental paid
    if next == ReservationStatus::Completed {
        update = update.filter(reservation::Column::IsPaid.eq(true));
    }

    let result = update.exec(db).await?;
    let moved = result.rows_affected > 0;
    if !moved {
        debug!(reservation_id, ?next, "Transition not permitted");
    }
    Ok(moved)
}

/// Records the owner's answer to a pending request.
///
/// Returns false if the reservation does not exist or is no longer pending.
/// The caller is responsible for checking that the responder owns the car.
pub async fn respond_to_reservation<C>(
    db: &C,
    reservation_id: &str,
    approved: bool,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    let next = if approved {
        ReservationStatus::Approved
    } else {
        ReservationStatus::Rejected
    };
    transition(db, reservation_id, &[ReservationStatus::Pending], next).await
}

/// Cancels a pending or approved reservation.
///
/// The caller is responsible for checking that the requester is the renter.
pub async fn cancel_reservation<C>(db: &C, reservation_id: &str) -> Result<bool>
where
    C: ConnectionTrait,
{
    transition(
        db,
        reservation_id,
        &[ReservationStatus::Pending, ReservationStatus::Approved],
        ReservationStatus::Cancelled,
    )
    .await
}

/// Sets the paid flag. No status is checked here; see [`pay_reservation`]
/// for the guarded write.
///
/// Returns false if the reservation does not exist.
pub async fn mark_reservation_paid<C>(db: &C, reservation_id: &str) -> Result<bool>
where
    C: ConnectionTrait,
{
    let result = Reservation::update_many()
        .col_expr(reservation::Column::IsPaid, Expr::value(true))
        .filter(reservation::Column::Id.eq(reservation_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Pays for an approved, unpaid reservation on behalf of its renter.
///
/// The renter, status and paid checks are part of the `UPDATE` itself, so a
/// reservation cancelled concurrently is never marked paid. Returns false when
/// any of them does not hold.
pub async fn pay_reservation<C>(db: &C, reservation_id: &str, renter_id: &str) -> Result<bool>
where
    C: ConnectionTrait,
{
    let result = Reservation::update_many()
        .col_expr(reservation::Column::IsPaid, Expr::value(true))
        .filter(reservation::Column::Id.eq(reservation_id))
        .filter(reservation::Column::RenterId.eq(renter_id))
        .filter(reservation::Column::Status.eq(ReservationStatus::Approved))
        .filter(reservation::Column::IsPaid.eq(false))
        .exec(db)
        .await?;

    let paid = result.rows_affected > 0;
    if !paid {
        debug!(reservation_id, "Payment not permitted");
    }
    Ok(paid)
}

/// Completes an approved, paid reservation.
pub async fn complete_reservation<C>(db: &C, reservation_id: &str) -> Result<bool>
where
    C: ConnectionTrait,
{
    transition(
        db,
        reservation_id,
        &[ReservationStatus::Approved],
        ReservationStatus::Completed,
    )
    .await
}
