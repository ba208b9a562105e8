//! Rating aggregation - Recording renter ratings and keeping car and owner averages current.
//!
//! A rating is tied to one completed reservation. Writing it recomputes the
//! car's mean and count in the same transaction; the owner's aggregate is
//! recomputed afterwards from the per-car aggregates. A failure in that last
//! step is logged and swallowed, leaving the car consistent and the owner stale.

use crate::{
    core::{car as car_core, user as user_core},
    entities::{Car, Rating, ReservationStatus, car, rating},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{debug, error};
use uuid::Uuid;

/// Lowest accepted score
pub const MIN_SCORE: f64 = 1.0;
/// Highest accepted score
pub const MAX_SCORE: f64 = 5.0;

/// Mean and count of a set of scores. Empty input gives `(0.0, 0)`.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub fn average_score(scores: &[f64]) -> (f64, i32) {
    if scores.is_empty() {
        return (0.0, 0);
    }
    let total: f64 = scores.iter().sum();
    (total / scores.len() as f64, scores.len() as i32)
}

/// Combines per-car `(rating, rating_count)` pairs into one weighted average.
///
/// Cars with no ratings do not contribute. Returns `(0.0, 0)` when nothing is rated.
#[must_use]
pub fn weighted_average(aggregates: &[(f64, i32)]) -> (f64, i32) {
    let (total_score, total_count) = aggregates
        .iter()
        .filter(|(_, count)| *count > 0)
        .fold((0.0, 0), |(score, count), (rating, n)| {
            (score + rating * f64::from(*n), count + n)
        });

    if total_count == 0 {
        (0.0, 0)
    } else {
        (total_score / f64::from(total_count), total_count)
    }
}

/// Records a rating for a completed reservation.
///
/// Returns `Ok(None)` without writing anything when the reservation is missing
/// or not completed, when `user_id` is not its renter, when `car_id` is not the
/// reserved car, or when the reservation already has a rating.
///
/// # Errors
/// * `Error::InvalidScore` if `score` is outside 1.0..=5.0
/// * `Error::Database` if storing the rating or the car aggregate fails
pub async fn add_rating(
    db: &DatabaseConnection,
    user_id: &str,
    car_id: &str,
    reservation_id: &str,
    score: f64,
    comment: Option<String>,
) -> Result<Option<rating::Model>> {
    if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return Err(Error::InvalidScore { score });
    }

    let txn = db.begin().await?;

    let Some(reservation) =
        crate::core::reservation::get_reservation_by_id(&txn, reservation_id).await?
    else {
        debug!(reservation_id, "Rating refused: reservation not found");
        return Ok(None);
    };
    if reservation.status != ReservationStatus::Completed {
        debug!(reservation_id, status = ?reservation.status, "Rating refused: not completed");
        return Ok(None);
    }
    if reservation.renter_id != user_id || reservation.car_id != car_id {
        debug!(reservation_id, user_id, car_id, "Rating refused: not the renter's booking");
        return Ok(None);
    }
    if get_rating_for_reservation(&txn, reservation_id).await?.is_some() {
        debug!(reservation_id, "Rating refused: already rated");
        return Ok(None);
    }

    let rating = rating::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(user_id.to_string()),
        car_id: Set(car_id.to_string()),
        reservation_id: Set(reservation_id.to_string()),
        score: Set(score),
        comment: Set(comment.filter(|c| !c.trim().is_empty())),
        date: Set(Utc::now().date_naive()),
    }
    .insert(&txn)
    .await?;

    update_car_rating(&txn, car_id).await?;
    txn.commit().await?;

    let owner_update = match car_core::get_car_by_id(db, car_id).await {
        Ok(Some(car)) => update_owner_rating(db, &car.owner_id).await.map(|_| ()),
        Ok(None) => Ok(()),
        Err(e) => Err(e),
    };
    if let Err(e) = owner_update {
        error!(car_id, error = %e, "Failed to update owner rating");
    }

    Ok(Some(rating))
}

/// Recomputes a car's mean score and count from its stored ratings.
pub async fn update_car_rating<C>(db: &C, car_id: &str) -> Result<(f64, i32)>
where
    C: ConnectionTrait,
{
    let scores: Vec<f64> = get_ratings_for_car(db, car_id)
        .await?
        .into_iter()
        .map(|r| r.score)
        .collect();
    let (average, count) = average_score(&scores);
    car_core::update_car_rating(db, car_id, average, count).await?;
    Ok((average, count))
}

/// Recomputes an owner's aggregate from the aggregates of all their cars.
pub async fn update_owner_rating<C>(db: &C, owner_id: &str) -> Result<(f64, i32)>
where
    C: ConnectionTrait,
{
    let aggregates: Vec<(f64, i32)> = Car::find()
        .filter(car::Column::OwnerId.eq(owner_id))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.rating, c.rating_count))
        .collect();
    let (average, count) = weighted_average(&aggregates);
    user_core::update_user_rating(db, owner_id, average, count).await?;
    Ok((average, count))
}

/// All ratings for a car, newest first.
pub async fn get_ratings_for_car<C>(db: &C, car_id: &str) -> Result<Vec<rating::Model>>
where
    C: ConnectionTrait,
{
    Rating::find()
        .filter(rating::Column::CarId.eq(car_id))
        .order_by_desc(rating::Column::Date)
        .all(db)
        .await
        .map_err(Into::into)
}

/// All ratings written by a user.
pub async fn get_ratings_by_user<C>(db: &C, user_id: &str) -> Result<Vec<rating::Model>>
where
    C: ConnectionTrait,
{
    Rating::find()
        .filter(rating::Column::UserId.eq(user_id))
        .order_by_desc(rating::Column::Date)
        .all(db)
        .await
        .map_err(Into::into)
}

/// The rating attached to a reservation, if one was written.
pub async fn get_rating_for_reservation<C>(
    db: &C,
    reservation_id: &str,
) -> Result<Option<rating::Model>>
where
    C: ConnectionTrait,
{
    Rating::find()
        .filter(rating::Column::ReservationId.eq(reservation_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Whether `user_id` may still rate `reservation_id`.
pub async fn can_rate<C>(db: &C, user_id: &str, reservation_id: &str) -> Result<bool>
where
    C: ConnectionTrait,
{
    let Some(reservation) =
        crate::core::reservation::get_reservation_by_id(db, reservation_id).await?
    else {
        return Ok(false);
    };
    Ok(reservation.status == ReservationStatus::Completed
        && reservation.renter_id == user_id
        && get_rating_for_reservation(db, reservation_id).await?.is_none())
}
