//! Rental service - The entry point the presentation layer calls.
//!
//! Wraps the core operations with the actor checks the screens rely on (only
//! the car's owner answers a request, only the renter cancels or pays),
//! publishes a [`Change`] after every successful write, and hands out live
//! subscriptions for the lists the screens display.

use crate::{
    config::settings::ReservationSettings,
    core::{
        car::{self as car_core, NewCar},
        rating as rating_core,
        reservation as reservation_core,
        user::{self as user_core, NewUser},
    },
    entities::{ReservationStatus, UserType, car, rating, reservation, user},
    errors::{Error, Result},
    feed::{Change, ChangeFeed, Subscription, watch_query},
};
use chrono::{Local, NaiveDate};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Reservation and rating operations bound to one database.
#[derive(Debug, Clone)]
pub struct RentalService {
    db: Arc<DatabaseConnection>,
    feed: ChangeFeed,
    settings: ReservationSettings,
}

impl RentalService {
    /// Creates a service over `db` with its own change feed.
    #[must_use]
    pub fn new(db: DatabaseConnection, settings: ReservationSettings) -> Self {
        Self::with_feed(db, ChangeFeed::default(), settings)
    }

    /// Creates a service publishing to an existing feed.
    #[must_use]
    pub fn with_feed(
        db: DatabaseConnection,
        feed: ChangeFeed,
        settings: ReservationSettings,
    ) -> Self {
        Self {
            db: Arc::new(db),
            feed,
            settings,
        }
    }

    /// The underlying connection, for read-only queries.
    #[must_use]
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// The feed this service publishes to.
    #[must_use]
    pub const fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    /// Registers an owner or renter.
    #[instrument(skip(self, new_user), fields(email = %new_user.email))]
    pub async fn register_user(&self, new_user: NewUser) -> Result<user::Model> {
        let user = user_core::create_user(self.db(), new_user).await?;
        self.feed.publish(Change::Users);
        info!(user_id = %user.id, "Registered user");
        Ok(user)
    }

    /// Lists a car for an owner account.
    #[instrument(skip(self, new_car))]
    pub async fn list_car(&self, owner_id: &str, new_car: NewCar) -> Result<car::Model> {
        let owner = user_core::get_user_by_id(self.db(), owner_id)
            .await?
            .ok_or_else(|| Error::UserNotFound {
                id: owner_id.to_string(),
            })?;
        if owner.user_type != UserType::Owner {
            return Err(Error::validation("Only owners can list cars"));
        }

        let car = car_core::create_car(self.db(), owner_id, new_car).await?;
        self.feed.publish(Change::Cars);
        info!(car_id = %car.id, "Listed car");
        Ok(car)
    }

    /// Changes the listing details of a car `owner_id` listed.
    ///
    /// Returns `Ok(None)` when the car is missing or belongs to someone else.
    #[instrument(skip(self, details))]
    pub async fn edit_car(
        &self,
        car_id: &str,
        owner_id: &str,
        details: NewCar,
    ) -> Result<Option<car::Model>> {
        if !self.is_owner_of(car_id, owner_id).await? {
            warn!("Editor does not own the car");
            return Ok(None);
        }

        let car = car_core::update_car(self.db(), car_id, details).await?;
        self.feed.publish(Change::Cars);
        info!("Car listing updated");
        Ok(Some(car))
    }

    /// Requests a booking starting no earlier than today's local date.
    pub async fn request_reservation(
        &self,
        car_id: &str,
        renter_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<reservation::Model> {
        self.request_reservation_on(car_id, renter_id, start, end, Local::now().date_naive())
            .await
    }

    /// Requests a booking, treating `today` as the current date.
    #[instrument(skip(self))]
    pub async fn request_reservation_on(
        &self,
        car_id: &str,
        renter_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> Result<reservation::Model> {
        let reservation = reservation_core::create_reservation(
            self.db(),
            self.settings.conflict_policy,
            car_id,
            renter_id,
            start,
            end,
            today,
        )
        .await
        .inspect_err(|e| warn!(error = %e, "Reservation request refused"))?;

        self.feed.publish(Change::Reservations);
        info!(
            reservation_id = %reservation.id,
            total_price = reservation.total_price,
            "Reservation requested"
        );
        Ok(reservation)
    }

    /// Approves a pending request on one of `owner_id`'s cars.
    pub async fn approve(&self, reservation_id: &str, owner_id: &str) -> Result<bool> {
        self.respond(reservation_id, owner_id, true).await
    }

    /// Rejects a pending request on one of `owner_id`'s cars.
    pub async fn reject(&self, reservation_id: &str, owner_id: &str) -> Result<bool> {
        self.respond(reservation_id, owner_id, false).await
    }

    #[instrument(skip(self))]
    async fn respond(&self, reservation_id: &str, owner_id: &str, approved: bool) -> Result<bool> {
        let Some(reservation) =
            reservation_core::get_reservation_by_id(self.db(), reservation_id).await?
        else {
            return Ok(false);
        };
        let owns_car = car_core::get_car_by_id(self.db(), &reservation.car_id)
            .await?
            .is_some_and(|car| car.owner_id == owner_id);
        if !owns_car {
            warn!("Responder does not own the reserved car");
            return Ok(false);
        }

        let moved =
            reservation_core::respond_to_reservation(self.db(), reservation_id, approved).await?;
        if moved {
            self.feed.publish(Change::Reservations);
            info!("Reservation answered");
        }
        Ok(moved)
    }

    /// Cancels the renter's own pending or approved reservation.
    #[instrument(skip(self))]
    pub async fn cancel(&self, reservation_id: &str, renter_id: &str) -> Result<bool> {
        if !self.is_renter_of(reservation_id, renter_id).await? {
            return Ok(false);
        }

        let moved = reservation_core::cancel_reservation(self.db(), reservation_id).await?;
        if moved {
            self.feed.publish(Change::Reservations);
            info!("Reservation cancelled");
        }
        Ok(moved)
    }

    /// Pays for the renter's approved, unpaid reservation.
    #[instrument(skip(self))]
    pub async fn pay(&self, reservation_id: &str, renter_id: &str) -> Result<bool> {
        let paid = reservation_core::pay_reservation(self.db(), reservation_id, renter_id).await?;
        if paid {
            self.feed.publish(Change::Reservations);
            info!("Reservation paid");
        } else {
            warn!("Payment refused");
        }
        Ok(paid)
    }

    /// Completes an approved, paid reservation once the rental is over.
    #[instrument(skip(self))]
    pub async fn complete(&self, reservation_id: &str) -> Result<bool> {
        let moved = reservation_core::complete_reservation(self.db(), reservation_id).await?;
        if moved {
            self.feed.publish(Change::Reservations);
            info!("Reservation completed");
        }
        Ok(moved)
    }

    /// Rates a completed reservation; `None` when rating is not permitted.
    #[instrument(skip(self, comment))]
    pub async fn submit_rating(
        &self,
        user_id: &str,
        car_id: &str,
        reservation_id: &str,
        score: f64,
        comment: Option<String>,
    ) -> Result<Option<rating::Model>> {
        let rating =
            rating_core::add_rating(self.db(), user_id, car_id, reservation_id, score, comment)
                .await?;
        if rating.is_some() {
            self.feed.publish(Change::Ratings);
            self.feed.publish(Change::Cars);
            self.feed.publish(Change::Users);
            info!(score, "Rating recorded");
        }
        Ok(rating)
    }

    /// Deletes a car listed by `owner_id`, with everything attached to it.
    #[instrument(skip(self))]
    pub async fn remove_car(&self, car_id: &str, owner_id: &str) -> Result<bool> {
        if !self.is_owner_of(car_id, owner_id).await? {
            return Ok(false);
        }

        let deleted = car_core::delete_car(self.db(), car_id).await?;
        if deleted {
            for change in [
                Change::Cars,
                Change::CarImages,
                Change::Reservations,
                Change::Ratings,
                Change::Users,
            ] {
                self.feed.publish(change);
            }
        }
        Ok(deleted)
    }

    async fn is_owner_of(&self, car_id: &str, owner_id: &str) -> Result<bool> {
        Ok(car_core::get_car_by_id(self.db(), car_id)
            .await?
            .is_some_and(|car| car.owner_id == owner_id))
    }

    async fn is_renter_of(&self, reservation_id: &str, renter_id: &str) -> Result<bool> {
        Ok(
            reservation_core::get_reservation_by_id(self.db(), reservation_id)
                .await?
                .is_some_and(|r| r.renter_id == renter_id),
        )
    }

    /// Live list of a car's reservations.
    pub async fn watch_car_reservations(
        &self,
        car_id: &str,
    ) -> Result<Subscription<reservation::Model>> {
        let (db, car_id) = (Arc::clone(&self.db), car_id.to_string());
        watch_query(&self.feed, &[Change::Reservations], move || {
            let (db, car_id) = (Arc::clone(&db), car_id.clone());
            async move { reservation_core::get_reservations_for_car(&*db, &car_id).await }
        })
        .await
    }

    /// Live list of a renter's reservations.
    pub async fn watch_renter_reservations(
        &self,
        renter_id: &str,
    ) -> Result<Subscription<reservation::Model>> {
        let (db, renter_id) = (Arc::clone(&self.db), renter_id.to_string());
        watch_query(&self.feed, &[Change::Reservations], move || {
            let (db, renter_id) = (Arc::clone(&db), renter_id.clone());
            async move { reservation_core::get_reservations_for_renter(&*db, &renter_id).await }
        })
        .await
    }

    /// Live list of reservations on an owner's cars, optionally for one status.
    pub async fn watch_owner_reservations(
        &self,
        owner_id: &str,
        status: Option<ReservationStatus>,
    ) -> Result<Subscription<reservation::Model>> {
        let (db, owner_id) = (Arc::clone(&self.db), owner_id.to_string());
        watch_query(
            &self.feed,
            &[Change::Reservations, Change::Cars],
            move || {
                let (db, owner_id) = (Arc::clone(&db), owner_id.clone());
                async move {
                    reservation_core::get_reservations_for_owner(&*db, &owner_id, status).await
                }
            },
        )
        .await
    }

    /// Live list of a car's ratings.
    pub async fn watch_car_ratings(&self, car_id: &str) -> Result<Subscription<rating::Model>> {
        let (db, car_id) = (Arc::clone(&self.db), car_id.to_string());
        watch_query(&self.feed, &[Change::Ratings], move || {
            let (db, car_id) = (Arc::clone(&db), car_id.clone());
            async move { rating_core::get_ratings_for_car(&*db, &car_id).await }
        })
        .await
    }

    /// Live list of cars open for booking.
    pub async fn watch_available_cars(&self) -> Result<Subscription<car::Model>> {
        let db = Arc::clone(&self.db);
        watch_query(&self.feed, &[Change::Cars], move || {
            let db = Arc::clone(&db);
            async move { car_core::get_available_cars(&*db).await }
        })
        .await
    }
}
