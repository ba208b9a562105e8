//! Car business logic - Listing, searching, and maintaining cars and their images.
//!
//! Rating aggregates on the car rows are written by [`crate::core::rating`];
//! everything else here is owner-driven listing maintenance.

use crate::{
    entities::{Car, CarImage, Rating, Reservation, car, car_image, rating, reservation},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{info, warn};
use uuid::Uuid;

/// Fields needed to list a new car.
#[derive(Debug, Clone)]
pub struct NewCar {
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub description: String,
    pub price_per_day: f64,
    pub location: String,
}

/// Browse filters. Unset fields do not restrict the result.
#[derive(Debug, Clone, Default)]
pub struct CarSearch {
    /// Substring matched against brand or model
    pub term: Option<String>,
    /// Substring matched against location
    pub city: Option<String>,
    /// Inclusive upper bound on `price_per_day`
    pub max_price: Option<f64>,
    /// Only cars flagged available
    pub available_only: bool,
}

fn validate_listing(new_car: &NewCar) -> Result<()> {
    if new_car.brand.trim().is_empty() || new_car.model.trim().is_empty() {
        return Err(Error::validation("Brand and model cannot be empty"));
    }
    if !new_car.price_per_day.is_finite() || new_car.price_per_day <= 0.0 {
        return Err(Error::validation("Price per day must be positive"));
    }
    Ok(())
}

/// Lists a new car for `owner_id`, available and unrated.
///
/// Brand and model must be non-empty and the daily price positive and finite.
pub async fn create_car<C>(db: &C, owner_id: &str, new_car: NewCar) -> Result<car::Model>
where
    C: ConnectionTrait,
{
    validate_listing(&new_car)?;

    let car = car::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        owner_id: Set(owner_id.to_string()),
        brand: Set(new_car.brand.trim().to_string()),
        model: Set(new_car.model.trim().to_string()),
        year: Set(new_car.year),
        description: Set(new_car.description),
        price_per_day: Set(new_car.price_per_day),
        location: Set(new_car.location),
        is_available: Set(true),
        rating: Set(0.0),
        rating_count: Set(0),
        image_uri: Set(None),
    };

    car.insert(db).await.map_err(Into::into)
}

/// Replaces a car's listing details.
///
/// Validation matches [`create_car`]. Availability, rating aggregate and the
/// primary image are left as they are.
pub async fn update_car<C>(db: &C, car_id: &str, details: NewCar) -> Result<car::Model>
where
    C: ConnectionTrait,
{
    validate_listing(&details)?;

    let existing = get_car_by_id(db, car_id)
        .await?
        .ok_or_else(|| Error::CarNotFound {
            id: car_id.to_string(),
        })?;

    let mut car: car::ActiveModel = existing.into();
    car.brand = Set(details.brand.trim().to_string());
    car.model = Set(details.model.trim().to_string());
    car.year = Set(details.year);
    car.description = Set(details.description);
    car.price_per_day = Set(details.price_per_day);
    car.location = Set(details.location);

    car.update(db).await.map_err(Into::into)
}

/// Finds a car by primary key.
pub async fn get_car_by_id<C>(db: &C, car_id: &str) -> Result<Option<car::Model>>
where
    C: ConnectionTrait,
{
    Car::find_by_id(car_id.to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// All cars listed by one owner, ordered by brand then model.
pub async fn get_cars_by_owner<C>(db: &C, owner_id: &str) -> Result<Vec<car::Model>>
where
    C: ConnectionTrait,
{
    Car::find()
        .filter(car::Column::OwnerId.eq(owner_id))
        .order_by_asc(car::Column::Brand)
        .order_by_asc(car::Column::Model)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Cars currently open for booking.
pub async fn get_available_cars<C>(db: &C) -> Result<Vec<car::Model>>
where
    C: ConnectionTrait,
{
    search_cars(
        db,
        &CarSearch {
            available_only: true,
            ..Default::default()
        },
    )
    .await
}

/// Filters cars by term, city and price; any combination of filters applies.
pub async fn search_cars<C>(db: &C, search: &CarSearch) -> Result<Vec<car::Model>>
where
    C: ConnectionTrait,
{
    let mut query = Car::find();

    if let Some(term) = search.term.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        query = query.filter(
            car::Column::Brand
                .contains(term)
                .or(car::Column::Model.contains(term)),
        );
    }
    if let Some(city) = search.city.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        query = query.filter(car::Column::Location.contains(city));
    }
    if let Some(max_price) = search.max_price {
        query = query.filter(car::Column::PricePerDay.lte(max_price));
    }
    if search.available_only {
        query = query.filter(car::Column::IsAvailable.eq(true));
    }

    query
        .order_by_asc(car::Column::PricePerDay)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Opens or closes a car for browsing.
pub async fn set_car_availability<C>(db: &C, car_id: &str, is_available: bool) -> Result<()>
where
    C: ConnectionTrait,
{
    let result = Car::update_many()
        .col_expr(car::Column::IsAvailable, Expr::value(is_available))
        .filter(car::Column::Id.eq(car_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::CarNotFound {
            id: car_id.to_string(),
        });
    }
    Ok(())
}

/// Overwrites a car's rating aggregate.
pub async fn update_car_rating<C>(
    db: &C,
    car_id: &str,
    rating: f64,
    rating_count: i32,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let result = Car::update_many()
        .col_expr(car::Column::Rating, Expr::value(rating))
        .col_expr(car::Column::RatingCount, Expr::value(rating_count))
        .filter(car::Column::Id.eq(car_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::CarNotFound {
            id: car_id.to_string(),
        });
    }
    Ok(())
}

/// Deletes a car with its images, reservations and ratings.
///
/// The owner's aggregate is recomputed afterwards since the car's ratings no
/// longer count towards it. Returns false if the car does not exist.
pub async fn delete_car(db: &DatabaseConnection, car_id: &str) -> Result<bool> {
    let txn = db.begin().await?;

    let Some(car) = Car::find_by_id(car_id.to_string()).one(&txn).await? else {
        return Ok(false);
    };

    Rating::delete_many()
        .filter(rating::Column::CarId.eq(car_id))
        .exec(&txn)
        .await?;
    Reservation::delete_many()
        .filter(reservation::Column::CarId.eq(car_id))
        .exec(&txn)
        .await?;
    CarImage::delete_many()
        .filter(car_image::Column::CarId.eq(car_id))
        .exec(&txn)
        .await?;
    let owner_id = car.owner_id.clone();
    car.delete(&txn).await?;

    txn.commit().await?;
    info!(car_id, %owner_id, "Deleted car and its dependents");

    if let Err(e) = crate::core::rating::update_owner_rating(db, &owner_id).await {
        warn!(%owner_id, error = %e, "Failed to refresh owner rating after car deletion");
    }
    Ok(true)
}

/// Stores an image for a car, optionally making it the primary one.
pub async fn add_car_image(
    db: &DatabaseConnection,
    car_id: &str,
    image_url: &str,
    is_primary: bool,
) -> Result<car_image::Model> {
    if get_car_by_id(db, car_id).await?.is_none() {
        return Err(Error::CarNotFound {
            id: car_id.to_string(),
        });
    }

    let image = car_image::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        car_id: Set(car_id.to_string()),
        image_url: Set(image_url.to_string()),
        is_primary: Set(false),
    }
    .insert(db)
    .await?;

    if is_primary {
        set_primary_image(db, &image.id).await?;
        return CarImage::find_by_id(image.id.clone())
            .one(db)
            .await?
            .ok_or_else(|| {
                let missing = format!("car image {} missing after insert", image.id);
                Error::Database(DbErr::RecordNotFound(missing))
            });
    }
    Ok(image)
}

/// All images stored for a car, primary first.
pub async fn get_car_images<C>(db: &C, car_id: &str) -> Result<Vec<car_image::Model>>
where
    C: ConnectionTrait,
{
    CarImage::find()
        .filter(car_image::Column::CarId.eq(car_id))
        .order_by_desc(car_image::Column::IsPrimary)
        .all(db)
        .await
        .map_err(Into::into)
}

/// The car's primary image, if any.
pub async fn get_primary_image<C>(db: &C, car_id: &str) -> Result<Option<car_image::Model>>
where
    C: ConnectionTrait,
{
    CarImage::find()
        .filter(car_image::Column::CarId.eq(car_id))
        .filter(car_image::Column::IsPrimary.eq(true))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Makes `image_id` the only primary image of its car and mirrors its url onto
/// `cars.image_uri`. Returns false if the image does not exist.
pub async fn set_primary_image(db: &DatabaseConnection, image_id: &str) -> Result<bool> {
    let txn = db.begin().await?;

    let Some(image) = CarImage::find_by_id(image_id.to_string())
        .one(&txn)
        .await?
    else {
        return Ok(false);
    };

    CarImage::update_many()
        .col_expr(car_image::Column::IsPrimary, Expr::value(false))
        .filter(car_image::Column::CarId.eq(image.car_id.as_str()))
        .exec(&txn)
        .await?;
    CarImage::update_many()
        .col_expr(car_image::Column::IsPrimary, Expr::value(true))
        .filter(car_image::Column::Id.eq(image_id))
        .exec(&txn)
        .await?;
    Car::update_many()
        .col_expr(car::Column::ImageUri, Expr::value(Some(image.image_url.clone())))
        .filter(car::Column::Id.eq(image.car_id.as_str()))
        .exec(&txn)
        .await?;

    txn.commit().await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn test_create_car_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let mut new_car = test_new_car("Toyota", "Corolla", 50.0);
        new_car.brand = String::new();
        let result = create_car(&db, "owner", new_car).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = create_car(&db, "owner", test_new_car("Toyota", "Corolla", 0.0)).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = create_car(&db, "owner", test_new_car("Toyota", "Corolla", f64::NAN)).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_car_integration() -> Result<()> {
        let (db, owner) = setup_with_owner().await?;

        let car = create_test_car(&db, &owner.id, 50.0).await?;
        assert_eq!(car.owner_id, owner.id);
        assert!(car.is_available);
        assert_eq!(car.rating, 0.0);
        assert_eq!(car.rating_count, 0);

        let cars = get_cars_by_owner(&db, &owner.id).await?;
        assert_eq!(cars, vec![car]);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_car_keeps_rating_and_availability() -> Result<()> {
        let (db, owner) = setup_with_owner().await?;
        let car = create_test_car(&db, &owner.id, 50.0).await?;
        update_car_rating(&db, &car.id, 4.5, 2).await?;
        set_car_availability(&db, &car.id, false).await?;

        let mut details = test_new_car(" Honda ", "Civic", 65.0);
        details.year = 2022;
        details.location = "Porto".to_string();
        let updated = update_car(&db, &car.id, details).await?;

        assert_eq!(updated.id, car.id);
        assert_eq!(updated.owner_id, owner.id);
        assert_eq!((updated.brand.as_str(), updated.model.as_str()), ("Honda", "Civic"));
        assert_eq!(updated.year, 2022);
        assert_eq!(updated.price_per_day, 65.0);
        assert_eq!(updated.location, "Porto");
        assert_eq!((updated.rating, updated.rating_count), (4.5, 2));
        assert!(!updated.is_available);

        let stored = get_car_by_id(&db, &car.id).await?.unwrap();
        assert_eq!(stored, updated);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_car_rejects_bad_input() -> Result<()> {
        let (db, owner) = setup_with_owner().await?;
        let car = create_test_car(&db, &owner.id, 50.0).await?;

        let result = update_car(&db, &car.id, test_new_car("Honda", "", 65.0)).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        let result = update_car(&db, &car.id, test_new_car("Honda", "Civic", -1.0)).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        let result = update_car(&db, "missing", test_new_car("Honda", "Civic", 65.0)).await;
        assert!(matches!(result, Err(Error::CarNotFound { .. })));

        let stored = get_car_by_id(&db, &car.id).await?.unwrap();
        assert_eq!(stored, car);

        Ok(())
    }

    #[tokio::test]
    async fn test_search_cars_filters_combine() -> Result<()> {
        let (db, owner) = setup_with_owner().await?;

        let mut lisbon = test_new_car("Toyota", "Corolla", 45.0);
        lisbon.location = "Lisbon".to_string();
        let lisbon = create_car(&db, &owner.id, lisbon).await?;

        let mut porto = test_new_car("Toyota", "Yaris", 80.0);
        porto.location = "Porto".to_string();
        create_car(&db, &owner.id, porto).await?;

        let mut fiat = test_new_car("Fiat", "500", 30.0);
        fiat.location = "Lisbon".to_string();
        let fiat = create_car(&db, &owner.id, fiat).await?;

        let toyotas = search_cars(
            &db,
            &CarSearch {
                term: Some("Toyota".to_string()),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(toyotas.len(), 2);

        let cheap_lisbon = search_cars(
            &db,
            &CarSearch {
                city: Some("Lisbon".to_string()),
                max_price: Some(50.0),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(cheap_lisbon, vec![fiat.clone(), lisbon.clone()]);

        set_car_availability(&db, &fiat.id, false).await?;
        let available = get_available_cars(&db).await?;
        assert_eq!(available.len(), 2);
        assert!(available.iter().all(|c| c.id != fiat.id));

        Ok(())
    }

    #[tokio::test]
    async fn test_image_missing_after_insert_is_storage_error() -> Result<()> {
        let car = car::Model {
            id: "car".to_string(),
            owner_id: "owner".to_string(),
            brand: "Toyota".to_string(),
            model: "Corolla".to_string(),
            year: 2020,
            description: String::new(),
            price_per_day: 50.0,
            location: "Lisbon".to_string(),
            is_available: true,
            rating: 0.0,
            rating_count: 0,
            image_uri: None,
        };
        let image = car_image::Model {
            id: "image".to_string(),
            car_id: "car".to_string(),
            image_url: "/images/front.jpg".to_string(),
            is_primary: false,
        };
        let written = MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        };

        // Car lookup, insert read-back, primary lookup, then nothing on the final read
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([vec![car]])
            .append_query_results([vec![image.clone()], vec![image]])
            .append_query_results([Vec::<car_image::Model>::new()])
            .append_exec_results([written.clone(), written.clone(), written.clone(), written])
            .into_connection();

        let result = add_car_image(&db, "car", "/images/front.jpg", true).await;
        assert!(matches!(result, Err(Error::Database(DbErr::RecordNotFound(_)))));

        Ok(())
    }

    #[tokio::test]
    async fn test_primary_image_is_unique() -> Result<()> {
        let (db, owner) = setup_with_owner().await?;
        let car = create_test_car(&db, &owner.id, 50.0).await?;

        let first = add_car_image(&db, &car.id, "/images/front.jpg", true).await?;
        assert!(first.is_primary);
        let second = add_car_image(&db, &car.id, "/images/side.jpg", true).await?;
        assert!(second.is_primary);

        let images = get_car_images(&db, &car.id).await?;
        assert_eq!(images.len(), 2);
        assert_eq!(images.iter().filter(|i| i.is_primary).count(), 1);

        let primary = get_primary_image(&db, &car.id).await?.unwrap();
        assert_eq!(primary.id, second.id);

        let car = get_car_by_id(&db, &car.id).await?.unwrap();
        assert_eq!(car.image_uri.as_deref(), Some("/images/side.jpg"));

        assert!(set_primary_image(&db, &first.id).await?);
        let primary = get_primary_image(&db, &car.id).await?.unwrap();
        assert_eq!(primary.id, first.id);

        Ok(())
    }

    #[tokio::test]
    async fn test_add_image_to_missing_car() -> Result<()> {
        let db = setup_test_db().await?;

        let result = add_car_image(&db, "missing", "/images/x.jpg", false).await;
        assert!(matches!(result, Err(Error::CarNotFound { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_car_cascades() -> Result<()> {
        let (db, owner) = setup_with_owner().await?;
        let renter = create_test_renter(&db, "renter@example.com").await?;
        let car = create_test_car(&db, &owner.id, 50.0).await?;
        add_car_image(&db, &car.id, "/images/front.jpg", true).await?;
        create_test_reservation(&db, &car.id, &renter.id, date(2030, 1, 1), date(2030, 1, 3))
            .await?;

        assert!(delete_car(&db, &car.id).await?);
        assert!(get_car_by_id(&db, &car.id).await?.is_none());
        assert!(get_car_images(&db, &car.id).await?.is_empty());
        assert!(
            crate::core::reservation::get_reservations_for_car(&db, &car.id)
                .await?
                .is_empty()
        );

        assert!(!delete_car(&db, &car.id).await?);

        Ok(())
    }
}
