//! Fleet seeding - Creating the owners and cars listed in config.toml.
//!
//! Seeding is idempotent: owners are matched by email and cars by
//! (owner, brand, model, year), so re-running on every start only inserts what
//! is missing.

use crate::{
    config::settings::OwnerConfig,
    core::{
        car::{self as car_core, NewCar},
        user::{self as user_core, NewUser},
    },
    entities::UserType,
    errors::Result,
};
use sea_orm::DatabaseConnection;
use tracing::{debug, info, warn};

/// What a seeding run inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    /// Owners created by this run
    pub owners_created: usize,
    /// Cars created by this run
    pub cars_created: usize,
}

/// Inserts any configured owners and cars that are not yet stored.
pub async fn seed_fleet(db: &DatabaseConnection, owners: &[OwnerConfig]) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    for owner_cfg in owners {
        let stored = user_core::get_user_by_email(db, &owner_cfg.email).await?;
        let owner = if let Some(existing) = stored {
            if existing.user_type != UserType::Owner {
                warn!(
                    email = %owner_cfg.email,
                    "Configured owner is registered as a renter. Skipping."
                );
                continue;
            }
            debug!(email = %owner_cfg.email, "Owner already exists");
            existing
        } else {
            info!(email = %owner_cfg.email, "Seeding owner");
            summary.owners_created += 1;
            user_core::create_user(
                db,
                NewUser {
                    email: owner_cfg.email.clone(),
                    full_name: owner_cfg.full_name.clone(),
                    phone_number: owner_cfg.phone_number.clone(),
                    address: owner_cfg.address.clone(),
                    user_type: UserType::Owner,
                },
            )
            .await?
        };

        let listed = car_core::get_cars_by_owner(db, &owner.id).await?;
        for car_cfg in &owner_cfg.cars {
            let already_listed = listed.iter().any(|c| {
                c.brand == car_cfg.brand && c.model == car_cfg.model && c.year == car_cfg.year
            });
            if already_listed {
                continue;
            }

            info!(
                "Seeding car {} {} ({}) for {}",
                car_cfg.brand, car_cfg.model, car_cfg.year, owner.email
            );
            car_core::create_car(
                db,
                &owner.id,
                NewCar {
                    brand: car_cfg.brand.clone(),
                    model: car_cfg.model.clone(),
                    year: car_cfg.year,
                    description: car_cfg.description.clone(),
                    price_per_day: car_cfg.price_per_day,
                    location: car_cfg.location.clone(),
                },
            )
            .await?;
            summary.cars_created += 1;
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::parse_settings;
    use crate::test_utils::*;

    const FLEET: &str = r#"
        [[owners]]
        email = "dana@example.com"
        full_name = "Dana Owner"

        [[owners.cars]]
        brand = "Toyota"
        model = "Corolla"
        year = 2020
        price_per_day = 45.0
        location = "Lisbon"

        [[owners.cars]]
        brand = "Fiat"
        model = "500"
        year = 2018
        price_per_day = 30.0
        location = "Porto"
    "#;

    #[tokio::test]
    async fn test_seed_fleet_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let settings = parse_settings(FLEET)?;

        let first = seed_fleet(&db, &settings.owners).await?;
        assert_eq!(
            first,
            SeedSummary {
                owners_created: 1,
                cars_created: 2
            }
        );

        let second = seed_fleet(&db, &settings.owners).await?;
        assert_eq!(second, SeedSummary::default());

        assert_eq!(car_core::get_available_cars(&db).await?.len(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_seed_skips_renter_with_owner_email() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_renter(&db, "dana@example.com").await?;
        let settings = parse_settings(FLEET)?;

        let summary = seed_fleet(&db, &settings.owners).await?;
        assert_eq!(summary, SeedSummary::default());

        Ok(())
    }
}
