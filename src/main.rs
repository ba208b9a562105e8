use car_rental::{
    config::{database, settings},
    core::seed,
    errors::Result,
    service::RentalService,
};
use dotenvy::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load config.toml
    let app_settings = settings::load_default_settings()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;
    info!(
        policy = ?app_settings.reservations.conflict_policy,
        "Loaded application configuration"
    );

    // 4. Connect and create tables
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Seed configured owners and cars
    let summary = seed::seed_fleet(&db, &app_settings.owners)
        .await
        .inspect_err(|e| error!("Failed to seed fleet: {}", e))?;
    info!(
        owners = summary.owners_created,
        cars = summary.cars_created,
        "Fleet seeded"
    );

    let service = RentalService::new(db, app_settings.reservations);
    let available = service.watch_available_cars().await?.current();
    info!("{} cars available for booking", available.len());
    for listed in &available {
        info!(
            "{} {} ({}) in {} at {:.2}/day, rated {:.1} from {} ratings",
            listed.brand,
            listed.model,
            listed.year,
            listed.location,
            listed.price_per_day,
            listed.rating,
            listed.rating_count
        );
    }

    Ok(())
}
