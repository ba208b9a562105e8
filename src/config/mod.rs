/// Database connection and table creation
pub mod database;

/// Application settings and fleet seed data loaded from config.toml
pub mod settings;
