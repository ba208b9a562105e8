//! Core business logic - framework-agnostic reservation, rating and listing operations.
//!
//! Every function takes its database connection explicitly. Functions generic
//! over `ConnectionTrait` can run inside a caller's transaction; the ones that
//! take `&DatabaseConnection` open their own.

pub mod car;
pub mod conflict;
pub mod rating;
pub mod reservation;
pub mod seed;
pub mod user;
