//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod car;
pub mod car_image;
pub mod rating;
pub mod reservation;
pub mod user;

// Re-export specific types to avoid conflicts
pub use car::{Column as CarColumn, Entity as Car, Model as CarModel};
pub use car_image::{Column as CarImageColumn, Entity as CarImage, Model as CarImageModel};
pub use rating::{Column as RatingColumn, Entity as Rating, Model as RatingModel};
pub use reservation::{
    Column as ReservationColumn, Entity as Reservation, Model as ReservationModel,
    ReservationStatus,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel, UserType};
