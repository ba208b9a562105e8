//! User business logic - Creating and looking up owners and renters.
//!
//! Registration screens and profile editing live in the presentation layer; this
//! module only covers the records the reservation and rating flows depend on.

use crate::{
    entities::{User, UserType, user},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::Expr};
use uuid::Uuid;

/// Fields needed to register a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    pub phone_number: String,
    pub address: String,
    pub user_type: UserType,
}

/// Creates a user with an empty rating aggregate.
///
/// The email is trimmed and must be non-empty and not already registered.
pub async fn create_user<C>(db: &C, new_user: NewUser) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let email = new_user.email.trim().to_string();
    if email.is_empty() {
        return Err(Error::validation("Email cannot be empty"));
    }
    if new_user.full_name.trim().is_empty() {
        return Err(Error::validation("Full name cannot be empty"));
    }
    if get_user_by_email(db, &email).await?.is_some() {
        return Err(Error::validation(format!(
            "A user with email {email} already exists"
        )));
    }

    let user = user::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        email: Set(email),
        full_name: Set(new_user.full_name.trim().to_string()),
        phone_number: Set(new_user.phone_number),
        address: Set(new_user.address),
        user_type: Set(new_user.user_type),
        profile_image_url: Set(None),
        rating: Set(0.0),
        rating_count: Set(0),
    };

    user.insert(db).await.map_err(Into::into)
}

/// Finds a user by primary key.
pub async fn get_user_by_id<C>(db: &C, user_id: &str) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id.to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a user by email, which is unique.
pub async fn get_user_by_email<C>(db: &C, email: &str) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists users of one type, ordered by name.
pub async fn get_users_by_type<C>(db: &C, user_type: UserType) -> Result<Vec<user::Model>>
where
    C: ConnectionTrait,
{
    User::find()
        .filter(user::Column::UserType.eq(user_type))
        .order_by_asc(user::Column::FullName)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Overwrites a user's rating aggregate.
pub async fn update_user_rating<C>(
    db: &C,
    user_id: &str,
    rating: f64,
    rating_count: i32,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let result = User::update_many()
        .col_expr(user::Column::Rating, Expr::value(rating))
        .col_expr(user::Column::RatingCount, Expr::value(rating_count))
        .filter(user::Column::Id.eq(user_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::UserNotFound {
            id: user_id.to_string(),
        });
    }
    Ok(())
}
