//! Profile and listing repositories.
//!
//! [`ProfileStore`] is the seam for per-user payment identity;
//! [`ListingStore`] covers the read-only listing/location lookups checkout
//! needs for charge metadata. [`PgStore`] implements both over one pool.

use async_trait::async_trait;
use sqlx::PgPool;

use homeport_core::{
    AccountId, CustomerId, Email, ListingId, LocationId, ProfileId, UserId,
};

use super::RepositoryError;
use crate::models::{Listing, Location, User, UserProfile};

/// Reads and writes of the per-user payment identity record.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Load a user.
    async fn user(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;

    /// Load a user's profile.
    async fn profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, RepositoryError>;

    /// Set `account_id` on a profile that does not have one yet.
    ///
    /// Returns `false` when the profile already carries an account id -
    /// the compare-and-set lost to a concurrent create.
    async fn claim_account_id(
        &self,
        profile_id: ProfileId,
        account_id: &AccountId,
    ) -> Result<bool, RepositoryError>;

    /// Clear `account_id` after the provider account was deleted.
    async fn clear_account_id(&self, profile_id: ProfileId) -> Result<(), RepositoryError>;

    /// Persist the customer id created for this profile.
    async fn set_customer_id(
        &self,
        profile_id: ProfileId,
        customer_id: &CustomerId,
    ) -> Result<(), RepositoryError>;
}

/// Read-only listing and location lookups.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Load a listing.
    async fn listing(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError>;

    /// Load a location.
    async fn location(&self, id: &LocationId) -> Result<Option<Location>, RepositoryError>;
}

/// `PostgreSQL` implementation of [`ProfileStore`] and [`ListingStore`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    email: String,
    first_name: String,
    last_name: String,
}

impl UserRow {
    fn into_user(self) -> Result<User, RepositoryError> {
        let email = Email::parse(&self.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        Ok(User {
            id: UserId::new(self.id),
            email,
            first_name: self.first_name,
            last_name: self.last_name,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    profile_id: i32,
    user_id: String,
    account_id: Option<String>,
    customer_id: Option<String>,
}

impl From<ProfileRow> for UserProfile {
    fn from(row: ProfileRow) -> Self {
        Self {
            profile_id: ProfileId::new(row.profile_id),
            user_id: UserId::new(row.user_id),
            account_id: row.account_id.map(AccountId::new),
            customer_id: row.customer_id.map(CustomerId::new),
        }
    }
}

#[derive(sqlx::FromRow)]
struct ListingRow {
    id: String,
    title: String,
    location_id: String,
}

#[derive(sqlx::FromRow)]
struct LocationRow {
    id: String,
    address1: String,
    city: String,
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn user(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, email, first_name, last_name
            FROM users
            WHERE id = $1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r"
            SELECT profile_id, user_id, account_id, customer_id
            FROM user_profiles
            WHERE user_id = $1
            ",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserProfile::from))
    }

    async fn claim_account_id(
        &self,
        profile_id: ProfileId,
        account_id: &AccountId,
    ) -> Result<bool, RepositoryError> {
        // Conditional write: the one-account-per-user invariant holds even
        // when two creates race past the directory's pre-check.
        let result = sqlx::query(
            r"
            UPDATE user_profiles
            SET account_id = $2
            WHERE profile_id = $1 AND account_id IS NULL
            ",
        )
        .bind(profile_id.as_i32())
        .bind(account_id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear_account_id(&self, profile_id: ProfileId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE user_profiles
            SET account_id = NULL
            WHERE profile_id = $1
            ",
        )
        .bind(profile_id.as_i32())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_customer_id(
        &self,
        profile_id: ProfileId,
        customer_id: &CustomerId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE user_profiles
            SET customer_id = $2
            WHERE profile_id = $1
            ",
        )
        .bind(profile_id.as_i32())
        .bind(customer_id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl ListingStore for PgStore {
    async fn listing(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError> {
        let row = sqlx::query_as::<_, ListingRow>(
            r"
            SELECT id, title, location_id
            FROM listings
            WHERE id = $1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Listing {
            id: ListingId::new(r.id),
            title: r.title,
            location_id: LocationId::new(r.location_id),
        }))
    }

    async fn location(&self, id: &LocationId) -> Result<Option<Location>, RepositoryError> {
        let row = sqlx::query_as::<_, LocationRow>(
            r"
            SELECT id, address1, city
            FROM locations
            WHERE id = $1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Location {
            id: LocationId::new(r.id),
            address1: r.address1,
            city: r.city,
        }))
    }
}
