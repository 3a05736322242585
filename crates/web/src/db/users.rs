//! User repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use hocskin_core::{Email, UserId};

use super::{Page, RepositoryError, count_from_db, like_pattern, map_unique_violation, page_bounds};
use crate::models::user::{AccountUpdate, AdminUserUpdate, ProfileUpdate, User};

const USER_COLUMNS: &str = "id, username, email, age, gender, skin_type, skin_concerns, \
     allergies, is_active, is_admin, created_at, last_login";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    username: String,
    email: String,
    age: Option<i64>,
    gender: Option<String>,
    skin_type: Option<String>,
    skin_concerns: Option<String>,
    allergies: Option<String>,
    is_active: bool,
    is_admin: bool,
    created_at: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&r.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let age = r.age.map(|a| count_from_db(a, "age")).transpose()?;

        Ok(Self {
            id: r.id,
            username: r.username,
            email,
            age,
            gender: r.gender,
            skin_type: r.skin_type,
            skin_concerns: r.skin_concerns,
            allergies: r.allergies,
            is_active: r.is_active,
            is_admin: r.is_admin,
            created_at: r.created_at,
            last_login: r.last_login,
        })
    }
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user by username.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user and their password hash for login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let Some(user) = self.get_by_email(email).await? else {
            return Ok(None);
        };

        let hash: String = sqlx::query_scalar("SELECT password_hash FROM users WHERE id = ?")
            .bind(user.id)
            .fetch_one(self.pool)
            .await?;

        Ok(Some((user, hash)))
    }

    /// Create a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` naming the column (`username` or
    /// `email`) if either is already taken.
    pub async fn create(
        &self,
        username: &str,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (username, email, password_hash, created_at) \
             VALUES (?, ?, ?, ?) RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .bind(email.as_str())
        .bind(password_hash)
        .bind(Utc::now())
        .fetch_one(self.pool)
        .await
        .map_err(map_unique_violation)?;

        User::try_from(row)
    }

    /// Record a successful login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn record_login(&self, id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Update the skin-profile fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn update_profile(
        &self,
        id: UserId,
        profile: &ProfileUpdate,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET age = ?, gender = ?, skin_type = ?, skin_concerns = ?, allergies = ? \
             WHERE id = ?",
        )
        .bind(profile.age.map(i64::from))
        .bind(profile.gender.as_deref())
        .bind(profile.skin_type.as_deref())
        .bind(profile.skin_concerns.as_deref())
        .bind(profile.allergies.as_deref())
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Update identity, profile, and optionally the password.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the new username or email is taken.
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn update_account(
        &self,
        id: UserId,
        update: &AccountUpdate,
    ) -> Result<(), RepositoryError> {
        let p = &update.profile;
        let result = sqlx::query(
            "UPDATE users SET username = ?, email = ?, age = ?, gender = ?, skin_type = ?, \
             skin_concerns = ?, allergies = ?, password_hash = COALESCE(?, password_hash) \
             WHERE id = ?",
        )
        .bind(&update.username)
        .bind(update.email.as_str())
        .bind(p.age.map(i64::from))
        .bind(p.gender.as_deref())
        .bind(p.skin_type.as_deref())
        .bind(p.skin_concerns.as_deref())
        .bind(p.allergies.as_deref())
        .bind(update.password_hash.as_deref())
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(map_unique_violation)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Admin update, including the activity and admin flags.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the new username or email is taken.
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn admin_update(
        &self,
        id: UserId,
        update: &AdminUserUpdate,
    ) -> Result<(), RepositoryError> {
        let p = &update.profile;
        let result = sqlx::query(
            "UPDATE users SET username = ?, email = ?, age = ?, gender = ?, skin_type = ?, \
             skin_concerns = ?, allergies = ?, is_active = ?, is_admin = ? WHERE id = ?",
        )
        .bind(&update.username)
        .bind(update.email.as_str())
        .bind(p.age.map(i64::from))
        .bind(p.gender.as_deref())
        .bind(p.skin_type.as_deref())
        .bind(p.skin_concerns.as_deref())
        .bind(p.allergies.as_deref())
        .bind(update.is_active)
        .bind(update.is_admin)
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(map_unique_violation)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Set or clear the admin flag by email. Returns whether a user matched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn set_admin(&self, email: &Email, is_admin: bool) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE users SET is_admin = ? WHERE email = ?")
            .bind(is_admin)
            .bind(email.as_str())
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a user together with their analyses and recommendations.
    ///
    /// Returns the image paths of the deleted analyses so the caller can
    /// remove the files.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn delete(&self, id: UserId) -> Result<Vec<String>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let image_paths: Vec<String> =
            sqlx::query_scalar("SELECT image_path FROM analyses WHERE user_id = ?")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(image_paths)
    }

    /// List users newest first, optionally filtered by a case-insensitive
    /// substring of username or email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, search: Option<&str>, page: u32) -> Result<Page<User>, RepositoryError> {
        let (page, limit, offset) = page_bounds(page);
        let pattern = search.map(str::trim).filter(|s| !s.is_empty()).map(like_pattern);

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM users");
        push_search(&mut count, pattern.as_deref());
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(self.pool).await?;

        let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {USER_COLUMNS} FROM users"));
        push_search(&mut select, pattern.as_deref());
        select.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        select.push_bind(limit);
        select.push(" OFFSET ");
        select.push_bind(offset);

        let rows: Vec<UserRow> = select.build_query_as::<UserRow>().fetch_all(self.pool).await?;
        let items = rows
            .into_iter()
            .map(User::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            page,
            per_page: super::PAGE_SIZE,
            total,
        })
    }

    /// Total number of users.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool)
            .await?)
    }

    /// Number of active users.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_active(&self) -> Result<i64, RepositoryError> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_active = 1")
            .fetch_one(self.pool)
            .await?)
    }
}

fn push_search(builder: &mut QueryBuilder<'_, Sqlite>, pattern: Option<&str>) {
    if let Some(pattern) = pattern {
        builder.push(" WHERE (username LIKE ");
        builder.push_bind(pattern.to_owned());
        builder.push(" ESCAPE '\\' OR email LIKE ");
        builder.push_bind(pattern.to_owned());
        builder.push(" ESCAPE '\\')");
    }
}
