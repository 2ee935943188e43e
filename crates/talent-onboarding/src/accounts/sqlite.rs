use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::domain::{AdminAccount, AdminId, CompletedRegistration, UserAccount};
use super::repository::CredentialStore;
use crate::auth::UserId;
use crate::store::RepositoryError;

const USER_COLUMNS: &str = "id, email, email_verified, verification_code, verification_expiry, \
     password_hash, full_name, username, phone_number, position, created_at";

const ADMIN_COLUMNS: &str = "id, username, email, password_hash, full_name, role, is_active, \
     last_login, deleted, created_at";

/// `CredentialStore` backed by the `users` and `admins` tables.
#[derive(Clone)]
pub struct SqliteCredentialStore {
    pool: SqlitePool,
}

impl SqliteCredentialStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &SqliteRow) -> Result<UserAccount, sqlx::Error> {
    Ok(UserAccount {
        id: UserId(row.try_get("id")?),
        email: row.try_get("email")?,
        email_verified: row.try_get("email_verified")?,
        verification_code: row.try_get("verification_code")?,
        verification_expiry: row.try_get("verification_expiry")?,
        password_hash: row.try_get("password_hash")?,
        full_name: row.try_get("full_name")?,
        username: row.try_get("username")?,
        phone_number: row.try_get("phone_number")?,
        position: row.try_get("position")?,
        created_at: row.try_get("created_at")?,
    })
}

fn admin_from_row(row: &SqliteRow) -> Result<AdminAccount, sqlx::Error> {
    Ok(AdminAccount {
        id: AdminId(row.try_get("id")?),
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        full_name: row.try_get("full_name")?,
        role: row.try_get("role")?,
        is_active: row.try_get("is_active")?,
        last_login: row.try_get("last_login")?,
        deleted: row.try_get("deleted")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserAccount>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn find_user(&self, id: UserId) -> Result<Option<UserAccount>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn stage_verification(
        &self,
        email: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO users (email, verification_code, verification_expiry, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (email) DO UPDATE SET
                verification_code = excluded.verification_code,
                verification_expiry = excluded.verification_expiry,
                email_verified = 0
            "#,
        )
        .bind(email)
        .bind(code)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_verified(&self, email: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email_verified = 1, verification_code = NULL, verification_expiry = NULL
            WHERE email = ?
            "#,
        )
        .bind(email)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn complete_registration(
        &self,
        registration: CompletedRegistration,
    ) -> Result<UserAccount, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = ?, full_name = ?, username = ?, phone_number = ?, position = ?
            WHERE email = ? AND email_verified = 1 AND password_hash IS NULL
            "#,
        )
        .bind(&registration.password_hash)
        .bind(&registration.full_name)
        .bind(&registration.username)
        .bind(&registration.phone_number)
        .bind(&registration.position)
        .bind(&registration.email)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.find_user_by_email(&registration.email)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_admin_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AdminAccount>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admins WHERE username = ? AND deleted = 0"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(admin_from_row).transpose()?)
    }

    async fn find_admin(&self, id: &AdminId) -> Result<Option<AdminAccount>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admins WHERE id = ? AND deleted = 0"
        ))
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(admin_from_row).transpose()?)
    }

    async fn insert_admin(&self, admin: AdminAccount) -> Result<AdminAccount, RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO admins
                (id, username, email, password_hash, full_name, role, is_active, deleted, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&admin.id.0)
        .bind(&admin.username)
        .bind(&admin.email)
        .bind(&admin.password_hash)
        .bind(&admin.full_name)
        .bind(&admin.role)
        .bind(admin.is_active)
        .bind(admin.deleted)
        .bind(admin.created_at)
        .execute(&self.pool)
        .await?;
        Ok(admin)
    }

    async fn touch_admin_login(
        &self,
        id: &AdminId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE admins SET last_login = ? WHERE id = ?")
            .bind(at)
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
