use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Local user profile, keyed by the auth provider's user id. Rows are
/// created lazily on signup/login/review rather than eagerly.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub handicap_type: Option<String>,
    pub phone: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Best-available profile fields at sync time; all optional.
#[derive(Debug, Clone, Default)]
pub struct ProfileFields {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub handicap_type: Option<String>,
    pub phone: Option<String>,
}

pub fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

impl UserProfile {
    /// "first last", falling back to the email local part when both names
    /// are absent.
    pub fn display_name(&self) -> String {
        let full = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        );
        let full = full.trim();
        if full.is_empty() {
            email_local_part(&self.email).to_string()
        } else {
            full.to_string()
        }
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<UserProfile>> {
        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT id, email, first_name, last_name, handicap_type, phone, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(profile)
    }

    /// Insert-or-update keyed by id. Field values already present on the row
    /// win over absent incoming ones, so a sparse token identity never wipes
    /// a profile filled in at signup.
    pub async fn upsert(
        db: &PgPool,
        id: Uuid,
        email: &str,
        fields: &ProfileFields,
    ) -> anyhow::Result<UserProfile> {
        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            INSERT INTO users (id, email, first_name, last_name, handicap_type, phone)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                email = EXCLUDED.email,
                first_name = COALESCE(EXCLUDED.first_name, users.first_name),
                last_name = COALESCE(EXCLUDED.last_name, users.last_name),
                handicap_type = COALESCE(EXCLUDED.handicap_type, users.handicap_type),
                phone = COALESCE(EXCLUDED.phone, users.phone),
                updated_at = NOW()
            RETURNING id, email, first_name, last_name, handicap_type, phone, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(&fields.first_name)
        .bind(&fields.last_name)
        .bind(&fields.handicap_type)
        .bind(&fields.phone)
        .fetch_one(db)
        .await?;
        Ok(profile)
    }

    /// Partial update; None leaves the column unchanged.
    pub async fn update(
        db: &PgPool,
        id: Uuid,
        fields: &ProfileFields,
    ) -> anyhow::Result<Option<UserProfile>> {
        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                handicap_type = COALESCE($4, handicap_type),
                phone = COALESCE($5, phone),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, first_name, last_name, handicap_type, phone, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&fields.first_name)
        .bind(&fields.last_name)
        .bind(&fields.handicap_type)
        .bind(&fields.phone)
        .fetch_optional(db)
        .await?;
        Ok(profile)
    }
}
