use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::centers::score::AccessibilityAttributes;

/// A center row joined with its raw accessibility attribute columns.
#[derive(Debug, Clone, FromRow)]
pub struct CenterRow {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub hours: Option<String>,
    #[sqlx(rename = "type")]
    pub center_type: String,
    pub verified_access: bool,
    pub avg_rating: Option<f64>,
    pub has_ramp: bool,
    pub has_elevator: bool,
    pub door_width_cm: Option<i32>,
    pub has_braille_signage: bool,
    pub has_audio_guidance: bool,
    pub has_quiet_zone: bool,
    pub staff_trained: bool,
    pub website_accessible: bool,
}

impl CenterRow {
    pub fn attributes(&self) -> AccessibilityAttributes {
        AccessibilityAttributes {
            has_ramp: self.has_ramp,
            has_elevator: self.has_elevator,
            door_width_cm: self.door_width_cm,
            has_braille_signage: self.has_braille_signage,
            has_audio_guidance: self.has_audio_guidance,
            has_quiet_zone: self.has_quiet_zone,
            staff_trained: self.staff_trained,
            website_accessible: self.website_accessible,
        }
    }
}

const CENTER_COLUMNS: &str = r#"
    id, name, address, latitude, longitude, phone, email, website, hours,
    type, verified_access, avg_rating,
    has_ramp, has_elevator, door_width_cm, has_braille_signage,
    has_audio_guidance, has_quiet_zone, staff_trained, website_accessible
"#;

impl CenterRow {
    pub async fn list(
        db: &PgPool,
        search: Option<&str>,
        verified_only: bool,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<CenterRow>> {
        let pattern = search.map(|s| format!("%{}%", s));
        let rows = sqlx::query_as::<_, CenterRow>(&format!(
            r#"
            SELECT {CENTER_COLUMNS}
            FROM centers
            WHERE ($1::text IS NULL OR name ILIKE $1 OR address ILIKE $1)
              AND (NOT $2 OR verified_access)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(pattern)
        .bind(verified_only)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn find_by_id(db: &PgPool, id: i64) -> anyhow::Result<Option<CenterRow>> {
        let row = sqlx::query_as::<_, CenterRow>(&format!(
            r#"
            SELECT {CENTER_COLUMNS}
            FROM centers
            WHERE id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn exists(db: &PgPool, id: i64) -> anyhow::Result<bool> {
        let found: Option<(i64,)> = sqlx::query_as("SELECT id FROM centers WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(found.is_some())
    }
}

/// A review joined with the author's profile fields for display. The join is
/// a LEFT JOIN: a review whose profile sync failed still shows up.
#[derive(Debug, Clone, FromRow)]
pub struct ReviewRow {
    pub id: i64,
    pub center_id: i64,
    pub user_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: OffsetDateTime,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

/// A freshly inserted review, before any profile join.
#[derive(Debug, Clone, FromRow)]
pub struct NewReview {
    pub id: i64,
    pub center_id: i64,
    pub user_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: OffsetDateTime,
}

const REVIEW_SELECT: &str = r#"
    SELECT r.id, r.center_id, r.user_id, r.rating, r.comment, r.created_at,
           u.first_name, u.last_name, u.email
    FROM reviews r
    LEFT JOIN users u ON u.id = r.user_id
"#;

impl ReviewRow {
    pub async fn list_for_centers(
        db: &PgPool,
        center_ids: &[i64],
    ) -> anyhow::Result<Vec<ReviewRow>> {
        if center_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, ReviewRow>(&format!(
            r#"
            {REVIEW_SELECT}
            WHERE r.center_id = ANY($1)
            ORDER BY r.created_at DESC
            "#
        ))
        .bind(center_ids)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn list_for_center(db: &PgPool, center_id: i64) -> anyhow::Result<Vec<ReviewRow>> {
        let rows = sqlx::query_as::<_, ReviewRow>(&format!(
            r#"
            {REVIEW_SELECT}
            WHERE r.center_id = $1
            ORDER BY r.created_at DESC
            "#
        ))
        .bind(center_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}

// Full recompute over every review of the center, not an incremental
// update, so a concurrent committed insert is always reflected and no
// floating-point drift accumulates across submissions.
const REFRESH_AVERAGE_SQL: &str = r#"
    UPDATE centers
    SET avg_rating = (
            SELECT AVG(rating)::double precision
            FROM reviews
            WHERE center_id = $1
        ),
        updated_at = NOW()
    WHERE id = $1
"#;

impl NewReview {
    /// Inserts the review and refreshes the center's running average in one
    /// transaction.
    pub async fn insert_and_refresh_average(
        db: &PgPool,
        center_id: i64,
        user_id: Uuid,
        rating: i32,
        comment: Option<&str>,
    ) -> anyhow::Result<NewReview> {
        let mut tx = db.begin().await?;

        let review = sqlx::query_as::<_, NewReview>(
            r#"
            INSERT INTO reviews (center_id, user_id, rating, comment)
            VALUES ($1, $2, $3, $4)
            RETURNING id, center_id, user_id, rating, comment, created_at
            "#,
        )
        .bind(center_id)
        .bind(user_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(REFRESH_AVERAGE_SQL)
            .bind(center_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(review)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The mean the refresh statement computes, expressed in Rust.
    fn full_recompute(ratings: &[i32]) -> Option<f64> {
        if ratings.is_empty() {
            return None;
        }
        Some(ratings.iter().sum::<i32>() as f64 / ratings.len() as f64)
    }

    #[test]
    fn average_is_recomputed_from_all_reviews() {
        let mut ratings = vec![5, 3, 4];
        assert_eq!(full_recompute(&ratings), Some(4.0));

        ratings.push(2);
        assert_eq!(full_recompute(&ratings), Some(3.5));

        // A stale incremental update over the pre-insert count would land
        // elsewhere; the aggregate over all four rows must win.
        let stale = (4.0 * 2.0 + 2.0) / 3.0;
        assert_ne!(Some(stale), full_recompute(&ratings));
    }

    #[test]
    fn no_reviews_means_no_average() {
        assert_eq!(full_recompute(&[]), None);
    }

    #[test]
    fn refresh_statement_aggregates_over_the_whole_center() {
        assert!(REFRESH_AVERAGE_SQL.contains("AVG(rating)"));
        assert!(REFRESH_AVERAGE_SQL.contains("FROM reviews"));
        assert!(REFRESH_AVERAGE_SQL.contains("WHERE center_id = $1"));
        // Single statement keyed on one center parameter for both the
        // aggregate and the updated row.
        assert_eq!(REFRESH_AVERAGE_SQL.matches("$1").count(), 2);
        assert!(!REFRESH_AVERAGE_SQL.contains("avg_rating +"));
    }
}
