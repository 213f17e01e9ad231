use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::centers::address;
use crate::centers::repo::{CenterRow, ReviewRow};
use crate::centers::score::{self, AccessibilityScore};
use crate::users::repo::email_local_part;

#[derive(Debug, Deserialize)]
pub struct CenterQuery {
    pub search: Option<String>,
    pub verified: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}
fn default_limit() -> i64 {
    50
}
const MAX_LIMIT: i64 = 100;

impl CenterQuery {
    /// Negative or oversized pagination values degrade to a sane page
    /// instead of reaching Postgres as invalid LIMIT/OFFSET.
    pub fn limit(&self) -> i64 {
        self.limit.clamp(0, MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.max(0)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    pub id: String,
    pub user_id: Uuid,
    pub user_name: String,
    pub center_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub rating: i32,
    pub comment: String,
}

/// Display name for a reviewer: "first last", then the email local part,
/// then a generic label for reviews whose profile sync never completed.
pub fn reviewer_name(
    first_name: Option<&str>,
    last_name: Option<&str>,
    email: Option<&str>,
) -> String {
    let full = format!(
        "{} {}",
        first_name.unwrap_or(""),
        last_name.unwrap_or("")
    );
    let full = full.trim();
    if !full.is_empty() {
        return full.to_string();
    }
    match email {
        Some(e) => email_local_part(e).to_string(),
        None => "Utilisateur".to_string(),
    }
}

impl ReviewView {
    pub fn from_row(row: ReviewRow) -> Self {
        let user_name = reviewer_name(
            row.first_name.as_deref(),
            row.last_name.as_deref(),
            row.email.as_deref(),
        );
        Self {
            id: row.id.to_string(),
            user_id: row.user_id,
            user_name,
            center_id: row.center_id.to_string(),
            date: row.created_at,
            rating: row.rating,
            comment: row.comment.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CenterView {
    pub id: String,
    pub name: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub latitude: f64,
    pub longitude: f64,
    pub phone: String,
    pub email: String,
    pub website: Option<String>,
    pub hours: String,
    #[serde(rename = "type")]
    pub center_type: String,
    pub verified_access: bool,
    pub accessibility_score: AccessibilityScore,
    pub global_score: f64,
    pub avg_rating: Option<f64>,
    pub services: Vec<String>,
    pub reviews: Vec<ReviewView>,
}

impl CenterView {
    /// Scores are derived here on every read; nothing persisted.
    pub fn from_row(row: CenterRow, reviews: Vec<ReviewView>) -> Self {
        let attrs = row.attributes();
        let accessibility_score = score::score(&attrs);
        let global_score = score::global_score(&accessibility_score, row.avg_rating);
        let services = score::services(&attrs);
        let parsed = address::parse(&row.address);

        Self {
            id: row.id.to_string(),
            name: row.name,
            address: parsed.street,
            city: parsed.city,
            postal_code: parsed.postal_code,
            latitude: row.latitude,
            longitude: row.longitude,
            phone: row.phone.unwrap_or_default(),
            email: row.email.unwrap_or_default(),
            website: row.website,
            hours: row.hours.unwrap_or_else(|| "Lun-Ven: 9h-18h".into()),
            center_type: row.center_type,
            verified_access: row.verified_access,
            accessibility_score,
            global_score,
            avg_rating: row.avg_rating,
            services,
            reviews,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(limit: i64, offset: i64) -> CenterQuery {
        CenterQuery {
            search: None,
            verified: None,
            limit,
            offset,
        }
    }

    #[test]
    fn negative_pagination_is_clamped() {
        let q = query(-5, -10);
        assert_eq!(q.limit(), 0);
        assert_eq!(q.offset(), 0);
    }

    #[test]
    fn oversized_limit_is_capped() {
        let q = query(10_000, 20);
        assert_eq!(q.limit(), 100);
        assert_eq!(q.offset(), 20);
    }

    #[test]
    fn default_pagination_passes_through() {
        let q = query(50, 0);
        assert_eq!(q.limit(), 50);
        assert_eq!(q.offset(), 0);
    }

    #[test]
    fn reviewer_name_prefers_full_name() {
        assert_eq!(
            reviewer_name(Some("Jean"), Some("Martin"), Some("jm@exemple.fr")),
            "Jean Martin"
        );
    }

    #[test]
    fn reviewer_name_falls_back_to_email_local_part() {
        assert_eq!(
            reviewer_name(None, None, Some("jean.martin@exemple.fr")),
            "jean.martin"
        );
    }

    #[test]
    fn reviewer_name_without_profile_is_generic() {
        assert_eq!(reviewer_name(None, None, None), "Utilisateur");
    }

    #[test]
    fn center_view_derives_scores_and_address() {
        let row = CenterRow {
            id: 7,
            name: "Centre de Vaccination Paris 15".into(),
            address: "12 Rue de Vaugirard, 75015 Paris".into(),
            latitude: 48.84,
            longitude: 2.30,
            phone: None,
            email: None,
            website: None,
            hours: None,
            center_type: "both".into(),
            verified_access: true,
            avg_rating: Some(5.0),
            has_ramp: true,
            has_elevator: true,
            door_width_cm: Some(90),
            has_braille_signage: true,
            has_audio_guidance: false,
            has_quiet_zone: false,
            staff_trained: false,
            website_accessible: false,
        };
        let view = CenterView::from_row(row, Vec::new());

        assert_eq!(view.id, "7");
        assert_eq!(view.address, "12 Rue de Vaugirard");
        assert_eq!(view.postal_code, "75015");
        assert_eq!(view.city, "Paris");
        assert_eq!(view.hours, "Lun-Ven: 9h-18h");
        assert_eq!(view.accessibility_score.physical, 5.0);
        assert_eq!(view.accessibility_score.digital, 0.0);
        assert_eq!(view.accessibility_score.reception, 0.0);
        // (5/3 + 5) / 2 = 3.333… rounds to 3.3
        assert_eq!(view.global_score, 3.3);
        assert_eq!(view.services.len(), 4);
    }
}
