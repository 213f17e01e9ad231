//! Review submission: validation, lazy profile sync, then the transactional
//! insert-plus-average-refresh.

use tracing::warn;

use crate::auth::provider::AuthIdentity;
use crate::centers::dto::{CreateReviewRequest, ReviewView};
use crate::centers::repo::{CenterRow, NewReview};
use crate::error::ApiError;
use crate::state::AppState;
use crate::users::repo::{email_local_part, ProfileFields, UserProfile};

pub fn validate_rating(rating: i32) -> Result<(), ApiError> {
    if !(1..=5).contains(&rating) {
        return Err(ApiError::validation("Rating doit être entre 1 et 5"));
    }
    Ok(())
}

/// Submits a review for a center. Validation and the center existence check
/// happen before any write. The profile upsert keeps the review's author
/// resolvable even for users who authenticated but were never synchronized;
/// its failure is logged and tolerated, the review is still recorded.
pub async fn submit_review(
    state: &AppState,
    center_id: i64,
    identity: &AuthIdentity,
    payload: &CreateReviewRequest,
) -> Result<ReviewView, ApiError> {
    validate_rating(payload.rating)?;

    let exists = CenterRow::exists(&state.db, center_id)
        .await
        .map_err(|e| ApiError::dependency("Erreur lors de la création de l'avis", e))?;
    if !exists {
        return Err(ApiError::not_found("Centre non trouvé"));
    }

    let profile = match UserProfile::upsert(
        &state.db,
        identity.user_id,
        &identity.email,
        &ProfileFields::default(),
    )
    .await
    {
        Ok(p) => Some(p),
        Err(e) => {
            warn!(error = %e, user_id = %identity.user_id, "profile sync failed; continuing");
            None
        }
    };

    let review = NewReview::insert_and_refresh_average(
        &state.db,
        center_id,
        identity.user_id,
        payload.rating,
        payload.comment.as_deref(),
    )
    .await
    .map_err(|e| ApiError::dependency("Erreur lors de la création de l'avis", e))?;

    let user_name = match &profile {
        Some(p) => p.display_name(),
        None => email_local_part(&identity.email).to_string(),
    };

    Ok(ReviewView {
        id: review.id.to_string(),
        user_id: review.user_id,
        user_name,
        center_id: review.center_id.to_string(),
        date: review.created_at,
        rating: review.rating,
        comment: review.comment.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratings_one_through_five_are_accepted() {
        for r in 1..=5 {
            assert!(validate_rating(r).is_ok(), "rating {} should pass", r);
        }
    }

    #[test]
    fn out_of_range_ratings_are_rejected() {
        for r in [0, 6, -1, 42] {
            let err = validate_rating(r).unwrap_err();
            assert!(matches!(err, ApiError::Validation(_)), "rating {}", r);
        }
    }
}
