use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::auth::extractors::AuthUser;
use crate::centers::dto::{CenterQuery, CenterView, CreateReviewRequest, ReviewView};
use crate::centers::repo::{CenterRow, ReviewRow};
use crate::centers::service;
use crate::error::ApiError;
use crate::state::AppState;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/centers", get(list_centers))
        .route("/centers/:id", get(get_center))
}

pub fn write_routes() -> Router<AppState> {
    Router::new().route("/centers/:id/reviews", post(create_review))
}

#[instrument(skip(state))]
pub async fn list_centers(
    State(state): State<AppState>,
    Query(q): Query<CenterQuery>,
) -> Result<Json<Vec<CenterView>>, ApiError> {
    let verified_only = q.verified.as_deref() == Some("true");

    let centers = CenterRow::list(
        &state.db,
        q.search.as_deref(),
        verified_only,
        q.limit(),
        q.offset(),
    )
    .await
    .map_err(|e| ApiError::dependency("Erreur lors de la récupération des centres", e))?;

    let ids: Vec<i64> = centers.iter().map(|c| c.id).collect();
    let reviews = ReviewRow::list_for_centers(&state.db, &ids)
        .await
        .map_err(|e| ApiError::dependency("Erreur lors de la récupération des centres", e))?;

    let mut by_center: HashMap<i64, Vec<ReviewView>> = HashMap::new();
    for row in reviews {
        by_center
            .entry(row.center_id)
            .or_default()
            .push(ReviewView::from_row(row));
    }

    let views = centers
        .into_iter()
        .map(|c| {
            let reviews = by_center.remove(&c.id).unwrap_or_default();
            CenterView::from_row(c, reviews)
        })
        .collect();

    Ok(Json(views))
}

#[instrument(skip(state))]
pub async fn get_center(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CenterView>, ApiError> {
    let center = CenterRow::find_by_id(&state.db, id)
        .await
        .map_err(|e| ApiError::dependency("Erreur lors de la récupération du centre", e))?
        .ok_or_else(|| ApiError::not_found("Centre non trouvé"))?;

    let reviews = ReviewRow::list_for_center(&state.db, id)
        .await
        .map_err(|e| ApiError::dependency("Erreur lors de la récupération du centre", e))?
        .into_iter()
        .map(ReviewView::from_row)
        .collect();

    Ok(Json(CenterView::from_row(center, reviews)))
}

#[instrument(skip(state, payload))]
pub async fn create_review(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ReviewView>), ApiError> {
    let review = service::submit_review(&state, id, &identity, &payload).await?;
    Ok((StatusCode::CREATED, Json(review)))
}
