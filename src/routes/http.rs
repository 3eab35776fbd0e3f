//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs its parameters and basic result info.

use std::sync::Arc;

use axum::{
  extract::{Query, State},
  response::IntoResponse,
  Json,
};
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::logic::{check_translation, diff_texts};
use crate::protocol::*;
use crate::state::AppState;

/// Required numeric query parameter; missing or non-numeric is a 400.
fn require_id(raw: Option<&str>, what: &str) -> Result<u32, ApiError> {
  raw
    .and_then(|v| v.trim().parse::<u32>().ok())
    .ok_or_else(|| ApiError::BadRequest(format!("{what} is required")))
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, oracle: state.openai.is_some() })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_language_pairs(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let pairs: Vec<LanguagePairOut> = state.language_pairs().await.into_iter().map(Into::into).collect();
  info!(target: "parla_backend", count = pairs.len(), "HTTP language pairs served");
  Json(pairs)
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_concepts(
  State(state): State<Arc<AppState>>,
  Query(q): Query<ConceptsQuery>,
) -> Result<impl IntoResponse, ApiError> {
  let pair_id = require_id(q.language_pair_id.as_deref(), "Language pair ID")?;
  let concepts = state.concepts_for_pair(pair_id).await;
  info!(target: "parla_backend", %pair_id, count = concepts.len(), "HTTP concepts served");
  Ok(Json(concepts))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_random_sentence(
  State(state): State<Arc<AppState>>,
  Query(q): Query<RandomSentenceQuery>,
) -> Result<impl IntoResponse, ApiError> {
  let concept_id = require_id(q.concept_id.as_deref(), "Concept ID")?;
  let sentence = state
    .random_sentence(concept_id)
    .await
    .ok_or_else(|| ApiError::NotFound("No sentences found for this concept".into()))?;
  info!(target: "parla_backend", %concept_id, id = sentence.id, "HTTP random sentence served");
  Ok(Json(sentence))
}

#[instrument(level = "info", skip(state, body), fields(sentence_id = ?body.sentence_id, answer_len = body.translation.len()))]
pub async fn http_post_check_translation(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CheckIn>,
) -> Result<impl IntoResponse, ApiError> {
  let out = check_translation(&state, body.sentence_id, &body.translation, body.direction).await?;
  info!(
    target: "check",
    exact = out.is_exact_match,
    overall = out.overall_score,
    concept = out.concept_score,
    "HTTP check_translation evaluated"
  );
  Ok(Json(out))
}

#[instrument(level = "info", skip(body), fields(reference_len = body.reference.len(), candidate_len = body.candidate.len()))]
pub async fn http_post_diff(Json(body): Json<DiffIn>) -> impl IntoResponse {
  Json(diff_texts(&body.reference, &body.candidate))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn require_id_parses_or_rejects() {
    assert_eq!(require_id(Some(" 7 "), "X").unwrap(), 7);
    assert!(matches!(require_id(None, "X"), Err(ApiError::BadRequest(_))));
    assert!(matches!(require_id(Some("abc"), "X"), Err(ApiError::BadRequest(_))));
  }
}
