//! Core behaviors behind the HTTP handlers.
//!
//! This includes:
//!   - Checking a translation (exact match, oracle grading, local fallback)
//!   - Ranking acceptable translations by closeness for the diff display
//!   - Standalone diffs between two texts

use tracing::{debug, error, info, instrument};

use crate::diff::{align, is_exact_match, rank_by_closeness, RankedCandidate, Side};
use crate::domain::Direction;
use crate::error::ApiError;
use crate::openai::EvaluationRequest;
use crate::protocol::{CheckOut, DiffOut};
use crate::state::AppState;
use crate::util::trunc_for_log;

/// Best score the local heuristic will hand out; 10 is reserved for exact matches.
const LOCAL_MAX_SCORE: f32 = 9.0;

#[instrument(level = "info", skip(state, translation), fields(answer_len = translation.len()))]
pub async fn check_translation(
  state: &AppState,
  sentence_id: Option<u32>,
  translation: &str,
  direction: Direction,
) -> Result<CheckOut, ApiError> {
  let answer = translation.trim();
  let sentence_id = match sentence_id {
    Some(id) if !answer.is_empty() => id,
    _ => return Err(ApiError::BadRequest("Sentence ID and translation are required".into())),
  };

  let sentence = state
    .sentence(sentence_id)
    .await
    .ok_or_else(|| ApiError::NotFound("Sentence not found".into()))?;

  if is_exact_match(answer, sentence.accepted_texts(direction)) {
    info!(target: "check", %sentence_id, "Exact match");
    return Ok(CheckOut {
      overall_score: 10.0,
      concept_score: 10.0,
      explanation: "Perfect match! Your translation exactly matches one of the accepted translations.".into(),
      is_exact_match: true,
      ..CheckOut::default()
    });
  }

  let references = sentence.references(direction);
  let ranked = rank_by_closeness(answer, &references);
  let acceptable_translations: Vec<String> = references.iter().map(|r| r.to_string()).collect();
  let closest_match = ranked.first().map(|r| r.candidate_text.clone());
  debug!(target: "check", %sentence_id, answer = %trunc_for_log(answer, 80), closest = ?closest_match, "Ranked acceptable translations");

  let Some(oa) = &state.openai else {
    let (score, explanation) = local_verdict(&ranked);
    info!(target: "check", %sentence_id, score, "Scored locally (no oracle)");
    return Ok(CheckOut {
      overall_score: score,
      concept_score: score,
      explanation,
      is_exact_match: false,
      missing_topics: Vec::new(),
      acceptable_translations,
      closest_match,
      translations_with_diffs: ranked,
    });
  };

  let concept = state.concept(sentence.concept_id).await;
  let target_language = match concept.as_ref() {
    Some(c) => state
      .pair(c.language_pair_id)
      .await
      .map(|p| match direction {
        Direction::FromTo => p.to_language.name,
        Direction::ToFrom => p.from_language.name,
      })
      .unwrap_or_default(),
    None => String::new(),
  };
  let (concept_name, concept_description) = concept
    .map(|c| (c.name, c.description))
    .unwrap_or_default();

  let req = EvaluationRequest {
    source: sentence.prompt(direction),
    canonical: sentence.canonical_answer(direction),
    answer,
    target_language: &target_language,
    concept: &concept_name,
    concept_description: &concept_description,
  };

  match oa.evaluate_translation(&state.prompts, &req).await {
    Ok(ev) => {
      info!(target: "check", %sentence_id, overall = ev.overall_score, concept = ev.concept_score, "Scored by oracle");
      Ok(CheckOut {
        overall_score: ev.overall_score,
        concept_score: ev.concept_score,
        explanation: ev.explanation,
        is_exact_match: false,
        missing_topics: ev.missing_topics,
        acceptable_translations,
        closest_match,
        translations_with_diffs: ranked,
      })
    }
    Err(e) => {
      error!(target: "check", %sentence_id, error = %e, "Oracle evaluation failed; reporting zero score");
      Ok(CheckOut {
        explanation: "Your translation could not be evaluated right now. Please try again later.".into(),
        ..CheckOut::default()
      })
    }
  }
}

/// Diff two arbitrary texts; both sides are returned so either can be painted.
#[instrument(level = "debug", skip_all, fields(reference_len = reference.len(), candidate_len = candidate.len()))]
pub fn diff_texts(reference: &str, candidate: &str) -> DiffOut {
  let alignment = align(reference, candidate);
  DiffOut {
    reference: alignment.view(Side::Reference),
    candidate: alignment.view(Side::Candidate),
    distance: alignment.distance(),
  }
}

// -------- Local fallback --------

/// Score from the closest match: the share of characters left untouched, on a 0..=9 scale.
fn local_verdict(ranked: &[RankedCandidate]) -> (f32, String) {
  let Some(best) = ranked.first() else {
    return (0.0, "(local) No reference translation to compare with.".into());
  };
  let longest = best.diff.text.chars().count().max(best.user_diff.text.chars().count()).max(1);
  let kept = 1.0 - (best.edited_chars as f32 / longest as f32).min(1.0);
  let score = (kept * 10.0).round().min(LOCAL_MAX_SCORE);

  let spans = best.distance;
  let explanation = format!(
    "(local) Closest accepted translation: \"{}\". {} difference{} found.",
    best.candidate_text,
    spans,
    if spans == 1 { "" } else { "s" },
  );
  (score, explanation)
}
