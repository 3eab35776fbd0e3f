//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::diff::{DiffResult, RankedCandidate};
use crate::domain::{Direction, Language, LanguagePair};
use crate::state::PairView;

/// DTO for a language pair with both languages inlined.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguagePairOut {
    pub id: u32,
    pub from_language_id: u32,
    pub to_language_id: u32,
    pub from_language: Language,
    pub to_language: Language,
}

impl From<PairView> for LanguagePairOut {
    fn from(v: PairView) -> Self {
        let LanguagePair { id, from_language_id, to_language_id } = v.pair;
        Self {
            id,
            from_language_id,
            to_language_id,
            from_language: v.from_language,
            to_language: v.to_language,
        }
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptsQuery {
    pub language_pair_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RandomSentenceQuery {
    pub concept_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckIn {
    pub sentence_id: Option<u32>,
    #[serde(default)]
    pub translation: String,
    #[serde(default)]
    pub direction: Direction,
}

/// Feedback for one submitted translation. Scores are 0..=10.
#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CheckOut {
    pub overall_score: f32,
    pub concept_score: f32,
    pub explanation: String,
    pub is_exact_match: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_topics: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub acceptable_translations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closest_match: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub translations_with_diffs: Vec<RankedCandidate>,
}

#[derive(Debug, Deserialize)]
pub struct DiffIn {
    pub reference: String,
    pub candidate: String,
}

#[derive(Debug, Serialize)]
pub struct DiffOut {
    pub reference: DiffResult,
    pub candidate: DiffResult,
    pub distance: usize,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub oracle: bool,
}
