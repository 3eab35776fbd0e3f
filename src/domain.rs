//! Domain models used by the backend: languages, pairs, grammatical concepts, sentences.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Language {
  pub id: u32,
  pub name: String,
  pub code: String,
}

/// A practice direction between two languages (e.g. English -> Spanish).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguagePair {
  pub id: u32,
  pub from_language_id: u32,
  pub to_language_id: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrammaticalConcept {
  pub id: u32,
  pub name: String,
  #[serde(default)]
  pub description: String,
  pub language_pair_id: u32,
}

/// An alternate translation, recorded for both directions.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AcceptableTranslation {
  #[serde(default)] pub from_to_text: Option<String>,
  #[serde(default)] pub to_from_text: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sentence {
  pub id: u32,
  pub concept_id: u32,
  pub canonical_from: String,
  pub canonical_to: String,
  #[serde(default)]
  pub acceptable_translations: Vec<AcceptableTranslation>,
}

/// Which canonical is shown to the learner and which one is expected back.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
  /// Prompt = `canonical_from`, answer = `canonical_to`.
  #[default]
  FromTo,
  ToFrom,
}

impl Sentence {
  pub fn prompt(&self, direction: Direction) -> &str {
    match direction {
      Direction::FromTo => &self.canonical_from,
      Direction::ToFrom => &self.canonical_to,
    }
  }

  pub fn canonical_answer(&self, direction: Direction) -> &str {
    match direction {
      Direction::FromTo => &self.canonical_to,
      Direction::ToFrom => &self.canonical_from,
    }
  }

  /// Canonical answer first, then the alternates recorded for `direction`.
  pub fn references(&self, direction: Direction) -> Vec<&str> {
    let mut out = vec![self.canonical_answer(direction)];
    for alt in &self.acceptable_translations {
      let text = match direction {
        Direction::FromTo => alt.from_to_text.as_deref(),
        Direction::ToFrom => alt.to_from_text.as_deref(),
      };
      if let Some(t) = text.filter(|t| !t.trim().is_empty()) {
        out.push(t);
      }
    }
    out
  }

  /// Every text that counts as an exact match: the canonical answer plus
  /// alternates in either direction.
  pub fn accepted_texts(&self, direction: Direction) -> impl Iterator<Item = &str> {
    std::iter::once(self.canonical_answer(direction)).chain(
      self.acceptable_translations
        .iter()
        .flat_map(|a| [a.from_to_text.as_deref(), a.to_from_text.as_deref()])
        .flatten(),
    )
  }
}
