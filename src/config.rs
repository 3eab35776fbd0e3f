//! Loading configuration: prompts + optional catalog from TOML, scoring oracle from env.
//!
//! See `AgentConfig`, `Prompts` and `CatalogCfg` for the expected TOML schema.

use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::domain::{AcceptableTranslation, GrammaticalConcept, Language, LanguagePair, Sentence};
use crate::seeds::Catalog;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {path}: {source}")]
  Io { path: String, #[source] source: std::io::Error },
  #[error("failed to parse {path}: {source}")]
  Parse { path: String, #[source] source: toml::de::Error },
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AgentConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub catalog: Option<CatalogCfg>,
}

/// Prompts sent to the scoring oracle. Placeholders in braces are filled per request:
/// `{source}`, `{canonical}`, `{answer}`, `{target_language}`, `{concept}`, `{concept_description}`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub evaluation_system: String,
  pub evaluation_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      evaluation_system: "You are a language learning assistant evaluating a translation. Respond ONLY with strict JSON.".into(),
      evaluation_user_template: "Original sentence: \"{source}\"\nCanonical translation: \"{canonical}\"\nUser's translation: \"{answer}\"\nTarget language: {target_language}\nGrammatical concept being tested: \"{concept}\"\nConcept description: \"{concept_description}\"\n\nEvaluate the translation and return a JSON object with these exact keys:\n{\"overallScore\": number 0-10, \"conceptScore\": number 0-10, \"explanation\": string, \"missingTopics\": [string]}\n'missingTopics' lists grammar topics the learner should review (may be empty).".into(),
    }
  }
}

/// Catalog section of the TOML file. Replaces the built-in seeds when it has languages.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct CatalogCfg {
  #[serde(default)] pub languages: Vec<LanguageCfg>,
  #[serde(default)] pub pairs: Vec<PairCfg>,
  #[serde(default)] pub concepts: Vec<ConceptCfg>,
  #[serde(default)] pub sentences: Vec<SentenceCfg>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LanguageCfg {
  pub id: u32,
  pub name: String,
  pub code: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PairCfg {
  pub id: u32,
  pub from: u32,
  pub to: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ConceptCfg {
  pub id: u32,
  pub pair: u32,
  pub name: String,
  #[serde(default)] pub description: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SentenceCfg {
  pub id: u32,
  pub concept: u32,
  pub from: String,
  pub to: String,
  #[serde(default)] pub alternates: Vec<AlternateCfg>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AlternateCfg {
  #[serde(default)] pub from_to: Option<String>,
  #[serde(default)] pub to_from: Option<String>,
}

impl CatalogCfg {
  /// Build a catalog, skipping entries that point at unknown ids.
  pub fn into_catalog(self) -> Catalog {
    let languages: Vec<Language> = self.languages.into_iter()
      .map(|l| Language { id: l.id, name: l.name, code: l.code })
      .collect();

    let mut pairs = Vec::new();
    for p in self.pairs {
      let known = |id: u32| languages.iter().any(|l| l.id == id);
      if !known(p.from) || !known(p.to) {
        error!(target: "parla_backend", pair = p.id, "Skipping pair: unknown language id.");
        continue;
      }
      pairs.push(LanguagePair { id: p.id, from_language_id: p.from, to_language_id: p.to });
    }

    let mut concepts = Vec::new();
    for c in self.concepts {
      if !pairs.iter().any(|p| p.id == c.pair) {
        error!(target: "parla_backend", concept = c.id, pair = c.pair, "Skipping concept: unknown pair id.");
        continue;
      }
      concepts.push(GrammaticalConcept { id: c.id, name: c.name, description: c.description, language_pair_id: c.pair });
    }

    let mut sentences = Vec::new();
    for s in self.sentences {
      if !concepts.iter().any(|c| c.id == s.concept) {
        error!(target: "parla_backend", sentence = s.id, concept = s.concept, "Skipping sentence: unknown concept id.");
        continue;
      }
      if s.from.trim().is_empty() || s.to.trim().is_empty() {
        error!(target: "parla_backend", sentence = s.id, "Skipping sentence: empty canonical text.");
        continue;
      }
      let acceptable_translations = s.alternates.into_iter()
        .map(|a| AcceptableTranslation { from_to_text: a.from_to, to_from_text: a.to_from })
        .collect();
      sentences.push(Sentence {
        id: s.id,
        concept_id: s.concept,
        canonical_from: s.from,
        canonical_to: s.to,
        acceptable_translations,
      });
    }

    Catalog { languages, pairs, concepts, sentences }
  }
}

pub fn parse_agent_config(path: &str, raw: &str) -> Result<AgentConfig, ConfigError> {
  toml::from_str::<AgentConfig>(raw).map_err(|source| ConfigError::Parse { path: path.to_string(), source })
}

pub fn load_agent_config(path: &str) -> Result<AgentConfig, ConfigError> {
  let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_string(), source })?;
  parse_agent_config(path, &raw)
}

/// Attempt to load `AgentConfig` from PARLA_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_agent_config_from_env() -> Option<AgentConfig> {
  let path = std::env::var("PARLA_CONFIG_PATH").ok()?;
  match load_agent_config(&path) {
    Ok(cfg) => {
      info!(target: "parla_backend", %path, "Loaded agent config (TOML)");
      Some(cfg)
    }
    Err(e) => {
      error!(target: "parla_backend", %path, error = %e, "Failed to load TOML config");
      None
    }
  }
}

/// Explicit settings for the scoring oracle (OpenAI-compatible chat completions).
#[derive(Clone, Debug)]
pub struct OracleConfig {
  pub api_key: String,
  pub base_url: String,
  pub model: String,
  pub timeout_secs: u64,
}

impl OracleConfig {
  /// Read OPENAI_API_KEY / OPENAI_BASE_URL / OPENAI_MODEL / OPENAI_TIMEOUT_SECS.
  /// No API key means no oracle.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url = std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
    let timeout_secs = match std::env::var("OPENAI_TIMEOUT_SECS") {
      Ok(v) => v.parse::<u64>().unwrap_or_else(|_| {
        warn!(target: "parla_backend", value = %v, "Invalid OPENAI_TIMEOUT_SECS; using 20");
        20
      }),
      Err(_) => 20,
    };
    Some(Self { api_key, base_url, model, timeout_secs })
  }
}
