//! Application state: in-memory catalog, prompts and the optional scoring oracle.
//!
//! This module owns:
//!   - catalog stores (languages, pairs, concepts, sentences by id + sentences by concept)
//!   - the prompts struct (from TOML or defaults)
//!   - optional OpenAI client, built from explicit `OracleConfig`
//!
//! Handlers only read the catalog; it is loaded once at startup.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use tokio::sync::RwLock;
use tracing::{info, instrument};

use crate::config::{load_agent_config_from_env, AgentConfig, Prompts};
use crate::domain::{GrammaticalConcept, Language, LanguagePair, Sentence};
use crate::openai::OpenAI;
use crate::seeds::{seed_catalog, Catalog};

/// A language pair joined with both of its languages.
#[derive(Clone, Debug)]
pub struct PairView {
    pub pair: LanguagePair,
    pub from_language: Language,
    pub to_language: Language,
}

pub struct AppState {
    pub languages: RwLock<HashMap<u32, Language>>,
    pub pairs: RwLock<Vec<LanguagePair>>,
    pub concepts: RwLock<HashMap<u32, GrammaticalConcept>>,
    pub sentences: RwLock<HashMap<u32, Sentence>>,
    pub by_concept: RwLock<HashMap<u32, Vec<u32>>>,
    pub openai: Option<OpenAI>,
    pub prompts: Prompts,
}

impl AppState {
    /// Build state from env: load config, pick catalog, init OpenAI.
    #[instrument(level = "info", skip_all)]
    pub fn from_env() -> Self {
        let cfg = load_agent_config_from_env().unwrap_or_default();
        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(target: "parla_backend", base_url = %oa.base_url, model = %oa.model, "OpenAI enabled.");
        } else {
            info!(target: "parla_backend", "OpenAI disabled (no OPENAI_API_KEY). Using local scoring.");
        }
        Self::new(cfg, openai)
    }

    /// Build state from an already-loaded config and an optional oracle handle.
    pub fn new(cfg: AgentConfig, openai: Option<OpenAI>) -> Self {
        let catalog = match cfg.catalog {
            Some(c) if !c.languages.is_empty() => {
                info!(target: "parla_backend", "Using catalog from config");
                c.into_catalog()
            }
            _ => seed_catalog(),
        };
        Self::with_catalog(catalog, cfg.prompts, openai)
    }

    pub fn with_catalog(catalog: Catalog, prompts: Prompts, openai: Option<OpenAI>) -> Self {
        let Catalog { languages, pairs, concepts, sentences } = catalog;

        let mut by_concept = HashMap::<u32, Vec<u32>>::new();
        for s in &sentences {
            by_concept.entry(s.concept_id).or_default().push(s.id);
        }
        for ids in by_concept.values_mut() {
            ids.sort_unstable();
        }

        info!(
            target: "parla_backend",
            languages = languages.len(),
            pairs = pairs.len(),
            concepts = concepts.len(),
            sentences = sentences.len(),
            "Startup catalog inventory"
        );

        Self {
            languages: RwLock::new(languages.into_iter().map(|l| (l.id, l)).collect()),
            pairs: RwLock::new(pairs),
            concepts: RwLock::new(concepts.into_iter().map(|c| (c.id, c)).collect()),
            sentences: RwLock::new(sentences.into_iter().map(|s| (s.id, s)).collect()),
            by_concept: RwLock::new(by_concept),
            openai,
            prompts,
        }
    }

    /// All pairs joined with their languages; pairs with a dangling language are skipped.
    #[instrument(level = "debug", skip(self))]
    pub async fn language_pairs(&self) -> Vec<PairView> {
        let languages = self.languages.read().await;
        let pairs = self.pairs.read().await;
        pairs
            .iter()
            .filter_map(|p| {
                Some(PairView {
                    pair: p.clone(),
                    from_language: languages.get(&p.from_language_id)?.clone(),
                    to_language: languages.get(&p.to_language_id)?.clone(),
                })
            })
            .collect()
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn pair(&self, pair_id: u32) -> Option<PairView> {
        self.language_pairs()
            .await
            .into_iter()
            .find(|p| p.pair.id == pair_id)
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn concepts_for_pair(&self, pair_id: u32) -> Vec<GrammaticalConcept> {
        let concepts = self.concepts.read().await;
        let mut out: Vec<GrammaticalConcept> = concepts
            .values()
            .filter(|c| c.language_pair_id == pair_id)
            .cloned()
            .collect();
        out.sort_by_key(|c| c.id);
        out
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn concept(&self, concept_id: u32) -> Option<GrammaticalConcept> {
        self.concepts.read().await.get(&concept_id).cloned()
    }

    /// Uniformly random sentence of a concept; None if the concept has none.
    #[instrument(level = "debug", skip(self))]
    pub async fn random_sentence(&self, concept_id: u32) -> Option<Sentence> {
        let chosen = {
            let by_concept = self.by_concept.read().await;
            let ids = by_concept.get(&concept_id)?;
            *ids.choose(&mut rand::thread_rng())?
        };
        self.sentence(chosen).await
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn sentence(&self, id: u32) -> Option<Sentence> {
        self.sentences.read().await.get(&id).cloned()
    }
}
