//! Seed data: a built-in English -> Spanish catalog so the app is useful
//! without any external config.

use crate::domain::{AcceptableTranslation, GrammaticalConcept, Language, LanguagePair, Sentence};

/// Everything the in-memory catalog is built from.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
  pub languages: Vec<Language>,
  pub pairs: Vec<LanguagePair>,
  pub concepts: Vec<GrammaticalConcept>,
  pub sentences: Vec<Sentence>,
}

fn alt(from_to: &str, to_from: &str) -> AcceptableTranslation {
  AcceptableTranslation {
    from_to_text: Some(from_to.into()),
    to_from_text: Some(to_from.into()),
  }
}

pub fn seed_catalog() -> Catalog {
  let languages = vec![
    Language { id: 1, name: "English".into(), code: "en".into() },
    Language { id: 2, name: "Spanish".into(), code: "es".into() },
  ];
  let pairs = vec![LanguagePair { id: 1, from_language_id: 1, to_language_id: 2 }];
  let concepts = vec![
    GrammaticalConcept {
      id: 1,
      name: "Simple Present Tense".into(),
      description: "Basic present tense expressions for regular actions and states".into(),
      language_pair_id: 1,
    },
    GrammaticalConcept {
      id: 2,
      name: "Ser vs Estar".into(),
      description: "Understanding the difference between permanent and temporary states in Spanish".into(),
      language_pair_id: 1,
    },
  ];
  let sentences = vec![
    Sentence {
      id: 1,
      concept_id: 1,
      canonical_from: "I eat breakfast every morning".into(),
      canonical_to: "Desayuno todas las mañanas".into(),
      acceptable_translations: vec![
        alt("Como el desayuno todas las mañanas", "I have breakfast every morning"),
        alt("Tomo el desayuno todas las mañanas", "I take breakfast every morning"),
      ],
    },
    Sentence {
      id: 2,
      concept_id: 1,
      canonical_from: "She works in a hospital".into(),
      canonical_to: "Ella trabaja en un hospital".into(),
      acceptable_translations: vec![alt("Trabaja en un hospital", "She works at a hospital")],
    },
    Sentence {
      id: 3,
      concept_id: 2,
      canonical_from: "He is a doctor".into(),
      canonical_to: "Él es médico".into(),
      acceptable_translations: vec![
        alt("Es médico", "He is a physician"),
        alt("Él es doctor", "He is a doctor"),
      ],
    },
    Sentence {
      id: 4,
      concept_id: 2,
      canonical_from: "The soup is hot".into(),
      canonical_to: "La sopa está caliente".into(),
      acceptable_translations: vec![alt("La sopa está muy caliente", "The soup is very hot")],
    },
  ];

  Catalog { languages, pairs, concepts, sentences }
}
