//! Minimal OpenAI client used as the scoring oracle for non-exact answers.
//!
//! We only call chat.completions with `response_format = json_object` and then validate
//! the returned object field by field; anything unexpected is an `OracleError::Malformed`.
//! Calls are instrumented and log model names, latencies and token usage (not contents).
//!
//! NOTE: We never log the API key.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::config::{OracleConfig, Prompts};
use crate::util::fill_template;

#[derive(Debug, Error)]
pub enum OracleError {
  #[error("request failed: {0}")]
  Http(#[from] reqwest::Error),
  #[error("OpenAI HTTP {status}: {message}")]
  Status { status: u16, message: String },
  #[error("empty completion")]
  Empty,
  #[error("malformed evaluation: {0}")]
  Malformed(String),
}

/// What the oracle needs to grade one answer.
#[derive(Clone, Debug)]
pub struct EvaluationRequest<'a> {
  pub source: &'a str,
  pub canonical: &'a str,
  pub answer: &'a str,
  pub target_language: &'a str,
  pub concept: &'a str,
  pub concept_description: &'a str,
}

/// Validated oracle verdict. Scores are on a 0..=10 scale.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
  pub overall_score: f32,
  pub concept_score: f32,
  pub explanation: String,
  pub missing_topics: Vec<String>,
}

#[derive(Clone)]
pub struct OpenAI {
  client: reqwest::Client,
  api_key: String,
  pub base_url: String,
  pub model: String,
}

impl OpenAI {
  pub fn new(cfg: &OracleConfig) -> Result<Self, OracleError> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(cfg.timeout_secs))
      .build()?;
    Ok(Self {
      client,
      api_key: cfg.api_key.clone(),
      base_url: cfg.base_url.trim_end_matches('/').to_string(),
      model: cfg.model.clone(),
    })
  }

  /// Construct the client from env; None when OPENAI_API_KEY is absent or the client can't be built.
  pub fn from_env() -> Option<Self> {
    let cfg = OracleConfig::from_env()?;
    match Self::new(&cfg) {
      Ok(oa) => Some(oa),
      Err(e) => {
        error!(target: "parla_backend", error = %e, "Failed to build OpenAI client");
        None
      }
    }
  }

  /// JSON-object chat completion; returns the raw parsed object.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model))]
  async fn chat_json(&self, system: &str, user: &str, temperature: f32) -> Result<Value, OracleError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format: Some(ResponseFormat { r#type: "json_object".into() }),
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "parla-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&body).unwrap_or(body);
      return Err(OracleError::Status { status, message });
    }

    let body: ChatCompletionResponse = res.json().await?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .filter(|t| !t.trim().is_empty())
      .ok_or(OracleError::Empty)?;

    serde_json::from_str::<Value>(&text).map_err(|e| OracleError::Malformed(format!("not JSON: {e}")))
  }

  /// Grade a free-text answer.
  #[instrument(level = "info", skip(self, prompts, req),
               fields(model = %self.model, answer_len = req.answer.len(), concept = %req.concept))]
  pub async fn evaluate_translation(
    &self,
    prompts: &Prompts,
    req: &EvaluationRequest<'_>,
  ) -> Result<Evaluation, OracleError> {
    let user = fill_template(
      &prompts.evaluation_user_template,
      &[
        ("source",              req.source),
        ("canonical",           req.canonical),
        ("answer",              req.answer),
        ("target_language",     req.target_language),
        ("concept",             req.concept),
        ("concept_description", req.concept_description),
      ],
    );

    let start = Instant::now();
    let result = self.chat_json(&prompts.evaluation_system, &user, 0.3).await;
    let elapsed = start.elapsed();
    let raw = match result {
      Ok(v) => {
        info!(?elapsed, "Model response received");
        v
      }
      Err(e) => {
        error!(?elapsed, error = %e, "Model call failed during evaluation");
        return Err(e);
      }
    };
    parse_evaluation(&raw)
  }
}

/// Check the oracle's object key by key instead of trusting its shape.
pub fn parse_evaluation(raw: &Value) -> Result<Evaluation, OracleError> {
  let obj = raw.as_object().ok_or_else(|| OracleError::Malformed("expected a JSON object".into()))?;

  let score = |key: &str| -> Result<f32, OracleError> {
    let v = obj.get(key)
      .and_then(Value::as_f64)
      .ok_or_else(|| OracleError::Malformed(format!("'{key}' missing or not a number")))?;
    if !(0.0..=10.0).contains(&v) {
      return Err(OracleError::Malformed(format!("'{key}' out of range: {v}")));
    }
    Ok(v as f32)
  };
  let overall_score = score("overallScore")?;
  let concept_score = score("conceptScore")?;

  let explanation = obj.get("explanation")
    .or_else(|| obj.get("feedback"))
    .and_then(Value::as_str)
    .ok_or_else(|| OracleError::Malformed("'explanation' missing or not a string".into()))?
    .trim()
    .to_string();

  let missing_topics = match obj.get("missingTopics") {
    None | Some(Value::Null) => Vec::new(),
    Some(Value::Array(items)) => items.iter()
      .map(|t| t.as_str().map(str::to_string))
      .collect::<Option<Vec<_>>>()
      .ok_or_else(|| OracleError::Malformed("'missingTopics' must contain strings".into()))?,
    Some(_) => return Err(OracleError::Malformed("'missingTopics' must be an array".into())),
  };

  Ok(Evaluation { overall_score, concept_score, explanation, missing_topics })
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn accepts_well_formed_evaluation() {
    let ev = parse_evaluation(&json!({
      "overallScore": 7,
      "conceptScore": 8.5,
      "explanation": " Mostly right. ",
      "missingTopics": ["gender agreement"]
    })).unwrap();
    assert_eq!(ev.overall_score, 7.0);
    assert_eq!(ev.concept_score, 8.5);
    assert_eq!(ev.explanation, "Mostly right.");
    assert_eq!(ev.missing_topics, vec!["gender agreement".to_string()]);
  }

  #[test]
  fn feedback_key_is_accepted_for_explanation() {
    let ev = parse_evaluation(&json!({ "overallScore": 5, "conceptScore": 5, "feedback": "ok" })).unwrap();
    assert_eq!(ev.explanation, "ok");
    assert!(ev.missing_topics.is_empty());
  }

  #[test]
  fn rejects_wrong_shapes() {
    let cases = [
      json!([1, 2, 3]),
      json!({ "conceptScore": 5, "explanation": "x" }),
      json!({ "overallScore": "7", "conceptScore": 5, "explanation": "x" }),
      json!({ "overallScore": 11, "conceptScore": 5, "explanation": "x" }),
      json!({ "overallScore": 7, "conceptScore": 5 }),
      json!({ "overallScore": 7, "conceptScore": 5, "explanation": "x", "missingTopics": "tenses" }),
      json!({ "overallScore": 7, "conceptScore": 5, "explanation": "x", "missingTopics": [1] }),
    ];
    for raw in cases {
      assert!(matches!(parse_evaluation(&raw), Err(OracleError::Malformed(_))), "accepted {raw}");
    }
  }

  #[test]
  fn extracts_openai_error_message() {
    let body = r#"{"error":{"message":"Invalid API key","type":"invalid_request_error"}}"#;
    assert_eq!(extract_openai_error(body).as_deref(), Some("Invalid API key"));
    assert!(extract_openai_error("<html>").is_none());
  }

  #[test]
  fn base_url_trailing_slash_is_trimmed() {
    let cfg = OracleConfig {
      api_key: "k".into(),
      base_url: "http://localhost:1234/v1/".into(),
      model: "m".into(),
      timeout_secs: 1,
    };
    let oa = OpenAI::new(&cfg).unwrap();
    assert_eq!(oa.base_url, "http://localhost:1234/v1");
  }
}
