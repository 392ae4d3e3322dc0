//! Language-model summaries of edge evidence.
//!
//! The extractor's output is turned into a plain-text evidence payload (one
//! `PMID: abstract` line per publication) and sent to an OpenAI-compatible
//! chat endpoint. The "general" flow makes two calls: the first pulls out
//! evidence for a statement, the second groups those findings by conclusion.

use std::time::Duration;

use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;

use crate::extract::CanonicalEdge;

/// Errors from the summarization client.
#[derive(Debug, Error, Diagnostic)]
pub enum LlmError {
    #[error("no API key configured for {base_url}")]
    #[diagnostic(
        code(kg::llm::missing_key),
        help("Set OPENAI_API_KEY in the environment or in a .env file in the working directory.")
    )]
    MissingApiKey { base_url: String },

    #[error("chat completion request failed: {message}")]
    #[diagnostic(
        code(kg::llm::request_failed),
        help("Check the API key, the model name, and that `llm_base_url` is reachable.")
    )]
    RequestFailed { message: String },

    #[error("failed to parse chat completion response: {message}")]
    #[diagnostic(
        code(kg::llm::parse_error),
        help("The endpoint returned an unexpected response format.")
    )]
    ParseError { message: String },
}

pub type LlmResult<T> = std::result::Result<T, LlmError>;

/// A chat model that answers one system + user prompt pair.
pub trait Summarizer {
    fn complete(&self, system_prompt: &str, user_prompt: &str) -> LlmResult<String>;
}

/// Client for `{base_url}/chat/completions`.
pub struct OpenAiClient {
    base_url: String,
    model: String,
    temperature: f32,
    api_key: String,
    organization: Option<String>,
    agent: ureq::Agent,
}

impl OpenAiClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
        api_key: Option<String>,
    ) -> LlmResult<Self> {
        let base_url = base_url.into();
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LlmError::MissingApiKey {
                base_url: base_url.clone(),
            })?;
        Ok(Self {
            base_url,
            model: model.into(),
            temperature,
            api_key,
            organization: None,
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(300))
                .build(),
        })
    }

    pub fn with_organization(mut self, organization: Option<String>) -> Self {
        self.organization = organization.filter(|o| !o.is_empty());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Summarizer for OpenAiClient {
    fn complete(&self, system_prompt: &str, user_prompt: &str) -> LlmResult<String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
        });

        let mut request = self
            .agent
            .post(&url)
            .set("Authorization", &format!("Bearer {}", self.api_key));
        if let Some(org) = &self.organization {
            request = request.set("OpenAI-Organization", org);
        }

        tracing::debug!(model = %self.model, chars = user_prompt.len(), "requesting completion");
        let resp = request.send_json(body).map_err(|e| LlmError::RequestFailed {
            message: e.to_string(),
        })?;
        let json: Value = resp.into_json().map_err(|e| LlmError::ParseError {
            message: e.to_string(),
        })?;
        parse_completion(&json)
    }
}

/// Pull `choices[0].message.content` out of a chat completion body.
pub fn parse_completion(json: &Value) -> LlmResult<String> {
    json.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| LlmError::ParseError {
            message: "missing choices[0].message.content".into(),
        })
}

/// The edge's publications as `"{PMID}: {abstract}"` lines.
pub fn evidence_payload(edge: &CanonicalEdge) -> String {
    edge.publications
        .iter()
        .map(|p| match &p.abstract_text {
            Some(text) => format!("{}: {}", p.id, text),
            None => p.id.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Output of [`general_summary`].
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralSummary {
    /// Per-publication findings supporting the statement.
    pub evidence: String,
    /// Findings grouped by shared conclusion.
    pub grouped: String,
}

/// Summarize an edge's abstracts as evidence for `statement`.
///
/// Returns `None` without calling the model when the edge has no publications.
pub fn general_summary(
    summarizer: &dyn Summarizer,
    edge: &CanonicalEdge,
    statement: &str,
) -> LlmResult<Option<GeneralSummary>> {
    if edge.publications.is_empty() {
        return Ok(None);
    }

    let extract_prompt = format!(
        "You are a biomedical sciences researcher evaluating publication abstracts. \
         You will be given a list of PMIDs with their abstracts. Find evidence supporting \
         the statement '{statement}' in the abstracts. Structure your response as bullet \
         points starting with the PMID associated with the supporting evidence. List \
         multiple PMIDs if you find related evidence from multiple publications."
    );
    let evidence = summarizer.complete(&extract_prompt, &evidence_payload(edge))?;

    let group_prompt = format!(
        "Read the following list of abstract summaries. Group summaries that have similar \
         conclusions. Structure your response as bullet points beginning with a comma \
         separated list of grouped summaries followed by the main idea of the grouped \
         summaries.\n\nAbstract summary list: '{evidence}'"
    );
    let grouped = summarizer.complete(&group_prompt, "")?;

    Ok(Some(GeneralSummary { evidence, grouped }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pubmed::Publication;
    use serde_json::json;
    use std::cell::RefCell;

    struct Recording {
        prompts: RefCell<Vec<(String, String)>>,
    }

    impl Summarizer for Recording {
        fn complete(&self, system_prompt: &str, user_prompt: &str) -> LlmResult<String> {
            let mut prompts = self.prompts.borrow_mut();
            prompts.push((system_prompt.to_string(), user_prompt.to_string()));
            Ok(format!("reply {}", prompts.len()))
        }
    }

    fn edge_with_pubs() -> CanonicalEdge {
        let mut edge = CanonicalEdge::new("riluzole", "ameliorates", "Huntington disease");
        edge.publications = vec![
            Publication {
                id: "PMID:1".into(),
                abstract_text: Some("Riluzole slowed progression.".into()),
            },
            Publication::unresolved("PMID:2"),
        ];
        edge
    }

    #[test]
    fn payload_lists_publications() {
        assert_eq!(
            evidence_payload(&edge_with_pubs()),
            "PMID:1: Riluzole slowed progression.\nPMID:2"
        );
    }

    #[test]
    fn general_summary_makes_two_calls() {
        let rec = Recording {
            prompts: RefCell::new(Vec::new()),
        };
        let edge = edge_with_pubs();
        let summary = general_summary(&rec, &edge, &edge.statement())
            .unwrap()
            .unwrap();
        assert_eq!(summary.evidence, "reply 1");
        assert_eq!(summary.grouped, "reply 2");

        let prompts = rec.prompts.borrow();
        assert!(prompts[0].0.contains("'riluzole ameliorates Huntington disease'"));
        assert_eq!(prompts[0].1, evidence_payload(&edge));
        assert!(prompts[1].0.contains("'reply 1'"));
    }

    #[test]
    fn no_publications_skips_model() {
        let rec = Recording {
            prompts: RefCell::new(Vec::new()),
        };
        let edge = CanonicalEdge::new("a", "b", "c");
        assert_eq!(general_summary(&rec, &edge, "a b c").unwrap(), None);
        assert!(rec.prompts.borrow().is_empty());
    }

    #[test]
    fn completion_parsing() {
        let ok = json!({"choices": [{"message": {"role": "assistant", "content": "hi"}}]});
        assert_eq!(parse_completion(&ok).unwrap(), "hi");
        assert!(matches!(
            parse_completion(&json!({"error": {}})),
            Err(LlmError::ParseError { .. })
        ));
    }

    #[test]
    fn missing_key_is_an_error() {
        assert!(matches!(
            OpenAiClient::new("https://api.example", "m", 0.0, Some("  ".into())),
            Err(LlmError::MissingApiKey { .. })
        ));
    }
}
