//! Query execution against the Translator reasoning services.
//!
//! Submits a query graph to Aragorn, Robokop or Strider and returns the raw
//! TRAPI response. [`ResponseCache`] keeps responses on disk keyed by a hash of
//! the query graph and target, so repeated runs skip the (slow) services.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::trapi::QueryGraph;

/// Errors from submitting queries or reading cached responses.
#[derive(Debug, Error, Diagnostic)]
pub enum QueryError {
    #[error("unknown query target: \"{name}\"")]
    #[diagnostic(
        code(kg::query::unknown_target),
        help("Valid targets are: aragorn, robokop, strider.")
    )]
    UnknownTarget { name: String },

    #[error("query to {target} failed: {message}")]
    #[diagnostic(
        code(kg::query::transport),
        help(
            "The reasoning service could not be reached or timed out. Creative queries \
             can take several minutes; raise `http_timeout_secs` if needed."
        )
    )]
    Transport { target: Target, message: String },

    #[error("{target} returned HTTP {code}")]
    #[diagnostic(
        code(kg::query::status),
        help("The service rejected the query. Check the query graph against the TRAPI schema.")
    )]
    Status { target: Target, code: u16 },

    #[error("failed to decode response from {target}: {message}")]
    #[diagnostic(
        code(kg::query::decode),
        help("The service replied with something other than TRAPI JSON.")
    )]
    Decode { target: Target, message: String },

    #[error("response cache I/O error at {path}: {message}")]
    #[diagnostic(
        code(kg::query::cache_io),
        help(
            "Failed to read or write a cached response. Check the cache directory \
             permissions, or delete the file to force a fresh query."
        )
    )]
    CacheIo { path: String, message: String },
}

pub type QueryResult<T> = std::result::Result<T, QueryError>;

/// Reasoning service to send a query to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Aragorn,
    Robokop,
    Strider,
}

impl Target {
    pub const ALL: [Target; 3] = [Target::Aragorn, Target::Robokop, Target::Strider];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aragorn => "aragorn",
            Self::Robokop => "robokop",
            Self::Strider => "strider",
        }
    }

    /// Synchronous query endpoint.
    pub fn url(&self) -> &'static str {
        match self {
            Self::Aragorn => "https://aragorn.renci.org/aragorn/query",
            Self::Robokop => "https://aragorn.renci.org/robokop/query?answer_coalesce_type=none",
            Self::Strider => "https://strider.renci.org/1.4/query/",
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| QueryError::UnknownTarget { name: s.into() })
    }
}

/// TRAPI request body for a synchronous query.
pub fn request_body(query_graph: &QueryGraph) -> Value {
    serde_json::json!({
        "callback": "",
        "message": { "query_graph": query_graph },
    })
}

/// HTTP client for the reasoning services.
pub struct QueryClient {
    agent: ureq::Agent,
}

impl QueryClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    /// POST the query graph to `target` and return the raw response JSON.
    pub fn submit(&self, query_graph: &QueryGraph, target: Target) -> QueryResult<Value> {
        tracing::info!(%target, "querying reasoning service");
        let started = std::time::Instant::now();

        let response = self
            .agent
            .post(target.url())
            .set("accept", "application/json")
            .send_json(request_body(query_graph))
            .map_err(|e| match e {
                ureq::Error::Status(code, _) => QueryError::Status { target, code },
                ureq::Error::Transport(t) => QueryError::Transport {
                    target,
                    message: t.to_string(),
                },
            })?;

        let json: Value = response.into_json().map_err(|e| QueryError::Decode {
            target,
            message: e.to_string(),
        })?;

        tracing::info!(
            %target,
            elapsed_secs = started.elapsed().as_secs_f64(),
            "query complete"
        );
        Ok(json)
    }
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new(Duration::from_secs(600))
    }
}

/// On-disk cache of raw responses, one JSON file per (query graph, target).
pub struct ResponseCache {
    dir: PathBuf,
}

impl ResponseCache {
    /// Cache rooted at `cache_dir/query_cache`.
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            dir: cache_dir.join("query_cache"),
        }
    }

    /// Cache key: first 12 hex chars of SHA-256 over the query graph JSON and target.
    pub fn key(query_graph: &QueryGraph, target: Target) -> String {
        let mut hasher = Sha256::new();
        hasher.update(serde_json::to_string(query_graph).unwrap_or_default());
        hasher.update(target.as_str());
        let digest = hex::encode(hasher.finalize());
        digest[..12].to_string()
    }

    pub fn path_for(&self, query_graph: &QueryGraph, target: Target) -> PathBuf {
        self.dir
            .join(format!("{}.json", Self::key(query_graph, target)))
    }

    /// Load a cached response, if one exists.
    pub fn load(&self, query_graph: &QueryGraph, target: Target) -> QueryResult<Option<Value>> {
        let path = self.path_for(query_graph, target);
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&path).map_err(|e| QueryError::CacheIo {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let json = serde_json::from_str(&data).map_err(|e| QueryError::CacheIo {
            path: path.display().to_string(),
            message: format!("parse: {e}"),
        })?;
        Ok(Some(json))
    }

    pub fn store(&self, query_graph: &QueryGraph, target: Target, response: &Value) -> QueryResult<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| QueryError::CacheIo {
            path: self.dir.display().to_string(),
            message: e.to_string(),
        })?;
        let path = self.path_for(query_graph, target);
        let json = serde_json::to_string(response).map_err(|e| QueryError::CacheIo {
            path: path.display().to_string(),
            message: format!("serialize: {e}"),
        })?;
        std::fs::write(&path, json).map_err(|e| QueryError::CacheIo {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Return the cached response, or submit the query and cache the answer.
    pub fn fetch_or_query(
        &self,
        client: &QueryClient,
        query_graph: &QueryGraph,
        target: Target,
    ) -> QueryResult<Value> {
        if let Some(cached) = self.load(query_graph, target)? {
            tracing::info!(%target, "loaded response from cache");
            return Ok(cached);
        }
        let response = client.submit(query_graph, target)?;
        self.store(query_graph, target, &response)?;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn qg() -> QueryGraph {
        QueryGraph::from_value(json!({
            "nodes": {
                "n0": {"categories": ["biolink:ChemicalEntity"], "name": "Chemical Entity"},
                "n1": {"categories": ["biolink:Disease"], "ids": ["MONDO:0007739"]}
            },
            "edges": {"e0": {"subject": "n0", "object": "n1", "predicates": ["biolink:ameliorates"]}}
        }))
        .unwrap()
    }

    #[test]
    fn target_parsing() {
        assert_eq!("aragorn".parse::<Target>().unwrap(), Target::Aragorn);
        assert_eq!(" Strider ".parse::<Target>().unwrap(), Target::Strider);
        assert!(matches!(
            "bte".parse::<Target>(),
            Err(QueryError::UnknownTarget { .. })
        ));
    }

    #[test]
    fn request_body_wraps_query_graph() {
        let body = request_body(&qg());
        assert_eq!(body["callback"], json!(""));
        assert_eq!(
            body["message"]["query_graph"]["nodes"]["n1"]["ids"],
            json!(["MONDO:0007739"])
        );
    }

    #[test]
    fn cache_key_depends_on_target() {
        let a = ResponseCache::key(&qg(), Target::Aragorn);
        let r = ResponseCache::key(&qg(), Target::Robokop);
        assert_eq!(a.len(), 12);
        assert_ne!(a, r);
        assert_eq!(a, ResponseCache::key(&qg(), Target::Aragorn));
    }

    #[test]
    fn cache_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let cache = ResponseCache::new(dir.path());
        assert!(cache.load(&qg(), Target::Strider).unwrap().is_none());

        let response = json!({"message": {"results": []}});
        cache.store(&qg(), Target::Strider, &response).unwrap();
        assert_eq!(cache.load(&qg(), Target::Strider).unwrap(), Some(response));
        assert!(cache.load(&qg(), Target::Aragorn).unwrap().is_none());
    }
}
