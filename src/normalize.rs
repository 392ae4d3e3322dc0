//! Identifier normalization: curie → canonical `(identifier, label)`.
//!
//! Every extractor resolves curies through the [`Normalizer`] trait, so the
//! network-backed [`NodeNormClient`] can be swapped for an
//! [`InMemoryNormalizer`] in tests and offline runs. Curies the service cannot
//! resolve are simply absent from the returned map; callers decide whether
//! that is fatal.

use std::collections::HashMap;
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{NormalizeError, NormalizeResult};

/// Public SRI node normalization endpoint.
pub const DEFAULT_NODE_NORM_URL: &str =
    "https://nodenormalization-sri.renci.org/1.3/get_normalized_nodes";

/// Canonical identity of a curie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedId {
    /// Preferred curie.
    pub identifier: String,
    /// Preferred human label; empty when the service has none.
    pub label: String,
}

impl NormalizedId {
    pub fn new(identifier: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            label: label.into(),
        }
    }
}

/// Batch curie resolution.
pub trait Normalizer {
    /// Resolve all curies in one call. Unresolvable curies are omitted.
    fn normalize(&self, curies: &[String]) -> NormalizeResult<HashMap<String, NormalizedId>>;
}

impl<N: Normalizer + ?Sized> Normalizer for &N {
    fn normalize(&self, curies: &[String]) -> NormalizeResult<HashMap<String, NormalizedId>> {
        (**self).normalize(curies)
    }
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// Client for the SRI node normalization `get_normalized_nodes` endpoint.
///
/// One POST per call; no retry at this layer.
pub struct NodeNormClient {
    url: String,
    agent: ureq::Agent,
}

impl NodeNormClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Default for NodeNormClient {
    fn default() -> Self {
        Self::new(DEFAULT_NODE_NORM_URL, Duration::from_secs(60))
    }
}

impl Normalizer for NodeNormClient {
    fn normalize(&self, curies: &[String]) -> NormalizeResult<HashMap<String, NormalizedId>> {
        if curies.is_empty() {
            return Ok(HashMap::new());
        }

        tracing::debug!(count = curies.len(), url = %self.url, "normalizing curies");

        let body = serde_json::json!({ "curies": curies });
        let response = match self.agent.post(&self.url).send_json(body) {
            Ok(resp) => resp,
            Err(ureq::Error::Status(code, _)) => {
                return Err(NormalizeError::Status {
                    url: self.url.clone(),
                    code,
                });
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(NormalizeError::Transport {
                    url: self.url.clone(),
                    message: transport.to_string(),
                });
            }
        };

        let json: Value = response.into_json().map_err(|e| NormalizeError::Decode {
            message: e.to_string(),
        })?;

        parse_normalized_nodes(&json)
    }
}

/// Decode a `get_normalized_nodes` body: `{curie: null | {"id": {...}}}`.
pub fn parse_normalized_nodes(json: &Value) -> NormalizeResult<HashMap<String, NormalizedId>> {
    let entries = json.as_object().ok_or_else(|| NormalizeError::Decode {
        message: "expected a JSON object keyed by curie".into(),
    })?;

    let mut out = HashMap::with_capacity(entries.len());
    for (curie, entry) in entries {
        let Some(id) = entry.get("id") else {
            continue;
        };
        let Some(identifier) = id.get("identifier").and_then(Value::as_str) else {
            continue;
        };
        let label = id.get("label").and_then(Value::as_str).unwrap_or("");
        out.insert(curie.clone(), NormalizedId::new(identifier, label));
    }

    let missing = entries.len() - out.len();
    if missing > 0 {
        tracing::debug!(missing, "normalization left curies unresolved");
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// In-memory and memoizing normalizers
// ---------------------------------------------------------------------------

/// Fixed curie table, for tests and offline replay of saved responses.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNormalizer {
    table: HashMap<String, NormalizedId>,
}

impl InMemoryNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a curie that resolves to itself with the given label.
    pub fn with_label(mut self, curie: &str, label: &str) -> Self {
        self.insert(curie, NormalizedId::new(curie, label));
        self
    }

    pub fn insert(&mut self, curie: impl Into<String>, id: NormalizedId) {
        self.table.insert(curie.into(), id);
    }
}

impl Normalizer for InMemoryNormalizer {
    fn normalize(&self, curies: &[String]) -> NormalizeResult<HashMap<String, NormalizedId>> {
        Ok(curies
            .iter()
            .filter_map(|c| self.table.get(c).map(|id| (c.clone(), id.clone())))
            .collect())
    }
}

/// Memoizes another normalizer for the lifetime of a session.
///
/// Misses are remembered too, so an unresolvable curie costs one lookup.
/// Errors are not cached.
pub struct CachingNormalizer<N> {
    inner: N,
    memo: DashMap<String, Option<NormalizedId>>,
}

impl<N: Normalizer> CachingNormalizer<N> {
    pub fn new(inner: N) -> Self {
        Self {
            inner,
            memo: DashMap::new(),
        }
    }

    /// Number of curies remembered (hits and misses).
    pub fn cached(&self) -> usize {
        self.memo.len()
    }
}

impl<N: Normalizer> Normalizer for CachingNormalizer<N> {
    fn normalize(&self, curies: &[String]) -> NormalizeResult<HashMap<String, NormalizedId>> {
        let mut pending: Vec<String> = Vec::new();
        for curie in curies {
            if !self.memo.contains_key(curie) && !pending.contains(curie) {
                pending.push(curie.clone());
            }
        }

        if !pending.is_empty() {
            let resolved = self.inner.normalize(&pending)?;
            for curie in pending {
                let hit = resolved.get(&curie).cloned();
                self.memo.insert(curie, hit);
            }
        }

        Ok(curies
            .iter()
            .filter_map(|c| {
                self.memo
                    .get(c)
                    .and_then(|entry| entry.value().clone())
                    .map(|id| (c.clone(), id))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn curies(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_skips_null_and_missing_labels_default_empty() {
        let body = json!({
            "MONDO:0007739": {"id": {"identifier": "MONDO:0007739", "label": "Huntington disease"}},
            "CHEBI:1": {"id": {"identifier": "CHEBI:1"}},
            "FAKE:0": null
        });
        let map = parse_normalized_nodes(&body).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["MONDO:0007739"].label, "Huntington disease");
        assert_eq!(map["CHEBI:1"].label, "");
        assert!(!map.contains_key("FAKE:0"));
    }

    #[test]
    fn parse_rejects_non_object() {
        assert!(matches!(
            parse_normalized_nodes(&json!([1, 2])),
            Err(NormalizeError::Decode { .. })
        ));
    }

    #[test]
    fn in_memory_omits_unknown() {
        let norm = InMemoryNormalizer::new().with_label("A:1", "alpha");
        let map = norm.normalize(&curies(&["A:1", "B:2"])).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["A:1"], NormalizedId::new("A:1", "alpha"));
    }

    struct Counting {
        inner: InMemoryNormalizer,
        calls: AtomicUsize,
    }

    impl Normalizer for Counting {
        fn normalize(
            &self,
            curies: &[String],
        ) -> NormalizeResult<HashMap<String, NormalizedId>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.normalize(curies)
        }
    }

    #[test]
    fn caching_normalizer_remembers_hits_and_misses() {
        let counting = Counting {
            inner: InMemoryNormalizer::new().with_label("A:1", "alpha"),
            calls: AtomicUsize::new(0),
        };
        let cache = CachingNormalizer::new(&counting);

        let first = cache.normalize(&curies(&["A:1", "B:2", "A:1"])).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(cache.cached(), 2);

        let second = cache.normalize(&curies(&["B:2", "A:1"])).unwrap();
        assert_eq!(second["A:1"].label, "alpha");
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_batch_skips_network() {
        let client = NodeNormClient::new("http://127.0.0.1:9/unused", Duration::from_millis(10));
        assert!(client.normalize(&[]).unwrap().is_empty());
    }
}
