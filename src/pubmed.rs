//! Publication abstract lookup.
//!
//! Edges and nodes cite publications by id. Only `PMID:` ids are resolved,
//! through a [`PublicationResolver`]; anything else is skipped. A publication
//! whose abstract cannot be found is dropped from the output, never reported
//! as an error.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use miette::Diagnostic;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// NCBI E-utilities efetch endpoint.
pub const DEFAULT_PUBMED_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi";

/// Prefix of the only publication ids that get resolved.
pub const PMID_PREFIX: &str = "PMID:";

/// The numeric part of a well-formed `PMID:<digits>` id.
pub fn pmid_number(id: &str) -> Option<&str> {
    id.strip_prefix(PMID_PREFIX)
        .filter(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Errors from a single PubMed fetch attempt.
///
/// These stay inside the resolver: after the retry budget is spent the
/// publication is reported as not found.
#[derive(Debug, Error, Diagnostic)]
pub enum PubmedError {
    #[error("PubMed request for {pmid} failed: {message}")]
    #[diagnostic(
        code(kg::pubmed::transport),
        help("Check your network connection. NCBI also rate-limits unauthenticated clients.")
    )]
    Transport { pmid: String, message: String },

    #[error("PubMed returned HTTP {code} for {pmid}")]
    #[diagnostic(
        code(kg::pubmed::status),
        help("NCBI may be throttling requests; the fetch is retried up to the configured limit.")
    )]
    Status { pmid: String, code: u16 },

    #[error("abstract cache I/O error at {path}: {message}")]
    #[diagnostic(
        code(kg::pubmed::cache_io),
        help("Check that the cache directory exists and is writable.")
    )]
    CacheIo { path: String, message: String },
}

pub type PubmedResult<T> = std::result::Result<T, PubmedError>;

/// A cited publication, with its abstract once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    pub id: String,
    /// `None` when abstracts were not fetched for this extraction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
}

impl Publication {
    /// A bare citation, not yet resolved.
    pub fn unresolved(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            abstract_text: None,
        }
    }
}

/// Source of abstract text for `PMID:` ids.
pub trait PublicationResolver {
    /// Abstract text for a `PMID:<number>` id, or `None` if not found.
    fn abstract_for(&self, pmid: &str) -> Option<String>;
}

impl<R: PublicationResolver + ?Sized> PublicationResolver for &R {
    fn abstract_for(&self, pmid: &str) -> Option<String> {
        (**self).abstract_for(pmid)
    }
}

/// De-duplicate ids (first occurrence wins) into unresolved publications.
pub fn dedup_ids<'a>(ids: impl IntoIterator<Item = &'a str>) -> Vec<Publication> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(*id))
        .map(Publication::unresolved)
        .collect()
}

/// Attach abstracts, keeping only `PMID:` publications that resolve.
pub fn attach_abstracts(
    publications: Vec<Publication>,
    resolver: &dyn PublicationResolver,
) -> Vec<Publication> {
    publications
        .into_iter()
        .filter(|p| pmid_number(&p.id).is_some())
        .filter_map(|mut p| {
            let text = match p.abstract_text.take() {
                Some(text) => Some(text),
                None => resolver.abstract_for(&p.id),
            };
            match text {
                Some(text) => {
                    p.abstract_text = Some(text);
                    Some(p)
                }
                None => {
                    tracing::debug!(pmid = %p.id, "no abstract found, dropping publication");
                    None
                }
            }
        })
        .collect()
}

/// De-duplicate and resolve a raw id list in one step.
pub fn resolve_publications<'a>(
    ids: impl IntoIterator<Item = &'a str>,
    resolver: &dyn PublicationResolver,
) -> Vec<Publication> {
    attach_abstracts(dedup_ids(ids), resolver)
}

// ---------------------------------------------------------------------------
// PubMed client
// ---------------------------------------------------------------------------

/// Fetches abstracts from NCBI efetch, retrying a bounded number of times.
pub struct PubmedClient {
    url: String,
    retries: usize,
    agent: ureq::Agent,
}

impl PubmedClient {
    pub fn new(url: impl Into<String>, retries: usize, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            retries,
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    /// One efetch attempt. `Ok(None)` means the record had no abstract text.
    pub fn fetch(&self, pmid: &str) -> PubmedResult<Option<String>> {
        let response = self
            .agent
            .get(&self.url)
            .query("db", "pubmed")
            .query("id", pmid)
            .query("retmode", "xml")
            .query("rettype", "abstract")
            .call()
            .map_err(|e| match e {
                ureq::Error::Status(code, _) => PubmedError::Status {
                    pmid: pmid.into(),
                    code,
                },
                ureq::Error::Transport(t) => PubmedError::Transport {
                    pmid: pmid.into(),
                    message: t.to_string(),
                },
            })?;

        let body = response.into_string().map_err(|e| PubmedError::Transport {
            pmid: pmid.into(),
            message: format!("read body: {e}"),
        })?;

        Ok(parse_abstract(&body))
    }
}

impl Default for PubmedClient {
    fn default() -> Self {
        Self::new(DEFAULT_PUBMED_URL, 5, Duration::from_secs(30))
    }
}

impl PublicationResolver for PubmedClient {
    fn abstract_for(&self, pmid: &str) -> Option<String> {
        with_retries(pmid, self.retries, || self.fetch(pmid))
    }
}

/// Run `attempt` up to `retries` times, stopping at the first abstract.
fn with_retries(
    pmid: &str,
    retries: usize,
    mut attempt: impl FnMut() -> PubmedResult<Option<String>>,
) -> Option<String> {
    for n in 1..=retries {
        match attempt() {
            Ok(Some(text)) => return Some(text),
            Ok(None) => {
                tracing::debug!(pmid, attempt = n, "efetch returned no abstract text");
            }
            Err(e) => {
                tracing::debug!(pmid, attempt = n, error = %e, "efetch attempt failed");
            }
        }
    }
    tracing::info!(pmid, retries, "abstract not found");
    None
}

/// Extract the abstract from an efetch XML body.
///
/// Every `AbstractText` element contributes one part; labelled parts are
/// rendered as `"{Label}: {text}"`. Returns `None` when no text is present.
pub fn parse_abstract(xml: &str) -> Option<String> {
    // The HTML parser ignores `/>` on unknown elements, so an empty
    // `<AbstractText/>` would swallow the sections after it.
    let document = Html::parse_document(&close_empty_abstracts(xml));
    let sel = Selector::parse("abstracttext").ok()?;

    let parts: Vec<String> = document
        .select(&sel)
        .filter_map(|el| {
            let text = el.text().collect::<String>();
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            Some(match el.value().attr("label") {
                Some(label) => format!("{label}: {text}"),
                None => text.to_string(),
            })
        })
        .collect();

    let joined = parts.join(" ");
    let joined = joined.trim();
    if joined.is_empty() {
        None
    } else {
        Some(joined.to_string())
    }
}

/// Rewrite `<AbstractText .../>` as an explicit open/close pair.
fn close_empty_abstracts(xml: &str) -> String {
    const OPEN: &str = "<AbstractText";
    let mut out = String::with_capacity(xml.len());
    let mut rest = xml;
    while let Some(start) = rest.find(OPEN) {
        let Some(len) = rest[start..].find('>') else {
            break;
        };
        let end = start + len;
        let tag = &rest[start..end];
        out.push_str(&rest[..start]);
        match tag.strip_suffix('/') {
            Some(open) => {
                out.push_str(open.trim_end());
                out.push_str("></AbstractText>");
            }
            None => {
                out.push_str(tag);
                out.push('>');
            }
        }
        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    out
}

// ---------------------------------------------------------------------------
// File cache and in-memory resolver
// ---------------------------------------------------------------------------

/// Caches abstracts as `<dir>/<number>.txt`, one file per PMID.
///
/// Misses are not cached, so a later run retries the network.
pub struct CachedResolver<R> {
    dir: PathBuf,
    inner: R,
}

impl<R: PublicationResolver> CachedResolver<R> {
    /// Wrap `inner`, storing abstracts under `cache_dir/pubmed_abstracts`.
    pub fn new(cache_dir: &Path, inner: R) -> Self {
        Self {
            dir: cache_dir.join("pubmed_abstracts"),
            inner,
        }
    }

    fn path_for(&self, number: &str) -> PathBuf {
        self.dir.join(format!("{number}.txt"))
    }

    fn store(&self, path: &Path, text: &str) -> PubmedResult<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| PubmedError::CacheIo {
            path: self.dir.display().to_string(),
            message: e.to_string(),
        })?;
        std::fs::write(path, text).map_err(|e| PubmedError::CacheIo {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

impl<R: PublicationResolver> PublicationResolver for CachedResolver<R> {
    fn abstract_for(&self, pmid: &str) -> Option<String> {
        let Some(number) = pmid_number(pmid) else {
            tracing::debug!(pmid, "not a numeric PMID, skipping cache");
            return None;
        };
        let path = self.path_for(number);
        if let Ok(text) = std::fs::read_to_string(&path) {
            tracing::trace!(pmid, "abstract cache hit");
            return Some(text);
        }

        let text = self.inner.abstract_for(pmid)?;
        if let Err(e) = self.store(&path, &text) {
            tracing::warn!(pmid, error = %e, "failed to cache abstract");
        }
        Some(text)
    }
}

/// Fixed abstract table, for tests and offline runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPublications {
    abstracts: HashMap<String, String>,
}

impl InMemoryPublications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_abstract(mut self, pmid: &str, text: &str) -> Self {
        self.abstracts.insert(pmid.into(), text.into());
        self
    }
}

impl PublicationResolver for InMemoryPublications {
    fn abstract_for(&self, pmid: &str) -> Option<String> {
        self.abstracts.get(pmid).cloned()
    }
}
