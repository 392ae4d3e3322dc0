// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # kg-summarizer
//!
//! Evidence extraction for biomedical knowledge-graph answers. A TRAPI response
//! from a Translator reasoning service (Aragorn, Robokop, Strider) is reduced to
//! a normalized, de-duplicated evidence graph for one chosen answer, ready to
//! display or to hand to a language model for summarization.
//!
//! ## Architecture
//!
//! - **TRAPI model** (`trapi`): typed responses and query graphs, known attribute tags
//! - **Result selection** (`select`): score-ranked answers
//! - **Normalization** (`normalize`): curie → canonical label, batched and injectable
//! - **Publications** (`pubmed`): PMID → abstract, retried and file-cached
//! - **Extraction** (`extract`): nodes, lookup/creative edges, support graphs, merging
//! - **Collaborators** (`query`, `summarize`): reasoning-service queries and LLM summaries
//!
//! ## Library usage
//!
//! ```no_run
//! use kg_summarizer::extract::Extractor;
//! use kg_summarizer::normalize::NodeNormClient;
//! use kg_summarizer::pubmed::PubmedClient;
//! use kg_summarizer::trapi::{QueryGraph, Response};
//!
//! let query_graph = QueryGraph::from_json(&std::fs::read_to_string("query.json").unwrap()).unwrap();
//! let response = Response::from_json(&std::fs::read_to_string("response.json").unwrap()).unwrap();
//!
//! let normalizer = NodeNormClient::default();
//! let pubmed = PubmedClient::default();
//! let graph = Extractor::new(&normalizer, &pubmed)
//!     .extract(&query_graph, &response.message, 0)
//!     .unwrap();
//! for edge in &graph.edges {
//!     println!("{} ({} publications)", edge.statement(), edge.publications.len());
//! }
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod normalize;
pub mod paths;
pub mod pubmed;
pub mod query;
pub mod select;
pub mod summarize;
pub mod trapi;
