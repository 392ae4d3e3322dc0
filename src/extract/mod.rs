//! Evidence extraction: TRAPI response → canonical evidence graph.
//!
//! The [`Extractor`] walks one selected result through the knowledge graph and
//! auxiliary graphs it references:
//!
//! - **Nodes** (`nodes`): each bound node becomes a [`CanonicalNode`] keyed by
//!   its normalized label, carrying description, synonyms, SMILES and cited
//!   publications.
//! - **Edges** (`edges`): lookup answers yield one edge per bound edge, merged
//!   on `(subject, object, predicate)`; creative answers yield the inferred
//!   edge(s) with their support graphs expanded into readable path sentences.
//!
//! Normalization and publication lookup are injected, so extraction runs
//! offline against [`InMemoryNormalizer`](crate::normalize::InMemoryNormalizer)
//! and [`InMemoryPublications`](crate::pubmed::InMemoryPublications).
//! Extraction is all-or-nothing per result.

pub mod container;
mod edges;
pub mod merge;
pub mod model;
mod nodes;

use std::collections::HashMap;

use crate::error::{ExtractError, ExtractResult};
use crate::normalize::{NormalizedId, Normalizer};
use crate::pubmed::{Publication, PublicationResolver, attach_abstracts};
use crate::select;
use crate::trapi::{GraphType, Message, QueryGraph, TrapiResult};

pub use container::{ContainerSnapshot, GraphContainer, ResultSummary, result_summaries};
pub use merge::merge;
pub use model::{
    CanonicalEdge, CanonicalGraph, CanonicalNode, SupportGraph, Superclass, path_sentence,
};

/// Turns selected results into [`CanonicalGraph`]s.
#[derive(Clone, Copy)]
pub struct Extractor<'a> {
    normalizer: &'a dyn Normalizer,
    publications: Option<&'a dyn PublicationResolver>,
}

impl<'a> Extractor<'a> {
    /// Extract with abstracts resolved through `publications`.
    pub fn new(
        normalizer: &'a dyn Normalizer,
        publications: &'a dyn PublicationResolver,
    ) -> Self {
        Self {
            normalizer,
            publications: Some(publications),
        }
    }

    /// Extract without touching the publication resolver.
    ///
    /// Publications keep their ids with no abstract, and non-PMID citations are
    /// retained.
    pub fn without_publications(normalizer: &'a dyn Normalizer) -> Self {
        Self {
            normalizer,
            publications: None,
        }
    }

    /// Copy of this extractor that skips publication lookup.
    pub fn skipping_publications(self) -> Self {
        Self {
            publications: None,
            ..self
        }
    }

    pub fn fetches_publications(&self) -> bool {
        self.publications.is_some()
    }

    /// Select the result at rank `idx` and extract its evidence graph.
    pub fn extract(
        &self,
        query_graph: &QueryGraph,
        message: &Message,
        idx: usize,
    ) -> ExtractResult<CanonicalGraph> {
        let graph_type = GraphType::of(query_graph);
        let result = select::select(message, idx)?;
        self.extract_result(graph_type, message, result, idx)
    }

    /// Extract the evidence graph of an already-selected result.
    pub fn extract_result(
        &self,
        graph_type: GraphType,
        message: &Message,
        result: &TrapiResult,
        result_index: usize,
    ) -> ExtractResult<CanonicalGraph> {
        let score = result.score()?;
        let nodes = self.extract_nodes(result, message)?;
        let edges = self.extract_edges(result, graph_type, message)?;
        let cooccurrence = self.cooccurrence_graphs(result, message)?;

        tracing::debug!(
            result_index,
            %graph_type,
            nodes = nodes.len(),
            edges = edges.len(),
            "extracted evidence graph"
        );

        Ok(CanonicalGraph {
            graph_type,
            result_index,
            score,
            nodes,
            edges,
            cooccurrence,
        })
    }

    /// Normalize a batch of curies in one call.
    fn normalize(&self, curies: Vec<String>) -> ExtractResult<HashMap<String, NormalizedId>> {
        Ok(self.normalizer.normalize(&curies)?)
    }

    /// Resolve abstracts if this extractor fetches publications.
    fn finish_publications(&self, publications: Vec<Publication>) -> Vec<Publication> {
        match self.publications {
            Some(resolver) => attach_abstracts(publications, resolver),
            None => publications,
        }
    }
}

/// Label of a curie the caller cannot do without.
fn required_label(
    resolved: &HashMap<String, NormalizedId>,
    curie: &str,
) -> ExtractResult<String> {
    resolved
        .get(curie)
        .map(|id| id.label.clone())
        .ok_or_else(|| ExtractError::UnresolvedIdentifier {
            curie: curie.to_string(),
        })
}
