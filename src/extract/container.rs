//! A response held alongside the evidence graph of its selected result.

use std::collections::BTreeMap;

use serde::Serialize;

use super::Extractor;
use super::model::{CanonicalEdge, CanonicalGraph, CanonicalNode};
use crate::error::{ExtractError, ExtractResult};
use crate::select;
use crate::trapi::{GraphType, Message, QueryGraph, Response, TrapiResult};

/// Owns one response and the evidence graph of its currently selected result.
///
/// The answer shape and the score ranking are fixed at construction.
/// [`set_result`](Self::set_result) swaps in another result's graph by
/// extracting it afresh; nothing carries over from the previous selection.
pub struct GraphContainer<'a> {
    query_graph: QueryGraph,
    message: Message,
    graph_type: GraphType,
    /// Indices into `message.results`, best score first.
    ranking: Vec<usize>,
    extractor: Extractor<'a>,
    graph: CanonicalGraph,
}

/// One row of [`result_summaries`].
#[derive(Debug)]
pub struct ResultSummary {
    /// Rank in score order.
    pub index: usize,
    pub score: f64,
    /// Edge statements, or why this result could not be displayed.
    pub outcome: ExtractResult<Vec<String>>,
}

impl<'a> GraphContainer<'a> {
    /// Take ownership of a response and extract the result at rank `result_idx`.
    pub fn new(
        query_graph: QueryGraph,
        response: Response,
        result_idx: usize,
        extractor: Extractor<'a>,
    ) -> ExtractResult<Self> {
        let message = response.message;
        let graph_type = GraphType::of(&query_graph);
        let ranking = select::ranked_indices(&message)?;
        let graph = extractor.extract_result(
            graph_type,
            &message,
            ranked(&message, &ranking, result_idx)?,
            result_idx,
        )?;

        tracing::info!(
            %graph_type,
            results = message.results.len(),
            result_idx,
            "graph container ready"
        );

        Ok(Self {
            query_graph,
            message,
            graph_type,
            ranking,
            extractor,
            graph,
        })
    }

    /// Build from a response that echoes its own query graph.
    pub fn from_response(
        response: Response,
        result_idx: usize,
        extractor: Extractor<'a>,
    ) -> ExtractResult<Self> {
        let query_graph = response
            .message
            .query_graph
            .clone()
            .ok_or_else(|| ExtractError::malformed("response does not echo its query graph"))?;
        Self::new(query_graph, response, result_idx, extractor)
    }

    /// Re-derive nodes and edges for the result at rank `idx`.
    ///
    /// On failure the previous selection stays in place.
    pub fn set_result(&mut self, idx: usize) -> ExtractResult<()> {
        let result = ranked(&self.message, &self.ranking, idx)?;
        self.graph = self
            .extractor
            .extract_result(self.graph_type, &self.message, result, idx)?;
        Ok(())
    }

    pub fn graph(&self) -> &CanonicalGraph {
        &self.graph
    }

    pub fn nodes(&self) -> &BTreeMap<String, CanonicalNode> {
        &self.graph.nodes
    }

    pub fn edges(&self) -> &[CanonicalEdge] {
        &self.graph.edges
    }

    pub fn result_index(&self) -> usize {
        self.graph.result_index
    }

    pub fn result_count(&self) -> usize {
        self.message.results.len()
    }

    pub fn graph_type(&self) -> GraphType {
        self.graph_type
    }

    pub fn query_graph(&self) -> &QueryGraph {
        &self.query_graph
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Serializable view of the current selection.
    pub fn snapshot(&self) -> ContainerSnapshot<'_> {
        ContainerSnapshot {
            graph_type: self.graph_type,
            result_count: self.result_count(),
            graph: &self.graph,
        }
    }

    /// [`result_summaries`] over this container's response and ranking.
    ///
    /// The selected result is left untouched.
    pub fn result_summaries(&self, top_n: usize) -> Vec<ResultSummary> {
        let results = self.ranking.iter().map(|&i| &self.message.results[i]);
        summarize_ranked(self.extractor, self.graph_type, &self.message, results, top_n)
    }
}

/// Result at rank `idx` under a precomputed ranking.
fn ranked<'m>(
    message: &'m Message,
    ranking: &[usize],
    idx: usize,
) -> ExtractResult<&'m TrapiResult> {
    ranking
        .get(idx)
        .map(|&i| &message.results[i])
        .ok_or(ExtractError::IndexOutOfRange {
            index: idx,
            len: ranking.len(),
        })
}

/// Edge statements for the `top_n` best results, without fetching abstracts.
///
/// A result that fails extraction shows up as a failed row; the listing
/// itself only fails if the results cannot be ranked. No result needs to
/// extract successfully for the listing to be produced.
pub fn result_summaries(
    extractor: Extractor<'_>,
    graph_type: GraphType,
    message: &Message,
    top_n: usize,
) -> ExtractResult<Vec<ResultSummary>> {
    let ranked = select::ranked_results(message)?;
    Ok(summarize_ranked(
        extractor,
        graph_type,
        message,
        ranked.into_iter(),
        top_n,
    ))
}

fn summarize_ranked<'m>(
    extractor: Extractor<'_>,
    graph_type: GraphType,
    message: &Message,
    ranked: impl Iterator<Item = &'m TrapiResult>,
    top_n: usize,
) -> Vec<ResultSummary> {
    let extractor = extractor.skipping_publications();

    let mut rows = Vec::new();
    for (index, result) in ranked.take(top_n).enumerate() {
        let (score, outcome) = match result.score() {
            Ok(score) => (
                score,
                extractor
                    .extract_edges(result, graph_type, message)
                    .map(|edges| edges.iter().map(CanonicalEdge::statement).collect()),
            ),
            Err(e) => (f64::NAN, Err(e)),
        };
        if let Err(e) = &outcome {
            tracing::debug!(index, error = %e, "result could not be summarized");
        }
        rows.push(ResultSummary {
            index,
            score,
            outcome,
        });
    }
    rows
}

/// What `kg-summarizer show --json` prints.
#[derive(Debug, Serialize)]
pub struct ContainerSnapshot<'c> {
    pub graph_type: GraphType,
    pub result_count: usize,
    pub graph: &'c CanonicalGraph,
}
