//! Canonical evidence graph produced by extraction.
//!
//! These are plain values: the caller owns them outright and nothing in them
//! refers back to the response they were derived from.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::pubmed::Publication;
use crate::trapi::GraphType;

/// Normalized evidence for one selected result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalGraph {
    pub graph_type: GraphType,
    /// Rank of the result in score order (0 = best).
    pub result_index: usize,
    pub score: f64,
    /// Nodes keyed by normalized label. Two curies sharing a label collapse.
    pub nodes: BTreeMap<String, CanonicalNode>,
    pub edges: Vec<CanonicalEdge>,
    /// Literature co-occurrence graphs attached to the result's analysis.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cooccurrence: Vec<SupportGraph>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalNode {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub publications: Vec<Publication>,
    /// Alternate labels and synonyms, de-duplicated, first-seen order.
    #[serde(default)]
    pub same_as: Vec<String>,
    #[serde(default)]
    pub smiles: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subclass_of: Option<Box<Superclass>>,
}

/// Ontology parent a creative answer matched its query node through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Superclass {
    pub label: String,
    pub node: CanonicalNode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEdge {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    #[serde(default)]
    pub publications: Vec<Publication>,
    /// Inference chains behind a creative edge; empty for lookup edges.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub support_graphs: Vec<SupportGraph>,
}

impl CanonicalEdge {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            publications: Vec::new(),
            support_graphs: Vec::new(),
        }
    }

    /// `"{subject} {predicate} {object}"`.
    pub fn statement(&self) -> String {
        format!("{} {} {}", self.subject, self.predicate, self.object)
    }

    /// Support graphs keyed by their path sentence.
    ///
    /// Graphs that render to the same sentence collide here and the last one
    /// wins; `support_graphs` itself keeps every graph.
    pub fn support_graphs_by_sentence(&self) -> HashMap<&str, &[CanonicalEdge]> {
        self.support_graphs
            .iter()
            .map(|sg| (sg.sentence.as_str(), sg.edges.as_slice()))
            .collect()
    }
}

/// One auxiliary chain of edges justifying an inferred edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportGraph {
    /// Auxiliary graph id minted by the reasoning service.
    pub id: String,
    /// Readable rendering of the chain, see [`path_sentence`].
    pub sentence: String,
    pub edges: Vec<CanonicalEdge>,
}

/// Render a chain of edges as one sentence.
///
/// `"A rel B."` for one edge; `"A rel B, and B rel C."` for two; interior
/// edges are comma-separated and the last one is prefixed with `"and "`.
pub fn path_sentence(edges: &[CanonicalEdge]) -> String {
    let n = edges.len();
    let mut sentence = String::new();
    for (i, edge) in edges.iter().enumerate() {
        let statement = edge.statement();
        if n == 1 {
            sentence.push_str(&statement);
            sentence.push('.');
        } else if i == n - 1 {
            sentence.push_str("and ");
            sentence.push_str(&statement);
            sentence.push('.');
        } else {
            sentence.push_str(&statement);
            sentence.push_str(", ");
        }
    }
    sentence
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentence_punctuation() {
        let ab = CanonicalEdge::new("A", "rel", "B");
        let bc = CanonicalEdge::new("B", "rel", "C");
        let cd = CanonicalEdge::new("C", "rel", "D");

        assert_eq!(path_sentence(std::slice::from_ref(&ab)), "A rel B.");
        assert_eq!(
            path_sentence(&[ab.clone(), bc.clone()]),
            "A rel B, and B rel C."
        );
        assert_eq!(
            path_sentence(&[ab, bc, cd]),
            "A rel B, B rel C, and C rel D."
        );
        assert_eq!(path_sentence(&[]), "");
    }

    #[test]
    fn sentence_view_collapses_duplicates() {
        let mut edge = CanonicalEdge::new("X", "treats", "Y");
        for id in ["sg1", "sg2"] {
            edge.support_graphs.push(SupportGraph {
                id: id.into(),
                sentence: "X affects Y.".into(),
                edges: vec![CanonicalEdge::new("X", "affects", "Y")],
            });
        }
        assert_eq!(edge.support_graphs.len(), 2);
        assert_eq!(edge.support_graphs_by_sentence().len(), 1);
    }
}
