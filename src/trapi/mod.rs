//! Typed model of the TRAPI (Translator Reasoner API) message shape.
//!
//! Only the parts the evidence extractor reads are modelled. Unknown fields are
//! ignored on input, and `null` is accepted wherever the services send it in
//! place of an empty collection.

pub mod attribute;
mod de;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ExtractError, ExtractResult};

pub use attribute::KnownAttribute;
pub use de::Bindings;
use de::nullable;

/// Query-graph edge key that marks an inferred ("creative") query.
pub const CREATIVE_EDGE_KEY: &str = "t_edge";

/// Which of the two answer shapes a query produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphType {
    /// Answer edges asserted directly by data sources.
    Lookup,
    /// A single inferred edge justified by auxiliary support graphs.
    Creative,
}

impl GraphType {
    /// Derive the answer shape from the query graph.
    pub fn of(query_graph: &QueryGraph) -> Self {
        if query_graph.edges.contains_key(CREATIVE_EDGE_KEY) {
            Self::Creative
        } else {
            Self::Lookup
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lookup => "lookup",
            Self::Creative => "creative",
        }
    }
}

impl std::fmt::Display for GraphType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Query graph
// ---------------------------------------------------------------------------

/// The structured question submitted to a reasoning service.
///
/// Keys are kept sorted so the serialized form is stable (it feeds the
/// response cache key).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryGraph {
    #[serde(default, deserialize_with = "nullable")]
    pub nodes: BTreeMap<String, QueryNode>,
    #[serde(default, deserialize_with = "nullable")]
    pub edges: BTreeMap<String, QueryEdge>,
}

impl QueryGraph {
    /// Parse a query graph from JSON, accepting either a bare graph or one
    /// wrapped as `{"message": {"query_graph": ...}}`.
    pub fn from_json(text: &str) -> ExtractResult<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| ExtractError::malformed(format!("query graph is not JSON: {e}")))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> ExtractResult<Self> {
        let inner = match value.pointer("/message/query_graph") {
            Some(qg) => qg.clone(),
            None => value,
        };
        serde_json::from_value(inner)
            .map_err(|e| ExtractError::malformed(format!("invalid query graph: {e}")))
    }

    pub fn graph_type(&self) -> GraphType {
        GraphType::of(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryNode {
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "nullable")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "nullable")]
    pub ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Constraint fields this crate does not interpret, passed through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryEdge {
    pub subject: String,
    pub object: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "nullable")]
    pub predicates: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_type: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// Top-level response envelope returned by a reasoning service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub message: Message,
}

impl Response {
    pub fn from_json(text: &str) -> ExtractResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| ExtractError::malformed(format!("invalid TRAPI response: {e}")))
    }

    pub fn from_value(value: Value) -> ExtractResult<Self> {
        serde_json::from_value(value)
            .map_err(|e| ExtractError::malformed(format!("invalid TRAPI response: {e}")))
    }
}

/// The body of a response: results plus the graphs they reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_graph: Option<QueryGraph>,
    #[serde(default, deserialize_with = "nullable")]
    pub knowledge_graph: KnowledgeGraph,
    #[serde(default, deserialize_with = "nullable")]
    pub results: Vec<TrapiResult>,
    #[serde(default, deserialize_with = "nullable")]
    pub auxiliary_graphs: HashMap<String, AuxiliaryGraph>,
}

impl Message {
    /// Look up a knowledge-graph node, failing if the response never defined it.
    pub fn node(&self, curie: &str) -> ExtractResult<&NodeRecord> {
        self.knowledge_graph.nodes.get(curie).ok_or_else(|| {
            ExtractError::malformed(format!("knowledge graph has no node \"{curie}\""))
        })
    }

    /// Look up a knowledge-graph edge by its service-minted id.
    pub fn edge(&self, edge_id: &str) -> ExtractResult<&EdgeRecord> {
        self.knowledge_graph.edges.get(edge_id).ok_or_else(|| {
            ExtractError::malformed(format!("knowledge graph has no edge \"{edge_id}\""))
        })
    }

    /// Look up an auxiliary (support) graph.
    pub fn auxiliary_graph(&self, id: &str) -> ExtractResult<&AuxiliaryGraph> {
        self.auxiliary_graphs.get(id).ok_or_else(|| {
            ExtractError::malformed(format!("response has no auxiliary graph \"{id}\""))
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    #[serde(default, deserialize_with = "nullable")]
    pub nodes: HashMap<String, NodeRecord>,
    #[serde(default, deserialize_with = "nullable")]
    pub edges: HashMap<String, EdgeRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub categories: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    #[serde(default, deserialize_with = "nullable")]
    pub attributes: Vec<Attribute>,
}

/// One `(attribute_type_id, value)` entry from a node or edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    pub attribute_type_id: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_attribute_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuxiliaryGraph {
    #[serde(default, deserialize_with = "nullable")]
    pub edges: Vec<String>,
}

/// One scored candidate answer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrapiResult {
    #[serde(default)]
    pub node_bindings: Bindings<Vec<Binding>>,
    #[serde(default, deserialize_with = "nullable")]
    pub analyses: Vec<Analysis>,
}

impl TrapiResult {
    /// The analysis every consumer reads; later analyses are ignored.
    pub fn primary_analysis(&self) -> ExtractResult<&Analysis> {
        self.analyses
            .first()
            .ok_or_else(|| ExtractError::malformed("result has no analyses"))
    }

    /// Score of the primary analysis.
    pub fn score(&self) -> ExtractResult<f64> {
        self.primary_analysis()?
            .score
            .ok_or_else(|| ExtractError::malformed("analysis has no score"))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(default)]
    pub edge_bindings: Bindings<Vec<Binding>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Literature co-occurrence support graphs attached to the analysis.
    #[serde(default, deserialize_with = "nullable")]
    pub support_graphs: Vec<String>,
}

/// A query key bound to one knowledge-graph node or edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub id: String,
    /// Ontology parent the service matched the query node through, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qnode_id: Option<String>,
}
