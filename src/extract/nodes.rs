//! Node evidence: bound knowledge-graph nodes → [`CanonicalNode`]s.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::model::{CanonicalNode, Superclass};
use super::{Extractor, required_label};
use crate::error::ExtractResult;
use crate::normalize::NormalizedId;
use crate::pubmed::dedup_ids;
use crate::trapi::{KnownAttribute, Message, NodeRecord, TrapiResult};

impl Extractor<'_> {
    /// Resolve every node bound by `result` to its canonical attributes.
    ///
    /// All bound curies (and any `qnode_id` parents) are normalized in a single
    /// batch. A bound curie that does not normalize fails the whole result.
    pub fn extract_nodes(
        &self,
        result: &TrapiResult,
        message: &Message,
    ) -> ExtractResult<BTreeMap<String, CanonicalNode>> {
        let bindings: Vec<_> = result
            .node_bindings
            .iter()
            .flat_map(|(_, list)| list.iter())
            .collect();

        let mut curies: Vec<String> = Vec::new();
        for binding in &bindings {
            let parent = binding.qnode_id.iter();
            for curie in std::iter::once(&binding.id).chain(parent) {
                if !curies.contains(curie) {
                    curies.push(curie.clone());
                }
            }
        }
        let resolved = self.normalize(curies)?;

        let mut nodes = BTreeMap::new();
        for binding in bindings {
            let label = required_label(&resolved, &binding.id)?;
            let record = message.node(&binding.id)?;
            let mut node = self.parse_node(record, &label)?;

            if let Some(parent) = &binding.qnode_id {
                node.subclass_of = self.parse_superclass(message, parent, &resolved)?;
            }

            nodes.insert(label, node);
        }

        Ok(nodes)
    }

    /// Parse the optional ontology parent of a bound node.
    ///
    /// A parent the response doesn't define, or one that won't normalize, is
    /// skipped rather than failing the result.
    fn parse_superclass(
        &self,
        message: &Message,
        curie: &str,
        resolved: &HashMap<String, NormalizedId>,
    ) -> ExtractResult<Option<Box<Superclass>>> {
        let Some(id) = resolved.get(curie) else {
            tracing::debug!(curie, "superclass did not normalize, skipping");
            return Ok(None);
        };
        let Ok(record) = message.node(curie) else {
            tracing::debug!(curie, "superclass missing from knowledge graph, skipping");
            return Ok(None);
        };

        let node = self.parse_node(record, &id.label)?;
        Ok(Some(Box::new(Superclass {
            label: id.label.clone(),
            node,
        })))
    }

    /// Map a node's attribute list onto a [`CanonicalNode`].
    fn parse_node(&self, record: &NodeRecord, own_label: &str) -> ExtractResult<CanonicalNode> {
        let mut node = CanonicalNode::default();
        let mut same_as: Vec<String> = Vec::new();
        let mut publication_ids: Vec<String> = Vec::new();

        for attr in KnownAttribute::parse_all(&record.attributes) {
            match attr {
                KnownAttribute::SameAs(curies) => {
                    let resolved = self.normalize(curies.clone())?;
                    same_as.extend(
                        curies
                            .iter()
                            .filter_map(|c| resolved.get(c))
                            .map(|id| id.label.clone())
                            .filter(|label| !label.is_empty() && label != own_label),
                    );
                }
                KnownAttribute::Synonym(names) => same_as.extend(names),
                KnownAttribute::Smiles(smiles) => node.smiles = smiles,
                KnownAttribute::Description(text) => node.description = text,
                // Several publication attributes may appear; merged below.
                KnownAttribute::Publications(ids) => publication_ids.extend(ids),
                KnownAttribute::SupportGraphs(_) => {}
            }
        }

        let mut seen = HashSet::new();
        node.same_as = same_as
            .into_iter()
            .filter(|s| seen.insert(s.clone()))
            .collect();
        node.publications =
            self.finish_publications(dedup_ids(publication_ids.iter().map(String::as_str)));

        Ok(node)
    }
}
