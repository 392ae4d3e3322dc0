//! Edge evidence: bound edges → [`CanonicalEdge`]s.

use super::merge::merge;
use super::model::{CanonicalEdge, SupportGraph, path_sentence};
use super::{Extractor, required_label};
use crate::error::{ExtractError, ExtractResult};
use crate::pubmed::dedup_ids;
use crate::trapi::{CREATIVE_EDGE_KEY, EdgeRecord, GraphType, KnownAttribute, Message, TrapiResult};

/// Publication ids and support-graph ids carried by an edge.
#[derive(Default)]
struct EdgeAttributes {
    publications: Vec<String>,
    support_graphs: Vec<String>,
}

impl EdgeAttributes {
    fn parse(record: &EdgeRecord) -> Self {
        let mut out = Self::default();
        for attr in KnownAttribute::parse_all(&record.attributes) {
            match attr {
                KnownAttribute::Publications(ids) => out.publications.extend(ids),
                KnownAttribute::SupportGraphs(ids) => out.support_graphs.extend(ids),
                _ => {}
            }
        }
        out
    }
}

/// Human-readable predicate: namespace prefix dropped, underscores as spaces.
pub fn humanize_predicate(predicate: &str) -> String {
    let bare = predicate
        .split_once(':')
        .map(|(_, rest)| rest)
        .unwrap_or(predicate);
    bare.replace('_', " ")
}

impl Extractor<'_> {
    /// Resolve every edge of `result` according to the answer shape.
    pub fn extract_edges(
        &self,
        result: &TrapiResult,
        graph_type: GraphType,
        message: &Message,
    ) -> ExtractResult<Vec<CanonicalEdge>> {
        match graph_type {
            GraphType::Lookup => self.lookup_edges(result, message),
            GraphType::Creative => self.creative_edges(result, message),
        }
    }

    /// One edge per bound edge, merged on identical triples, then resolved.
    fn lookup_edges(
        &self,
        result: &TrapiResult,
        message: &Message,
    ) -> ExtractResult<Vec<CanonicalEdge>> {
        let analysis = result.primary_analysis()?;

        let mut edges = Vec::new();
        for (_, bindings) in analysis.edge_bindings.iter() {
            for binding in bindings {
                let record = message.edge(&binding.id)?;
                let mut edge = self.resolve_triple(record)?;
                let attrs = EdgeAttributes::parse(record);
                edge.publications = dedup_ids(attrs.publications.iter().map(String::as_str));
                edges.push(edge);
            }
        }

        // Merge on raw ids so each abstract is fetched once.
        let mut merged = merge(edges);
        for edge in &mut merged {
            edge.publications = self.finish_publications(std::mem::take(&mut edge.publications));
        }
        Ok(merged)
    }

    /// The inferred edge(s) bound to `t_edge`, with support graphs expanded.
    fn creative_edges(
        &self,
        result: &TrapiResult,
        message: &Message,
    ) -> ExtractResult<Vec<CanonicalEdge>> {
        let analysis = result.primary_analysis()?;
        let bindings = analysis.edge_bindings.get(CREATIVE_EDGE_KEY).ok_or_else(|| {
            ExtractError::malformed(format!(
                "creative result has no \"{CREATIVE_EDGE_KEY}\" edge binding"
            ))
        })?;

        let mut edges = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let record = message.edge(&binding.id)?;
            let attrs = EdgeAttributes::parse(record);
            let mut edge = self.resolved_edge(record, &attrs)?;

            for sg_id in &attrs.support_graphs {
                edge.support_graphs.push(self.support_graph(message, sg_id)?);
            }
            edges.push(edge);
        }
        Ok(edges)
    }

    /// Literature co-occurrence graphs cited by the primary analysis.
    ///
    /// Expanded as bare triples. A graph whose edges or endpoints are missing
    /// is skipped; a normalization service failure still fails the result.
    pub fn cooccurrence_graphs(
        &self,
        result: &TrapiResult,
        message: &Message,
    ) -> ExtractResult<Vec<SupportGraph>> {
        let analysis = result.primary_analysis()?;
        let triples_only = self.skipping_publications();

        let mut graphs = Vec::with_capacity(analysis.support_graphs.len());
        for id in &analysis.support_graphs {
            match triples_only.support_graph(message, id) {
                Ok(graph) => graphs.push(graph),
                Err(e @ ExtractError::Normalization(_)) => return Err(e),
                Err(e) => tracing::debug!(id = %id, error = %e, "skipping co-occurrence graph"),
            }
        }
        Ok(graphs)
    }

    /// Expand one auxiliary graph into its chain of edges and path sentence.
    fn support_graph(&self, message: &Message, id: &str) -> ExtractResult<SupportGraph> {
        let aux = message.auxiliary_graph(id)?;

        let mut chain = Vec::with_capacity(aux.edges.len());
        for edge_id in &aux.edges {
            let record = message.edge(edge_id)?;
            let attrs = EdgeAttributes::parse(record);
            chain.push(self.resolved_edge(record, &attrs)?);
        }

        Ok(SupportGraph {
            id: id.to_string(),
            sentence: path_sentence(&chain),
            edges: chain,
        })
    }

    /// Triple plus resolved publications.
    fn resolved_edge(
        &self,
        record: &EdgeRecord,
        attrs: &EdgeAttributes,
    ) -> ExtractResult<CanonicalEdge> {
        let mut edge = self.resolve_triple(record)?;
        edge.publications =
            self.finish_publications(dedup_ids(attrs.publications.iter().map(String::as_str)));
        Ok(edge)
    }

    /// Normalize subject and object together; both are required.
    fn resolve_triple(&self, record: &EdgeRecord) -> ExtractResult<CanonicalEdge> {
        let mut curies = vec![record.subject.clone()];
        if record.object != record.subject {
            curies.push(record.object.clone());
        }
        let resolved = self.normalize(curies)?;

        Ok(CanonicalEdge::new(
            required_label(&resolved, &record.subject)?,
            humanize_predicate(&record.predicate),
            required_label(&resolved, &record.object)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicate_formatting() {
        assert_eq!(humanize_predicate("biolink:treats"), "treats");
        assert_eq!(
            humanize_predicate("biolink:gene_associated_with_condition"),
            "gene associated with condition"
        );
        assert_eq!(humanize_predicate("related_to"), "related to");
    }
}
