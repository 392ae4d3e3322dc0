//! Collapse edges that state the same fact.

use std::collections::{HashMap, HashSet};

use super::model::CanonicalEdge;

/// Merge edges sharing `(subject, object, predicate)`.
///
/// Publications are unioned by id, keeping the first-seen entry for a
/// duplicate id. Output order is the first occurrence of each triple. Used for
/// lookup answers, where several knowledge sources often assert one fact.
pub fn merge(edges: Vec<CanonicalEdge>) -> Vec<CanonicalEdge> {
    let mut merged: Vec<CanonicalEdge> = Vec::with_capacity(edges.len());
    let mut slots: HashMap<(String, String, String), usize> = HashMap::new();

    for edge in edges {
        let key = (
            edge.subject.clone(),
            edge.object.clone(),
            edge.predicate.clone(),
        );
        match slots.get(&key) {
            Some(&slot) => {
                let target = &mut merged[slot];
                let mut seen: HashSet<String> =
                    target.publications.iter().map(|p| p.id.clone()).collect();
                for publication in edge.publications {
                    if seen.insert(publication.id.clone()) {
                        target.publications.push(publication);
                    }
                }
            }
            None => {
                slots.insert(key, merged.len());
                merged.push(edge);
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pubmed::Publication;

    fn edge(s: &str, p: &str, o: &str, pubs: &[(&str, &str)]) -> CanonicalEdge {
        let mut e = CanonicalEdge::new(s, p, o);
        e.publications = pubs
            .iter()
            .map(|(id, text)| Publication {
                id: id.to_string(),
                abstract_text: Some(text.to_string()),
            })
            .collect();
        e
    }

    #[test]
    fn duplicate_triples_union_publications_by_id() {
        let merged = merge(vec![
            edge("aspirin", "treats", "pain", &[("PMID:1", "first")]),
            edge(
                "aspirin",
                "treats",
                "pain",
                &[("PMID:1", "second"), ("PMID:2", "two")],
            ),
        ]);
        assert_eq!(merged.len(), 1);
        let ids: Vec<&str> = merged[0].publications.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["PMID:1", "PMID:2"]);
        assert_eq!(merged[0].publications[0].abstract_text.as_deref(), Some("first"));
    }

    #[test]
    fn order_follows_first_occurrence() {
        let merged = merge(vec![
            edge("a", "r", "b", &[]),
            edge("c", "r", "d", &[]),
            edge("a", "r", "b", &[("PMID:9", "x")]),
            edge("a", "q", "b", &[]),
        ]);
        let statements: Vec<String> = merged.iter().map(|e| e.statement()).collect();
        assert_eq!(statements, vec!["a r b", "c r d", "a q b"]);
        assert_eq!(merged[0].publications.len(), 1);
    }

    #[test]
    fn direction_matters() {
        let merged = merge(vec![edge("a", "r", "b", &[]), edge("b", "r", "a", &[])]);
        assert_eq!(merged.len(), 2);
    }
}
