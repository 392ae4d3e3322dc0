//! End-to-end extraction tests over saved TRAPI responses.
//!
//! Each fixture is a small but complete response; normalization and abstract
//! lookup use in-memory tables so no network is touched.

use std::collections::HashMap;

use kg_summarizer::error::{ExtractError, NormalizeError, NormalizeResult};
use kg_summarizer::extract::{Extractor, GraphContainer, result_summaries};
use kg_summarizer::normalize::{InMemoryNormalizer, NormalizedId, Normalizer};
use kg_summarizer::pubmed::InMemoryPublications;
use kg_summarizer::trapi::{GraphType, QueryGraph, Response};
use serde_json::{Value, json};

fn normalizer() -> InMemoryNormalizer {
    InMemoryNormalizer::new()
        .with_label("CHEBI:1", "riluzole")
        .with_label("CHEBI:2", "tetrabenazine")
        .with_label("MONDO:1", "Huntington disease")
        .with_label("MONDO:2", "movement disorder")
        .with_label("NCBIGene:1", "HTT")
        .with_label("DRUGBANK:1", "Rilutek")
}

fn publications() -> InMemoryPublications {
    InMemoryPublications::new()
        .with_abstract("PMID:1", "Riluzole slowed functional decline.")
        .with_abstract("PMID:2", "No effect on chorea was observed.")
}

fn lookup_query() -> QueryGraph {
    QueryGraph::from_value(json!({
        "nodes": {
            "n0": {"categories": ["biolink:ChemicalEntity"]},
            "n1": {"categories": ["biolink:Disease"], "ids": ["MONDO:1"]}
        },
        "edges": {"e0": {"subject": "n0", "object": "n1", "predicates": ["biolink:treats"]}}
    }))
    .unwrap()
}

fn edge(subject: &str, predicate: &str, object: &str, attributes: Value) -> Value {
    json!({"subject": subject, "predicate": predicate, "object": object, "attributes": attributes})
}

fn pubs(ids: &[&str]) -> Value {
    json!([{"attribute_type_id": "biolink:publications", "value": ids}])
}

/// Three results scored 0.2, 0.9 and 0.5. The 0.5 result binds a chemical
/// the normalizer doesn't know.
fn lookup_response() -> Value {
    json!({
        "message": {
            "knowledge_graph": {
                "nodes": {
                    "CHEBI:1": {
                        "name": "riluzole",
                        "attributes": [
                            {"attribute_type_id": "biolink:same_as", "value": ["CHEBI:1", "DRUGBANK:1"]},
                            {"attribute_type_id": "biolink:synonym", "value": ["Rilutek", "RP-54274"]},
                            {"attribute_type_id": "dct:description", "value": "A benzothiazole."},
                            {"attribute_type_id": "biolink:id", "original_attribute_name": "standardized_smiles", "value": "NC1=NC2=CC=C(OC(F)(F)F)C=C2S1"}
                        ]
                    },
                    "CHEBI:2": {"name": "tetrabenazine", "attributes": []},
                    "CHEBI:9": {"name": "mystery compound", "attributes": []},
                    "MONDO:1": {"name": "Huntington disease", "attributes": null}
                },
                "edges": {
                    "e1": edge("CHEBI:1", "biolink:treats", "MONDO:1", pubs(&["PMID:1"])),
                    "e2": edge("CHEBI:1", "biolink:treats", "MONDO:1", pubs(&["PMID:1", "PMID:2"])),
                    "e3": edge("CHEBI:2", "biolink:treats", "MONDO:1", json!([])),
                    "e4": edge("CHEBI:9", "biolink:treats", "MONDO:1", json!([]))
                }
            },
            "results": [
                {
                    "node_bindings": {"n0": [{"id": "CHEBI:2"}], "n1": [{"id": "MONDO:1"}]},
                    "analyses": [{"edge_bindings": {"e0": [{"id": "e3"}]}, "score": 0.2}]
                },
                {
                    "node_bindings": {"n0": [{"id": "CHEBI:1"}], "n1": [{"id": "MONDO:1"}]},
                    "analyses": [{"edge_bindings": {"e0": [{"id": "e1"}, {"id": "e2"}]}, "score": 0.9}]
                },
                {
                    "node_bindings": {"n0": [{"id": "CHEBI:9"}], "n1": [{"id": "MONDO:1"}]},
                    "analyses": [{"edge_bindings": {"e0": [{"id": "e4"}]}, "score": 0.5}]
                }
            ]
        }
    })
}

fn creative_query() -> QueryGraph {
    QueryGraph::from_value(json!({
        "nodes": {
            "ON": {"categories": ["biolink:Disease"], "ids": ["MONDO:1"]},
            "SN": {"categories": ["biolink:ChemicalEntity"]}
        },
        "edges": {
            "t_edge": {"subject": "SN", "object": "ON", "predicates": ["biolink:treats"], "knowledge_type": "inferred"}
        }
    }))
    .unwrap()
}

/// One creative result whose inferred edge cites `support_graphs`.
fn creative_response(support_graphs: &[&str]) -> Value {
    json!({
        "message": {
            "knowledge_graph": {
                "nodes": {
                    "CHEBI:1": {"name": "riluzole", "attributes": []},
                    "MONDO:1": {"name": "Huntington disease", "attributes": []},
                    "MONDO:2": {"name": "movement disorder", "attributes": [
                        {"attribute_type_id": "biolink:description", "value": "A neurological condition."}
                    ]},
                    "NCBIGene:1": {"name": "HTT", "attributes": []}
                },
                "edges": {
                    "inferred": edge("CHEBI:1", "biolink:treats", "MONDO:1", json!([
                        {"attribute_type_id": "biolink:support_graphs", "value": support_graphs}
                    ])),
                    "ab": edge("CHEBI:1", "biolink:affects", "NCBIGene:1", pubs(&["PMID:1", "PMID:404"])),
                    "bc": edge("NCBIGene:1", "biolink:gene_associated_with_condition", "MONDO:1", json!([])),
                    "ab2": edge("CHEBI:1", "biolink:affects", "NCBIGene:1", pubs(&["PMID:2"]))
                }
            },
            "auxiliary_graphs": {
                "sg1": {"edges": ["ab", "bc"]},
                "sg2": {"edges": ["ab2", "bc"]}
            },
            "results": [{
                "node_bindings": {
                    "ON": [{"id": "MONDO:1", "qnode_id": "MONDO:2"}],
                    "SN": [{"id": "CHEBI:1"}]
                },
                "analyses": [{"edge_bindings": {"t_edge": [{"id": "inferred"}]}, "score": 0.7}]
            }]
        }
    })
}

fn response(value: Value) -> Response {
    Response::from_value(value).unwrap()
}

#[test]
fn best_scored_result_is_extracted_first() {
    let norm = normalizer();
    let pubs = publications();
    let graph = Extractor::new(&norm, &pubs)
        .extract(&lookup_query(), &response(lookup_response()).message, 0)
        .unwrap();

    assert_eq!(graph.graph_type, GraphType::Lookup);
    assert_eq!(graph.score, 0.9);
    assert_eq!(graph.result_index, 0);
    assert!(graph.nodes.contains_key("riluzole"));
    assert!(graph.nodes.contains_key("Huntington disease"));
}

#[test]
fn duplicate_triples_merge_publications() {
    let norm = normalizer();
    let pubs = publications();
    let graph = Extractor::new(&norm, &pubs)
        .extract(&lookup_query(), &response(lookup_response()).message, 0)
        .unwrap();

    assert_eq!(graph.edges.len(), 1);
    let edge = &graph.edges[0];
    assert_eq!(edge.statement(), "riluzole treats Huntington disease");
    let ids: Vec<&str> = edge.publications.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["PMID:1", "PMID:2"]);
    assert_eq!(
        edge.publications[0].abstract_text.as_deref(),
        Some("Riluzole slowed functional decline.")
    );
}

#[test]
fn node_attributes_are_canonicalized() {
    let norm = normalizer();
    let graph = Extractor::without_publications(&norm)
        .extract(&lookup_query(), &response(lookup_response()).message, 0)
        .unwrap();

    let riluzole = &graph.nodes["riluzole"];
    // Own label dropped from same_as; the synonym repeating "Rilutek" collapses.
    assert_eq!(riluzole.same_as, ["Rilutek", "RP-54274"]);
    assert_eq!(riluzole.description, "A benzothiazole.");
    assert_eq!(riluzole.smiles, "NC1=NC2=CC=C(OC(F)(F)F)C=C2S1");
    assert!(riluzole.publications.is_empty());

    let disease = &graph.nodes["Huntington disease"];
    assert!(disease.same_as.is_empty());
    assert!(disease.subclass_of.is_none());
}

#[test]
fn edge_without_publications_attribute_has_none() {
    let norm = normalizer();
    let pubs = publications();
    let graph = Extractor::new(&norm, &pubs)
        .extract(&lookup_query(), &response(lookup_response()).message, 2)
        .unwrap();

    assert_eq!(graph.score, 0.2);
    assert_eq!(graph.edges.len(), 1);
    assert_eq!(graph.edges[0].statement(), "tetrabenazine treats Huntington disease");
    assert!(graph.edges[0].publications.is_empty());
}

#[test]
fn unresolved_binding_fails_the_result() {
    let norm = normalizer();
    let err = Extractor::without_publications(&norm)
        .extract(&lookup_query(), &response(lookup_response()).message, 1)
        .unwrap_err();
    assert!(
        matches!(&err, ExtractError::UnresolvedIdentifier { curie } if curie == "CHEBI:9"),
        "got {err:?}"
    );
}

#[test]
fn unresolved_edge_endpoint_fails_the_result() {
    let mut value = lookup_response();
    // Bind a resolvable node but an edge whose subject doesn't normalize.
    value["message"]["results"][1]["analyses"][0]["edge_bindings"]["e0"] = json!([{"id": "e4"}]);

    let norm = normalizer();
    let err = Extractor::without_publications(&norm)
        .extract(&lookup_query(), &response(value).message, 0)
        .unwrap_err();
    assert!(matches!(err, ExtractError::UnresolvedIdentifier { .. }));
}

#[test]
fn index_past_the_end_is_rejected() {
    let norm = normalizer();
    let err = Extractor::without_publications(&norm)
        .extract(&lookup_query(), &response(lookup_response()).message, 3)
        .unwrap_err();
    assert!(matches!(err, ExtractError::IndexOutOfRange { index: 3, len: 3 }));
}

#[test]
fn extraction_is_deterministic() {
    let norm = normalizer();
    let pubs = publications();
    let extractor = Extractor::new(&norm, &pubs);
    let msg = response(lookup_response()).message;

    let first = serde_json::to_string(&extractor.extract(&lookup_query(), &msg, 0).unwrap()).unwrap();
    let second = serde_json::to_string(&extractor.extract(&lookup_query(), &msg, 0).unwrap()).unwrap();
    assert_eq!(first, second);

    let msg = response(creative_response(&["sg1", "sg2"])).message;
    let first = serde_json::to_string(&extractor.extract(&creative_query(), &msg, 0).unwrap()).unwrap();
    let second = serde_json::to_string(&extractor.extract(&creative_query(), &msg, 0).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn creative_support_graph_becomes_a_sentence() {
    let norm = normalizer();
    let pubs = publications();
    let graph = Extractor::new(&norm, &pubs)
        .extract(&creative_query(), &response(creative_response(&["sg1"])).message, 0)
        .unwrap();

    assert_eq!(graph.graph_type, GraphType::Creative);
    assert_eq!(graph.edges.len(), 1);
    let inferred = &graph.edges[0];
    assert_eq!(inferred.statement(), "riluzole treats Huntington disease");
    assert_eq!(inferred.support_graphs.len(), 1);

    let sg = &inferred.support_graphs[0];
    assert_eq!(sg.id, "sg1");
    assert_eq!(
        sg.sentence,
        "riluzole affects HTT, and HTT gene associated with condition Huntington disease."
    );
    // PMID:404 has no abstract and is dropped.
    let ids: Vec<&str> = sg.edges[0].publications.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["PMID:1"]);
    assert!(sg.edges[1].publications.is_empty());
}

#[test]
fn creative_node_keeps_its_superclass() {
    let norm = normalizer();
    let graph = Extractor::without_publications(&norm)
        .extract(&creative_query(), &response(creative_response(&["sg1"])).message, 0)
        .unwrap();

    let parent = graph.nodes["Huntington disease"]
        .subclass_of
        .as_ref()
        .expect("superclass attached");
    assert_eq!(parent.label, "movement disorder");
    assert_eq!(parent.node.description, "A neurological condition.");
}

#[test]
fn support_graphs_with_the_same_sentence_are_both_kept() {
    let norm = normalizer();
    let graph = Extractor::without_publications(&norm)
        .extract(&creative_query(), &response(creative_response(&["sg1", "sg2"])).message, 0)
        .unwrap();

    let inferred = &graph.edges[0];
    let ids: Vec<&str> = inferred.support_graphs.iter().map(|sg| sg.id.as_str()).collect();
    assert_eq!(ids, ["sg1", "sg2"]);
    assert_eq!(inferred.support_graphs[0].sentence, inferred.support_graphs[1].sentence);
    assert_eq!(inferred.support_graphs_by_sentence().len(), 1);
}

#[test]
fn missing_auxiliary_graph_is_malformed() {
    let norm = normalizer();
    let err = Extractor::without_publications(&norm)
        .extract(&creative_query(), &response(creative_response(&["sg1", "sg9"])).message, 0)
        .unwrap_err();
    assert!(matches!(err, ExtractError::MalformedResponse { .. }));
}

#[test]
fn creative_result_without_t_edge_is_malformed() {
    let mut value = creative_response(&["sg1"]);
    value["message"]["results"][0]["analyses"][0]["edge_bindings"] = json!({"e0": [{"id": "inferred"}]});

    let norm = normalizer();
    let err = Extractor::without_publications(&norm)
        .extract(&creative_query(), &response(value).message, 0)
        .unwrap_err();
    assert!(matches!(err, ExtractError::MalformedResponse { .. }));
}

#[test]
fn container_reselection_is_repeatable() {
    let norm = normalizer();
    let pubs = publications();
    let mut container = GraphContainer::new(
        lookup_query(),
        response(lookup_response()),
        0,
        Extractor::new(&norm, &pubs),
    )
    .unwrap();
    let first = container.graph().clone();

    container.set_result(2).unwrap();
    assert_eq!(container.result_index(), 2);
    assert_ne!(container.graph(), &first);

    container.set_result(0).unwrap();
    assert_eq!(container.graph(), &first);
}

#[test]
fn failed_reselection_keeps_previous_graph() {
    let norm = normalizer();
    let mut container = GraphContainer::new(
        lookup_query(),
        response(lookup_response()),
        0,
        Extractor::without_publications(&norm),
    )
    .unwrap();
    let before = container.graph().clone();

    assert!(container.set_result(1).is_err());
    assert!(container.set_result(7).is_err());
    assert_eq!(container.graph(), &before);
    assert_eq!(container.result_index(), 0);
}

#[test]
fn result_listing_reports_failed_rows() {
    let norm = normalizer();
    let container = GraphContainer::new(
        lookup_query(),
        response(lookup_response()),
        0,
        Extractor::without_publications(&norm),
    )
    .unwrap();

    let rows = container.result_summaries(5);
    assert_eq!(rows.len(), 3);
    let scores: Vec<f64> = rows.iter().map(|r| r.score).collect();
    assert_eq!(scores, [0.9, 0.5, 0.2]);

    assert_eq!(
        rows[0].outcome.as_ref().unwrap(),
        &["riluzole treats Huntington disease".to_string()]
    );
    assert!(matches!(
        rows[1].outcome,
        Err(ExtractError::UnresolvedIdentifier { .. })
    ));
    assert!(rows[2].outcome.is_ok());
}

#[test]
fn container_snapshot_serializes() {
    let norm = normalizer();
    let container = GraphContainer::new(
        creative_query(),
        response(creative_response(&["sg1"])),
        0,
        Extractor::without_publications(&norm),
    )
    .unwrap();

    let json = serde_json::to_value(container.snapshot()).unwrap();
    assert_eq!(json["graph_type"], "creative");
    assert_eq!(json["result_count"], 1);
    assert_eq!(
        json["graph"]["edges"][0]["support_graphs"][0]["id"],
        "sg1"
    );
}

#[test]
fn listing_survives_a_failing_top_result() {
    let mut value = lookup_response();
    // The unresolvable 0.5 result becomes the best-scored one.
    value["message"]["results"][2]["analyses"][0]["score"] = json!(0.95);
    let msg = response(value).message;
    let norm = normalizer();

    let extractor = Extractor::without_publications(&norm);
    assert!(extractor.extract(&lookup_query(), &msg, 0).is_err());

    let rows = result_summaries(extractor, GraphType::Lookup, &msg, 5).unwrap();
    assert_eq!(rows.len(), 3);
    assert!(matches!(
        rows[0].outcome,
        Err(ExtractError::UnresolvedIdentifier { .. })
    ));
    assert_eq!(
        rows[1].outcome.as_ref().unwrap(),
        &["riluzole treats Huntington disease".to_string()]
    );
    assert!(rows[2].outcome.is_ok());
}

struct Unavailable;

impl Normalizer for Unavailable {
    fn normalize(&self, _curies: &[String]) -> NormalizeResult<HashMap<String, NormalizedId>> {
        Err(NormalizeError::Status {
            url: "http://nodenorm.test".into(),
            code: 503,
        })
    }
}

#[test]
fn normalization_outage_fails_the_result() {
    let err = Extractor::without_publications(&Unavailable)
        .extract(&lookup_query(), &response(lookup_response()).message, 0)
        .unwrap_err();
    assert!(
        matches!(err, ExtractError::Normalization(NormalizeError::Status { code: 503, .. })),
        "got {err:?}"
    );
}

#[test]
fn cooccurrence_graphs_are_expanded_and_broken_ones_skipped() {
    let mut value = lookup_response();
    value["message"]["knowledge_graph"]["edges"]["co"] =
        edge("CHEBI:1", "biolink:occurs_together_in_literature_with", "MONDO:1", pubs(&["PMID:1"]));
    value["message"]["auxiliary_graphs"] = json!({
        "co1": {"edges": ["co"]},
        "co2": {"edges": ["missing_edge"]}
    });
    value["message"]["results"][1]["analyses"][0]["support_graphs"] = json!(["co1", "co2", "co3"]);

    let norm = normalizer();
    let pubs = publications();
    let graph = Extractor::new(&norm, &pubs)
        .extract(&lookup_query(), &response(value).message, 0)
        .unwrap();

    assert_eq!(graph.cooccurrence.len(), 1);
    let co = &graph.cooccurrence[0];
    assert_eq!(co.id, "co1");
    assert_eq!(
        co.sentence,
        "riluzole occurs together in literature with Huntington disease."
    );
    // Shown as bare triples.
    assert!(co.edges[0].publications.iter().all(|p| p.abstract_text.is_none()));
}
