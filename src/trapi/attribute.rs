//! Known attribute tags on knowledge-graph nodes and edges.
//!
//! TRAPI carries metadata as an open list of `(attribute_type_id, value)`
//! entries. The handful this crate understands are mapped onto typed variants
//! here; every other tag is skipped so new service attributes never break
//! extraction.

use serde_json::Value;

use super::Attribute;

pub const SAME_AS: &str = "biolink:same_as";
pub const SYNONYM: &str = "biolink:synonym";
pub const ID: &str = "biolink:id";
pub const DESCRIPTION: &str = "biolink:description";
pub const DCT_DESCRIPTION: &str = "dct:description";
pub const PUBLICATIONS: &str = "biolink:publications";
pub const SUPPORT_GRAPHS: &str = "biolink:support_graphs";

/// `original_attribute_name` that marks a `biolink:id` entry as a SMILES string.
pub const STANDARDIZED_SMILES: &str = "standardized_smiles";

/// A recognised attribute with its value coerced to the expected type.
#[derive(Debug, Clone, PartialEq)]
pub enum KnownAttribute {
    /// Equivalent curies; normalized into alternate labels.
    SameAs(Vec<String>),
    /// Free-text synonyms.
    Synonym(Vec<String>),
    Smiles(String),
    Description(String),
    /// Publication ids such as `PMID:12345`.
    Publications(Vec<String>),
    /// Auxiliary graph ids justifying an inferred edge.
    SupportGraphs(Vec<String>),
}

impl KnownAttribute {
    /// Classify one raw attribute, returning `None` for tags we don't model.
    pub fn parse(attr: &Attribute) -> Option<Self> {
        match attr.attribute_type_id.as_str() {
            SAME_AS => Some(Self::SameAs(string_list(&attr.value))),
            SYNONYM => Some(Self::Synonym(string_list(&attr.value))),
            ID if attr.original_attribute_name.as_deref() == Some(STANDARDIZED_SMILES) => {
                scalar_string(&attr.value).map(Self::Smiles)
            }
            DESCRIPTION | DCT_DESCRIPTION => scalar_string(&attr.value).map(Self::Description),
            PUBLICATIONS => Some(Self::Publications(string_list(&attr.value))),
            SUPPORT_GRAPHS => Some(Self::SupportGraphs(string_list(&attr.value))),
            _ => None,
        }
    }

    /// Parse every recognised attribute in a list, in order.
    pub fn parse_all(attrs: &[Attribute]) -> impl Iterator<Item = Self> + '_ {
        attrs.iter().filter_map(Self::parse)
    }
}

/// Accept either a single string or an array of strings.
fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Accept a string, or the first string of an array.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(|v| v.as_str().map(str::to_string)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attr(tag: &str, value: Value) -> Attribute {
        Attribute {
            attribute_type_id: tag.into(),
            value,
            original_attribute_name: None,
        }
    }

    #[test]
    fn publications_accept_scalar_and_list() {
        assert_eq!(
            KnownAttribute::parse(&attr(PUBLICATIONS, json!("PMID:1"))),
            Some(KnownAttribute::Publications(vec!["PMID:1".into()]))
        );
        assert_eq!(
            KnownAttribute::parse(&attr(PUBLICATIONS, json!(["PMID:1", 7, "PMID:2"]))),
            Some(KnownAttribute::Publications(vec![
                "PMID:1".into(),
                "PMID:2".into()
            ]))
        );
    }

    #[test]
    fn smiles_requires_original_name() {
        let plain = attr(ID, json!("CCO"));
        assert_eq!(KnownAttribute::parse(&plain), None);

        let smiles = Attribute {
            original_attribute_name: Some(STANDARDIZED_SMILES.into()),
            ..plain
        };
        assert_eq!(
            KnownAttribute::parse(&smiles),
            Some(KnownAttribute::Smiles("CCO".into()))
        );
    }

    #[test]
    fn both_description_tags() {
        for tag in [DESCRIPTION, DCT_DESCRIPTION] {
            assert_eq!(
                KnownAttribute::parse(&attr(tag, json!("a disease"))),
                Some(KnownAttribute::Description("a disease".into()))
            );
        }
    }

    #[test]
    fn unknown_tags_are_skipped() {
        let attrs = vec![
            attr("biolink:Attribute", json!({"nested": true})),
            attr(SYNONYM, json!(["HD"])),
            attr("biolink:primary_knowledge_source", json!("infores:x")),
        ];
        let parsed: Vec<_> = KnownAttribute::parse_all(&attrs).collect();
        assert_eq!(parsed, vec![KnownAttribute::Synonym(vec!["HD".into()])]);
    }
}
