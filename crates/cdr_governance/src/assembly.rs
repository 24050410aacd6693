//! Document assembly from bound canonical rows.
//!
//! Canonical types receive a concept -> context -> field tree built from the
//! rows each request was bound to. Leaves always carry the canonical name and
//! definition, never the name that was originally requested.

use crate::resolver::FieldRequest;
use cdr_dictionary::naming::lower_camel;
use cdr_dictionary::CdrRow;
use cdr_ids::RowUid;
use cdr_lint::{DocumentModel, Endpoint, FieldRef, Property, TypeDef, TypeRole};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Everything about the document except its canonical fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentSkeleton {
    pub base_uri: String,
    #[serde(default)]
    pub security_schemes: Vec<String>,
    #[serde(default)]
    pub types: Vec<TypeShell>,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

/// A type declaration before canonical fields are filled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeShell {
    pub name: String,
    pub role: TypeRole,

    /// Whether the bound field tree is placed in this type. Defaults to the
    /// role: request, response and entity types carry fields; envelopes don't.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_fields: Option<bool>,

    /// Extra properties kept as-is (envelope fields such as `items`).
    #[serde(default)]
    pub properties: Vec<Property>,
}

impl TypeShell {
    pub fn new(name: impl Into<String>, role: TypeRole) -> Self {
        Self {
            name: name.into(),
            role,
            canonical_fields: None,
            properties: Vec::new(),
        }
    }

    pub fn with_properties(mut self, properties: Vec<Property>) -> Self {
        self.properties = properties;
        self
    }

    pub fn carries_canonical_fields(&self) -> bool {
        self.canonical_fields
            .unwrap_or_else(|| self.role.carries_canonical_fields())
    }
}

/// Build the document from a skeleton and `(request, bound row)` pairs.
pub fn assemble(skeleton: &DocumentSkeleton, bindings: &[(&FieldRequest, &CdrRow)]) -> DocumentModel {
    let tree = field_tree(bindings);

    let types = skeleton
        .types
        .iter()
        .map(|shell| {
            let mut properties = Vec::new();
            if shell.carries_canonical_fields() {
                properties.extend(tree.iter().cloned());
            }
            properties.extend(shell.properties.iter().cloned());
            TypeDef::new(shell.name.clone(), shell.role).with_properties(properties)
        })
        .collect();

    DocumentModel {
        base_uri: skeleton.base_uri.clone(),
        security_schemes: skeleton.security_schemes.clone(),
        types,
        endpoints: skeleton.endpoints.clone(),
    }
}

/// Concept nodes in first-seen order, contexts likewise, leaves in request
/// order. Requests bound to the same row share one leaf, required if any
/// of them is.
fn field_tree(bindings: &[(&FieldRequest, &CdrRow)]) -> Vec<Property> {
    let mut concepts: Vec<(String, Vec<(String, Vec<Property>)>)> = Vec::new();
    let mut placed: HashMap<RowUid, (usize, usize, usize)> = HashMap::new();

    for (request, row) in bindings {
        if let Some(&(c, x, l)) = placed.get(row.uid()) {
            let leaf = &mut concepts[c].1[x].1[l];
            leaf.required |= request.required;
            continue;
        }

        let c = match concepts.iter().position(|(name, _)| name == row.concept()) {
            Some(idx) => idx,
            None => {
                concepts.push((row.concept().to_string(), Vec::new()));
                concepts.len() - 1
            }
        };
        let contexts = &mut concepts[c].1;
        let x = match contexts.iter().position(|(name, _)| name == row.context()) {
            Some(idx) => idx,
            None => {
                contexts.push((row.context().to_string(), Vec::new()));
                contexts.len() - 1
            }
        };
        let leaves = &mut contexts[x].1;
        leaves.push(leaf(row, request.required));
        placed.insert(row.uid().clone(), (c, x, leaves.len() - 1));
    }

    concepts
        .into_iter()
        .map(|(concept, contexts)| {
            let children = contexts
                .into_iter()
                .map(|(context, leaves)| Property::node(lower_camel(&context), leaves))
                .collect();
            Property::node(lower_camel(&concept), children)
        })
        .collect()
}

fn leaf(row: &CdrRow, required: bool) -> Property {
    Property::field(
        row.data_requirement(),
        row.data_type(),
        required,
        FieldRef {
            concept: row.concept().to_string(),
            context: row.context().to_string(),
            data_requirement: row.data_requirement().to_string(),
            uid: row.uid().clone(),
            definition: Some(row.definition().to_string()),
            data_type: Some(row.data_type()),
        },
    )
    .with_description(row.definition())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdr_dictionary::DataType;

    fn row(concept: &str, context: &str, name: &str, uid: &str) -> CdrRow {
        CdrRow::new(
            concept,
            context,
            name,
            format!("The {name}"),
            DataType::String,
            RowUid::parse(uid).unwrap(),
        )
        .unwrap()
    }

    fn skeleton() -> DocumentSkeleton {
        DocumentSkeleton {
            base_uri: "https://api.example.com/crm/v1".into(),
            security_schemes: vec!["oauth2".into()],
            types: vec![
                TypeShell::new("CustomerResponse", TypeRole::Response),
                TypeShell::new("StandardErrorResponse", TypeRole::Error).with_properties(vec![
                    Property::plain("code", DataType::String, true),
                ]),
            ],
            endpoints: Vec::new(),
        }
    }

    #[test]
    fn builds_concept_context_tree() {
        let email = row("Customer", "Contact", "emailAddress", "CDR-1");
        let first = row("Customer", "Profile", "firstName", "CDR-2");
        let sms = row("Customer", "Contact", "smsNumber", "CDR-3");
        let requests = [
            FieldRequest::new("Customer", "Contact", "emailAddress", true),
            FieldRequest::new("Customer", "Profile", "firstName", false),
            FieldRequest::new("Customer", "Contact", "mobileNumber", true),
        ];
        let bindings = vec![
            (&requests[0], &email),
            (&requests[1], &first),
            (&requests[2], &sms),
        ];

        let doc = assemble(&skeleton(), &bindings);
        let response = doc.find_type("CustomerResponse").unwrap();
        assert_eq!(response.properties.len(), 1);

        let customer = &response.properties[0];
        assert_eq!(customer.name, "customer");
        let contexts: Vec<_> = customer.children.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(contexts, vec!["contact", "profile"]);

        let contact: Vec<_> = customer.children[0]
            .children
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        // Canonical name, not the requested one.
        assert_eq!(contact, vec!["emailAddress", "smsNumber"]);
        assert_eq!(
            customer.children[0].children[1].description.as_deref(),
            Some("The smsNumber")
        );
        assert!(!customer.children[1].children[0].required);
    }

    #[test]
    fn envelope_types_keep_their_own_properties() {
        let email = row("Customer", "Contact", "emailAddress", "CDR-1");
        let request = FieldRequest::new("Customer", "Contact", "emailAddress", true);
        let doc = assemble(&skeleton(), &[(&request, &email)]);

        let error = doc.find_type("StandardErrorResponse").unwrap();
        assert_eq!(error.properties.len(), 1);
        assert_eq!(error.properties[0].name, "code");
    }

    #[test]
    fn duplicate_bindings_share_a_leaf() {
        let sms = row("Customer", "Contact", "smsNumber", "CDR-3");
        let a = FieldRequest::new("Customer", "Contact", "smsNumber", false);
        let b = FieldRequest::new("Customer", "Contact", "mobileNumber", true);
        let doc = assemble(&skeleton(), &[(&a, &sms), (&b, &sms)]);

        let contact = &doc.types[0].properties[0].children[0];
        assert_eq!(contact.children.len(), 1);
        assert!(contact.children[0].required);
    }

    #[test]
    fn multi_word_labels_become_camel_case_nodes() {
        let row = row("Customer Account", "Billing Address", "postalCode", "CDR-9");
        let request = FieldRequest::new("Customer Account", "Billing Address", "postalCode", true);
        let doc = assemble(&skeleton(), &[(&request, &row)]);

        let root = &doc.types[0].properties[0];
        assert_eq!(root.name, "customerAccount");
        assert_eq!(root.children[0].name, "billingAddress");
    }
}
