//! Nesting rules: canonical fields sit under concept then context nodes, and
//! each leaf stays faithful to the row it was built from.

use crate::document::{DocumentModel, Property, TypeDef};
use crate::rule::{BuiltinRule, Findings, RuleFamily};
use crate::violation::Severity;
use cdr_dictionary::naming::lower_camel;
use cdr_dictionary::DataType;
use std::collections::HashSet;

pub(crate) fn rules() -> Vec<BuiltinRule> {
    vec![
        BuiltinRule {
            id: "NST-001",
            family: RuleFamily::Nesting,
            severity: Severity::Error,
            description: "No flat fields at the root of a canonical type",
            check_fn: no_flat_root_fields,
        },
        BuiltinRule {
            id: "NST-002",
            family: RuleFamily::Nesting,
            severity: Severity::Error,
            description: "Root nodes are concept nodes named after the concept of every field beneath",
            check_fn: roots_are_concepts,
        },
        BuiltinRule {
            id: "NST-003",
            family: RuleFamily::Nesting,
            severity: Severity::Error,
            description: "Second-level nodes are context nodes named after the context of every field beneath",
            check_fn: second_level_are_contexts,
        },
        BuiltinRule {
            id: "NST-004",
            family: RuleFamily::Nesting,
            severity: Severity::Error,
            description: "Fields sit directly under their context node and carry their canonical name",
            check_fn: leaves_under_context,
        },
        BuiltinRule {
            id: "NST-005",
            family: RuleFamily::Nesting,
            severity: Severity::Error,
            description: "Sibling property names are unique",
            check_fn: unique_siblings,
        },
        BuiltinRule {
            id: "NST-006",
            family: RuleFamily::Nesting,
            severity: Severity::Error,
            description: "Concept and context nodes are not empty",
            check_fn: nodes_not_empty,
        },
        BuiltinRule {
            id: "NST-007",
            family: RuleFamily::Nesting,
            severity: Severity::Error,
            description: "Canonical fields carry a description",
            check_fn: leaves_described,
        },
        BuiltinRule {
            id: "NST-008",
            family: RuleFamily::Nesting,
            severity: Severity::Error,
            description: "Field descriptions equal the canonical definition verbatim",
            check_fn: descriptions_match_definition,
        },
        BuiltinRule {
            id: "NST-009",
            family: RuleFamily::Nesting,
            severity: Severity::Error,
            description: "Field data types equal the canonical data type",
            check_fn: data_types_match_row,
        },
        BuiltinRule {
            id: "NST-010",
            family: RuleFamily::Nesting,
            severity: Severity::Error,
            description: "A canonical row appears at most once per type",
            check_fn: rows_bound_once,
        },
        BuiltinRule {
            id: "NST-011",
            family: RuleFamily::Nesting,
            severity: Severity::Error,
            description: "Properties with children are objects or arrays",
            check_fn: parents_are_containers,
        },
        BuiltinRule {
            id: "NST-012",
            family: RuleFamily::Nesting,
            severity: Severity::Error,
            description: "Error and pagination envelopes carry no canonical fields",
            check_fn: envelopes_without_canonical_fields,
        },
    ]
}

fn is_group(property: &Property) -> bool {
    !property.is_field() && property.data_type == DataType::Object
}

fn canonical_types(doc: &DocumentModel) -> impl Iterator<Item = &TypeDef> {
    doc.types.iter().filter(|t| t.role.carries_canonical_fields())
}

fn no_flat_root_fields(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ty in canonical_types(doc) {
        for prop in ty.properties.iter().filter(|p| !is_group(p)) {
            out.push(
                ty.location(&[], prop),
                format!(
                    "'{}' sits at the root; fields must be nested under concept and context",
                    prop.name
                ),
            );
        }
    }
}

fn roots_are_concepts(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ty in canonical_types(doc) {
        for node in ty.properties.iter().filter(|p| is_group(p)) {
            for leaf in node.leaves() {
                let Some(field) = &leaf.field_ref else { continue };
                let expected = lower_camel(&field.concept);
                if node.name != expected {
                    out.push(
                        ty.location(&[], node),
                        format!(
                            "'{}' holds field '{}' of concept '{}'; the node must be named '{}'",
                            node.name, leaf.name, field.concept, expected
                        ),
                    );
                }
            }
        }
    }
}

fn second_level_are_contexts(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ty in canonical_types(doc) {
        for root in ty.properties.iter().filter(|p| is_group(p)) {
            for node in root.children.iter().filter(|p| is_group(p)) {
                for leaf in node.leaves() {
                    let Some(field) = &leaf.field_ref else { continue };
                    let expected = lower_camel(&field.context);
                    if node.name != expected {
                        out.push(
                            ty.location(&[root], node),
                            format!(
                                "'{}' holds field '{}' of context '{}'; the node must be named '{}'",
                                node.name, leaf.name, field.context, expected
                            ),
                        );
                    }
                }
            }
        }
    }
}

fn leaves_under_context(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ty in canonical_types(doc) {
        ty.walk(|ancestors, prop| {
            // Children of a canonical field belong to that field's own shape.
            if ancestors.iter().any(|a| a.is_field()) {
                return;
            }
            match &prop.field_ref {
                Some(field) => {
                    if ancestors.len() != 2 {
                        out.push(
                            ty.location(ancestors, prop),
                            format!(
                                "field '{}' is nested {} level(s) deep; it must sit directly under its context node",
                                prop.name,
                                ancestors.len()
                            ),
                        );
                    }
                    if prop.name != field.data_requirement {
                        out.push(
                            ty.location(ancestors, prop),
                            format!(
                                "field '{}' must use its canonical name '{}'",
                                prop.name, field.data_requirement
                            ),
                        );
                    }
                }
                None if !ancestors.is_empty() && !is_group(prop) => {
                    out.push(
                        ty.location(ancestors, prop),
                        format!("field '{}' is not bound to a canonical row", prop.name),
                    );
                }
                None => {}
            }
        });
    }
}

fn check_siblings(ty: &TypeDef, ancestors: &[&Property], siblings: &[Property], out: &mut Findings<'_>) {
    let mut seen = HashSet::new();
    for prop in siblings {
        if !seen.insert(prop.name.as_str()) {
            out.push(
                ty.location(ancestors, prop),
                format!("duplicate property name '{}'", prop.name),
            );
        }
    }
}

fn unique_siblings(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ty in &doc.types {
        check_siblings(ty, &[], &ty.properties, out);
        ty.walk(|ancestors, prop| {
            if prop.children.is_empty() {
                return;
            }
            let mut chain = ancestors.to_vec();
            chain.push(prop);
            check_siblings(ty, &chain, &prop.children, out);
        });
    }
}

fn nodes_not_empty(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ty in canonical_types(doc) {
        ty.walk(|ancestors, prop| {
            if ancestors.len() < 2 && is_group(prop) && prop.children.is_empty() {
                out.push(
                    ty.location(ancestors, prop),
                    format!("node '{}' has no fields", prop.name),
                );
            }
        });
    }
}

fn leaves_described(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ty in &doc.types {
        ty.walk(|ancestors, prop| {
            if !prop.is_field() {
                return;
            }
            let described = prop
                .description
                .as_deref()
                .map_or(false, |d| !d.trim().is_empty());
            if !described {
                out.push(
                    ty.location(ancestors, prop),
                    format!("field '{}' has no description", prop.name),
                );
            }
        });
    }
}

fn descriptions_match_definition(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ty in &doc.types {
        ty.walk(|ancestors, prop| {
            let Some(field) = &prop.field_ref else { return };
            let (Some(definition), Some(description)) = (&field.definition, &prop.description)
            else {
                return;
            };
            if description != definition {
                out.push(
                    ty.location(ancestors, prop),
                    format!(
                        "description of '{}' differs from the definition of {}: '{}'",
                        prop.name, field.uid, definition
                    ),
                );
            }
        });
    }
}

fn data_types_match_row(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ty in &doc.types {
        ty.walk(|ancestors, prop| {
            let Some(field) = &prop.field_ref else { return };
            if let Some(expected) = field.data_type {
                if prop.data_type != expected {
                    out.push(
                        ty.location(ancestors, prop),
                        format!(
                            "'{}' has type {} but {} is {}",
                            prop.name, prop.data_type, field.uid, expected
                        ),
                    );
                }
            }
        });
    }
}

fn rows_bound_once(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ty in &doc.types {
        let mut seen = HashSet::new();
        ty.walk(|ancestors, prop| {
            let Some(field) = &prop.field_ref else { return };
            if !seen.insert(&field.uid) {
                out.push(
                    ty.location(ancestors, prop),
                    format!("{} is already bound elsewhere in {}", field.uid, ty.name),
                );
            }
        });
    }
}

fn parents_are_containers(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ty in &doc.types {
        ty.walk(|ancestors, prop| {
            let container = matches!(prop.data_type, DataType::Object | DataType::Array);
            if !prop.children.is_empty() && !container {
                out.push(
                    ty.location(ancestors, prop),
                    format!("'{}' has children but type {}", prop.name, prop.data_type),
                );
            }
        });
    }
}

fn envelopes_without_canonical_fields(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ty in doc.types.iter().filter(|t| !t.role.carries_canonical_fields()) {
        ty.walk(|ancestors, prop| {
            if let Some(field) = &prop.field_ref {
                out.push(
                    ty.location(ancestors, prop),
                    format!("{} type carries canonical field {}", ty.role, field.uid),
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{FieldRef, TypeRole};
    use crate::rule::Rule;
    use cdr_ids::RowUid;

    fn field(concept: &str, context: &str, name: &str) -> Property {
        let definition = format!("The {name}");
        Property::field(
            name,
            DataType::String,
            true,
            FieldRef {
                concept: concept.into(),
                context: context.into(),
                data_requirement: name.into(),
                uid: RowUid::parse(&format!("CDR-{name}")).unwrap(),
                definition: Some(definition.clone()),
                data_type: Some(DataType::String),
            },
        )
        .with_description(definition)
    }

    fn run(id: &str, properties: Vec<Property>) -> Vec<String> {
        let doc = DocumentModel {
            base_uri: "https://api.example.com/v1".into(),
            types: vec![TypeDef::new("CustomerResponse", TypeRole::Response).with_properties(properties)],
            ..Default::default()
        };
        let rule = rules().into_iter().find(|r| r.id == id).unwrap();
        rule.check(&doc).into_iter().map(|v| v.message).collect()
    }

    fn well_formed() -> Vec<Property> {
        vec![Property::node(
            "customer",
            vec![
                Property::node("contact", vec![field("Customer", "Contact", "emailAddress")]),
                Property::node("profile", vec![field("Customer", "Profile", "firstName")]),
            ],
        )]
    }

    #[test]
    fn well_formed_tree_passes_every_nesting_rule() {
        for rule in rules() {
            assert!(
                run(rule.id, well_formed()).is_empty(),
                "{} flagged a well-formed tree",
                rule.id
            );
        }
    }

    #[test]
    fn nst001_flat_root_field() {
        let found = run("NST-001", vec![field("Customer", "Contact", "emailAddress")]);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn nst002_and_nst003_wrong_node_names() {
        let props = vec![Property::node(
            "client",
            vec![Property::node("contactInfo", vec![field("Customer", "Contact", "emailAddress")])],
        )];
        assert_eq!(run("NST-002", props.clone()).len(), 1);
        assert_eq!(run("NST-003", props).len(), 1);
    }

    #[test]
    fn nst004_depth_and_name() {
        let mut renamed = field("Customer", "Contact", "emailAddress");
        renamed.name = "email".into();
        let props = vec![Property::node(
            "customer",
            vec![
                field("Customer", "Contact", "smsNumber"),
                Property::node("contact", vec![renamed]),
            ],
        )];
        let found = run("NST-004", props);
        assert_eq!(found.len(), 2, "{found:?}");
    }

    #[test]
    fn nst005_duplicate_siblings() {
        let props = vec![Property::node(
            "customer",
            vec![Property::node(
                "contact",
                vec![
                    field("Customer", "Contact", "emailAddress"),
                    field("Customer", "Contact", "emailAddress"),
                ],
            )],
        )];
        assert_eq!(run("NST-005", props).len(), 1);
    }

    #[test]
    fn nst006_empty_nodes() {
        let props = vec![
            Property::node("customer", vec![Property::node("contact", vec![])]),
            Property::node("account", vec![]),
        ];
        assert_eq!(run("NST-006", props).len(), 2);
    }

    #[test]
    fn nst007_missing_description() {
        let mut bare = field("Customer", "Contact", "smsNumber");
        bare.description = None;
        let mut blank = field("Customer", "Contact", "homePhoneNumber");
        blank.description = Some("  ".into());
        let props = vec![Property::node(
            "customer",
            vec![Property::node(
                "contact",
                vec![field("Customer", "Contact", "emailAddress"), bare, blank],
            )],
        )];
        assert_eq!(run("NST-007", props).len(), 2);
    }

    #[test]
    fn nst008_description_must_be_verbatim() {
        let mut edited = field("Customer", "Contact", "emailAddress");
        edited.description = Some("Email".into());
        let props = vec![Property::node(
            "customer",
            vec![Property::node("contact", vec![edited])],
        )];
        let found = run("NST-008", props);
        assert_eq!(found.len(), 1);
        assert!(found[0].contains("'The emailAddress'"));
    }

    #[test]
    fn nst009_data_type_drift() {
        let mut drifted = field("Customer", "Contact", "emailAddress");
        drifted.data_type = DataType::Enum;
        let props = vec![Property::node(
            "customer",
            vec![Property::node("contact", vec![drifted])],
        )];
        assert_eq!(run("NST-009", props).len(), 1);
    }

    #[test]
    fn nst010_row_bound_twice() {
        let mut alias = field("Customer", "Contact", "emailAddress");
        alias.name = "email".into();
        let props = vec![Property::node(
            "customer",
            vec![Property::node(
                "contact",
                vec![field("Customer", "Contact", "emailAddress"), alias],
            )],
        )];
        assert_eq!(run("NST-010", props).len(), 1);
    }

    #[test]
    fn nst011_scalar_with_children() {
        let mut scalar = Property::plain("address", DataType::String, true);
        scalar.children = vec![Property::plain("line1", DataType::String, true)];
        assert_eq!(run("NST-011", vec![scalar]).len(), 1);
    }

    #[test]
    fn nst012_envelope_with_canonical_field() {
        let doc = DocumentModel {
            base_uri: "https://api.example.com/v1".into(),
            types: vec![
                TypeDef::new("StandardErrorResponse", TypeRole::Error).with_properties(vec![
                    Property::plain("code", DataType::String, true),
                    field("Customer", "Contact", "emailAddress"),
                ]),
                TypeDef::new("CustomerResponse", TypeRole::Response).with_properties(well_formed()),
            ],
            ..Default::default()
        };
        let rule = rules().into_iter().find(|r| r.id == "NST-012").unwrap();
        assert_eq!(rule.check(&doc).len(), 1);
    }
}
