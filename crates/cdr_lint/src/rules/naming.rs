//! Naming rules: property, type and URI naming conventions.

use crate::document::{DocumentModel, Endpoint, HttpMethod, PathSegment, TypeRole};
use crate::rule::{BuiltinRule, Findings, RuleFamily};
use crate::violation::Severity;
use cdr_dictionary::naming::{is_camel_case, is_kebab_case, is_pascal_case, split_segments};
use cdr_dictionary::DataType;
use std::collections::HashSet;

pub(crate) fn rules() -> Vec<BuiltinRule> {
    vec![
        BuiltinRule {
            id: "NAM-001",
            family: RuleFamily::Naming,
            severity: Severity::Error,
            description: "Field names are camelCase",
            check_fn: field_names_camel_case,
        },
        BuiltinRule {
            id: "NAM-002",
            family: RuleFamily::Naming,
            severity: Severity::Error,
            description: "Type names are PascalCase",
            check_fn: type_names_pascal_case,
        },
        BuiltinRule {
            id: "NAM-003",
            family: RuleFamily::Naming,
            severity: Severity::Error,
            description: "The Id suffix is reserved for string identifier fields",
            check_fn: id_suffix_on_identifiers,
        },
        BuiltinRule {
            id: "NAM-004",
            family: RuleFamily::Naming,
            severity: Severity::Error,
            description: "The At suffix is reserved for datetime fields",
            check_fn: at_suffix_on_datetimes,
        },
        BuiltinRule {
            id: "NAM-005",
            family: RuleFamily::Naming,
            severity: Severity::Error,
            description: "Type names carry the suffix of their role (Request, Response, ErrorResponse, Paginated{Entity}Result)",
            check_fn: type_role_suffixes,
        },
        BuiltinRule {
            id: "NAM-006",
            family: RuleFamily::Naming,
            severity: Severity::Error,
            description: "URI path segments are lowercase kebab-case",
            check_fn: uri_segments_kebab_case,
        },
        BuiltinRule {
            id: "NAM-007",
            family: RuleFamily::Naming,
            severity: Severity::Error,
            description: "Collection URI segments are plural nouns",
            check_fn: collection_segments_plural,
        },
        BuiltinRule {
            id: "NAM-008",
            family: RuleFamily::Naming,
            severity: Severity::Error,
            description: "URI path parameters are camelCase",
            check_fn: path_params_camel_case,
        },
        BuiltinRule {
            id: "NAM-009",
            family: RuleFamily::Naming,
            severity: Severity::Error,
            description: "Paths and the base URI have no trailing slash",
            check_fn: no_trailing_slash,
        },
        BuiltinRule {
            id: "NAM-010",
            family: RuleFamily::Naming,
            severity: Severity::Error,
            description: "Boolean fields start with a predicate (is, has, can, should, allows, ...)",
            check_fn: booleans_are_predicates,
        },
        BuiltinRule {
            id: "NAM-011",
            family: RuleFamily::Naming,
            severity: Severity::Warning,
            description: "Datetime fields end with At or Date",
            check_fn: datetimes_have_time_suffix,
        },
        BuiltinRule {
            id: "NAM-012",
            family: RuleFamily::Naming,
            severity: Severity::Error,
            description: "Type names carry no technical suffix (Dto, Model, Data, Info, ...)",
            check_fn: no_technical_type_suffix,
        },
        BuiltinRule {
            id: "NAM-013",
            family: RuleFamily::Naming,
            severity: Severity::Error,
            description: "Query parameters are camelCase",
            check_fn: query_params_camel_case,
        },
        BuiltinRule {
            id: "NAM-014",
            family: RuleFamily::Naming,
            severity: Severity::Warning,
            description: "Path parameters identify a resource and end with Id",
            check_fn: path_params_are_ids,
        },
        BuiltinRule {
            id: "NAM-015",
            family: RuleFamily::Naming,
            severity: Severity::Error,
            description: "URI path segments are nouns, not verbs",
            check_fn: no_verbs_in_paths,
        },
        BuiltinRule {
            id: "NAM-016",
            family: RuleFamily::Naming,
            severity: Severity::Error,
            description: "Path parameter names are unique within a path",
            check_fn: unique_path_params,
        },
        BuiltinRule {
            id: "NAM-017",
            family: RuleFamily::Naming,
            severity: Severity::Error,
            description: "Type names are unique within the document",
            check_fn: unique_type_names,
        },
        BuiltinRule {
            id: "NAM-018",
            family: RuleFamily::Naming,
            severity: Severity::Error,
            description: "Array fields are plural nouns",
            check_fn: arrays_are_plural,
        },
        BuiltinRule {
            id: "NAM-019",
            family: RuleFamily::Naming,
            severity: Severity::Error,
            description: "Field names are not generic placeholders (data, info, value, ...)",
            check_fn: no_placeholder_names,
        },
    ]
}

fn field_names_camel_case(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ty in &doc.types {
        ty.walk(|ancestors, prop| {
            if !is_camel_case(&prop.name) {
                out.push(
                    ty.location(ancestors, prop),
                    format!("property '{}' is not camelCase", prop.name),
                );
            }
        });
    }
}

fn type_names_pascal_case(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ty in &doc.types {
        if !is_pascal_case(&ty.name) {
            out.push(
                format!("type {}", ty.name),
                format!("type name '{}' is not PascalCase", ty.name),
            );
        }
    }
}

/// Last camelCase segment of `name`, when the name has more than one.
fn suffix_segment(name: &str) -> Option<String> {
    let segments = split_segments(name);
    if segments.len() < 2 {
        return None;
    }
    segments.last().cloned()
}

fn id_suffix_on_identifiers(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ty in &doc.types {
        ty.walk(|ancestors, prop| {
            let is_id = prop.name == "id" || suffix_segment(&prop.name).as_deref() == Some("id");
            if is_id && prop.data_type != DataType::String {
                out.push(
                    ty.location(ancestors, prop),
                    format!(
                        "'{}' is named as an identifier but has type {}",
                        prop.name, prop.data_type
                    ),
                );
            }
        });
    }
}

fn at_suffix_on_datetimes(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ty in &doc.types {
        ty.walk(|ancestors, prop| {
            if suffix_segment(&prop.name).as_deref() == Some("at")
                && prop.data_type != DataType::Datetime
            {
                out.push(
                    ty.location(ancestors, prop),
                    format!(
                        "'{}' uses the At suffix but has type {}",
                        prop.name, prop.data_type
                    ),
                );
            }
        });
    }
}

pub(crate) fn is_paginated_result_name(name: &str) -> bool {
    name.len() > "Paginated".len() + "Result".len()
        && name.starts_with("Paginated")
        && name.ends_with("Result")
}

fn type_role_suffixes(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ty in &doc.types {
        let name = ty.name.as_str();
        let expected = match ty.role {
            TypeRole::Request => name.ends_with("Request").then_some(()).ok_or("end with 'Request'"),
            TypeRole::Response => (name.ends_with("Response") && !name.ends_with("ErrorResponse"))
                .then_some(())
                .ok_or("end with 'Response' (and not 'ErrorResponse')"),
            TypeRole::Error => name
                .ends_with("ErrorResponse")
                .then_some(())
                .ok_or("end with 'ErrorResponse'"),
            TypeRole::PaginatedResult => is_paginated_result_name(name)
                .then_some(())
                .ok_or("follow 'Paginated{Entity}Result'"),
            TypeRole::Entity => {
                let decorated = name.ends_with("Request")
                    || name.ends_with("Response")
                    || is_paginated_result_name(name);
                (!decorated)
                    .then_some(())
                    .ok_or("not carry a Request, Response or Result suffix")
            }
        };
        if let Err(expectation) = expected {
            out.push(
                format!("type {}", ty.name),
                format!("{} type '{}' must {}", ty.role, ty.name, expectation),
            );
        }
    }
}

pub(crate) fn is_version_segment(segment: &str) -> bool {
    segment
        .strip_prefix('v')
        .map_or(false, |n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

fn uri_segments_kebab_case(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in &doc.endpoints {
        for segment in ep.segments() {
            if let PathSegment::Static(s) = segment {
                if !is_kebab_case(s) {
                    out.push(
                        ep.label(),
                        format!("path segment '{}' is not lowercase kebab-case", s),
                    );
                }
            }
        }
    }
}

const IRREGULAR_PLURALS: &[&str] = &["people", "children", "data", "media", "criteria", "metadata"];

/// Heuristic English plural check on the last word of a kebab segment.
pub(crate) fn looks_plural(segment: &str) -> bool {
    let word = segment.rsplit('-').next().unwrap_or(segment);
    if IRREGULAR_PLURALS.contains(&word) {
        return true;
    }
    word.len() > 1
        && word.ends_with('s')
        && !word.ends_with("ss")
        && !word.ends_with("us")
        && !word.ends_with("is")
}

/// Static segments that name a collection: those followed by a parameter,
/// and the final segment of collection reads and creates.
fn collection_segments(ep: &Endpoint) -> Vec<&str> {
    let segments = ep.segments();
    let mut out = Vec::new();
    for (idx, segment) in segments.iter().enumerate() {
        let PathSegment::Static(name) = segment else {
            continue;
        };
        if is_version_segment(name) {
            continue;
        }
        let followed_by_param = matches!(segments.get(idx + 1), Some(PathSegment::Param(_)));
        let is_last = idx + 1 == segments.len();
        let names_collection = is_last && (ep.collection || ep.method == HttpMethod::Post);
        if followed_by_param || names_collection {
            out.push(*name);
        }
    }
    out
}

fn collection_segments_plural(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in &doc.endpoints {
        for name in collection_segments(ep) {
            if !looks_plural(name) {
                out.push(
                    ep.label(),
                    format!("collection segment '{}' should be a plural noun", name),
                );
            }
        }
    }
}

fn path_params_camel_case(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in &doc.endpoints {
        for segment in ep.segments() {
            if let PathSegment::Param(p) = segment {
                if !is_camel_case(p) {
                    out.push(
                        ep.label(),
                        format!("path parameter '{{{}}}' is not camelCase", p),
                    );
                }
            }
        }
    }
}

fn no_trailing_slash(doc: &DocumentModel, out: &mut Findings<'_>) {
    if doc.base_uri.len() > 1 && doc.base_uri.ends_with('/') {
        out.push(
            "base_uri",
            format!("base URI '{}' ends with '/'", doc.base_uri),
        );
    }
    for ep in &doc.endpoints {
        if ep.path.len() > 1 && ep.path.ends_with('/') {
            out.push(ep.label(), format!("path '{}' ends with '/'", ep.path));
        }
    }
}

const PREDICATE_PREFIXES: &[&str] = &[
    "is", "has", "can", "should", "allow", "allows", "was", "does", "needs", "will",
];

fn booleans_are_predicates(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ty in &doc.types {
        ty.walk(|ancestors, prop| {
            if prop.data_type != DataType::Boolean {
                return;
            }
            let segments = split_segments(&prop.name);
            let prefixed = segments.len() > 1
                && PREDICATE_PREFIXES.contains(&segments[0].as_str());
            if !prefixed {
                out.push(
                    ty.location(ancestors, prop),
                    format!(
                        "boolean '{}' should read as a predicate (isActive, hasConsent)",
                        prop.name
                    ),
                );
            }
        });
    }
}

fn datetimes_have_time_suffix(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ty in &doc.types {
        ty.walk(|ancestors, prop| {
            if prop.data_type != DataType::Datetime {
                return;
            }
            let suffix = suffix_segment(&prop.name);
            if !matches!(suffix.as_deref(), Some("at") | Some("date")) {
                out.push(
                    ty.location(ancestors, prop),
                    format!("datetime '{}' should end with At or Date", prop.name),
                );
            }
        });
    }
}

const TECHNICAL_SUFFIXES: &[&str] = &["dto", "model", "data", "info", "object", "entity", "bean", "vo"];

fn no_technical_type_suffix(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ty in &doc.types {
        let segments = split_segments(&ty.name);
        if let Some(last) = segments.last() {
            if TECHNICAL_SUFFIXES.contains(&last.as_str()) {
                out.push(
                    format!("type {}", ty.name),
                    format!("type name '{}' ends with technical suffix '{}'", ty.name, last),
                );
            }
        }
    }
}

fn query_params_camel_case(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in &doc.endpoints {
        for param in &ep.query_params {
            if !is_camel_case(param) {
                out.push(
                    ep.label(),
                    format!("query parameter '{}' is not camelCase", param),
                );
            }
        }
    }
}

fn path_params(ep: &Endpoint) -> Vec<&str> {
    ep.segments()
        .into_iter()
        .filter_map(|segment| match segment {
            PathSegment::Param(p) => Some(p),
            PathSegment::Static(_) => None,
        })
        .collect()
}

fn path_params_are_ids(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in &doc.endpoints {
        for param in path_params(ep) {
            if suffix_segment(param).as_deref() != Some("id") {
                out.push(
                    ep.label(),
                    format!("path parameter '{{{}}}' should end with Id", param),
                );
            }
        }
    }
}

const PATH_VERBS: &[&str] = &[
    "get", "create", "update", "delete", "remove", "add", "list", "fetch", "save", "insert",
    "modify", "set",
];

fn no_verbs_in_paths(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in &doc.endpoints {
        for segment in ep.segments() {
            let PathSegment::Static(name) = segment else {
                continue;
            };
            let first = name.split('-').next().unwrap_or(name).to_ascii_lowercase();
            if PATH_VERBS.contains(&first.as_str()) {
                out.push(
                    ep.label(),
                    format!(
                        "path segment '{}' starts with the verb '{}'; let the method carry the action",
                        name, first
                    ),
                );
            }
        }
    }
}

fn unique_path_params(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in &doc.endpoints {
        let mut seen = HashSet::new();
        for param in path_params(ep) {
            if !seen.insert(param) {
                out.push(
                    ep.label(),
                    format!("path parameter '{{{}}}' appears more than once", param),
                );
            }
        }
    }
}

fn unique_type_names(doc: &DocumentModel, out: &mut Findings<'_>) {
    let mut seen = HashSet::new();
    for ty in &doc.types {
        if !seen.insert(ty.name.as_str()) {
            out.push(
                format!("type {}", ty.name),
                format!("type '{}' is declared more than once", ty.name),
            );
        }
    }
}

fn arrays_are_plural(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ty in &doc.types {
        ty.walk(|ancestors, prop| {
            if prop.data_type != DataType::Array {
                return;
            }
            let segments = split_segments(&prop.name);
            let plural = segments.last().map_or(false, |word| looks_plural(word));
            if !plural {
                out.push(
                    ty.location(ancestors, prop),
                    format!("array '{}' should be a plural noun", prop.name),
                );
            }
        });
    }
}

const PLACEHOLDER_NAMES: &[&str] = &[
    "data", "info", "value", "details", "object", "misc", "other", "payload", "field",
];

fn no_placeholder_names(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ty in &doc.types {
        ty.walk(|ancestors, prop| {
            if PLACEHOLDER_NAMES.contains(&prop.name.as_str()) {
                out.push(
                    ty.location(ancestors, prop),
                    format!("'{}' is a placeholder name; name what the field holds", prop.name),
                );
            }
        });
    }
}
