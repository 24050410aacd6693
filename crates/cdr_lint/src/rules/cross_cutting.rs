//! Cross-cutting rules: caching, pagination, security, tracing headers,
//! envelope shapes and base URI shape.

use super::naming::{is_paginated_result_name, is_version_segment};
use crate::document::{DocumentModel, Endpoint, HttpMethod, TypeDef, TypeRole};
use cdr_dictionary::DataType;
use std::collections::HashSet;
use crate::rule::{BuiltinRule, Findings, RuleFamily};
use crate::violation::Severity;

pub const CACHE_CONTROL: &str = "Cache-Control";
pub const CORRELATION_HEADER: &str = "X-Correlation-ID";
pub const ETAG: &str = "ETag";
pub const IF_NONE_MATCH: &str = "If-None-Match";
pub const RETRY_AFTER: &str = "Retry-After";

/// Query parameters every paginated collection accepts.
pub const PAGINATION_PARAMS: [&str; 2] = ["limit", "cursor"];

pub(crate) fn rules() -> Vec<BuiltinRule> {
    vec![
        BuiltinRule {
            id: "XC-001",
            family: RuleFamily::CrossCutting,
            severity: Severity::Warning,
            description: "GET endpoints declare Cache-Control",
            check_fn: get_declares_cache_control,
        },
        BuiltinRule {
            id: "XC-002",
            family: RuleFamily::CrossCutting,
            severity: Severity::Error,
            description: "Collection GETs are paginated and return Paginated{Entity}Result",
            check_fn: collections_paginated,
        },
        BuiltinRule {
            id: "XC-003",
            family: RuleFamily::CrossCutting,
            severity: Severity::Error,
            description: "Pagination only on collection GETs",
            check_fn: pagination_only_on_collections,
        },
        BuiltinRule {
            id: "XC-004",
            family: RuleFamily::CrossCutting,
            severity: Severity::Error,
            description: "Every endpoint has a declared security scheme",
            check_fn: endpoints_secured,
        },
        BuiltinRule {
            id: "XC-005",
            family: RuleFamily::CrossCutting,
            severity: Severity::Error,
            description: "Endpoints accept X-Correlation-ID",
            check_fn: correlation_header,
        },
        BuiltinRule {
            id: "XC-006",
            family: RuleFamily::CrossCutting,
            severity: Severity::Error,
            description: "Base URI carries a version segment (/v{N})",
            check_fn: versioned_base_uri,
        },
        BuiltinRule {
            id: "XC-007",
            family: RuleFamily::CrossCutting,
            severity: Severity::Error,
            description: "Absolute base URIs use https",
            check_fn: https_base_uri,
        },
        BuiltinRule {
            id: "XC-008",
            family: RuleFamily::CrossCutting,
            severity: Severity::Error,
            description: "Cache-Control is only declared on GET",
            check_fn: cache_control_only_on_get,
        },
        BuiltinRule {
            id: "XC-009",
            family: RuleFamily::CrossCutting,
            severity: Severity::Error,
            description: "Item GETs return ETag and accept If-None-Match",
            check_fn: item_gets_conditional,
        },
        BuiltinRule {
            id: "XC-010",
            family: RuleFamily::CrossCutting,
            severity: Severity::Error,
            description: "Paginated endpoints accept limit and cursor query parameters",
            check_fn: pagination_params,
        },
        BuiltinRule {
            id: "XC-011",
            family: RuleFamily::CrossCutting,
            severity: Severity::Error,
            description: "Error types carry string code and message properties",
            check_fn: error_envelope_shape,
        },
        BuiltinRule {
            id: "XC-012",
            family: RuleFamily::CrossCutting,
            severity: Severity::Error,
            description: "Paginated result types carry an items array",
            check_fn: paginated_envelope_shape,
        },
        BuiltinRule {
            id: "XC-013",
            family: RuleFamily::CrossCutting,
            severity: Severity::Error,
            description: "429 responses return a Retry-After header",
            check_fn: throttled_returns_retry_after,
        },
        BuiltinRule {
            id: "XC-014",
            family: RuleFamily::CrossCutting,
            severity: Severity::Error,
            description: "Base URI has no query string or fragment",
            check_fn: plain_base_uri,
        },
        BuiltinRule {
            id: "XC-015",
            family: RuleFamily::CrossCutting,
            severity: Severity::Warning,
            description: "POST, PUT and PATCH take input in the body, not the query string",
            check_fn: no_query_on_body_methods,
        },
        BuiltinRule {
            id: "XC-016",
            family: RuleFamily::CrossCutting,
            severity: Severity::Error,
            description: "Each method and path pair is declared once",
            check_fn: unique_operations,
        },
        BuiltinRule {
            id: "XC-017",
            family: RuleFamily::CrossCutting,
            severity: Severity::Error,
            description: "Endpoint paths start with '/' and leave versioning to the base URI",
            check_fn: relative_unversioned_paths,
        },
    ]
}

fn is_collection_get(ep: &Endpoint) -> bool {
    ep.method == HttpMethod::Get && ep.collection
}

fn get_declares_cache_control(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in doc.endpoints.iter().filter(|e| e.method == HttpMethod::Get) {
        if !Endpoint::has_header(&ep.cache_headers, CACHE_CONTROL) {
            out.push(ep.label(), "GET must declare a Cache-Control header");
        }
    }
}

fn collections_paginated(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in doc.endpoints.iter().filter(|e| is_collection_get(e)) {
        if !ep.paginated {
            out.push(ep.label(), "collection GET must be paginated");
        }
        let wrapped = ep
            .response_type
            .as_deref()
            .map_or(false, is_paginated_result_name);
        if !wrapped {
            out.push(
                ep.label(),
                format!(
                    "collection GET must return a Paginated{{Entity}}Result (found {})",
                    ep.response_type.as_deref().unwrap_or("no body")
                ),
            );
        }
    }
}

fn pagination_only_on_collections(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in doc.endpoints.iter().filter(|e| e.paginated && !is_collection_get(e)) {
        out.push(ep.label(), "pagination is only allowed on collection GETs");
    }
}

fn endpoints_secured(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in &doc.endpoints {
        if ep.security.is_empty() {
            out.push(ep.label(), "endpoint has no security scheme");
        }
        for scheme in &ep.security {
            if !doc.security_schemes.contains(scheme) {
                out.push(
                    ep.label(),
                    format!("security scheme '{}' is not declared", scheme),
                );
            }
        }
    }
}

fn correlation_header(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in &doc.endpoints {
        if !Endpoint::has_header(&ep.request_headers, CORRELATION_HEADER) {
            out.push(
                ep.label(),
                format!("endpoint must accept {}", CORRELATION_HEADER),
            );
        }
    }
}

/// Path part of a URI, without scheme and authority.
fn uri_path(uri: &str) -> &str {
    match uri.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("", |idx| &rest[idx..]),
        None => uri,
    }
}

fn versioned_base_uri(doc: &DocumentModel, out: &mut Findings<'_>) {
    let versioned = uri_path(&doc.base_uri)
        .split('/')
        .any(is_version_segment);
    if !versioned {
        out.push(
            "base_uri",
            format!("base URI '{}' has no /v{{N}} segment", doc.base_uri),
        );
    }
}

fn https_base_uri(doc: &DocumentModel, out: &mut Findings<'_>) {
    if let Some((scheme, _)) = doc.base_uri.split_once("://") {
        if !scheme.eq_ignore_ascii_case("https") {
            out.push(
                "base_uri",
                format!("base URI uses '{}'; https is required", scheme),
            );
        }
    }
}

fn cache_control_only_on_get(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in doc.endpoints.iter().filter(|e| e.method != HttpMethod::Get) {
        if Endpoint::has_header(&ep.cache_headers, CACHE_CONTROL) {
            out.push(
                ep.label(),
                format!("{} responses are not cacheable; drop Cache-Control", ep.method),
            );
        }
    }
}

fn item_gets_conditional(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in doc
        .endpoints
        .iter()
        .filter(|e| e.method == HttpMethod::Get && e.is_item())
    {
        if !Endpoint::has_header(&ep.response_headers, ETAG) {
            out.push(ep.label(), format!("item GET must return {}", ETAG));
        }
        if !Endpoint::has_header(&ep.request_headers, IF_NONE_MATCH) {
            out.push(ep.label(), format!("item GET must accept {}", IF_NONE_MATCH));
        }
    }
}

fn pagination_params(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in doc.endpoints.iter().filter(|e| e.paginated) {
        for param in PAGINATION_PARAMS {
            if !ep.query_params.iter().any(|p| p == param) {
                out.push(
                    ep.label(),
                    format!("paginated endpoint must accept the '{}' query parameter", param),
                );
            }
        }
    }
}

fn has_property(ty: &TypeDef, name: &str, data_type: DataType) -> bool {
    ty.properties
        .iter()
        .any(|p| p.name == name && p.data_type == data_type)
}

fn error_envelope_shape(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ty in doc.types.iter().filter(|t| t.role == TypeRole::Error) {
        for name in ["code", "message"] {
            if !has_property(ty, name, DataType::String) {
                out.push(
                    format!("type {}", ty.name),
                    format!("error type must carry a string '{}'", name),
                );
            }
        }
    }
}

fn paginated_envelope_shape(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ty in doc.types.iter().filter(|t| t.role == TypeRole::PaginatedResult) {
        if !has_property(ty, "items", DataType::Array) {
            out.push(
                format!("type {}", ty.name),
                "paginated result must carry an 'items' array",
            );
        }
    }
}

fn throttled_returns_retry_after(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in doc.endpoints.iter().filter(|e| e.has_status(429)) {
        if !Endpoint::has_header(&ep.response_headers, RETRY_AFTER) {
            out.push(ep.label(), format!("429 must return {}", RETRY_AFTER));
        }
    }
}

fn plain_base_uri(doc: &DocumentModel, out: &mut Findings<'_>) {
    if doc.base_uri.contains(|c| c == '?' || c == '#') {
        out.push(
            "base_uri",
            format!("base URI '{}' carries a query string or fragment", doc.base_uri),
        );
    }
}

fn no_query_on_body_methods(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in doc.endpoints.iter().filter(|e| e.method.carries_body()) {
        if !ep.query_params.is_empty() {
            out.push(
                ep.label(),
                format!(
                    "{} takes query parameters ({}); move them into the body",
                    ep.method,
                    ep.query_params.join(", ")
                ),
            );
        }
    }
}

fn unique_operations(doc: &DocumentModel, out: &mut Findings<'_>) {
    let mut seen = HashSet::new();
    for ep in &doc.endpoints {
        if !seen.insert((ep.method, ep.path.as_str())) {
            out.push(ep.label(), "operation is declared more than once");
        }
    }
}

fn relative_unversioned_paths(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in &doc.endpoints {
        if !ep.path.starts_with('/') {
            out.push(ep.label(), format!("path '{}' must start with '/'", ep.path));
        }
        if ep.path.split('/').any(is_version_segment) {
            out.push(
                ep.label(),
                "path repeats a version segment; versioning belongs to the base URI",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Intent, Property};
    use crate::rule::Rule;

    fn run(id: &str, doc: &DocumentModel) -> usize {
        let rule = rules().into_iter().find(|r| r.id == id).unwrap();
        rule.check(doc).len()
    }

    fn doc(base_uri: &str, endpoints: Vec<Endpoint>) -> DocumentModel {
        DocumentModel {
            base_uri: base_uri.into(),
            security_schemes: vec!["oauth2".into()],
            endpoints,
            ..Default::default()
        }
    }

    #[test]
    fn uri_path_strips_authority() {
        assert_eq!(uri_path("https://api.example.com/v1/crm"), "/v1/crm");
        assert_eq!(uri_path("https://api.example.com"), "");
        assert_eq!(uri_path("/v2"), "/v2");
    }

    #[test]
    fn xc001_cache_control() {
        let mut get = Endpoint::new(HttpMethod::Get, "/customers/{customerId}", Intent::Read);
        assert_eq!(run("XC-001", &doc("https://x/v1", vec![get.clone()])), 1);
        get.cache_headers = vec!["cache-control".into()];
        assert_eq!(run("XC-001", &doc("https://x/v1", vec![get])), 0);
    }

    #[test]
    fn xc002_and_xc003_pagination() {
        let mut list = Endpoint::new(HttpMethod::Get, "/customers", Intent::Read);
        list.collection = true;
        list.response_type = Some("CustomerResponse".into());
        assert_eq!(run("XC-002", &doc("https://x/v1", vec![list.clone()])), 2);

        list.paginated = true;
        list.response_type = Some("PaginatedCustomerResult".into());
        assert_eq!(run("XC-002", &doc("https://x/v1", vec![list.clone()])), 0);

        // The wrapper must name an entity.
        list.response_type = Some("PaginatedResult".into());
        assert_eq!(run("XC-002", &doc("https://x/v1", vec![list.clone()])), 1);
        list.response_type = Some("PaginatedCustomersResults".into());
        assert_eq!(run("XC-002", &doc("https://x/v1", vec![list])), 1);

        let mut post = Endpoint::new(HttpMethod::Post, "/customers", Intent::Create);
        post.paginated = true;
        assert_eq!(run("XC-003", &doc("https://x/v1", vec![post])), 1);
    }

    #[test]
    fn xc004_security() {
        let mut ep = Endpoint::new(HttpMethod::Get, "/customers", Intent::Read);
        assert_eq!(run("XC-004", &doc("https://x/v1", vec![ep.clone()])), 1);
        ep.security = vec!["apiKey".into()];
        assert_eq!(run("XC-004", &doc("https://x/v1", vec![ep.clone()])), 1);
        ep.security = vec!["oauth2".into()];
        assert_eq!(run("XC-004", &doc("https://x/v1", vec![ep])), 0);
    }

    #[test]
    fn xc005_correlation_header() {
        let mut ep = Endpoint::new(HttpMethod::Get, "/customers", Intent::Read);
        assert_eq!(run("XC-005", &doc("https://x/v1", vec![ep.clone()])), 1);
        ep.request_headers = vec!["X-Correlation-Id".into()];
        assert_eq!(run("XC-005", &doc("https://x/v1", vec![ep])), 0);
    }

    #[test]
    fn xc006_and_xc007_base_uri() {
        assert_eq!(run("XC-006", &doc("https://api.example.com/crm", vec![])), 1);
        assert_eq!(run("XC-006", &doc("https://api.example.com/crm/v3", vec![])), 0);
        assert_eq!(run("XC-006", &doc("https://v1.example.com", vec![])), 1);
        assert_eq!(run("XC-007", &doc("http://api.example.com/v1", vec![])), 1);
        assert_eq!(run("XC-007", &doc("/v1", vec![])), 0);
    }

    fn with_types(types: Vec<TypeDef>) -> DocumentModel {
        DocumentModel {
            base_uri: "https://x/v1".into(),
            types,
            ..Default::default()
        }
    }

    #[test]
    fn xc008_cache_control_on_writes() {
        let mut post = Endpoint::new(HttpMethod::Post, "/customers", Intent::Create);
        assert_eq!(run("XC-008", &doc("https://x/v1", vec![post.clone()])), 0);
        post.cache_headers = vec!["Cache-Control".into()];
        assert_eq!(run("XC-008", &doc("https://x/v1", vec![post])), 1);

        let mut get = Endpoint::new(HttpMethod::Get, "/customers", Intent::Read);
        get.cache_headers = vec!["Cache-Control".into()];
        assert_eq!(run("XC-008", &doc("https://x/v1", vec![get])), 0);
    }

    #[test]
    fn xc009_conditional_item_get() {
        let mut item = Endpoint::new(HttpMethod::Get, "/customers/{customerId}", Intent::Read);
        assert_eq!(run("XC-009", &doc("https://x/v1", vec![item.clone()])), 2);
        item.response_headers = vec!["etag".into()];
        item.request_headers = vec!["If-None-Match".into()];
        assert_eq!(run("XC-009", &doc("https://x/v1", vec![item])), 0);

        let list = Endpoint::new(HttpMethod::Get, "/customers", Intent::Read);
        assert_eq!(run("XC-009", &doc("https://x/v1", vec![list])), 0);
    }

    #[test]
    fn xc010_pagination_params() {
        let mut list = Endpoint::new(HttpMethod::Get, "/customers", Intent::Read);
        list.collection = true;
        list.paginated = true;
        list.query_params = vec!["limit".into()];
        assert_eq!(run("XC-010", &doc("https://x/v1", vec![list.clone()])), 1);
        list.query_params.push("cursor".into());
        assert_eq!(run("XC-010", &doc("https://x/v1", vec![list])), 0);
    }

    #[test]
    fn xc011_error_envelope() {
        let partial = TypeDef::new("StandardErrorResponse", TypeRole::Error)
            .with_properties(vec![Property::plain("code", DataType::String, true)]);
        assert_eq!(run("XC-011", &with_types(vec![partial])), 1);

        let complete = TypeDef::new("StandardErrorResponse", TypeRole::Error).with_properties(vec![
            Property::plain("code", DataType::String, true),
            Property::plain("message", DataType::String, true),
        ]);
        assert_eq!(run("XC-011", &with_types(vec![complete])), 0);
    }

    #[test]
    fn xc012_paginated_envelope() {
        let scalar_items = TypeDef::new("PaginatedCustomerResult", TypeRole::PaginatedResult)
            .with_properties(vec![Property::plain("items", DataType::String, true)]);
        assert_eq!(run("XC-012", &with_types(vec![scalar_items])), 1);

        let ok = TypeDef::new("PaginatedCustomerResult", TypeRole::PaginatedResult)
            .with_properties(vec![Property::plain("items", DataType::Array, true)]);
        assert_eq!(run("XC-012", &with_types(vec![ok])), 0);
    }

    #[test]
    fn xc013_retry_after() {
        let mut get = Endpoint::new(HttpMethod::Get, "/customers", Intent::Read);
        get.status_codes = vec![200, 429];
        assert_eq!(run("XC-013", &doc("https://x/v1", vec![get.clone()])), 1);
        get.response_headers = vec!["Retry-After".into()];
        assert_eq!(run("XC-013", &doc("https://x/v1", vec![get])), 0);
    }

    #[test]
    fn xc014_base_uri_query() {
        assert_eq!(run("XC-014", &doc("https://api.example.com/v1?tenant=a", vec![])), 1);
        assert_eq!(run("XC-014", &doc("https://api.example.com/v1#top", vec![])), 1);
        assert_eq!(run("XC-014", &doc("https://api.example.com/v1", vec![])), 0);
    }

    #[test]
    fn xc015_query_on_body_methods() {
        let mut post = Endpoint::new(HttpMethod::Post, "/customers", Intent::Create);
        post.query_params = vec!["dryRun".into()];
        assert_eq!(run("XC-015", &doc("https://x/v1", vec![post])), 1);

        let mut get = Endpoint::new(HttpMethod::Get, "/customers", Intent::Read);
        get.query_params = vec!["limit".into()];
        assert_eq!(run("XC-015", &doc("https://x/v1", vec![get])), 0);
    }

    #[test]
    fn xc016_duplicate_operations() {
        let get = Endpoint::new(HttpMethod::Get, "/customers", Intent::Read);
        let post = Endpoint::new(HttpMethod::Post, "/customers", Intent::Create);
        assert_eq!(run("XC-016", &doc("https://x/v1", vec![get.clone(), post, get])), 1);
    }

    #[test]
    fn xc017_relative_unversioned_paths() {
        let versioned = Endpoint::new(HttpMethod::Get, "/v2/customers", Intent::Read);
        let bare = Endpoint::new(HttpMethod::Get, "customers", Intent::Read);
        let ok = Endpoint::new(HttpMethod::Get, "/customers", Intent::Read);
        assert_eq!(run("XC-017", &doc("https://x/v1", vec![versioned, bare, ok])), 2);
    }
}
