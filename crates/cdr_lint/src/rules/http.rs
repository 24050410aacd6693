//! HTTP rules: methods, bodies and declared status codes.

use super::naming::is_paginated_result_name;
use crate::document::{DocumentModel, Endpoint, HttpMethod, Intent, TypeRole};
use crate::rule::{BuiltinRule, Findings, RuleFamily};
use crate::violation::Severity;
use std::collections::HashSet;

pub(crate) fn rules() -> Vec<BuiltinRule> {
    vec![
        BuiltinRule {
            id: "HTTP-001",
            family: RuleFamily::Http,
            severity: Severity::Error,
            description: "Method matches intent (GET read, POST create, PUT replace, PATCH update, DELETE delete)",
            check_fn: method_matches_intent,
        },
        BuiltinRule {
            id: "HTTP-002",
            family: RuleFamily::Http,
            severity: Severity::Error,
            description: "GET and DELETE carry no request body",
            check_fn: no_body_on_get_delete,
        },
        BuiltinRule {
            id: "HTTP-003",
            family: RuleFamily::Http,
            severity: Severity::Error,
            description: "Required success status per method (GET 200, POST 201, PUT/PATCH 200 or 204, DELETE 204 or 200 with content)",
            check_fn: success_status_per_method,
        },
        BuiltinRule {
            id: "HTTP-004",
            family: RuleFamily::Http,
            severity: Severity::Error,
            description: "400 on body-carrying methods; 404 on item endpoints",
            check_fn: client_error_statuses,
        },
        BuiltinRule {
            id: "HTTP-005",
            family: RuleFamily::Http,
            severity: Severity::Error,
            description: "500 is declared",
            check_fn: server_error_status,
        },
        BuiltinRule {
            id: "HTTP-006",
            family: RuleFamily::Http,
            severity: Severity::Error,
            description: "401 and 403 are declared on secured endpoints",
            check_fn: auth_statuses,
        },
        BuiltinRule {
            id: "HTTP-007",
            family: RuleFamily::Http,
            severity: Severity::Error,
            description: "4xx and 5xx responses reference an ErrorResponse type",
            check_fn: error_responses_typed,
        },
        BuiltinRule {
            id: "HTTP-008",
            family: RuleFamily::Http,
            severity: Severity::Error,
            description: "204 responses carry no body; status codes are within 100..=599",
            check_fn: status_code_sanity,
        },
        BuiltinRule {
            id: "HTTP-009",
            family: RuleFamily::Http,
            severity: Severity::Error,
            description: "201 responses return a Location header",
            check_fn: created_returns_location,
        },
        BuiltinRule {
            id: "HTTP-010",
            family: RuleFamily::Http,
            severity: Severity::Error,
            description: "Create endpoints declare 409",
            check_fn: create_declares_conflict,
        },
        BuiltinRule {
            id: "HTTP-011",
            family: RuleFamily::Http,
            severity: Severity::Error,
            description: "Body-carrying methods declare 415",
            check_fn: body_declares_unsupported_media,
        },
        BuiltinRule {
            id: "HTTP-012",
            family: RuleFamily::Http,
            severity: Severity::Error,
            description: "Rate-limited endpoints declare 429",
            check_fn: rate_limited_declares_429,
        },
        BuiltinRule {
            id: "HTTP-013",
            family: RuleFamily::Http,
            severity: Severity::Error,
            description: "POST, PUT and PATCH reference a Request type",
            check_fn: body_methods_reference_request,
        },
        BuiltinRule {
            id: "HTTP-014",
            family: RuleFamily::Http,
            severity: Severity::Error,
            description: "200 responses reference a Response or Paginated{Entity}Result type",
            check_fn: ok_references_response,
        },
        BuiltinRule {
            id: "HTTP-015",
            family: RuleFamily::Http,
            severity: Severity::Error,
            description: "POST targets a collection path",
            check_fn: post_targets_collection,
        },
        BuiltinRule {
            id: "HTTP-016",
            family: RuleFamily::Http,
            severity: Severity::Error,
            description: "PUT, PATCH and DELETE target an item path",
            check_fn: item_methods_target_items,
        },
        BuiltinRule {
            id: "HTTP-017",
            family: RuleFamily::Http,
            severity: Severity::Error,
            description: "Body types named by endpoints are declared in the document",
            check_fn: referenced_types_declared,
        },
        BuiltinRule {
            id: "HTTP-018",
            family: RuleFamily::Http,
            severity: Severity::Error,
            description: "Status codes are declared once per endpoint",
            check_fn: status_codes_unique,
        },
        BuiltinRule {
            id: "HTTP-019",
            family: RuleFamily::Http,
            severity: Severity::Error,
            description: "201 is only declared by POST",
            check_fn: created_only_on_post,
        },
    ]
}

fn method_matches_intent(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in &doc.endpoints {
        let expected = ep.intent.expected_method();
        if ep.method != expected {
            out.push(
                ep.label(),
                format!(
                    "{:?} intent should use {}, not {}",
                    ep.intent, expected, ep.method
                ),
            );
        }
    }
}

fn no_body_on_get_delete(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in &doc.endpoints {
        if matches!(ep.method, HttpMethod::Get | HttpMethod::Delete) {
            if let Some(body) = &ep.request_type {
                out.push(
                    ep.label(),
                    format!("{} must not take a request body (found '{}')", ep.method, body),
                );
            }
        }
    }
}

fn missing_success(ep: &Endpoint) -> Option<&'static str> {
    match ep.method {
        HttpMethod::Get if !ep.has_status(200) => Some("GET must declare 200"),
        HttpMethod::Post if !ep.has_status(201) => Some("POST must declare 201"),
        HttpMethod::Put | HttpMethod::Patch if !ep.has_status(200) && !ep.has_status(204) => {
            Some("PUT/PATCH must declare 200 or 204")
        }
        HttpMethod::Delete if ep.returns_content && !ep.has_status(200) => {
            Some("DELETE returning content must declare 200")
        }
        HttpMethod::Delete if !ep.returns_content && !ep.has_status(204) => {
            Some("DELETE must declare 204")
        }
        _ => None,
    }
}

fn success_status_per_method(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in &doc.endpoints {
        if let Some(message) = missing_success(ep) {
            out.push(ep.label(), message);
        }
    }
}

fn client_error_statuses(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in &doc.endpoints {
        if ep.method.carries_body() && !ep.has_status(400) {
            out.push(
                ep.label(),
                format!("{} accepts a body and must declare 400", ep.method),
            );
        }
        if ep.is_item() && !ep.has_status(404) {
            out.push(ep.label(), "item endpoint must declare 404");
        }
    }
}

fn server_error_status(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in &doc.endpoints {
        if !ep.has_status(500) {
            out.push(ep.label(), "500 must be declared");
        }
    }
}

fn auth_statuses(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in &doc.endpoints {
        if ep.security.is_empty() {
            continue;
        }
        for code in [401, 403] {
            if !ep.has_status(code) {
                out.push(
                    ep.label(),
                    format!("secured endpoint must declare {}", code),
                );
            }
        }
    }
}

fn error_responses_typed(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in &doc.endpoints {
        if !ep.status_codes.iter().any(|c| *c >= 400) {
            continue;
        }
        match &ep.error_type {
            None => out.push(
                ep.label(),
                "error responses declared without an ErrorResponse body type",
            ),
            Some(name) if !name.ends_with("ErrorResponse") => out.push(
                ep.label(),
                format!("error body '{}' is not an ErrorResponse type", name),
            ),
            Some(name) => {
                if let Some(ty) = doc.find_type(name) {
                    if ty.role != TypeRole::Error {
                        out.push(
                            ep.label(),
                            format!("error body '{}' is declared with role {}", name, ty.role),
                        );
                    }
                }
            }
        }
    }
}

fn status_code_sanity(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in &doc.endpoints {
        for code in &ep.status_codes {
            if !(100..=599).contains(code) {
                out.push(ep.label(), format!("status code {} is out of range", code));
            }
        }
        let only_no_content = ep.has_status(204) && !ep.has_status(200) && !ep.has_status(201);
        if only_no_content {
            if let Some(body) = &ep.response_type {
                out.push(
                    ep.label(),
                    format!("204 response must not carry a body (found '{}')", body),
                );
            }
        }
    }
}

pub const LOCATION: &str = "Location";

fn created_returns_location(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in doc.endpoints.iter().filter(|e| e.has_status(201)) {
        if !Endpoint::has_header(&ep.response_headers, LOCATION) {
            out.push(ep.label(), "201 must return a Location header");
        }
    }
}

fn create_declares_conflict(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in doc.endpoints.iter().filter(|e| e.intent == Intent::Create) {
        if !ep.has_status(409) {
            out.push(ep.label(), "create endpoint must declare 409");
        }
    }
}

fn body_declares_unsupported_media(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in doc.endpoints.iter().filter(|e| e.method.carries_body()) {
        if !ep.has_status(415) {
            out.push(
                ep.label(),
                format!("{} accepts a body and must declare 415", ep.method),
            );
        }
    }
}

fn rate_limited_declares_429(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in doc.endpoints.iter().filter(|e| e.rate_limited) {
        if !ep.has_status(429) {
            out.push(ep.label(), "rate-limited endpoint must declare 429");
        }
    }
}

/// Checks a named body type by its suffix and, when the type is declared,
/// by its role.
fn check_body_type(
    doc: &DocumentModel,
    ep: &Endpoint,
    name: &str,
    what: &str,
    accepts: fn(TypeRole) -> bool,
    out: &mut Findings<'_>,
) {
    let role_ok = doc.find_type(name).map_or(true, |ty| accepts(ty.role));
    if !accepts(role_for_name(name)) || !role_ok {
        out.push(ep.label(), format!("'{}' is not a {} type", name, what));
    }
}

/// Role implied by a type name's suffix.
fn role_for_name(name: &str) -> TypeRole {
    if name.ends_with("ErrorResponse") {
        TypeRole::Error
    } else if name.ends_with("Response") {
        TypeRole::Response
    } else if name.ends_with("Request") {
        TypeRole::Request
    } else if is_paginated_result_name(name) {
        TypeRole::PaginatedResult
    } else {
        TypeRole::Entity
    }
}

fn is_request_role(role: TypeRole) -> bool {
    role == TypeRole::Request
}

fn is_response_role(role: TypeRole) -> bool {
    matches!(role, TypeRole::Response | TypeRole::PaginatedResult)
}

fn body_methods_reference_request(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in doc.endpoints.iter().filter(|e| e.method.carries_body()) {
        match &ep.request_type {
            None => out.push(
                ep.label(),
                format!("{} must reference a Request body type", ep.method),
            ),
            Some(name) => check_body_type(doc, ep, name, "Request", is_request_role, out),
        }
    }
}

fn ok_references_response(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in doc.endpoints.iter().filter(|e| e.has_status(200)) {
        match &ep.response_type {
            None => out.push(ep.label(), "200 must reference a Response body type"),
            Some(name) => check_body_type(doc, ep, name, "Response", is_response_role, out),
        }
    }
}

fn post_targets_collection(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in doc.endpoints.iter().filter(|e| e.method == HttpMethod::Post) {
        if ep.is_item() {
            out.push(ep.label(), "POST must target a collection, not an item");
        }
    }
}

fn item_methods_target_items(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in &doc.endpoints {
        let item_method = matches!(
            ep.method,
            HttpMethod::Put | HttpMethod::Patch | HttpMethod::Delete
        );
        if item_method && !ep.is_item() {
            out.push(
                ep.label(),
                format!("{} must target an item path ending in a parameter", ep.method),
            );
        }
    }
}

fn referenced_types_declared(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in &doc.endpoints {
        for name in ep.referenced_types() {
            if doc.find_type(name).is_none() {
                out.push(ep.label(), format!("type '{}' is not declared", name));
            }
        }
    }
}

fn status_codes_unique(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in &doc.endpoints {
        let mut seen = HashSet::new();
        for code in &ep.status_codes {
            if !seen.insert(*code) {
                out.push(ep.label(), format!("status code {} is declared twice", code));
            }
        }
    }
}

fn created_only_on_post(doc: &DocumentModel, out: &mut Findings<'_>) {
    for ep in &doc.endpoints {
        if ep.method != HttpMethod::Post && ep.has_status(201) {
            out.push(
                ep.label(),
                format!("{} must not declare 201; only POST creates", ep.method),
            );
        }
    }
}
