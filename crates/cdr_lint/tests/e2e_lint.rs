//! End-to-End tests for the structural validator
//!
//! Runs the full default catalog against complete documents.

use cdr_dictionary::DataType;
use cdr_ids::RowUid;
use cdr_lint::{
    DocumentModel, Endpoint, FieldRef, HttpMethod, Intent, Property, RuleRegistry,
    StructuralValidator, TypeDef, TypeRole,
};

fn field(concept: &str, context: &str, name: &str, uid: &str) -> Property {
    let definition = format!("Canonical {name}");
    Property::field(
        name,
        DataType::String,
        true,
        FieldRef {
            concept: concept.into(),
            context: context.into(),
            data_requirement: name.into(),
            uid: RowUid::parse(uid).unwrap(),
            definition: Some(definition.clone()),
            data_type: Some(DataType::String),
        },
    )
    .with_description(definition)
}

fn customer_tree() -> Vec<Property> {
    vec![Property::node(
        "customer",
        vec![Property::node(
            "contact",
            vec![
                field("Customer", "Contact", "emailAddress", "CDR-1"),
                field("Customer", "Contact", "smsNumber", "CDR-2"),
            ],
        )],
    )]
}

fn endpoint(method: HttpMethod, path: &str, intent: Intent, codes: &[u16]) -> Endpoint {
    let mut ep = Endpoint::new(method, path, intent);
    ep.status_codes = codes.to_vec();
    ep.security = vec!["oauth2".into()];
    ep.request_headers = vec!["X-Correlation-ID".into()];
    ep.error_type = Some("StandardErrorResponse".into());
    if method == HttpMethod::Get {
        ep.cache_headers = vec!["Cache-Control".into()];
    }
    ep
}

fn compliant_document() -> DocumentModel {
    let mut list = endpoint(HttpMethod::Get, "/customers", Intent::Read, &[200, 401, 403, 500]);
    list.collection = true;
    list.paginated = true;
    list.query_params = vec!["limit".into(), "cursor".into()];
    list.response_type = Some("PaginatedCustomerResult".into());

    let mut create = endpoint(
        HttpMethod::Post,
        "/customers",
        Intent::Create,
        &[201, 400, 401, 403, 409, 415, 500],
    );
    create.request_type = Some("CreateCustomerRequest".into());
    create.response_headers = vec!["Location".into()];
    create.response_type = Some("CustomerResponse".into());

    let mut fetch = endpoint(
        HttpMethod::Get,
        "/customers/{customerId}",
        Intent::Read,
        &[200, 401, 403, 404, 500],
    );
    fetch.response_type = Some("CustomerResponse".into());
    fetch.request_headers.push("If-None-Match".into());
    fetch.response_headers = vec!["ETag".into()];

    let delete = endpoint(
        HttpMethod::Delete,
        "/customers/{customerId}",
        Intent::Delete,
        &[204, 401, 403, 404, 500],
    );

    DocumentModel {
        base_uri: "https://api.example.com/crm/v1".into(),
        security_schemes: vec!["oauth2".into()],
        types: vec![
            TypeDef::new("CustomerResponse", TypeRole::Response).with_properties(customer_tree()),
            TypeDef::new("CreateCustomerRequest", TypeRole::Request)
                .with_properties(customer_tree()),
            TypeDef::new("PaginatedCustomerResult", TypeRole::PaginatedResult).with_properties(
                vec![
                    Property::plain("items", DataType::Array, true),
                    Property::plain("nextCursor", DataType::String, false),
                ],
            ),
            TypeDef::new("StandardErrorResponse", TypeRole::Error).with_properties(vec![
                Property::plain("code", DataType::String, true),
                Property::plain("message", DataType::String, true),
            ]),
        ],
        endpoints: vec![list, create, fetch, delete],
    }
}

// =============================================================================
// CLEAN DOCUMENTS
// =============================================================================

/// A document following every convention produces no violations
#[test]
fn test_compliant_document_is_clean() {
    let validator = StructuralValidator::default();
    let violations = validator.validate(&compliant_document());
    assert!(violations.is_empty(), "unexpected: {violations:#?}");
    assert!(validator.check(&compliant_document()).is_ok());
}

// =============================================================================
// ACCUMULATION
// =============================================================================

/// DELETE without 204 on a singular URI yields two distinct violations
#[test]
fn test_delete_without_204_on_singular_uri() {
    let mut doc = compliant_document();
    doc.endpoints = vec![endpoint(
        HttpMethod::Delete,
        "/customer/{customerId}",
        Intent::Delete,
        &[401, 403, 404, 500],
    )];

    let failure = StructuralValidator::default().check(&doc).unwrap_err();
    assert_eq!(failure.violations.len(), 2, "{:#?}", failure.violations);
    assert_eq!(failure.rule_ids(), vec!["NAM-007", "HTTP-003"]);
}

/// Violations from different families are all reported, never short-circuited
#[test]
fn test_all_violations_accumulate() {
    let mut doc = compliant_document();
    doc.base_uri = "http://api.example.com/crm/".into();
    doc.types[0].properties.push(Property::plain("legacy_flag", DataType::Boolean, false));

    let ids: Vec<String> = StructuralValidator::default()
        .validate(&doc)
        .into_iter()
        .map(|v| v.rule_id)
        .collect();

    for expected in ["NAM-001", "NAM-009", "NST-001", "XC-006", "XC-007"] {
        assert!(ids.iter().any(|id| id == expected), "missing {expected} in {ids:?}");
    }
}

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Disabled rules do not run
#[test]
fn test_disabled_rule_is_skipped() {
    let mut doc = compliant_document();
    doc.endpoints[0].cache_headers.clear();

    assert_eq!(StructuralValidator::default().validate(&doc).len(), 1);

    let mut registry = RuleRegistry::with_default_rules();
    registry.disable("XC-001").unwrap();
    assert!(StructuralValidator::new(registry).validate(&doc).is_empty());
}

/// Documents and violations are plain JSON
#[test]
fn test_document_and_violations_serialize() {
    let json = serde_json::to_string(&compliant_document()).unwrap();
    let back: DocumentModel = serde_json::from_str(&json).unwrap();
    assert_eq!(back, compliant_document());

    let mut doc = compliant_document();
    doc.endpoints[3].status_codes.retain(|c| *c != 204);
    let violations = StructuralValidator::default().validate(&doc);
    let value = serde_json::to_value(&violations).unwrap();
    assert_eq!(value[0]["rule_id"], "HTTP-003");
    assert_eq!(value[0]["severity"], "error");
}
