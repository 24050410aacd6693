//! CLI tests for `resolve`, `insert` and `session` with `--json` output.
//!
//! Every test runs the real binary against a seeded CSV dictionary inside a
//! temporary CDR_HOME.

use cdr_dictionary::{CanonicalDictionary, CdrRow, CsvStore, DataType, DictionaryStore};
use cdr_governance::{DocumentSkeleton, TypeShell};
use cdr_ids::RowUid;
use cdr_lint::{DocumentModel, Endpoint, HttpMethod, Intent, Property, TypeRole};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Arc;
use tempfile::TempDir;

fn cdr_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_cdr"))
}

fn run_cli(home: &Path, args: &[&str]) -> Output {
    let mut cmd = Command::new(cdr_bin());
    cmd.args(args);
    cmd.env("CDR_HOME", home);
    cmd.env("RUST_LOG", "error");
    cmd.env_remove("CDR_DICTIONARY");
    cmd.output().expect("failed to execute cdr CLI")
}

fn parse_json_output(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json_start = stdout
        .find(|c| c == '{' || c == '[')
        .unwrap_or_else(|| {
            panic!(
                "no JSON payload found in output\nstdout:\n{}\nstderr:\n{}",
                stdout,
                String::from_utf8_lossy(&output.stderr)
            )
        });
    let mut deserializer = serde_json::Deserializer::from_str(&stdout[json_start..]);
    serde_json::Value::deserialize(&mut deserializer).unwrap_or_else(|err| {
        panic!(
            "failed to parse JSON output: {}\nstdout:\n{}\nstderr:\n{}",
            err,
            stdout,
            String::from_utf8_lossy(&output.stderr)
        )
    })
}

fn run_cli_json(home: &Path, args: &[&str]) -> serde_json::Value {
    let output = run_cli(home, args);
    assert!(
        output.status.success(),
        "command failed: {}\nstdout:\n{}\nstderr:\n{}",
        args.join(" "),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    parse_json_output(&output)
}

fn row(context: &str, name: &str, uid: &str) -> CdrRow {
    CdrRow::new(
        "Customer",
        context,
        name,
        format!("Canonical {name}"),
        DataType::String,
        RowUid::parse(uid).unwrap(),
    )
    .unwrap()
}

/// Seed `cdr.csv` under `home`, the default dictionary location.
fn seed_dictionary(home: &Path) -> PathBuf {
    let path = home.join("cdr.csv");
    let store: Arc<dyn DictionaryStore> = Arc::new(CsvStore::open(&path).unwrap());
    let dictionary = CanonicalDictionary::open(store).unwrap();
    for row in [
        row("Contact", "emailAddress", "CDR-0001"),
        row("Contact", "smsNumber", "CDR-0002"),
        row("Contact", "homePhoneNumber", "CDR-0003"),
        row("Contact", "workPhoneNumber", "CDR-0004"),
        row("Profile", "firstName", "CDR-0005"),
    ] {
        dictionary.append(row).unwrap();
    }
    path
}

fn reopen(path: &Path) -> CanonicalDictionary {
    let store: Arc<dyn DictionaryStore> = Arc::new(CsvStore::open(path).unwrap());
    CanonicalDictionary::open(store).unwrap()
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

fn skeleton() -> DocumentSkeleton {
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

    DocumentSkeleton {
        base_uri: "https://api.example.com/crm/v1".into(),
        security_schemes: vec!["oauth2".into()],
        types: vec![
            TypeShell::new("CustomerResponse", TypeRole::Response),
            TypeShell::new("CreateCustomerRequest", TypeRole::Request),
            TypeShell::new("PaginatedCustomerResult", TypeRole::PaginatedResult).with_properties(
                vec![
                    Property::plain("items", DataType::Array, true),
                    Property::plain("nextCursor", DataType::String, false),
                ],
            ),
            TypeShell::new("StandardErrorResponse", TypeRole::Error).with_properties(vec![
                Property::plain("code", DataType::String, true),
                Property::plain("message", DataType::String, true),
            ]),
        ],
        endpoints: vec![list, create, fetch],
    }
}

/// Write a session request file for Customer fields.
fn write_request(dir: &Path, fields: &[(&str, &str)]) -> PathBuf {
    let fields: Vec<_> = fields
        .iter()
        .map(|(context, name)| {
            serde_json::json!({
                "concept": "Customer",
                "context": context,
                "field_name": name,
                "required": true,
            })
        })
        .collect();
    let request = serde_json::json!({ "fields": fields, "skeleton": skeleton() });
    let path = dir.join("request.json");
    fs::write(&path, serde_json::to_string_pretty(&request).unwrap()).unwrap();
    path
}

fn write_decisions(dir: &Path, decisions: serde_json::Value) -> PathBuf {
    let path = dir.join("decisions.json");
    fs::write(&path, serde_json::to_string_pretty(&decisions).unwrap()).unwrap();
    path
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

// =============================================================================
// RESOLVE
// =============================================================================

#[test]
fn test_resolve_exact_json() {
    let home = TempDir::new().unwrap();
    seed_dictionary(home.path());

    let value = run_cli_json(
        home.path(),
        &["resolve", "Customer", "Contact", "emailAddress", "--json"],
    );
    assert_eq!(value["resolution"]["kind"], "exact");
    assert_eq!(value["resolution"]["row"]["uid"], "CDR-0001");
    assert_eq!(
        value["resolution"]["row"]["long_name"],
        "Customer:Contact:emailAddress"
    );
}

#[test]
fn test_resolve_suggestions_json() {
    let home = TempDir::new().unwrap();
    seed_dictionary(home.path());

    let value = run_cli_json(
        home.path(),
        &["resolve", "Customer", "Contact", "mobileNumber", "--json"],
    );
    assert_eq!(value["resolution"]["kind"], "suggestions");
    let suggestions = value["resolution"]["suggestions"].as_array().unwrap();
    assert!(!suggestions.is_empty());
    assert!(suggestions.len() <= 5);
    assert!(suggestions.iter().any(|s| s["row"]["uid"] == "CDR-0002"));
    for suggestion in suggestions {
        assert_eq!(suggestion["row"]["context"], "Contact");
        assert!(suggestion["score"].as_f64().unwrap() >= 0.4);
    }
}

#[test]
fn test_resolve_no_match_json() {
    let home = TempDir::new().unwrap();
    seed_dictionary(home.path());

    let value = run_cli_json(
        home.path(),
        &["resolve", "Customer", "Contact", "loyaltyTier", "--json"],
    );
    assert_eq!(value["resolution"]["kind"], "no_match");
}

#[test]
fn test_resolve_rejects_bad_threshold() {
    let home = TempDir::new().unwrap();
    seed_dictionary(home.path());

    let output = run_cli(
        home.path(),
        &[
            "resolve",
            "Customer",
            "Contact",
            "emailAddress",
            "--threshold",
            "1.5",
            "--json",
        ],
    );
    assert_eq!(output.status.code(), Some(1));
    let value = parse_json_output(&output);
    assert!(value["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Invalid threshold"));
}

// =============================================================================
// INSERT
// =============================================================================

#[test]
fn test_insert_then_resolve_exact() {
    let home = TempDir::new().unwrap();
    let dictionary = seed_dictionary(home.path());

    let receipt = run_cli_json(
        home.path(),
        &[
            "insert",
            "Customer",
            "Contact",
            "mobileNumber",
            "--definition",
            "Mobile phone number used for calls",
            "--type",
            "string",
            "--uid",
            "CDR-0100",
            "--approved-by",
            "steward@example.com",
            "--json",
        ],
    );
    assert_eq!(receipt["row"]["long_name"], "Customer:Contact:mobileNumber");
    assert_eq!(receipt["slot"], 5);
    assert_eq!(receipt["approved_by"], "steward@example.com");

    assert_eq!(reopen(&dictionary).len(), 6);

    let value = run_cli_json(
        home.path(),
        &["resolve", "Customer", "Contact", "mobileNumber", "--json"],
    );
    assert_eq!(value["resolution"]["kind"], "exact");
    assert_eq!(value["resolution"]["row"]["uid"], "CDR-0100");
}

#[test]
fn test_insert_duplicate_uid_fails() {
    let home = TempDir::new().unwrap();
    let dictionary = seed_dictionary(home.path());

    let output = run_cli(
        home.path(),
        &[
            "insert",
            "Customer",
            "Contact",
            "mobileNumber",
            "--definition",
            "Mobile phone number",
            "--type",
            "string",
            "--uid",
            "CDR-0001",
            "--json",
        ],
    );
    assert_eq!(output.status.code(), Some(1));
    let value = parse_json_output(&output);
    assert!(!value["error"]["suggestions"].as_array().unwrap().is_empty());

    assert_eq!(reopen(&dictionary).len(), 5);
}

#[test]
fn test_insert_rejects_unknown_type() {
    let home = TempDir::new().unwrap();
    seed_dictionary(home.path());

    let output = run_cli(
        home.path(),
        &[
            "insert",
            "Customer",
            "Contact",
            "mobileNumber",
            "--definition",
            "Mobile phone number",
            "--type",
            "integer",
            "--uid",
            "CDR-0100",
        ],
    );
    assert!(!output.status.success());
}

// =============================================================================
// SESSION
// =============================================================================

#[test]
fn test_session_exact_fields_ready() {
    let home = TempDir::new().unwrap();
    seed_dictionary(home.path());
    let request = write_request(
        home.path(),
        &[("Contact", "emailAddress"), ("Profile", "firstName")],
    );
    let document_path = home.path().join("document.json");

    let value = run_cli_json(
        home.path(),
        &[
            "session",
            path_str(&request),
            "--output",
            path_str(&document_path),
            "--json",
        ],
    );
    assert_eq!(value["state"], "ready");
    assert_eq!(value["step"]["status"], "ready");
    let history = value["history"].as_array().unwrap();
    assert!(history.iter().all(|t| t["to"] != "awaiting_approval"));

    let document: DocumentModel =
        serde_json::from_str(&fs::read_to_string(&document_path).unwrap()).unwrap();
    assert_eq!(document.base_uri, "https://api.example.com/crm/v1");
    assert!(document.find_type("CustomerResponse").is_some());
}

#[test]
fn test_session_without_decisions_awaits() {
    let home = TempDir::new().unwrap();
    seed_dictionary(home.path());
    let request = write_request(home.path(), &[("Contact", "mobileNumber")]);

    let output = run_cli(home.path(), &["session", path_str(&request), "--json"]);
    assert_eq!(output.status.code(), Some(3));

    let value = parse_json_output(&output);
    assert_eq!(value["state"], "awaiting_approval");
    assert_eq!(value["step"]["status"], "needs_decision");
    assert_eq!(value["step"]["pending"]["field"]["field_name"], "mobileNumber");
    assert!(!value["step"]["pending"]["suggestions"]
        .as_array()
        .unwrap()
        .is_empty());
}

#[test]
fn test_session_select_decision() {
    let home = TempDir::new().unwrap();
    let dictionary = seed_dictionary(home.path());
    let request = write_request(home.path(), &[("Contact", "mobileNumber")]);
    let decisions = write_decisions(
        home.path(),
        serde_json::json!([{ "action": "select", "uid": "CDR-0002", "field": "mobileNumber" }]),
    );

    let value = run_cli_json(
        home.path(),
        &[
            "session",
            path_str(&request),
            "--decisions",
            path_str(&decisions),
            "--actor",
            "steward@example.com",
            "--json",
        ],
    );
    assert_eq!(value["state"], "ready");
    assert!(value["insertions"].as_array().unwrap().is_empty());
    let decided = value["history"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["from"] == "awaiting_approval")
        .unwrap();
    assert_eq!(decided["actor"], "steward@example.com");

    assert_eq!(reopen(&dictionary).len(), 5);
}

#[test]
fn test_session_insert_decision() {
    let home = TempDir::new().unwrap();
    let dictionary = seed_dictionary(home.path());
    let request = write_request(home.path(), &[("Contact", "loyaltyTier")]);
    let decisions = write_decisions(
        home.path(),
        serde_json::json!([{
            "action": "insert",
            "definition": "Loyalty programme tier",
            "data_type": "enum",
            "uid": "CDR-0200",
        }]),
    );

    let value = run_cli_json(
        home.path(),
        &[
            "session",
            path_str(&request),
            "--decisions",
            path_str(&decisions),
            "--actor",
            "steward@example.com",
            "--json",
        ],
    );
    assert_eq!(value["state"], "ready");
    let insertions = value["insertions"].as_array().unwrap();
    assert_eq!(insertions.len(), 1);
    assert_eq!(insertions[0]["row"]["long_name"], "Customer:Contact:loyaltyTier");
    assert_eq!(insertions[0]["approved_by"], "steward@example.com");

    let reopened = reopen(&dictionary);
    assert_eq!(reopened.len(), 6);
    assert!(reopened
        .find_by_uid(&RowUid::parse("CDR-0200").unwrap())
        .is_some());
}

#[test]
fn test_session_abort_decision_cancels() {
    let home = TempDir::new().unwrap();
    let dictionary = seed_dictionary(home.path());
    let request = write_request(home.path(), &[("Contact", "mobileNumber")]);
    let decisions = write_decisions(
        home.path(),
        serde_json::json!([{ "action": "abort", "reason": "wrong concept" }]),
    );

    let output = run_cli(
        home.path(),
        &[
            "session",
            path_str(&request),
            "--decisions",
            path_str(&decisions),
            "--json",
        ],
    );
    assert_eq!(output.status.code(), Some(4));
    let value = parse_json_output(&output);
    assert_eq!(value["state"], "cancelled");
    assert_eq!(value["step"]["reason"], "wrong concept");

    assert_eq!(reopen(&dictionary).len(), 5);
}

#[test]
fn test_session_decision_for_wrong_field_fails() {
    let home = TempDir::new().unwrap();
    seed_dictionary(home.path());
    let request = write_request(home.path(), &[("Contact", "mobileNumber")]);
    let decisions = write_decisions(
        home.path(),
        serde_json::json!([{ "action": "select", "uid": "CDR-0002", "field": "faxNumber" }]),
    );

    let output = run_cli(
        home.path(),
        &[
            "session",
            path_str(&request),
            "--decisions",
            path_str(&decisions),
            "--json",
        ],
    );
    assert_eq!(output.status.code(), Some(1));
    let value = parse_json_output(&output);
    assert!(value["error"]["message"]
        .as_str()
        .unwrap()
        .contains("faxNumber"));
}

#[test]
fn test_session_missing_request_file() {
    let home = TempDir::new().unwrap();
    let missing = home.path().join("missing.json");

    let output = run_cli(home.path(), &["session", path_str(&missing), "--json"]);
    assert_eq!(output.status.code(), Some(1));
    let value = parse_json_output(&output);
    assert!(value["error"]["message"]
        .as_str()
        .unwrap()
        .contains("File not found"));
}
