//! Document model checked by the validator.
//!
//! A document is a set of named types and endpoints. Type properties form a
//! tree: concept node -> context node -> leaf field carrying a reference to
//! its canonical row.

use cdr_dictionary::DataType;
use cdr_ids::RowUid;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentModel {
    pub base_uri: String,
    #[serde(default)]
    pub security_schemes: Vec<String>,
    #[serde(default)]
    pub types: Vec<TypeDef>,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

impl DocumentModel {
    pub fn find_type(&self, name: &str) -> Option<&TypeDef> {
        self.types.iter().find(|t| t.name == name)
    }
}

/// What a type is used for; drives suffix and nesting rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeRole {
    Request,
    Response,
    Error,
    PaginatedResult,
    Entity,
}

impl TypeRole {
    /// Roles whose properties are canonical fields nested by concept and context.
    /// Error and pagination envelopes have a fixed shape of their own.
    pub fn carries_canonical_fields(&self) -> bool {
        matches!(self, TypeRole::Request | TypeRole::Response | TypeRole::Entity)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TypeRole::Request => "request",
            TypeRole::Response => "response",
            TypeRole::Error => "error",
            TypeRole::PaginatedResult => "paginated_result",
            TypeRole::Entity => "entity",
        }
    }
}

impl fmt::Display for TypeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,
    pub role: TypeRole,
    #[serde(default)]
    pub properties: Vec<Property>,
}

impl TypeDef {
    pub fn new(name: impl Into<String>, role: TypeRole) -> Self {
        Self {
            name: name.into(),
            role,
            properties: Vec::new(),
        }
    }

    pub fn with_properties(mut self, properties: Vec<Property>) -> Self {
        self.properties = properties;
        self
    }

    /// Visit every property depth-first. The callback receives the chain of
    /// ancestors (outermost first) and the property itself.
    pub fn walk<'a>(&'a self, mut visit: impl FnMut(&[&'a Property], &'a Property)) {
        fn recurse<'a>(
            properties: &'a [Property],
            ancestors: &mut Vec<&'a Property>,
            visit: &mut dyn FnMut(&[&'a Property], &'a Property),
        ) {
            for property in properties {
                visit(ancestors, property);
                if !property.children.is_empty() {
                    ancestors.push(property);
                    recurse(&property.children, ancestors, visit);
                    ancestors.pop();
                }
            }
        }
        recurse(&self.properties, &mut Vec::new(), &mut visit);
    }

    /// `TypeName.a.b.c` for the given chain.
    pub fn location(&self, ancestors: &[&Property], property: &Property) -> String {
        let mut out = format!("type {}", self.name);
        for node in ancestors {
            out.push('.');
            out.push_str(&node.name);
        }
        out.push('.');
        out.push_str(&property.name);
        out
    }
}

/// Reference from a leaf field back to its canonical row.
///
/// `definition` and `data_type` are the row's values at assembly time, so
/// the leaf can be checked against them without reading the dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRef {
    pub concept: String,
    pub context: String,
    pub data_requirement: String,
    pub uid: RowUid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    pub data_type: DataType,
    /// Canonical definition, copied verbatim from the dictionary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_ref: Option<FieldRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Property>,
}

impl Property {
    /// Grouping node (concept or context level).
    pub fn node(name: impl Into<String>, children: Vec<Property>) -> Self {
        Self {
            name: name.into(),
            required: true,
            data_type: DataType::Object,
            description: None,
            field_ref: None,
            children,
        }
    }

    /// Leaf field bound to a canonical row.
    pub fn field(
        name: impl Into<String>,
        data_type: DataType,
        required: bool,
        field_ref: FieldRef,
    ) -> Self {
        Self {
            name: name.into(),
            required,
            data_type,
            description: None,
            field_ref: Some(field_ref),
            children: Vec::new(),
        }
    }

    /// Field with no canonical reference (envelope fields such as `items`).
    pub fn plain(name: impl Into<String>, data_type: DataType, required: bool) -> Self {
        Self {
            name: name.into(),
            required,
            data_type,
            description: None,
            field_ref: None,
            children: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_field(&self) -> bool {
        self.field_ref.is_some()
    }

    /// Every canonical leaf at or below this property.
    pub fn leaves(&self) -> Vec<&Property> {
        let mut out = Vec::new();
        collect_leaves(self, &mut out);
        out
    }
}

fn collect_leaves<'a>(property: &'a Property, out: &mut Vec<&'a Property>) {
    if property.is_field() {
        out.push(property);
    }
    for child in &property.children {
        collect_leaves(child, out);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    pub fn carries_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the endpoint is meant to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Read,
    Create,
    Replace,
    Update,
    Delete,
}

impl Intent {
    pub fn expected_method(&self) -> HttpMethod {
        match self {
            Intent::Read => HttpMethod::Get,
            Intent::Create => HttpMethod::Post,
            Intent::Replace => HttpMethod::Put,
            Intent::Update => HttpMethod::Patch,
            Intent::Delete => HttpMethod::Delete,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub method: HttpMethod,
    pub path: String,
    pub intent: Intent,
    #[serde(default)]
    pub status_codes: Vec<u16>,
    #[serde(default)]
    pub security: Vec<String>,
    #[serde(default)]
    pub cache_headers: Vec<String>,
    #[serde(default)]
    pub request_headers: Vec<String>,
    #[serde(default)]
    pub response_headers: Vec<String>,
    #[serde(default)]
    pub query_params: Vec<String>,
    #[serde(default)]
    pub paginated: bool,
    #[serde(default)]
    pub collection: bool,
    #[serde(default)]
    pub returns_content: bool,
    #[serde(default)]
    pub rate_limited: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

/// One `/`-separated piece of an endpoint path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSegment<'a> {
    Static(&'a str),
    Param(&'a str),
}

impl Endpoint {
    pub fn new(method: HttpMethod, path: impl Into<String>, intent: Intent) -> Self {
        Self {
            method,
            path: path.into(),
            intent,
            status_codes: Vec::new(),
            security: Vec::new(),
            cache_headers: Vec::new(),
            request_headers: Vec::new(),
            response_headers: Vec::new(),
            query_params: Vec::new(),
            paginated: false,
            collection: false,
            returns_content: false,
            rate_limited: false,
            request_type: None,
            response_type: None,
            error_type: None,
        }
    }

    pub fn label(&self) -> String {
        format!("endpoint {} {}", self.method, self.path)
    }

    pub fn segments(&self) -> Vec<PathSegment<'_>> {
        self.path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match s.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                Some(param) => PathSegment::Param(param),
                None => PathSegment::Static(s),
            })
            .collect()
    }

    /// Path ends in a parameter (`/customers/{customerId}`).
    pub fn is_item(&self) -> bool {
        matches!(self.segments().last(), Some(PathSegment::Param(_)))
    }

    pub fn has_status(&self, code: u16) -> bool {
        self.status_codes.contains(&code)
    }

    pub fn has_header(headers: &[String], name: &str) -> bool {
        headers.iter().any(|h| h.eq_ignore_ascii_case(name))
    }

    /// Names of the body types this endpoint refers to.
    pub fn referenced_types(&self) -> impl Iterator<Item = &str> {
        [&self.request_type, &self.response_type, &self.error_type]
            .into_iter()
            .filter_map(|name| name.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_segments_split_params() {
        let ep = Endpoint::new(HttpMethod::Get, "/customers/{customerId}/phones", Intent::Read);
        assert_eq!(
            ep.segments(),
            vec![
                PathSegment::Static("customers"),
                PathSegment::Param("customerId"),
                PathSegment::Static("phones"),
            ]
        );
        assert!(!ep.is_item());

        let item = Endpoint::new(HttpMethod::Delete, "/customers/{customerId}", Intent::Delete);
        assert!(item.is_item());
    }

    #[test]
    fn walk_reports_ancestors() {
        let uid = RowUid::parse("CDR-1").unwrap();
        let ty = TypeDef::new("CustomerResponse", TypeRole::Response).with_properties(vec![
            Property::node(
                "customer",
                vec![Property::node(
                    "contact",
                    vec![Property::field(
                        "emailAddress",
                        DataType::String,
                        true,
                        FieldRef {
                            concept: "Customer".into(),
                            context: "Contact".into(),
                            data_requirement: "emailAddress".into(),
                            uid,
                            definition: None,
                            data_type: None,
                        },
                    )],
                )],
            ),
        ]);

        let mut seen = Vec::new();
        ty.walk(|ancestors, prop| seen.push(ty.location(ancestors, prop)));
        assert_eq!(
            seen,
            vec![
                "type CustomerResponse.customer",
                "type CustomerResponse.customer.contact",
                "type CustomerResponse.customer.contact.emailAddress",
            ]
        );
    }

    #[test]
    fn document_deserializes_with_defaults() {
        let json = serde_json::json!({
            "base_uri": "https://api.example.com/v1",
            "endpoints": [{
                "method": "GET",
                "path": "/customers",
                "intent": "read",
                "collection": true
            }]
        });
        let doc: DocumentModel = serde_json::from_value(json).unwrap();
        assert_eq!(doc.endpoints[0].method, HttpMethod::Get);
        assert!(doc.endpoints[0].collection);
        assert!(doc.types.is_empty());
    }
}
