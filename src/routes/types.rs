//! Route-related types: HTTP methods, version tags, route tables and requests.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumString, IntoEnumIterator};

/// HTTP verb used to dispatch a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// GET, never sends a body.
    #[strum(to_string = "GET", serialize = "get")]
    Get,
    /// POST.
    #[strum(to_string = "POST", serialize = "post")]
    Post,
    /// PUT.
    #[strum(to_string = "PUT", serialize = "put")]
    Put,
    /// PATCH.
    #[strum(to_string = "PATCH", serialize = "patch")]
    Patch,
    /// DELETE, never sends a body.
    #[strum(to_string = "DELETE", serialize = "delete")]
    Delete,
}

impl Method {
    /// Whether requests with this verb carry a JSON body.
    pub fn sends_body(&self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Patch)
    }

    /// Upper-case verb name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// Equivalent reqwest method.
    pub fn as_reqwest(&self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// API version tag prefixed to a route template.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ApiVersion {
    /// `/v1`
    V1,
    /// `/v2`
    V2,
    /// `/v3`
    V3,
    /// `/v4`
    V4,
    /// `/v5`
    V5,
}

/// Placeholder values keyed by placeholder name.
pub type Params = BTreeMap<String, String>;

/// Route key (lower-cased) to path template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteTable {
    routes: BTreeMap<String, String>,
}

impl RouteTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a route, lower-casing the key.
    pub fn insert(&mut self, key: impl AsRef<str>, template: impl Into<String>) {
        self.routes
            .insert(key.as_ref().to_lowercase(), template.into());
    }

    /// Case-insensitive template lookup.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.routes.get(&key.to_lowercase()).map(String::as_str)
    }

    /// Number of routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the table has no routes.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Iterate routes in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.routes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for RouteTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = RouteTable::new();
        for (key, template) in iter {
            table.insert(key, template);
        }
        table
    }
}

/// Enums that declare routes, one variant per route.
///
/// The variant name (lower-cased) becomes the route key.
pub trait RouteImport: AsRef<str> {
    /// Path template for this route.
    fn route(&self) -> &str;
}

/// Collect every route declared by `E`.
pub fn declare_routes<E>() -> RouteTable
where
    E: RouteImport + IntoEnumIterator,
{
    E::iter()
        .map(|variant| (variant.as_ref().to_lowercase(), variant.route().to_string()))
        .collect()
}

/// Caller-side description of a call before resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequest {
    /// HTTP verb.
    pub method: Method,
    /// Route key (matched case-insensitively).
    pub route: String,
    /// Optional version prefix.
    pub version: Option<String>,
    /// Values for `{name}` placeholders.
    pub path_params: Params,
    /// Values for `$name$` placeholders.
    pub query_params: Params,
    /// JSON body for POST/PUT/PATCH.
    pub body: Option<Map<String, Value>>,
}

impl RouteRequest {
    /// Start a request for a route.
    pub fn new(method: Method, route: impl AsRef<str>) -> Self {
        Self {
            method,
            route: route.as_ref().to_lowercase(),
            version: None,
            path_params: Params::new(),
            query_params: Params::new(),
            body: None,
        }
    }

    /// Prefix the route with a version segment.
    pub fn version(mut self, version: impl AsRef<str>) -> Self {
        self.version = Some(version.as_ref().to_string());
        self
    }

    /// Set a `{name}` placeholder value.
    pub fn path_param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.path_params.insert(name.into(), value.to_string());
        self
    }

    /// Set a `$name$` placeholder value.
    pub fn query_param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query_params.insert(name.into(), value.to_string());
        self
    }

    /// Attach a JSON body.
    pub fn body(mut self, body: Map<String, Value>) -> Self {
        self.body = Some(body);
        self
    }
}

/// Fully resolved request, ready for dispatch.
///
/// Immutable once built; handed to the dispatcher by value.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRequest {
    method: Method,
    route: String,
    path: String,
    body: Option<Map<String, Value>>,
    version: Option<String>,
}

impl ResolvedRequest {
    /// Build a resolved request.
    pub fn new(
        method: Method,
        route: impl Into<String>,
        path: impl Into<String>,
        body: Option<Map<String, Value>>,
        version: Option<String>,
    ) -> Self {
        Self {
            method,
            route: route.into(),
            path: path.into(),
            body,
            version,
        }
    }

    /// HTTP verb.
    pub fn method(&self) -> Method {
        self.method
    }

    /// Route key this request was resolved from.
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Resolved path (placeholders substituted).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Body to send, if any.
    pub fn body(&self) -> Option<&Map<String, Value>> {
        self.body.as_ref()
    }

    /// Version prefix applied during resolution.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}
