//! Route template resolution.
//!
//! Two placeholder syntaxes are expanded in two separate passes:
//!
//! ```text
//! {name}   path placeholder   -> replaced in place by the value
//! $name$   query placeholder  -> removed, appended as ?name=value
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument};
use url::form_urlencoded;

use super::types::{Params, ResolvedRequest, RouteRequest, RouteTable};
use crate::error::RouteError;
use crate::metrics;

/// `$name$` with no embedded dollar sign.
static QUERY_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$([^$]+)\$").expect("valid regex"));

/// Resolves route keys against a route table.
#[derive(Debug, Clone, Copy)]
pub struct RouteResolver<'a> {
    table: &'a RouteTable,
}

impl<'a> RouteResolver<'a> {
    /// Resolver over a route table.
    pub fn new(table: &'a RouteTable) -> Self {
        Self { table }
    }

    /// Resolve a route key into a concrete path.
    #[instrument(skip(self, path_params, query_params))]
    pub fn resolve(
        &self,
        route: &str,
        version: Option<&str>,
        path_params: Option<&Params>,
        query_params: Option<&Params>,
    ) -> Result<String, RouteError> {
        let key = route.to_lowercase();
        let Some(template) = self.table.get(&key) else {
            metrics::inc_route_misses();
            return Err(RouteError::NotFound { route: key });
        };

        let mut path = match version.map(str::trim).filter(|v| !v.is_empty()) {
            Some(version) => format!("/{}{}", version, template),
            None => template.to_string(),
        };

        if let Some(params) = path_params {
            path = substitute_path_params(&path, params);
        }

        let empty = Params::new();
        path = expand_query_params(&path, query_params.unwrap_or(&empty));

        metrics::inc_routes_resolved();
        debug!(route = %key, path = %path, "Route resolved");
        Ok(path)
    }

    /// Resolve a caller request into an immutable dispatchable request.
    pub fn build(&self, request: &RouteRequest) -> Result<ResolvedRequest, RouteError> {
        let path = self.resolve(
            &request.route,
            request.version.as_deref(),
            Some(&request.path_params),
            Some(&request.query_params),
        )?;

        Ok(ResolvedRequest::new(
            request.method,
            request.route.to_lowercase(),
            path,
            request.body.clone(),
            request.version.clone(),
        ))
    }
}

/// Replace every `{name}` with its value. Unmatched placeholders stay literal.
pub fn substitute_path_params(template: &str, params: &Params) -> String {
    params
        .iter()
        .fold(template.to_string(), |path, (name, value)| {
            path.replace(&format!("{{{}}}", name), value)
        })
}

/// Turn `$name$` placeholders into a query string.
///
/// Names are emitted in template order; names missing from `params` are
/// dropped silently. Every placeholder is stripped from the path.
pub fn expand_query_params(template: &str, params: &Params) -> String {
    if !template.contains('$') {
        return template.to_string();
    }

    let pairs: Vec<String> = QUERY_PLACEHOLDER
        .captures_iter(template)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str();
            let value = params.get(name)?;
            Some(format!("{}={}", name, encode(value)))
        })
        .collect();

    let stripped = QUERY_PLACEHOLDER.replace_all(template, "");
    let mut path = collapse_separators(&stripped);

    if !pairs.is_empty() {
        path.push(if path.contains('?') { '&' } else { '?' });
        path.push_str(&pairs.join("&"));
    }

    path
}

/// Remove `&` runs and a dangling `?` left behind by stripped placeholders.
fn collapse_separators(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        if c == '&' && matches!(out.chars().last(), Some('&') | Some('?')) {
            continue;
        }
        out.push(c);
    }

    while out.ends_with('&') || out.ends_with('?') {
        out.pop();
    }

    out
}

fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
