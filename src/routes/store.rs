//! YAML-backed route definition file (`infos.yml`).
//!
//! The file is human-editable. Merging declared routes rewrites only the body
//! of the `routes:` section; everything before it and every section after it
//! is carried over line for line.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

use super::types::RouteTable;
use crate::error::StoreError;

/// Name of the route definition file inside the resource directory.
pub const ROUTE_FILE: &str = "infos.yml";

/// Line that opens the routes section.
const ROUTES_HEADER: &str = "routes:";

/// Commented examples written at the top of every routes section.
const EXAMPLE_ROUTES: [&str; 3] = [
    "  #info: \"/info/version\"",
    "  #ping: \"/ping\"",
    "  #status: \"/status\"",
];

/// Lines written before the routes section of a fresh file.
const TEMPLATE_HEAD: [&str; 5] = [
    "# Route definitions for ConnectLib",
    "",
    "urlPath: \"\"",
    "",
    ROUTES_HEADER,
];

/// Lines written after the routes section of a fresh file.
const TEMPLATE_TAIL: [&str; 2] = ["# Logs", "enableLogs: true"];

/// Indented `key: "value"` line, the key plain or double-quoted.
static ROUTE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s+(?:"(?:[^"\\]|\\.)*"|[^#\s"][^:]*)\s*:\s*".*"\s*$"#)
        .expect("valid regex")
});

/// Keys that YAML reads back unchanged without quoting.
static PLAIN_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_][a-z0-9_.\-]*$").expect("valid regex"));

/// Parsed view of the definition file.
#[derive(Debug, Default, Deserialize)]
struct RouteFile {
    #[serde(rename = "urlPath", default)]
    url_path: Option<String>,
    #[serde(default)]
    routes: Option<BTreeMap<String, serde_yaml::Value>>,
    #[serde(rename = "enableLogs", default)]
    enable_logs: Option<bool>,
}

/// Owner of the on-disk route definition file.
#[derive(Debug, Clone)]
pub struct RouteStore {
    /// Directory holding the file.
    dir: PathBuf,
    /// Full path of `infos.yml`.
    file: PathBuf,
}

impl RouteStore {
    /// Store for `<dir>/infos.yml`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let file = dir.join(ROUTE_FILE);
        Self { dir, file }
    }

    /// Directory holding the definition file.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the definition file.
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Whether the definition file exists.
    pub fn exists(&self) -> bool {
        self.file.is_file()
    }

    /// Write the default template unless the file already exists.
    ///
    /// Failures are logged, never returned.
    pub fn ensure_template(&self) {
        if let Err(e) = self.try_ensure_template() {
            error!(error = %e, "Failed to create route file template");
        }
    }

    /// Write the default template unless the file already exists.
    #[instrument(skip(self), fields(file = %self.file.display()))]
    pub fn try_ensure_template(&self) -> Result<(), StoreError> {
        self.create_dir()?;

        if self.exists() {
            debug!("Route file already present");
            return Ok(());
        }

        self.write(&render_template(&RouteTable::new()))?;
        warn!("Route file created from template; set urlPath before dispatching");
        Ok(())
    }

    /// Merge declared routes into the file, creating it if needed.
    ///
    /// Failures are logged, never returned.
    pub fn merge_routes(&self, routes: &RouteTable) {
        if let Err(e) = self.try_merge_routes(routes) {
            error!(error = %e, "Failed to merge routes into route file");
        }
    }

    /// Merge declared routes into the file, creating it if needed.
    #[instrument(skip(self, routes), fields(file = %self.file.display(), routes = routes.len()))]
    pub fn try_merge_routes(&self, routes: &RouteTable) -> Result<(), StoreError> {
        self.create_dir()?;

        if !self.exists() {
            self.write(&render_template(routes))?;
            warn!("Route file created from template; set urlPath before dispatching");
            return Ok(());
        }

        let content = fs::read_to_string(&self.file).map_err(|source| StoreError::Read {
            path: self.file.clone(),
            source,
        })?;

        let merged = merge_content(&content, routes);
        if merged == content {
            debug!("Routes section already up to date");
            return Ok(());
        }

        self.write(&merged)?;
        info!("Routes section updated");
        Ok(())
    }

    /// Base URL (`urlPath`), if set to a valid absolute URL.
    pub fn base_url(&self) -> Option<String> {
        let raw = self.load().ok()?.url_path?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        match url::Url::parse(trimmed) {
            Ok(_) => Some(trimmed.to_string()),
            Err(e) => {
                warn!(url = %trimmed, error = %e, "Ignoring invalid urlPath");
                None
            }
        }
    }

    /// Route table from the `routes:` mapping.
    pub fn routes(&self) -> Option<RouteTable> {
        let routes = self.load().ok()?.routes?;

        let table = routes
            .into_iter()
            .filter_map(|(key, value)| match value {
                serde_yaml::Value::String(s) => Some((key, s)),
                serde_yaml::Value::Number(n) => Some((key, n.to_string())),
                other => {
                    warn!(route = %key, value = ?other, "Skipping non-string route template");
                    None
                }
            })
            .collect();

        Some(table)
    }

    /// `enableLogs` flag.
    pub fn logging_enabled(&self) -> Option<bool> {
        self.load().ok()?.enable_logs
    }

    fn load(&self) -> Result<RouteFile, StoreError> {
        let content = fs::read_to_string(&self.file).map_err(|source| {
            debug!(file = %self.file.display(), error = %source, "Route file unreadable");
            StoreError::Read {
                path: self.file.clone(),
                source,
            }
        })?;

        if content.trim().is_empty() {
            return Ok(RouteFile::default());
        }

        serde_yaml::from_str(&content).map_err(|source| {
            warn!(file = %self.file.display(), error = %source, "Route file is not valid YAML");
            StoreError::Parse {
                path: self.file.clone(),
                source,
            }
        })
    }

    fn create_dir(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::TemplateIo {
            path: self.dir.clone(),
            source,
        })
    }

    fn write(&self, content: &str) -> Result<(), StoreError> {
        fs::write(&self.file, content).map_err(|source| StoreError::TemplateIo {
            path: self.file.clone(),
            source,
        })
    }
}

/// Render a `  key: "value"` route line.
fn route_line(key: &str, template: &str) -> String {
    let key = key.to_lowercase();
    let key = if is_plain_key(&key) {
        key
    } else {
        format!("\"{}\"", escape(&key))
    };
    format!("  {}: \"{}\"", key, escape(template))
}

/// Whether `key` can be written unquoted and still read back as the same string.
fn is_plain_key(key: &str) -> bool {
    PLAIN_KEY.is_match(key)
        && matches!(
            serde_yaml::from_str::<serde_yaml::Value>(key),
            Ok(serde_yaml::Value::String(ref parsed)) if parsed == key
        )
}

/// Escape a value for a double-quoted YAML scalar.
fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Join head, a freshly rendered routes body and tail into file content.
fn splice<S: AsRef<str>, T: AsRef<str>>(head: &[S], routes: &RouteTable, tail: &[T]) -> String {
    let mut lines: Vec<String> = head.iter().map(|l| l.as_ref().to_string()).collect();
    lines.extend(EXAMPLE_ROUTES.iter().map(|l| l.to_string()));
    if !routes.is_empty() {
        lines.push(String::new());
        lines.extend(routes.iter().map(|(key, template)| route_line(key, template)));
    }

    if !tail.is_empty() {
        lines.push(String::new());
        lines.extend(tail.iter().map(|l| l.as_ref().to_string()));
    }

    let mut content = lines.join("\n");
    content.push('\n');
    content
}

/// Content of a fresh definition file.
fn render_template(routes: &RouteTable) -> String {
    splice(&TEMPLATE_HEAD[..], routes, &TEMPLATE_TAIL[..])
}

/// Rewrite the routes section of existing content.
fn merge_content(content: &str, routes: &RouteTable) -> String {
    let lines: Vec<&str> = content.lines().collect();

    let Some(start) = lines.iter().position(|l| l.trim() == ROUTES_HEADER) else {
        // No routes section: append one after the existing content.
        let mut head: Vec<&str> = lines.clone();
        while head.last().is_some_and(|l| l.trim().is_empty()) {
            head.pop();
        }
        if !head.is_empty() {
            head.push("");
        }
        head.push(ROUTES_HEADER);
        return splice(&head, routes, &[] as &[&str]);
    };

    let mut end = lines[start + 1..]
        .iter()
        .position(|l| ends_section(l))
        .map(|offset| start + 1 + offset)
        .unwrap_or(lines.len());

    // Top-level comments directly above the next section belong to it.
    while end > start + 1 && lines[end - 1].starts_with('#') {
        end -= 1;
    }

    splice(&lines[..=start], routes, &lines[end..])
}

/// Whether a line inside the routes section marks its end.
fn ends_section(line: &str) -> bool {
    let trimmed = line.trim();
    !(trimmed.is_empty() || trimmed.starts_with('#') || ROUTE_LINE.is_match(line))
}
