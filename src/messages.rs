//! Localized operator messages.
//!
//! The dispatcher and the engine take their operator log text from a
//! [`MessageProvider`] as `(category, key, args)`. Only English is bundled.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Component a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    /// Request dispatcher.
    Client,
    /// Engine lifecycle.
    Engine,
}

/// Language tag recorded on the engine.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumString, EnumIter,
)]
pub enum LangType {
    #[default]
    #[strum(serialize = "EN_US")]
    #[serde(rename = "EN_US")]
    English,
    #[strum(serialize = "FR_EU")]
    #[serde(rename = "FR_EU")]
    French,
    #[strum(serialize = "ES_EU")]
    #[serde(rename = "ES_EU")]
    Spanish,
    #[strum(serialize = "DE_EU")]
    #[serde(rename = "DE_EU")]
    German,
    #[strum(serialize = "IT_EU")]
    #[serde(rename = "IT_EU")]
    Italian,
    #[strum(serialize = "PT_EU")]
    #[serde(rename = "PT_EU")]
    Portuguese,
    #[strum(serialize = "RU_RU")]
    #[serde(rename = "RU_RU")]
    Russian,
}

/// Source of operator-facing message text.
pub trait MessageProvider: Send + Sync {
    /// Render the message for `key` in `category`, substituting `{name}` args.
    fn message(&self, category: Category, key: &str, args: &[(&str, &str)]) -> String;
}

/// Built-in English catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMessages;

/// Bundled English templates.
const CATALOG: &[(Category, &str, &str)] = &[
    (Category::Client, "call", "Calling {method} route {route}"),
    (Category::Client, "base_url", "No base URL configured for route {route}"),
    (Category::Client, "status", "{method} {url} answered HTTP {status}"),
    (Category::Client, "error", "{method} request failed: {error}"),
    (Category::Engine, "init", "Initialized with {count} routes from {dir}"),
    (Category::Engine, "reload", "Reloaded {count} routes"),
    (Category::Engine, "route_missing", "Route {route} is not declared"),
];

impl DefaultMessages {
    fn template(category: Category, key: &str) -> Option<&'static str> {
        CATALOG
            .iter()
            .find(|(c, k, _)| *c == category && *k == key)
            .map(|(_, _, text)| *text)
    }
}

impl MessageProvider for DefaultMessages {
    fn message(&self, category: Category, key: &str, args: &[(&str, &str)]) -> String {
        match Self::template(category, key) {
            Some(template) => render(template, args),
            None => format!("{}.{}", category, key),
        }
    }
}

/// Replace each `{name}` in `template` with its argument value.
pub fn render(template: &str, args: &[(&str, &str)]) -> String {
    args.iter().fold(template.to_string(), |text, (name, value)| {
        text.replace(&format!("{{{}}}", name), value)
    })
}
