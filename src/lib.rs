//! ConnectLib: named HTTP routes declared in a YAML file, resolved and
//! dispatched asynchronously.
//!
//! Routes live in `infos.yml`:
//!
//! ```text
//! urlPath: "http://localhost:8080/api"
//!
//! routes:
//!   hello: "/hello"
//!   greet: "/greet$name$"
//!   user: "/users/{id}"
//!
//! # Logs
//! enableLogs: true
//! ```
//!
//! `{name}` placeholders are substituted in the path, `$name$` placeholders
//! become query parameters. An optional version tag prefixes the path:
//!
//! ```text
//! user + v2 + {id: 7}      ->  /v2/users/7
//! greet + {name: Sandro}   ->  /greet?name=Sandro
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`routes`]: Route file, route tables and placeholder resolution
//! - [`dispatch`]: Asynchronous HTTP dispatch and response envelopes
//! - [`ledger`]: Tracking of dispatched calls
//! - [`messages`]: Operator message catalog
//! - [`engine`]: Wiring of all of the above
//! - [`api`]: HTTP dashboard for status, routes and metrics
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod messages;
pub mod metrics;
pub mod routes;
pub mod utils;

pub use config::Config;
pub use engine::Engine;
pub use error::{ConnectError, Result};
