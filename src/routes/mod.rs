//! Route registry.
//!
//! This module handles:
//! - The `infos.yml` route definition file
//! - Route tables and caller requests
//! - Placeholder resolution

pub mod resolver;
pub mod store;
pub mod types;

pub use resolver::{expand_query_params, substitute_path_params, RouteResolver};
pub use store::{RouteStore, ROUTE_FILE};
pub use types::{
    declare_routes, ApiVersion, Method, Params, ResolvedRequest, RouteImport, RouteRequest,
    RouteTable,
};
