//! Read-only status dashboard: health, engine status, routes, ledger and metrics.

pub mod handlers;
pub mod routes;

pub use handlers::AppState;
pub use routes::create_router;
