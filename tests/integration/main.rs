//! Integration tests for ConnectLib.
//!
//! Route files live in temporary directories and upstream APIs are wiremock
//! servers, so these tests need no network access beyond localhost.

mod dispatch;
mod store;

use std::fs;
use std::path::Path;

use connectlib::routes::RouteTable;
use connectlib::{Config, Engine};

/// Write an `infos.yml` with the given base URL and routes.
pub fn write_route_file(dir: &Path, base_url: &str, routes: &[(&str, &str)]) {
    let mut content = format!("urlPath: \"{}\"\n\nroutes:\n", base_url);
    for (name, template) in routes {
        content.push_str(&format!("  {}: \"{}\"\n", name, template));
    }
    content.push_str("\n# Logs\nenableLogs: true\n");
    fs::write(dir.join("infos.yml"), content).unwrap();
}

/// Engine rooted at `dir`, initialized from whatever file is there.
pub fn engine_for(dir: &Path) -> Engine {
    let engine = Engine::new(Config::for_dir(dir)).unwrap();
    engine.init(&RouteTable::new());
    engine
}
