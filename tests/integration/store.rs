//! Route file lifecycle through the public store API.

use std::fs;

use connectlib::routes::{declare_routes, RouteImport, RouteStore, RouteTable};
use pretty_assertions::assert_eq;
use strum::{AsRefStr, EnumIter};

#[derive(Debug, Clone, Copy, AsRefStr, EnumIter)]
enum AppRoutes {
    Hello,
    Greet,
    UserPosts,
}

impl RouteImport for AppRoutes {
    fn route(&self) -> &str {
        match self {
            AppRoutes::Hello => "/hello",
            AppRoutes::Greet => "/greet$name$",
            AppRoutes::UserPosts => "/users/{id}/posts",
        }
    }
}

#[test]
fn fresh_template_has_expected_layout() {
    let dir = tempfile::tempdir().unwrap();
    let store = RouteStore::new(dir.path().join("nested/data"));

    store.ensure_template();

    let content = fs::read_to_string(store.file()).unwrap();
    assert_eq!(
        content,
        "# Route definitions for ConnectLib\n\
         \n\
         urlPath: \"\"\n\
         \n\
         routes:\n  \
         #info: \"/info/version\"\n  \
         #ping: \"/ping\"\n  \
         #status: \"/status\"\n\
         \n\
         # Logs\n\
         enableLogs: true\n"
    );
    assert_eq!(store.base_url(), None);
    assert_eq!(store.logging_enabled(), Some(true));
    assert_eq!(store.routes(), None);
}

#[test]
fn ensure_template_never_touches_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = RouteStore::new(dir.path());
    fs::write(store.file(), "custom: true\n").unwrap();

    store.ensure_template();

    assert_eq!(fs::read_to_string(store.file()).unwrap(), "custom: true\n");
}

#[test]
fn declared_enum_routes_are_merged_and_reloaded() {
    let dir = tempfile::tempdir().unwrap();
    let store = RouteStore::new(dir.path());
    store.ensure_template();

    store.merge_routes(&declare_routes::<AppRoutes>());

    let routes = store.routes().unwrap();
    assert_eq!(routes.len(), 3);
    assert_eq!(routes.get("hello"), Some("/hello"));
    assert_eq!(routes.get("greet"), Some("/greet$name$"));
    assert_eq!(routes.get("userposts"), Some("/users/{id}/posts"));
    assert_eq!(store.logging_enabled(), Some(true));
}

#[test]
fn merge_preserves_surrounding_content_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = RouteStore::new(dir.path());
    fs::write(
        store.file(),
        "# my api\nurlPath: \"http://localhost:8080/api\"\n\nroutes:\n  stale: \"/stale\"\n\n# Logs\nenableLogs: false\n\n# Extra\nextra:\n  key: value\n",
    )
    .unwrap();

    let declared: RouteTable = [("Hello", "/hello")].into_iter().collect();
    store.merge_routes(&declared);
    let first = fs::read_to_string(store.file()).unwrap();

    assert_eq!(
        first,
        "# my api\n\
         urlPath: \"http://localhost:8080/api\"\n\
         \n\
         routes:\n  \
         #info: \"/info/version\"\n  \
         #ping: \"/ping\"\n  \
         #status: \"/status\"\n\
         \n  \
         hello: \"/hello\"\n\
         \n\
         # Logs\n\
         enableLogs: false\n\
         \n\
         # Extra\n\
         extra:\n  \
         key: value\n"
    );

    store.merge_routes(&declared);
    assert_eq!(fs::read_to_string(store.file()).unwrap(), first);

    assert_eq!(store.base_url().as_deref(), Some("http://localhost:8080/api"));
    assert_eq!(store.logging_enabled(), Some(false));
}

#[test]
fn merge_without_file_creates_template_with_routes() {
    let dir = tempfile::tempdir().unwrap();
    let store = RouteStore::new(dir.path());
    assert!(!store.exists());

    let declared: RouteTable = [("ping", "/ping")].into_iter().collect();
    store.try_merge_routes(&declared).unwrap();

    assert!(store.exists());
    assert_eq!(store.routes().unwrap().get("ping"), Some("/ping"));
    assert_eq!(store.logging_enabled(), Some(true));
}

#[test]
fn invalid_base_url_is_treated_as_absent() {
    let dir = tempfile::tempdir().unwrap();
    let store = RouteStore::new(dir.path());
    fs::write(store.file(), "urlPath: \"not a url\"\nroutes:\n  a: \"/a\"\n").unwrap();

    assert_eq!(store.base_url(), None);
    assert_eq!(store.routes().unwrap().get("a"), Some("/a"));
}

#[test]
fn unparsable_file_yields_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = RouteStore::new(dir.path());
    fs::write(store.file(), "routes: [unclosed\n").unwrap();

    assert_eq!(store.routes(), None);
    assert_eq!(store.base_url(), None);
    assert_eq!(store.logging_enabled(), None);
}

#[test]
fn repeated_merges_with_unusual_keys_leave_file_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let store = RouteStore::new(dir.path());
    let declared: RouteTable = [
        ("2fa", "/auth/2fa"),
        ("hello", "/hello"),
        ("get user", "/users/{id}"),
        ("a:b", "/ab"),
    ]
    .into_iter()
    .collect();

    store.merge_routes(&declared);
    let once = fs::read_to_string(store.file()).unwrap();
    store.merge_routes(&declared);
    let twice = fs::read_to_string(store.file()).unwrap();

    assert_eq!(once, twice);
    assert_eq!(once.matches("  2fa: \"/auth/2fa\"").count(), 1);

    let routes = store.routes().unwrap();
    assert_eq!(routes.len(), 4);
    assert_eq!(routes.get("2fa"), Some("/auth/2fa"));
    assert_eq!(routes.get("get user"), Some("/users/{id}"));
    assert_eq!(routes.get("a:b"), Some("/ab"));
}
