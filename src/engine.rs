//! Engine: one explicit value owning the route table, base URL and ledger.
//!
//! Host applications build an [`Engine`] from a [`Config`], call
//! [`Engine::init`] once with their declared routes, then resolve and dispatch
//! requests against it. Several engines can coexist in one process.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::dispatch::{DispatchHandle, Dispatcher, ResponseEnvelope};
use crate::error::{ConnectError, DispatchError, RouteError};
use crate::ledger::RequestLedger;
use crate::messages::{Category, DefaultMessages, LangType, MessageProvider};
use crate::routes::{ResolvedRequest, RouteRequest, RouteResolver, RouteStore, RouteTable};

/// Route registry plus dispatcher.
pub struct Engine {
    /// Process configuration.
    config: Config,
    /// Owner of `infos.yml`.
    store: RouteStore,
    /// Route table loaded from the store.
    routes: RwLock<RouteTable>,
    /// Base URL loaded from the store.
    base_url: RwLock<Option<String>>,
    /// `enableLogs` flag loaded from the store.
    logging_enabled: AtomicBool,
    /// Set once `init` has run.
    initialized: AtomicBool,
    /// Request ledger shared with the dispatcher.
    ledger: Arc<RequestLedger>,
    /// HTTP dispatcher.
    dispatcher: Dispatcher,
    /// Operator message source.
    messages: Arc<dyn MessageProvider>,
    /// Language tag of the message source.
    lang: LangType,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("store", &self.store)
            .field("initialized", &self.is_initialized())
            .field("lang", &self.lang)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Create an engine with the built-in English messages.
    pub fn new(config: Config) -> Result<Self, ConnectError> {
        Self::with_messages(config, Arc::new(DefaultMessages), LangType::English)
    }

    /// Create an engine with a custom message provider.
    pub fn with_messages(
        config: Config,
        messages: Arc<dyn MessageProvider>,
        lang: LangType,
    ) -> Result<Self, ConnectError> {
        config.validate().map_err(ConnectError::InvalidConfig)?;

        let ledger = Arc::new(RequestLedger::new());
        let dispatcher = Dispatcher::new(&config, Arc::clone(&ledger), Arc::clone(&messages))?;
        let store = RouteStore::new(config.resource_dir());

        Ok(Self {
            config,
            store,
            routes: RwLock::new(RouteTable::new()),
            base_url: RwLock::new(None),
            logging_enabled: AtomicBool::new(true),
            initialized: AtomicBool::new(false),
            ledger,
            dispatcher,
            messages,
            lang,
        })
    }

    /// Write the template if needed, merge `declared` routes, then load the file.
    #[instrument(skip(self, declared), fields(declared = declared.len()))]
    pub fn init(&self, declared: &RouteTable) {
        self.store.ensure_template();
        if !declared.is_empty() {
            self.store.merge_routes(declared);
        }
        self.reload();
        self.initialized.store(true, Ordering::SeqCst);

        let count = self.routes().len().to_string();
        let dir = self.store.dir().display().to_string();
        info!(
            "{}",
            self.messages.message(
                Category::Engine,
                "init",
                &[("count", count.as_str()), ("dir", dir.as_str())],
            )
        );
    }

    /// Re-read routes, base URL and logging flag from the store.
    pub fn reload(&self) {
        let routes = self.store.routes().unwrap_or_default();
        let count = routes.len().to_string();

        if let Ok(mut guard) = self.routes.write() {
            *guard = routes;
        }
        if let Ok(mut guard) = self.base_url.write() {
            *guard = self.store.base_url();
        }
        self.logging_enabled
            .store(self.store.logging_enabled().unwrap_or(true), Ordering::SeqCst);

        info!(
            "{}",
            self.messages
                .message(Category::Engine, "reload", &[("count", count.as_str())])
        );
    }

    /// Snapshot of the route table.
    pub fn routes(&self) -> RouteTable {
        self.routes.read().map(|r| r.clone()).unwrap_or_default()
    }

    /// Base URL from the route file.
    pub fn base_url(&self) -> Option<String> {
        self.base_url.read().ok().and_then(|b| b.clone())
    }

    /// Base URL used when no explicit one is given: config override, then file.
    pub fn effective_base_url(&self) -> Option<String> {
        self.config
            .base_url_override()
            .map(str::to_string)
            .or_else(|| self.base_url())
    }

    /// `enableLogs` flag from the route file (true when absent).
    pub fn logging_enabled(&self) -> bool {
        self.logging_enabled.load(Ordering::SeqCst)
    }

    /// Whether `init` has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Directory holding `infos.yml`.
    pub fn resource_dir(&self) -> PathBuf {
        self.store.dir().to_path_buf()
    }

    /// Route file owner.
    pub fn store(&self) -> &RouteStore {
        &self.store
    }

    /// Request ledger.
    pub fn ledger(&self) -> &Arc<RequestLedger> {
        &self.ledger
    }

    /// Configuration this engine was built from.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Language tag of the message source.
    pub fn lang(&self) -> LangType {
        self.lang
    }

    /// Resolve a caller request against the current route table.
    pub fn resolve(&self, request: &RouteRequest) -> Result<ResolvedRequest, RouteError> {
        let routes = self.routes();
        RouteResolver::new(&routes).build(request).inspect_err(|_| {
            warn!(
                "{}",
                self.messages.message(
                    Category::Engine,
                    "route_missing",
                    &[("route", request.route.as_str())],
                )
            );
        })
    }

    /// Dispatch against the effective base URL.
    pub fn dispatch(&self, request: ResolvedRequest) -> Result<DispatchHandle, DispatchError> {
        let base = self.effective_base_url();
        self.dispatcher.send(request, base.as_deref())
    }

    /// Dispatch against an explicit base URL.
    pub fn dispatch_with_base(
        &self,
        request: ResolvedRequest,
        base_url: &str,
    ) -> Result<DispatchHandle, DispatchError> {
        self.dispatcher.send(request, Some(base_url))
    }

    /// Resolve then dispatch.
    pub fn request(&self, request: RouteRequest) -> Result<DispatchHandle, ConnectError> {
        let resolved = self.resolve(&request)?;
        Ok(self.dispatch(resolved)?)
    }

    /// Resolve, dispatch and wait for the envelope.
    pub async fn call(&self, request: RouteRequest) -> Result<ResponseEnvelope, ConnectError> {
        let handle = self.request(request)?;
        Ok(handle.await?)
    }
}
