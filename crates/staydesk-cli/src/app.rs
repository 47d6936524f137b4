use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use staydesk_api::HttpClient;
use staydesk_cache::{CacheOptions, LocalStore, QueryCache};
use staydesk_core::persist::PLAN_SLICE;
use staydesk_core::{
    gate, ApiSlice, Config, Error, GateDecision, Notifier, PersistedSlice, PlanSelection, Session,
    StoreSessionRepository, Toast, ToastKind,
};

/// Everything a command needs, wired once at startup
pub struct App {
    pub config: Config,
    pub store: Arc<LocalStore>,
    pub session: Arc<Session>,
    pub slice: ApiSlice,
}

impl App {
    pub fn init(api_url: Option<String>) -> Result<Self> {
        let mut config = Config::load()?;
        config.apply_env(api_url);

        let storage_path = Config::storage_path()?;
        tracing::debug!("Opening local store at {:?}", storage_path);
        let store = Arc::new(LocalStore::open(&storage_path)?);

        let repo = Arc::new(StoreSessionRepository::new(Arc::clone(&store)));
        let session = Arc::new(Session::new(repo, config.session.cookie_ttl_days));

        let client = HttpClient::with_connect_timeout(
            config.api.base_url.clone(),
            session.clone(),
            config.api.connect_timeout(),
        )?;
        let cache = QueryCache::with_options(CacheOptions {
            keep_unused_for: Duration::from_secs(config.cache.keep_unused_secs),
        });

        Ok(Self {
            slice: ApiSlice::new(Arc::new(client), cache),
            config,
            store,
            session,
        })
    }

    /// Run the route gate for a screen path; errors if it would bounce us
    pub fn require_session(&self, path: &str) -> Result<()> {
        match gate(path, self.session.has_auth_cookie()) {
            GateDecision::Allow => Ok(()),
            GateDecision::Redirect(to) => {
                tracing::debug!("Gate sent {} to {}", path, to);
                Err(Error::NotAuthenticated).context("Run `staydesk login` first")
            }
        }
    }

    pub fn plans(&self) -> PersistedSlice<PlanSelection> {
        PersistedSlice::new(
            Arc::clone(&self.store),
            self.config.persist.key.clone(),
            PLAN_SLICE,
            Duration::from_millis(self.config.persist.rehydrate_timeout_ms),
        )
    }
}

/// Prints toasts as they arrive
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, toast: Toast) {
        match toast.kind {
            ToastKind::Success => println!("✓ {}", toast.message),
            ToastKind::Error => eprintln!("✗ {}", toast.message),
        }
    }
}
