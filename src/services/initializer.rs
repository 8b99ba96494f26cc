//! Bridge initializer: `Pending -> Authorized | Failed`, embedded or standalone.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tracing::{debug, info, instrument, warn};

use super::namespace::TexNamespace;
use crate::auth::{FileConfigSource, LocalConfigSource, Session, SessionResolver};
use crate::error::{BridgeError, BridgeResult};
use crate::models::{Environment, EventData, DEFAULT_LOCAL_CONFIG_PATH};

/// Whether the widget's window is the top window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameTopology {
    TopLevel,
    Framed,
    /// The top window could not be inspected (cross-origin parent).
    Unknown,
}

impl FrameTopology {
    pub fn is_framed(&self) -> bool {
        !matches!(self, FrameTopology::TopLevel)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeMode {
    /// Wait for the host to authorize over the message channel.
    Embedded,
    /// Authorize from the local TEx configuration.
    Standalone,
}

impl BridgeMode {
    /// Standalone only for a non-production runtime that is not framed, so local
    /// development works without a parent page.
    pub fn detect(topology: FrameTopology, production: bool) -> Self {
        if !topology.is_framed() && !production {
            BridgeMode::Standalone
        } else {
            BridgeMode::Embedded
        }
    }
}

/// Initialization state. Terminal states never change.
#[derive(Debug, Clone)]
pub enum BridgeState {
    Pending,
    Authorized(Arc<Session>),
    Failed(Arc<BridgeError>),
}

impl BridgeState {
    pub fn is_pending(&self) -> bool {
        matches!(self, BridgeState::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BridgeState::Pending => "pending",
            BridgeState::Authorized(_) => "authorized",
            BridgeState::Failed(_) => "failed",
        }
    }

    fn outcome(&self) -> Option<Result<Arc<Session>, Arc<BridgeError>>> {
        match self {
            BridgeState::Pending => None,
            BridgeState::Authorized(s) => Some(Ok(s.clone())),
            BridgeState::Failed(e) => Some(Err(e.clone())),
        }
    }
}

/// Resolves exactly one session per widget mount.
pub struct BridgeInitializer {
    namespace: TexNamespace,
    mode: BridgeMode,
    resolver: SessionResolver,
    config_source: Arc<dyn LocalConfigSource>,
    handshake_timeout: Option<Duration>,
    state: watch::Sender<BridgeState>,
    cancel: watch::Sender<bool>,
}

impl BridgeInitializer {
    pub fn new(namespace: TexNamespace, mode: BridgeMode) -> Self {
        Self {
            namespace,
            mode,
            resolver: SessionResolver::new(),
            config_source: Arc::new(FileConfigSource::new(DEFAULT_LOCAL_CONFIG_PATH)),
            handshake_timeout: None,
            state: watch::Sender::new(BridgeState::Pending),
            cancel: watch::Sender::new(false),
        }
    }

    pub fn with_resolver(mut self, resolver: SessionResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_config_source(mut self, source: Arc<dyn LocalConfigSource>) -> Self {
        self.config_source = source;
        self
    }

    /// Fail the embedded handshake with `HandshakeTimeout` after `limit`. No limit by default.
    pub fn with_handshake_timeout(mut self, limit: Option<Duration>) -> Self {
        self.handshake_timeout = limit;
        self
    }

    pub fn mode(&self) -> BridgeMode {
        self.mode
    }

    pub fn state(&self) -> BridgeState {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<BridgeState> {
        self.state.subscribe()
    }

    /// Abort a pending embedded handshake; the initializer ends up `Failed`.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// Run initialization once. Later calls (and concurrent ones) get the first outcome.
    /// Dropping the returned future while pending removes the channel listener.
    #[instrument(skip(self), fields(mode = ?self.mode))]
    pub async fn init(&self) -> Result<Arc<Session>, Arc<BridgeError>> {
        let settled = self.state.borrow().outcome();
        if let Some(outcome) = settled {
            return outcome;
        }

        let result = match self.mode {
            BridgeMode::Embedded => self.authorize_embedded().await,
            BridgeMode::Standalone => self.authorize_standalone().await,
        };
        self.settle(result)
    }

    /// Wait until some `init` call settles.
    pub async fn settled(&self) -> Result<Arc<Session>, Arc<BridgeError>> {
        let mut rx = self.state.subscribe();
        loop {
            let current = rx.borrow_and_update().outcome();
            if let Some(outcome) = current {
                return outcome;
            }
            if rx.changed().await.is_err() {
                return Err(Arc::new(BridgeError::HandshakeCancelled));
            }
        }
    }

    fn settle(&self, result: BridgeResult<Arc<Session>>) -> Result<Arc<Session>, Arc<BridgeError>> {
        let next = match result {
            Ok(session) => BridgeState::Authorized(session),
            Err(e) => BridgeState::Failed(Arc::new(e)),
        };
        let changed = self.state.send_if_modified(|current| {
            if current.is_pending() {
                *current = next;
                true
            } else {
                false
            }
        });

        let state = self.state();
        match &state {
            BridgeState::Authorized(session) if changed => {
                info!(session_id = %session.id(), environment = %session.environment(), "bridge authorized")
            }
            BridgeState::Failed(e) if changed => warn!(error = %e, "bridge initialization failed"),
            _ => debug!(state = state.as_str(), "bridge already settled"),
        }
        state
            .outcome()
            .unwrap_or_else(|| Err(Arc::new(BridgeError::HandshakeCancelled)))
    }

    async fn authorize_embedded(&self) -> BridgeResult<Arc<Session>> {
        // (origin, token) of the first usable on_authorized
        let (tx, rx) = oneshot::channel::<(String, String)>();
        let tx = Mutex::new(Some(tx));
        let listener = self
            .namespace
            .on_authorized_fn(move |evt: &EventData| {
                let Some(token) = evt.token() else {
                    debug!(origin = %evt.origin, "on_authorized without token ignored");
                    return;
                };
                if let Some(tx) = tx.lock().unwrap_or_else(PoisonError::into_inner).take() {
                    let _ = tx.send((evt.origin.clone(), token.to_string()));
                }
            })
            .into_guard();
        debug!("waiting for on_authorized");

        let received = async {
            match self.handshake_timeout {
                Some(limit) => match tokio::time::timeout(limit, rx).await {
                    Ok(received) => received.map_err(|_| BridgeError::HandshakeCancelled),
                    Err(_) => Err(BridgeError::HandshakeTimeout(limit)),
                },
                None => rx.await.map_err(|_| BridgeError::HandshakeCancelled),
            }
        };
        let (origin, token) = tokio::select! {
            received = received => received?,
            _ = cancelled(self.cancel.subscribe()) => return Err(BridgeError::HandshakeCancelled),
        };
        listener.unsubscribe();

        let environment = Environment::from_origin(&origin)
            .ok_or(BridgeError::UnknownOriginEnvironment(origin))?;
        self.resolver.resolve(&token, environment)
    }

    async fn authorize_standalone(&self) -> BridgeResult<Arc<Session>> {
        let config = self.config_source.load().await?;
        self.resolver.resolve_local(&config)
    }
}

async fn cancelled(mut rx: watch::Receiver<bool>) {
    loop {
        let is_cancelled = *rx.borrow_and_update();
        if is_cancelled {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
