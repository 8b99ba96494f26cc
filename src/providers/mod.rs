//! Provider/consumer surface: the resolved session and context, reachable from
//! consumer code running inside a mounted view's scope.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::auth::{HubHttpClient, Session};
use crate::error::{BridgeError, BridgeResult};
use crate::models::{ContextData, ContextLocation};
use crate::services::{
    BridgeInitializer, BridgeMode, BridgeState, ContextResolver, ContextResult, TexNamespace,
};

tokio::task_local! {
    static TEX_PROVIDERS: TexProviders;
}

/// What a mounted view provides to its children.
#[derive(Clone, Debug)]
pub struct TexProviders {
    session: Arc<Session>,
    location: ContextLocation,
    context: watch::Receiver<Option<ContextResult>>,
}

impl TexProviders {
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn location(&self) -> ContextLocation {
        self.location
    }

    /// Run `fut` with these providers in scope.
    pub async fn scope<F: Future>(self, fut: F) -> F::Output {
        TEX_PROVIDERS.scope(self, fut).await
    }

    /// Run a synchronous closure with these providers in scope.
    pub fn sync_scope<R>(self, f: impl FnOnce() -> R) -> R {
        TEX_PROVIDERS.sync_scope(self, f)
    }

    fn context_data(&self) -> Option<ContextData> {
        match self.context.borrow().as_ref()? {
            Ok(data) => Some(data.clone()),
            Err(_) => None,
        }
    }
}

/// Hub API capability handed to consumers.
#[derive(Clone, Debug)]
pub struct TarkenApi {
    hub: Arc<Session>,
}

impl TarkenApi {
    pub fn http_client(&self) -> &HubHttpClient {
        self.hub.http_client()
    }

    pub fn authorization_token(&self) -> &str {
        self.hub.authorization_token()
    }
}

/// Session accessor. Fails with `NotInitialized` outside a mounted view.
pub fn use_tarken_api() -> BridgeResult<TarkenApi> {
    TEX_PROVIDERS
        .try_with(|p| TarkenApi {
            hub: p.session.clone(),
        })
        .map_err(|_| BridgeError::NotInitialized("useTarkenApi"))
}

/// Context accessor for the location the caller expects to be mounted in.
/// Fails with `LocationMismatch` if the view was mounted somewhere else.
pub fn use_tex_context(location: ContextLocation) -> BridgeResult<ContextData> {
    let providers = TEX_PROVIDERS
        .try_with(Clone::clone)
        .map_err(|_| BridgeError::NotInitialized("useTexContext"))?;
    if providers.location != location {
        return Err(BridgeError::LocationMismatch {
            requested: location.to_string(),
            mounted: providers.location.to_string(),
        });
    }
    providers
        .context_data()
        .ok_or(BridgeError::NotInitialized("useTexContext"))
}

/// What a view shows right now.
#[derive(Clone, Debug)]
pub enum ViewState {
    Loading,
    Ready(TexProviders),
    Failed(Arc<BridgeError>),
}

/// Mounts the bridge for one location: one session plus live context.
pub struct TexViewContainer {
    location: ContextLocation,
    initializer: BridgeInitializer,
    context: ContextResolver,
}

impl TexViewContainer {
    /// Wire an initializer and a context resolver for `mode` against `namespace`.
    /// `query` is only read in standalone mode.
    pub fn new(
        location: ContextLocation,
        namespace: TexNamespace,
        mode: BridgeMode,
        query: &str,
    ) -> Self {
        let context = ContextResolver::for_mode(mode, location, &namespace, query);
        let initializer = BridgeInitializer::new(namespace, mode);
        Self::from_parts(initializer, context)
    }

    pub fn from_parts(initializer: BridgeInitializer, context: ContextResolver) -> Self {
        Self {
            location: context.location(),
            initializer,
            context,
        }
    }

    pub fn location(&self) -> ContextLocation {
        self.location
    }

    pub fn initializer(&self) -> &BridgeInitializer {
        &self.initializer
    }

    pub fn context(&self) -> &ContextResolver {
        &self.context
    }

    /// Snapshot of the view: any failure wins, then loading until both parts are present.
    pub fn view_state(&self) -> ViewState {
        let context = self.context.current();
        match (self.initializer.state(), context) {
            (BridgeState::Failed(e), _) | (_, Some(Err(e))) => ViewState::Failed(e),
            (BridgeState::Authorized(session), Some(Ok(_))) => {
                ViewState::Ready(self.providers(session))
            }
            _ => ViewState::Loading,
        }
    }

    /// Initialize the bridge and wait for the first context.
    /// Resolves with the first failure of either part without waiting for the other.
    pub async fn mount(&self) -> Result<TexProviders, Arc<BridgeError>> {
        debug!(location = %self.location, mode = ?self.initializer.mode(), "mounting view");
        let (session, _context) =
            tokio::try_join!(self.initializer.init(), self.context.ready())?;
        info!(location = %self.location, session_id = %session.id(), "view ready");
        Ok(self.providers(session))
    }

    /// Mount, then run `render` with the providers in scope.
    pub async fn render<F, Fut>(&self, render: F) -> Result<Fut::Output, Arc<BridgeError>>
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        let providers = self.mount().await?;
        Ok(providers.scope(render()).await)
    }

    fn providers(&self, session: Arc<Session>) -> TexProviders {
        TexProviders {
            session,
            location: self.location,
            context: self.context.watch(),
        }
    }
}
