//! The `Tarken.tex` namespace: a page-lifetime registry through which code
//! outside the widget subscribes to bridge events.
//!
//! Components receive a [`TexNamespace`] handle explicitly. The process-wide
//! default lives in [`global`]; that is the single injection point for code
//! that cannot be handed a handle.

use once_cell::sync::{Lazy, OnceCell};
use tracing::{debug, info};

use super::channel::MessageChannel;
use super::dispatcher::{Callback, EventDispatcher, Subscription};
use crate::models::{EventData, EventName, MessageEvent, OriginAllowList};

/// Version reported by the `tex` namespace.
pub const TEX_HELPER_VERSION: &str = "1.0.0";

/// Subscription entry points plus the bus listener feeding them.
#[derive(Clone)]
pub struct TexNamespace {
    version: &'static str,
    channel: MessageChannel,
}

impl TexNamespace {
    pub fn new(allowed_origins: OriginAllowList) -> Self {
        Self {
            version: TEX_HELPER_VERSION,
            channel: MessageChannel::new(allowed_origins, EventDispatcher::new()),
        }
    }

    pub fn version(&self) -> &'static str {
        self.version
    }

    /// Subscribe to `on_authorized` payloads (`{ token }`).
    pub fn on_authorized(&self, callback: &Callback) -> Subscription {
        self.channel.dispatcher().subscribe(EventName::OnAuthorized, callback)
    }

    /// Subscribe to `on_context` payloads.
    pub fn on_context(&self, callback: &Callback) -> Subscription {
        self.channel.dispatcher().subscribe(EventName::OnContext, callback)
    }

    pub fn on_authorized_fn<F>(&self, f: F) -> Subscription
    where
        F: Fn(&EventData) + Send + Sync + 'static,
    {
        self.channel.dispatcher().subscribe_fn(EventName::OnAuthorized, f)
    }

    pub fn on_context_fn<F>(&self, f: F) -> Subscription
    where
        F: Fn(&EventData) + Send + Sync + 'static,
    {
        self.channel.dispatcher().subscribe_fn(EventName::OnContext, f)
    }

    /// Deliver a message from the page's message bus.
    pub fn post_message(&self, evt: &MessageEvent) {
        self.channel.handle(evt);
    }

    pub fn channel(&self) -> &MessageChannel {
        &self.channel
    }
}

impl Default for TexNamespace {
    fn default() -> Self {
        Self::new(OriginAllowList::default())
    }
}

/// The `Tarken` object. Namespaces are created at most once and never torn down.
#[derive(Default)]
pub struct TarkenRegistry {
    tex: OnceCell<TexNamespace>,
}

impl TarkenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the `tex` namespace, or return the existing one so that earlier
    /// subscribers survive a second load of the helper.
    pub fn install_tex(&self) -> TexNamespace {
        self.install_tex_with(OriginAllowList::default)
    }

    /// Like `install_tex`, with the allow-list built only if nothing is installed yet.
    pub fn install_tex_with<F>(&self, allowed_origins: F) -> TexNamespace
    where
        F: FnOnce() -> OriginAllowList,
    {
        let mut created = false;
        let ns = self.tex.get_or_init(|| {
            created = true;
            TexNamespace::new(allowed_origins())
        });
        if created {
            info!(version = ns.version(), "tex namespace installed");
        } else {
            debug!("tex namespace already installed, reusing it");
        }
        ns.clone()
    }

    pub fn tex(&self) -> Option<TexNamespace> {
        self.tex.get().cloned()
    }
}

static GLOBAL: Lazy<TarkenRegistry> = Lazy::new(TarkenRegistry::new);

/// Process-wide `Tarken` registry.
pub fn global() -> &'static TarkenRegistry {
    &GLOBAL
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const AUTH: &str = r#"{"_v":"1","e":"on_authorized","d":{"token":"t"}}"#;

    #[test]
    fn reinstall_keeps_existing_subscribers() {
        let registry = TarkenRegistry::new();
        assert!(registry.tex().is_none());

        let first = registry.install_tex();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let _sub = first.on_authorized_fn(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        let second = registry.install_tex_with(|| OriginAllowList::new(["https://other.example"]));
        assert!(second.channel().allowed_origins().contains("https://hub.tarken.ag"));
        second.post_message(&MessageEvent::trusted("https://hub.tarken.ag", AUTH));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn namespace_reports_version() {
        assert_eq!(TexNamespace::default().version(), "1.0.0");
    }

    #[test]
    fn global_registry_is_shared() {
        let a = global().install_tex();
        let b = global().tex().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let cb: Callback = Arc::new(move |_: &EventData| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        let sub = a.on_context(&cb);
        b.post_message(&MessageEvent::trusted(
            "https://hub.tarken.ag",
            r#"{"_v":"1","e":"on_context","d":{"organizationId":"o"}}"#,
        ));
        sub.unsubscribe();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
