//! Bridge services: dispatcher, message channel, namespace, initializer and context.

pub mod channel;
pub mod context;
pub mod dispatcher;
pub mod initializer;
pub mod namespace;

pub use channel::{parse_envelope, MessageChannel, Rejection};
pub use context::{ContextResolver, ContextResult};
pub use dispatcher::{Callback, EventDispatcher, Subscription, SubscriptionGuard};
pub use initializer::{BridgeInitializer, BridgeMode, BridgeState, FrameTopology};
pub use namespace::{global, TarkenRegistry, TexNamespace, TEX_HELPER_VERSION};
