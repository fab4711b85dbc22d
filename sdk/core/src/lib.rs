//! Lantern SDK - Socket Plugin Protocol and Runtime
//!
//! Plugins are independent worker processes that attach to the Lantern
//! launcher over a Unix socket, register once, answer queries, and push
//! updates while their own background watchers keep running.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Plugin process                        │
//! │                                                              │
//! │   handlers ──┐          background tasks ──┐                 │
//! │              ▼                             ▼                 │
//! │   ┌─────────────────┐   ┌──────────────────────────────┐     │
//! │   │ dispatch loop   │   │ PluginContext (push API,     │     │
//! │   │ (in order)      │   │ notify, request)             │     │
//! │   └────────┬────────┘   └──────────────┬───────────────┘     │
//! │            │     queued whole frames   │                     │
//! │            └───────────┬───────────────┘                     │
//! │                        ▼                                     │
//! │   reader task ◀── length-prefixed JSON frames ──▶ writer     │
//! └────────────────────────┬─────────────────────────────────────┘
//!                          │ Unix socket
//!                          ▼
//!                   Lantern host daemon
//! ```
//!
//! # Key Types
//!
//! - [`Plugin`] / [`PluginBuilder`]: attach handlers and tasks, then `run()`
//! - [`PluginContext`]: push API and outbound requests
//! - [`Manifest`]: identity sent at registration
//! - [`PluginConfig`]: socket location, limits and timeouts
//!
//! # Quick Start
//!
//! ```ignore
//! use lantern_sdk::{Manifest, Plugin, SearchRequest, SearchResult};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let plugin = Plugin::builder(Manifest::new("hello", "Hello"))
//!         .on_search(|_ctx, req: SearchRequest| async move {
//!             Ok(vec![SearchResult::new("greet", format!("Hello, {}", req.query))])
//!         })
//!         .task("ticker", |ctx| async move {
//!             ctx.shutdown_token().cancelled().await;
//!             Ok(())
//!         })
//!         .build();
//!
//!     plugin.run().await?;
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod context;
pub mod correlation;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod protocol;
pub mod push;
pub mod runtime;
pub mod transport;
pub mod types;

pub use config::{ConfigError, ConfigOverrides, ConfigSource, PluginConfig, RuntimeConfig};
pub use context::PluginContext;
pub use dispatch::{
    ActionRequest, FormSubmitted, HandlerTable, InitialRequest, SearchRequest, SliderChanged,
    SwitchToggled,
};
pub use error::{PluginError, Result};
pub use logging::init_logging;
pub use manifest::Manifest;
pub use protocol::{Envelope, Message, ProtocolError, RequestId, RpcError};
pub use push::ResultsUpdate;
pub use runtime::shutdown::ShutdownToken;
pub use runtime::{Plugin, PluginBuilder};
pub use transport::{TransportConfig, TransportError};
pub use types::{
    AmbientItem, Badge, Chip, ExecuteAction, IndexUpdate, PluginStatus, ResultAction, ResultPatch,
    SearchResult,
};
