//! Tactical RMM provider.
//!
//! Manages [Tactical RMM](https://docs.tacticalrmm.com) scripts, script
//! snippets and keystore entries as declarative resources, and exposes six
//! read-only data sources over the same entities. The provider runs as a
//! plugin: the orchestrator spawns the binary, reads the handshake line from
//! stdout and talks gRPC to the announced address.
//!
//! # Layout
//!
//! - [`client`] and [`api`]: authenticated HTTP transport and the typed wire
//!   records it decodes.
//! - [`resources`] and [`data_sources`]: one adapter per entity operation set.
//! - [`reconcile`]: how remote values are merged into local state so that
//!   "unset" and "empty" stay distinct.
//! - [`provider`]: [`TacticalRmmProvider`], the catalog and dispatcher.
//! - [`server`]: the [`ProviderService`] interface and the gRPC plugin server.
//! - [`testing`]: a harness for driving a provider without gRPC.
//!
//! # Handshake
//!
//! ```text
//! TACTICALRMM_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! Format: `TACTICALRMM_PROVIDER|<protocol_version>|<address>`. Logs go to
//! stderr so stdout carries nothing else.
//!
//! # Example
//!
//! ```no_run
//! use tacticalrmm_provider::{init_logging, serve, TacticalRmmProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!     serve(TacticalRmmProvider::new()).await
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod client;
pub mod config;
pub mod data_sources;
pub mod error;
pub mod logging;
pub mod provider;
pub mod reconcile;
pub mod resources;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

pub use client::ApiClient;
pub use config::{ClientConfig, ProviderConfig};
pub use error::{ProviderError, Result};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::TacticalRmmProvider;
pub use schema::ProviderSchema;
pub use server::{serve, serve_on, serve_with_options, ProviderService, ServeOptions};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities,
    HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};
