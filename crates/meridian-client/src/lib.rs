//! Meridian serving client.
//!
//! A [`Client`] owns the set of registered functions, serves them to the
//! agent over an inbound listener, and invokes functions registered
//! elsewhere through an outbound channel. Registration metadata lives in a
//! [`FunctionDescriptor`]; the work itself is any [`FunctionHandler`]:
//! an object, an async closure, or a sync closure adapted at the
//! registration boundary.
//!
//! ```ignore
//! let client = Client::new(ClientConfig::default());
//! client.register_async_fn(
//!     FunctionDescriptor::new("greet", "social"),
//!     |ctx, payload| async move { Ok(format!("hello from {}", ctx.call_id())) },
//! )?;
//! client.connect().await?;
//! tokio::spawn(client.clone().serve(cancel.clone()));
//! ```

mod client;
mod config;
mod context;
mod descriptor;
mod error;
mod handler;
mod registry;

pub use client::Client;
pub use config::{ClientConfig, TlsConfig};
pub use context::FunctionContext;
pub use descriptor::FunctionDescriptor;
pub use error::ClientError;
pub use handler::{FunctionHandler, HandlerError};
pub use registry::FunctionRegistry;

// The per-call options live with the wire types; re-exported here so most
// callers need only this crate.
pub use meridian_proto::InvokeOptions;
