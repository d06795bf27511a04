//! # SMS Relay
//!
//! A webhook service that relays inbound Twilio SMS/MMS notifications into a
//! Base44 entity store.
//!
//! ## What it does
//!
//! - **Webhook endpoint**: `POST /` accepting Twilio's form-encoded (or JSON)
//!   delivery payload
//! - **Find-or-create**: one Contact per phone number, one Conversation per
//!   Contact, both created on first message
//! - **Message ingestion**: one Message record per delivery, `image` when a
//!   media attachment is present
//! - **Conversation touch-up**: preview text, timestamp, and unread counter
//!   patched after each message
//! - **Configuration**: environment-based via the `config` crate
//!   (`SMSRELAY__` prefix)
//! - **Observability**: structured logging via `tracing`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use relay_base44::Base44Client;
//! use relay_ingest::IngestPipeline;
//! use relay_web_axum::{router, AppState};
//! use sms_relay::config::AppConfig;
//!
//! let config = AppConfig::load()?;
//! let store = Base44Client::new(config.base44.entities_url(), config.base44.api_key.clone())?;
//! let app = router(AppState {
//!     pipeline: IngestPipeline::new(Arc::new(store)),
//! });
//! ```
//!
//! The find-or-create steps are best-effort: nothing serializes concurrent
//! deliveries for the same number, so duplicates are possible under races.
//! See `DESIGN.md` for the reasoning.

pub mod config;
pub mod telemetry;

pub use config::*;

/// Common imports for sms-relay usage
pub mod prelude {
    pub use crate::config::{AppConfig, Base44Config, LoggingConfig, ServerConfig};
    pub use relay_core::*;
    pub use relay_ingest::IngestPipeline;
}
