//! Accept loop and per-connection orchestration.
//!
//! # Session State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │  Accepted   │ ← Read the request preamble
//!        └──────┬──────┘
//!               │ Preamble complete          (parse error → close)
//!               ▼
//!        ┌──────────────────┐
//!        │ PreambleParsed   │ ← Look up the Host value
//!        └──────┬───────────┘
//!               │ Route found                (no route → 404, close)
//!               ▼
//!        ┌──────────────────┐
//!        │ RouteResolved    │ ← Dial upstream, replay preamble, relay
//!        └──────┬───────────┘
//!               │ Either side done           (dial error → 502, close)
//!               ▼
//!            Closed
//! ```

pub mod dispatcher;
pub mod listener;
pub mod session;

pub use dispatcher::Dispatcher;
pub use listener::Server;
