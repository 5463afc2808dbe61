//! # shelfdb
//!
//! A persistent key-value store over SQLite with:
//! - Transparent value serialization (tagged text encoding)
//! - Atomic numeric accumulation (add/subtract in one statement)
//! - Prefix search over keys
//! - Lazy schema materialization
//! - Best-effort get/set event broadcast
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Store                                 │
//! │   has / get / set / delete / find / add / subtract / ...     │
//! └────────────┬───────────────────────────────┬────────────────┘
//!              │                               │
//!              ▼                               ▼
//!       ┌─────────────┐                 ┌─────────────┐
//!       │ Value Codec │                 │  Event Bus  │
//!       │ (tag+text)  │                 │ (broadcast) │
//!       └──────┬──────┘                 └─────────────┘
//!              │
//!              ▼
//!       ┌─────────────┐
//!       │   SQLite    │
//!       │ (one table) │
//!       └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod events;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::Config;
pub use error::{Result, ShelfError};
pub use events::{Event, EventKind};
pub use store::{Entry, Store};

/// The semantic value type: strings, numbers, booleans, null, arrays, objects
pub use serde_json::Value;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of shelfdb
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
