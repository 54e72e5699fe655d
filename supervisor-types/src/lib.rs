//! # supervisor-types
//!
//! Core types for exporting supervisord process state. This crate defines the
//! data model shared by the upstream client and the exporter: the raw process
//! records reported by supervisord, the identity used to deduplicate them, the
//! semantic states they are classified into, and the snapshot published to
//! scrapers.
//!
//! ## Design Goals
//!
//! - **No I/O**: Types and pure helpers only, so they are trivially testable
//! - **Closed state set**: [`SemanticState`] is an exhaustive enum, and every
//!   [`StateCounts`] always carries all six of them
//! - **Optional serialization**: Enable the `serde` feature as needed
//!
//! ## Example
//!
//! ```rust
//! use supervisor_types::{RawProcessRecord, SemanticState, StateCounts};
//!
//! let record = RawProcessRecord::new("web", "app", 20, 1_700_000_000);
//! assert_eq!(SemanticState::from_code(record.state), Some(SemanticState::Running));
//!
//! let mut counts = StateCounts::new();
//! counts.increment(SemanticState::Running);
//! assert_eq!(counts.get(SemanticState::Running), 1);
//! assert_eq!(counts.get(SemanticState::Fatal), 0);
//! ```

mod record;
mod snapshot;
mod state;

pub use record::*;
pub use snapshot::*;
pub use state::*;
