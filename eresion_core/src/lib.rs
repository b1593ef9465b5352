//! # Eresion Core
//!
//! Mines recurring behavioral patterns from a stream of gameplay events and
//! crystallizes the significant ones into bounded abilities.
//!
//! ## Core Components
//!
//! - **tokenizer**: Deterministic event-to-token transducer with bounded intensities
//! - **temporal_graph**: Decaying relationship graph with PMI/χ² motif detection
//! - **crystallizer**: Essence extraction and budget-constrained ability composition
//! - **pipeline**: The single owner that wires the stages together
//! - **events**: Outbound contracts and synchronous dispatch
//!
//! ## Time
//!
//! Every stage is driven by the timestamps carried on events and tokens, never
//! by a live clock, so a recorded session replays to the same result.

pub mod config;
pub mod crystallizer;
pub mod error;
pub mod events;
pub mod math;
pub mod pipeline;
pub mod temporal_graph;
pub mod tokenizer;

pub use config::*;
pub use crystallizer::*;
pub use error::*;
pub use events::*;
pub use pipeline::*;
pub use temporal_graph::*;
pub use tokenizer::*;
