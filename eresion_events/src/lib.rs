//! # Eresion Events
//!
//! The inbound event contract between the game-logic collaborator and the
//! behavioral pipeline. This crate only describes what happened in the game;
//! it does not interpret behavior.
//!
//! - **envelope**: the raw `{type, data, source, timestamp_ms}` wire shape
//! - **game_event**: the closed, typed set of event payloads
//! - **mechanics**: small closed vocabularies used inside payloads

pub mod envelope;
pub mod game_event;
pub mod mechanics;

pub use envelope::*;
pub use game_event::*;
pub use mechanics::*;
