//! Change-note collection and persistence

pub mod collector;
pub mod store;

pub use collector::{Collected, Collector};
pub use store::ChangeNoteStore;
