pub mod boundary;
pub mod channels;
pub mod config;
pub mod domain;
pub mod error;
pub mod forum;
pub mod git;
pub mod notes;
pub mod persist;
pub mod pipeline;
pub mod render;
pub mod stamp;
pub mod ui;

pub use error::{ReleaseError, Result};
