//! Domain types shared by every task
//!
//! - [`Event`] - one batch of views arriving at an instant
//! - [`Discipline`] - whether a writer honors the total's lock

mod discipline;
mod event;

pub use discipline::Discipline;
pub use event::{DEFAULT_SCRIPT, Event};
