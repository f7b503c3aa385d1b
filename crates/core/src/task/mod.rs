//! Task module
//!
//! This module contains the task record and the in-memory store that owns
//! task identity.

mod model;
mod store;

pub use model::*;
pub use store::TaskStore;
