//! Domain Layer - Pure scheduling logic with no I/O
//!
//! This module contains the dial planning core:
//! - Node identities, node records and connection flags
//! - Dial history (time-ordered suppression of recent attempts)
//! - IP allow-list (netrestrict)
//! - Task model (dial, discovery lookup, wait) and resolve backoff
//! - The dial scheduler itself

pub mod config;
pub mod dial_history;
pub mod entities;
pub mod errors;
pub mod netlist;
pub mod scheduler;
pub mod tasks;
pub mod value_objects;

pub use config::*;
pub use dial_history::*;
pub use entities::*;
pub use errors::*;
pub use netlist::*;
pub use scheduler::*;
pub use tasks::*;
pub use value_objects::*;
