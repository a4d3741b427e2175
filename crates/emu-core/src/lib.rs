//! Core traits and types for cycle-accurate emulation.
//!
//! Processor cores talk to memory one bus transaction per clock. The types
//! here describe the memory side of that exchange, a cycle counter, and a
//! read-only inspection interface shared by every component.

mod bus;
mod observable;
mod ticks;

pub use bus::{Bus, SimpleBus};
pub use observable::{Observable, Value};
pub use ticks::Ticks;
