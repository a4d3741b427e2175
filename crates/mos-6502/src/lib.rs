//! Cycle-accurate MOS 6502 core built from micro-op sequences.
//!
//! Each documented opcode maps to a fixed list of [`MicroOp`]s composed
//! from an addressing-mode sequence and an operation tail. Every call to
//! [`Mos6502::cycle`] runs micro-ops until one drives the bus, so one call
//! is one bus transaction, dummy reads and page-cross penalties included.
//!
//! The core never touches memory. It leaves a [`BusTransaction`] for the
//! caller to service before the next call; [`System`] does that against
//! any [`emu_core::Bus`].

mod addressing;
mod bus;
mod cpu;
mod error;
pub mod flags;
mod instructions;
mod micro_op;
mod registers;
mod system;

pub use addressing::{Mode, Timing};
pub use bus::BusTransaction;
pub use cpu::Mos6502;
pub use error::Error;
pub use flags::Status;
pub use instructions::{instruction, instructions, Instruction, Interrupt};
pub use micro_op::{MicroOp, Register};
pub use registers::Registers;
pub use system::{System, Trap};
