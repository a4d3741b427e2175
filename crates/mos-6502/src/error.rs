//! Errors reported by the core and its driver.

use std::fmt;

use emu_core::Ticks;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Decode found no table entry. The fetch is re-issued at the same
    /// address, so the caller may patch memory and keep clocking.
    UnknownOpcode { opcode: u8, address: u16 },
    /// A run exhausted its cycle budget without the program counter
    /// settling on a trap.
    CycleLimit { cycles: Ticks },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownOpcode { opcode, address } => {
                write!(f, "unknown opcode ${opcode:02X} at ${address:04X}")
            }
            Self::CycleLimit { cycles } => {
                write!(f, "no trap reached after {cycles} cycles")
            }
        }
    }
}

impl std::error::Error for Error {}
