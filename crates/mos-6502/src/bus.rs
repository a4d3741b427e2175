//! The per-cycle bus transaction exchanged with the memory device.

use emu_core::Bus;

/// One bus access: the address and direction the core drives, and the data
/// byte that travels in whichever direction `is_write` selects.
///
/// The driver and the core hand this record back and forth every clock:
/// the core fills in `address`/`is_write` (and `data` for writes), the
/// driver answers reads by filling in `data` before the next cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusTransaction {
    /// Address for this cycle's access.
    pub address: u16,
    /// Byte read (supplied by the driver) or written (supplied by the core).
    pub data: u8,
    /// Direction of this cycle's access.
    pub is_write: bool,
}

impl BusTransaction {
    /// A read request for `address`.
    #[must_use]
    pub const fn read(address: u16) -> Self {
        Self {
            address,
            data: 0,
            is_write: false,
        }
    }

    /// Perform the pending access against a memory device: commit a write,
    /// or latch the byte answering a read into `data`.
    pub fn service<B: Bus>(&mut self, memory: &mut B) {
        if self.is_write {
            memory.write(self.address, self.data);
        } else {
            self.data = memory.read(self.address);
        }
    }
}

impl std::fmt::Display for BusTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dir = if self.is_write { "write" } else { "read" };
        write!(f, "${:04X} ${:02X} {dir}", self.address, self.data)
    }
}
