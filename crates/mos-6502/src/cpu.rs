//! 6502 CPU implementation.
//!
//! Cycle-accurate emulation where each `cycle()` call performs exactly one
//! bus transaction. Instructions are sequences of micro-ops; the scheduler
//! runs free micro-ops back to back and stops at the first one that drives
//! the bus.

use emu_core::{Observable, Ticks, Value};

use crate::bus::BusTransaction;
use crate::error::Error;
use crate::flags::{C, D, I, N, V, Z};
use crate::instructions::{instruction, Interrupt};
use crate::micro_op::MicroOp;
use crate::Registers;

/// The MOS 6502 CPU.
///
/// The caller owns memory and the clock. Between two calls to
/// [`Mos6502::cycle`] it services the [`BusTransaction`] the core left
/// behind: commit the write, or put the byte read into `data`.
#[derive(Debug)]
pub struct Mos6502 {
    /// CPU registers.
    pub regs: Registers,

    /// Working value: bus data and ALU operand.
    pub(crate) v: u8,
    /// Address under assembly, byte by byte.
    pub(crate) v2: u16,
    /// Effective address.
    pub(crate) w: u16,
    /// Page cross latched by indexing, not yet applied to `w`.
    pub(crate) w_carry: bool,
    /// Branch destination awaiting the page-cross check.
    pub(crate) branch_target: Option<u16>,

    /// Last opcode decoded (0 while an interrupt sequence runs).
    opcode: u8,
    /// Micro-ops of the instruction in flight; empty between instructions.
    steps: &'static [MicroOp],
    /// Next micro-op to run.
    pub(crate) step: usize,
    /// Raised by a micro-op that drove the bus this cycle.
    pub(crate) yielded: bool,

    /// IRQ level - true while the line is held low.
    irq_line: bool,
    /// NMI edge detector - true once the line went low.
    nmi_pending: bool,

    /// Total cycles executed.
    total_cycles: Ticks,
}

impl Default for Mos6502 {
    fn default() -> Self {
        Self::new()
    }
}

impl Mos6502 {
    /// Create a 6502 with every register and scratch value zeroed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            v: 0,
            v2: 0,
            w: 0,
            w_carry: false,
            branch_target: None,
            opcode: 0,
            steps: &[],
            step: 0,
            yielded: false,
            irq_line: false,
            nmi_pending: false,
            total_cycles: Ticks::ZERO,
        }
    }

    /// Advance by one clock cycle.
    ///
    /// `bus` must hold the answer to the transaction issued by the previous
    /// call. On return it holds this cycle's transaction. Decoding an opcode
    /// with no table entry returns [`Error::UnknownOpcode`] and re-issues
    /// the fetch at the same address.
    pub fn cycle(&mut self, bus: &mut BusTransaction) -> Result<(), Error> {
        debug_assert!(!self.yielded, "yield flag leaked across cycles");
        self.total_cycles += Ticks::new(1);

        if self.steps.is_empty() {
            if let Err(err) = self.decode(bus) {
                self.execute(MicroOp::PcToW, bus);
                self.yield_read(bus);
                self.yielded = false;
                return Err(err);
            }
        }

        debug_assert!(self.step <= self.steps.len(), "step cursor past end");
        while !self.yielded && self.step < self.steps.len() {
            let op = self.steps[self.step];
            self.step += 1;
            log::trace!("{:04X} {op:?}", self.regs.pc);
            self.execute(op, bus);
        }

        if !self.yielded {
            // Free last cycle: fetch the next opcode now
            debug_assert!(!self.w_carry, "page cross never applied");
            self.steps = &[];
            self.step = 0;
            self.execute(MicroOp::PcToW, bus);
            self.execute(MicroOp::YieldRead, bus);
        }

        self.yielded = false;
        Ok(())
    }

    /// Load the sequence for the byte just fetched, or for a pending
    /// interrupt, which discards that byte.
    fn decode(&mut self, bus: &BusTransaction) -> Result<(), Error> {
        self.w_carry = false;
        self.branch_target = None;
        self.step = 0;

        if self.nmi_pending {
            self.nmi_pending = false;
            self.opcode = 0;
            self.steps = Interrupt::Nmi.sequence();
            log::debug!("NMI at ${:04X}", self.regs.pc);
            return Ok(());
        }
        if self.irq_line && !self.regs.p.is_set(I) {
            self.opcode = 0;
            self.steps = Interrupt::Irq.sequence();
            log::debug!("IRQ at ${:04X}", self.regs.pc);
            return Ok(());
        }

        self.opcode = bus.data;
        match instruction(self.opcode) {
            Some(instr) => {
                log::trace!("{:04X} {} {}", self.regs.pc, instr.mnemonic, instr.mode);
                self.steps = instr.steps.as_slice();
                self.regs.pc = self.regs.pc.wrapping_add(1);
                Ok(())
            }
            None => {
                log::warn!(
                    "unknown opcode ${:02X} at ${:04X}",
                    self.opcode,
                    self.regs.pc
                );
                Err(Error::UnknownOpcode {
                    opcode: self.opcode,
                    address: self.regs.pc,
                })
            }
        }
    }

    /// Abandon the rest of the current sequence.
    pub(crate) fn finish(&mut self) {
        self.step = self.steps.len();
    }

    /// Start the reset sequence. The next seven cycles read the stack and
    /// the vector at $FFFC without writing anything; the eighth fetches
    /// the first opcode.
    pub fn reset(&mut self) {
        self.steps = Interrupt::Reset.sequence();
        self.step = 0;
        self.yielded = false;
        self.w_carry = false;
        self.branch_target = None;
        self.nmi_pending = false;
        self.opcode = 0;
        log::debug!("reset");
    }

    /// Drive the IRQ line. Sampled at each instruction boundary while I
    /// is clear.
    pub fn set_irq(&mut self, active: bool) {
        self.irq_line = active;
    }

    /// Signal a falling edge on NMI.
    pub fn nmi(&mut self) {
        self.nmi_pending = true;
    }

    /// True between instructions, when the next call decodes.
    #[must_use]
    pub fn is_instruction_complete(&self) -> bool {
        self.steps.is_empty()
    }

    #[must_use]
    pub fn pc(&self) -> u16 {
        self.regs.pc
    }

    /// Last opcode decoded.
    #[must_use]
    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    #[must_use]
    pub fn total_cycles(&self) -> Ticks {
        self.total_cycles
    }
}

impl Observable for Mos6502 {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "pc" => Some(self.regs.pc.into()),
            "a" => Some(self.regs.a.into()),
            "x" => Some(self.regs.x.into()),
            "y" => Some(self.regs.y.into()),
            "s" | "sp" => Some(self.regs.s.into()),
            "p" | "status" => Some(self.regs.p.0.into()),
            "flags.c" | "c" => Some(self.regs.p.is_set(C).into()),
            "flags.z" | "z" => Some(self.regs.p.is_set(Z).into()),
            "flags.i" | "i" => Some(self.regs.p.is_set(I).into()),
            "flags.d" | "d" => Some(self.regs.p.is_set(D).into()),
            "flags.v" | "v" => Some(self.regs.p.is_set(V).into()),
            "flags.n" | "n" => Some(self.regs.p.is_set(N).into()),
            "cycle" => Some(self.total_cycles.get().into()),
            "opcode" => Some(self.opcode.into()),
            "mnemonic" => instruction(self.opcode).map(|instr| instr.mnemonic.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "pc", "a", "x", "y", "s", "p", "flags.c", "flags.z", "flags.i", "flags.d", "flags.v",
            "flags.n", "cycle", "opcode", "mnemonic",
        ]
    }
}
