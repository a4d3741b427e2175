//! A 6502 wired to a memory device.
//!
//! Owns the clock loop every driver needs: service the pending bus
//! transaction, then clock the core.

use emu_core::{Bus, Ticks};

use crate::bus::BusTransaction;
use crate::cpu::Mos6502;
use crate::error::Error;

/// Where a run stopped: an instruction that jumped to itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trap {
    /// Address of the self-looping instruction.
    pub pc: u16,
    /// Cycles clocked by the run, including the trap instruction.
    pub cycles: Ticks,
}

/// CPU, in-flight bus transaction and memory.
#[derive(Debug)]
pub struct System<B: Bus> {
    pub cpu: Mos6502,
    pub bus: BusTransaction,
    pub memory: B,
}

impl<B: Bus> System<B> {
    /// A system whose first fetch is from address 0.
    pub fn new(memory: B) -> Self {
        Self::with_pc(memory, 0)
    }

    /// A system poised to fetch its first opcode from `pc`.
    pub fn with_pc(memory: B, pc: u16) -> Self {
        let mut cpu = Mos6502::new();
        cpu.regs.pc = pc;
        Self {
            cpu,
            bus: BusTransaction::read(pc),
            memory,
        }
    }

    /// Service the pending transaction, then run one clock cycle.
    pub fn tick(&mut self) -> Result<(), Error> {
        self.bus.service(&mut self.memory);
        self.cpu.cycle(&mut self.bus)
    }

    /// Clock until the current instruction (or interrupt sequence)
    /// completes. Returns the cycles it took.
    pub fn step_instruction(&mut self) -> Result<u32, Error> {
        let mut cycles = 0;
        loop {
            self.tick()?;
            cycles += 1;
            if self.cpu.is_instruction_complete() {
                return Ok(cycles);
            }
        }
    }

    /// Clock until an instruction leaves PC where it found it, or
    /// `limit` cycles pass.
    pub fn run_until_trap(&mut self, limit: u64) -> Result<Trap, Error> {
        let mut prev_pc = self.cpu.pc();
        for cycle in 1..=limit {
            self.tick()?;
            if self.cpu.is_instruction_complete() {
                let pc = self.cpu.pc();
                if pc == prev_pc {
                    log::debug!("trapped at ${pc:04X} after {cycle} cycles");
                    return Ok(Trap {
                        pc,
                        cycles: Ticks::new(cycle),
                    });
                }
                prev_pc = pc;
            }
        }
        Err(Error::CycleLimit {
            cycles: Ticks::new(limit),
        })
    }
}
