//! Micro-operation primitives.
//!
//! Every instruction is an ordered list of these. A primitive touches only
//! the processor's registers, its scratch registers (`v`, `v2`, `w`,
//! `w_carry`, `branch_target`) and the current bus transaction. Exactly the
//! primitives that drive the bus raise the yield flag; everything else is
//! free and runs in the same clock as its neighbours.

use crate::bus::BusTransaction;
use crate::cpu::Mos6502;
use crate::flags::{C, D, N, V, Z};
use crate::Status;

/// Register operand for compare instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    A,
    X,
    Y,
}

/// A single micro-operation in the 6502 execution pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicroOp {
    // === Bus (one clock each) ===

    /// Read from `w`. Yields.
    YieldRead,
    /// Latch the byte answering the previous read into `v`.
    LoadV,
    /// Write `v` to `w`. Yields.
    Write,

    // === Register transfers ===

    ToA,
    ToX,
    ToY,
    ToSp,
    /// Replace the low byte of PC with `v`.
    ToPcLo,
    /// Replace the high byte of PC with `v`.
    ToPcHi,
    FromA,
    FromX,
    FromY,
    FromSp,
    FromPcLo,
    FromPcHi,
    /// `v` <- P with U and B set (PHP, BRK).
    FromStatus,
    /// `v` <- P with U set and B clear (IRQ, NMI).
    FromStatusIrq,
    /// P <- `v` with U forced and B discarded (PLP, RTI).
    ToStatus,
    PcToW,
    WToPc,
    /// `w` <- current stack slot, S unchanged.
    SpToW,
    /// `w` <- `v`, a zero-page address.
    VToW,
    /// `v2` <- `v` (low byte of an address under assembly).
    VToV2,
    /// High byte of `v2` <- `v`.
    VToV2Hi,
    V2ToW,
    /// `w` <- a fixed vector address.
    Vector(u16),

    // === Address arithmetic ===

    IncPc,
    /// Increment `w` with full 16-bit wraparound.
    IncW,
    /// Increment the low byte of `w` only. JMP ($xxFF) fetches its high
    /// byte from $xx00.
    IncWSamePage,
    /// Clear the high byte of `w`.
    PageZero,
    /// Add `v` to `w` within page zero.
    AddVWLo,
    /// Add `v` to the low byte of `w`. On a page cross, latch `w_carry`
    /// and read from the uncorrected address. Yields only on a cross.
    AddVW,
    /// Read from `w` unless `AddVW` already did. Stores and
    /// read-modify-write instructions always spend this cycle.
    ForcePenalty,
    /// Carry a latched page cross into the high byte of `w`.
    AddWCarry,

    // === Stack ===

    /// `w` <- current stack slot, then S -= 1.
    PushAddress,
    /// S += 1, then `w` <- current stack slot.
    PullAddress,

    // === ALU (operate on `v`) ===

    Asl,
    Lsr,
    Rol,
    Ror,
    /// `v` <- A | `v`.
    Ora,
    /// `v` <- A & `v`.
    And,
    /// `v` <- A ^ `v`.
    Eor,
    Inc,
    Dec,
    /// Flags from `register - v`; nothing stored.
    Compare(Register),
    Bit,
    /// A <- A + `v` + C.
    Adc,
    /// A <- A - `v` - !C.
    Sbc,

    // === Flags ===

    /// N and Z from `v`.
    UpdateNz,
    SetFlag(u8),
    ClearFlag(u8),

    // === Branches ===

    /// End the instruction unless `flag` is in state `set`.
    BranchIf { flag: u8, set: bool },
    /// Pending target <- PC + `v` as a signed offset.
    BranchOffset,
    /// Apply the low byte of the pending target. If that reaches the target
    /// the instruction ends here.
    BranchFixup,
    /// Apply the full pending target and clear it.
    BranchCommit,
}

impl MicroOp {
    /// True for primitives that always drive the bus.
    #[must_use]
    pub const fn always_yields(self) -> bool {
        matches!(self, Self::YieldRead | Self::Write)
    }

    /// True for primitives that drive the bus only on some paths.
    #[must_use]
    pub const fn may_yield(self) -> bool {
        matches!(self, Self::AddVW | Self::ForcePenalty)
    }
}

impl Mos6502 {
    /// Apply one primitive.
    pub(crate) fn execute(&mut self, op: MicroOp, bus: &mut BusTransaction) {
        match op {
            MicroOp::YieldRead => self.yield_read(bus),
            MicroOp::LoadV => self.v = bus.data,
            MicroOp::Write => {
                bus.address = self.w;
                bus.data = self.v;
                bus.is_write = true;
                self.yielded = true;
            }

            MicroOp::ToA => self.regs.a = self.v,
            MicroOp::ToX => self.regs.x = self.v,
            MicroOp::ToY => self.regs.y = self.v,
            MicroOp::ToSp => self.regs.s = self.v,
            MicroOp::ToPcLo => self.regs.pc = (self.regs.pc & 0xFF00) | u16::from(self.v),
            MicroOp::ToPcHi => self.regs.pc = (u16::from(self.v) << 8) | (self.regs.pc & 0x00FF),
            MicroOp::FromA => self.v = self.regs.a,
            MicroOp::FromX => self.v = self.regs.x,
            MicroOp::FromY => self.v = self.regs.y,
            MicroOp::FromSp => self.v = self.regs.s,
            MicroOp::FromPcLo => self.v = self.regs.pc as u8,
            MicroOp::FromPcHi => self.v = (self.regs.pc >> 8) as u8,
            MicroOp::FromStatus => self.v = self.regs.p.to_byte_brk(),
            MicroOp::FromStatusIrq => self.v = self.regs.p.to_byte_irq(),
            MicroOp::ToStatus => self.regs.p = Status::from_pulled(self.v),
            MicroOp::PcToW => self.w = self.regs.pc,
            MicroOp::WToPc => self.regs.pc = self.w,
            MicroOp::SpToW => self.w = self.regs.stack_addr(),
            MicroOp::VToW => self.w = u16::from(self.v),
            MicroOp::VToV2 => self.v2 = u16::from(self.v),
            MicroOp::VToV2Hi => self.v2 = (self.v2 & 0x00FF) | (u16::from(self.v) << 8),
            MicroOp::V2ToW => self.w = self.v2,
            MicroOp::Vector(addr) => self.w = addr,

            MicroOp::IncPc => self.regs.pc = self.regs.pc.wrapping_add(1),
            MicroOp::IncW => self.w = self.w.wrapping_add(1),
            MicroOp::IncWSamePage => {
                self.w = (self.w & 0xFF00) | u16::from((self.w as u8).wrapping_add(1));
            }
            MicroOp::PageZero => self.w &= 0x00FF,
            MicroOp::AddVWLo => self.w = u16::from((self.w as u8).wrapping_add(self.v)),
            MicroOp::AddVW => {
                let full = self.w.wrapping_add(u16::from(self.v));
                self.w = (self.w & 0xFF00) | (full & 0x00FF);
                if self.w != full {
                    self.w_carry = true;
                    self.yield_read(bus);
                }
            }
            MicroOp::ForcePenalty => {
                if !self.w_carry {
                    self.yield_read(bus);
                }
            }
            MicroOp::AddWCarry => {
                if self.w_carry {
                    self.w = self.w.wrapping_add(0x0100);
                    self.w_carry = false;
                }
            }

            MicroOp::PushAddress => self.w = self.regs.push(),
            MicroOp::PullAddress => self.w = self.regs.pull(),

            MicroOp::Asl => {
                self.regs.p.set_if(C, self.v & 0x80 != 0);
                self.v <<= 1;
                self.regs.p.update_nz(self.v);
            }
            MicroOp::Lsr => {
                self.regs.p.set_if(C, self.v & 0x01 != 0);
                self.v >>= 1;
                self.regs.p.update_nz(self.v);
            }
            MicroOp::Rol => {
                let carry = u8::from(self.regs.p.is_set(C));
                self.regs.p.set_if(C, self.v & 0x80 != 0);
                self.v = (self.v << 1) | carry;
                self.regs.p.update_nz(self.v);
            }
            MicroOp::Ror => {
                let carry = if self.regs.p.is_set(C) { 0x80 } else { 0 };
                self.regs.p.set_if(C, self.v & 0x01 != 0);
                self.v = (self.v >> 1) | carry;
                self.regs.p.update_nz(self.v);
            }
            MicroOp::Ora => self.v |= self.regs.a,
            MicroOp::And => self.v &= self.regs.a,
            MicroOp::Eor => self.v ^= self.regs.a,
            MicroOp::Inc => self.v = self.v.wrapping_add(1),
            MicroOp::Dec => self.v = self.v.wrapping_sub(1),
            MicroOp::Compare(register) => {
                let reference = match register {
                    Register::A => self.regs.a,
                    Register::X => self.regs.x,
                    Register::Y => self.regs.y,
                };
                self.regs.p.set_if(C, reference >= self.v);
                self.regs.p.update_nz(reference.wrapping_sub(self.v));
            }
            MicroOp::Bit => {
                self.regs.p.set_if(Z, self.regs.a & self.v == 0);
                self.regs.p.set_if(N, self.v & 0x80 != 0);
                self.regs.p.set_if(V, self.v & 0x40 != 0);
            }
            MicroOp::Adc => {
                if self.regs.p.is_set(D) {
                    self.adc_decimal(self.v);
                } else {
                    self.adc_binary(self.v);
                }
            }
            MicroOp::Sbc => {
                if self.regs.p.is_set(D) {
                    self.sbc_decimal(self.v);
                } else {
                    // SBC is ADC with inverted operand
                    self.adc_binary(!self.v);
                }
            }

            MicroOp::UpdateNz => self.regs.p.update_nz(self.v),
            MicroOp::SetFlag(flag) => self.regs.p.set(flag),
            MicroOp::ClearFlag(flag) => self.regs.p.clear(flag),

            MicroOp::BranchIf { flag, set } => {
                if self.regs.p.is_set(flag) != set {
                    self.finish();
                }
            }
            MicroOp::BranchOffset => {
                let offset = i16::from(self.v as i8);
                self.branch_target = Some(self.regs.pc.wrapping_add_signed(offset));
            }
            MicroOp::BranchFixup => {
                if let Some(target) = self.branch_target {
                    self.regs.pc = (self.regs.pc & 0xFF00) | (target & 0x00FF);
                    if self.regs.pc == target {
                        self.branch_target = None;
                        self.finish();
                    }
                }
            }
            MicroOp::BranchCommit => {
                if let Some(target) = self.branch_target.take() {
                    self.regs.pc = target;
                }
            }
        }
    }

    /// Issue a read of `w` and pause the sequence.
    pub(crate) fn yield_read(&mut self, bus: &mut BusTransaction) {
        bus.address = self.w;
        bus.is_write = false;
        self.yielded = true;
    }

    fn adc_binary(&mut self, val: u8) {
        let a = self.regs.a;
        let carry = u16::from(self.regs.p.is_set(C));
        let sum = u16::from(a) + u16::from(val) + carry;
        let result = sum as u8;

        self.regs.p.set_if(C, sum > 0xFF);
        self.regs
            .p
            .set_if(V, (a ^ result) & (val ^ result) & 0x80 != 0);
        self.regs.a = result;
        self.regs.p.update_nz(result);
    }

    fn adc_decimal(&mut self, val: u8) {
        let a = self.regs.a;
        let carry = u8::from(self.regs.p.is_set(C));

        let mut lo = (a & 0x0F) + (val & 0x0F) + carry;
        if lo > 9 {
            lo += 6;
        }
        let mut hi = (a >> 4) + (val >> 4) + u8::from(lo > 0x0F);

        // NMOS: Z from the binary sum, N and V from the half-adjusted sum
        let binary = a.wrapping_add(val).wrapping_add(carry);
        self.regs.p.set_if(Z, binary == 0);
        self.regs.p.set_if(N, hi & 0x08 != 0);
        self.regs
            .p
            .set_if(V, !(a ^ val) & (a ^ (hi << 4)) & 0x80 != 0);

        if hi > 9 {
            hi += 6;
        }

        self.regs.p.set_if(C, hi > 0x0F);
        self.regs.a = (hi << 4) | (lo & 0x0F);
    }

    fn sbc_decimal(&mut self, val: u8) {
        let a = self.regs.a;
        let borrow = i16::from(!self.regs.p.is_set(C));

        // NMOS: every flag comes from the binary difference
        let diff = i16::from(a) - i16::from(val) - borrow;
        let result = diff as u8;
        self.regs.p.set_if(C, diff >= 0);
        self.regs.p.update_nz(result);
        self.regs
            .p
            .set_if(V, (a ^ val) & (a ^ result) & 0x80 != 0);

        let mut lo = i16::from(a & 0x0F) - i16::from(val & 0x0F) - borrow;
        let mut hi = i16::from(a >> 4) - i16::from(val >> 4);
        if lo < 0 {
            lo -= 6;
            hi -= 1;
        }
        if hi < 0 {
            hi -= 6;
        }

        self.regs.a = ((hi << 4) as u8) | ((lo & 0x0F) as u8);
    }
}
