//! 6502 addressing modes.
//!
//! The 6502 has 13 addressing modes:
//! - Implied: No operand (e.g., CLC, RTS)
//! - Accumulator: Operates on A register (e.g., ASL A)
//! - Immediate: #$nn (literal value)
//! - Zero Page: $nn (8-bit address in page zero)
//! - Zero Page,X: $nn,X (8-bit address + X, wraps in page zero)
//! - Zero Page,Y: $nn,Y (8-bit address + Y, wraps in page zero)
//! - Absolute: $nnnn (16-bit address)
//! - Absolute,X: $nnnn,X (16-bit address + X, may cross page)
//! - Absolute,Y: $nnnn,Y (16-bit address + Y, may cross page)
//! - Indirect: ($nnnn) (JMP only, buggy page boundary behavior)
//! - Indexed Indirect: ($nn,X) (pointer in zero page indexed by X)
//! - Indirect Indexed: ($nn),Y (zero page pointer + Y)
//! - Relative: Branch offset (-128 to +127)
//!
//! Each composer starts with PC on the first operand byte and leaves the
//! effective address in `w`. Immediate mode leaves `w` on the operand
//! itself, so the following read fetches it.

use std::fmt;

use crate::micro_op::MicroOp::{
    self, AddVW, AddVWLo, AddWCarry, ForcePenalty, FromX, FromY, IncPc, IncW, IncWSamePage,
    LoadV, PageZero, PcToW, SpToW, V2ToW, VToV2, VToV2Hi, VToW, YieldRead,
};

/// Read `w` into `v`: one bus cycle.
pub const READ: &[MicroOp] = &[YieldRead, LoadV];

/// Throwaway read of the byte after the opcode.
pub const DUMMY_CYCLE: &[MicroOp] = &[PcToW, YieldRead, LoadV];

/// Throwaway read of the current stack slot.
pub const DUMMY_SP: &[MicroOp] = &[SpToW, YieldRead, LoadV];

/// Fetch a zero-page operand and use it as the address.
const PARAM_ZP_TO_W: &[MicroOp] = &[PcToW, IncPc, YieldRead, LoadV, VToW];

/// Fetch a two-byte operand and use it as the address.
const ABSOLUTE: &[MicroOp] = &[
    PcToW, IncPc, YieldRead, LoadV, VToV2, PcToW, IncPc, YieldRead, LoadV, VToV2Hi, V2ToW,
];

/// Fetch a little-endian pointer from `w` and follow it. The pointer's high
/// byte comes from page zero again when `w` is $FF.
const ZP_POINTER: &[MicroOp] = &[
    YieldRead, LoadV, VToV2, IncW, PageZero, YieldRead, LoadV, VToV2Hi, V2ToW,
];

/// Addressing mode tag carried by every table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndexedIndirectX,
    IndirectIndexedY,
    Relative,
}

/// Cost of indexing across a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timing {
    /// Reads pay the extra cycle only when the page actually changes.
    Fast,
    /// Stores and read-modify-write always pay it.
    Slow,
}

impl Mode {
    /// Operand bytes following the opcode.
    #[must_use]
    pub const fn operand_len(self) -> u8 {
        match self {
            Self::Implied | Self::Accumulator => 0,
            Self::Immediate
            | Self::ZeroPage
            | Self::ZeroPageX
            | Self::ZeroPageY
            | Self::IndexedIndirectX
            | Self::IndirectIndexedY
            | Self::Relative => 1,
            Self::Absolute | Self::AbsoluteX | Self::AbsoluteY | Self::Indirect => 2,
        }
    }

    /// Assembler-style operand template (`$nn` marks the operand).
    #[must_use]
    pub const fn syntax(self) -> &'static str {
        match self {
            Self::Implied => "",
            Self::Accumulator => "A",
            Self::Immediate => "#$nn",
            Self::ZeroPage | Self::Relative => "$nn",
            Self::ZeroPageX => "$nn,X",
            Self::ZeroPageY => "$nn,Y",
            Self::Absolute => "$nnnn",
            Self::AbsoluteX => "$nnnn,X",
            Self::AbsoluteY => "$nnnn,Y",
            Self::Indirect => "($nnnn)",
            Self::IndexedIndirectX => "($nn,X)",
            Self::IndirectIndexedY => "($nn),Y",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Micro-ops that resolve `mode`'s effective address into `w`.
///
/// `timing` only matters for the page-crossing modes (absolute indexed and
/// indirect indexed). Implied and accumulator modes have no operand and
/// compose to nothing. Relative mode fetches the offset into `v`.
#[must_use]
pub fn compose(mode: Mode, timing: Timing) -> Vec<MicroOp> {
    match mode {
        Mode::Implied | Mode::Accumulator => Vec::new(),
        Mode::Immediate => vec![PcToW, IncPc],
        Mode::Relative => vec![PcToW, IncPc, YieldRead, LoadV],
        Mode::ZeroPage => PARAM_ZP_TO_W.to_vec(),
        Mode::ZeroPageX => zero_page_indexed(FromX),
        Mode::ZeroPageY => zero_page_indexed(FromY),
        Mode::Absolute => ABSOLUTE.to_vec(),
        Mode::AbsoluteX => indexed(ABSOLUTE, FromX, timing),
        Mode::AbsoluteY => indexed(ABSOLUTE, FromY, timing),
        Mode::Indirect => {
            let mut steps = ABSOLUTE.to_vec();
            steps.extend_from_slice(&[
                YieldRead,
                LoadV,
                VToV2,
                IncWSamePage,
                YieldRead,
                LoadV,
                VToV2Hi,
                V2ToW,
            ]);
            steps
        }
        Mode::IndexedIndirectX => {
            let mut steps = zero_page_indexed(FromX);
            steps.extend_from_slice(ZP_POINTER);
            steps
        }
        Mode::IndirectIndexedY => {
            let mut pointer = PARAM_ZP_TO_W.to_vec();
            pointer.extend_from_slice(ZP_POINTER);
            indexed(&pointer, FromY, timing)
        }
    }
}

/// Zero-page base plus index, wrapping inside page zero. The base is read
/// once and discarded while the index is added.
fn zero_page_indexed(index: MicroOp) -> Vec<MicroOp> {
    let mut steps = PARAM_ZP_TO_W.to_vec();
    steps.extend_from_slice(READ);
    steps.extend_from_slice(&[index, AddVWLo]);
    steps
}

fn indexed(base: &[MicroOp], index: MicroOp, timing: Timing) -> Vec<MicroOp> {
    let mut steps = base.to_vec();
    steps.extend_from_slice(&[index, AddVW]);
    if timing == Timing::Slow {
        steps.push(ForcePenalty);
    }
    steps.push(AddWCarry);
    steps
}
