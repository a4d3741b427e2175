//! Opcode table.
//!
//! Built once on first use. Each entry pairs an addressing-mode sequence
//! from [`crate::addressing`] with an operation tail. Sequences for the
//! implied-mode, stack and flow-control instructions are written out in
//! full because their dummy cycles differ per instruction.

use std::sync::LazyLock;

use crate::addressing::{compose, Mode, Timing, DUMMY_CYCLE, DUMMY_SP, READ};
use crate::flags::{C, D, I, N, V, Z};
use crate::micro_op::MicroOp::{
    self, Adc, And, Asl, Bit, BranchCommit, BranchFixup, BranchIf, BranchOffset, ClearFlag,
    Compare, Dec, Eor, FromA, FromPcHi, FromPcLo, FromSp, FromStatus, FromStatusIrq, FromX,
    FromY, Inc, IncPc, IncW, LoadV, Lsr, Ora, PcToW, PullAddress, PushAddress, Rol, Ror, Sbc,
    SetFlag, ToA, ToPcHi, ToPcLo, ToSp, ToStatus, ToX, ToY, UpdateNz, V2ToW, VToV2, VToV2Hi,
    Vector, WToPc, Write, YieldRead,
};
use crate::micro_op::Register;

const PUSH: &[MicroOp] = &[PushAddress, Write];
const PULL: &[MicroOp] = &[PullAddress, YieldRead, LoadV];

/// Load the word at `w` into PC, low byte first.
const LOAD_VECTOR: &[MicroOp] = &[YieldRead, LoadV, ToPcLo, IncW, YieldRead, LoadV, ToPcHi];

/// Decoded form of one opcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub mnemonic: &'static str,
    pub mode: Mode,
    pub steps: Vec<MicroOp>,
}

impl Instruction {
    /// Fewest clock cycles the instruction can take, opcode fetch included.
    #[must_use]
    pub fn min_cycles(&self) -> u32 {
        match self.steps.iter().position(|op| matches!(op, BranchIf { .. })) {
            Some(at) => 1 + count_yields(&self.steps[..at]),
            None => self.unconditional_cycles(),
        }
    }

    /// Most clock cycles the instruction can take, opcode fetch included.
    #[must_use]
    pub fn max_cycles(&self) -> u32 {
        let page_cross = self.steps.contains(&MicroOp::AddVW)
            && !self.steps.contains(&MicroOp::ForcePenalty);
        self.unconditional_cycles() + u32::from(page_cross)
    }

    fn unconditional_cycles(&self) -> u32 {
        1 + count_yields(&self.steps) + u32::from(self.steps.contains(&MicroOp::ForcePenalty))
    }
}

fn count_yields(steps: &[MicroOp]) -> u32 {
    steps.iter().filter(|op| op.always_yields()).count() as u32
}

/// Non-instruction sequences entered through the same scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    Reset,
    Nmi,
    Irq,
}

impl Interrupt {
    #[must_use]
    pub fn sequence(self) -> &'static [MicroOp] {
        match self {
            Self::Reset => &RESET,
            Self::Nmi => &NMI,
            Self::Irq => &IRQ,
        }
    }
}

/// Look up the table entry for `opcode`.
#[must_use]
pub fn instruction(opcode: u8) -> Option<&'static Instruction> {
    TABLE[usize::from(opcode)].as_ref()
}

/// Every populated table entry, in opcode order.
pub fn instructions() -> impl Iterator<Item = (u8, &'static Instruction)> {
    (0..=0xFF_u8).filter_map(|opcode| instruction(opcode).map(|instr| (opcode, instr)))
}

static TABLE: LazyLock<[Option<Instruction>; 256]> = LazyLock::new(build_table);

static RESET: LazyLock<Vec<MicroOp>> = LazyLock::new(|| {
    // Three stack reads walk S down without writing
    let mut steps = concat(&[DUMMY_CYCLE, DUMMY_CYCLE]);
    for _ in 0..3 {
        steps.extend_from_slice(&[PushAddress, YieldRead, LoadV]);
    }
    steps.extend_from_slice(&[SetFlag(I), Vector(0xFFFC)]);
    steps.extend_from_slice(LOAD_VECTOR);
    steps
});

static NMI: LazyLock<Vec<MicroOp>> = LazyLock::new(|| hardware_interrupt(0xFFFA));
static IRQ: LazyLock<Vec<MicroOp>> = LazyLock::new(|| hardware_interrupt(0xFFFE));

/// IRQ and NMI entry. Same shape as BRK, except PC is not advanced past a
/// signature byte and the pushed status has B clear.
fn hardware_interrupt(vector: u16) -> Vec<MicroOp> {
    concat(&[
        &[PcToW, YieldRead, LoadV, FromPcHi],
        PUSH,
        &[FromPcLo],
        PUSH,
        &[FromStatusIrq],
        PUSH,
        &[SetFlag(I), Vector(vector)],
        LOAD_VECTOR,
    ])
}

fn concat(parts: &[&[MicroOp]]) -> Vec<MicroOp> {
    parts.concat()
}

struct Builder {
    table: [Option<Instruction>; 256],
}

impl Builder {
    fn insert(&mut self, opcode: u8, mnemonic: &'static str, mode: Mode, steps: Vec<MicroOp>) {
        debug_assert!(
            self.table[usize::from(opcode)].is_none(),
            "opcode ${opcode:02X} defined twice"
        );
        self.table[usize::from(opcode)] = Some(Instruction {
            mnemonic,
            mode,
            steps,
        });
    }

    /// Addressing sequence followed by an operation tail.
    fn addressed(
        &mut self,
        opcode: u8,
        mnemonic: &'static str,
        mode: Mode,
        timing: Timing,
        tail: &[MicroOp],
    ) {
        let mut steps = compose(mode, timing);
        steps.extend_from_slice(tail);
        self.insert(opcode, mnemonic, mode, steps);
    }

    /// A single-byte instruction: work, then a dummy read of the next byte.
    fn implied(&mut self, opcode: u8, mnemonic: &'static str, work: &[MicroOp]) {
        self.insert(opcode, mnemonic, Mode::Implied, concat(&[work, DUMMY_CYCLE]));
    }

    fn accumulator(&mut self, opcode: u8, mnemonic: &'static str, op: MicroOp) {
        self.insert(
            opcode,
            mnemonic,
            Mode::Accumulator,
            concat(&[&[FromA, op, ToA], DUMMY_CYCLE]),
        );
    }

    fn branch(&mut self, opcode: u8, mnemonic: &'static str, flag: u8, set: bool) {
        self.addressed(
            opcode,
            mnemonic,
            Mode::Relative,
            Timing::Fast,
            &[
                BranchIf { flag, set },
                PcToW,
                YieldRead,
                BranchOffset,
                BranchFixup,
                PcToW,
                YieldRead,
                BranchCommit,
            ],
        );
    }
}

/// Modes of the accumulator group, in the order their opcodes are listed.
const GROUP_ONE_MODES: [Mode; 8] = [
    Mode::Immediate,
    Mode::ZeroPage,
    Mode::ZeroPageX,
    Mode::Absolute,
    Mode::AbsoluteX,
    Mode::AbsoluteY,
    Mode::IndexedIndirectX,
    Mode::IndirectIndexedY,
];

const SHIFT_MODES: [Mode; 4] = [Mode::ZeroPage, Mode::ZeroPageX, Mode::Absolute, Mode::AbsoluteX];

fn build_table() -> [Option<Instruction>; 256] {
    let mut b = Builder {
        table: std::array::from_fn(|_| None),
    };

    // Reads: LDA, ORA, AND, EOR, ADC, SBC, CMP
    let alu: [(&'static str, [u8; 8], &[MicroOp]); 7] = [
        ("ORA", [0x09, 0x05, 0x15, 0x0D, 0x1D, 0x19, 0x01, 0x11], &[Ora, UpdateNz, ToA]),
        ("AND", [0x29, 0x25, 0x35, 0x2D, 0x3D, 0x39, 0x21, 0x31], &[And, UpdateNz, ToA]),
        ("EOR", [0x49, 0x45, 0x55, 0x4D, 0x5D, 0x59, 0x41, 0x51], &[Eor, UpdateNz, ToA]),
        ("ADC", [0x69, 0x65, 0x75, 0x6D, 0x7D, 0x79, 0x61, 0x71], &[Adc]),
        ("LDA", [0xA9, 0xA5, 0xB5, 0xAD, 0xBD, 0xB9, 0xA1, 0xB1], &[UpdateNz, ToA]),
        ("CMP", [0xC9, 0xC5, 0xD5, 0xCD, 0xDD, 0xD9, 0xC1, 0xD1], &[Compare(Register::A)]),
        ("SBC", [0xE9, 0xE5, 0xF5, 0xED, 0xFD, 0xF9, 0xE1, 0xF1], &[Sbc]),
    ];
    for (mnemonic, opcodes, op) in alu {
        let tail = concat(&[READ, op]);
        for (opcode, mode) in opcodes.into_iter().zip(GROUP_ONE_MODES) {
            b.addressed(opcode, mnemonic, mode, Timing::Fast, &tail);
        }
    }

    let ldx = concat(&[READ, &[UpdateNz, ToX]]);
    b.addressed(0xA2, "LDX", Mode::Immediate, Timing::Fast, &ldx);
    b.addressed(0xA6, "LDX", Mode::ZeroPage, Timing::Fast, &ldx);
    b.addressed(0xB6, "LDX", Mode::ZeroPageY, Timing::Fast, &ldx);
    b.addressed(0xAE, "LDX", Mode::Absolute, Timing::Fast, &ldx);
    b.addressed(0xBE, "LDX", Mode::AbsoluteY, Timing::Fast, &ldx);

    let ldy = concat(&[READ, &[UpdateNz, ToY]]);
    b.addressed(0xA0, "LDY", Mode::Immediate, Timing::Fast, &ldy);
    b.addressed(0xA4, "LDY", Mode::ZeroPage, Timing::Fast, &ldy);
    b.addressed(0xB4, "LDY", Mode::ZeroPageX, Timing::Fast, &ldy);
    b.addressed(0xAC, "LDY", Mode::Absolute, Timing::Fast, &ldy);
    b.addressed(0xBC, "LDY", Mode::AbsoluteX, Timing::Fast, &ldy);

    let cpx = concat(&[READ, &[Compare(Register::X)]]);
    b.addressed(0xE0, "CPX", Mode::Immediate, Timing::Fast, &cpx);
    b.addressed(0xE4, "CPX", Mode::ZeroPage, Timing::Fast, &cpx);
    b.addressed(0xEC, "CPX", Mode::Absolute, Timing::Fast, &cpx);

    let cpy = concat(&[READ, &[Compare(Register::Y)]]);
    b.addressed(0xC0, "CPY", Mode::Immediate, Timing::Fast, &cpy);
    b.addressed(0xC4, "CPY", Mode::ZeroPage, Timing::Fast, &cpy);
    b.addressed(0xCC, "CPY", Mode::Absolute, Timing::Fast, &cpy);

    let bit = concat(&[READ, &[Bit]]);
    b.addressed(0x24, "BIT", Mode::ZeroPage, Timing::Fast, &bit);
    b.addressed(0x2C, "BIT", Mode::Absolute, Timing::Fast, &bit);

    // Stores: indexed forms always spend the fixup cycle
    let sta: &[MicroOp] = &[FromA, Write];
    b.addressed(0x85, "STA", Mode::ZeroPage, Timing::Slow, sta);
    b.addressed(0x95, "STA", Mode::ZeroPageX, Timing::Slow, sta);
    b.addressed(0x8D, "STA", Mode::Absolute, Timing::Slow, sta);
    b.addressed(0x9D, "STA", Mode::AbsoluteX, Timing::Slow, sta);
    b.addressed(0x99, "STA", Mode::AbsoluteY, Timing::Slow, sta);
    b.addressed(0x81, "STA", Mode::IndexedIndirectX, Timing::Slow, sta);
    b.addressed(0x91, "STA", Mode::IndirectIndexedY, Timing::Slow, sta);

    let stx: &[MicroOp] = &[FromX, Write];
    b.addressed(0x86, "STX", Mode::ZeroPage, Timing::Slow, stx);
    b.addressed(0x96, "STX", Mode::ZeroPageY, Timing::Slow, stx);
    b.addressed(0x8E, "STX", Mode::Absolute, Timing::Slow, stx);

    let sty: &[MicroOp] = &[FromY, Write];
    b.addressed(0x84, "STY", Mode::ZeroPage, Timing::Slow, sty);
    b.addressed(0x94, "STY", Mode::ZeroPageX, Timing::Slow, sty);
    b.addressed(0x8C, "STY", Mode::Absolute, Timing::Slow, sty);

    // Read-modify-write: the unmodified byte is written back first
    let rmw: [(&'static str, Option<u8>, [u8; 4], &[MicroOp]); 6] = [
        ("ASL", Some(0x0A), [0x06, 0x16, 0x0E, 0x1E], &[Asl]),
        ("ROL", Some(0x2A), [0x26, 0x36, 0x2E, 0x3E], &[Rol]),
        ("LSR", Some(0x4A), [0x46, 0x56, 0x4E, 0x5E], &[Lsr]),
        ("ROR", Some(0x6A), [0x66, 0x76, 0x6E, 0x7E], &[Ror]),
        ("DEC", None, [0xC6, 0xD6, 0xCE, 0xDE], &[Dec, UpdateNz]),
        ("INC", None, [0xE6, 0xF6, 0xEE, 0xFE], &[Inc, UpdateNz]),
    ];
    for (mnemonic, accumulator, opcodes, op) in rmw {
        if let Some(opcode) = accumulator {
            b.accumulator(opcode, mnemonic, op[0]);
        }
        let tail = concat(&[&[YieldRead, LoadV, Write], op, &[Write]]);
        for (opcode, mode) in opcodes.into_iter().zip(SHIFT_MODES) {
            b.addressed(opcode, mnemonic, mode, Timing::Slow, &tail);
        }
    }

    // Register transfers and index arithmetic
    b.implied(0xAA, "TAX", &[FromA, UpdateNz, ToX]);
    b.implied(0xA8, "TAY", &[FromA, UpdateNz, ToY]);
    b.implied(0x8A, "TXA", &[FromX, UpdateNz, ToA]);
    b.implied(0x98, "TYA", &[FromY, UpdateNz, ToA]);
    b.implied(0xBA, "TSX", &[FromSp, UpdateNz, ToX]);
    b.implied(0x9A, "TXS", &[FromX, ToSp]);
    b.implied(0xE8, "INX", &[FromX, Inc, UpdateNz, ToX]);
    b.implied(0xC8, "INY", &[FromY, Inc, UpdateNz, ToY]);
    b.implied(0xCA, "DEX", &[FromX, Dec, UpdateNz, ToX]);
    b.implied(0x88, "DEY", &[FromY, Dec, UpdateNz, ToY]);

    b.implied(0x18, "CLC", &[ClearFlag(C)]);
    b.implied(0x38, "SEC", &[SetFlag(C)]);
    b.implied(0x58, "CLI", &[ClearFlag(I)]);
    b.implied(0x78, "SEI", &[SetFlag(I)]);
    b.implied(0xB8, "CLV", &[ClearFlag(V)]);
    b.implied(0xD8, "CLD", &[ClearFlag(D)]);
    b.implied(0xF8, "SED", &[SetFlag(D)]);
    b.implied(0xEA, "NOP", &[]);

    // Stack
    b.insert(0x48, "PHA", Mode::Implied, concat(&[DUMMY_CYCLE, &[FromA], PUSH]));
    b.insert(0x08, "PHP", Mode::Implied, concat(&[DUMMY_CYCLE, &[FromStatus], PUSH]));
    b.insert(
        0x68,
        "PLA",
        Mode::Implied,
        concat(&[DUMMY_CYCLE, DUMMY_SP, PULL, &[UpdateNz, ToA]]),
    );
    b.insert(
        0x28,
        "PLP",
        Mode::Implied,
        concat(&[DUMMY_CYCLE, DUMMY_SP, PULL, &[ToStatus]]),
    );

    // Flow control
    b.addressed(0x4C, "JMP", Mode::Absolute, Timing::Fast, &[WToPc]);
    b.addressed(0x6C, "JMP", Mode::Indirect, Timing::Fast, &[WToPc]);

    // JSR pushes the address of its own last byte, then fetches it
    b.insert(
        0x20,
        "JSR",
        Mode::Absolute,
        concat(&[
            &[PcToW, IncPc, YieldRead, LoadV, VToV2],
            DUMMY_SP,
            &[FromPcHi],
            PUSH,
            &[FromPcLo],
            PUSH,
            &[PcToW, IncPc, YieldRead, LoadV, VToV2Hi, V2ToW, WToPc],
        ]),
    );
    b.insert(
        0x60,
        "RTS",
        Mode::Implied,
        concat(&[
            DUMMY_CYCLE,
            DUMMY_SP,
            PULL,
            &[ToPcLo],
            PULL,
            &[ToPcHi],
            DUMMY_CYCLE,
            &[IncPc],
        ]),
    );
    b.insert(
        0x40,
        "RTI",
        Mode::Implied,
        concat(&[DUMMY_CYCLE, DUMMY_SP, PULL, &[ToStatus], PULL, &[ToPcLo], PULL, &[ToPcHi]]),
    );
    // BRK skips a signature byte
    b.insert(
        0x00,
        "BRK",
        Mode::Implied,
        concat(&[
            &[PcToW, IncPc, YieldRead, LoadV, FromPcHi],
            PUSH,
            &[FromPcLo],
            PUSH,
            &[FromStatus],
            PUSH,
            &[SetFlag(I), Vector(0xFFFE)],
            LOAD_VECTOR,
        ]),
    );

    b.branch(0x10, "BPL", N, false);
    b.branch(0x30, "BMI", N, true);
    b.branch(0x50, "BVC", V, false);
    b.branch(0x70, "BVS", V, true);
    b.branch(0x90, "BCC", C, false);
    b.branch(0xB0, "BCS", C, true);
    b.branch(0xD0, "BNE", Z, false);
    b.branch(0xF0, "BEQ", Z, true);

    b.table
}
