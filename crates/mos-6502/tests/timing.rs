//! Cycle counts and bus traces.

use emu_core::SimpleBus;
use mos_6502::{flags, instruction, instructions, BusTransaction, Mode, Status, System};

/// Documented cycle counts: (opcode, cycles, extra cycle on page cross).
/// Branches are listed untaken; taking one costs one more cycle and a page
/// cross another.
#[rustfmt::skip]
const CYCLE_TABLE: &[(u8, u32, bool)] = &[
    // ORA, AND, EOR, ADC, LDA, CMP, SBC
    (0x09, 2, false), (0x05, 3, false), (0x15, 4, false), (0x0D, 4, false),
    (0x1D, 4, true), (0x19, 4, true), (0x01, 6, false), (0x11, 5, true),
    (0x29, 2, false), (0x25, 3, false), (0x35, 4, false), (0x2D, 4, false),
    (0x3D, 4, true), (0x39, 4, true), (0x21, 6, false), (0x31, 5, true),
    (0x49, 2, false), (0x45, 3, false), (0x55, 4, false), (0x4D, 4, false),
    (0x5D, 4, true), (0x59, 4, true), (0x41, 6, false), (0x51, 5, true),
    (0x69, 2, false), (0x65, 3, false), (0x75, 4, false), (0x6D, 4, false),
    (0x7D, 4, true), (0x79, 4, true), (0x61, 6, false), (0x71, 5, true),
    (0xA9, 2, false), (0xA5, 3, false), (0xB5, 4, false), (0xAD, 4, false),
    (0xBD, 4, true), (0xB9, 4, true), (0xA1, 6, false), (0xB1, 5, true),
    (0xC9, 2, false), (0xC5, 3, false), (0xD5, 4, false), (0xCD, 4, false),
    (0xDD, 4, true), (0xD9, 4, true), (0xC1, 6, false), (0xD1, 5, true),
    (0xE9, 2, false), (0xE5, 3, false), (0xF5, 4, false), (0xED, 4, false),
    (0xFD, 4, true), (0xF9, 4, true), (0xE1, 6, false), (0xF1, 5, true),
    // LDX, LDY, CPX, CPY, BIT
    (0xA2, 2, false), (0xA6, 3, false), (0xB6, 4, false), (0xAE, 4, false), (0xBE, 4, true),
    (0xA0, 2, false), (0xA4, 3, false), (0xB4, 4, false), (0xAC, 4, false), (0xBC, 4, true),
    (0xE0, 2, false), (0xE4, 3, false), (0xEC, 4, false),
    (0xC0, 2, false), (0xC4, 3, false), (0xCC, 4, false),
    (0x24, 3, false), (0x2C, 4, false),
    // Stores
    (0x85, 3, false), (0x95, 4, false), (0x8D, 4, false), (0x9D, 5, false),
    (0x99, 5, false), (0x81, 6, false), (0x91, 6, false),
    (0x86, 3, false), (0x96, 4, false), (0x8E, 4, false),
    (0x84, 3, false), (0x94, 4, false), (0x8C, 4, false),
    // Shifts and memory increments
    (0x0A, 2, false), (0x06, 5, false), (0x16, 6, false), (0x0E, 6, false), (0x1E, 7, false),
    (0x2A, 2, false), (0x26, 5, false), (0x36, 6, false), (0x2E, 6, false), (0x3E, 7, false),
    (0x4A, 2, false), (0x46, 5, false), (0x56, 6, false), (0x4E, 6, false), (0x5E, 7, false),
    (0x6A, 2, false), (0x66, 5, false), (0x76, 6, false), (0x6E, 6, false), (0x7E, 7, false),
    (0xC6, 5, false), (0xD6, 6, false), (0xCE, 6, false), (0xDE, 7, false),
    (0xE6, 5, false), (0xF6, 6, false), (0xEE, 6, false), (0xFE, 7, false),
    // Implied
    (0xAA, 2, false), (0xA8, 2, false), (0x8A, 2, false), (0x98, 2, false),
    (0xBA, 2, false), (0x9A, 2, false), (0xE8, 2, false), (0xC8, 2, false),
    (0xCA, 2, false), (0x88, 2, false), (0x18, 2, false), (0x38, 2, false),
    (0x58, 2, false), (0x78, 2, false), (0xB8, 2, false), (0xD8, 2, false),
    (0xF8, 2, false), (0xEA, 2, false),
    // Stack and flow control
    (0x48, 3, false), (0x08, 3, false), (0x68, 4, false), (0x28, 4, false),
    (0x4C, 3, false), (0x6C, 5, false), (0x20, 6, false), (0x60, 6, false),
    (0x40, 6, false), (0x00, 7, false),
    // Branches
    (0x10, 2, false), (0x30, 2, false), (0x50, 2, false), (0x70, 2, false),
    (0x90, 2, false), (0xB0, 2, false), (0xD0, 2, false), (0xF0, 2, false),
];

fn system(program: &[u8]) -> System<SimpleBus> {
    let mut memory = SimpleBus::new();
    memory.load(0x0200, program);
    System::with_pc(memory, 0x0200)
}

/// Clock one instruction, returning every transaction as serviced.
fn trace(sys: &mut System<SimpleBus>) -> Vec<BusTransaction> {
    let mut seen = Vec::new();
    loop {
        sys.bus.service(&mut sys.memory);
        seen.push(sys.bus);
        sys.cpu.cycle(&mut sys.bus).expect("documented opcode");
        if sys.cpu.is_instruction_complete() {
            return seen;
        }
    }
}

#[test]
fn table_covers_every_documented_opcode() {
    assert_eq!(CYCLE_TABLE.len(), 151);
    for &(opcode, _, _) in CYCLE_TABLE {
        assert!(instruction(opcode).is_some(), "${opcode:02X} missing");
    }
}

#[test]
fn cycle_bounds_match_documented_counts() {
    for &(opcode, cycles, page_penalty) in CYCLE_TABLE {
        let instr = instruction(opcode).unwrap();
        let max = if instr.mode == Mode::Relative {
            cycles + 2
        } else {
            cycles + u32::from(page_penalty)
        };
        assert_eq!(instr.min_cycles(), cycles, "${opcode:02X} {} min", instr.mnemonic);
        assert_eq!(instr.max_cycles(), max, "${opcode:02X} {} max", instr.mnemonic);
    }
}

#[test]
fn every_opcode_runs_in_its_minimum_without_page_cross() {
    // Zeroed memory and registers: every operand and pointer is $00, so
    // nothing crosses a page.
    for (opcode, instr) in instructions() {
        let mut sys = system(&[opcode]);
        let cycles = sys.step_instruction().unwrap();

        if instr.mode == Mode::Relative {
            // Zero offset: taken branches stay on the page
            assert!(
                (instr.min_cycles()..=instr.min_cycles() + 1).contains(&cycles),
                "${opcode:02X} {} took {cycles}",
                instr.mnemonic
            );
        } else {
            assert_eq!(cycles, instr.min_cycles(), "${opcode:02X} {}", instr.mnemonic);
        }
    }
}

#[test]
fn absolute_indexed_read_pays_only_on_page_cross() {
    // LDA $10FF,X
    for (x, cycles) in [(0x00, 4), (0x01, 5), (0xFF, 5)] {
        let mut sys = system(&[0xBD, 0xFF, 0x10]);
        sys.cpu.regs.x = x;
        assert_eq!(sys.step_instruction(), Ok(cycles), "X=${x:02X}");
    }

    // LDA $1000,X never crosses
    for x in [0x00, 0x01, 0xFF] {
        let mut sys = system(&[0xBD, 0x00, 0x10]);
        sys.cpu.regs.x = x;
        assert_eq!(sys.step_instruction(), Ok(4), "X=${x:02X}");
    }
}

#[test]
fn absolute_indexed_write_always_pays() {
    // STA $1000,X and STA $10FF,X
    for base in [0x00, 0xFF] {
        for x in [0x00, 0x01, 0x80, 0xFF] {
            let mut sys = system(&[0x9D, base, 0x10]);
            sys.cpu.regs.x = x;
            assert_eq!(sys.step_instruction(), Ok(5), "base ${base:02X} X=${x:02X}");
        }
    }
}

#[test]
fn indirect_indexed_read_pays_only_on_page_cross() {
    // LDA ($80),Y with pointer $20F0
    for (y, cycles) in [(0x0F, 5), (0x10, 6)] {
        let mut sys = system(&[0xB1, 0x80]);
        sys.memory.load(0x0080, &[0xF0, 0x20]);
        sys.cpu.regs.y = y;
        assert_eq!(sys.step_instruction(), Ok(cycles), "Y=${y:02X}");
    }
}

#[test]
fn page_cross_reads_uncorrected_address_first() {
    // LDA $10FF,X with X=1: dummy read at $1000, real read at $1100
    let mut sys = system(&[0xBD, 0xFF, 0x10]);
    sys.memory.load(0x1000, &[0x11]);
    sys.memory.load(0x1100, &[0x22]);
    sys.cpu.regs.x = 0x01;

    let addresses: Vec<u16> = trace(&mut sys).iter().map(|t| t.address).collect();
    assert_eq!(addresses, vec![0x0200, 0x0201, 0x0202, 0x1000, 0x1100]);
    assert_eq!(sys.cpu.regs.a, 0x22);
}

#[test]
fn indexed_store_dummy_reads_before_writing() {
    // STA $1000,X with X=1: read $1001, then write it
    let mut sys = system(&[0x9D, 0x00, 0x10]);
    sys.cpu.regs.a = 0x5A;
    sys.cpu.regs.x = 0x01;

    let seen = trace(&mut sys);
    let last_two: Vec<(u16, bool)> = seen[3..].iter().map(|t| (t.address, t.is_write)).collect();
    assert_eq!(last_two, vec![(0x1001, false), (0x1001, true)]);
    assert_eq!(seen[4].data, 0x5A);
}

#[test]
fn branch_timing() {
    // BNE +$10 from $0202: taken, same page
    let mut sys = system(&[0xD0, 0x10]);
    assert_eq!(sys.step_instruction(), Ok(3));
    assert_eq!(sys.cpu.pc(), 0x0212);

    // Not taken
    let mut sys = system(&[0xD0, 0x10]);
    sys.cpu.regs.p = Status(flags::Z);
    assert_eq!(sys.step_instruction(), Ok(2));
    assert_eq!(sys.cpu.pc(), 0x0202);

    // Backward across a page: $0202 - $10 = $01F2
    let mut sys = system(&[0xD0, 0xF0]);
    let addresses: Vec<u16> = trace(&mut sys).iter().map(|t| t.address).collect();
    assert_eq!(addresses, vec![0x0200, 0x0201, 0x0202, 0x02F2]);
    assert_eq!(sys.cpu.pc(), 0x01F2);
    assert_eq!(sys.bus.address, 0x01F2, "next fetch at the target");
}

#[test]
fn nop_is_idempotent() {
    let mut sys = system(&[0xEA; 64]);
    sys.cpu.regs.a = 0x12;
    sys.cpu.regs.x = 0x34;
    sys.cpu.regs.s = 0xFD;
    let regs = sys.cpu.regs;

    for n in 0..64_u16 {
        let pc = 0x0200 + n;
        let seen = trace(&mut sys);
        let expected = vec![(pc, false), (pc + 1, false)];
        let got: Vec<(u16, bool)> = seen.iter().map(|t| (t.address, t.is_write)).collect();
        assert_eq!(got, expected, "NOP #{n}");
        assert_eq!(sys.cpu.pc(), pc + 1);
    }

    assert_eq!(sys.cpu.regs.a, regs.a);
    assert_eq!(sys.cpu.regs.x, regs.x);
    assert_eq!(sys.cpu.regs.y, regs.y);
    assert_eq!(sys.cpu.regs.s, regs.s);
    assert_eq!(sys.cpu.regs.p, regs.p);
}

#[test]
fn load_flags_for_every_value() {
    for value in 0..=0xFF_u8 {
        // LDA #v; LDX #v; LDY #v
        let mut sys = system(&[0xA9, value, 0xA2, value, 0xA0, value]);
        for _ in 0..3 {
            sys.step_instruction().unwrap();
            assert_eq!(sys.cpu.regs.p.is_set(flags::Z), value == 0, "Z for {value:#04X}");
            assert_eq!(
                sys.cpu.regs.p.is_set(flags::N),
                value & 0x80 != 0,
                "N for {value:#04X}"
            );
        }
        assert_eq!((sys.cpu.regs.a, sys.cpu.regs.x, sys.cpu.regs.y), (value, value, value));
    }
}

#[test]
fn compare_carry_is_unsigned_greater_or_equal() {
    for reference in (0..=0xFF_u8).step_by(3) {
        for operand in (0..=0xFF_u8).step_by(5) {
            // CPX #operand
            let mut sys = system(&[0xE0, operand]);
            sys.cpu.regs.x = reference;
            sys.step_instruction().unwrap();
            assert_eq!(
                sys.cpu.regs.p.is_set(flags::C),
                reference >= operand,
                "X={reference:#04X} operand={operand:#04X}"
            );
            assert_eq!(sys.cpu.regs.p.is_set(flags::Z), reference == operand);
            assert_eq!(sys.cpu.regs.x, reference);
        }
    }
}
