//! Klaus Dormann's 6502 functional test suite runner.
//!
//! Loads a flat binary at $0000, starts at the entry point and clocks until
//! an instruction jumps to itself. The byte at $0200 holds the number of
//! the test in progress; the standard build finishes at test 240.
//!
//! Usage: `dormann [binary] [entry, hex] [expected marker]`
//!
//! Download the test from: https://github.com/Klaus2m5/6502_65C02_functional_tests

use emu_core::{Observable, SimpleBus};
use mos_6502::{Error, System};
use std::fs;
use std::process::ExitCode;

const MARKER: u16 = 0x0200;
const CYCLE_LIMIT: u64 = 200_000_000;

fn main() -> ExitCode {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let test_path = args
        .next()
        .unwrap_or_else(|| "tests/data/6502_functional_test.bin".to_string());
    let entry = match args.next().map(|s| u16::from_str_radix(s.trim_start_matches('$'), 16)) {
        None => 0x0400,
        Some(Ok(addr)) => addr,
        Some(Err(e)) => {
            eprintln!("Bad entry address: {e}");
            return ExitCode::FAILURE;
        }
    };
    let expected_marker = match args.next().map(|s| s.parse::<u8>()) {
        None => 240,
        Some(Ok(marker)) => marker,
        Some(Err(e)) => {
            eprintln!("Bad marker value: {e}");
            return ExitCode::FAILURE;
        }
    };

    let test_data = match fs::read(&test_path) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Failed to load test ROM: {e}");
            eprintln!();
            eprintln!("To run the 6502 functional test:");
            eprintln!("1. Download from: https://github.com/Klaus2m5/6502_65C02_functional_tests");
            eprintln!("2. Assemble 6502_functional_test.a65 with origin at $0000");
            eprintln!("3. Pass the binary path: cargo run -p mos-6502 --bin dormann -- /path/to/test.bin");
            return ExitCode::FAILURE;
        }
    };

    println!("Running 6502 functional test suite...");
    println!("Test binary: {} ({} bytes), entry ${entry:04X}", test_path, test_data.len());
    println!();

    let mut memory = SimpleBus::new();
    memory.load(0x0000, &test_data);
    let mut sys = System::with_pc(memory, entry);

    let start_time = std::time::Instant::now();
    let result = sys.run_until_trap(CYCLE_LIMIT);
    let elapsed = start_time.elapsed();

    let trap = match result {
        Ok(trap) => trap,
        Err(Error::UnknownOpcode { opcode, address }) => {
            println!("Unknown opcode ${opcode:02X} at ${address:04X}");
            println!("Test {} was in progress.", sys.memory.peek(MARKER));
            return ExitCode::FAILURE;
        }
        Err(e) => {
            println!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let marker = sys.memory.peek(MARKER);
    println!("TRAP at PC=${:04X}, test {marker}", trap.pc);
    println!();
    println!("Statistics:");
    println!("  Total cycles: {}", trap.cycles);
    println!("  Time elapsed: {elapsed:?}");
    println!(
        "  Effective speed: {:.2} MHz",
        trap.cycles.get() as f64 / elapsed.as_secs_f64() / 1_000_000.0
    );

    if marker == expected_marker {
        println!("SUCCESS! All tests passed.");
        return ExitCode::SUCCESS;
    }

    println!("Test failed! Expected to finish at test {expected_marker}.");
    println!();
    println!("Context:");
    for path in ["a", "x", "y", "s", "p"] {
        if let Some(value) = sys.cpu.query(path) {
            print!("  {}={value}", path.to_uppercase());
        }
    }
    println!();

    println!();
    println!("Memory around PC:");
    let start = trap.pc.saturating_sub(8);
    for i in 0..16 {
        print!("{:02X} ", sys.memory.peek(start.wrapping_add(i)));
    }
    println!();

    ExitCode::FAILURE
}
