//! Fuzz target: arbitrary text through parse, resolve and emit.
//! Every stage must return Ok or Err, never panic.
//! Build with: cargo fuzz run generate_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let s = match std::str::from_utf8(data) {
        Ok(x) => x,
        Err(_) => return,
    };
    let _ = packetgen::generate(s, &packetgen::GenerateOptions::default());
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run generate_fuzz");
}
