//! Generate Rust packet code from a declaration file.
//!
//! Usage:
//!   packetgen --src <FILE> --dest <FILE> [--runtime <PATH>]
//!
//! Options:
//!   --src, -s      Declaration file to read
//!   --dest, -d     Rust file to write
//!   --runtime, -r  Module path generated code imports the stream traits from
//!                  (default: packetgen::stream)
//!
//! Logging goes to stderr; set RUST_LOG (e.g. RUST_LOG=debug) to change the level.

use anyhow::{bail, Context};
use packetgen::{generate_file, GenerateOptions};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: packetgen --src <FILE> --dest <FILE> [--runtime <PATH>]";

struct Args {
    src: PathBuf,
    dest: PathBuf,
    runtime: Option<String>,
}

fn take_value(args: &mut Vec<String>, names: &[&str]) -> anyhow::Result<Option<String>> {
    let Some(pos) = args.iter().position(|a| names.contains(&a.as_str())) else {
        return Ok(None);
    };
    args.remove(pos);
    if pos >= args.len() {
        bail!("{} requires a value\n{}", names[0], USAGE);
    }
    Ok(Some(args.remove(pos)))
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("{}", USAGE);
        std::process::exit(0);
    }
    let src = take_value(&mut args, &["--src", "-s"])?;
    let dest = take_value(&mut args, &["--dest", "-d"])?;
    let runtime = take_value(&mut args, &["--runtime", "-r"])?;
    if let Some(unknown) = args.first() {
        bail!("unexpected argument `{}`\n{}", unknown, USAGE);
    }
    match (src, dest) {
        (Some(src), Some(dest)) => Ok(Args {
            src: src.into(),
            dest: dest.into(),
            runtime,
        }),
        _ => bail!("{}", USAGE),
    }
}

fn run() -> anyhow::Result<()> {
    let args = parse_args()?;
    let mut options = GenerateOptions::default();
    if let Some(runtime) = args.runtime {
        options.runtime_path = runtime;
    }
    generate_file(&args.src, &args.dest, &options).with_context(|| {
        format!(
            "generating {} from {}",
            args.dest.display(),
            args.src.display()
        )
    })
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
    println!("Complete!");
}
