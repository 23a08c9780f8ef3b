//! CLI entry point: reads a Simple C translation unit from stdin, writes
//! x86-64 System V assembly to stdout. `RUST_LOG` controls the internal
//! trace/debug logging `simplec::report` and friends emit; it is purely
//! diagnostic and never changes the exit code or the emitted assembly.

use std::io;
use std::process::ExitCode;

use simplelog::{Config, LevelFilter, SimpleLogger};

fn main() -> ExitCode {
  let level = std::env::var("RUST_LOG").ok()
    .and_then(|v| v.parse::<LevelFilter>().ok())
    .unwrap_or(LevelFilter::Warn);
  let _ = SimpleLogger::init(level, Config::default());

  let stdin = io::stdin();
  let stdout = io::stdout();
  simplec::compile(stdin.lock(), stdout.lock())
}
