//! # cpgrag CLI
//!
//! Command-line interface for graph-augmented code question answering.
//!
//! Run `cpgrag --help` for usage information.

mod cli;
pub mod ui;

use std::process::ExitCode;

fn main() -> ExitCode {
    cli::run()
}
