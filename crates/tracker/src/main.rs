#![doc = include_str!("../README.md")]

/// CLI module - command-line interface for tracker
mod cli;

fn main() {
    cli::run_cli();
}
