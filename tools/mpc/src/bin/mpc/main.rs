/*!
`mpc` assembles a TeX package repository from staging directories: it builds TDS trees,
reconciles per-package archives, and publishes the MiKTeX package database (`mpm.ini`,
`pr.ini`, and the `.tpm`/`.csv` archives that ship alongside it).
*/

use clap::Parser;
use mpc::cli::Mpc;
use simplelog::{Config as LogConfig, LevelFilter, TermLogger, TerminalMode};
use std::process;

fn main() {
    let args = Mpc::parse();

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    // TerminalMode::Mixed sends errors to stderr and anything less to stdout.
    if let Err(e) = TermLogger::init(
        level,
        LogConfig::default(),
        TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    ) {
        eprintln!("mpc: failed to start logger: {e}");
        process::exit(1);
    }

    if let Err(e) = mpc::cli::run(args) {
        eprintln!("mpc: {e}");
        process::exit(1);
    }
}
