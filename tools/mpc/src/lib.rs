//! Core library for `mpc`, the package-repository builder.
//!
//! The pipeline runs leaves first: digest and path primitives, a staging-directory
//! reader, the package table, a repository reader, the dependency categorizer, the
//! archive reconciler, the database writer, the TDS builder, and the disassembler. Each
//! stage is its own module with its own `snafu`-derived `Error` enum; this crate's
//! top-level `Error` wraps each of them for `mpc::cli::run`.

pub mod archive;
pub mod archiveio;
pub mod categorize;
pub mod cli;
pub mod database;
pub mod digest;
pub mod disassemble;
pub mod error;
pub mod inifile;
pub mod package;
pub mod packagelist;
pub mod path;
pub mod repo;
pub mod signing;
pub mod staging;
pub mod tds;

pub use error::{Error, Result};

/// Build-time ceiling on `--miktex-series`; requests above this are a `ConfigurationError`.
pub const MAX_MIKTEX_SERIES: (u32, u32) = (2, 9);
