//! # cred-cli: CLI Tool for Credential Distribution
//!
//! Provides the `cred` command-line interface.
//!
//! ## Subcommands
//!
//! - `cred tree`: Offline tree building, proof extraction, verification.
//! - `cred campaign`: Campaign administration against a local store.
//!
//! ```bash
//! cred tree build --input holders.csv
//! cred tree prove --input holders.csv --address 0x2222...
//! cred campaign create --title "Workshop" --contract 0xc0de... --input holders.csv
//! ```

pub mod campaign;
pub mod tree;

use std::path::Path;

use anyhow::{Context, Result};

/// Extract addresses from address-list text.
///
/// One address per line. Blank lines and lines starting with `#` are
/// skipped, and only the first comma-separated field is taken, so CSV
/// exports with an address column first can be used directly. A header
/// row must be commented out; it is not guessed at.
pub fn parse_address_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.split(',').next().unwrap_or(line).trim().to_string())
        .collect()
}

/// Read and parse an address-list file.
pub fn read_address_file(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read address list {}", path.display()))?;
    Ok(parse_address_lines(&text))
}
