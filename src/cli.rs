use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "Consolidate and QC drilling-run extracts", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Merge the configured source extracts into one canonical table
    Merge(MergeArgs),
    /// Validate a merged table against the QC criteria and flag dirty rows
    Qc(QcArgs),
    /// List the canonical schema and per-source column mappings
    Columns(ColumnsArgs),
}

#[derive(Debug, Args)]
pub struct MergeArgs {
    /// Merge configuration file (YAML)
    #[arg(short = 'c', long = "config")]
    pub config: PathBuf,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// CSV delimiter character for inputs (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// CSV delimiter character for the output
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct QcArgs {
    /// Merged CSV table to validate
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// QC criteria table (`COLUMN NAME,VALID`)
    #[arg(short = 'r', long = "rules")]
    pub rules: PathBuf,
    /// Phase equivalence table (`PHASES,Phase_CALC`)
    #[arg(short = 'p', long = "phases")]
    pub phases: PathBuf,
    /// Output CSV file with the QC_FLAG column (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Optional JSON side-channel listing each failing (row, column) cell
    #[arg(long = "issues")]
    pub issues: Option<PathBuf>,
    /// CSV delimiter character for inputs (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// CSV delimiter character for the output
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct ColumnsArgs {
    /// Mapping specification CSV
    #[arg(short = 'm', long = "mapping")]
    pub mapping: PathBuf,
    /// Restrict the listing to one source identifier
    #[arg(long = "source")]
    pub source: Option<String>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the mapping file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
