use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use netprop_tools::{
    dump_stream, format_stream_pretty, format_tables_pretty, inspect_table_set, load_table_set,
};
use serde::Serialize;

#[derive(Parser)]
#[command(
    name = "netprop-tools",
    version,
    about = "netprop schema and entity stream inspection tools"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the tables of a schema transfer file.
    Tables {
        /// Path to the encoded table set.
        tables_file: PathBuf,
        /// Output format.
        #[arg(long, value_enum, default_value_t = Format::Pretty)]
        format: Format,
    },
    /// Decode an entity property stream into named values.
    Dump {
        /// Path to the encoded entity stream.
        stream_file: PathBuf,
        /// Schema transfer file the stream was encoded against.
        #[arg(long)]
        tables: PathBuf,
        /// Root table of the entity.
        #[arg(long)]
        root: String,
        /// Exact bit length of the stream; defaults to the whole file.
        #[arg(long)]
        bits: Option<usize>,
        /// Longest string to keep, in bytes.
        #[arg(long)]
        max_string_bytes: Option<usize>,
        /// Output format.
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Json,
    Pretty,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Tables {
            tables_file,
            format,
        } => {
            let set = read_table_set(&tables_file)?;
            let report = inspect_table_set(&set)?;
            match format {
                Format::Json => print_json(&report)?,
                Format::Pretty => print!("{}", format_tables_pretty(&report)),
            }
        }
        Command::Dump {
            stream_file,
            tables,
            root,
            bits,
            max_string_bytes,
            format,
        } => {
            let set = read_table_set(&tables)?;
            let stream = fs::read(&stream_file)
                .with_context(|| format!("read stream {}", stream_file.display()))?;
            let mut limits = codec::CodecLimits::default();
            if let Some(max) = max_string_bytes {
                limits.max_string_bytes = max;
            }
            log::debug!("dumping {} bytes as {root}", stream.len());
            let report = dump_stream(&set, &root, &stream, bits, &limits)?;
            match format {
                Format::Json => print_json(&report)?,
                Format::Pretty => print!("{}", format_stream_pretty(&report)),
            }
        }
    }
    Ok(())
}

fn read_table_set(path: &Path) -> Result<wire::TableSet> {
    let bytes = fs::read(path).with_context(|| format!("read tables {}", path.display()))?;
    load_table_set(&bytes, &wire::Limits::default())
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize json")?;
    println!("{json}");
    Ok(())
}
