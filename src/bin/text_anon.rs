//! Anonymize or deanonymize plain text.
//!
//! Reads from a file or stdin, writes to a file or stdout; the mapping JSON
//! travels on the side, exactly as for the document tools.
//!
//! Usage:
//!   text-anon anonymize --entities tiers.json --mapping mapping.json < in.txt > out.txt
//!   text-anon deanonymize --mapping mapping.json < out.txt

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;

use docanon::{AnonymizeOptions, AnonymizeSession, Deanonymizer, Mapping, TierRecord};

#[derive(Parser)]
#[command(
    name = "text-anon",
    about = "Replace identifying values in plain text with reversible tags"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace entity values with tags and write the mapping JSON
    Anonymize {
        /// Input text file (stdin if omitted)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Entities JSON (array of tier records); pattern-only mode if omitted
        #[arg(long)]
        entities: Option<PathBuf>,

        /// Output text file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output mapping JSON file
        #[arg(long)]
        mapping: PathBuf,
    },

    /// Restore original values from a mapping JSON
    Deanonymize {
        /// Input text file (stdin if omitted)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Mapping JSON produced by the anonymize step
        #[arg(long)]
        mapping: PathBuf,

        /// Output text file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(p) => {
            std::fs::read_to_string(p).with_context(|| format!("Failed to read {}", p.display()))
        }
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&PathBuf>, text: &str) -> Result<()> {
    match path {
        Some(p) => std::fs::write(p, text).with_context(|| format!("Failed to write {}", p.display())),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Anonymize {
            input,
            entities,
            output,
            mapping,
        } => {
            let tiers: Vec<TierRecord> = match entities {
                Some(p) => {
                    let data = std::fs::read_to_string(&p)
                        .with_context(|| format!("Failed to read entities: {}", p.display()))?;
                    serde_json::from_str(&data).context("Invalid entities JSON")?
                }
                None => Vec::new(),
            };
            let text = read_input(input.as_ref())?;
            let mut session = AnonymizeSession::new(&tiers, AnonymizeOptions::default());
            let out = session.apply(&text);
            let map = session.into_mapping();
            std::fs::write(&mapping, serde_json::to_string_pretty(&map)?)
                .with_context(|| format!("Failed to write mapping: {}", mapping.display()))?;
            write_output(output.as_ref(), &out)?;
            eprintln!("Mapping ({} tags) saved to: {}", map.len(), mapping.display());
            Ok(())
        }
        Commands::Deanonymize {
            input,
            mapping,
            output,
        } => {
            let data = std::fs::read_to_string(&mapping)
                .with_context(|| format!("Failed to read mapping: {}", mapping.display()))?;
            let map: Mapping = serde_json::from_str(&data).context("Invalid mapping JSON")?;
            let text = read_input(input.as_ref())?;
            let deanon = Deanonymizer::new(&map);
            write_output(output.as_ref(), &deanon.restore(&text))?;
            Ok(())
        }
    }
}
