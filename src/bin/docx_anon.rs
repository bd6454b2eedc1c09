//! Anonymize or deanonymize a DOCX document.
//!
//! Only `word/document.xml` is rewritten — body paragraphs and table cells
//! alike; run formatting, images, and every other archive entry are carried
//! through untouched.
//!
//! Usage:
//!   docx-anon anonymize --docx input.docx --entities tiers.json \
//!     --mapping mapping.json -o output.docx
//!   docx-anon deanonymize --docx anonymized.docx --mapping mapping.json -o output.docx

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use docanon::docx::{anonymize_docx, deanonymize_docx, DocxFile};
use docanon::{AnonymizeOptions, AnonymizeSession, Mapping, TierRecord};

#[derive(Parser)]
#[command(
    name = "docx-anon",
    about = "Replace identifying values in a DOCX with reversible tags"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace entity values with tags and write the mapping JSON
    Anonymize {
        /// Input DOCX file
        #[arg(long)]
        docx: PathBuf,

        /// Entities JSON (array of tier records); pattern-only mode if omitted
        #[arg(long)]
        entities: Option<PathBuf>,

        /// Output DOCX file
        #[arg(short, long)]
        output: PathBuf,

        /// Output mapping JSON file
        #[arg(long)]
        mapping: PathBuf,

        /// Disable phone/email pattern detection when no entities are given
        #[arg(long)]
        no_pattern_fallback: bool,
    },

    /// Restore original values from a mapping JSON
    Deanonymize {
        /// Anonymized DOCX file
        #[arg(long)]
        docx: PathBuf,

        /// Mapping JSON produced by the anonymize step
        #[arg(long)]
        mapping: PathBuf,

        /// Output DOCX file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn load_tiers(path: Option<&PathBuf>) -> Result<Vec<TierRecord>> {
    match path {
        Some(p) => {
            let data = std::fs::read_to_string(p)
                .with_context(|| format!("Failed to read entities: {}", p.display()))?;
            serde_json::from_str(&data).context("Invalid entities JSON")
        }
        None => Ok(Vec::new()),
    }
}

fn run_anonymize(
    docx_path: &PathBuf,
    entities: Option<&PathBuf>,
    output: &PathBuf,
    mapping_path: &PathBuf,
    pattern_fallback: bool,
) -> Result<()> {
    let tiers = load_tiers(entities)?;
    println!("Loaded {} tier records", tiers.len());

    println!("Opening DOCX: {}", docx_path.display());
    let mut docx = DocxFile::from_file(docx_path).context("Failed to open DOCX")?;

    let options = AnonymizeOptions { pattern_fallback };
    let mut session = AnonymizeSession::new(&tiers, options);
    let replaced = anonymize_docx(&mut docx, &mut session).context("Anonymization failed")?;
    println!("Replaced {} occurrences", replaced);

    let mapping = session.into_mapping();
    std::fs::write(mapping_path, serde_json::to_string_pretty(&mapping)?)
        .with_context(|| format!("Failed to write mapping: {}", mapping_path.display()))?;
    docx.save(output).context("Failed to save DOCX")?;

    println!("\nSaved to: {}", output.display());
    println!(
        "Mapping ({} tags) saved to: {}",
        mapping.len(),
        mapping_path.display()
    );
    Ok(())
}

fn run_deanonymize(docx_path: &PathBuf, mapping_path: &PathBuf, output: &PathBuf) -> Result<()> {
    let data = std::fs::read_to_string(mapping_path)
        .with_context(|| format!("Failed to read mapping: {}", mapping_path.display()))?;
    let mapping: Mapping = serde_json::from_str(&data).context("Invalid mapping JSON")?;
    println!("Loaded mapping with {} tags", mapping.len());

    println!("Opening DOCX: {}", docx_path.display());
    let mut docx = DocxFile::from_file(docx_path).context("Failed to open DOCX")?;

    let restored = deanonymize_docx(&mut docx, &mapping).context("Deanonymization failed")?;
    println!("Restored {} occurrences", restored);

    docx.save(output).context("Failed to save DOCX")?;
    println!("\nSaved to: {}", output.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Anonymize {
            docx,
            entities,
            output,
            mapping,
            no_pattern_fallback,
        } => run_anonymize(
            &docx,
            entities.as_ref(),
            &output,
            &mapping,
            !no_pattern_fallback,
        ),
        Commands::Deanonymize {
            docx,
            mapping,
            output,
        } => run_deanonymize(&docx, &mapping, &output),
    }
}
