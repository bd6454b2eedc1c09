//! Anonymize or deanonymize a PDF while preserving its layout.
//!
//! Two modes:
//!
//! 1. **Anonymize**: replace entity values with reversible tags and write the
//!    tag mapping JSON needed for the reverse pass.
//!    pdf-anon anonymize --pdf input.pdf --entities tiers.json \
//!      --mapping mapping.json -o output.pdf
//!
//! 2. **Deanonymize**: restore original values from a saved mapping.
//!    pdf-anon deanonymize --pdf anonymized.pdf --mapping mapping.json -o output.pdf

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use docanon::pdf::{anonymize_pdf, deanonymize_pdf, open_pdf_file};
use docanon::{AnonymizeOptions, AnonymizeSession, Mapping, PageRewriter, RewriteReport, TierRecord};

#[derive(Parser)]
#[command(
    name = "pdf-anon",
    about = "Replace identifying values in a PDF with reversible tags"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace entity values with tags and write the mapping JSON
    Anonymize {
        /// Input PDF file
        #[arg(long)]
        pdf: PathBuf,

        /// Entities JSON (array of tier records); pattern-only mode if omitted
        #[arg(long)]
        entities: Option<PathBuf>,

        /// Output PDF file
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
        /// Anonymized PDF file
        #[arg(long)]
        pdf: PathBuf,

        /// Mapping JSON produced by the anonymize step
        #[arg(long)]
        mapping: PathBuf,

        /// Output PDF file
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

fn load_mapping(path: &PathBuf) -> Result<Mapping> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read mapping: {}", path.display()))?;
    serde_json::from_str(&data).context("Invalid mapping JSON")
}

fn print_report(report: &RewriteReport) {
    println!(
        "Rewrote {} of {} runs across {} pages",
        report.replaced, report.spans_seen, report.pages
    );
    for failure in &report.failures {
        eprintln!(
            "  Warning: page {} run {:?}: {}",
            failure.page_index, failure.path, failure.reason
        );
    }
}

fn run_anonymize(
    pdf: &PathBuf,
    entities: Option<&PathBuf>,
    output: &PathBuf,
    mapping_path: &PathBuf,
    pattern_fallback: bool,
) -> Result<()> {
    let tiers = load_tiers(entities)?;
    println!("Loaded {} tier records", tiers.len());

    println!("Opening PDF: {}", pdf.display());
    let mut doc = open_pdf_file(pdf).context("Failed to open PDF")?;

    let options = AnonymizeOptions { pattern_fallback };
    let mut session = AnonymizeSession::new(&tiers, options);
    let rewriter = PageRewriter::new();
    let report = anonymize_pdf(&mut doc, &mut session, &rewriter).context("Anonymization failed")?;
    print_report(&report);

    let mapping = session.into_mapping();
    std::fs::write(mapping_path, serde_json::to_string_pretty(&mapping)?)
        .with_context(|| format!("Failed to write mapping: {}", mapping_path.display()))?;
    doc.save(output).context("Failed to save PDF")?;

    println!("\nSaved to: {}", output.display());
    println!(
        "Mapping ({} tags) saved to: {}",
        mapping.len(),
        mapping_path.display()
    );
    Ok(())
}

fn run_deanonymize(pdf: &PathBuf, mapping_path: &PathBuf, output: &PathBuf) -> Result<()> {
    let mapping = load_mapping(mapping_path)?;
    println!("Loaded mapping with {} tags", mapping.len());

    println!("Opening PDF: {}", pdf.display());
    let mut doc = open_pdf_file(pdf).context("Failed to open PDF")?;

    let rewriter = PageRewriter::new();
    let report =
        deanonymize_pdf(&mut doc, &mapping, &rewriter).context("Deanonymization failed")?;
    print_report(&report);

    doc.save(output).context("Failed to save PDF")?;
    println!("\nSaved to: {}", output.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Anonymize {
            pdf,
            entities,
            output,
            mapping,
            no_pattern_fallback,
        } => run_anonymize(
            &pdf,
            entities.as_ref(),
            &output,
            &mapping,
            !no_pattern_fallback,
        ),
        Commands::Deanonymize {
            pdf,
            mapping,
            output,
        } => run_deanonymize(&pdf, &mapping, &output),
    }
}
