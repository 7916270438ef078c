// rtreport CLI: generate the unified report, or inspect what each input yields
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use rtreport::config::ReportLayout;
use rtreport::extraction::{QaResultExtractor, TreatmentTextExtractor};
use rtreport::pdf_extraction::{extract_plan_content, extract_text};
use rtreport::report::{generate_report, ReportRequest};
use rtreport::types::DocumentKind;

#[derive(Parser, Debug)]
#[command(name = "rtreport", author, version, about = "Unified radiotherapy QA report generator")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Layout descriptor (TOML); falls back to $RTREPORT_LAYOUT, then the built-in layout
    #[arg(long, global = true)]
    layout: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the unified report PDF
    Generate {
        /// Treatment plan PDF
        #[arg(long)]
        plan: PathBuf,
        /// Gamma-analysis QA PDF
        #[arg(long)]
        qa: PathBuf,
        /// Institution logo (PNG or JPEG)
        #[arg(long)]
        logo: Option<PathBuf>,
        /// Signature image, repeatable
        #[arg(long)]
        signature: Vec<PathBuf>,
        /// Output PDF path
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print what the treatment plan yields, as JSON
    InspectPlan {
        plan: PathBuf,
    },
    /// Print the QA sequences, as JSON
    InspectQa {
        qa: PathBuf,
    },
    /// Print the effective layout as TOML
    PrintLayout,
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

// Write through a temp file in the target directory so a failed run never
// leaves a truncated report behind.
fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    tmp.write_all(bytes)?;
    tmp.persist(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    rtreport::logging::init(cli.verbose)?;

    let layout = ReportLayout::resolve(cli.layout.as_deref()).context("Failed to load layout")?;

    match cli.command {
        Commands::Generate {
            plan,
            qa,
            logo,
            signature,
            output,
        } => {
            let plan_pdf = read_input(&plan)?;
            let qa_pdf = read_input(&qa)?;
            let logo = logo.as_deref().map(read_input).transpose()?;
            let signatures = signature
                .iter()
                .map(|p| read_input(p))
                .collect::<Result<Vec<_>>>()?;
            let signature_refs: Vec<&[u8]> = signatures.iter().map(Vec::as_slice).collect();

            let request = ReportRequest {
                plan_pdf: &plan_pdf,
                qa_pdf: &qa_pdf,
                logo: logo.as_deref(),
                signatures: &signature_refs,
            };
            let bytes = generate_report(&request, &layout).context("Report generation failed")?;
            write_output(&output, &bytes)?;
            println!("Report written to {}", output.display());
        }
        Commands::InspectPlan { plan } => {
            let content = extract_plan_content(&read_input(&plan)?)?;
            let extraction = TreatmentTextExtractor::new(&layout)?.extract(&content.text);
            println!("{}", serde_json::to_string_pretty(&extraction)?);
            eprintln!("{} embedded image(s)", content.images.len());
        }
        Commands::InspectQa { qa } => {
            let text = extract_text(&read_input(&qa)?, DocumentKind::QualityAssurance)?;
            let set = QaResultExtractor::new(&layout.qa)?.extract(&text);
            println!("{}", serde_json::to_string_pretty(&set)?);
        }
        Commands::PrintLayout => {
            print!("{}", layout.to_toml_string()?);
        }
    }

    Ok(())
}
