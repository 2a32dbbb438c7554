//! Knowledge reconcile batch binary

use clap::Parser;
use knowledge_reconcile::config::{parse_splits, ReconcileConfig};
use knowledge_reconcile::{pipeline, SplitReport};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reconcile")]
#[command(version)]
#[command(about = "Attach knowledge-corpus passages to every grounded-dialogue utterance")]
struct Cli {
    /// Knowledge corpus, one JSON array of dialogue records per line
    #[arg(long)]
    knowledge: Option<PathBuf>,

    /// Directory holding <split>.json files to annotate
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Directory the annotated splits are written to
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Split to process (repeatable or comma-separated)
    #[arg(long = "split")]
    splits: Vec<String>,

    /// How many unresolved knowledge texts to print per split
    #[arg(long)]
    unresolved_preview: Option<usize>,

    /// Print each report as a JSON line instead of text
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn into_config(self) -> ReconcileConfig {
        let mut config = ReconcileConfig::from_env();
        if let Some(path) = self.knowledge {
            config.knowledge_path = path;
        }
        if let Some(dir) = self.input_dir {
            config.input_dir = dir;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        let splits: Vec<String> = self.splits.iter().flat_map(|s| parse_splits(s)).collect();
        if !splits.is_empty() {
            config.splits = splits;
        }
        if let Some(limit) = self.unresolved_preview {
            config.unresolved_preview = limit;
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let json = cli.json;
    let config = cli.into_config();

    println!("Knowledge reconcile v{}", env!("CARGO_PKG_VERSION"));
    println!("   Knowledge: {}", config.knowledge_path.display());
    println!("   Splits:    {}", config.splits.join(", "));
    println!();

    pipeline::run(&config, |report| print_report(report, json)).await?;

    Ok(())
}

fn print_report(report: &SplitReport, json: bool) {
    if json {
        match serde_json::to_string(report) {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("Failed to encode report for {}: {}", report.split, e),
        }
        return;
    }

    println!("Processing {}:", report.split);
    println!("{}", report.tally);
    for text in &report.tally.unresolved_samples {
        println!("\t  '{}'", text);
    }
    println!("   -> {}", report.output_path.display());
    println!();
}
