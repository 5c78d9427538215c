use clap::{Parser, Subcommand};
use scandeck::collect::{self, FsTree};
use scandeck::config::PipelineConfig;
use scandeck::fs_remote::FsRemote;
use scandeck::imaging::RustCodec;
use scandeck::pipeline::ScanPipeline;
use scandeck::types::ScanMetadata;
use scandeck::upload::CancelSignal;
use scandeck::{output, validate};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "scandeck")]
#[command(about = "Scan page ingestion pipeline for serialized illustrated content")]
#[command(long_about = "\
Scan page ingestion pipeline for serialized illustrated content

Collects page images from a directory, validates and converts them to the
canonical format, uploads new pages in sequential batches, and persists the
ordered manifest to a directory-backed store.

Pages are ordered by numeric-aware natural sort (page2 before page10),
recursing into subdirectories depth-first. Oversized or undecodable files
are reported and skipped; a conversion failure keeps the original bytes.

Limits and the canonical format come from scandeck.toml when present.")]
#[command(version)]
struct Cli {
    /// Store directory (assets + manifests)
    #[arg(long, default_value = ".scandeck-store", global = true)]
    store: PathBuf,

    /// Pipeline config file
    #[arg(long, default_value = "scandeck.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a directory of page images into a scan and persist its manifest
    Ingest {
        /// Directory of page images
        dir: PathBuf,

        /// Scan identifier (manifest key in the store)
        #[arg(long)]
        scan: String,

        /// Scan title (defaults to the scan id)
        #[arg(long)]
        title: Option<String>,

        /// Chapter label
        #[arg(long)]
        chapter: Option<String>,
    },
    /// Validate a directory of page images without uploading anything
    Check {
        /// Directory of page images
        dir: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = PipelineConfig::load(&cli.config)?;

    match cli.command {
        Command::Ingest {
            dir,
            scan,
            title,
            chapter,
        } => {
            let remote = FsRemote::open(&cli.store)?;
            let metadata = ScanMetadata {
                title: title.unwrap_or_else(|| scan.clone()),
                chapter,
            };
            let mut pipeline = ScanPipeline::new(RustCodec::new(), remote, config, &scan, metadata);
            pipeline.load()?;

            let mut tree = FsTree::new();
            let outcome = pipeline.add_from_directory(&mut tree, &dir)?;
            output::print_add_summary(&outcome);

            let manifest = pipeline.save(&CancelSignal::new(), output::print_progress)?;
            output::print_manifest(&manifest);
        }
        Command::Check { dir } => {
            let mut tree = FsTree::new();
            let candidates = collect::collect_from_directory(&mut tree, &dir);
            let codec = RustCodec::new();
            let validation = validate::validate(&codec, candidates, 0, &config)?;
            println!(
                "{} accepted, {} rejected",
                validation.accepted.len(),
                validation.rejected.len()
            );
            for line in output::format_rejections(&validation.rejected) {
                println!("{line}");
            }
        }
    }

    Ok(())
}
