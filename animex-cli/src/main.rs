//! Animex CLI Tool
//!
//! Command-line interface for converting timeline exports into animation
//! scripts.

use animex_builder::{BuildConfig, DocumentBuilder};
use animex_core::{AssetCatalog, ExportDocument, TimelineKind, TweenIndex};
use animex_emit::{DirTemplates, RenderConfig, Renderer};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "animex")]
#[command(about = "Animex - convert timeline exports into compact animation scripts")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an export document into a script
    Convert {
        /// Input export JSON file
        input: PathBuf,

        /// Output script path (defaults to the input with a .js extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Template directory containing `<version>.0/<name>.txt`
        #[arg(short, long, default_value = "templates")]
        templates: PathBuf,

        /// Force short helper names
        #[arg(long, conflicts_with = "no_compress")]
        compress: bool,

        /// Force verbose helper names
        #[arg(long)]
        no_compress: bool,

        /// Replay every command instead of matching tweens
        #[arg(long)]
        no_tweens: bool,
    },

    /// Show a summary of an export document
    Info {
        /// Input export JSON file
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Convert {
            input,
            output,
            templates,
            compress,
            no_compress,
            no_tweens,
        } => {
            let compress = match (compress, no_compress) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            convert(input, output, templates, compress, !no_tweens)?
        }

        Commands::Info { input } => show_info(&input)?,
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn read_document(input: &Path) -> Result<ExportDocument> {
    let file = File::open(input)
        .with_context(|| format!("Failed to open export file {}", input.display()))?;
    ExportDocument::read(BufReader::new(file)).context("Failed to parse export document")
}

fn convert(
    input: PathBuf,
    output: Option<PathBuf>,
    templates: PathBuf,
    compress: Option<bool>,
    tweens: bool,
) -> Result<()> {
    let output = output.unwrap_or_else(|| input.with_extension("js"));
    println!("Converting export: {}", input.display());
    println!("Output: {}", output.display());

    let doc = read_document(&input)?;
    let builder = DocumentBuilder::new(BuildConfig { tweens });
    let animated = builder
        .build(&doc)
        .context("Failed to reconstruct timelines")?;

    let instances: usize = animated.timelines.iter().map(|t| t.instances.len()).sum();
    println!(
        "Reconstructed {} timelines with {} instances",
        animated.timelines.len(),
        instances
    );

    let mut config = RenderConfig::from_meta(animated.meta());
    if let Some(compress) = compress {
        config.compress = compress;
    }
    let source = DirTemplates::new(&templates);
    let script = Renderer::new(&animated, &source, config)
        .render()
        .with_context(|| format!("Failed to render with templates in {}", templates.display()))?;

    fs::write(&output, &script).context("Failed to write output script")?;
    println!("Wrote {} bytes", script.len());
    println!("Conversion complete!");

    Ok(())
}

fn show_info(input: &Path) -> Result<()> {
    let doc = read_document(input)?;
    let catalog = AssetCatalog::new(&doc).context("Failed to build asset catalog")?;
    let tweens = TweenIndex::new(&doc.tweens);
    let meta = &catalog.meta;

    println!("Animex Export Information:");
    println!("  Stage: {}x{} @ {} fps", meta.width, meta.height, meta.framerate);
    println!("  Namespace: {}", meta.name_space);
    println!("  Output version: {}", meta.output_version);
    println!("  Bitmaps: {}", catalog.bitmaps().len());
    println!("  Shapes: {}", catalog.shapes().len());
    println!("  Texts: {}", catalog.texts().len());
    println!("  Sounds: {}", catalog.sounds().len());
    println!("  Tweens: {}", tweens.len());
    println!("\nTimelines ({}):", catalog.timelines().len());
    for timeline in catalog.timelines() {
        let kind = match timeline.kind {
            TimelineKind::Container => "container",
            TimelineKind::Graphic => "graphic",
            TimelineKind::Stage => "stage",
            TimelineKind::MovieClip => "movieclip",
        };
        let tween_count = tweens
            .timeline(&timeline.source_name)
            .map_or(0, |group| group.len());
        println!(
            "  #{} {} ({}): {} frames, {} tweens",
            timeline.asset_id, timeline.name, kind, timeline.total_frames, tween_count
        );
    }

    Ok(())
}
