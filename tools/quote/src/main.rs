//! printquote command-line tool
//!
//! Prices STL and 3MF files, prints mesh statistics and exports wireframe
//! previews, using the printquote library.
//!
//! ```text
//! printquote quote bracket.stl --material PETG --quality fine --infill 30
//! printquote info bracket.3mf --format json
//! printquote preview bracket.stl -o bracket.png
//! RUST_LOG=debug printquote quote bracket.stl
//! ```

#![forbid(unsafe_code)]

mod preview;

use clap::{Parser, Subcommand, ValueEnum};
use printquote::mesh_ops::{self, MeshAnalysis};
use printquote::parser::load_mesh;
use printquote::{Mesh, PricingConfig, PrintEstimate, PrintParameters};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// printquote - price 3D prints from STL and 3MF files
#[derive(Parser, Debug)]
#[command(name = "printquote")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format for results
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Pricing configuration JSON; omitted fields use the defaults
    #[arg(long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase output verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Price a print
    Quote {
        /// Mesh file (.stl or .3mf)
        #[arg(value_name = "FILE")]
        file_path: PathBuf,

        /// Material: PLA, ABS, PETG or TPU
        #[arg(short, long, default_value = "PLA")]
        material: String,

        /// Quality: draft, standard or fine
        #[arg(short, long, default_value = "standard")]
        quality: String,

        /// Infill percentage (10-100)
        #[arg(short, long, default_value_t = 20)]
        infill: u32,
    },

    /// Display mesh statistics
    Info {
        /// Mesh file (.stl or .3mf)
        #[arg(value_name = "FILE")]
        file_path: PathBuf,
    },

    /// Export a wireframe preview image
    Preview {
        /// Mesh file (.stl or .3mf)
        #[arg(value_name = "FILE")]
        file_path: PathBuf,

        /// Output PNG path
        #[arg(short, long, value_name = "OUTPUT")]
        output: PathBuf,

        /// Image width and height in pixels
        #[arg(long, default_value_t = 800)]
        size: u32,
    },
}

/// Initialize the tracing subscriber based on verbosity level
fn init_tracing(verbose: u8) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "warn",
            1 => "printquote=info",
            2 => "printquote=debug",
            _ => "trace",
        };
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(filter)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        // Library errors already carry a code; show them as the storefront would
        match e.downcast_ref::<printquote::Error>() {
            Some(err) => eprintln!("error: {}", err.user_message()),
            None => eprintln!("error: {}", e),
        }
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => PricingConfig::from_json_file(path)?,
        None => PricingConfig::default(),
    };

    match &cli.command {
        Commands::Quote {
            file_path,
            material,
            quality,
            infill,
        } => {
            let params = PrintParameters::new(material.parse()?, quality.parse()?, *infill)?;
            let (name, bytes) = read_upload(file_path)?;
            let estimate = printquote::estimate_with_config(&name, &bytes, &params, &config)?;
            print_quote(&estimate, cli.format)?;
        }
        Commands::Info { file_path } => {
            let (name, bytes) = read_upload(file_path)?;
            let mesh = load_mesh(&name, &bytes, &config.upload)?;
            let analysis = mesh_ops::analyze(&mesh, &config.complexity_thresholds);
            print_info(&name, bytes.len(), &analysis, cli.format)?;
        }
        Commands::Preview {
            file_path,
            output,
            size,
        } => {
            let (name, bytes) = read_upload(file_path)?;
            let mesh: Mesh = load_mesh(&name, &bytes, &config.upload)?;
            preview::export_wireframe_preview(&mesh, *size, output)?;
            if let OutputFormat::Text = cli.format {
                println!("✓ Preview exported to: {}", output.display());
            }
        }
    }
    Ok(())
}

fn read_upload(path: &Path) -> Result<(String, Vec<u8>), Box<dyn std::error::Error>> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| format!("'{}' is not a file path", path.display()))?
        .to_string();
    let bytes = std::fs::read(path)?;
    debug!(file = %name, size = bytes.len(), "read upload");
    Ok((name, bytes))
}

fn print_quote(estimate: &PrintEstimate, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(estimate)?),
        OutputFormat::Text => {
            let [x, y, z] = estimate.dimensions_mm;
            println!("┌─ Print Quote ──────────────────────────────────────────┐");
            println!("│ File:                 {:<34} │", estimate.file_name);
            println!("│ Material:             {:<34} │", estimate.material.to_string());
            println!("│ Quality:              {:<34} │", estimate.quality.to_string());
            println!("│ Infill:               {:<34} │", format!("{}%", estimate.infill));
            println!("│ Dimensions:           {:<34} │", format!("{:.1} x {:.1} x {:.1} mm", x, y, z));
            println!("│ Volume:               {:<34} │", format!("{:.2} cm³", estimate.volume_cm3));
            println!("│ Weight:               {:<34} │", format!("{:.1} g", estimate.weight_grams));
            println!("│ Print time:           {:<34} │", format!("{:.0} min", estimate.print_time_minutes));
            println!("│ Complexity:           {:<34} │", estimate.complexity.to_string());
            println!("├────────────────────────────────────────────────────────┤");
            for line in estimate.cost.to_string().lines() {
                println!("│ {:<54} │", line);
            }
            println!("└────────────────────────────────────────────────────────┘");
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct InfoReport<'a> {
    file_name: &'a str,
    file_size: usize,
    #[serde(flatten)]
    analysis: &'a MeshAnalysis,
}

fn print_info(
    name: &str,
    size: usize,
    analysis: &MeshAnalysis,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => {
            let report = InfoReport {
                file_name: name,
                file_size: size,
                analysis,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            let [x, y, z] = analysis.dimensions_mm();
            println!("┌─ Mesh Information ─────────────────────────────────────┐");
            println!("│ File:                 {:<34} │", name);
            println!("│ Size:                 {:<34} │", format!("{} bytes", size));
            println!("│ Triangles:            {:<34} │", analysis.triangle_count);
            println!("│ Dimensions:           {:<34} │", format!("{:.2} x {:.2} x {:.2} mm", x, y, z));
            println!("│ Volume:               {:<34} │", format!("{:.3} cm³", analysis.volume_cm3));
            println!("│ Surface area:         {:<34} │", format!("{:.1} mm²", analysis.surface_area_mm2));
            println!("│ Complexity:           {:<34} │", analysis.complexity.to_string());
            if analysis.is_inverted() {
                println!("│ Warning:              {:<34} │", "inverted winding");
            }
            if analysis.degenerate {
                println!("│ Warning:              {:<34} │", "flat along one axis");
            }
            println!("└────────────────────────────────────────────────────────┘");
        }
    }
    Ok(())
}
