//! Coordshift: a coordinate dataset engine.
//!
//! Coordshift ingests 2D point coordinates (typed by hand, pasted as
//! delimited text or read from CSV and workbook spreadsheets), reprojects
//! them between coordinate reference systems, keeps a single active record
//! synchronized between a table and a map, and exports the transformed
//! points as GeoJSON, a zipped EPSG:9377 shapefile or plain text.
//!
//! # Modules
//!
//! - [`dataset`]: Record store, typed coordinates and the input/output codecs
//! - [`crs`]: CRS catalog and code normalization
//! - [`reproject`]: Projection service abstraction and the reprojection pass
//! - [`selection`]: Table/map selection synchronization and the map surface
//! - [`engine`]: The per-session [`engine::Engine`] tying it all together
//! - [`session`]: Line-oriented scripts driving an engine
//! - [`error`]: Error types for coordshift operations

pub mod crs;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod reproject;
pub mod selection;
pub mod session;

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use dataset::io_geojson::DEFAULT_EXPORT_FILE_NAME;
use dataset::{CoordSet, IngestReport, InputFormat};
use engine::{render_table, Engine, EngineConfig, TableRow};
use reproject::ReprojectionReport;

pub use error::CoordError;

/// The coordshift CLI application.
#[derive(Parser)]
#[command(name = "coordshift")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// List the known coordinate reference systems.
    Crs(CrsArgs),
    /// Load a point file, reproject it and export the result.
    Transform(TransformArgs),
    /// Run a session script (reads stdin when no file is given).
    Session(SessionArgs),
}

/// Output format for listings and reports.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Input format of a point file.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum FileFormat {
    /// Detect from extension and content.
    Auto,
    /// Delimited text, one `x y` pair per line.
    Text,
    /// CSV with X/Y or Longitud/Latitud columns.
    Table,
    /// Workbook (.xlsx, .xls, .ods); the first sheet is read as a table.
    Workbook,
}

impl From<FileFormat> for InputFormat {
    fn from(value: FileFormat) -> Self {
        match value {
            FileFormat::Auto => InputFormat::Auto,
            FileFormat::Text => InputFormat::Text,
            FileFormat::Table => InputFormat::Table,
            FileFormat::Workbook => InputFormat::Workbook,
        }
    }
}

/// Which coordinate set to print.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum CopySet {
    Source,
    Target,
}

impl From<CopySet> for CoordSet {
    fn from(value: CopySet) -> Self {
        match value {
            CopySet::Source => CoordSet::Source,
            CopySet::Target => CoordSet::Target,
        }
    }
}

/// Arguments for the crs subcommand.
#[derive(clap::Args)]
struct CrsArgs {
    /// Output format for the listing.
    #[arg(long, value_enum, default_value = "text")]
    output: OutputFormat,
}

/// Arguments for the transform subcommand.
#[derive(clap::Args)]
struct TransformArgs {
    /// Input point file.
    input: PathBuf,

    /// Origin CRS code (e.g. 4326 or EPSG:4326).
    #[arg(long, env = "COORDSHIFT_FROM", default_value = "4326")]
    from: String,

    /// Destination CRS code.
    #[arg(long, env = "COORDSHIFT_TO", default_value = "3116")]
    to: String,

    /// Input file format.
    #[arg(long, value_enum, default_value = "auto")]
    format: FileFormat,

    /// Write the transformed points as GeoJSON to this path.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Write GeoJSON to the default file name in the current directory.
    #[arg(long, conflicts_with = "output")]
    export: bool,

    /// Also write the points, converted to EPSG:9377, as a zipped shapefile.
    #[arg(long)]
    shapefile: Option<PathBuf>,

    /// Also write the table (source and target columns) as CSV.
    #[arg(long = "table-csv")]
    table_csv: Option<PathBuf>,

    /// Print one coordinate set as `x,y` lines instead of the table.
    #[arg(long, value_enum)]
    copy: Option<CopySet>,

    /// Output format for the report.
    #[arg(long, value_enum, default_value = "text")]
    report: OutputFormat,
}

/// Arguments for the session subcommand.
#[derive(clap::Args)]
struct SessionArgs {
    /// Script file; stdin when omitted.
    script: Option<PathBuf>,
}

/// Run the coordshift CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), CoordError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Crs(args)) => run_crs(args),
        Some(Commands::Transform(args)) => run_transform(args),
        Some(Commands::Session(args)) => run_session(args),
        None => {
            println!("coordshift {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Ingest, reproject and export coordinate datasets.");
            println!();
            println!("Run 'coordshift --help' for usage information.");
            Ok(())
        }
    }
}

fn run_crs(args: CrsArgs) -> Result<(), CoordError> {
    let registry = crs::CrsRegistry::with_default_catalog();

    match args.output {
        OutputFormat::Json => {
            let defs: Vec<_> = registry.definitions().collect();
            println!("{}", serde_json::to_string_pretty(&defs)?);
        }
        OutputFormat::Text => {
            for def in registry.definitions() {
                let kind = if def.is_geographic() {
                    "geographic"
                } else {
                    "projected"
                };
                println!("EPSG:{:<6} {:<10} {}", def.code, kind, def.label);
            }
        }
    }
    Ok(())
}

/// Machine-readable summary of a transform run.
#[derive(Serialize)]
struct TransformSummary<'a> {
    ingest: &'a IngestReport,
    reprojection: &'a ReprojectionReport,
    rows: &'a [TableRow],
    #[serde(skip_serializing_if = "Option::is_none")]
    geojson: Option<&'a Path>,
    #[serde(skip_serializing_if = "Option::is_none")]
    shapefile: Option<&'a Path>,
}

fn run_transform(args: TransformArgs) -> Result<(), CoordError> {
    let mut engine = Engine::new(EngineConfig {
        origin_crs: args.from,
        destination_crs: args.to,
    });

    let ingest = engine.load_file(&args.input, args.format.into())?;
    let report = engine.reproject()?;

    let geojson_path = match (&args.output, args.export) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => Some(PathBuf::from(DEFAULT_EXPORT_FILE_NAME)),
        (None, false) => None,
    };
    if let Some(path) = &geojson_path {
        engine.write_geojson(path)?;
    }
    if let Some(path) = &args.shapefile {
        engine.write_shapefile_zip(path)?;
    }
    if let Some(path) = &args.table_csv {
        engine.write_table_csv(path)?;
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match args.report {
        OutputFormat::Json => {
            let rows = engine.table();
            let summary = TransformSummary {
                ingest: &ingest,
                reprojection: &report,
                rows: &rows,
                geojson: geojson_path.as_deref(),
                shapefile: args.shapefile.as_deref(),
            };
            writeln!(out, "{}", serde_json::to_string_pretty(&summary)?)?;
        }
        OutputFormat::Text => {
            match args.copy {
                Some(set) => write!(out, "{}", engine.bulk_text(set.into()))?,
                None => write!(out, "{}", render_table(&engine.table()))?,
            }
            eprintln!("{}", ingest);
            eprint!("{}", report);
            if let Some(path) = &geojson_path {
                eprintln!("GeoJSON written to {}", path.display());
            }
            if let Some(path) = &args.shapefile {
                eprintln!("Shapefile (EPSG:9377) written to {}", path.display());
            }
        }
    }

    Ok(())
}

fn run_session(args: SessionArgs) -> Result<(), CoordError> {
    let script = match &args.script {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let mut engine = Engine::new(EngineConfig::default());
    let stdout = io::stdout();
    let stderr = io::stderr();
    let executed = session::run_script(&mut engine, &script, &mut stdout.lock(), &mut stderr.lock())?;
    log::info!("session executed {} command(s)", executed);
    Ok(())
}
