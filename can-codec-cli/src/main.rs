//! CAN Codec Compiler CLI Application
//!
//! Command-line front end for the can-codec library:
//! - Loads one or more DBC files
//! - Compiles them into codec descriptors (in parallel)
//! - Writes the descriptors as a single JSON document

use anyhow::{Context, Result};
use can_codec::{parse_dbc, Compiler, CompilerConfig};
use clap::Parser;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

mod config;
mod output;

use output::{CompiledFile, Document};

/// CAN Codec Compiler - Derive signal pack/unpack descriptors from DBC files
#[derive(Parser, Debug)]
#[command(name = "can-codec-cli")]
#[command(about = "Compile DBC files into CAN signal codec descriptors", long_about = None)]
#[command(version)]
struct Args {
    /// Path to DBC file(s) (can be repeated)
    #[arg(long, value_name = "FILE")]
    dbc: Vec<PathBuf>,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output file for the JSON document (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Include a generation timestamp in the output
    #[arg(long)]
    timestamp: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    log::info!("CAN Codec CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using codec library v{}", can_codec::VERSION);

    let mut app_config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => config::AppConfig::default(),
    };

    // Command line arguments extend / override the config file
    app_config.input.dbc_files.extend(args.dbc.iter().cloned());
    if args.output.is_some() {
        app_config.output.path = args.output.clone();
    }
    app_config.output.pretty |= args.pretty;
    app_config.output.timestamp |= args.timestamp;

    if app_config.input.dbc_files.is_empty() {
        println!("CAN Codec Compiler - No input specified");
        println!("\nQuick Start:");
        println!("  can-codec-cli --dbc powertrain.dbc --pretty");
        println!("  can-codec-cli --dbc a.dbc --dbc b.dbc --output codecs.json");
        println!("\nWith a configuration file:");
        println!("  can-codec-cli --config config.toml");
        println!("\nUse --help for more options");
        return Ok(());
    }

    let databases = app_config
        .input
        .dbc_files
        .par_iter()
        .map(|path| compile_file(path, &app_config.compiler))
        .collect::<Result<Vec<_>>>()?;

    let document = Document::new(databases, app_config.output.timestamp);
    document.write(app_config.output.path.as_deref(), app_config.output.pretty)
}

/// Parse and compile one DBC file
fn compile_file(path: &Path, compiler_config: &CompilerConfig) -> Result<CompiledFile> {
    log::info!("Loading DBC: {:?}", path);
    let bytes = fs::read(path).with_context(|| format!("Failed to read DBC file: {:?}", path))?;

    let database =
        parse_dbc(&bytes).with_context(|| format!("Failed to parse DBC file: {:?}", path))?;
    let stats = database.stats();

    let compiled = Compiler::with_config(compiler_config.clone())
        .compile(database)
        .with_context(|| format!("Failed to compile DBC file: {:?}", path))?;

    for rejected in &compiled.rejected {
        log::warn!(
            "{:?}: message 0x{:x} ({}) rejected: {}",
            path,
            rejected.id,
            rejected.name,
            rejected.reason
        );
    }

    Ok(CompiledFile {
        source: path.to_path_buf(),
        stats,
        compiled,
    })
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
