//! pdprocessor CLI - Map a CSV or spreadsheet file through a data map
//!
//! # Commands
//!
//! ```bash
//! pdprocessor process input.csv --map map.json    # Run the data map, print JSON records
//! pdprocessor inspect input.xlsx --sheet Data     # Show columns and the first rows
//! pdprocessor formatters                          # List built-in formatters
//! ```

use clap::{Parser, Subcommand};
use pdprocessor::{
    formatters_description, loader_for, Engine, LoadOptions, LogLevel, Processor, ProcessorConfig,
    SheetSelector, DATE_FORMAT_ENV,
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "pdprocessor")]
#[command(about = "Map tabular files to a target layout through a data map", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Load options shared by `process` and `inspect`.
#[derive(clap::Args)]
struct LoadArgs {
    /// Loader to use (by extension if not specified)
    #[arg(short, long, value_enum)]
    engine: Option<Engine>,

    /// Sheet index or name (spreadsheets only)
    #[arg(short, long)]
    sheet: Option<String>,

    /// Field delimiter (delimited files only)
    #[arg(short, long, conflicts_with = "detect_delimiter")]
    delimiter: Option<char>,

    /// Sniff the delimiter from the first line
    #[arg(long)]
    detect_delimiter: bool,

    /// Text encoding label, or "auto"
    #[arg(long)]
    encoding: Option<String>,
}

impl LoadArgs {
    fn apply(&self, options: &mut LoadOptions) {
        if let Some(engine) = self.engine {
            options.engine = engine;
        }
        if let Some(ref sheet) = self.sheet {
            options.sheet = SheetSelector::parse(sheet);
        }
        if self.detect_delimiter {
            options.delimiter = None;
        } else if let Some(delimiter) = self.delimiter {
            options.delimiter = Some(delimiter);
        }
        if let Some(ref encoding) = self.encoding {
            options.encoding = encoding.clone();
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a data map over a file and output JSON records
    Process {
        /// Input file
        input: PathBuf,

        /// Processor config (JSON) holding the data map
        #[arg(short, long)]
        map: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Date pattern for the `date` formatter
        #[arg(long)]
        date_format: Option<String>,

        #[command(flatten)]
        load: LoadArgs,
    },

    /// Load a file and show what the loader sees
    Inspect {
        /// Input file
        input: PathBuf,

        /// Number of rows to show
        #[arg(short = 'n', long, default_value = "5")]
        rows: usize,

        #[command(flatten)]
        load: LoadArgs,
    },

    /// Show available formatters
    Formatters,
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Process {
            input,
            map,
            output,
            date_format,
            load,
        } => cmd_process(&input, &map, output.as_deref(), date_format, &load),

        Commands::Inspect { input, rows, load } => cmd_inspect(&input, rows, &load),

        Commands::Formatters => cmd_formatters(),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_process(
    input: &Path,
    map: &Path,
    output: Option<&Path>,
    date_format: Option<String>,
    load: &LoadArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing: {}", input.display());

    let config = ProcessorConfig::from_file(map)?;
    eprintln!("   Data map: {} entries from {}", config.data_map.len(), map.display());

    let mut processor = Processor::new(input);
    if let Ok(env_format) = env::var(DATE_FORMAT_ENV) {
        processor.set_date_format(env_format);
    }
    config.apply_to(&mut processor);
    if let Some(date_format) = date_format {
        processor.set_date_format(date_format);
    }
    load.apply(processor.load_options_mut());

    let mut progress = processor.subscribe();
    let result = processor.process().map(|table| table.to_records());

    while let Ok(entry) = progress.try_recv() {
        let marker = match entry.level {
            LogLevel::Success => "✅",
            LogLevel::Error => "❌",
            LogLevel::Warning => "⚠️ ",
            LogLevel::Info => "  ",
        };
        eprintln!("   {} {:?}: {}", marker, entry.stage, entry.message);
    }

    let records = result?;
    eprintln!("\n⚙️  Output: {} records", records.len());

    let json = serde_json::to_string_pretty(&records)?;
    write_output(&json, output)?;

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_inspect(input: &Path, rows: usize, load: &LoadArgs) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("🔎 Inspecting: {}", input.display());

    let mut options = LoadOptions::default();
    load.apply(&mut options);

    let loader = loader_for(options.engine, input)?;
    let table = loader.load(input, &options)?;

    eprintln!("   Rows: {}", table.row_count());
    eprintln!("   Columns: {}", table.columns().join(", "));

    let preview = table.head(rows);
    println!("{}", serde_json::to_string_pretty(&preview.to_records())?);
    Ok(())
}

fn cmd_formatters() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", formatters_description());
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
