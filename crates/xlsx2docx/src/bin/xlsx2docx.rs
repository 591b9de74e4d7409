use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use xlsx2docx::{
    AlignmentPolicy, BatchInput, ConversionReport, ConversionWarning, ConvertOptions,
    analyze_regions, convert_batch, convert_file, region_csv_string, write_region_csv,
};

#[derive(Debug, Parser)]
#[command(
    name = "xlsx2docx",
    version,
    about = "Convert the first worksheet of a spreadsheet into a Word document"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Convert one spreadsheet into a .docx file.
    Convert(ConvertArgs),
    /// Convert several spreadsheets into one zip of .docx files.
    Batch(BatchArgs),
    /// List detected table regions as CSV.
    Regions(RegionsArgs),
}

#[derive(Debug, Args)]
struct FormatArgs {
    /// Cell alignment policy: type-driven or legacy.
    #[arg(long, default_value = "type-driven")]
    alignment: String,

    /// chrono format for date cells.
    #[arg(long, default_value = "%Y-%m-%d")]
    date_format: String,

    /// Emit an empty paragraph for each blank row outside tables.
    #[arg(long)]
    blank_row_paragraphs: bool,

    /// Font for text runs.
    #[arg(long)]
    text_font: Option<String>,

    /// Font for numeric table cells.
    #[arg(long)]
    number_font: Option<String>,

    /// Font size in points.
    #[arg(long)]
    font_size: Option<u32>,
}

#[derive(Debug, Args)]
struct ConvertArgs {
    /// Input .xlsx or .xls path.
    #[arg(short, long)]
    input: PathBuf,

    /// Output .docx path.
    #[arg(short, long)]
    output: PathBuf,

    #[command(flatten)]
    format: FormatArgs,

    /// Enable verbose warning output.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Args)]
struct BatchArgs {
    /// Output .zip path.
    #[arg(short, long)]
    output: PathBuf,

    /// Input spreadsheets.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    #[command(flatten)]
    format: FormatArgs,

    /// Enable verbose warning output.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Args)]
struct RegionsArgs {
    /// Input .xlsx or .xls path.
    #[arg(short, long)]
    input: PathBuf,

    /// Output CSV path; stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output delimiter character.
    #[arg(long, default_value = ",")]
    delimiter: char,
}

fn parse_options(args: &FormatArgs) -> Result<ConvertOptions> {
    let alignment = AlignmentPolicy::from_str(&args.alignment)
        .map_err(|error| anyhow!(error))
        .context("failed to parse --alignment")?;

    let defaults = ConvertOptions::default();
    let options = ConvertOptions {
        alignment,
        date_format: args.date_format.clone(),
        blank_row_paragraphs: args.blank_row_paragraphs,
        text_font: args.text_font.clone().unwrap_or(defaults.text_font),
        number_font: args.number_font.clone().unwrap_or(defaults.number_font),
        font_size_half_points: args
            .font_size
            .map_or(defaults.font_size_half_points, |points| points * 2),
        ..ConvertOptions::default()
    };
    options.validate().context("invalid formatting options")?;
    Ok(options)
}

fn log_warnings(warnings: &[ConversionWarning], verbose: bool) {
    if warnings.is_empty() {
        return;
    }

    eprintln!("warning: {} issue(s) detected", warnings.len());
    if verbose {
        for warning in warnings {
            eprintln!(
                "  - {} row={:?} table_id={:?}: {}",
                warning.code.as_str(),
                warning.row,
                warning.table_id,
                warning.message
            );
        }
    }
}

fn run_convert(args: &ConvertArgs) -> Result<ConversionReport> {
    let options = parse_options(&args.format)?;
    convert_file(&args.input, &args.output, &options)
        .with_context(|| format!("failed to convert '{}'", args.input.display()))
}

fn input_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

fn run_batch(args: &BatchArgs) -> Result<usize> {
    let options = parse_options(&args.format)?;
    let inputs = args
        .inputs
        .iter()
        .map(|path| {
            std::fs::read(path)
                .map(|bytes| BatchInput::new(input_name(path), bytes))
                .with_context(|| format!("failed to read '{}'", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let report = convert_batch(&inputs, &options).context("failed to build batch archive")?;
    for file in &report.files {
        match (&file.entry, &file.outcome.error_message) {
            (Some(entry), _) => eprintln!("{} -> {entry}", file.name),
            (None, message) => eprintln!(
                "{} failed: {}",
                file.name,
                message.as_deref().unwrap_or("unknown error")
            ),
        }
        if let Some(conversion) = &file.report {
            log_warnings(&conversion.warnings, args.verbose);
        }
    }

    if report.succeeded() == 0 {
        anyhow::bail!("all {} input(s) failed to convert", report.files.len());
    }
    std::fs::write(&args.output, &report.archive)
        .with_context(|| format!("failed to write '{}'", args.output.display()))?;
    Ok(report.succeeded())
}

fn run_regions(args: &RegionsArgs) -> Result<usize> {
    if !args.delimiter.is_ascii() {
        anyhow::bail!("delimiter must be a single ASCII character");
    }
    let delimiter = u8::try_from(args.delimiter).context("delimiter must be ASCII")?;

    let bytes = std::fs::read(&args.input)
        .with_context(|| format!("failed to read '{}'", args.input.display()))?;
    let (regions, warnings) = analyze_regions(&bytes, Some(&input_name(&args.input)))
        .with_context(|| format!("failed to analyze '{}'", args.input.display()))?;
    log_warnings(&warnings, false);

    match &args.output {
        Some(path) => write_region_csv(path, &regions, delimiter)
            .with_context(|| format!("failed to write '{}'", path.display()))?,
        None => print!("{}", region_csv_string(&regions, delimiter)?),
    }
    Ok(regions.len())
}

fn exit_code(result: Result<bool>) -> ExitCode {
    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(1)
        }
    }
}

fn main() -> ExitCode {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("xlsx2docx=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Convert(args) => exit_code(run_convert(&args).map(|report| {
            log_warnings(&report.warnings, args.verbose);
            !report.is_empty()
        })),
        Commands::Batch(args) => exit_code(run_batch(&args).map(|_| true)),
        Commands::Regions(args) => exit_code(run_regions(&args).map(|count| count > 0)),
    }
}
