use anyhow::{bail, Context, Result};
use clap::Parser;
use dicom_deidentification::codec::DicomCodec;
use dicom_deidentification::config::RuleCatalog;
use dicom_deidentification::lookup::{LookupTables, PATIENT_NAME_TABLE, TAG_TO_NAME_TABLE};
use dicom_deidentification::processor::Deidentifier;
use dicom_deidentification::walker::{WalkOptions, Walker};
use env_logger::Builder;
use log::{error, info, warn, Level, LevelFilter};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// De-identify a DICOM dataset laid out as Dataset/Patient/Exam/Series/Files
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Input dataset directory
    #[arg(short, long, value_name = "INPUT_DIR", env = "DCMDEID_INPUT")]
    input: PathBuf,

    /// Output directory for the de-identified dataset (created if missing)
    #[arg(short, long, value_name = "OUTPUT_DIR", env = "DCMDEID_OUTPUT")]
    output: Option<PathBuf>,

    /// XML rule script describing how to handle each tag
    #[arg(short, long, value_name = "SCRIPT", env = "DCMDEID_RULES")]
    rules: PathBuf,

    /// Lookup table file (default: the file referenced by the script's lookup rules)
    #[arg(short, long, value_name = "FILE", env = "DCMDEID_LOOKUP_TABLE")]
    lookup_table: Option<PathBuf>,

    /// Stop at the first file or patient that cannot be de-identified
    #[arg(long)]
    fail_fast: bool,

    /// Process patients in parallel
    #[arg(long)]
    parallel: bool,

    /// Do not show a progress bar
    #[arg(long)]
    no_progress: bool,

    /// Print the loaded rules as JSON and exit
    #[arg(long)]
    dump_rules: bool,

    /// Show more verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let log_level = if verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Error
    };

    let mut builder = Builder::from_default_env();
    builder
        .format(|buf, record| {
            let level = match record.level() {
                Level::Error => "Error",
                Level::Warn => "Warning",
                Level::Info => "Info",
                Level::Debug => "Debug",
                Level::Trace => "Trace",
            };
            writeln!(buf, "{}: {}", level, record.args())
        })
        .filter(None, log_level);
    builder.init();
}

fn load_tables(catalog: &RuleCatalog, lookup_table: Option<&Path>) -> Result<LookupTables> {
    let Some(path) = lookup_table.or(catalog.lookup_source()) else {
        bail!("no lookup table: the rule script has no lookup rules and --lookup-table is not set");
    };
    info!("using lookup table file {}", path.display());

    let tables = LookupTables::load(path)
        .with_context(|| format!("failed to load lookup table {}", path.display()))?;
    for table in [TAG_TO_NAME_TABLE, PATIENT_NAME_TABLE] {
        if !tables.contains_table(table) {
            warn!("lookup table file {} has no [{}] table", path.display(), table);
        }
    }
    Ok(tables)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let catalog = RuleCatalog::from_file(&args.rules)
        .with_context(|| format!("failed to load rule script {}", args.rules.display()))?;
    info!(
        "using rule script {} with {} rules",
        args.rules.display(),
        catalog.len()
    );

    if args.dump_rules {
        println!("{}", serde_json::to_string_pretty(&catalog)?);
        return Ok(());
    }

    let Some(output) = args.output else {
        bail!("an output directory is required");
    };
    if !args.input.is_dir() {
        bail!("input should be an existing directory");
    }

    let tables = load_tables(&catalog, args.lookup_table.as_deref())?;
    let deidentifier = Deidentifier::new(catalog, tables);

    let options = WalkOptions {
        fail_fast: args.fail_fast,
        parallel: args.parallel,
        progress: !args.no_progress,
    };
    let walker = Walker::new(DicomCodec, &deidentifier, deidentifier.tables()).options(options);

    info!(
        "de-identifying {} into {}",
        args.input.display(),
        output.display()
    );
    let started = Instant::now();
    let report = walker
        .run(&args.input, &output)
        .with_context(|| format!("failed to de-identify {}", args.input.display()))?;
    info!("time elapsed: {:.2?}", started.elapsed());

    if !report.failures.is_empty() {
        for failure in &report.failures {
            error!("{}: {}", failure.path.display(), failure.error);
        }
        bail!(
            "{} of the input files or patients could not be de-identified",
            report.failures.len()
        );
    }

    Ok(())
}
