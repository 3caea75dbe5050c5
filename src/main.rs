use account_match::config::ReconcileConfig;
use account_match::enrich::Enricher;
use account_match::index::available_countries;
use account_match::models::MatchingStats;
use account_match::pipeline::{Pipeline, PipelineOptions};
use account_match::progress::{format_duration, set_log_only};
use account_match::safety::validate_output_path;
use account_match::store;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "account-match")]
#[command(about = "Reconcile a company list against a CRM directory and build an account plan")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Match the input table for one country and write the account plan
    Run(RunArgs),
    /// List the countries present in the reference directory
    Countries {
        database: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// SQLite database holding input, reference and report tables
    database: PathBuf,

    country: String,

    /// Output database (default: AccountPlan_<country>.sqlite3)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Minimum fuzzy score (0-100)
    #[arg(long)]
    threshold: Option<i64>,

    /// JSON run configuration
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    input_table: Option<String>,

    #[arg(long)]
    name_column: Option<String>,

    #[arg(long, default_value = "0")]
    workers: usize,

    /// Hide progress bars and log progress lines instead
    #[arg(long)]
    log_only: bool,

    /// Attach the top-3 token-set candidates to every resolved name for review
    #[arg(long)]
    suggestions: bool,

    #[arg(long)]
    strip_parentheticals: bool,

    /// Write matching statistics as JSON
    #[arg(long)]
    stats_json: Option<PathBuf>,
}

fn load_config(path: Option<&Path>) -> Result<ReconcileConfig> {
    match path {
        Some(path) => {
            log::info!("Loading config {}", path.display());
            ReconcileConfig::load(path)
        }
        None => Ok(ReconcileConfig::default()),
    }
}

fn open_source(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open source database {}", path.display()))?;
    conn.execute_batch(
        "PRAGMA cache_size = -64000;
         PRAGMA temp_store = MEMORY;",
    )?;
    Ok(conn)
}

fn run(args: RunArgs) -> Result<()> {
    set_log_only(args.log_only);

    if args.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    let mut config = load_config(args.config.as_deref())?;
    if let Some(threshold) = args.threshold {
        config.threshold = threshold;
    }
    if let Some(table) = args.input_table {
        config.input.table = table;
    }
    if let Some(column) = args.name_column {
        config.input.name_column = column;
    }
    config.suggestions |= args.suggestions;
    config.strip_parentheticals |= args.strip_parentheticals;
    config.validate().context("Invalid configuration")?;

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(format!("AccountPlan_{}.sqlite3", args.country)));
    validate_output_path(&output, &[args.database.as_path()])?;

    let start = Instant::now();
    log::info!("Opening source database: {}", args.database.display());
    let source = open_source(&args.database)?;

    let records = store::load_reference(&source, &config.reference, &config.vocabulary()?)?;
    let (input_columns, rows) = store::load_input(&source, &config.input)?;
    let tables = store::load_secondary(&source, &config.secondary_tables())?;
    drop(source);

    let enricher = Enricher::from_tables(&tables, &config.accounts, &config.products)?;
    drop(tables);
    let product_lines: Vec<String> = enricher.product_lines().map(str::to_string).collect();

    let options = PipelineOptions {
        country: args.country.clone(),
        threshold: config.threshold()?,
        strip_parentheticals: config.strip_parentheticals,
        suggestions: config.suggestions,
    };
    let pipeline = Pipeline::new(&records, enricher, options);
    let (results, mut stats) = pipeline.run(&rows);

    if output.exists() {
        std::fs::remove_file(&output).context("Failed to remove existing output file")?;
    }
    log::info!("Creating output database: {}", output.display());
    let mut output_conn = Connection::open(&output).context("Failed to create output database")?;
    store::write_report(&mut output_conn, &input_columns, &product_lines, &results)?;

    stats.elapsed_seconds = start.elapsed().as_secs_f64();
    stats.log_phase("final");
    if let Some(path) = &args.stats_json {
        stats
            .write_to_file(path)
            .with_context(|| format!("Failed to write stats {}", path.display()))?;
    }

    print_summary(&stats, &output, start);
    Ok(())
}

fn print_summary(stats: &MatchingStats, output: &Path, start: Instant) {
    println!("\n{:=<60}", "");
    println!("Account plan for {} complete!", stats.country);
    println!("  Rows:        {}", stats.total_rows);
    println!("  Exact:       {}", stats.exact_matches);
    println!("  Token set:   {}", stats.token_set_matches);
    println!("  Partial:     {}", stats.partial_matches);
    println!("  Not found:   {}", stats.not_found);
    println!("  Failed rows: {}", stats.failed_rows);
    println!("  Match rate:  {:.1}%", stats.match_rate());
    println!("  Output:      {}", output.display());
    println!("  Elapsed:     {}", format_duration(start.elapsed()));
    println!("{:=<60}", "");
}

fn countries(database: &Path, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let source = open_source(database)?;
    let records = store::load_reference(&source, &config.reference, &config.vocabulary()?)?;
    for country in available_countries(&records) {
        println!("{}", country);
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Run(args) => run(args),
        Command::Countries { database, config } => countries(&database, config.as_deref()),
    }
}
