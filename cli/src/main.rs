use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use extload_bootstrap::{Bootstrap, BootstrapError};
use extload_core::{AcquisitionHint, BootstrapConfig, EnvSnapshot, TemplateContext, run_file};
use extload_fetch::HttpFetcher;
use extload_sqlite::{IN_MEMORY, SessionOptions, SqliteSession};
use tracing_subscriber::EnvFilter;

const PACKAGE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "extload")]
#[command(about = "Bootstrap a native database extension and run templated queries")]
struct Cli {
    /// Log bootstrap progress at debug level to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the version.
    Version,
    /// Bootstrap the extension into a session and run a query file.
    Query(QueryArgs),
}

#[derive(Debug, Args)]
struct QueryArgs {
    /// SQL script to run.
    query: PathBuf,
    /// Database to connect to.
    #[arg(short, long, default_value = IN_MEMORY)]
    database: String,
    /// Template variables substituted into the script.
    #[arg(short, long = "template-args", value_name = "key=value", num_args = 1.., value_parser = parse_key_val)]
    template_args: Vec<(String, String)>,
    /// YAML bootstrap configuration.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Extension name, when no configuration file is given.
    #[arg(long, default_value = "exondb")]
    extension: String,
    /// Extension version to fetch, when no configuration file is given.
    #[arg(long, default_value = PACKAGE_VERSION)]
    extension_version: String,
    /// Install from this local file if it exists, before trying the artifact store.
    #[arg(long, conflicts_with = "source_uri")]
    extension_file: Option<PathBuf>,
    /// Fetch the extension artifact from this URL instead of the artifact store.
    #[arg(long)]
    source_uri: Option<String>,
    /// Extension store directory.
    #[arg(long)]
    extension_dir: Option<PathBuf>,
    /// Overall bootstrap timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,
    /// Open the database read-only.
    #[arg(long)]
    read_only: bool,
    /// Run the query without bootstrapping the extension.
    #[arg(long)]
    no_bootstrap: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Version => {
            println!("{PACKAGE_VERSION}");
            Ok(())
        }
        Command::Query(args) => run_query(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run_query(args: QueryArgs) -> Result<(), String> {
    // The license is checked before the database is opened, so a refused
    // run leaves no files behind.
    let prepared = if args.no_bootstrap {
        None
    } else {
        Some(prepare(&args)?)
    };

    let mut options = SessionOptions::default()
        .database(&args.database)
        .read_only(args.read_only);
    if let Some(dir) = &args.extension_dir {
        options = options.extension_dir(dir);
    }
    let mut session = SqliteSession::connect(options)
        .map_err(|e| format!("Failed to open database '{}': {e}", args.database))?;

    if let Some((config, env)) = &prepared {
        bootstrap(&args, config, env, &mut session)?;
    }

    let vars: TemplateContext = args.template_args.into_iter().collect();
    let output = run_file(&mut session, &args.query, &vars).map_err(|e| e.to_string())?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for row in output.json_rows() {
        writeln!(out, "{row}").map_err(|e| format!("Failed to write output: {e}"))?;
    }
    Ok(())
}

/// Loads the configuration and captures the environment, failing on a
/// missing license marker.
fn prepare(args: &QueryArgs) -> Result<(BootstrapConfig, EnvSnapshot), String> {
    let config = match &args.config {
        Some(path) => BootstrapConfig::load(path)
            .map_err(|e| format!("Failed to load config '{}': {e}", path.display()))?,
        None => BootstrapConfig::new(&args.extension, &args.extension_version),
    };
    let env = EnvSnapshot::capture(config.env_keys());
    env.require_license()
        .map_err(|e| describe(BootstrapError::from(e)))?;
    Ok((config, env))
}

fn bootstrap(
    args: &QueryArgs,
    config: &BootstrapConfig,
    env: &EnvSnapshot,
    session: &mut SqliteSession,
) -> Result<(), String> {
    let hint = match (&args.extension_file, &args.source_uri) {
        (Some(path), _) => AcquisitionHint::ProvidedFile(path.clone()),
        (None, Some(url)) => AcquisitionHint::SourceUri(url.clone()),
        (None, None) => AcquisitionHint::None,
    };
    let fetcher =
        HttpFetcher::new().map_err(|e| format!("Failed to initialise HTTP client: {e}"))?;

    let mut bootstrap = Bootstrap::new(config, env, &fetcher);
    if let Some(secs) = args.timeout {
        bootstrap = bootstrap.with_timeout(Some(Duration::from_secs(secs)));
    }
    let loaded = bootstrap.run(session, &hint).map_err(describe)?;
    tracing::info!(name = %loaded.name, via = %loaded.via, "extension ready");
    Ok(())
}

fn describe(err: BootstrapError) -> String {
    format!("{err}\nhint: {}", err.remediation())
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}
