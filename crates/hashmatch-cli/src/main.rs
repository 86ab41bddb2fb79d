//! hashmatch: keyed address pseudonymization and private list matching
//!
//! Commands:
//!   hash   -i <in.csv> -o <out.csv>                  - HMAC every address in a list
//!   match  -a <plain.csv> -s <hashed.csv> -o <out>   - find plaintext addresses present in a hashed list
//!   verify <address> <digest>                        - check one address against one digest
//!   key fingerprint                                  - show which key is in use
//!   config show                                      - display the effective configuration

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::info;

use hashmatch_core::config::{HashmatchConfig, RecordErrorMode};
use hashmatch_core::HashmatchError;
use hashmatch_crypto::{Hasher, KeyProvider, KeyResolver};
use hashmatch_pipeline::{hash_file, match_files, PipelineOptions, ProgressFn, RecordReport};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "hashmatch",
    version,
    about = "Address Hash Matcher Tool",
    long_about = "hashmatch: pseudonymize address lists with HMAC-SHA256 and match \
                  plaintext lists against hashed ones without sharing the key"
)]
struct Cli {
    /// Path to hashmatch.toml configuration file
    #[arg(long, short = 'c', default_value = "hashmatch.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides config
    #[arg(long)]
    log: Option<String>,

    /// Log format; overrides config
    #[arg(long)]
    log_format: Option<LogFormat>,

    /// Hide progress bars
    #[arg(long, short = 'q')]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate hashed addresses
    Hash {
        /// Input CSV file with addresses
        #[arg(long, short = 'i')]
        input: PathBuf,
        /// Output CSV file for hashed addresses
        #[arg(long, short = 'o')]
        output: PathBuf,
        #[command(flatten)]
        key: KeyArgs,
        #[command(flatten)]
        records: RecordArgs,
    },

    /// Match addresses with hashed addresses
    Match {
        /// CSV file with original addresses
        #[arg(long, short = 'a')]
        addresses: PathBuf,
        /// CSV file with hashed addresses
        #[arg(long, short = 's')]
        hashed: PathBuf,
        /// Output CSV file for matched addresses
        #[arg(long, short = 'o')]
        output: PathBuf,
        #[command(flatten)]
        key: KeyArgs,
        #[command(flatten)]
        records: RecordArgs,
    },

    /// Check whether a digest belongs to an address under the current key
    Verify {
        /// Plaintext address
        identifier: String,
        /// Hex digest to check against
        digest: String,
        #[command(flatten)]
        key: KeyArgs,
    },

    /// Key management
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug)]
struct KeyArgs {
    /// Secret key string (optional; otherwise the key file is used or created)
    #[arg(long, short = 'k')]
    key: Option<String>,

    /// Key file path (overrides config key.file)
    #[arg(long)]
    key_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RecordArgs {
    /// Zero-based input column holding the addresses (overrides config)
    #[arg(long)]
    column: Option<usize>,

    /// Fail on the first record that cannot be processed instead of skipping it
    #[arg(long)]
    strict: bool,
}

#[derive(Subcommand, Debug)]
enum KeyAction {
    /// Resolve the key (creating the key file if needed) and print its fingerprint
    Fingerprint {
        #[command(flatten)]
        key: KeyArgs,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = HashmatchConfig::load(&cli.config)?;
    init_logging(&cli, &config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "hashmatch starting"
    );

    match cli.command {
        Commands::Hash {
            input,
            output,
            key,
            records,
        } => {
            let config = with_overrides(config, &key, Some(&records));
            cmd_hash(&config, &input, &output, &key, cli.quiet)
        }
        Commands::Match {
            addresses,
            hashed,
            output,
            key,
            records,
        } => {
            let config = with_overrides(config, &key, Some(&records));
            cmd_match(&config, &addresses, &hashed, &output, &key, cli.quiet)
        }
        Commands::Verify {
            identifier,
            digest,
            key,
        } => {
            let config = with_overrides(config, &key, None);
            cmd_verify(&config, &identifier, &digest, &key)
        }
        Commands::Key {
            action: KeyAction::Fingerprint { key },
        } => {
            let config = with_overrides(config, &key, None);
            cmd_key_fingerprint(&config, &key)
        }
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config, &cli.config),
    }
}

/// Typed errors keep their exit code through anyhow context chains.
fn exit_code(e: &anyhow::Error) -> u8 {
    e.chain()
        .find_map(|cause| cause.downcast_ref::<HashmatchError>())
        .map(|h| h.exit_code())
        .and_then(|code| u8::try_from(code).ok())
        .unwrap_or(1)
}

fn with_overrides(
    mut config: HashmatchConfig,
    key: &KeyArgs,
    records: Option<&RecordArgs>,
) -> HashmatchConfig {
    if let Some(path) = &key.key_file {
        config.key.file = path.clone();
    }
    if let Some(records) = records {
        if let Some(column) = records.column {
            config.records.column = column;
        }
        if records.strict {
            config.records.on_record_error = RecordErrorMode::Abort;
        }
    }
    config
}

// ── Logging ───────────────────────────────────────────────────────────────────

fn init_logging(cli: &Cli, config: &HashmatchConfig) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = cli.log.as_deref().unwrap_or(&config.logging.level);
    let format = cli.log_format.clone().unwrap_or(match config.logging.format.as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    });

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── Key resolution ────────────────────────────────────────────────────────────

fn resolve_hasher(config: &HashmatchConfig, key: &KeyArgs) -> Result<Hasher> {
    let resolver = KeyResolver::new(key.key.clone().map(SecretString::from), &config.key.file);
    let secret = resolver
        .resolve()
        .with_context(|| format!("resolving key ({})", resolver.describe()))?;
    info!(
        source = %resolver.describe(),
        fingerprint = %secret.fingerprint(),
        "key resolved"
    );
    Ok(Hasher::new(secret))
}

// ── Progress bar helpers ──────────────────────────────────────────────────────

fn make_progress_bar(prefix: &str, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(0);
    let style = ProgressStyle::with_template("{prefix:.bold} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .map(|s| s.progress_chars("=>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn progress_fn(pb: &ProgressBar) -> ProgressFn {
    let pb = pb.clone();
    Box::new(move |done, total, msg| {
        pb.set_length(total);
        pb.set_position(done);
        pb.set_message(msg.to_string());
    })
}

fn print_skipped(label: &str, report: &RecordReport) {
    if report.is_clean() {
        return;
    }
    println!("  skipped {} record(s) in {label}:", report.skipped());
    for issue in &report.issues {
        println!("    {issue}");
    }
}

// ── `hashmatch hash` ──────────────────────────────────────────────────────────

fn cmd_hash(
    config: &HashmatchConfig,
    input: &Path,
    output: &Path,
    key: &KeyArgs,
    quiet: bool,
) -> Result<()> {
    let hasher = resolve_hasher(config, key)?;
    let opts = PipelineOptions::for_hash(config);

    let pb = make_progress_bar("hash", quiet);
    let progress = progress_fn(&pb);
    let result = hash_file(&hasher, input, output, &opts, Some(&progress));
    pb.finish_and_clear();

    let outcome = result.with_context(|| format!("processing addresses from {}", input.display()))?;

    println!(
        "Successfully processed {} addresses and saved to {}",
        outcome.digests.len(),
        output.display()
    );
    print_skipped(&input.display().to_string(), &outcome.report);
    Ok(())
}

// ── `hashmatch match` ─────────────────────────────────────────────────────────

fn cmd_match(
    config: &HashmatchConfig,
    addresses: &Path,
    hashed: &Path,
    output: &Path,
    key: &KeyArgs,
    quiet: bool,
) -> Result<()> {
    let hasher = resolve_hasher(config, key)?;
    let opts = PipelineOptions::for_match(config);

    let pb = make_progress_bar("match", quiet);
    let progress = progress_fn(&pb);
    let result = match_files(&hasher, addresses, hashed, output, &opts, Some(&progress));
    pb.finish_and_clear();

    let outcome = result.with_context(|| {
        format!(
            "matching {} against {}",
            addresses.display(),
            hashed.display()
        )
    })?;

    println!(
        "Loaded {} addresses from {}",
        outcome.identifiers.read,
        addresses.display()
    );
    println!(
        "Loaded {} hashed addresses from {}",
        outcome.digests.read,
        hashed.display()
    );
    println!(
        "Successfully matched {} addresses and saved to {}",
        outcome.matched.len(),
        output.display()
    );
    print_skipped(&addresses.display().to_string(), &outcome.identifiers);
    print_skipped(&hashed.display().to_string(), &outcome.digests);
    Ok(())
}

// ── `hashmatch verify` ────────────────────────────────────────────────────────

fn cmd_verify(config: &HashmatchConfig, identifier: &str, digest: &str, key: &KeyArgs) -> Result<()> {
    let hasher = resolve_hasher(config, key)?;
    if hasher.verify(identifier, digest) {
        println!("match");
    } else {
        println!("no match");
    }
    Ok(())
}

// ── `hashmatch key fingerprint` ───────────────────────────────────────────────

fn cmd_key_fingerprint(config: &HashmatchConfig, key: &KeyArgs) -> Result<()> {
    let hasher = resolve_hasher(config, key)?;
    println!("{}", hasher.fingerprint());
    Ok(())
}

// ── `hashmatch config show` ───────────────────────────────────────────────────

fn cmd_config_show(config: &HashmatchConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!(
            "# Configuration: defaults (no file at {})",
            config_path.display()
        );
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}
