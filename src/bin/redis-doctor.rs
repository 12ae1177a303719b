//! redis-doctor - diagnose big keys, hot keys and slow commands.
//!
//! Usage:
//!   redis-doctor -s bigkey -l 1048576          # keys serialized to 1 MiB or more
//!   redis-doctor -s bigkey -t hash -c 10000    # hashes with 10k fields or more
//!   redis-doctor -s hotkey --frequency 100     # keys with an LFU counter of 100+
//!   redis-doctor -s slowlog --limit 50 -f json # latest 50 slow log entries
//!
//! Records go to stdout, logs to stderr.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::io;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;

use redis_doctor::cancel::CancelToken;
use redis_doctor::client::RedisClient;
use redis_doctor::config::{CLIENT_NAME, ConnectionConfig};
use redis_doctor::doctor::{DiagnoseOptions, Doctor, Symptom};
use redis_doctor::error::DoctorError;
use redis_doctor::model::KeyType;
use redis_doctor::output::{OutputFormat, new_visitor};

/// Diagnose big keys, hot keys and slow commands on a redis server.
#[derive(Parser)]
#[command(name = "redis-doctor", about = "Redis diagnosis tool", version)]
struct Args {
    /// Server host.
    #[arg(long, env = "REDIS_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Server port.
    #[arg(short, long, env = "REDIS_PORT", default_value = "6379")]
    port: u16,

    /// Logical database index.
    #[arg(short = 'n', long, default_value = "0")]
    db: i64,

    /// ACL user name.
    #[arg(short, long, env = "REDIS_USER")]
    user: Option<String>,

    /// Password.
    #[arg(long, env = "REDIS_PASSWORD", hide_env_values = true)]
    pass: Option<String>,

    /// What to diagnose: bigkey, hotkey or slowlog.
    #[arg(short, long)]
    symptom: String,

    /// Key glob pattern.
    #[arg(long, default_value = "*")]
    pattern: String,

    /// Only scan keys of this type (string, list, hash, set, zset).
    #[arg(short = 't', long = "type", value_parser = parse_key_type)]
    key_type: Option<KeyType>,

    /// Serialized length threshold in bytes. Takes precedence over --cardinality.
    #[arg(short, long, default_value = "0")]
    length: u64,

    /// Element count threshold.
    #[arg(short, long, default_value = "0")]
    cardinality: u64,

    /// LFU access frequency threshold (hotkey).
    #[arg(long, default_value = "0")]
    frequency: u64,

    /// Keys per batch.
    #[arg(short, long, default_value = "10")]
    batch: usize,

    /// Maximum number of records.
    #[arg(long, default_value = "10")]
    limit: usize,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// Timeout in seconds for connecting and for each round trip. At least 1.
    #[arg(long, default_value = "5", value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// Abort the whole run after this many seconds.
    #[arg(long)]
    deadline: Option<u64>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace). Default is warn.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

fn parse_key_type(s: &str) -> Result<KeyType, String> {
    s.parse().map_err(|e: DoctorError| e.to_string())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN, // stdout carries records
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), DoctorError> {
    // Reject bad input before connecting.
    let symptom: Symptom = args.symptom.parse()?;
    let opts = DiagnoseOptions {
        pattern: args.pattern,
        key_type: args.key_type,
        length: args.length,
        cardinality: args.cardinality,
        frequency: args.frequency,
        batch: args.batch,
        limit: args.limit,
    };
    opts.validate()?;

    let config = ConnectionConfig {
        host: args.host,
        port: args.port,
        db: args.db,
        username: args.user,
        password: args.pass,
        client_name: CLIENT_NAME.to_string(),
        timeout: Duration::from_secs(args.timeout),
    };

    let cancel = match args.deadline {
        Some(secs) => CancelToken::with_timeout(Duration::from_secs(secs)),
        None => CancelToken::new(),
    };
    let handle = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received interrupt, stopping");
        handle.cancel();
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let client = RedisClient::connect(&config)?;
    let mut doctor = Doctor::new(client).with_cancel(cancel);

    let stdout = io::stdout();
    let mut visitor = new_visitor(args.format, stdout.lock());
    // Finish even after a failure so partial output stays well formed.
    let result = doctor.run(symptom, &opts, visitor.as_mut());
    let finished = visitor.finish();

    let emitted = result?;
    finished?;
    info!("{} records written", emitted);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_must_be_positive() {
        let err = Args::try_parse_from(["redis-doctor", "-s", "bigkey", "--timeout", "0"]);
        assert!(err.is_err());

        let args = Args::try_parse_from(["redis-doctor", "-s", "bigkey", "--timeout", "2"]).unwrap();
        assert_eq!(args.timeout, 2);
        let args = Args::try_parse_from(["redis-doctor", "-s", "bigkey"]).unwrap();
        assert_eq!(args.timeout, 5);
    }
}
