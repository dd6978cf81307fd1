//! gh-mcp CLI entrypoint.
//!
//! This binary verifies, stages, and runs the bundled github-mcp-server,
//! forwarding the caller's standard streams to it. All diagnostics go to
//! stderr; stdout belongs to the wrapped server.

use clap::Parser;
use gh_mcp::auth::{EnvCredentialSource, resolve_credentials};
use gh_mcp::child_env::validate_env_value;
use gh_mcp::cli::Cli;
use gh_mcp::dirs::SystemBaseDirs;
use gh_mcp::error::Result;
use gh_mcp::server::run_bundled_server;
use gh_mcp::shutdown::{ShutdownToken, install_signal_handlers};
use std::io::Write;

/// Server-side variables forwarded into the required environment when set.
const PASSTHROUGH_ENV_KEYS: &[&str] = &[
    "GITHUB_TOOLSETS",
    "GITHUB_TOOLS",
    "GITHUB_DYNAMIC_TOOLSETS",
    "GITHUB_READ_ONLY",
    "GITHUB_LOCKDOWN_MODE",
];

fn main() {
    let _cli = Cli::parse();
    init_logging();

    let mut stderr = std::io::stderr();
    let exit_code = exit_code_for_run_result(run(), &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run() -> Result<()> {
    let token = ShutdownToken::new();
    install_signal_handlers(&token)?;

    let required = required_env()?;
    run_bundled_server(&required, &token, &SystemBaseDirs)
}

/// Resolve credentials and passthrough variables into the required child
/// environment, validating every value before it crosses the process
/// boundary.
fn required_env() -> Result<Vec<(String, String)>> {
    let credentials = resolve_credentials(&EnvCredentialSource)?;
    validate_env_value("GITHUB_PERSONAL_ACCESS_TOKEN", &credentials.token)?;
    validate_env_value("GITHUB_HOST", &credentials.host_url)?;

    let mut required = vec![
        (
            "GITHUB_PERSONAL_ACCESS_TOKEN".to_owned(),
            credentials.token,
        ),
        ("GITHUB_HOST".to_owned(), credentials.host_url),
    ];

    for key in PASSTHROUGH_ENV_KEYS {
        if let Ok(value) = std::env::var(key) {
            validate_env_value(key, &value)?;
            required.push(((*key).to_owned(), value));
        }
    }

    Ok(required)
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            if writeln!(stderr, "gh-mcp: {err}").is_err() {
                // Best-effort reporting; ignore write failures.
            }
            1
        }
    }
}

/// Minimal stderr logger honouring `LOG_LEVEL` (default `info`).
struct StderrLogger {
    max_level: log::LevelFilter,
}

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &log::Record<'_>) {
        if self.enabled(record.metadata()) {
            eprintln!("gh-mcp: [{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

fn init_logging() {
    let level = configured_level(std::env::var("LOG_LEVEL").ok().as_deref());
    static LOGGER: std::sync::OnceLock<StderrLogger> = std::sync::OnceLock::new();
    let logger = LOGGER.get_or_init(|| StderrLogger { max_level: level });
    if log::set_logger(logger).is_ok() {
        log::set_max_level(level);
    }
}

fn configured_level(raw: Option<&str>) -> log::LevelFilter {
    raw.and_then(|value| value.parse().ok())
        .unwrap_or(log::LevelFilter::Info)
}
