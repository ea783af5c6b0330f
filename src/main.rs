//! imcache CLI
//!
//! Operational helpers for the local cache layer:
//!
//! - `imcache check --config localcache.yml` validates a settings file and
//!   prints the effective per-cache settings
//! - `imcache parse-presence 2:5:userABC` decodes a presence-change payload

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use imcache::rpccache::{keys, parse_user_online_status};
use imcache::LocalCacheSettings;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Distributed read-through local cache tooling
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON", global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and validate a local cache settings file
    Check {
        /// Path to the YAML settings
        #[arg(long, env = "LOCALCACHE_CONFIG", default_value = "localcache.yml")]
        config: PathBuf,
    },

    /// Parse a presence-change payload
    ParsePresence {
        /// Payload as published on the presence channel
        payload: String,
    },
}

// =============================================================================
// Main
// =============================================================================

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&args);

    match args.command {
        Command::Check { config } => check(&config),
        Command::ParsePresence { payload } => parse_presence(&payload),
    }
}

fn check(path: &Path) -> anyhow::Result<()> {
    let settings = LocalCacheSettings::from_file(path).map_err(|e| {
        error!(path = %path.display(), error = %e, "Invalid local cache settings");
        e
    })?;

    for (name, config) in settings.domains() {
        info!(
            cache = name,
            enabled = config.enable(),
            topic = %config.topic,
            slot_num = config.slot_num,
            slot_size = config.slot_size,
            success_expire = config.success_expire,
            failed_expire = config.failed_expire,
            "Local cache"
        );
    }
    let online = &settings.online;
    info!(
        full_user_cache = online.full_user_cache,
        slot_num = online.slot_num,
        slot_size = online.slot_size,
        success_expire = online.success_expire,
        failed_expire = online.failed_expire,
        channel = keys::ONLINE_CHANNEL,
        "Online cache"
    );

    for route in keys::topic_routes(&settings) {
        println!("{}\t{}", route.topic, route.prefixes.join(","));
    }
    Ok(())
}

fn parse_presence(payload: &str) -> anyhow::Result<()> {
    let (user_id, platform_ids) = parse_user_online_status(payload)
        .with_context(|| format!("Cannot parse presence payload {:?}", payload))?;

    let state = if platform_ids.is_empty() {
        "offline"
    } else {
        "online"
    };
    println!("user_id={} state={} platform_ids={:?}", user_id, state, platform_ids);
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let args = Args::try_parse_from(["imcache", "--log-level", "debug", "parse-presence", "1:u"])
            .unwrap();
        assert_eq!(args.log_level, "debug");
        assert!(matches!(args.command, Command::ParsePresence { ref payload } if payload == "1:u"));

        let args = Args::try_parse_from(["imcache", "check", "--config", "a.yml"]).unwrap();
        assert!(matches!(args.command, Command::Check { ref config } if config == &PathBuf::from("a.yml")));
    }

    #[test]
    fn test_parse_presence_command() {
        assert!(parse_presence("3:userX").is_ok());
        assert!(parse_presence(":").is_err());
    }
}
