//! ArgMatches → run options.
//!
//! The harness configuration is built in layers: defaults, then the
//! `--config` file if one was given, then individual flags.

use std::path::{Path, PathBuf};

use clap::ArgMatches;
use stalefh_core::{AccessMode, BarrierScope};
use stalefh_harness::{ConfigError, HarnessConfig};

use crate::format::OutputMode;

/// Everything `main` needs to execute one run.
#[derive(Debug)]
pub struct RunOptions {
    pub target: PathBuf,
    pub config: HarnessConfig,
    pub output: OutputMode,
    pub log_json: bool,
}

/// Translate parsed arguments into run options.
///
/// The resulting configuration has been validated.
pub fn matches_to_options(matches: &ArgMatches) -> Result<RunOptions, ConfigError> {
    let target = matches
        .get_one::<String>("target")
        .map(PathBuf::from)
        .unwrap_or_default();

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => HarnessConfig::from_file(Path::new(path))?,
        None => HarnessConfig::default(),
    };
    apply_overrides(&mut config, matches);
    config.validate()?;

    let output = if matches.get_flag("json") {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    Ok(RunOptions {
        target,
        config,
        output,
        log_json: matches.get_flag("log-json"),
    })
}

fn apply_overrides(config: &mut HarnessConfig, matches: &ArgMatches) {
    if let Some(count) = matches.get_one::<usize>("count") {
        config.object_count = *count;
    }
    if let Some(passes) = matches.get_one::<u32>("flush-passes") {
        config.flush_passes = *passes;
    }
    if let Some(scope) = matches.get_one::<String>("barrier") {
        config.barrier = match scope.as_str() {
            "filesystem" => BarrierScope::Filesystem,
            _ => BarrierScope::Global,
        };
    }
    if let Some(level) = matches.get_one::<u8>("drop-caches") {
        config.drop_caches = *level;
    }
    if matches.get_flag("read-only") {
        config.reopen_access = AccessMode::ReadOnly;
    }
}
