//! `stale-handle`: stale file-handle check for Linux filesystems.
//!
//! Usage: `stale-handle [flags] TARGET`
//!
//! Exit status is 0 when every handle to a deleted file was rejected, and 1
//! on any failure: a handle that reopened, an unexpected error, a setup
//! error, or bad arguments.

mod commands;
mod format;
mod parse;

use std::path::Path;
use std::process;

use stalefh_harness::{HarnessConfig, HarnessError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::build_cli;
use format::{format_error, format_report, OutputMode};
use parse::{matches_to_options, RunOptions};

fn main() {
    let matches = match build_cli().try_get_matches() {
        Ok(matches) => matches,
        Err(e) if !e.use_stderr() => {
            // --help / --version
            let _ = e.print();
            process::exit(0);
        }
        Err(e) => {
            let _ = e.print();
            process::exit(1);
        }
    };

    // Handle `--init-config` before touching any target.
    if let Some(path) = matches.get_one::<String>("init-config") {
        process::exit(init_config(Path::new(path)));
    }

    let options = match matches_to_options(&matches) {
        Ok(options) => options,
        Err(e) => {
            init_tracing(matches.get_flag("log-json"));
            let mode = if matches.get_flag("json") {
                OutputMode::Json
            } else {
                OutputMode::Human
            };
            eprintln!("{}", format_error(&HarnessError::from(e), mode));
            process::exit(1);
        }
    };

    init_tracing(options.log_json);
    process::exit(run(options));
}

fn init_config(path: &Path) -> i32 {
    match HarnessConfig::write_default_if_missing(path) {
        Ok(true) => {
            println!("Wrote default config to {}", path.display());
            0
        }
        Ok(false) => {
            println!("Config {} already exists, left unchanged", path.display());
            0
        }
        Err(e) => {
            eprintln!("(error) {}", e);
            1
        }
    }
}

/// Logs go to stderr so the report on stdout stays machine-readable.
fn init_tracing(log_json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[cfg(target_os = "linux")]
fn run(options: RunOptions) -> i32 {
    use stalefh_harness::Harness;
    use stalefh_platform::Collaborators;

    let RunOptions {
        target,
        config,
        output,
        ..
    } = options;
    let collaborators = Collaborators::linux(config.barrier, config.drop_caches);

    let result = Harness::new(config, collaborators)
        .map_err(HarnessError::from)
        .and_then(|harness| harness.run(&target).map_err(HarnessError::from));

    match result {
        Ok(report) => {
            println!("{}", format_report(&report, output));
            report.verdict().exit_code()
        }
        Err(e) => {
            tracing::error!(target: "stalefh::harness", error = %e, "Run aborted");
            eprintln!("{}", format_error(&e, output));
            1
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn run(_options: RunOptions) -> i32 {
    eprintln!("stale-handle requires Linux (name_to_handle_at / open_by_handle_at)");
    1
}
