//! Clap command definition.

use clap::{Arg, ArgAction, Command};

/// Build the `stale-handle` command.
pub fn build_cli() -> Command {
    Command::new("stale-handle")
        .about("Check that file handles to deleted files cannot be reopened")
        .long_about(
            "Creates a batch of files in TARGET, captures a file handle for each, \
             deletes them, flushes and drops caches, then tries to reopen every \
             handle. Any handle that still opens is a failure.\n\n\
             Reopening by handle needs CAP_DAC_READ_SEARCH and dropping caches \
             needs root.",
        )
        .arg(
            Arg::new("target")
                .value_name("TARGET")
                .help("Directory on the filesystem under test")
                .required_unless_present("init-config"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .help("Load run parameters from a TOML file"),
        )
        .arg(
            Arg::new("init-config")
                .long("init-config")
                .value_name("FILE")
                .help("Write a commented default config to FILE if it does not exist, then exit")
                .conflicts_with("config"),
        )
        .arg(
            Arg::new("count")
                .long("count")
                .short('n')
                .value_name("N")
                .value_parser(clap::value_parser!(usize))
                .help("Number of test objects (default: 1024)"),
        )
        .arg(
            Arg::new("flush-passes")
                .long("flush-passes")
                .value_name("N")
                .value_parser(clap::value_parser!(u32))
                .help("Barriers issued after deletion (default: 2)"),
        )
        .arg(
            Arg::new("barrier")
                .long("barrier")
                .value_name("SCOPE")
                .value_parser(["global", "filesystem"])
                .help("Flush every filesystem (sync) or only the target (syncfs)"),
        )
        .arg(
            Arg::new("drop-caches")
                .long("drop-caches")
                .value_name("LEVEL")
                .value_parser(clap::value_parser!(u8).range(1..=3))
                .help("Value written to /proc/sys/vm/drop_caches (default: 3)"),
        )
        .arg(
            Arg::new("read-only")
                .long("read-only")
                .help("Reopen handles read-only instead of read-write")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print the run report as JSON")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .help("Emit logs as JSON lines on stderr")
                .action(ArgAction::SetTrue),
        )
}
