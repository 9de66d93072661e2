//! Clap command tree definition.

use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;

/// Build the complete CLI command tree.
pub fn build_cli() -> Command {
    Command::new("flowstage")
        .about("Run the case conversion stage over files")
        .arg(
            Arg::new("files")
                .help("Input files, one record each")
                .value_parser(value_parser!(PathBuf))
                .num_args(1..)
                .required_unless_present("init-config"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Stage configuration file (flowstage.toml)")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("init-config")
                .long("init-config")
                .help("Write a default configuration file to PATH and exit")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .conflicts_with("config"),
        )
        .arg(
            Arg::new("case")
                .long("case")
                .help("Case mode, overrides the configuration")
                .value_parser(["upper", "lower", "preserve"]),
        )
        .arg(
            Arg::new("suffix")
                .long("suffix")
                .help("Text appended to converted content"),
        )
        .arg(
            Arg::new("auto-terminate")
                .long("auto-terminate")
                .help("Drop records routed to RELATIONSHIP (repeatable)")
                .value_name("RELATIONSHIP")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .short('j')
                .help("Concurrent invocations (default: 1)")
                .value_parser(value_parser!(usize))
                .default_value("1"),
        )
        .arg(
            Arg::new("out-dir")
                .long("out-dir")
                .short('o')
                .help("Write converted content of successful records into DIR")
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .help("Log level: trace, debug, info, warn, error (default: warn)"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("JSON output mode")
                .action(ArgAction::SetTrue),
        )
}
