//! flowstage CLI: run the case conversion stage over files.
//!
//! Each input file becomes one record. The stage is invoked until the input
//! queue is empty, then the records queued on every relationship are printed.
//! With `--out-dir`, converted content of successful records is written out
//! under each record's `filename`.

mod commands;
mod format;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process;

use clap::ArgMatches;
use flowstage_core::attr;
use flowstage_stage::case_convert::{PROP_CASE, PROP_SUFFIX, REL_SUCCESS};
use flowstage_stage::{CaseConvert, LogLevel, Processor, StageConfig, StageRunner};

use commands::build_cli;
use format::{format_error, format_run, OutputMode, RelationshipOutput};

fn main() {
    let matches = build_cli().get_matches();
    let mode = if matches.get_flag("json") {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    if let Some(path) = matches.get_one::<PathBuf>("init-config") {
        match StageConfig::write_default_if_missing(path) {
            Ok(()) => println!("Configuration ready at {}", path.display()),
            Err(e) => fail(&e, mode),
        }
        return;
    }

    let config = match load_config(&matches) {
        Ok(config) => config,
        Err(e) => fail(e.as_ref(), mode),
    };
    init_logging(&config);

    let runner = match StageRunner::builder(CaseConvert::new()).config(config).build() {
        Ok(runner) => runner,
        Err(e) => fail(&e, mode),
    };

    let files: Vec<&PathBuf> = matches
        .get_many::<PathBuf>("files")
        .map(|files| files.collect())
        .unwrap_or_default();
    for file in files {
        if let Err(e) = enqueue_file(&runner, file) {
            fail(e.as_ref(), mode);
        }
    }

    let threads = matches.get_one::<usize>("threads").copied().unwrap_or(1);
    let report = if threads > 1 {
        runner.run_concurrent(threads)
    } else {
        runner.run_until_empty()
    };

    let mut outputs = Vec::new();
    for relationship in runner.processor().relationships() {
        let mut records = Vec::new();
        for record in runner.output(relationship.name()) {
            match runner.content(&record) {
                Ok(content) => records.push((record, content)),
                Err(e) => fail(&e, mode),
            }
        }
        outputs.push(RelationshipOutput {
            name: relationship.name().to_string(),
            records,
        });
    }

    if let Some(dir) = matches.get_one::<PathBuf>("out-dir") {
        if let Some(success) = outputs.iter().find(|o| o.name == REL_SUCCESS.name()) {
            if let Err(e) = write_outputs(dir, success) {
                fail(&e, mode);
            }
        }
    }

    println!("{}", format_run(&outputs, &report, mode));
    if !report.is_clean() {
        process::exit(1);
    }
}

fn fail(err: &dyn std::error::Error, mode: OutputMode) -> ! {
    eprintln!("{}", format_error(err, mode));
    process::exit(1);
}

/// Configuration file (if any) with command-line overrides applied.
fn load_config(matches: &ArgMatches) -> Result<StageConfig, Box<dyn std::error::Error>> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => StageConfig::from_file(path)?,
        None => StageConfig::default(),
    };
    if let Some(case) = matches.get_one::<String>("case") {
        config.properties.insert(PROP_CASE.to_string(), case.clone());
    }
    if let Some(suffix) = matches.get_one::<String>("suffix") {
        config.properties.insert(PROP_SUFFIX.to_string(), suffix.clone());
    }
    if let Some(names) = matches.get_many::<String>("auto-terminate") {
        for name in names {
            if !config.auto_terminate.contains(name) {
                config.auto_terminate.push(name.clone());
            }
        }
    }
    if let Some(level) = matches.get_one::<String>("log-level") {
        config.log_level = Some(level.parse::<LogLevel>()?);
    }
    Ok(config)
}

fn init_logging(config: &StageConfig) {
    let level = config.log_level.unwrap_or(LogLevel::Warn);
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::from(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn enqueue_file(runner: &StageRunner<CaseConvert>, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let content = std::fs::read(path).map_err(|e| format!("failed to read '{}': {}", path.display(), e))?;
    let mut attributes = BTreeMap::new();
    if let Some(name) = path.file_name() {
        attributes.insert(attr::FILENAME.to_string(), name.to_string_lossy().into_owned());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        attributes.insert(attr::PATH.to_string(), format!("{}/", parent.display()));
    }
    runner.enqueue(attributes, content)?;
    Ok(())
}

fn write_outputs(dir: &Path, output: &RelationshipOutput) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    for (record, content) in &output.records {
        let name = record.attribute(attr::FILENAME).unwrap_or_else(|| record.uuid());
        std::fs::write(dir.join(name), content)?;
    }
    Ok(())
}
