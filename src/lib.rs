//! finddupe - duplicate file elimination
//!
//! Walks one or more trees strictly in order, groups files by a cheap
//! signature of their first 32 KiB and their length, confirms every match
//! byte for byte, and then reports, deletes, hard-links, or scripts the
//! duplicate. The first file seen is always the one kept.

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::fs::File;
use std::io::{self, IsTerminal};

use anyhow::Context;

use crate::actions::Mode;
use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::duplicates::{EngineConfig, ScanSession};
use crate::error::ExitCode;
use crate::output::{JsonReport, ScriptWriter};
use crate::progress::Progress;
use crate::scanner::WalkerConfig;

/// Run one invocation of the CLI.
///
/// # Errors
///
/// Returns an error for invalid configuration, a script that cannot be
/// created, an interrupted scan, a failed elimination, or a run that found
/// no files at all.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color || !io::stdout().is_terminal() {
        yansi::disable();
    }

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let mode = cli.mode();
    let mut engine = engine_config(&cli, &config, mode);

    let script = match &cli.script {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create script: {}", path.display()))?;
            let mut writer =
                ScriptWriter::new(file, cli.script_type.unwrap_or(config.script_type));
            writer
                .write_header()
                .with_context(|| format!("Failed to write script: {}", path.display()))?;
            engine.walker = engine.walker.with_excluded(path.clone());
            Some(writer)
        }
        None => None,
    };

    let text = cli.output == OutputFormat::Text;
    let show_spinner = config.show_progress
        && !cli.no_progress
        && !cli.quiet
        && !cli.print_sigs
        && io::stderr().is_terminal();
    let progress = Progress::new(show_spinner)
        .with_listing(text && !cli.quiet && mode != Mode::DiscoverHardlinks)
        .with_signatures(cli.print_sigs);

    let handler = signal::install_handler().context("Failed to install Ctrl+C handler")?;

    let mut session: ScanSession = ScanSession::new(engine)?
        .with_progress(Box::new(progress))
        .with_shutdown_flag(handler.get_flag());
    if let Some(writer) = script {
        session = session.with_script(writer);
    }

    // References go first regardless of where --ref was given.
    for path in &cli.reference_paths {
        session.scan_reference(path)?;
    }
    for path in &cli.paths {
        session.scan_path(path)?;
    }
    let report = session.finish()?;

    if report.summary.total_files == 0 && mode != Mode::DiscoverHardlinks {
        anyhow::bail!("No files to process");
    }

    let exit_code = ExitCode::for_summary(&report.summary);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.output {
        OutputFormat::Json => {
            JsonReport::new(&report.summary, &report.hardlink_groups, exit_code)
                .write_to(&mut out)
                .context("Failed to write JSON output")?;
        }
        OutputFormat::Text if cli.quiet => {}
        OutputFormat::Text => {
            let written = if mode == Mode::DiscoverHardlinks {
                output::write_hardlink_groups(&mut out, &report.hardlink_groups, &report.summary)
            } else {
                output::write_text(&mut out, &report.summary, mode)
            };
            written.context("Failed to write summary")?;
        }
    }
    if let Some(path) = &cli.script {
        log::info!(
            "{} commands written to '{}'",
            report.summary.eliminated_files,
            path.display()
        );
    }

    Ok(exit_code)
}

/// Merge the persistent config with the command-line flags.
fn engine_config(cli: &Cli, config: &Config, mode: Mode) -> EngineConfig {
    let walker = WalkerConfig::default()
        .with_follow_links(cli.follow_links || config.follow_links)
        .with_ignore_patterns(cli.ignore_patterns.clone());
    EngineConfig::new(mode)
        .with_skip_zero_length(config.skip_zero_length && !cli.keep_empty)
        .with_allow_readonly(cli.readonly || (config.allow_readonly && mode.remedy().is_some()))
        .with_link_limit(cli.link_limit.unwrap_or(config.link_limit))
        .with_hide_unreadable_warning(cli.hide_unreadable || config.hide_unreadable_warning)
        .with_walker_config(walker)
}
