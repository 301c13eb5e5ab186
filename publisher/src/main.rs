//! Bootstrap publisher CLI entrypoint.
//!
//! Builds the signed launcher manifest for a client bundle and, for
//! `publish`, uploads the output tree with the configured method.

use bootstrap_publisher::cli::{Cli, Command};
use bootstrap_publisher::config::PublisherConfig;
use bootstrap_publisher::dirs::SystemBaseDirs;
use bootstrap_publisher::error::Result;
use bootstrap_publisher::output::write_stderr_line;
use bootstrap_publisher::pipeline::{self, PipelineContext};
use bootstrap_publisher::publish::PublishOutcome;
use bootstrap_publisher::resolver::HttpProbe;
use bootstrap_publisher::signing::generate_keys;
use clap::Parser;
use std::io::Write;
use tracing_subscriber::filter::LevelFilter;

fn main() {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(tracing_level(cli.log_level()))
        .with_writer(std::io::stderr)
        .init();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<()> {
    let config = PublisherConfig::load(&cli.config)?;
    let dirs = SystemBaseDirs;

    if cli.command == Command::GenerateKeys {
        let store = config.store_location(&dirs)?;
        let keys = generate_keys(&store)?;
        let state = if keys.created { "Created" } else { "Found existing" };
        write_stderr_line(stderr, format!("{state} signing key {}", keys.private_key));
        return Ok(());
    }

    let probe = HttpProbe::new(config.resolution.probe_timeout());
    let context = PipelineContext {
        dirs: &dirs,
        probe: &probe,
        show_progress: !cli.quiet,
    };
    if cli.command == Command::Generate {
        pipeline::generate(&config, &cli.artifacts, &context, stderr)?;
        return Ok(());
    }

    let outcome = pipeline::publish(&config, &cli.artifacts, &context, stderr)?;
    report_outcome(&outcome, stderr);
    Ok(())
}

fn report_outcome(outcome: &PublishOutcome, stderr: &mut dyn Write) {
    match outcome {
        PublishOutcome::Uploaded { stored, failed: 0 } => {
            write_stderr_line(stderr, format!("Uploaded {stored} files."));
        }
        PublishOutcome::Uploaded { stored, failed } => {
            write_stderr_line(
                stderr,
                format!("Uploaded {stored} files; {failed} failed, see the log for details."),
            );
        }
        PublishOutcome::Committed { files } => {
            write_stderr_line(stderr, format!("Pushed {} changed files.", files.len()));
        }
        PublishOutcome::NoChanges | PublishOutcome::Skipped => {}
    }
}

const fn tracing_level(level: log::LevelFilter) -> LevelFilter {
    match level {
        log::LevelFilter::Off => LevelFilter::OFF,
        log::LevelFilter::Error => LevelFilter::ERROR,
        log::LevelFilter::Warn => LevelFilter::WARN,
        log::LevelFilter::Info => LevelFilter::INFO,
        log::LevelFilter::Debug => LevelFilter::DEBUG,
        log::LevelFilter::Trace => LevelFilter::TRACE,
    }
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("Error: {err}"));
            1
        }
    }
}
