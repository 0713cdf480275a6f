use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;

/// Install the global subscriber for a run.
///
/// The console gets the per-scenario summaries, or only mismatches and aborts when
/// `quiet`. The log file, when given, always keeps the full record without colour
/// codes so runs can be compared by seed.
pub(crate) fn init(log: Option<&Path>, quiet: bool) -> io::Result<()> {
    let console_level = if quiet {
        LevelFilter::WARN
    } else {
        LevelFilter::INFO
    };
    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(console_level);

    let file = log.map(File::create).transpose()?.map(|file| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(Mutex::new(file))
            .with_filter(LevelFilter::INFO)
    });

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .init();
    Ok(())
}
