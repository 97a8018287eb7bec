use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt;

/// Installs the stderr subscriber: warnings by default, everything down to
/// `debug` with `--verbose`.
pub fn init(verbose: bool) -> Result<()> {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let _ = fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(verbose)
        .try_init();
    Ok(())
}
