use anyhow::Result;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{format::FmtSpan, Layer as FmtLayer},
    layer::SubscriberExt as _,
    Registry,
};

/// Logs to stderr, keeping stdout for command output.
pub(super) fn set_up(options: &super::Options) -> Result<()> {
    let level = if options.verbose {
        eprintln!("setting up verbose logging");
        tracing::Level::TRACE
    } else {
        options.level
    };

    let span_events = if options.verbose {
        // include enter/exit events for detailed tracing
        FmtSpan::FULL
    } else {
        // announce what we do and when we're done
        FmtSpan::NEW | FmtSpan::CLOSE
    };

    let fmt_layer = FmtLayer::new()
        .with_writer(std::io::stderr)
        .with_span_events(span_events)
        .with_ansi(options.color);
    let subscriber = Registry::default()
        .with(LevelFilter::from_level(level))
        .with(fmt_layer);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("failed to set up tracing: {}", e))?;

    Ok(())
}
