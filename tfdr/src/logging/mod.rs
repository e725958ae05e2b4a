mod headless;

use anyhow::Result;

pub(crate) struct Options {
    pub verbose: bool,
    /// Level used when not verbose
    pub level: tracing::Level,
    pub color: bool,
}

/// Install the global subscriber. Fails if one is already installed.
pub(crate) fn set_up(options: Options) -> Result<()> {
    headless::set_up(&options)
}
