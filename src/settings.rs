use std::path::PathBuf;

/// Options recognized by the logging core. Loading these from disk is the
/// host's job; the core only reads them.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// Persist every emitted line to the per-run log file.
    pub logging: bool,
    /// Suppress console printing entirely.
    pub no_console_output: bool,
    /// Expose a debug flag on attached instances.
    pub debug: bool,
    pub version: String,
    /// Only used for the startup message.
    pub world_folder: PathBuf,
}
