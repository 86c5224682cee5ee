pub mod associate;
pub mod encode;
pub mod locate;
pub mod strip;

use clap::Args;
use shortlog_core::ScanConfig;

/// Window options shared by the scanning commands.
#[derive(Args, Debug, Clone, Default)]
pub struct WindowArgs {
    /// Size of the tail window in KiB. Overrides config and environment.
    #[arg(long, value_name = "KB")]
    pub tail_kb: Option<u32>,

    /// Disable chunk-boundary bridging (reproduces the legacy scanner).
    #[arg(long)]
    pub no_bridge: bool,
}

impl WindowArgs {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply(&self, base: &ScanConfig) -> ScanConfig {
        let mut config = base.clone();
        if let Some(tail_kb) = self.tail_kb {
            config.tail_kb = tail_kb;
        }
        if self.no_bridge {
            config.bridge_chunk_boundaries = false;
        }
        config
    }
}

/// Escape control characters so notes stay visible on a terminal.
pub fn visible(text: &str) -> String {
    text.escape_debug().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_apply_on_top_of_config() {
        let base = ScanConfig::default();
        let args = WindowArgs {
            tail_kb: Some(4),
            no_bridge: true,
        };
        let config = args.apply(&base);
        assert_eq!(config.tail_kb, 4);
        assert!(!config.bridge_chunk_boundaries);
        assert_eq!(config.chunk_size, base.chunk_size);
    }

    #[test]
    fn no_overrides_keep_config() {
        let base = ScanConfig::default();
        assert_eq!(WindowArgs::default().apply(&base), base);
    }

    #[test]
    fn visible_escapes_note_framing() {
        assert_eq!(visible("\u{1b}[8mha:x\u{1b}[0m"), "\\u{1b}[8mha:x\\u{1b}[0m");
    }
}
