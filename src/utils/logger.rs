use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("frame_pipes=debug,info")
        } else {
            EnvFilter::new("frame_pipes=info")
        }
    })
}

/// 初始化全域 tracing subscriber。重複呼叫時保留第一次的設定。
pub fn init_logger(verbose: bool, format: LogFormat) {
    init_with_filter(default_filter(verbose), format);
}

/// Uses an explicit filter directive such as `frame_pipes=trace`.
pub fn init_logger_with_level(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| default_filter(false));
    init_with_filter(filter, format);
}

fn init_with_filter(filter: EnvFilter, format: LogFormat) {
    let registry = tracing_subscriber::registry().with(filter);

    let result = match format {
        LogFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .compact(),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .json(),
            )
            .try_init(),
    };

    if result.is_err() {
        tracing::debug!("Global subscriber already set, keeping it");
    }
}
