//! tracing subscriber setup.
//!
//! `RUST_LOG` wins over the configured level. JSON output is meant for
//! deployed workers; the human format for local runs.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::settings::LogSettings;

pub fn init_logging(settings: &LogSettings) -> anyhow::Result<()> {
    let env_filter = build_env_filter(settings);
    let registry = tracing_subscriber::registry().with(env_filter);

    if settings.json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stdout),
            )
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stdout))
            .try_init()?;
    }

    tracing::info!(json = settings.json, level = %settings.level, "logging initialized");
    Ok(())
}

fn build_env_filter(settings: &LogSettings) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // sqlx is chatty at info
        EnvFilter::new(format!(
            "pollq={lvl},pollq_core={lvl},pollq_cli={lvl},sqlx=warn",
            lvl = settings.level
        ))
    })
}
