use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::core::config::AppPaths;

const LOG_FILE_PREFIX: &str = "policy-qa.log";

/// `tower_http=debug` surfaces the per-request spans from `TraceLayer`;
/// sqlx statement logging stays quiet unless something is slow or fails.
const DEFAULT_DIRECTIVES: &str = "info,tower_http=debug,sqlx=warn";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Installs stdout plus a daily-rolling `logs/policy-qa.log.<date>` file.
/// `RUST_LOG` replaces the default directives; an unparsable value is
/// reported once logging is up and the defaults are used instead.
pub fn init(paths: &AppPaths) {
    let log_dir = &paths.log_dir;
    let dir_error = std::fs::create_dir_all(log_dir).err();

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    let rust_log = std::env::var("RUST_LOG").ok();
    let (env_filter, filter_error) = build_filter(rust_log.as_deref());

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking);

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .is_ok();

    if !installed {
        return;
    }
    if let Some(err) = dir_error {
        tracing::warn!("Cannot create log dir {}: {}", log_dir.display(), err);
    }
    if let Some(err) = filter_error {
        tracing::warn!("Ignoring RUST_LOG={:?}: {}", rust_log.unwrap_or_default(), err);
    }
    tracing::info!("Writing logs to {}", log_dir.join(LOG_FILE_PREFIX).display());
}

fn build_filter(raw: Option<&str>) -> (EnvFilter, Option<String>) {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        Some(directives) => match EnvFilter::try_new(directives) {
            Ok(filter) => (filter, None),
            Err(err) => (EnvFilter::new(DEFAULT_DIRECTIVES), Some(err.to_string())),
        },
        None => (EnvFilter::new(DEFAULT_DIRECTIVES), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_or_blank_rust_log_uses_defaults() {
        assert!(build_filter(None).1.is_none());
        assert!(build_filter(Some("  ")).1.is_none());
    }

    #[test]
    fn valid_rust_log_is_accepted() {
        let (_, err) = build_filter(Some("policy_qa_backend=debug,warn"));
        assert!(err.is_none());
    }

    #[test]
    fn invalid_rust_log_falls_back_with_reason() {
        let (_, err) = build_filter(Some("policy_qa_backend=loud"));
        assert!(err.is_some());
    }
}
