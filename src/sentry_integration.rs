//! Optional Sentry error tracking.
//!
//! The returned guard must live as long as the process so queued events
//! are flushed on exit. ERROR-level tracing events reach Sentry through
//! the `sentry-tracing` layer installed by [`crate::logging::init`].

pub fn init(dsn: &str, environment: Option<&str>) -> sentry::ClientInitGuard {
    let dsn = dsn
        .parse()
        .map_err(|e| tracing::warn!(error = %e, "invalid Sentry DSN, error tracking disabled"))
        .ok();

    let guard = sentry::init(sentry::ClientOptions {
        dsn,
        environment: environment.map(|e| e.to_owned().into()),
        release: Some(concat!("detour@", env!("CARGO_PKG_VERSION")).into()),
        attach_stacktrace: true,
        ..Default::default()
    });

    if guard.is_enabled() {
        tracing::info!("Sentry error tracking enabled");
    }
    guard
}
