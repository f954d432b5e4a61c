//! Logging setup and submission spans.
//!
//! Every formkit crate logs under its own target (`formkit_core`,
//! `formkit_validation`, `formkit_forms`). A bare level in
//! [`FormSettings::log_level`] applies to those targets only, so host
//! application dependencies stay at `warn`.

use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

use crate::settings::FormSettings;

const TARGETS: [&str; 4] = ["formkit", "formkit_core", "formkit_validation", "formkit_forms"];

/// Used when `log_level` does not parse.
const FALLBACK_DIRECTIVES: &str = "warn,formkit_forms=info";

/// Expands a log level setting into filter directives.
///
/// A bare level (`"debug"`) is scoped to the formkit targets. Anything
/// containing a target (`"formkit_forms=trace"`) or several directives is
/// used as written.
///
/// # Examples
///
/// ```
/// use formkit_core::logging::filter_directives;
///
/// assert_eq!(
///     filter_directives("debug"),
///     "warn,formkit=debug,formkit_core=debug,formkit_validation=debug,formkit_forms=debug"
/// );
/// assert_eq!(filter_directives("formkit_forms=trace"), "formkit_forms=trace");
/// ```
pub fn filter_directives(log_level: &str) -> String {
    let level = log_level.trim();
    if level.is_empty() {
        return FALLBACK_DIRECTIVES.to_string();
    }
    if level.contains('=') || level.contains(',') {
        return level.to_string();
    }
    let scoped: Vec<String> = TARGETS.iter().map(|t| format!("{t}={level}")).collect();
    format!("warn,{}", scoped.join(","))
}

/// Installs the global subscriber described by `settings`.
///
/// Debug mode prints pretty multi-line events with source locations; otherwise
/// events are JSON lines carrying the current form span. Installing a
/// subscriber twice is a no-op.
pub fn setup_logging(settings: &FormSettings) {
    let filter = EnvFilter::try_new(filter_directives(&settings.log_level))
        .unwrap_or_else(|_| EnvFilter::new(FALLBACK_DIRECTIVES));

    if settings.debug {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .try_init()
            .ok();
    } else {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .try_init()
            .ok();
    }
}

/// Creates a tracing span for one form submission.
///
/// # Examples
///
/// ```
/// use formkit_core::logging::form_span;
///
/// let span = form_span("registration");
/// let _guard = span.enter();
/// tracing::debug!("submitting");
/// ```
pub fn form_span(form_name: &str) -> tracing::Span {
    tracing::debug_span!("form", name = form_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_level_is_scoped_to_formkit() {
        let directives = filter_directives(" info ");
        assert!(directives.starts_with("warn,"));
        assert!(directives.contains("formkit_forms=info"));
        assert!(directives.contains("formkit_validation=info"));
        assert!(EnvFilter::try_new(&directives).is_ok());
    }

    #[test]
    fn test_explicit_directives_pass_through() {
        assert_eq!(filter_directives("warn,formkit_forms=trace"), "warn,formkit_forms=trace");
        assert_eq!(filter_directives(""), FALLBACK_DIRECTIVES);
    }

    #[test]
    fn test_setup_logging_twice_is_harmless() {
        let settings = FormSettings::default();
        setup_logging(&settings);
        setup_logging(&settings);
    }
}
