//! Detection of the CI execution context.

use buildward_config::settings::CiSettings;
use serde::Serialize;

/// Whether the build runs on a CI server, and what that enables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CiContext {
    /// Failed reports are exported only on CI.
    pub is_ci: bool,
    /// Code quality checks run locally, and on CI only when explicitly enabled.
    pub code_quality_enabled: bool,
}

impl CiContext {
    /// A developer machine.
    pub fn local() -> Self {
        Self {
            is_ci: false,
            code_quality_enabled: true,
        }
    }

    /// A CI server with code quality checks left off.
    pub fn ci() -> Self {
        Self {
            is_ci: true,
            code_quality_enabled: false,
        }
    }

    /// Detect the context using `lookup` to resolve environment variable names.
    ///
    /// The marker variable only has to be present; its value is ignored.
    pub fn detect<F>(settings: &CiSettings, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let is_ci = lookup(&settings.marker).is_some();
        let quality_requested = lookup(&settings.code_quality)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));
        Self {
            is_ci,
            code_quality_enabled: !is_ci || quality_requested,
        }
    }

    /// Detect the context from the process environment.
    pub fn from_env(settings: &CiSettings) -> Self {
        Self::detect(settings, |name| {
            std::env::var_os(name).map(|v| v.to_string_lossy().into_owned())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn detect(vars: &[(&str, &str)]) -> CiContext {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        CiContext::detect(&CiSettings::default(), |name| env.get(name).cloned())
    }

    #[test]
    fn no_marker_is_local() {
        assert_eq!(detect(&[]), CiContext::local());
    }

    #[test]
    fn marker_presence_is_enough() {
        assert_eq!(detect(&[("CI", "")]), CiContext::ci());
        assert_eq!(detect(&[("CI", "false")]), CiContext::ci());
    }

    #[test]
    fn code_quality_can_be_enabled_on_ci() {
        let ctx = detect(&[("CI", "true"), ("BUILDWARD_ENABLE_CODE_QUALITY", "TRUE")]);
        assert!(ctx.is_ci);
        assert!(ctx.code_quality_enabled);
    }

    #[test]
    fn code_quality_requires_true() {
        let ctx = detect(&[("CI", "1"), ("BUILDWARD_ENABLE_CODE_QUALITY", "yes")]);
        assert!(!ctx.code_quality_enabled);
    }

    #[test]
    fn custom_marker() {
        let settings = CiSettings {
            marker: "GITHUB_ACTIONS".to_owned(),
            ..CiSettings::default()
        };
        let ctx = CiContext::detect(&settings, |name| {
            (name == "GITHUB_ACTIONS").then(|| "true".to_owned())
        });
        assert!(ctx.is_ci);

        let ctx = CiContext::detect(&settings, |name| (name == "CI").then(String::new));
        assert!(!ctx.is_ci);
    }
}
