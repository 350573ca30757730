//! Check that a property has the same value in every property file.
//!
//! Two builds sharing a machine (the main build and its build-logic build,
//! or CI and an IDE) reuse one daemon only when their daemon JVM arguments
//! match textually. A missing property counts as a value of its own: two
//! files that both omit it agree, one that omits it disagrees with one that
//! sets it.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use buildward_config::settings::DaemonSettings;
use buildward_config::PropertyFile;

use crate::error::EngineError;

/// The value of the watched property in one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedValue {
    pub path: PathBuf,
    /// `None` when the file does not define the property.
    pub value: Option<String>,
}

/// Outcome of a successful consistency check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyReport {
    pub key: String,
    pub observed: Vec<ObservedValue>,
}

impl ConsistencyReport {
    /// The single agreed value, or `None` if every file omits the property.
    pub fn agreed_value(&self) -> Option<&str> {
        self.observed.first().and_then(|o| o.value.as_deref())
    }
}

/// Load every file in `files` and require `key` to have one distinct value across them.
///
/// # Errors
/// Returns `EngineError::Properties` if a file cannot be loaded, and
/// `EngineError::ConfigurationMismatch` naming every file when the values differ.
pub fn check_same_property(key: &str, files: &[PathBuf]) -> Result<ConsistencyReport, EngineError> {
    let mut observed = Vec::with_capacity(files.len());
    for path in files {
        let properties = PropertyFile::from_path(path)?;
        let value = properties.get(key).map(str::to_owned);
        tracing::debug!(path = %path.display(), key, value = ?value, "read property");
        observed.push(ObservedValue {
            path: path.clone(),
            value,
        });
    }

    let distinct: BTreeSet<Option<&str>> = observed.iter().map(|o| o.value.as_deref()).collect();
    if distinct.len() > 1 {
        return Err(EngineError::ConfigurationMismatch {
            key: key.to_owned(),
            files: observed
                .iter()
                .map(|o| o.path.display().to_string())
                .collect(),
            values: observed.into_iter().map(|o| o.value).collect(),
        });
    }

    Ok(ConsistencyReport {
        key: key.to_owned(),
        observed,
    })
}

/// Run the daemon-argument check configured in `settings`, resolving files against `root`.
///
/// # Errors
/// Returns an error if a property file cannot be loaded or the values differ.
pub fn check_same_daemon_args(
    root: &Path,
    settings: &DaemonSettings,
) -> Result<ConsistencyReport, EngineError> {
    let files: Vec<PathBuf> = settings.files.iter().map(|f| root.join(f)).collect();
    check_same_property(&settings.key, &files)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use super::*;

    const KEY: &str = "org.gradle.jvmargs";

    /// Lay out a root build with a nested `buildSrc`, each with its own `gradle.properties`.
    fn layout(root_props: &str, build_src_props: &str) -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let build_src = tmp.path().join("buildSrc");
        fs::create_dir_all(&build_src).unwrap();
        fs::write(tmp.path().join("gradle.properties"), root_props).unwrap();
        fs::write(build_src.join("gradle.properties"), build_src_props).unwrap();
        (tmp, build_src)
    }

    #[test]
    fn matching_values_pass() {
        let (_tmp, build_src) = layout(
            "org.gradle.jvmargs=-Xmx2g\norg.gradle.parallel=true\n",
            "org.gradle.jvmargs=-Xmx2g\n",
        );
        let report = check_same_daemon_args(&build_src, &DaemonSettings::default()).unwrap();
        assert_eq!(report.agreed_value(), Some("-Xmx2g"));
        assert_eq!(report.observed.len(), 2);
    }

    #[test]
    fn same_value_different_layout_passes() {
        let (_tmp, build_src) = layout(
            "org.gradle.jvmargs = -Xmx2g \\\n    -Dfile.encoding=UTF-8\n",
            "org.gradle.jvmargs:-Xmx2g -Dfile.encoding=UTF-8\n",
        );
        assert!(check_same_daemon_args(&build_src, &DaemonSettings::default()).is_ok());
    }

    #[test]
    fn both_absent_pass() {
        let (_tmp, build_src) = layout("org.gradle.caching=true\n", "");
        let report = check_same_daemon_args(&build_src, &DaemonSettings::default()).unwrap();
        assert_eq!(report.agreed_value(), None);
    }

    #[test]
    fn differing_values_fail_naming_both_files() {
        let (_tmp, build_src) = layout(
            "org.gradle.jvmargs=-Xmx4g\n",
            "org.gradle.jvmargs=-Xmx2g\n",
        );
        let err = check_same_daemon_args(&build_src, &DaemonSettings::default()).unwrap_err();

        match &err {
            EngineError::ConfigurationMismatch { key, files, values } => {
                assert_eq!(key, KEY);
                assert_eq!(files.len(), 2);
                assert_eq!(
                    values,
                    &vec![Some("-Xmx2g".to_owned()), Some("-Xmx4g".to_owned())]
                );
            }
            other => panic!("expected ConfigurationMismatch, got {other:?}"),
        }

        let message = err.to_string();
        let build_src_file = build_src.join("gradle.properties").display().to_string();
        let root_file = build_src.join("../gradle.properties").display().to_string();
        assert!(message.contains(&build_src_file), "message was: {message}");
        assert!(message.contains(&root_file), "message was: {message}");
        assert!(message.contains(KEY), "message was: {message}");
        assert!(message.contains("Use the same"), "message was: {message}");
    }

    #[test]
    fn present_in_only_one_fails() {
        let (_tmp, build_src) = layout("org.gradle.jvmargs=-Xmx2g\n", "org.gradle.caching=true\n");
        let err = check_same_daemon_args(&build_src, &DaemonSettings::default()).unwrap_err();
        assert!(
            matches!(err, EngineError::ConfigurationMismatch { ref values, .. } if values.contains(&None))
        );
    }

    #[test]
    fn whitespace_difference_is_a_mismatch() {
        let (_tmp, build_src) = layout(
            "org.gradle.jvmargs=-Xmx2g  -Dx=1\n",
            "org.gradle.jvmargs=-Xmx2g -Dx=1\n",
        );
        assert!(check_same_daemon_args(&build_src, &DaemonSettings::default()).is_err());
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("gradle.properties"), "org.gradle.jvmargs=-Xmx2g\n").unwrap();
        let err = check_same_property(
            KEY,
            &[
                tmp.path().join("gradle.properties"),
                tmp.path().join("absent.properties"),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Properties(_)), "got {err:?}");
    }

    #[test]
    fn custom_key_and_three_files() {
        let tmp = tempfile::tempdir().unwrap();
        let files: Vec<PathBuf> = ["a", "b", "c"]
            .iter()
            .map(|name| {
                let path = tmp.path().join(format!("{name}.properties"));
                fs::write(&path, "org.gradle.workers.max=4\n").unwrap();
                path
            })
            .collect();
        let report = check_same_property("org.gradle.workers.max", &files).unwrap();
        assert_eq!(report.agreed_value(), Some("4"));

        fs::write(files.get(2).unwrap(), "org.gradle.workers.max=8\n").unwrap();
        let err = check_same_property("org.gradle.workers.max", &files).unwrap_err();
        assert!(err.to_string().contains("c.properties"));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            #[allow(clippy::unwrap_used)]
            fn passes_exactly_when_values_agree(
                a in proptest::option::of("-Xmx[0-9]{1,2}[mg]"),
                b in proptest::option::of("-Xmx[0-9]{1,2}[mg]"),
            ) {
                let render = |v: &Option<String>| match v {
                    Some(v) => format!("org.gradle.jvmargs={v}\n"),
                    None => "org.gradle.daemon=true\n".to_owned(),
                };
                let (_tmp, build_src) = layout(&render(&a), &render(&b));
                let result = check_same_daemon_args(&build_src, &DaemonSettings::default());
                prop_assert_eq!(result.is_ok(), a == b);
            }
        }
    }
}
