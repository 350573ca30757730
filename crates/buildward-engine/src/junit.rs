//! Read JUnit XML test results to tell whether a test task failed.

use std::path::Path;

use crate::error::EngineError;

/// Aggregated counts over one or more JUnit XML result files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestResults {
    pub files: usize,
    pub tests: u64,
    pub failures: u64,
    pub errors: u64,
}

impl TestResults {
    pub fn has_failures(&self) -> bool {
        self.failures > 0 || self.errors > 0
    }

    fn merge(&mut self, other: Self) {
        self.files = self.files.saturating_add(other.files);
        self.tests = self.tests.saturating_add(other.tests);
        self.failures = self.failures.saturating_add(other.failures);
        self.errors = self.errors.saturating_add(other.errors);
    }
}

/// Read every `*.xml` file directly inside `dir`. A missing directory has no results.
///
/// # Errors
/// Returns an error if a results file cannot be read or is not well-formed XML.
pub fn read_results(dir: &Path) -> Result<TestResults, EngineError> {
    let mut total = TestResults::default();
    for path in buildward_util::fs::glob_files(dir, "*.xml")? {
        let content = std::fs::read_to_string(&path).map_err(|source| EngineError::Io {
            path: path.display().to_string(),
            source,
        })?;
        total.merge(parse_results(&path, &content)?);
    }
    tracing::debug!(
        dir = %dir.display(),
        files = total.files,
        tests = total.tests,
        failures = total.failures,
        errors = total.errors,
        "read test results"
    );
    Ok(total)
}

/// Parse one JUnit XML document.
///
/// Counts come from innermost `<testsuite>` elements. A suite's `failures`
/// and `errors` attributes are trusted unless it contains more `<failure>` or
/// `<error>` elements than they claim.
///
/// # Errors
/// Returns `EngineError::ResultsParse` if the document is not well-formed.
pub fn parse_results(path: &Path, content: &str) -> Result<TestResults, EngineError> {
    let doc = roxmltree::Document::parse(content).map_err(|e| EngineError::ResultsParse {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let mut results = TestResults {
        files: 1,
        ..TestResults::default()
    };

    let suites = doc.descendants().filter(|n| n.has_tag_name("testsuite"));
    for suite in suites {
        let nested = suite
            .descendants()
            .skip(1)
            .any(|n| n.has_tag_name("testsuite"));
        if nested {
            continue;
        }

        let count = |tag: &str| -> u64 {
            let n = suite.descendants().filter(|n| n.has_tag_name(tag)).count();
            u64::try_from(n).unwrap_or(u64::MAX)
        };
        let attr = |name: &str| -> u64 {
            suite
                .attribute(name)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0)
        };

        results.tests = results.tests.saturating_add(attr("tests").max(count("testcase")));
        results.failures = results
            .failures
            .saturating_add(attr("failures").max(count("failure")));
        results.errors = results.errors.saturating_add(attr("errors").max(count("error")));
    }

    Ok(results)
}
