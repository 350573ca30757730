//! Export a single report into the shared CI artifact directory.
//!
//! Directory reports are zipped to `report-<project>-<dir>.zip`; file reports
//! are copied to `report-<project>-<parent>-<file>`. Both names are derived
//! from the project name and the report path alone, so reports from
//! different projects never collide and can be exported concurrently.

use std::path::{Path, PathBuf};

use buildward_util::fs::file_name_str;
use buildward_util::name::validate_component;
use serde::Serialize;

use crate::error::EngineError;

/// Whether a report is a directory tree or a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Directory,
    File,
}

/// A report produced by a reporting task, waiting to be exported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifact {
    pub project: String,
    pub path: PathBuf,
    pub kind: ArtifactKind,
}

impl ReportArtifact {
    /// Classify the report at `path` owned by `project`.
    ///
    /// # Errors
    /// Returns `EngineError::ReportMissing` if nothing exists at `path`, or
    /// `EngineError::Io` if its metadata cannot be read.
    pub fn inspect(project: &str, path: &Path) -> Result<Self, EngineError> {
        let metadata = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(EngineError::ReportMissing {
                    project: project.to_owned(),
                    path: path.display().to_string(),
                })
            }
            Err(source) => {
                return Err(EngineError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        let kind = if metadata.is_dir() {
            ArtifactKind::Directory
        } else {
            ArtifactKind::File
        };
        Ok(Self {
            project: project.to_owned(),
            path: path.to_path_buf(),
            kind,
        })
    }

    /// The file name this report is exported under.
    ///
    /// # Errors
    /// Returns an error if the project name is not a valid file name component,
    /// or the path lacks the directory or parent name the pattern needs.
    pub fn destination_name(&self) -> Result<String, EngineError> {
        validate_component(&self.project)?;
        let name = self.component(&self.path, "report name")?;
        match self.kind {
            ArtifactKind::Directory => Ok(format!("report-{}-{name}.zip", self.project)),
            ArtifactKind::File => {
                let parent = self.path.parent().unwrap_or_else(|| Path::new(""));
                let parent_name = self.component(parent, "parent directory name")?;
                Ok(format!("report-{}-{parent_name}-{name}", self.project))
            }
        }
    }

    fn component<'a>(&self, path: &'a Path, what: &str) -> Result<&'a str, EngineError> {
        let name = file_name_str(path).ok_or_else(|| EngineError::InvalidReportPath {
            path: self.path.display().to_string(),
            reason: format!("no {what}"),
        })?;
        validate_component(name)?;
        Ok(name)
    }
}

/// A report now present in the shared destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedArtifact {
    pub project: String,
    pub kind: ArtifactKind,
    pub source: PathBuf,
    pub path: PathBuf,
    pub sha256: String,
}

/// Zip or copy `artifact` into `destination` under its derived name.
///
/// An existing file of the same name is replaced.
///
/// # Errors
/// Returns an error if the name cannot be derived, and
/// `EngineError::ArtifactExport` if the archive or copy cannot be written or
/// read back for hashing.
pub fn prepare_report_for_ci_publishing(
    artifact: &ReportArtifact,
    destination: &Path,
) -> Result<ExportedArtifact, EngineError> {
    let dest = destination.join(artifact.destination_name()?);

    let written = match artifact.kind {
        ArtifactKind::Directory => buildward_util::archive::zip_dir(&artifact.path, &dest).map(|_| ()),
        ArtifactKind::File => buildward_util::fs::copy_file(&artifact.path, &dest).map(|_| ()),
    };
    written.map_err(|e| export_error(artifact, &dest, e))?;

    let sha256 = digest(artifact, &dest)?;
    tracing::info!(
        project = %artifact.project,
        source = %artifact.path.display(),
        dest = %dest.display(),
        "exported report"
    );

    Ok(ExportedArtifact {
        project: artifact.project.clone(),
        kind: artifact.kind,
        source: artifact.path.clone(),
        path: dest,
        sha256,
    })
}

/// Digest of the written artifact, published alongside it for verification.
fn digest(artifact: &ReportArtifact, dest: &Path) -> Result<String, EngineError> {
    buildward_util::hash::sha256_file(dest).map_err(|e| export_error(artifact, dest, e))
}

fn export_error(
    artifact: &ReportArtifact,
    dest: &Path,
    source: buildward_util::error::UtilError,
) -> EngineError {
    EngineError::ArtifactExport {
        project: artifact.project.clone(),
        path: dest.display().to_string(),
        source,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;
    use std::io::Read;

    use super::*;

    #[test]
    fn file_report_is_copied_with_project_and_parent_prefix() {
        let tmp = tempfile::tempdir().unwrap();
        let reports = tmp.path().join("core").join("build").join("reports").join("tests");
        fs::create_dir_all(&reports).unwrap();
        let index = reports.join("index.html");
        let bytes = b"<html>\x00\xff 3 tests failed</html>".to_vec();
        fs::write(&index, &bytes).unwrap();
        let dest = tmp.path().join("build");

        let artifact = ReportArtifact::inspect("core", &index).unwrap();
        assert_eq!(artifact.kind, ArtifactKind::File);

        let exported = prepare_report_for_ci_publishing(&artifact, &dest).unwrap();
        assert_eq!(exported.path, dest.join("report-core-tests-index.html"));
        assert_eq!(fs::read(&exported.path).unwrap(), bytes);
        assert_eq!(exported.sha256, buildward_util::hash::sha256_bytes(&bytes));
    }

    #[test]
    fn directory_report_is_zipped() {
        let tmp = tempfile::tempdir().unwrap();
        let report = tmp.path().join("core").join("build").join("reports").join("tests").join("test");
        fs::create_dir_all(report.join("classes")).unwrap();
        fs::write(report.join("index.html"), b"summary").unwrap();
        fs::write(report.join("classes").join("CoreTest.html"), b"case").unwrap();
        let dest = tmp.path().join("build");

        let artifact = ReportArtifact::inspect("core", &report).unwrap();
        assert_eq!(artifact.kind, ArtifactKind::Directory);

        let exported = prepare_report_for_ci_publishing(&artifact, &dest).unwrap();
        assert_eq!(exported.path, dest.join("report-core-test.zip"));
        assert_eq!(
            buildward_util::archive::list_zip(&exported.path).unwrap(),
            vec!["classes/", "classes/CoreTest.html", "index.html"]
        );

        let mut archive = zip::ZipArchive::new(fs::File::open(&exported.path).unwrap()).unwrap();
        let mut content = String::new();
        archive
            .by_name("classes/CoreTest.html")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "case");
    }

    #[test]
    fn same_report_name_in_two_projects_does_not_collide() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("build");
        let mut names = Vec::new();
        for project in ["core", "base-services"] {
            let report = tmp.path().join(project).join("reports").join("test");
            fs::create_dir_all(&report).unwrap();
            fs::write(report.join("index.html"), project).unwrap();
            let artifact = ReportArtifact::inspect(project, &report).unwrap();
            names.push(prepare_report_for_ci_publishing(&artifact, &dest).unwrap().path);
        }
        assert_ne!(names.first(), names.get(1));
        assert!(names.iter().all(|p| p.exists()));
    }

    #[test]
    fn missing_report() {
        let tmp = tempfile::tempdir().unwrap();
        let err = ReportArtifact::inspect("core", &tmp.path().join("absent")).unwrap_err();
        assert!(matches!(err, EngineError::ReportMissing { .. }), "got {err:?}");
    }

    #[test]
    fn destination_name_patterns() {
        let dir = ReportArtifact {
            project: "core".to_owned(),
            path: PathBuf::from("build/reports/tests/test/"),
            kind: ArtifactKind::Directory,
        };
        assert_eq!(dir.destination_name().unwrap(), "report-core-test.zip");

        let file = ReportArtifact {
            project: "core".to_owned(),
            path: PathBuf::from("build/reports/checkstyle/main.html"),
            kind: ArtifactKind::File,
        };
        assert_eq!(
            file.destination_name().unwrap(),
            "report-core-checkstyle-main.html"
        );
    }

    #[test]
    fn destination_name_requires_parent_for_files() {
        let file = ReportArtifact {
            project: "core".to_owned(),
            path: PathBuf::from("index.html"),
            kind: ArtifactKind::File,
        };
        let err = file.destination_name().unwrap_err().to_string();
        assert!(err.contains("parent directory name"), "error was: {err}");
    }

    #[test]
    fn destination_name_rejects_unsafe_project() {
        let file = ReportArtifact {
            project: "../escape".to_owned(),
            path: PathBuf::from("build/reports/tests/index.html"),
            kind: ArtifactKind::File,
        };
        assert!(file.destination_name().is_err());
    }

    #[test]
    fn unwritable_destination_is_an_export_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let reports = tmp.path().join("reports");
        fs::create_dir_all(&reports).unwrap();
        let index = reports.join("index.html");
        fs::write(&index, b"x").unwrap();
        // A regular file where the destination directory should be.
        let dest = tmp.path().join("build");
        fs::write(&dest, b"not a directory").unwrap();

        let artifact = ReportArtifact::inspect("core", &index).unwrap();
        let err = prepare_report_for_ci_publishing(&artifact, &dest).unwrap_err();
        assert!(matches!(err, EngineError::ArtifactExport { .. }), "got {err:?}");
        assert!(err.to_string().contains("`core`"));
    }

    #[test]
    fn unreadable_export_is_an_export_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let artifact = ReportArtifact {
            project: "core".to_owned(),
            path: tmp.path().join("reports").join("index.html"),
            kind: ArtifactKind::File,
        };
        let err = digest(&artifact, &tmp.path().join("build").join("gone.html")).unwrap_err();
        assert!(matches!(err, EngineError::ArtifactExport { .. }), "got {err:?}");
        assert!(err.to_string().contains("`core`"), "error was: {err}");
    }

    #[test]
    fn re_export_replaces_previous_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        let reports = tmp.path().join("reports");
        fs::create_dir_all(&reports).unwrap();
        let index = reports.join("index.html");
        let dest = tmp.path().join("build");

        fs::write(&index, b"first run").unwrap();
        let artifact = ReportArtifact::inspect("core", &index).unwrap();
        prepare_report_for_ci_publishing(&artifact, &dest).unwrap();

        fs::write(&index, b"second").unwrap();
        let exported = prepare_report_for_ci_publishing(&artifact, &dest).unwrap();
        assert_eq!(fs::read(exported.path).unwrap(), b"second");
    }
}
