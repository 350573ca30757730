use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Name of the settings file looked up at the build root.
pub const SETTINGS_FILE: &str = "buildward.toml";

/// The property that selects daemon JVM arguments.
pub const DEFAULT_DAEMON_KEY: &str = "org.gradle.jvmargs";

/// The `buildward.toml` settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub daemon: DaemonSettings,
    #[serde(default)]
    pub ci: CiSettings,
    #[serde(default)]
    pub reports: ReportSettings,
    #[serde(default, rename = "project", skip_serializing_if = "Vec::is_empty")]
    pub projects: Vec<ProjectSettings>,
}

/// Which property must agree across which property files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonSettings {
    #[serde(default = "default_daemon_key")]
    pub key: String,
    /// Property files, relative to the build root.
    #[serde(default = "default_daemon_files")]
    pub files: Vec<PathBuf>,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            key: default_daemon_key(),
            files: default_daemon_files(),
        }
    }
}

fn default_daemon_key() -> String {
    DEFAULT_DAEMON_KEY.to_owned()
}

fn default_daemon_files() -> Vec<PathBuf> {
    vec![
        PathBuf::from("gradle.properties"),
        PathBuf::from("../gradle.properties"),
    ]
}

/// Environment variables that describe the CI execution context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CiSettings {
    /// Variable whose presence marks a CI server.
    #[serde(default = "default_ci_marker")]
    pub marker: String,
    /// Variable that re-enables code quality checks on CI when set to `true`.
    #[serde(default = "default_code_quality_var")]
    pub code_quality: String,
}

impl Default for CiSettings {
    fn default() -> Self {
        Self {
            marker: default_ci_marker(),
            code_quality: default_code_quality_var(),
        }
    }
}

fn default_ci_marker() -> String {
    "CI".to_owned()
}

fn default_code_quality_var() -> String {
    "BUILDWARD_ENABLE_CODE_QUALITY".to_owned()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportSettings {
    /// Shared destination for exported reports, relative to the build root.
    #[serde(default = "default_destination")]
    pub destination: PathBuf,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            destination: default_destination(),
        }
    }
}

fn default_destination() -> PathBuf {
    PathBuf::from("build")
}

/// A subproject and its reporting tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectSettings {
    pub name: String,
    /// Project directory relative to the build root; defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    #[serde(default, rename = "report", skip_serializing_if = "Vec::is_empty")]
    pub reports: Vec<ReportTask>,
}

impl ProjectSettings {
    /// The project directory relative to the build root.
    pub fn dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| PathBuf::from(&self.name))
    }
}

/// A reporting task whose html report is exported when the task fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportTask {
    pub task: String,
    /// Html report file or directory, relative to the project directory.
    pub html: PathBuf,
    /// JUnit XML results directory, relative to the project directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<PathBuf>,
}

impl Settings {
    /// Read `buildward.toml` from the build root, falling back to defaults if absent.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read, is invalid
    /// TOML, or fails validation.
    pub fn load(root: &Path) -> Result<Self, SettingsError> {
        Self::from_path(&root.join(SETTINGS_FILE))
    }

    /// Read and validate a settings file. Returns defaults if the file does not exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read, is invalid
    /// TOML, or fails validation.
    pub fn from_path(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let settings: Settings = toml::from_str(&content).map_err(|e| SettingsError::Parse {
            path: path.display().to_string(),
            source: e,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check cross-field rules serde cannot express.
    ///
    /// # Errors
    /// Returns an error if fewer than two property files are configured, or
    /// a project or task name is repeated.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.daemon.files.len() < 2 {
            return Err(SettingsError::TooFewFiles {
                count: self.daemon.files.len(),
            });
        }

        let mut projects = BTreeSet::new();
        for project in &self.projects {
            if !projects.insert(project.name.as_str()) {
                return Err(SettingsError::DuplicateProject {
                    name: project.name.clone(),
                });
            }
            let mut tasks = BTreeSet::new();
            for report in &project.reports {
                if !tasks.insert(report.task.as_str()) {
                    return Err(SettingsError::DuplicateTask {
                        project: project.name.clone(),
                        task: report.task.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Look up a project by name.
    pub fn project(&self, name: &str) -> Option<&ProjectSettings> {
        self.projects.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid buildward.toml at {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("[daemon] files lists {count} file(s) — at least two are needed to compare")]
    TooFewFiles { count: usize },
    #[error("project `{name}` is declared more than once")]
    DuplicateProject { name: String },
    #[error("project `{project}` declares report task `{task}` more than once")]
    DuplicateTask { project: String, task: String },
}
