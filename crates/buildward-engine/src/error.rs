//! Error types for buildward-engine.

/// Errors produced by engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A filesystem operation failed.
    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// A utility operation failed.
    #[error("{0}")]
    Util(#[from] buildward_util::error::UtilError),

    /// A property file could not be loaded.
    #[error("{0}")]
    Properties(#[from] buildward_config::properties::PropertiesError),

    /// The settings file could not be loaded.
    #[error("{0}")]
    Settings(#[from] buildward_config::settings::SettingsError),

    /// The watched property differs between property files.
    #[error(
        "{} have different {key} which may cause two daemons to be spawned on CI and in the IDE. \
         Use the same {key} for both builds.",
        .files.join(" and ")
    )]
    ConfigurationMismatch {
        key: String,
        files: Vec<String>,
        values: Vec<Option<String>>,
    },

    /// A report path does not exist.
    #[error("report for project `{project}` not found at {path}")]
    ReportMissing { project: String, path: String },

    /// A report path cannot be turned into an output file name.
    #[error("cannot derive a report name from {path}: {reason}")]
    InvalidReportPath { path: String, reason: String },

    /// Writing an exported report failed.
    #[error("cannot export report for project `{project}` to {path}: {source}")]
    ArtifactExport {
        project: String,
        path: String,
        source: buildward_util::error::UtilError,
    },

    /// Two reports would be exported under the same file name.
    #[error("report {second} would overwrite {first} as {name}")]
    DestinationCollision {
        name: String,
        first: String,
        second: String,
    },

    /// A JUnit XML results file is not well-formed.
    #[error("invalid test results in {path}: {message}")]
    ResultsParse { path: String, message: String },

    /// A `project:task` reference is malformed.
    #[error("invalid task reference \"{spec}\" — expected `project:task`")]
    InvalidTaskSpec { spec: String },

    /// A `project:task` reference names no configured report task.
    #[error("no report task `{task}` configured for project `{project}` in buildward.toml")]
    UnknownTask { project: String, task: String },
}
