//! Export the reports of every failed reporting task for CI artifact upload.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use buildward_config::settings::{ProjectSettings, ReportTask};
use buildward_config::Settings;
use rayon::prelude::{IntoParallelRefIterator, ParallelIterator};
use serde::Serialize;

use crate::ci::CiContext;
use crate::error::EngineError;
use crate::package::{prepare_report_for_ci_publishing, ExportedArtifact, ReportArtifact};

/// A reporting task named as failed by the caller, written `project:task`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FailedTask {
    pub project: String,
    pub task: String,
}

impl FromStr for FailedTask {
    type Err = EngineError;

    /// Accepts `core:test` as well as Gradle-style `:core:test`.
    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let trimmed = spec.strip_prefix(':').unwrap_or(spec);
        match trimmed.rsplit_once(':') {
            Some((project, task)) if !project.is_empty() && !task.is_empty() => Ok(Self {
                project: project.to_owned(),
                task: task.to_owned(),
            }),
            _ => Err(EngineError::InvalidTaskSpec {
                spec: spec.to_owned(),
            }),
        }
    }
}

/// Options for [`publish_failed_reports`].
#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    /// Publish even outside a CI execution context.
    pub force: bool,
    /// Tasks known to have failed, in addition to those detected from test results.
    pub failed: Vec<FailedTask>,
}

/// A failed task whose report was not exported, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedReport {
    pub project: String,
    pub task: String,
    pub path: PathBuf,
    pub reason: String,
}

/// A failed task whose report could not be exported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedExport {
    pub project: String,
    pub task: String,
    pub message: String,
}

/// Results of one publishing run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    pub destination: PathBuf,
    pub exported: Vec<ExportedArtifact>,
    pub skipped: Vec<SkippedReport>,
    pub failed: Vec<FailedExport>,
}

impl PublishReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PublishSummary {
    /// Not on CI and not forced; nothing was inspected.
    Skipped { reason: String },
    Ran(PublishReport),
}

/// A failed report scheduled for export.
struct Job {
    task: String,
    artifact: ReportArtifact,
}

/// Export the html report of every failed reporting task configured in `settings`.
///
/// A task is failed when `options.failed` names it or its JUnit results
/// contain failures or errors. Exports run in parallel; an export that
/// fails is recorded in the report and does not stop the others.
///
/// # Errors
/// Returns an error only when `options.failed` names a task that is not
/// configured. Per-report problems are collected in [`PublishReport::failed`].
pub fn publish_failed_reports(
    root: &Path,
    settings: &Settings,
    ci: CiContext,
    options: &PublishOptions,
) -> Result<PublishSummary, EngineError> {
    if !ci.is_ci && !options.force {
        return Ok(PublishSummary::Skipped {
            reason: format!(
                "not running on CI (${} is not set)",
                settings.ci.marker
            ),
        });
    }

    for failed in &options.failed {
        let known = settings
            .project(&failed.project)
            .is_some_and(|p| p.reports.iter().any(|r| r.task == failed.task));
        if !known {
            return Err(EngineError::UnknownTask {
                project: failed.project.clone(),
                task: failed.task.clone(),
            });
        }
    }

    let destination = root.join(&settings.reports.destination);
    let mut report = PublishReport {
        destination: destination.clone(),
        ..PublishReport::default()
    };

    let mut jobs = Vec::new();
    let mut claimed: HashMap<String, PathBuf> = HashMap::new();

    for project in &settings.projects {
        let project_dir = root.join(project.dir());
        for task in &project.reports {
            match plan_report(project, task, &project_dir, options) {
                Ok(Planned::NotFailed) => {}
                Ok(Planned::Skip(skipped)) => report.skipped.push(skipped),
                Ok(Planned::Export(artifact)) => {
                    let claim = artifact.destination_name().and_then(|name| {
                        match claimed.get(&name) {
                            Some(first) => Err(EngineError::DestinationCollision {
                                name,
                                first: first.display().to_string(),
                                second: artifact.path.display().to_string(),
                            }),
                            None => {
                                claimed.insert(name, artifact.path.clone());
                                Ok(())
                            }
                        }
                    });
                    match claim {
                        Ok(()) => jobs.push(Job {
                            task: task.task.clone(),
                            artifact,
                        }),
                        Err(e) => report.failed.push(failed_export(&project.name, &task.task, &e)),
                    }
                }
                Err(e) => report.failed.push(failed_export(&project.name, &task.task, &e)),
            }
        }
    }

    tracing::debug!(jobs = jobs.len(), dest = %destination.display(), "publishing failed reports");

    let results: Vec<(&Job, Result<ExportedArtifact, EngineError>)> = jobs
        .par_iter()
        .map(|job| {
            (
                job,
                prepare_report_for_ci_publishing(&job.artifact, &destination),
            )
        })
        .collect();

    for (job, result) in results {
        match result {
            Ok(exported) => report.exported.push(exported),
            Err(e) => {
                tracing::warn!(project = %job.artifact.project, task = %job.task, error = %e, "report export failed");
                report
                    .failed
                    .push(failed_export(&job.artifact.project, &job.task, &e));
            }
        }
    }

    Ok(PublishSummary::Ran(report))
}

enum Planned {
    NotFailed,
    Skip(SkippedReport),
    Export(ReportArtifact),
}

fn plan_report(
    project: &ProjectSettings,
    task: &ReportTask,
    project_dir: &Path,
    options: &PublishOptions,
) -> Result<Planned, EngineError> {
    let named = options
        .failed
        .iter()
        .any(|f| f.project == project.name && f.task == task.task);

    let failed = named
        || match &task.results {
            Some(results) => crate::junit::read_results(&project_dir.join(results))?.has_failures(),
            None => false,
        };
    if !failed {
        return Ok(Planned::NotFailed);
    }

    let html = project_dir.join(&task.html);
    match ReportArtifact::inspect(&project.name, &html) {
        Ok(artifact) => Ok(Planned::Export(artifact)),
        Err(EngineError::ReportMissing { .. }) => Ok(Planned::Skip(SkippedReport {
            project: project.name.clone(),
            task: task.task.clone(),
            path: html,
            reason: "task failed without producing a report".to_owned(),
        })),
        Err(e) => Err(e),
    }
}

fn failed_export(project: &str, task: &str, error: &EngineError) -> FailedExport {
    FailedExport {
        project: project.to_owned(),
        task: task.to_owned(),
        message: error.to_string(),
    }
}
