//! Daemon-argument consistency checks and CI report publishing for buildward.

pub mod ci;
pub mod consistency;
pub mod error;
pub mod junit;
pub mod package;
pub mod publish;

pub use ci::CiContext;
pub use consistency::{check_same_daemon_args, check_same_property, ConsistencyReport};
pub use error::EngineError;
pub use package::{prepare_report_for_ci_publishing, ArtifactKind, ExportedArtifact, ReportArtifact};
pub use publish::{publish_failed_reports, FailedTask, PublishOptions, PublishReport, PublishSummary};
