pub mod chunk;
pub mod reshape;
pub mod audit;
pub mod submit;
pub mod data_removal;
pub mod unsubscribe;
pub mod credit_card;
pub mod bulk_list;
pub mod delete_flagged;
pub mod requests;

use tracing::{debug, warn};

use crate::{
    config::Config,
    error::{RemovalError, Result},
    salesforce::Crm,
};

pub use audit::AuditWriter;
pub use submit::{BatchReport, BulkSubmitter};

/// Everything a workflow needs: the CRM session, the audit writer and the
/// read-only configuration.
#[derive(Clone, Copy)]
pub struct PipelineContext<'a> {
    pub crm: &'a dyn Crm,
    pub audit: &'a AuditWriter,
    pub config: &'a Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineStage {
    Loaded,
    Categorized,
    Resolved,
    Flagged,
    Exported,
    Submitted,
    Reported,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineStage::Loaded => "LOADED",
            PipelineStage::Categorized => "CATEGORIZED",
            PipelineStage::Resolved => "RESOLVED",
            PipelineStage::Flagged => "FLAGGED",
            PipelineStage::Exported => "EXPORTED",
            PipelineStage::Submitted => "SUBMITTED",
            PipelineStage::Reported => "REPORTED",
        };
        f.write_str(name)
    }
}

/// Stage tracker for one workflow run.
#[derive(Debug)]
pub struct PipelineRun {
    name: &'static str,
    stage: PipelineStage,
}

impl PipelineRun {
    pub fn new(name: &'static str, stage: PipelineStage) -> Self {
        debug!(pipeline = name, stage = %stage, "Pipeline started");
        Self { name, stage }
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// Move forward to `stage`. Earlier stages are ignored.
    pub fn advance(&mut self, stage: PipelineStage) {
        if stage > self.stage {
            debug!(pipeline = self.name, from = %self.stage, to = %stage, "Pipeline stage");
            self.stage = stage;
        }
    }

    /// Advance to `stage` on success; on failure wrap the error with the stage
    /// that was not reached.
    pub fn check<T>(&mut self, stage: PipelineStage, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.advance(stage);
                Ok(value)
            }
            Err(e) => {
                warn!(pipeline = self.name, stage = %stage, "Pipeline step failed: {}", e);
                Err(RemovalError::Stage {
                    pipeline: self.name,
                    stage,
                    source: Box::new(e),
                })
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::config::{OutputConfig, RequestsConfig, SalesforceConfig, Secrets};

    pub fn config() -> Config {
        Config {
            secrets: Secrets {
                sfdc_username: "ops@example.com".to_string(),
                sfdc_password: "pw".to_string(),
                sfdc_token: "tok".to_string(),
            },
            salesforce: SalesforceConfig::default(),
            output: OutputConfig::default(),
            requests: RequestsConfig::default(),
        }
    }

    pub fn audit(dir: &tempfile::TempDir) -> AuditWriter {
        AuditWriter::with_stamp(
            dir.path().join("exports"),
            dir.path().join("results"),
            "2026-10-14-09-30-00",
        )
    }

    /// Names of files under `dir`, sorted. Missing directory means none.
    pub fn files_in(dir: &std::path::Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().to_string())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_error_names_pipeline_and_stage() {
        let mut run = PipelineRun::new("unsubscribe", PipelineStage::Categorized);
        let result: Result<()> = run.check(
            PipelineStage::Resolved,
            Err(RemovalError::InvalidInput("boom".to_string())),
        );

        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "unsubscribe pipeline stopped before RESOLVED: Invalid input: boom");
        assert_eq!(run.stage(), PipelineStage::Categorized);
    }

    #[test]
    fn test_advance_only_moves_forward() {
        let mut run = PipelineRun::new("data removal", PipelineStage::Categorized);
        run.advance(PipelineStage::Exported);
        run.advance(PipelineStage::Resolved);
        assert_eq!(run.stage(), PipelineStage::Exported);
    }
}
