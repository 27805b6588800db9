use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::{
    error::Result,
    pipeline::{
        audit::AuditWriter,
        chunk::{chunk_count, chunks},
    },
    salesforce::{BulkOperation, BulkOutcome, BulkRecord, Crm, SObject},
};

/// Submits a payload in fixed-size batches, one batch at a time.
pub struct BulkSubmitter<'a> {
    crm: &'a dyn Crm,
    batch_size: usize,
}

/// Outcomes of a submission plus the batches that failed as a whole.
#[derive(Debug, Default)]
pub struct Submission {
    pub outcomes: Vec<BulkOutcome>,
    pub batch_errors: Vec<String>,
}

impl<'a> BulkSubmitter<'a> {
    pub fn new(crm: &'a dyn Crm, batch_size: usize) -> Self {
        Self { crm, batch_size }
    }

    /// A failed batch yields a failed outcome per record and does not stop
    /// the remaining batches.
    pub async fn submit(
        &self,
        object: SObject,
        operation: BulkOperation,
        records: &[BulkRecord],
    ) -> Submission {
        let total = chunk_count(records.len(), self.batch_size);
        info!(
            "Submitting {} {} {} record(s) in {} batch(es) of up to {}",
            records.len(),
            operation,
            object,
            total,
            self.batch_size
        );

        let progress = if total > 1 {
            let pb = ProgressBar::new(total as u64);
            if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} batches") {
                pb.set_style(style);
            }
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut submission = Submission::default();
        for (index, batch) in chunks(records, self.batch_size).enumerate() {
            info!("Processing batch {}/{}", index + 1, total);

            match self.crm.submit_batch(object, operation, batch).await {
                Ok(outcomes) => submission.outcomes.extend(outcomes),
                Err(e) => {
                    let message = e.to_string();
                    warn!("Batch {}/{} failed: {}", index + 1, total, message);
                    submission
                        .outcomes
                        .extend(batch.iter().map(|r| BulkOutcome::batch_failed(r.id.clone(), &message)));
                    submission.batch_errors.push(message);
                }
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        submission
    }
}

/// Aggregate of one bulk call's outcomes
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<BulkOutcome>,
}

impl BatchReport {
    pub fn new(outcomes: Vec<BulkOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn successful(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.successful()
    }

    pub fn summary_line(&self) -> String {
        format!("OK: {}, Fail: {}.", self.successful(), self.failed())
    }

    pub fn print_summary(&self) {
        let line = self.summary_line();
        if self.failed() == 0 {
            println!("{} {}", line.green(), "✔️");
        } else {
            println!("{} {}", line.red(), "💥");
        }
    }
}

/// Print the aggregate and write the full outcome list under `results/`.
pub fn report(audit: &AuditWriter, purpose: &str, outcomes: Vec<BulkOutcome>) -> Result<BatchReport> {
    let report = BatchReport::new(outcomes);
    report.print_summary();
    info!(
        purpose,
        successful = report.successful(),
        failed = report.failed(),
        "Bulk submission finished"
    );

    println!("Exporting the results.");
    audit.write_results(purpose, &report.outcomes)?;
    Ok(report)
}
