use colored::Colorize;
use tracing::{info, warn};

use crate::{
    error::Result,
    pipeline::{
        chunk::{chunk_count, chunks},
        reshape::{
            contact_flag_payload, household_account_payload, reshape, resolve_contacts, ACCOUNT_FLAG,
            CONTACT_FLAG,
        },
        submit::{report, BulkSubmitter},
        PipelineContext, PipelineRun, PipelineStage,
    },
    salesforce::{BulkOperation, SObject},
};

pub const BATCH_SIZE: usize = 500;
const FIELDS: &[&str] = &["Id", "AccountId", "Account.RecordTypeId"];

#[derive(Debug, Default)]
pub struct BulkListSummary {
    pub chunks: usize,
    pub contacts_flagged: usize,
    pub accounts_flagged: usize,
    pub failed: usize,
    /// Update calls that could not be completed, per category.
    pub update_errors: Vec<String>,
}

/// Flag every contact behind a plain address list, chunk by chunk. A query
/// failure ends the run; a failed contact update does not stop the account
/// update of the same chunk.
pub async fn run(ctx: PipelineContext<'_>, emails: &[String]) -> Result<BulkListSummary> {
    let chunk_size = ctx.config.requests.email_chunk_size;
    let total = chunk_count(emails.len(), chunk_size);
    let household = &ctx.config.salesforce.household_record_type_id;
    let submitter = BulkSubmitter::new(ctx.crm, BATCH_SIZE);

    let mut summary = BulkListSummary::default();

    for (index, chunk) in chunks(emails, chunk_size).enumerate() {
        let mut run = PipelineRun::new("bulk list", PipelineStage::Loaded);
        println!("Starting chunk {} of {}.", index + 1, total);
        summary.chunks += 1;

        println!("Querying contacts from SFDC.");
        let records = run.check(
            PipelineStage::Resolved,
            resolve_contacts(ctx.crm, FIELDS, chunk, chunk_size).await,
        )?;
        if records.is_empty() {
            println!("No contacts found for this chunk.");
            continue;
        }

        let rows = reshape(&records);
        let contacts = contact_flag_payload(&rows);
        println!(
            "Identified {} contact(s) to be flagged for deletion. (Setting `{}` to true.)",
            contacts.len(),
            CONTACT_FLAG
        );
        run.advance(PipelineStage::Flagged);

        println!("Exporting to CSV.");
        run.check(
            PipelineStage::Exported,
            ctx.audit
                .export_records("flag_contacts_from_bulk_list", &["Id", CONTACT_FLAG], &contacts),
        )?;

        println!("Pushing the GDPR flag update to contacts in SFDC. Please wait.");
        let submission = submitter
            .submit(SObject::Contact, BulkOperation::Update, &contacts)
            .await;
        run.advance(PipelineStage::Submitted);
        record_batch_errors(&mut summary, "Contact", &submission.batch_errors);
        match report(ctx.audit, "flag_contacts_from_bulk_list", submission.outcomes) {
            Ok(r) => {
                summary.contacts_flagged += r.successful();
                summary.failed += r.failed();
            }
            Err(e) => record_update_error(&mut summary, "Contact", &e.to_string()),
        }

        let accounts = household_account_payload(&rows, household);
        println!(
            "Identified {} household account(s) to be flagged for deletion. (Setting `{}` to true.)",
            accounts.len(),
            ACCOUNT_FLAG
        );
        if accounts.is_empty() {
            continue;
        }

        println!("Exporting to CSV.");
        run.check(
            PipelineStage::Exported,
            ctx.audit
                .export_records("flag_accounts", &["Id", ACCOUNT_FLAG], &accounts),
        )?;

        println!("Pushing the GDPR flag update to household accounts in SFDC. Please wait.");
        let submission = submitter
            .submit(SObject::Account, BulkOperation::Update, &accounts)
            .await;
        record_batch_errors(&mut summary, "Account", &submission.batch_errors);
        match report(ctx.audit, "flag_accounts_from_bulk_list", submission.outcomes) {
            Ok(r) => {
                summary.accounts_flagged += r.successful();
                summary.failed += r.failed();
            }
            Err(e) => record_update_error(&mut summary, "Account", &e.to_string()),
        }
        run.advance(PipelineStage::Reported);
    }

    info!(
        chunks = summary.chunks,
        contacts = summary.contacts_flagged,
        accounts = summary.accounts_flagged,
        failed = summary.failed,
        "Bulk list processed"
    );
    Ok(summary)
}

fn record_batch_errors(summary: &mut BulkListSummary, object: &str, errors: &[String]) {
    for e in errors {
        record_update_error(summary, object, e);
    }
}

fn record_update_error(summary: &mut BulkListSummary, object: &str, message: &str) {
    println!("{}", format!("{} update error.", object).red());
    warn!("{} update error: {}", object, message);
    summary.update_errors.push(format!("{}: {}", object, message));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RequestsConfig;
    use crate::error::RemovalError;
    use crate::pipeline::testing;
    use crate::salesforce::{BulkOutcome, MockCrm};
    use serde_json::json;

    fn emails(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("user{}@x.com", i)).collect()
    }

    #[tokio::test]
    async fn test_chunks_queries_and_skips_empty_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let audit = testing::audit(&dir);
        let mut config = testing::config();
        config.requests = RequestsConfig {
            email_chunk_size: 2,
            ..RequestsConfig::default()
        };

        let mut crm = MockCrm::new();
        let mut seq = mockall::Sequence::new();
        crm.expect_query_all()
            .withf(|soql| soql.to_string().ends_with("IN ('user0@x.com','user1@x.com')"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![]));
        crm.expect_query_all()
            .withf(|soql| soql.to_string().ends_with("IN ('user2@x.com')"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(vec![json!({
                    "Id": "003C",
                    "AccountId": "001H",
                    "Account": { "RecordTypeId": "012d0000000W68QAAS" }
                })])
            });
        crm.expect_submit_batch()
            .times(2)
            .returning(|_, _, records| Ok(records.iter().map(|r| BulkOutcome::ok(r.id.clone())).collect()));

        let ctx = PipelineContext { crm: &crm, audit: &audit, config: &config };
        let summary = run(ctx, &emails(3)).await.unwrap();

        assert_eq!(summary.chunks, 2);
        assert_eq!(summary.contacts_flagged, 1);
        assert_eq!(summary.accounts_flagged, 1);
        assert_eq!(
            testing::files_in(&dir.path().join("exports")),
            vec![
                "flag_accounts_2026-10-14-09-30-00.csv",
                "flag_contacts_from_bulk_list_2026-10-14-09-30-00.csv",
            ]
        );
    }

    #[tokio::test]
    async fn test_contact_failure_does_not_block_accounts() {
        let dir = tempfile::tempdir().unwrap();
        let audit = testing::audit(&dir);
        let config = testing::config();

        let mut crm = MockCrm::new();
        crm.expect_query_all().returning(|_| {
            Ok(vec![json!({
                "Id": "003A",
                "AccountId": "001H",
                "Account": { "RecordTypeId": "012d0000000W68QAAS" }
            })])
        });
        crm.expect_submit_batch()
            .withf(|object, _, _| *object == SObject::Contact)
            .times(1)
            .returning(|_, _, _| Err(RemovalError::Api { status: 503, message: "unavailable".to_string() }));
        crm.expect_submit_batch()
            .withf(|object, _, _| *object == SObject::Account)
            .times(1)
            .returning(|_, _, records| Ok(records.iter().map(|r| BulkOutcome::ok(r.id.clone())).collect()));

        let ctx = PipelineContext { crm: &crm, audit: &audit, config: &config };
        let summary = run(ctx, &emails(1)).await.unwrap();

        assert_eq!(summary.contacts_flagged, 0);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.accounts_flagged, 1);
        assert_eq!(summary.update_errors.len(), 1);
        assert!(summary.update_errors[0].starts_with("Contact"));
    }

    #[tokio::test]
    async fn test_account_export_failure_is_a_stage_error() {
        let dir = tempfile::tempdir().unwrap();
        let audit = testing::audit(&dir);
        let config = testing::config();
        let exports = dir.path().join("exports");

        let mut crm = MockCrm::new();
        crm.expect_query_all().returning(|_| {
            Ok(vec![json!({
                "Id": "003A",
                "AccountId": "001H",
                "Account": { "RecordTypeId": "012d0000000W68QAAS" }
            })])
        });
        // Replace the exports directory with a plain file once contacts are in.
        crm.expect_submit_batch()
            .withf(|object, _, _| *object == SObject::Contact)
            .times(1)
            .returning(move |_, _, records| {
                std::fs::remove_dir_all(&exports).unwrap();
                std::fs::write(&exports, "").unwrap();
                Ok(records.iter().map(|r| BulkOutcome::ok(r.id.clone())).collect())
            });
        crm.expect_submit_batch()
            .withf(|object, _, _| *object == SObject::Account)
            .times(0);

        let ctx = PipelineContext { crm: &crm, audit: &audit, config: &config };
        let err = run(ctx, &emails(1)).await.unwrap_err();

        assert!(err.to_string().starts_with("bulk list pipeline stopped before EXPORTED"));
    }

    #[tokio::test]
    async fn test_query_failure_ends_run() {
        let dir = tempfile::tempdir().unwrap();
        let audit = testing::audit(&dir);
        let config = testing::config();

        let mut crm = MockCrm::new();
        crm.expect_query_all()
            .returning(|_| Err(RemovalError::Api { status: 400, message: "MALFORMED_QUERY".to_string() }));
        crm.expect_submit_batch().times(0);

        let ctx = PipelineContext { crm: &crm, audit: &audit, config: &config };
        assert!(run(ctx, &emails(2)).await.is_err());
    }
}
