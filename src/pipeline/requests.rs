use colored::Colorize;
use tracing::error;

use crate::{
    pipeline::{
        credit_card,
        data_removal::{self, DataRemovalSummary},
        unsubscribe, BatchReport, PipelineContext,
    },
    requests::{ClassifiedRequests, RequestCategory},
};

/// What happened to each category of one request batch.
#[derive(Debug, Default)]
pub struct RequestBatchSummary {
    pub data_removal: Option<DataRemovalSummary>,
    pub unsubscribe: Option<BatchReport>,
    pub credit_card_export: Option<std::path::PathBuf>,
    pub errors: Vec<String>,
}

/// Run data removal, unsubscribe and credit card removal in that order. A
/// failing category is reported and the next one still runs.
pub async fn run_request_batch(ctx: PipelineContext<'_>, requests: &ClassifiedRequests) -> RequestBatchSummary {
    let mut summary = RequestBatchSummary::default();

    let data_removal_emails = requests.emails(RequestCategory::DataRemoval);
    match data_removal::run(ctx, &data_removal_emails).await {
        Ok(result) => summary.data_removal = Some(result),
        Err(e) => record_failure(&mut summary, e),
    }

    let unsubscribe_emails = requests.emails(RequestCategory::Unsubscribe);
    match unsubscribe::run(ctx, &unsubscribe_emails).await {
        Ok(result) => summary.unsubscribe = result,
        Err(e) => record_failure(&mut summary, e),
    }

    match credit_card::run(ctx, requests).await {
        Ok(result) => summary.credit_card_export = result,
        Err(e) => record_failure(&mut summary, e),
    }

    summary
}

fn record_failure(summary: &mut RequestBatchSummary, e: crate::error::RemovalError) {
    error!("{}", e);
    println!("{}", format!("Error: {}", e).red());
    summary.errors.push(e.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemovalError;
    use crate::pipeline::testing;
    use crate::requests::{classify, RequestTable};
    use crate::salesforce::{BulkOutcome, MockCrm, SObject};
    use serde_json::json;

    fn requests(rows: &[(&str, &str)]) -> ClassifiedRequests {
        let headers = vec![
            "Task Assignee - Subtask".to_string(),
            "Workflows".to_string(),
            "Email".to_string(),
        ];
        let cells = rows
            .iter()
            .map(|(workflow, email)| vec!["Salesforce".to_string(), workflow.to_string(), email.to_string()])
            .collect();
        classify(RequestTable::from_cells(headers, cells).unwrap(), "Salesforce")
    }

    #[tokio::test]
    async fn test_data_removal_failure_does_not_block_unsubscribe() {
        let dir = tempfile::tempdir().unwrap();
        let audit = testing::audit(&dir);
        let config = testing::config();

        let mut crm = MockCrm::new();
        crm.expect_query_all()
            .withf(|soql| soql.to_string().contains("'a@x.com'"))
            .returning(|_| Err(RemovalError::Api { status: 500, message: "boom".to_string() }));
        crm.expect_query_all()
            .withf(|soql| soql.to_string().contains("'b@x.com'"))
            .returning(|_| Ok(vec![json!({ "Id": "003B" })]));
        crm.expect_submit_batch()
            .withf(|object, _, _| *object == SObject::Contact)
            .times(1)
            .returning(|_, _, _| Ok(vec![BulkOutcome::ok("003B")]));

        let ctx = PipelineContext { crm: &crm, audit: &audit, config: &config };
        let summary = run_request_batch(
            ctx,
            &requests(&[("[Consumer] Data Removal", "a@x.com"), ("[Consumer] Unsubscribe", "b@x.com")]),
        )
        .await;

        assert!(summary.data_removal.is_none());
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.unsubscribe.unwrap().summary_line(), "OK: 1, Fail: 0.");
        assert!(summary.credit_card_export.is_none());
    }

    #[tokio::test]
    async fn test_only_unsubscribe_requests() {
        let dir = tempfile::tempdir().unwrap();
        let audit = testing::audit(&dir);
        let config = testing::config();

        let mut crm = MockCrm::new();
        crm.expect_query_all()
            .times(1)
            .returning(|_| Ok(vec![json!({ "Id": "003B" })]));
        crm.expect_submit_batch()
            .returning(|_, _, records| Ok(records.iter().map(|r| BulkOutcome::ok(r.id.clone())).collect()));

        let ctx = PipelineContext { crm: &crm, audit: &audit, config: &config };
        let summary = run_request_batch(ctx, &requests(&[("[Consumer] Unsubscribe", "b@x.com")])).await;

        let data_removal = summary.data_removal.unwrap();
        assert_eq!(data_removal.contacts.outcomes.len(), 0);
        assert!(summary.unsubscribe.is_some());
        assert!(summary.errors.is_empty());
    }
}
