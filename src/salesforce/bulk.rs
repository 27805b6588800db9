//! Bulk API 1.0, JSON content type. One serial job per submitted batch.

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::{
    error::{RemovalError, Result},
    salesforce::{
        client::{check_status, SalesforceClient},
        types::{BulkOperation, BulkOutcome, BulkRecord, SObject},
    },
};

#[derive(Debug, Deserialize)]
struct JobInfo {
    id: String,
}

#[derive(Debug, Deserialize)]
struct BatchInfo {
    id: String,
    state: String,
    #[serde(rename = "stateMessage", default)]
    state_message: Option<String>,
}

impl SalesforceClient {
    fn bulk_url(&self, tail: &str) -> String {
        format!(
            "{}/services/async/{}/{}",
            self.instance_url, self.api_version, tail
        )
    }

    async fn bulk_post(&self, tail: &str, body: &Value) -> Result<reqwest::Response> {
        let response = self
            .http
            .post(self.bulk_url(tail))
            .header("X-SFDC-Session", &self.session_id)
            .json(body)
            .send()
            .await?;
        check_status(response).await
    }

    async fn add_batch(&self, job_id: &str, payload: &Value) -> Result<BatchInfo> {
        Ok(self
            .bulk_post(&format!("job/{}/batch", job_id), payload)
            .await?
            .json()
            .await?)
    }

    /// Unprocessed batches of an aborted job end as `Not Processed`.
    async fn abort_job(&self, job_id: &str) {
        match self
            .bulk_post(&format!("job/{}", job_id), &json!({ "state": "Aborted" }))
            .await
        {
            Ok(_) => warn!("Aborted bulk job {}", job_id),
            Err(e) => warn!("Could not abort bulk job {}: {}", job_id, e),
        }
    }

    async fn bulk_get(&self, tail: &str) -> Result<reqwest::Response> {
        let response = self
            .http
            .get(self.bulk_url(tail))
            .header("X-SFDC-Session", &self.session_id)
            .send()
            .await?;
        check_status(response).await
    }
}

/// Create a serial job, add one batch, close the job, wait for the batch and
/// return its per-record results. A batch that outlives the bulk timeout gets
/// its job aborted and is still waited for.
pub(crate) async fn run_serial_batch(
    client: &SalesforceClient,
    object: SObject,
    operation: BulkOperation,
    records: &[BulkRecord],
) -> Result<Vec<BulkOutcome>> {
    if records.is_empty() {
        return Ok(Vec::new());
    }

    let job: JobInfo = client
        .bulk_post(
            "job",
            &json!({
                "operation": operation.as_str(),
                "object": object.as_str(),
                "contentType": "JSON",
                "concurrencyMode": "Serial",
            }),
        )
        .await?
        .json()
        .await?;
    debug!("Opened bulk job {} ({} {})", job.id, operation, object);

    let payload = Value::Array(records.iter().map(payload_record(operation)).collect());
    let batch = match client.add_batch(&job.id, &payload).await {
        Ok(batch) => batch,
        Err(e) => {
            client.abort_job(&job.id).await;
            return Err(e);
        }
    };

    if let Err(e) = client
        .bulk_post(&format!("job/{}", job.id), &json!({ "state": "Closed" }))
        .await
    {
        warn!("Could not close bulk job {}: {}", job.id, e);
    }

    // Past the deadline the job is aborted; polling continues until the batch
    // reaches a final state.
    let deadline = Instant::now() + client.bulk_timeout;
    let mut aborted = false;
    let mut state = batch;
    loop {
        match state.state.as_str() {
            "Completed" => break,
            "Failed" | "Not Processed" => {
                return Err(RemovalError::Api {
                    status: 200,
                    message: format!(
                        "batch {} {}: {}",
                        state.id,
                        state.state,
                        state.state_message.unwrap_or_default()
                    ),
                });
            }
            _ => {}
        }

        if !aborted && Instant::now() >= deadline {
            warn!(
                "Batch {} still {} after {:?}, aborting job {}",
                state.id, state.state, client.bulk_timeout, job.id
            );
            client.abort_job(&job.id).await;
            aborted = true;
        }

        tokio::time::sleep(client.poll_interval).await;
        state = client
            .bulk_get(&format!("job/{}/batch/{}", job.id, state.id))
            .await?
            .json()
            .await?;
        debug!("Batch {} state: {}", state.id, state.state);
    }

    let outcomes: Vec<BulkOutcome> = client
        .bulk_get(&format!("job/{}/batch/{}/result", job.id, state.id))
        .await?
        .json()
        .await?;

    Ok(outcomes)
}

/// Deletes only carry the record id.
fn payload_record(operation: BulkOperation) -> impl Fn(&BulkRecord) -> Value {
    move |record| match operation {
        BulkOperation::Update => record.to_json(),
        BulkOperation::Delete => json!({ "Id": record.id }),
    }
}
