use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::{
    config::{Config, SalesforceConfig},
    error::{RemovalError, Result},
    salesforce::{
        bulk,
        types::{BulkOperation, BulkOutcome, BulkRecord, Record, SObject},
        Crm,
    },
};

/// Authenticated Salesforce session (REST queries and Bulk API 1.0).
pub struct SalesforceClient {
    pub(crate) http: reqwest::Client,
    pub(crate) instance_url: String,
    pub(crate) session_id: String,
    pub(crate) api_version: String,
    pub(crate) poll_interval: Duration,
    pub(crate) bulk_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    records: Vec<Record>,
    #[serde(rename = "nextRecordsUrl")]
    next_records_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
    #[serde(rename = "errorCode", default)]
    error_code: String,
}

impl SalesforceClient {
    /// Log in with username and password+token through the SOAP partner endpoint.
    pub async fn connect(config: &Config) -> Result<Self> {
        let sf = &config.salesforce;
        let http = reqwest::Client::new();
        let login_url = format!(
            "{}/services/Soap/u/{}",
            sf.login_url.trim_end_matches('/'),
            sf.api_version
        );

        info!("Logging in to Salesforce as {}", config.secrets.sfdc_username);

        let envelope = login_envelope(
            &config.secrets.sfdc_username,
            &format!("{}{}", config.secrets.sfdc_password, config.secrets.sfdc_token),
        );

        let response = http
            .post(&login_url)
            .header("Content-Type", "text/xml; charset=UTF-8")
            .header("SOAPAction", "login")
            .body(envelope)
            .send()
            .await?;

        let body = response.text().await?;

        if let Some(fault) = extract_tag(&body, "faultstring") {
            return Err(RemovalError::Auth(fault));
        }

        let session_id = extract_tag(&body, "sessionId")
            .ok_or_else(|| RemovalError::Auth("no sessionId in login response".to_string()))?;
        let server_url = extract_tag(&body, "serverUrl")
            .ok_or_else(|| RemovalError::Auth("no serverUrl in login response".to_string()))?;

        let instance_url = url::Url::parse(&server_url)?.origin().ascii_serialization();
        debug!("Salesforce instance: {}", instance_url);

        Ok(Self::with_session(instance_url, session_id, sf))
    }

    /// Build a client around an existing session.
    pub fn with_session(
        instance_url: impl Into<String>,
        session_id: impl Into<String>,
        sf: &SalesforceConfig,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            instance_url: instance_url.into().trim_end_matches('/').to_string(),
            session_id: session_id.into(),
            api_version: sf.api_version.clone(),
            poll_interval: Duration::from_millis(sf.poll_interval_ms),
            bulk_timeout: Duration::from_secs(sf.bulk_timeout_secs),
        }
    }

    async fn fetch_page(&self, request: reqwest::RequestBuilder) -> Result<QueryResponse> {
        let response = request.bearer_auth(&self.session_id).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl Crm for SalesforceClient {
    async fn query_all(&self, soql: &str) -> Result<Vec<Record>> {
        debug!("SOQL: {}", soql);

        let url = format!(
            "{}/services/data/v{}/query",
            self.instance_url, self.api_version
        );
        let mut page = self
            .fetch_page(self.http.get(&url).query(&[("q", soql)]))
            .await?;
        let mut records = std::mem::take(&mut page.records);

        while let Some(next) = page.next_records_url.take() {
            debug!("Fetching next page: {}", next);
            page = self
                .fetch_page(self.http.get(format!("{}{}", self.instance_url, next)))
                .await?;
            records.append(&mut page.records);
        }

        debug!("Query returned {} record(s)", records.len());
        Ok(records)
    }

    async fn submit_batch(
        &self,
        object: SObject,
        operation: BulkOperation,
        records: &[BulkRecord],
    ) -> Result<Vec<BulkOutcome>> {
        bulk::run_serial_batch(self, object, operation, records).await
    }
}

/// Turn a non-2xx response into an `Api` error, using the REST error body when present.
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<Vec<ApiErrorBody>>(&text) {
        Ok(errors) if !errors.is_empty() => errors
            .iter()
            .map(|e| format!("{}: {}", e.error_code, e.message))
            .collect::<Vec<_>>()
            .join("; "),
        _ => text,
    };

    Err(RemovalError::Api {
        status: status.as_u16(),
        message,
    })
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn login_envelope(username: &str, password: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8" ?>
<env:Envelope xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:env="http://schemas.xmlsoap.org/soap/envelope/" xmlns:urn="urn:partner.soap.sforce.com">
  <env:Header>
    <urn:CallOptions><urn:client>sfdc-data-removal</urn:client></urn:CallOptions>
  </env:Header>
  <env:Body>
    <n1:login xmlns:n1="urn:partner.soap.sforce.com">
      <n1:username>{}</n1:username>
      <n1:password>{}</n1:password>
    </n1:login>
  </env:Body>
</env:Envelope>"#,
        xml_escape(username),
        xml_escape(password)
    )
}

/// Text content of the first `<tag>...</tag>` in `body`.
fn extract_tag(body: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = body.find(&open)? + open.len();
    let end = body[start..].find(&close)? + start;
    Some(body[start..end].to_string())
}
