pub mod client;
pub mod bulk;
pub mod soql;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;

pub use client::SalesforceClient;
pub use soql::{escape_literal, SoqlQuery};
pub use types::{BulkOperation, BulkOutcome, BulkRecord, FieldValue, Record, SObject};

/// The two CRM calls every workflow is built from.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Crm: Send + Sync {
    /// Run a SOQL query and return every record, across all result pages.
    async fn query_all(&self, soql: &str) -> Result<Vec<Record>>;

    /// Submit a single bulk batch. Returns one outcome per record, in order.
    async fn submit_batch(
        &self,
        object: SObject,
        operation: BulkOperation,
        records: &[BulkRecord],
    ) -> Result<Vec<BulkOutcome>>;
}
