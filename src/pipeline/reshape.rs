//! Contact resolution and the flat rows built from nested query records.

use std::collections::HashSet;

use tracing::debug;

use crate::{
    error::Result,
    pipeline::chunk::chunks,
    salesforce::{BulkRecord, Crm, FieldValue, Record, SoqlQuery},
};

pub const CONTACT_FLAG: &str = "GDPR__c";
pub const ACCOUNT_FLAG: &str = "GDPR_Account__c";

/// One resolved contact. Each field is present only if the record carried it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactRow {
    pub id: Option<String>,
    pub account_id: Option<String>,
    pub record_type_id: Option<String>,
    pub email: Option<String>,
}

/// Top-level string field, `None` when absent or null.
pub fn text_field(record: &Record, name: &str) -> Option<String> {
    record.get(name)?.as_str().map(str::to_string)
}

/// `parent.name`, `None` when either level is absent or null.
pub fn nested_field(record: &Record, parent: &str, name: &str) -> Option<String> {
    record.get(parent)?.get(name)?.as_str().map(str::to_string)
}

impl ContactRow {
    pub fn from_record(record: &Record) -> Self {
        Self {
            id: text_field(record, "Id"),
            account_id: text_field(record, "AccountId"),
            record_type_id: nested_field(record, "Account", "RecordTypeId"),
            email: text_field(record, "Email"),
        }
    }

    pub fn is_household(&self, household_record_type_id: &str) -> bool {
        self.record_type_id.as_deref() == Some(household_record_type_id)
    }
}

pub fn reshape(records: &[Record]) -> Vec<ContactRow> {
    records.iter().map(ContactRow::from_record).collect()
}

/// Query contacts by email, `chunk_size` addresses per query. Blank address
/// lists issue no query.
pub async fn resolve_contacts(
    crm: &dyn Crm,
    fields: &[&'static str],
    emails: &[String],
    chunk_size: usize,
) -> Result<Vec<Record>> {
    let select = SoqlQuery::select(fields).from("Contact");
    let mut records = Vec::new();

    for chunk in chunks(emails, chunk_size) {
        let Some(soql) = select.where_in("Email", chunk) else {
            debug!("Skipping query for {} blank address(es)", chunk.len());
            continue;
        };
        records.extend(crm.query_all(&soql).await?);
    }

    Ok(records)
}

/// `GDPR__c = true` for every contact with an id.
pub fn contact_flag_payload(rows: &[ContactRow]) -> Vec<BulkRecord> {
    rows.iter()
        .filter_map(|row| row.id.as_ref())
        .map(|id| BulkRecord::new(id.clone()).with(CONTACT_FLAG, FieldValue::Flag(true)))
        .collect()
}

/// `GDPR_Account__c = true` for each household account behind `rows`, once per
/// account, keyed by the account id.
pub fn household_account_payload(rows: &[ContactRow], household_record_type_id: &str) -> Vec<BulkRecord> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter(|row| row.is_household(household_record_type_id))
        .filter_map(|row| row.account_id.as_ref())
        .filter(|id| seen.insert(id.as_str()))
        .map(|id| BulkRecord::new(id.clone()).with(ACCOUNT_FLAG, FieldValue::Flag(true)))
        .collect()
}

/// Ids of a plain `SELECT Id ...` result.
pub fn record_ids(records: &[Record]) -> Vec<String> {
    records.iter().filter_map(|r| text_field(r, "Id")).collect()
}
