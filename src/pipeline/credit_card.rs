//! Credit card removal requests are not flagged in the CRM. The requests are
//! joined to their contacts and exported with direct record links, for a
//! manual search.

use std::path::PathBuf;

use colored::Colorize;

use crate::{
    error::Result,
    pipeline::{
        reshape::{reshape, resolve_contacts, ContactRow},
        PipelineContext, PipelineRun, PipelineStage,
    },
    requests::{loader::EMAIL_COLUMN, ClassifiedRequests, RequestCategory, RequestRow},
};

const FIELDS: &[&str] = &["Id", "Email", "AccountId", "Account.RecordTypeId"];
const CONTACT_COLUMNS: [&str; 4] = ["Id", "AccountId", "RecordTypeId", "sfdc_contact_link"];

pub fn contact_link(lightning_url: &str, id: &str) -> String {
    format!("{}/lightning/r/{}/view", lightning_url.trim_end_matches('/'), id)
}

/// Left join of request rows to contacts on lowercased email. A request with
/// several matching contacts yields one row per contact; the email column is
/// written lowercased.
pub fn merge_requests_with_contacts(
    headers: &[String],
    requests: &[&RequestRow],
    contacts: &[ContactRow],
    lightning_url: &str,
) -> (Vec<String>, Vec<Vec<String>>) {
    let email_index = headers.iter().position(|h| h == EMAIL_COLUMN);

    let mut merged_headers = headers.to_vec();
    merged_headers.extend(CONTACT_COLUMNS.iter().map(|c| c.to_string()));

    let mut rows = Vec::new();
    for request in requests {
        let email = request.email.to_lowercase();
        let mut base = request.values.clone();
        if let Some(i) = email_index {
            base[i] = email.clone();
        }

        let matches: Vec<&ContactRow> = contacts
            .iter()
            .filter(|c| c.email.as_deref().map(str::to_lowercase).as_deref() == Some(email.as_str()))
            .collect();

        if matches.is_empty() {
            let mut row = base.clone();
            row.extend(std::iter::repeat(String::new()).take(CONTACT_COLUMNS.len()));
            rows.push(row);
            continue;
        }

        for contact in matches {
            let mut row = base.clone();
            row.push(contact.id.clone().unwrap_or_default());
            row.push(contact.account_id.clone().unwrap_or_default());
            row.push(contact.record_type_id.clone().unwrap_or_default());
            row.push(
                contact
                    .id
                    .as_deref()
                    .map(|id| contact_link(lightning_url, id))
                    .unwrap_or_default(),
            );
            rows.push(row);
        }
    }

    (merged_headers, rows)
}

/// Export the credit card requests with their contacts. `None` when there were
/// no requests or no contact was found.
pub async fn run(ctx: PipelineContext<'_>, requests: &ClassifiedRequests) -> Result<Option<PathBuf>> {
    let rows: Vec<&RequestRow> = requests.rows_in(RequestCategory::CreditCardRemoval).collect();
    if rows.is_empty() {
        println!("No credit card removal requests to process.");
        return Ok(None);
    }

    let mut run = PipelineRun::new("credit card removal", PipelineStage::Categorized);
    let emails: Vec<String> = rows.iter().map(|r| r.email.clone()).collect();

    println!("Querying credit card removal contacts from SFDC.");
    let records = run.check(
        PipelineStage::Resolved,
        resolve_contacts(ctx.crm, FIELDS, &emails, ctx.config.requests.email_chunk_size).await,
    )?;
    let contacts = reshape(&records);
    println!("{} contact(s) found.", contacts.len());
    if contacts.is_empty() {
        return Ok(None);
    }

    println!("Generating SFDC links.");
    let (headers, merged) = merge_requests_with_contacts(
        &requests.headers,
        &rows,
        &contacts,
        &ctx.config.salesforce.lightning_url,
    );

    println!("Exporting to CSV.");
    let path = run.check(
        PipelineStage::Exported,
        ctx.audit
            .export_table("cc_removal_requests_with_contacts", &headers, &merged),
    )?;

    println!(
        "{}",
        "Don't forget to open the exported credit card removal requests file and manually look for credit card numbers in SFDC."
            .yellow()
    );
    Ok(Some(path))
}
