use tracing::info;

use crate::{
    error::Result,
    pipeline::{
        reshape::{
            contact_flag_payload, household_account_payload, reshape, resolve_contacts, ACCOUNT_FLAG,
            CONTACT_FLAG,
        },
        submit::{report, BatchReport, BulkSubmitter},
        PipelineContext, PipelineRun, PipelineStage,
    },
    salesforce::{BulkOperation, SObject},
};

pub const BATCH_SIZE: usize = 20;
const FIELDS: &[&str] = &["Id", "AccountId", "Account.RecordTypeId"];

#[derive(Debug, Default)]
pub struct DataRemovalSummary {
    pub contacts: BatchReport,
    pub accounts: BatchReport,
}

/// Flag the contacts behind `emails` and their household accounts for deletion.
pub async fn run(ctx: PipelineContext<'_>, emails: &[String]) -> Result<DataRemovalSummary> {
    let mut run = PipelineRun::new("data removal", PipelineStage::Categorized);

    println!("Querying accounts and contacts from SFDC.");
    let records = run.check(
        PipelineStage::Resolved,
        resolve_contacts(ctx.crm, FIELDS, emails, ctx.config.requests.email_chunk_size).await,
    )?;
    let rows = reshape(&records);
    println!("{} contact(s) found.", rows.len());

    let contacts = contact_flag_payload(&rows);
    println!(
        "Identified {} contact(s) to be flagged for deletion. (Setting `{}` to true.)",
        contacts.len(),
        CONTACT_FLAG
    );
    let accounts = household_account_payload(&rows, &ctx.config.salesforce.household_record_type_id);
    println!(
        "Identified {} household account(s) to be flagged for deletion. (Setting `{}` to true.)",
        accounts.len(),
        ACCOUNT_FLAG
    );
    run.advance(PipelineStage::Flagged);

    println!("Exporting to CSV.");
    run.check(
        PipelineStage::Exported,
        ctx.audit
            .export_records("data_removal_contacts", &["Id", CONTACT_FLAG], &contacts)
            .and_then(|_| {
                ctx.audit
                    .export_records("data_removal_accounts", &["Id", ACCOUNT_FLAG], &accounts)
            }),
    )?;

    let submitter = BulkSubmitter::new(ctx.crm, BATCH_SIZE);

    println!("Pushing the GDPR flag update to contacts in SFDC. Please wait.");
    let submission = submitter
        .submit(SObject::Contact, BulkOperation::Update, &contacts)
        .await;
    run.advance(PipelineStage::Submitted);
    let contacts = run.check(
        PipelineStage::Reported,
        report(ctx.audit, "data_removal_contacts", submission.outcomes),
    )?;

    println!("Pushing the GDPR flag update to household accounts in SFDC. Please wait.");
    let submission = submitter
        .submit(SObject::Account, BulkOperation::Update, &accounts)
        .await;
    let accounts = run.check(
        PipelineStage::Reported,
        report(ctx.audit, "data_removal_accounts", submission.outcomes),
    )?;

    info!(
        contacts_ok = contacts.successful(),
        accounts_ok = accounts.successful(),
        "Data removal flags pushed"
    );
    Ok(DataRemovalSummary { contacts, accounts })
}
