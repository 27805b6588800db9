use crate::{
    error::Result,
    pipeline::{
        reshape::{record_ids, resolve_contacts},
        submit::{report, BatchReport, BulkSubmitter},
        PipelineContext, PipelineRun, PipelineStage,
    },
    salesforce::{BulkOperation, BulkRecord, FieldValue, SObject},
};

pub const BATCH_SIZE: usize = 500;
pub const OPT_OUT_FIELD: &str = "HasOptedOutOfEmail";
pub const MARKETING_STATUS_FIELD: &str = "Marketing_Status__c";
pub const NO_MARKETING: &str = "No Marketing";

pub fn unsubscribe_payload(ids: &[String]) -> Vec<BulkRecord> {
    ids.iter()
        .map(|id| {
            BulkRecord::new(id.clone())
                .with(OPT_OUT_FIELD, FieldValue::Flag(true))
                .with(MARKETING_STATUS_FIELD, FieldValue::Text(NO_MARKETING.to_string()))
        })
        .collect()
}

/// Opt the contacts behind `emails` out of marketing. `None` when there was
/// nothing to update.
pub async fn run(ctx: PipelineContext<'_>, emails: &[String]) -> Result<Option<BatchReport>> {
    if emails.is_empty() {
        println!("No unsubscribe requests to process.");
        return Ok(None);
    }

    let mut run = PipelineRun::new("unsubscribe", PipelineStage::Categorized);

    println!("Querying contacts from SFDC that want to unsubscribe.");
    let records = run.check(
        PipelineStage::Resolved,
        resolve_contacts(ctx.crm, &["Id"], emails, ctx.config.requests.email_chunk_size).await,
    )?;
    let ids = record_ids(&records);
    println!("{} contact(s) found.", ids.len());
    if ids.is_empty() {
        return Ok(None);
    }

    println!(
        "Preparing to set `{}` to true and `{}` to '{}'.",
        OPT_OUT_FIELD, MARKETING_STATUS_FIELD, NO_MARKETING
    );
    let payload = unsubscribe_payload(&ids);
    run.advance(PipelineStage::Flagged);

    println!("Exporting to CSV.");
    run.check(
        PipelineStage::Exported,
        ctx.audit.export_records(
            "unsubscribe_contacts",
            &["Id", OPT_OUT_FIELD, MARKETING_STATUS_FIELD],
            &payload,
        ),
    )?;

    println!("Pushing the unsubscribe updates to contacts in SFDC. Please wait.");
    let submission = BulkSubmitter::new(ctx.crm, BATCH_SIZE)
        .submit(SObject::Contact, BulkOperation::Update, &payload)
        .await;
    run.advance(PipelineStage::Submitted);

    let report = run.check(
        PipelineStage::Reported,
        report(ctx.audit, "unsubscribe_contacts", submission.outcomes),
    )?;
    Ok(Some(report))
}
