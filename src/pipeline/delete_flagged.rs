//! Final deletion of everything flagged with `GDPR__c`. Cases go first because
//! they reference their contacts.

use crate::{
    error::Result,
    pipeline::{
        reshape::record_ids,
        submit::{report, BatchReport, BulkSubmitter},
        PipelineContext, PipelineRun, PipelineStage,
    },
    salesforce::{BulkOperation, BulkRecord, SObject, SoqlQuery},
};

pub const BATCH_SIZE: usize = 500;

#[derive(Debug, Default)]
pub struct DeleteSummary {
    pub cases: Option<BatchReport>,
    pub contacts: Option<BatchReport>,
}

struct DeleteStep {
    pipeline: &'static str,
    object: SObject,
    condition: &'static str,
    purpose: &'static str,
    query_message: &'static str,
    label: &'static str,
}

const CASES: DeleteStep = DeleteStep {
    pipeline: "case deletion",
    object: SObject::Case,
    condition: "Contact.GDPR__c = true",
    purpose: "gdpr_contact_cases_to_delete",
    query_message: "Querying all cases related to contacts flagged for deletion.",
    label: "case(s)",
};

const CONTACTS: DeleteStep = DeleteStep {
    pipeline: "contact deletion",
    object: SObject::Contact,
    condition: "GDPR__c = true",
    purpose: "gdpr_contacts_to_delete",
    query_message: "Querying all contacts flagged for deletion.",
    label: "contact(s)",
};

/// Delete flagged cases, then flagged contacts. `confirm` is asked before each
/// bulk delete; declining the case step also skips the contact step.
pub async fn run(ctx: PipelineContext<'_>, confirm: &dyn Fn(&str) -> bool) -> Result<DeleteSummary> {
    let mut summary = DeleteSummary::default();

    summary.cases = delete_step(ctx, &CASES, confirm).await?;
    if summary.cases.is_none() {
        println!("Skipping contact deletion.");
        return Ok(summary);
    }

    summary.contacts = delete_step(ctx, &CONTACTS, confirm).await?;
    Ok(summary)
}

async fn delete_step(
    ctx: PipelineContext<'_>,
    step: &DeleteStep,
    confirm: &dyn Fn(&str) -> bool,
) -> Result<Option<BatchReport>> {
    let mut run = PipelineRun::new(step.pipeline, PipelineStage::Loaded);

    println!("{}", step.query_message);
    let soql = SoqlQuery::select(&["Id"])
        .from(step.object.as_str())
        .where_clause(step.condition);
    let records = run.check(PipelineStage::Resolved, ctx.crm.query_all(&soql).await)?;
    let payload: Vec<BulkRecord> = record_ids(&records).into_iter().map(BulkRecord::new).collect();
    println!("{} {} found.", payload.len(), step.label);

    println!("Exporting to CSV.");
    run.check(
        PipelineStage::Exported,
        ctx.audit.export_records(step.purpose, &["Id"], &payload),
    )?;

    if !payload.is_empty() && !confirm(&format!("Delete {} {} in SFDC?", payload.len(), step.label)) {
        println!("Cancelled");
        return Ok(None);
    }

    println!("Deleting the {} in SFDC. Please wait.", step.label);
    let submission = BulkSubmitter::new(ctx.crm, BATCH_SIZE)
        .submit(step.object, BulkOperation::Delete, &payload)
        .await;
    run.advance(PipelineStage::Submitted);

    let report = run.check(
        PipelineStage::Reported,
        report(ctx.audit, step.purpose, submission.outcomes),
    )?;
    Ok(Some(report))
}
