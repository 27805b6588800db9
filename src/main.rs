mod cli;

use std::backtrace::Backtrace;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};

use clap::Parser;
use cli::{Cli, MenuAction};
use colored::*;
use futures::FutureExt;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sfdc_data_removal::{
    config::Config,
    error::Result,
    pipeline::{
        bulk_list,
        chunk::chunk_count,
        delete_flagged,
        requests::{run_request_batch, RequestBatchSummary},
        AuditWriter, PipelineContext,
    },
    requests::{classify, load_email_list, load_requests, InputFormat, RequestCategory},
    salesforce::SalesforceClient,
    utils,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("sfdc_data_removal=info,warn")),
        )
        .init();

    let cli = Cli::parse();

    println!("Welcome to the contact removal tool.");
    println!("Getting things ready...");

    if let Err(e) = enter_workdir(cli.workdir.as_deref()) {
        error!("Failed to enter the working directory: {}", e);
        exit_after_acknowledgement(&e);
    }

    println!("Opening {} to get the SFDC credentials.", cli.config.display());
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            exit_after_acknowledgement(&e);
        }
    };

    std::panic::set_hook(Box::new(|info| {
        eprintln!("{}", "An error occurred:".red().bold());
        eprintln!("{}", info);
        eprintln!("{}", Backtrace::force_capture());
    }));

    let outcome = AssertUnwindSafe(menu_loop(&config)).catch_unwind().await;
    if outcome.is_err() {
        utils::pause("Press Enter to exit...");
        std::process::exit(1);
    }

    println!("Exiting...");
}

fn exit_after_acknowledgement(error: &dyn std::fmt::Display) -> ! {
    let _ = utils::report_fatal(error, &mut std::io::stdin().lock(), &mut std::io::stdout());
    std::process::exit(1);
}

/// Relative paths (config, exports/, results/) resolve against the working
/// directory, which defaults to the directory holding the executable.
fn enter_workdir(workdir: Option<&Path>) -> std::io::Result<()> {
    let dir = match workdir {
        Some(dir) => dir.to_path_buf(),
        None => {
            let exe = std::env::current_exe()?;
            match exe.parent() {
                Some(parent) => parent.to_path_buf(),
                None => return Ok(()),
            }
        }
    };
    std::env::set_current_dir(&dir)?;
    info!(workdir = %dir.display(), "Working directory set");
    Ok(())
}

async fn menu_loop(config: &Config) {
    loop {
        let choice = match utils::select_option(
            "What action would you like to perform?",
            &MenuAction::labels(),
        ) {
            Ok(index) => MenuAction::ALL[index],
            Err(_) => MenuAction::Exit,
        };

        let result = match choice {
            MenuAction::HandleRequests => handle_requests(config).await,
            MenuAction::HandleEmailList => handle_email_list(config).await,
            MenuAction::DeleteFlagged => delete_flagged_records(config).await,
            MenuAction::Exit => return,
        };

        if let Err(e) = result {
            error!("{} failed: {}", choice.label(), e);
            println!("{}", format!("Error: {}. Returning to the main menu...", e).red());
        }
    }
}

/// Ask for an input path; `None` when the operator leaves it blank.
fn pick_file(prompt: &str) -> std::io::Result<Option<PathBuf>> {
    let answer = utils::prompt_line(prompt)?;
    let path = answer.trim().trim_matches(|c| c == '"' || c == '\'');
    if path.is_empty() {
        Ok(None)
    } else {
        Ok(Some(PathBuf::from(path)))
    }
}

async fn handle_requests(config: &Config) -> Result<()> {
    println!("Handling list of requests...");

    let answer = utils::prompt_line("XLSX (x) or CSV (c)? ")?;
    let format = match InputFormat::parse(&answer) {
        Ok(format) => format,
        Err(e) => {
            println!("{}. Returning to the main menu...", e);
            return Ok(());
        }
    };

    let Some(path) = pick_file("Path to the requests file: ")? else {
        println!("No file selected. Returning to the main menu...");
        return Ok(());
    };

    let table = match load_requests(&path, format) {
        Ok(table) => table,
        Err(e) => {
            println!("Error loading the file: {}. Returning to the main menu...", e);
            return Ok(());
        }
    };
    println!("{} requests loaded.", table.len());

    let classified = classify(table, &config.requests.task_assignee);
    println!("Extracting email addresses.");
    println!(
        "Identified {} data removal requests.",
        classified.count(RequestCategory::DataRemoval)
    );
    println!(
        "Identified {} unsubscribe requests.",
        classified.count(RequestCategory::Unsubscribe)
    );
    println!(
        "Identified {} credit card removal requests.",
        classified.count(RequestCategory::CreditCardRemoval)
    );

    utils::pause("Next step: Connect to SFDC. Press Enter to continue...");
    let client = SalesforceClient::connect(config).await?;
    let audit = AuditWriter::new(&config.output);
    let ctx = PipelineContext {
        crm: &client,
        audit: &audit,
        config,
    };

    let summary = run_request_batch(ctx, &classified).await;
    print_request_summary(&summary);

    utils::pause("Task completed. 🚀 Press Enter to return to the main menu...");
    Ok(())
}

fn print_request_summary(summary: &RequestBatchSummary) {
    let widths = [24, 8, 8];
    println!();
    utils::print_table_border(44);
    utils::print_table_row(&["Category", "OK", "Fail"], &widths);
    utils::print_table_border(44);

    if let Some(data_removal) = &summary.data_removal {
        for (label, report) in [
            ("Data removal contacts", &data_removal.contacts),
            ("Data removal accounts", &data_removal.accounts),
        ] {
            utils::print_table_row(
                &[label, &report.successful().to_string(), &report.failed().to_string()],
                &widths,
            );
        }
    }
    if let Some(report) = &summary.unsubscribe {
        utils::print_table_row(
            &["Unsubscribe", &report.successful().to_string(), &report.failed().to_string()],
            &widths,
        );
    }
    utils::print_table_border(44);

    if let Some(path) = &summary.credit_card_export {
        println!("Credit card removal export: {}", path.display().to_string().cyan());
    }
    for e in &summary.errors {
        println!("{}", e.red());
    }
}

async fn handle_email_list(config: &Config) -> Result<()> {
    println!("Handling list of email addresses...");

    let Some(path) = pick_file("Path to the email list: ")? else {
        println!("No file selected. Returning to the main menu...");
        return Ok(());
    };

    let emails = match load_email_list(&path) {
        Ok(emails) => emails,
        Err(e) => {
            println!("Error loading the file: {}. Returning to the main menu...", e);
            return Ok(());
        }
    };

    let chunk_size = config.requests.email_chunk_size;
    println!("{} email addresses loaded.", emails.len());
    println!(
        "Splitting the data into {} chunks of up to {} contacts each.",
        chunk_count(emails.len(), chunk_size),
        chunk_size
    );

    utils::pause("Next step: Connect to SFDC. Press Enter to continue...");
    let client = SalesforceClient::connect(config).await?;
    let audit = AuditWriter::new(&config.output);
    let ctx = PipelineContext {
        crm: &client,
        audit: &audit,
        config,
    };

    let summary = bulk_list::run(ctx, &emails).await?;
    println!(
        "Processed {} chunk(s): {} contact(s) and {} account(s) flagged, {} failed.",
        summary.chunks, summary.contacts_flagged, summary.accounts_flagged, summary.failed
    );
    for e in &summary.update_errors {
        println!("{}", e.red());
    }

    utils::pause("Task completed. 🚀 Press Enter to return to the main menu...");
    Ok(())
}

async fn delete_flagged_records(config: &Config) -> Result<()> {
    println!("Deleting all flagged records...");

    utils::pause("Next step: Connect to SFDC. Press Enter to continue...");
    let client = SalesforceClient::connect(config).await?;
    let audit = AuditWriter::new(&config.output);
    let ctx = PipelineContext {
        crm: &client,
        audit: &audit,
        config,
    };

    let summary = delete_flagged::run(ctx, &utils::confirm_action).await?;
    if summary.cases.is_none() && summary.contacts.is_none() {
        println!("{}", "Nothing was deleted.".yellow());
    }

    utils::pause("Task completed. 🚀 Press Enter to return to the main menu...");
    Ok(())
}
