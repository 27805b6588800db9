use std::path::Path;

use calamine::{open_workbook, Reader, Xlsx};
use csv::ReaderBuilder;
use tracing::debug;

use crate::error::{RemovalError, Result};

pub const ASSIGNEE_COLUMN: &str = "Task Assignee - Subtask";
pub const WORKFLOW_COLUMN: &str = "Workflows";
pub const EMAIL_COLUMN: &str = "Email";

/// Spreadsheet format of a request export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Xlsx,
    Csv,
}

impl InputFormat {
    /// `x` for XLSX, `c` for CSV. Anything else is rejected.
    pub fn parse(answer: &str) -> Result<Self> {
        match answer.trim().to_lowercase().as_str() {
            "x" => Ok(InputFormat::Xlsx),
            "c" => Ok(InputFormat::Csv),
            other => Err(RemovalError::InvalidInput(format!(
                "expected 'x' or 'c', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestRow {
    pub assignee: String,
    pub workflow: String,
    pub email: String,
    /// Every cell of the row, aligned with `RequestTable::headers`.
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RequestTable {
    pub headers: Vec<String>,
    pub rows: Vec<RequestRow>,
}

impl RequestTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Build from a header row and string cells, checking required columns.
    pub fn from_cells(headers: Vec<String>, cells: Vec<Vec<String>>) -> Result<Self> {
        let index = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| RemovalError::MissingColumn(name.to_string()))
        };
        let assignee = index(ASSIGNEE_COLUMN)?;
        let workflow = index(WORKFLOW_COLUMN)?;
        let email = index(EMAIL_COLUMN)?;

        let headers: Vec<String> = headers.iter().map(|h| h.trim().to_string()).collect();
        let width = headers.len();

        let rows = cells
            .into_iter()
            .filter(|cells| cells.iter().any(|c| !c.trim().is_empty()))
            .map(|mut values| {
                values.resize(width, String::new());
                RequestRow {
                    assignee: values[assignee].clone(),
                    workflow: values[workflow].clone(),
                    email: values[email].trim().to_string(),
                    values,
                }
            })
            .collect();

        Ok(Self { headers, rows })
    }
}

pub fn load_requests(path: &Path, format: InputFormat) -> Result<RequestTable> {
    debug!("Loading {:?} requests from {}", format, path.display());
    match format {
        InputFormat::Csv => load_csv(path),
        InputFormat::Xlsx => load_xlsx(path),
    }
}

fn load_csv(path: &Path) -> Result<RequestTable> {
    let mut reader = ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.iter().map(str::to_string).collect();

    let mut cells = Vec::new();
    for record in reader.records() {
        cells.push(record?.iter().map(str::to_string).collect());
    }

    RequestTable::from_cells(headers, cells)
}

fn load_xlsx(path: &Path) -> Result<RequestTable> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| RemovalError::InvalidInput("no worksheet found".to_string()))??;

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect::<Vec<String>>());
    let headers = rows.next().unwrap_or_default();

    RequestTable::from_cells(headers, rows.collect())
}

/// Newline-delimited address list. Lines are right-trimmed, blank lines skipped.
pub fn load_email_list(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
