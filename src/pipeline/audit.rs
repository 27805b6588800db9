//! Export snapshots (`exports/`) and bulk result logs (`results/`).
//!
//! Files are named `<purpose>_<stamp>.csv` and `results_<purpose>_<stamp>.txt`,
//! where the stamp is taken once per action run. Existing files are never
//! overwritten: a `_2`, `_3`, ... suffix is added instead.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use csv::Writer;
use tracing::info;

use crate::{
    config::OutputConfig,
    error::Result,
    salesforce::{BulkOutcome, BulkRecord},
};

pub const STAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

#[derive(Debug, Clone)]
pub struct AuditWriter {
    exports_dir: PathBuf,
    results_dir: PathBuf,
    stamp: String,
}

impl AuditWriter {
    pub fn new(output: &OutputConfig) -> Self {
        Self::with_stamp(
            &output.exports_dir,
            &output.results_dir,
            Local::now().format(STAMP_FORMAT).to_string(),
        )
    }

    pub fn with_stamp(
        exports_dir: impl Into<PathBuf>,
        results_dir: impl Into<PathBuf>,
        stamp: impl Into<String>,
    ) -> Self {
        Self {
            exports_dir: exports_dir.into(),
            results_dir: results_dir.into(),
            stamp: stamp.into(),
        }
    }

    pub fn stamp(&self) -> &str {
        &self.stamp
    }

    /// Write the outbound payload. `columns` is used as the header when
    /// `records` is empty.
    pub fn export_records(
        &self,
        purpose: &str,
        columns: &[&str],
        records: &[BulkRecord],
    ) -> Result<PathBuf> {
        let header: Vec<String> = match records.first() {
            Some(first) => first.columns().into_iter().map(str::to_string).collect(),
            None => columns.iter().map(|c| c.to_string()).collect(),
        };
        let rows: Vec<Vec<String>> = records.iter().map(BulkRecord::csv_values).collect();
        self.export_table(purpose, &header, &rows)
    }

    pub fn export_table(&self, purpose: &str, headers: &[String], rows: &[Vec<String>]) -> Result<PathBuf> {
        fs::create_dir_all(&self.exports_dir)?;
        let path = unique_path(&self.exports_dir, purpose, &self.stamp, "csv");

        let mut writer = Writer::from_path(&path)?;
        writer.write_record(headers)?;
        for row in rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;

        info!("Exported {} row(s) to {}", rows.len(), path.display());
        Ok(path)
    }

    /// One line per outcome, in submission order.
    pub fn write_results(&self, purpose: &str, outcomes: &[BulkOutcome]) -> Result<PathBuf> {
        fs::create_dir_all(&self.results_dir)?;
        let path = unique_path(
            &self.results_dir,
            &format!("results_{}", purpose),
            &self.stamp,
            "txt",
        );

        let mut file = fs::File::create(&path)?;
        for outcome in outcomes {
            writeln!(file, "{}", outcome)?;
        }
        file.sync_all()?;

        info!("Wrote {} result(s) to {}", outcomes.len(), path.display());
        Ok(path)
    }
}

fn unique_path(dir: &Path, prefix: &str, stamp: &str, extension: &str) -> PathBuf {
    let candidate = dir.join(format!("{}_{}.{}", prefix, stamp, extension));
    if !candidate.exists() {
        return candidate;
    }
    (2..)
        .map(|n| dir.join(format!("{}_{}_{}.{}", prefix, stamp, n, extension)))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing;
    use crate::salesforce::FieldValue;

    #[test]
    fn test_export_renders_flags() {
        let dir = tempfile::tempdir().unwrap();
        let audit = testing::audit(&dir);
        let records = vec![
            BulkRecord::new("003A").with("GDPR__c", FieldValue::Flag(true)),
            BulkRecord::new("003B").with("GDPR__c", FieldValue::Flag(true)),
        ];

        let path = audit.export_records("data_removal_contacts", &["Id", "GDPR__c"], &records).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "data_removal_contacts_2026-10-14-09-30-00.csv"
        );
        assert_eq!(fs::read_to_string(path).unwrap(), "Id,GDPR__c\n003A,1\n003B,1\n");
    }

    #[test]
    fn test_empty_export_still_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let audit = testing::audit(&dir);
        let path = audit.export_records("data_removal_accounts", &["Id", "GDPR_Account__c"], &[]).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "Id,GDPR_Account__c\n");
    }

    #[test]
    fn test_files_are_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let audit = testing::audit(&dir);
        let outcomes = vec![BulkOutcome::ok("003A")];

        let first = audit.write_results("flag_contacts_from_bulk_list", &outcomes).unwrap();
        let second = audit.write_results("flag_contacts_from_bulk_list", &outcomes).unwrap();

        assert_ne!(first, second);
        assert_eq!(
            testing::files_in(&dir.path().join("results")),
            vec![
                "results_flag_contacts_from_bulk_list_2026-10-14-09-30-00.txt",
                "results_flag_contacts_from_bulk_list_2026-10-14-09-30-00_2.txt",
            ]
        );
    }

    #[test]
    fn test_stamp_format() {
        let audit = AuditWriter::new(&OutputConfig::default());
        assert!(chrono::NaiveDateTime::parse_from_str(audit.stamp(), STAMP_FORMAT).is_ok());
    }
}
