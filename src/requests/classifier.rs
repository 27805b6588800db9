use serde::Serialize;
use tracing::info;

use crate::requests::loader::{RequestRow, RequestTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestCategory {
    DataRemoval,
    Unsubscribe,
    CreditCardRemoval,
}

impl RequestCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestCategory::DataRemoval => "data_removal",
            RequestCategory::Unsubscribe => "unsubscribe",
            RequestCategory::CreditCardRemoval => "credit_card_removal",
        }
    }
}

impl std::fmt::Display for RequestCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow labels per category, tested in this order. First match wins.
const RULES: &[(&[&str], RequestCategory)] = &[
    (
        &["[Consumer] Data Removal", "[E&E] Data Removal"],
        RequestCategory::DataRemoval,
    ),
    (&["[Consumer] Unsubscribe"], RequestCategory::Unsubscribe),
    (
        &["[Consumer] Credit Card Removal"],
        RequestCategory::CreditCardRemoval,
    ),
];

pub fn categorize(workflow: &str) -> Option<RequestCategory> {
    RULES
        .iter()
        .find(|(labels, _)| labels.contains(&workflow))
        .map(|(_, category)| *category)
}

#[derive(Debug, Clone)]
pub struct ClassifiedRow {
    pub row: RequestRow,
    pub category: Option<RequestCategory>,
}

/// Request rows left after the assignee filter, each with its category.
#[derive(Debug, Clone)]
pub struct ClassifiedRequests {
    pub headers: Vec<String>,
    pub rows: Vec<ClassifiedRow>,
}

impl ClassifiedRequests {
    pub fn rows_in(&self, category: RequestCategory) -> impl Iterator<Item = &RequestRow> {
        self.rows
            .iter()
            .filter(move |r| r.category == Some(category))
            .map(|r| &r.row)
    }

    pub fn emails(&self, category: RequestCategory) -> Vec<String> {
        self.rows_in(category).map(|r| r.email.clone()).collect()
    }

    pub fn count(&self, category: RequestCategory) -> usize {
        self.rows_in(category).count()
    }
}

/// Keep rows assigned to `assignee` and categorize them by workflow label.
pub fn classify(table: RequestTable, assignee: &str) -> ClassifiedRequests {
    println!("Filtering for {} tasks.", assignee);
    let rows: Vec<ClassifiedRow> = table
        .rows
        .into_iter()
        .filter(|row| row.assignee == assignee)
        .map(|row| {
            let category = categorize(&row.workflow);
            ClassifiedRow { row, category }
        })
        .collect();
    println!("{} requests remaining.", rows.len());
    println!("Categorizing.");

    let classified = ClassifiedRequests {
        headers: table.headers,
        rows,
    };

    info!(
        data_removal = classified.count(RequestCategory::DataRemoval),
        unsubscribe = classified.count(RequestCategory::Unsubscribe),
        credit_card_removal = classified.count(RequestCategory::CreditCardRemoval),
        "Requests categorized"
    );

    classified
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[(&str, &str, &str)]) -> RequestTable {
        RequestTable {
            headers: vec![
                "Task Assignee - Subtask".to_string(),
                "Workflows".to_string(),
                "Email".to_string(),
            ],
            rows: rows
                .iter()
                .map(|(assignee, workflow, email)| RequestRow {
                    assignee: assignee.to_string(),
                    workflow: workflow.to_string(),
                    email: email.to_string(),
                    values: vec![assignee.to_string(), workflow.to_string(), email.to_string()],
                })
                .collect(),
        }
    }

    #[test]
    fn test_categorize_labels() {
        assert_eq!(categorize("[Consumer] Data Removal"), Some(RequestCategory::DataRemoval));
        assert_eq!(categorize("[E&E] Data Removal"), Some(RequestCategory::DataRemoval));
        assert_eq!(categorize("[Consumer] Unsubscribe"), Some(RequestCategory::Unsubscribe));
        assert_eq!(
            categorize("[Consumer] Credit Card Removal"),
            Some(RequestCategory::CreditCardRemoval)
        );
        assert_eq!(categorize("[Consumer] Access Request"), None);
        assert_eq!(categorize("[consumer] data removal"), None);
    }

    #[test]
    fn test_request_batch_scenario() {
        let classified = classify(
            table(&[
                ("Salesforce", "[Consumer] Data Removal", "a@x.com"),
                ("Salesforce", "[Consumer] Unsubscribe", "b@x.com"),
                ("Other", "[Consumer] Data Removal", "c@x.com"),
            ]),
            "Salesforce",
        );

        assert_eq!(classified.emails(RequestCategory::DataRemoval), vec!["a@x.com"]);
        assert_eq!(classified.emails(RequestCategory::Unsubscribe), vec!["b@x.com"]);
        assert!(classified.emails(RequestCategory::CreditCardRemoval).is_empty());
        assert!(classified.rows.iter().all(|r| r.row.email != "c@x.com"));
    }

    #[test]
    fn test_categories_are_disjoint() {
        let classified = classify(
            table(&[
                ("Salesforce", "[Consumer] Data Removal", "a@x.com"),
                ("Salesforce", "[E&E] Data Removal", "b@x.com"),
                ("Salesforce", "[Consumer] Unsubscribe", "c@x.com"),
                ("Salesforce", "[Consumer] Credit Card Removal", "d@x.com"),
                ("Salesforce", "Something else", "e@x.com"),
            ]),
            "Salesforce",
        );

        let all = [
            RequestCategory::DataRemoval,
            RequestCategory::Unsubscribe,
            RequestCategory::CreditCardRemoval,
        ];
        for row in &classified.rows {
            let memberships = all
                .iter()
                .filter(|c| classified.rows_in(**c).any(|r| r.email == row.row.email))
                .count();
            let expected = if row.row.email == "e@x.com" { 0 } else { 1 };
            assert_eq!(memberships, expected, "{}", row.row.email);
        }
        assert_eq!(classified.emails(RequestCategory::DataRemoval), vec!["a@x.com", "b@x.com"]);
    }
}
