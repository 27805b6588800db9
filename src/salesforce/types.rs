use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// A query result record as returned by the REST API (nested objects kept).
pub type Record = Value;

/// Salesforce objects this tool touches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SObject {
    Contact,
    Account,
    Case,
}

impl SObject {
    pub fn as_str(&self) -> &'static str {
        match self {
            SObject::Contact => "Contact",
            SObject::Account => "Account",
            SObject::Case => "Case",
        }
    }
}

impl std::fmt::Display for SObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOperation {
    Update,
    Delete,
}

impl BulkOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkOperation::Update => "update",
            BulkOperation::Delete => "delete",
        }
    }
}

impl std::fmt::Display for BulkOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Flag(bool),
    Text(String),
}

impl FieldValue {
    /// CSV rendering: flags as `1`/`0`.
    pub fn to_csv(&self) -> String {
        match self {
            FieldValue::Flag(true) => "1".to_string(),
            FieldValue::Flag(false) => "0".to_string(),
            FieldValue::Text(s) => s.clone(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Flag(b) => Value::Bool(*b),
            FieldValue::Text(s) => Value::String(s.clone()),
        }
    }
}

/// One flat record of a bulk payload, `Id` first.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkRecord {
    pub id: String,
    pub fields: Vec<(&'static str, FieldValue)>,
}

impl BulkRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Vec::new(),
        }
    }

    pub fn with(mut self, name: &'static str, value: FieldValue) -> Self {
        self.fields.push((name, value));
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    /// Column names in export order.
    pub fn columns(&self) -> Vec<&'static str> {
        std::iter::once("Id")
            .chain(self.fields.iter().map(|(n, _)| *n))
            .collect()
    }

    pub fn csv_values(&self) -> Vec<String> {
        std::iter::once(self.id.clone())
            .chain(self.fields.iter().map(|(_, v)| v.to_csv()))
            .collect()
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("Id".to_string(), Value::String(self.id.clone()));
        for (name, value) in &self.fields {
            map.insert(name.to_string(), value.to_json());
        }
        Value::Object(map)
    }
}

/// Per-record result of a bulk batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkOutcome {
    pub success: bool,
    #[serde(default)]
    pub created: bool,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub errors: Vec<Value>,
}

impl BulkOutcome {
    pub fn ok(id: impl Into<String>) -> Self {
        Self {
            success: true,
            created: false,
            id: Some(id.into()),
            errors: Vec::new(),
        }
    }

    /// Outcome recorded for a record whose whole batch was rejected.
    pub fn batch_failed(id: impl Into<String>, message: &str) -> Self {
        Self {
            success: false,
            created: false,
            id: Some(id.into()),
            errors: vec![json!({ "statusCode": "BATCH_FAILED", "message": message })],
        }
    }
}

impl std::fmt::Display for BulkOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_string(self) {
            Ok(line) => f.write_str(&line),
            Err(_) => write!(f, "{:?}", self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_rendering() {
        let record = BulkRecord::new("003A")
            .with("GDPR__c", FieldValue::Flag(true))
            .with("Marketing_Status__c", FieldValue::Text("No Marketing".to_string()));

        assert_eq!(record.columns(), vec!["Id", "GDPR__c", "Marketing_Status__c"]);
        assert_eq!(record.csv_values(), vec!["003A", "1", "No Marketing"]);
        assert_eq!(
            record.to_json(),
            json!({ "Id": "003A", "GDPR__c": true, "Marketing_Status__c": "No Marketing" })
        );
    }

    #[test]
    fn test_outcome_parses_bulk_result() {
        let raw = r#"[{"success":false,"created":false,"id":null,"errors":[{"statusCode":"ENTITY_IS_DELETED","message":"gone"}]}]"#;
        let outcomes: Vec<BulkOutcome> = serde_json::from_str(raw).unwrap();
        assert!(!outcomes[0].success);
        assert_eq!(outcomes[0].errors.len(), 1);
        assert!(outcomes[0].to_string().contains("ENTITY_IS_DELETED"));
    }
}
