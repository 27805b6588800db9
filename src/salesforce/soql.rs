//! SOQL text building. Queries are plain strings, so every interpolated value
//! goes through [`escape_literal`].

/// Escape a value for use inside a single-quoted SOQL literal.
pub fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Comma-separated list of quoted, escaped literals. Blank values are skipped.
pub fn quoted_list<S: AsRef<str>>(values: &[S]) -> String {
    values
        .iter()
        .map(|v| v.as_ref().trim())
        .filter(|v| !v.is_empty())
        .map(|v| format!("'{}'", escape_literal(v)))
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Debug, Clone)]
pub struct SoqlQuery {
    fields: Vec<&'static str>,
    object: &'static str,
}

impl SoqlQuery {
    pub fn select(fields: &[&'static str]) -> Self {
        Self {
            fields: fields.to_vec(),
            object: "",
        }
    }

    pub fn from(mut self, object: &'static str) -> Self {
        self.object = object;
        self
    }

    fn head(&self) -> String {
        format!("SELECT {} FROM {}", self.fields.join(", "), self.object)
    }

    /// `... WHERE field IN (...)`, or `None` when no usable value is left.
    pub fn where_in<S: AsRef<str>>(&self, field: &str, values: &[S]) -> Option<String> {
        let list = quoted_list(values);
        if list.is_empty() {
            return None;
        }
        Some(format!("{} WHERE {} IN ({})", self.head(), field, list))
    }

    /// Fixed condition, no interpolation.
    pub fn where_clause(&self, condition: &'static str) -> String {
        format!("{} WHERE {}", self.head(), condition)
    }
}
