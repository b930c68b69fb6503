// Table references accepted from the agent
//
// Names arrive as free text from an LLM, so they are validated as plain
// identifiers before they reach any SQL text.

use crate::error::CheckError;
use std::fmt;
use std::str::FromStr;

/// Redshift truncates identifiers beyond 127 bytes
const MAX_IDENTIFIER_BYTES: usize = 127;

/// A validated `table` or `schema.table` reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    schema: Option<String>,
    table: String,
}

impl TableName {
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// `ANALYZE` statement for this table
    pub fn analyze_statement(&self) -> String {
        format!("ANALYZE {};", self)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.table),
            None => write!(f, "{}", self.table),
        }
    }
}

impl FromStr for TableName {
    type Err = CheckError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CheckError::MissingParameter("table_name"));
        }

        let invalid = |reason: String| CheckError::InvalidTableName {
            name: trimmed.to_string(),
            reason,
        };

        let mut parts = trimmed.split('.');
        let first = parts.next().unwrap_or_default();
        let second = parts.next();
        if parts.next().is_some() {
            return Err(invalid("expected 'table' or 'schema.table'".to_string()));
        }

        let (schema, table) = match second {
            Some(table) => (Some(first), table),
            None => (None, first),
        };

        if let Some(schema) = schema {
            validate_identifier(schema).map_err(|reason| invalid(format!("schema {}", reason)))?;
        }
        validate_identifier(table).map_err(|reason| invalid(format!("table {}", reason)))?;

        // Unquoted identifiers are folded to lower case by the warehouse and
        // stored that way in its catalog views
        Ok(Self {
            schema: schema.map(str::to_ascii_lowercase),
            table: table.to_ascii_lowercase(),
        })
    }
}

fn validate_identifier(ident: &str) -> Result<(), String> {
    if ident.is_empty() {
        return Err("name is empty".to_string());
    }
    if ident.len() > MAX_IDENTIFIER_BYTES {
        return Err(format!("name exceeds {} bytes", MAX_IDENTIFIER_BYTES));
    }

    let mut chars = ident.chars();
    let first = chars.next().unwrap_or_default();
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err("name must start with a letter or underscore".to_string());
    }
    if let Some(bad) = chars.find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '$')) {
        return Err(format!("name contains unsupported character '{}'", bad));
    }
    Ok(())
}
