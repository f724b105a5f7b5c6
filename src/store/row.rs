use super::StoreError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Positional parameter bound to a [`Query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryParam {
    Text(String),
    Long(i64),
}

/// Type used to decode a result column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Long,
    Text,
}

/// SQL text plus its bound parameters and the columns to read back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    sql: String,
    params: Vec<QueryParam>,
    columns: Vec<(&'static str, ColumnKind)>,
}

impl Query {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
            columns: Vec::new(),
        }
    }

    pub fn bind(mut self, param: QueryParam) -> Self {
        self.params.push(param);
        self
    }

    pub fn bind_text(self, value: impl Into<String>) -> Self {
        self.bind(QueryParam::Text(value.into()))
    }

    pub fn bind_long(self, value: i64) -> Self {
        self.bind(QueryParam::Long(value))
    }

    /// Declare an integer column in the result set.
    pub fn long_column(mut self, name: &'static str) -> Self {
        self.columns.push((name, ColumnKind::Long));
        self
    }

    /// Declare a (nullable) text column in the result set.
    pub fn text_column(mut self, name: &'static str) -> Self {
        self.columns.push((name, ColumnKind::Text));
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[QueryParam] {
        &self.params
    }

    pub fn columns(&self) -> &[(&'static str, ColumnKind)] {
        &self.columns
    }
}

/// A single decoded value, either from a result row or an artifact attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Long(i64),
    Text(String),
}

/// One result row with named-column access.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    values: Vec<(String, CellValue)>,
}

impl Row {
    pub fn new(values: Vec<(String, CellValue)>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&CellValue> {
        self.values
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    pub fn get_long(&self, name: &str) -> Result<i64, StoreError> {
        match self.get(name) {
            Some(CellValue::Long(value)) => Ok(*value),
            Some(_) => Err(StoreError::ColumnType {
                column: name.to_string(),
                expected: "integer",
            }),
            None => Err(StoreError::MissingColumn(name.to_string())),
        }
    }

    /// Text value of a column; SQL `NULL` reads as `None`.
    pub fn get_string(&self, name: &str) -> Result<Option<&str>, StoreError> {
        match self.get(name) {
            Some(CellValue::Text(value)) => Ok(Some(value.as_str())),
            Some(CellValue::Null) => Ok(None),
            Some(CellValue::Long(_)) => Err(StoreError::ColumnType {
                column: name.to_string(),
                expected: "text",
            }),
            None => Err(StoreError::MissingColumn(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> Row {
        Row::new(vec![
            ("count".to_string(), CellValue::Long(4)),
            ("folder".to_string(), CellValue::Text("Inbox".to_string())),
            ("account".to_string(), CellValue::Null),
        ])
    }

    #[test]
    fn named_column_access() {
        let row = sample_row();
        assert_eq!(row.get_long("count"), Ok(4));
        assert_eq!(row.get_string("folder"), Ok(Some("Inbox")));
        assert_eq!(row.get_string("account"), Ok(None));
    }

    #[test]
    fn wrong_type_or_missing_column_fails() {
        let row = sample_row();
        assert!(matches!(
            row.get_long("folder"),
            Err(StoreError::ColumnType { .. })
        ));
        assert_eq!(
            row.get_string("path"),
            Err(StoreError::MissingColumn("path".to_string()))
        );
    }

    #[test]
    fn query_keeps_bind_order() {
        let query = Query::new("SELECT 1")
            .bind_text("/%/bob/%")
            .bind_long(7)
            .long_column("count");
        assert_eq!(
            query.params(),
            &[QueryParam::Text("/%/bob/%".to_string()), QueryParam::Long(7)]
        );
        assert_eq!(query.columns(), &[("count", ColumnKind::Long)]);
    }
}
