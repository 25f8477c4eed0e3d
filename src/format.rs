//! JSON response shape. Orderings are taken as-is from the pipeline.

use serde::Serialize;

use crate::pipeline::Table;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableResponse {
    pub table_no: usize,
    pub rows: Vec<RowResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowResponse {
    pub row_no: usize,
    pub data: Vec<String>,
}

pub fn format_tables(tables: &[Table]) -> Vec<TableResponse> {
    tables
        .iter()
        .map(|table| TableResponse {
            table_no: table.table_no(),
            rows: table
                .rows()
                .iter()
                .map(|row| RowResponse {
                    row_no: row.row_no(),
                    data: row.cells().to_vec(),
                })
                .collect(),
            error: table.error().map(str::to_string),
        })
        .collect()
}

pub fn to_json_pretty(tables: &[Table]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&format_tables(tables))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_page_serializes_to_empty_array() {
        assert_eq!(serde_json::to_string(&format_tables(&[])).unwrap(), "[]");
    }

    #[test]
    fn error_field_only_on_failed_tables() {
        let ok = TableResponse {
            table_no: 1,
            rows: vec![RowResponse {
                row_no: 1,
                data: vec!["a".to_string(), "b".to_string()],
            }],
            error: None,
        };
        let failed = TableResponse {
            table_no: 2,
            rows: Vec::new(),
            error: Some("text recognition failed: boom".to_string()),
        };
        let value = serde_json::to_value(vec![ok, failed]).unwrap();
        assert_eq!(
            value,
            serde_json::json!([
                { "table_no": 1, "rows": [{ "row_no": 1, "data": ["a", "b"] }] },
                { "table_no": 2, "rows": [], "error": "text recognition failed: boom" }
            ])
        );
    }
}
