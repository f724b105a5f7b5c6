use std::collections::BTreeMap;

use crate::models::ResultRow;
use crate::store::{Artifact, CellValue};

/// Column keys and rows for a page of artifacts.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TableData {
    pub column_keys: Vec<String>,
    pub rows: Vec<ResultRow>,
}

/// Lay artifacts out as a table with one column per attribute type present,
/// ordered by attribute type id. Missing attributes are `Null` cells.
pub fn build_table(artifacts: &[Artifact]) -> TableData {
    let mut columns: BTreeMap<i32, &str> = BTreeMap::new();
    for artifact in artifacts {
        for attr in artifact.attributes() {
            columns.entry(attr.type_id).or_insert(attr.type_name.as_str());
        }
    }

    let rows = artifacts
        .iter()
        .map(|artifact| ResultRow {
            artifact_id: artifact.id(),
            data_source_id: artifact.data_source_id(),
            cells: columns
                .keys()
                .map(|type_id| {
                    artifact
                        .attribute_text(*type_id)
                        .map_or(CellValue::Null, |text| CellValue::Text(text.to_string()))
                })
                .collect(),
        })
        .collect();

    TableData {
        column_keys: columns.values().map(|name| name.to_string()).collect(),
        rows,
    }
}
