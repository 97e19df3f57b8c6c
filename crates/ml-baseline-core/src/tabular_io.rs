//! Reading and writing tables as CSV or column-oriented JSON
//!
//! The on-disk format is chosen from the file extension, the same way
//! training configuration files are.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::error::{BaselineError, Result};
use crate::schema::DType;
use crate::table::{Column, ColumnData, Table};

/// Supported table file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Json,
}

impl TableFormat {
    /// Pick a format from the file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("csv") => Ok(TableFormat::Csv),
            Some("json") => Ok(TableFormat::Json),
            _ => Err(BaselineError::configuration(format!(
                "Unsupported table format for {}; supported: .csv, .json",
                path.display()
            ))),
        }
    }

    /// Extension used for tables written inside run directories
    pub fn default_extension() -> &'static str {
        ".csv"
    }
}

/// Read a table from `path`
pub fn read_table(path: &Path) -> Result<Table> {
    let format = TableFormat::from_path(path)?;
    let content = fs::read_to_string(path)?;
    let table = decode_table(&content, format)?;
    tracing::debug!(
        path = %path.display(),
        rows = table.n_rows(),
        columns = table.n_columns(),
        "Read table"
    );
    Ok(table)
}

/// Read a table from `path` keeping every CSV cell as text
///
/// Used at scoring time so id columns and text features come back exactly
/// as written (`007` stays `007`); the run's schema coerces feature columns
/// to their trained types. JSON tables keep their declared types.
pub fn read_table_verbatim(path: &Path) -> Result<Table> {
    let format = TableFormat::from_path(path)?;
    let content = fs::read_to_string(path)?;
    let table = match format {
        TableFormat::Csv => decode_csv(&content, false)?,
        TableFormat::Json => decode_json(&content)?,
    };
    tracing::debug!(
        path = %path.display(),
        rows = table.n_rows(),
        columns = table.n_columns(),
        "Read table verbatim"
    );
    Ok(table)
}

/// Write `table` to `path`, creating parent directories as needed
pub fn write_table(path: &Path, table: &Table) -> Result<()> {
    let format = TableFormat::from_path(path)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, encode_table(table, format)?)?;
    Ok(())
}

/// Render `table` in `format`
pub fn encode_table(table: &Table, format: TableFormat) -> Result<Vec<u8>> {
    match format {
        TableFormat::Csv => encode_csv(table),
        TableFormat::Json => encode_json(table),
    }
}

/// Parse a table from text in `format`
pub fn decode_table(content: &str, format: TableFormat) -> Result<Table> {
    match format {
        TableFormat::Csv => decode_csv(content, true),
        TableFormat::Json => decode_json(content),
    }
}

fn encode_csv(table: &Table) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(table.column_names())?;
    for row in 0..table.n_rows() {
        writer.write_record(table.columns().iter().map(|c| c.data.cell_to_string(row)))?;
    }
    writer
        .into_inner()
        .map_err(|e| BaselineError::Internal(format!("CSV buffer flush failed: {}", e)))
}

fn decode_csv(content: &str, infer: bool) -> Result<Table> {
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record?;
        for (values, field) in raw.iter_mut().zip(record.iter()) {
            values.push(field.to_string());
        }
    }

    let mut table = Table::with_rows(raw.first().map(Vec::len).unwrap_or(0));
    for (name, values) in headers.into_iter().zip(raw) {
        let data = if infer {
            infer_column(values)
        } else {
            ColumnData::Text(values)
        };
        table.push_column(Column::new(name, data))?;
    }
    Ok(table)
}

/// Integer if every cell parses as i64, float if every cell parses as f64,
/// text otherwise
fn infer_column(values: Vec<String>) -> ColumnData {
    if let Ok(ints) = values
        .iter()
        .map(|s| s.parse::<i64>())
        .collect::<std::result::Result<Vec<_>, _>>()
    {
        return ColumnData::Integer(ints);
    }
    if let Ok(floats) = values
        .iter()
        .map(|s| s.parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
    {
        return ColumnData::Float(floats);
    }
    ColumnData::Text(values)
}

#[derive(Serialize, Deserialize)]
struct TableRecord {
    columns: Vec<ColumnRecord>,
}

#[derive(Serialize, Deserialize)]
struct ColumnRecord {
    name: String,
    dtype: DType,
    values: Vec<Value>,
}

fn encode_json(table: &Table) -> Result<Vec<u8>> {
    let columns = table
        .columns()
        .iter()
        .map(|c| ColumnRecord {
            name: c.name.clone(),
            dtype: c.dtype(),
            values: match &c.data {
                ColumnData::Integer(v) => v.iter().map(|&x| Value::from(x)).collect(),
                ColumnData::Float(v) => v
                    .iter()
                    .map(|&x| serde_json::Number::from_f64(x).map_or(Value::Null, Value::Number))
                    .collect(),
                ColumnData::Text(v) => v.iter().map(|s| Value::String(s.clone())).collect(),
            },
        })
        .collect();
    Ok(serde_json::to_vec_pretty(&TableRecord { columns })?)
}

fn decode_json(content: &str) -> Result<Table> {
    let record: TableRecord = serde_json::from_str(content)?;
    let n_rows = record.columns.first().map(|c| c.values.len()).unwrap_or(0);

    let mut table = Table::with_rows(n_rows);
    for column in record.columns {
        let data = match column.dtype {
            DType::Integer => ColumnData::Integer(
                column
                    .values
                    .iter()
                    .map(|v| {
                        v.as_i64().ok_or_else(|| {
                            BaselineError::Parse(format!(
                                "column '{}': expected integer, found {}",
                                column.name, v
                            ))
                        })
                    })
                    .collect::<Result<_>>()?,
            ),
            DType::Float => ColumnData::Float(
                column
                    .values
                    .iter()
                    .map(|v| match v {
                        Value::Null => Ok(f64::NAN),
                        other => other.as_f64().ok_or_else(|| {
                            BaselineError::Parse(format!(
                                "column '{}': expected number, found {}",
                                column.name, other
                            ))
                        }),
                    })
                    .collect::<Result<_>>()?,
            ),
            DType::Text => ColumnData::Text(
                column
                    .values
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            ),
        };
        table.push_column(Column::new(column.name, data))?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_csv_type_inference() {
        let content = "user_id,n_orders,total_amount,country\nu001,3,20.5,US\nu002,7,80,GB\n";
        let table = decode_table(content, TableFormat::Csv).unwrap();
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.column("user_id").unwrap().dtype(), DType::Text);
        assert_eq!(table.column("n_orders").unwrap().dtype(), DType::Integer);
        assert_eq!(
            table.column("total_amount").unwrap().data,
            ColumnData::Float(vec![20.5, 80.0])
        );
    }

    #[test]
    fn test_verbatim_read_keeps_cells_as_written() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("batch.csv");
        fs::write(&path, "user_id,total_amount\n007,20.50\n1e3,80\n").unwrap();
        let table = read_table_verbatim(&path).unwrap();
        assert_eq!(
            table.column("user_id").unwrap().data,
            ColumnData::Text(vec!["007".into(), "1e3".into()])
        );
        assert_eq!(
            table.column("total_amount").unwrap().data,
            ColumnData::Text(vec!["20.50".into(), "80".into()])
        );
    }

    #[test]
    fn test_empty_cell_makes_column_text() {
        let content = "a,b\n1,x\n,y\n";
        let table = decode_table(content, TableFormat::Csv).unwrap();
        assert_eq!(
            table.column("a").unwrap().data,
            ColumnData::Text(vec!["1".into(), "".into()])
        );
    }

    #[test]
    fn test_header_only_csv_has_zero_rows() {
        let table = decode_table("a,b\n", TableFormat::Csv).unwrap();
        assert_eq!(table.n_rows(), 0);
        assert_eq!(table.column_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_csv_write_then_read_keeps_types() {
        let table = Table::new(vec![
            Column::text("id", vec!["a", "b"]),
            Column::float("score", vec![1.0, 0.25]),
            Column::integer("flag", vec![0, 1]),
        ])
        .unwrap();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("out.csv");
        write_table(&path, &table).unwrap();
        assert_eq!(read_table(&path).unwrap(), table);
    }

    #[test]
    fn test_json_format_keeps_declared_types() {
        let table = Table::new(vec![
            Column::text("code", vec!["007", "42"]),
            Column::float("x", vec![2.0, 3.5]),
        ])
        .unwrap();
        let bytes = encode_table(&table, TableFormat::Json).unwrap();
        let decoded = decode_table(std::str::from_utf8(&bytes).unwrap(), TableFormat::Json).unwrap();
        assert_eq!(decoded, table);
    }

    #[test]
    fn test_unknown_extension_is_configuration_error() {
        let err = TableFormat::from_path(Path::new("data.parquet")).unwrap_err();
        assert!(matches!(err, BaselineError::Configuration(_)));
    }
}
