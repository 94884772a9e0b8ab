use std::fmt;

use serde_json::{Map, Value};

use crate::error::DataFormatError;

/// A single table cell. Text that happens to look numeric stays text here;
/// role resolution decides later whether a whole column reads as numbers.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Numeric reading of the cell, if it has one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Null => None,
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Number(n) => {
                // Integer-valued numbers print without a trailing ".0" so
                // they read as axis labels, not as floats.
                if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Cell::Text(s) => f.write_str(s),
        }
    }
}

/// Classification of a column, recomputed per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl Column {
    /// Numeric iff every non-null cell parses as a real number.
    pub fn kind(&self) -> ColumnKind {
        let numeric = self
            .cells
            .iter()
            .filter(|c| !c.is_null())
            .all(|c| c.as_number().is_some());
        if numeric {
            ColumnKind::Numeric
        } else {
            ColumnKind::Categorical
        }
    }
}

/// Canonical column-oriented table: uniquely named columns of equal length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<Column>,
}

impl Table {
    pub fn row_count(&self) -> usize {
        self.columns.first().map(|c| c.cells.len()).unwrap_or(0)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Normalize raw chart data into a `Table`.
///
/// Precedence: JSON text, then CSV text; arrays become records or a single
/// synthetic column; objects become an index/value series or named columns.
pub fn normalize(raw: &Value) -> Result<Table, DataFormatError> {
    let table = match raw {
        Value::String(text) => from_text(text)?,
        Value::Array(items) => from_sequence(items)?,
        Value::Object(map) => from_mapping(map)?,
        _ => return Err(DataFormatError::UnsupportedInput),
    };

    if table.columns.is_empty() {
        return Err(DataFormatError::InsufficientData);
    }
    Ok(table)
}

fn from_text(text: &str) -> Result<Table, DataFormatError> {
    if text.trim().is_empty() {
        return Err(DataFormatError::UnparseableText);
    }

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => from_sequence(&items),
        Ok(Value::Object(map)) => from_mapping(&map),
        // A bare JSON scalar has no tabular reading, and the CSV fallback
        // must not run once strict JSON parsing has succeeded.
        Ok(_) => Err(DataFormatError::UnparseableText),
        Err(_) => from_csv(text),
    }
}

fn from_sequence(items: &[Value]) -> Result<Table, DataFormatError> {
    if items.first().map(Value::is_object).unwrap_or(false) {
        return from_records(items);
    }

    // Flat scalar sequence: one synthetic column. The resolver supplies the
    // positional index when a category series is needed.
    let mut cells = Vec::with_capacity(items.len());
    for item in items {
        if item.is_object() || item.is_array() {
            return Err(DataFormatError::MixedSequence);
        }
        cells.push(scalar_cell(item, "value")?);
    }
    Ok(Table {
        columns: vec![Column {
            name: "value".to_string(),
            cells,
        }],
    })
}

/// Array of records: the union of keys becomes the columns, in order of
/// first appearance; missing keys become null cells.
fn from_records(items: &[Value]) -> Result<Table, DataFormatError> {
    let mut names: Vec<String> = Vec::new();
    for item in items {
        let obj = item.as_object().ok_or(DataFormatError::MixedSequence)?;
        for key in obj.keys() {
            if !names.iter().any(|n| n == key) {
                names.push(key.clone());
            }
        }
    }

    let mut columns: Vec<Column> = names
        .into_iter()
        .map(|name| Column {
            name,
            cells: Vec::with_capacity(items.len()),
        })
        .collect();

    for item in items {
        let obj = item.as_object().ok_or(DataFormatError::MixedSequence)?;
        for column in &mut columns {
            let cell = match obj.get(&column.name) {
                Some(value) => scalar_cell(value, &column.name)?,
                None => Cell::Null,
            };
            column.cells.push(cell);
        }
    }

    Ok(Table { columns })
}

fn from_mapping(map: &Map<String, Value>) -> Result<Table, DataFormatError> {
    // Quirk kept for compatibility: a mapping whose values are all bare
    // numbers is an index->value series (keys become a category column);
    // any other mapping is column-name -> column-values. The test is
    // vacuously true for an empty mapping, which therefore normalizes to a
    // zero-row index/value table.
    let all_numeric = map.values().all(Value::is_number);
    if all_numeric {
        let mut index = Vec::with_capacity(map.len());
        let mut values = Vec::with_capacity(map.len());
        for (key, value) in map {
            index.push(Cell::Text(key.clone()));
            values.push(scalar_cell(value, key)?);
        }
        return Ok(Table {
            columns: vec![
                Column {
                    name: "index".to_string(),
                    cells: index,
                },
                Column {
                    name: "value".to_string(),
                    cells: values,
                },
            ],
        });
    }

    let mut columns = Vec::with_capacity(map.len());
    for (name, value) in map {
        let cells = match value {
            Value::Array(items) => items
                .iter()
                .map(|item| scalar_cell(item, name))
                .collect::<Result<Vec<_>, _>>()?,
            other => vec![scalar_cell(other, name)?],
        };
        columns.push(Column {
            name: name.clone(),
            cells,
        });
    }

    let expected = columns[0].cells.len();
    for column in &columns[1..] {
        if column.cells.len() != expected {
            return Err(DataFormatError::RaggedColumns {
                name: column.name.clone(),
                got: column.cells.len(),
                expected,
            });
        }
    }

    Ok(Table { columns })
}

fn scalar_cell(value: &Value, field: &str) -> Result<Cell, DataFormatError> {
    match value {
        Value::Null => Ok(Cell::Null),
        Value::Number(n) => n
            .as_f64()
            .map(Cell::Number)
            .ok_or_else(|| DataFormatError::UnsupportedValue(field.to_string())),
        Value::String(s) => Ok(Cell::Text(s.clone())),
        Value::Bool(b) => Ok(Cell::Text(b.to_string())),
        _ => Err(DataFormatError::UnsupportedValue(field.to_string())),
    }
}

/// CSV fallback: first line is the header, then one record per line, with
/// per-column numeric coercion (a column is numeric only if every non-empty
/// field in it parses).
fn from_csv(text: &str) -> Result<Table, DataFormatError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|_| DataFormatError::UnparseableText)?
        .clone();

    let mut records = Vec::new();
    for record in reader.records() {
        records.push(record.map_err(|_| DataFormatError::UnparseableText)?);
    }

    let mut columns = Vec::with_capacity(headers.len());
    for (idx, header) in headers.iter().enumerate() {
        let fields: Vec<&str> = records.iter().map(|r| r.get(idx).unwrap_or("")).collect();
        let numeric = fields
            .iter()
            .all(|s| s.trim().is_empty() || s.trim().parse::<f64>().is_ok());

        let cells = fields
            .into_iter()
            .map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Cell::Null
                } else if numeric {
                    match trimmed.parse::<f64>() {
                        Ok(n) => Cell::Number(n),
                        Err(_) => Cell::Text(s.to_string()),
                    }
                } else {
                    Cell::Text(s.to_string())
                }
            })
            .collect();

        columns.push(Column {
            name: unique_name(header, &columns),
            cells,
        });
    }

    Ok(Table { columns })
}

/// Column names must be unique; duplicate CSV headers get a ".N" suffix.
fn unique_name(header: &str, existing: &[Column]) -> String {
    let taken = |name: &str| existing.iter().any(|c| c.name == name);
    if !taken(header) {
        return header.to_string();
    }
    let mut counter = 1;
    loop {
        let candidate = format!("{}.{}", header, counter);
        if !taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_mapping_becomes_index_value_series() {
        let table = normalize(&json!({"A": 10, "B": 20, "C": 15})).unwrap();
        assert_eq!(table.columns.len(), 2);
        assert_eq!(table.columns[0].name, "index");
        assert_eq!(table.columns[1].name, "value");
        assert_eq!(
            table.columns[0].cells,
            vec![
                Cell::Text("A".to_string()),
                Cell::Text("B".to_string()),
                Cell::Text("C".to_string())
            ]
        );
        assert_eq!(
            table.columns[1].cells,
            vec![Cell::Number(10.0), Cell::Number(20.0), Cell::Number(15.0)]
        );
    }

    #[test]
    fn test_mixed_mapping_becomes_named_columns() {
        let table = normalize(&json!({"x": [1, 2, 3], "y": ["a", "b", "c"]})).unwrap();
        assert_eq!(table.columns.len(), 2);
        assert_eq!(table.columns[0].name, "x");
        assert_eq!(table.columns[1].name, "y");
        assert_eq!(table.row_count(), 3);
    }

    #[test]
    fn test_mapping_ragged_columns_is_error() {
        let result = normalize(&json!({"x": [1, 2, 3], "y": ["a", "b"]}));
        assert!(matches!(result, Err(DataFormatError::RaggedColumns { .. })));
    }

    #[test]
    fn test_records_union_keys_with_null_fill() {
        let table = normalize(&json!([
            {"category": "A", "value": 10},
            {"category": "B", "extra": true}
        ]))
        .unwrap();
        let names: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["category", "value", "extra"]);
        assert_eq!(table.column("value").unwrap().cells[1], Cell::Null);
        assert_eq!(
            table.column("extra").unwrap().cells[1],
            Cell::Text("true".to_string())
        );
    }

    #[test]
    fn test_scalar_sequence_single_synthetic_column() {
        let table = normalize(&json!([1, 4, 2, 8])).unwrap();
        assert_eq!(table.columns.len(), 1);
        assert_eq!(table.columns[0].name, "value");
        assert_eq!(table.row_count(), 4);
    }

    #[test]
    fn test_json_text_is_parsed_before_csv() {
        let table = normalize(&json!(r#"{"A": 1, "B": 2}"#)).unwrap();
        assert_eq!(table.columns[0].name, "index");
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_csv_text_with_type_coercion() {
        let table = normalize(&json!("category,value\nA,10\nB,20\nC,15\nD,25")).unwrap();
        assert_eq!(table.columns.len(), 2);
        assert_eq!(table.columns[0].kind(), ColumnKind::Categorical);
        assert_eq!(table.columns[1].kind(), ColumnKind::Numeric);
        assert_eq!(table.column("value").unwrap().cells[3], Cell::Number(25.0));
    }

    #[test]
    fn test_csv_empty_field_is_null() {
        let table = normalize(&json!("a,b\n1,\n2,x")).unwrap();
        assert_eq!(table.column("b").unwrap().cells[0], Cell::Null);
        assert_eq!(table.column("a").unwrap().kind(), ColumnKind::Numeric);
    }

    #[test]
    fn test_csv_ragged_rows_is_error() {
        let result = normalize(&json!("a,b\n1,2\n3"));
        assert!(matches!(result, Err(DataFormatError::UnparseableText)));
    }

    #[test]
    fn test_empty_mapping_zero_rows() {
        let table = normalize(&json!({})).unwrap();
        assert_eq!(table.columns.len(), 2);
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn test_empty_sequence_zero_rows() {
        let table = normalize(&json!([])).unwrap();
        assert_eq!(table.columns.len(), 1);
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn test_null_input_is_error() {
        assert!(matches!(
            normalize(&Value::Null),
            Err(DataFormatError::UnsupportedInput)
        ));
        assert!(matches!(
            normalize(&json!(42)),
            Err(DataFormatError::UnsupportedInput)
        ));
    }

    #[test]
    fn test_json_scalar_text_is_error() {
        assert!(matches!(
            normalize(&json!("42")),
            Err(DataFormatError::UnparseableText)
        ));
    }

    #[test]
    fn test_nested_record_value_is_error() {
        let result = normalize(&json!([{"a": {"nested": 1}}]));
        assert!(matches!(result, Err(DataFormatError::UnsupportedValue(_))));
    }

    #[test]
    fn test_duplicate_csv_headers_are_uniquified() {
        let table = normalize(&json!("a,a\n1,2")).unwrap();
        let names: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "a.1"]);
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(Cell::Number(1.0).to_string(), "1");
        assert_eq!(Cell::Number(2.5).to_string(), "2.5");
        assert_eq!(Cell::Text("A".to_string()).to_string(), "A");
        assert_eq!(Cell::Null.to_string(), "");
    }

    #[test]
    fn test_column_kind_classification() {
        let numeric_text = Column {
            name: "n".to_string(),
            cells: vec![Cell::Text("1".to_string()), Cell::Number(2.0), Cell::Null],
        };
        assert_eq!(numeric_text.kind(), ColumnKind::Numeric);

        let mixed = Column {
            name: "m".to_string(),
            cells: vec![Cell::Number(1.0), Cell::Text("abc".to_string())],
        };
        assert_eq!(mixed.kind(), ColumnKind::Categorical);
    }
}
