use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, ArrayRef, AsArray, Float32Array, Float64Array, Int32Array, Int64Array};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Serialize;
use serde_json::Value as JsonValue;

use super::model::PeriodAggregate;
use crate::views::nested::CategoryRow;

const CATEGORY_COLUMNS: [&str; 2] = ["categorie", "category"];
const SUBCATEGORY_COLUMNS: [&str; 2] = ["sous_categorie", "subcategory"];
const VALUE_COLUMNS: [&str; 4] = ["total", "value", "poids", "weight"];
const FLUX_COLUMNS: [&str; 1] = ["flux"];
const ORIENTATION_COLUMNS: [&str; 1] = ["orientation"];

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// Load a period aggregate from a JSON file.
///
/// Accepts either the bare record or the API envelope
/// `{"success": true, "stats": {...}}`.
pub fn load_aggregate(path: &Path) -> Result<PeriodAggregate> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let root: JsonValue = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing JSON in {}", path.display()))?;
    let aggregate =
        parse_aggregate(root).with_context(|| format!("reading aggregate {}", path.display()))?;
    log::info!(
        "loaded {}: {} sites, {} periods",
        path.display(),
        aggregate.sites.len(),
        aggregate.months_order.len()
    );
    Ok(aggregate)
}

/// Decode an aggregate from an already-parsed JSON value.
pub fn parse_aggregate(root: JsonValue) -> Result<PeriodAggregate> {
    let record = match root {
        JsonValue::Object(mut obj) if obj.contains_key("stats") => {
            if obj.get("success").and_then(JsonValue::as_bool) == Some(false) {
                let reason = obj
                    .get("error")
                    .and_then(JsonValue::as_str)
                    .unwrap_or("no error message");
                bail!("upstream reported failure: {reason}");
            }
            obj.remove("stats").unwrap_or(JsonValue::Null)
        }
        other => other,
    };
    if !record.is_object() {
        bail!("expected a JSON object for the aggregate");
    }
    serde_json::from_value(record).context("decoding aggregate fields")
}

// ---------------------------------------------------------------------------
// Raw category rows
// ---------------------------------------------------------------------------

/// Load `(category, subcategory, value)` rows. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header `categorie,sous_categorie,total` (English names accepted)
/// * `.json`    – `[{ "categorie": ..., "sous_categorie": ..., "total": ... }]`
///   or `{"data": [...]}`
/// * `.parquet` – the same columns, Utf8 labels and a numeric value
pub fn load_category_rows(path: &Path) -> Result<Vec<CategoryRow>> {
    let rows = match extension(path).as_str() {
        "csv" => load_rows_csv(path),
        "json" => load_rows_json(path),
        "parquet" | "pq" => load_rows_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading category rows from {}", path.display()))?;
    log::info!("loaded {} category rows from {}", rows.len(), path.display());
    Ok(rows)
}

fn position(headers: &[String], names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn load_rows_csv(path: &Path) -> Result<Vec<CategoryRow>> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let cat_idx =
        position(&headers, &CATEGORY_COLUMNS).context("CSV missing 'categorie' column")?;
    let sub_idx = position(&headers, &SUBCATEGORY_COLUMNS);
    let val_idx = position(&headers, &VALUE_COLUMNS).context("CSV missing 'total' column")?;
    let flux_idx = position(&headers, &FLUX_COLUMNS);
    let orientation_idx = position(&headers, &ORIENTATION_COLUMNS);

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let raw = record.get(val_idx).unwrap_or("").trim();
        let value = if raw.is_empty() {
            0.0
        } else {
            // Decimal commas appear in spreadsheet exports.
            raw.replace(',', ".")
                .parse::<f64>()
                .with_context(|| format!("CSV row {row_no}: '{raw}' is not a number"))?
        };
        let field = |idx: Option<usize>| idx.and_then(|i| non_empty(record.get(i)));
        rows.push(CategoryRow {
            category: non_empty(record.get(cat_idx)),
            subcategory: field(sub_idx),
            value,
            flux: field(flux_idx),
            orientation: field(orientation_idx),
        });
    }
    Ok(rows)
}

fn load_rows_json(path: &Path) -> Result<Vec<CategoryRow>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;
    let records = match root {
        JsonValue::Array(items) => JsonValue::Array(items),
        JsonValue::Object(mut obj) => obj
            .remove("data")
            .filter(JsonValue::is_array)
            .context("Expected a JSON array or an object with a 'data' array")?,
        _ => bail!("Expected a JSON array or an object with a 'data' array"),
    };
    serde_json::from_value(records).context("decoding category rows")
}

fn load_rows_parquet(path: &Path) -> Result<Vec<CategoryRow>> {
    let file = File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        let names: Vec<String> = schema.fields().iter().map(|f| f.name().clone()).collect();

        let cat_idx = position(&names, &CATEGORY_COLUMNS)
            .context("Parquet file missing 'categorie' column")?;
        let val_idx =
            position(&names, &VALUE_COLUMNS).context("Parquet file missing 'total' column")?;

        let cat_col = batch.column(cat_idx);
        let val_col = batch.column(val_idx);
        let sub_col = position(&names, &SUBCATEGORY_COLUMNS).map(|i| batch.column(i));
        let flux_col = position(&names, &FLUX_COLUMNS).map(|i| batch.column(i));
        let orientation_col = position(&names, &ORIENTATION_COLUMNS).map(|i| batch.column(i));

        for row in 0..batch.num_rows() {
            rows.push(CategoryRow {
                category: extract_label(cat_col, row)
                    .with_context(|| format!("Row {row}: reading category"))?,
                subcategory: optional_label(sub_col, row)
                    .with_context(|| format!("Row {row}: reading sub-category"))?,
                value: extract_number(val_col, row)
                    .with_context(|| format!("Row {row}: reading value"))?,
                flux: optional_label(flux_col, row)
                    .with_context(|| format!("Row {row}: reading flux"))?,
                orientation: optional_label(orientation_col, row)
                    .with_context(|| format!("Row {row}: reading orientation"))?,
            });
        }
    }
    Ok(rows)
}

// -- Arrow helpers --

fn extract_label(col: &ArrayRef, row: usize) -> Result<Option<String>> {
    if col.is_null(row) {
        return Ok(None);
    }
    let value = match col.data_type() {
        DataType::Utf8 => col.as_string::<i32>().value(row),
        DataType::LargeUtf8 => col.as_string::<i64>().value(row),
        other => bail!("Expected a Utf8 column, got {other:?}"),
    };
    Ok(non_empty(Some(value)))
}

fn optional_label(col: Option<&ArrayRef>, row: usize) -> Result<Option<String>> {
    match col {
        Some(col) => extract_label(col, row),
        None => Ok(None),
    }
}

fn extract_number(col: &ArrayRef, row: usize) -> Result<f64> {
    if col.is_null(row) {
        return Ok(0.0);
    }
    let any = col.as_any();
    let value = match col.data_type() {
        DataType::Float64 => any.downcast_ref::<Float64Array>().map(|a| a.value(row)),
        DataType::Float32 => any.downcast_ref::<Float32Array>().map(|a| f64::from(a.value(row))),
        DataType::Int64 => any.downcast_ref::<Int64Array>().map(|a| a.value(row) as f64),
        DataType::Int32 => any.downcast_ref::<Int32Array>().map(|a| f64::from(a.value(row))),
        other => bail!("Expected a numeric column, got {other:?}"),
    };
    value.context("column type does not match its array")
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Pretty-print `value` as JSON to `path`, or to stdout when `None`.
pub fn write_json<T: Serialize + ?Sized>(value: &T, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, value).context("serializing JSON")?;
            writeln!(writer).context("writing output")?;
            writer.flush().context("flushing output")?;
            log::info!("wrote {}", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            serde_json::to_writer_pretty(&mut out, value).context("serializing JSON")?;
            writeln!(out).context("writing output")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::StringArray;
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    use super::*;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn aggregate_envelope_is_unwrapped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "s1.json",
            r#"{
                "success": true,
                "stats": {
                    "dechetteries": {"Sanssac": {"months": {}}},
                    "category_columns": ["MEUBLES"]
                }
            }"#,
        );
        let agg = load_aggregate(&path).unwrap();
        assert_eq!(agg.site_names().collect::<Vec<_>>(), ["Sanssac"]);
        assert_eq!(agg.category_columns(), ["MEUBLES"]);
    }

    #[test]
    fn failed_envelope_is_an_error() {
        let root = serde_json::json!({"success": false, "stats": {}, "error": "import en cours"});
        let err = parse_aggregate(root).unwrap_err();
        assert!(err.to_string().contains("import en cours"));
        assert!(parse_aggregate(serde_json::json!([1, 2])).is_err());
    }

    #[test]
    fn csv_rows_with_french_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "rows.csv",
            "categorie,sous_categorie,total\nMEUBLES,Chaises,\"4,5\"\nLIVRES,,2\n,Divers,\n",
        );
        let rows = load_category_rows(&path).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], CategoryRow::new("MEUBLES", "Chaises", 4.5));
        assert_eq!(rows[1].subcategory, None);
        assert_eq!(rows[2].category, None);
        assert_eq!(rows[2].value, 0.0);
    }

    #[test]
    fn csv_rows_with_flux_and_orientation() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "rows.csv",
            "categorie,sous_categorie,flux,orientation,poids\n\
             BOIS,Palettes,MASSICOT,RECYCLAGE,4\n\
             MEUBLES,Chaises,,,2\n",
        );
        let rows = load_category_rows(&path).unwrap();
        assert_eq!(
            rows[0],
            CategoryRow::new("BOIS", "Palettes", 4.0).with_flux("MASSICOT", "RECYCLAGE")
        );
        assert_eq!(rows[1].flux, None);
        assert_eq!(rows[1].orientation, None);
    }

    #[test]
    fn csv_without_value_column_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "rows.csv", "categorie,sous_categorie\nMEUBLES,Chaises\n");
        assert!(load_category_rows(&path).is_err());
    }

    #[test]
    fn json_rows_accept_data_wrapper() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "rows.json",
            r#"{"data": [{"category": "ELECTRO", "subcategory": "Fours", "value": 3}]}"#,
        );
        let rows = load_category_rows(&path).unwrap();
        assert_eq!(rows, [CategoryRow::new("ELECTRO", "Fours", 3.0)]);
    }

    #[test]
    fn parquet_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.parquet");
        let schema = Arc::new(Schema::new(vec![
            Field::new("categorie", DataType::Utf8, true),
            Field::new("sous_categorie", DataType::Utf8, true),
            Field::new("total", DataType::Int64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec![Some("JOUETS"), None])),
                Arc::new(StringArray::from(vec![Some("Peluches"), Some("Vélos")])),
                Arc::new(Int64Array::from(vec![7, 2])),
            ],
        )
        .unwrap();
        let mut writer = ArrowWriter::try_new(File::create(&path).unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let rows = load_category_rows(&path).unwrap();
        assert_eq!(rows[0], CategoryRow::new("JOUETS", "Peluches", 7.0));
        assert_eq!(rows[1].category, None);
        assert_eq!(rows[1].value, 2.0);
    }

    #[test]
    fn unknown_extension_fails() {
        assert!(load_category_rows(Path::new("rows.xlsx")).is_err());
    }

    #[test]
    fn write_json_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_json(&serde_json::json!({"total": 1.5}), Some(&path)).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let back: JsonValue = serde_json::from_str(&text).unwrap();
        assert_eq!(back["total"], 1.5);
    }
}
