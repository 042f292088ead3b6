use crate::error::IngestError;
use crate::models::RawRow;
use calamine::{open_workbook_auto, Data, Reader};
use serde_json::Value;
use std::io::{Read, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Csv,
    /// xlsx / xlsm / xls / ods，交给 calamine 识别
    Workbook,
}

impl SheetFormat {
    pub fn from_file_name(file_name: &str) -> Result<(Self, String), IngestError> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let format = match ext.as_str() {
            "csv" => SheetFormat::Csv,
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => SheetFormat::Workbook,
            _ => return Err(IngestError::UnsupportedFormat(file_name.to_string())),
        };
        Ok((format, ext))
    }
}

/// 读取本地表格文件
pub fn read_path(path: &Path) -> Result<Vec<RawRow>, IngestError> {
    let name = path.to_string_lossy();
    let (format, _) = SheetFormat::from_file_name(&name)?;
    let rows = match format {
        SheetFormat::Csv => read_csv(std::fs::File::open(path)?)?,
        SheetFormat::Workbook => read_workbook(path)?,
    };
    non_empty(rows)
}

/// 上传内容先落到临时文件，解析后随临时文件一起删除
pub fn read_upload(file_name: &str, bytes: &[u8]) -> Result<Vec<RawRow>, IngestError> {
    let (format, ext) = SheetFormat::from_file_name(file_name)?;

    let mut scratch = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(&format!(".{}", ext))
        .tempfile()?;
    scratch.write_all(bytes)?;
    scratch.flush()?;

    let rows = match format {
        SheetFormat::Csv => read_csv(scratch.reopen()?)?,
        SheetFormat::Workbook => read_workbook(scratch.path())?,
    };
    tracing::debug!("Parsed {} rows from {}", rows.len(), file_name);

    non_empty(rows)
}

/// 首行为表头，值保留为字符串，由 normalizer 负责类型转换
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<RawRow>, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record?;
        let mut row = RawRow::new();
        for (header, cell) in headers.iter().zip(record.iter()) {
            if header.is_empty() || cell.is_empty() {
                continue;
            }
            row.insert(header.clone(), Value::String(cell.to_string()));
        }
        if !row.is_empty() {
            rows.push(row);
        }
    }

    Ok(rows)
}

/// 读取第一个工作表
pub fn read_workbook(path: &Path) -> Result<Vec<RawRow>, IngestError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook.worksheet_range_at(0).ok_or(IngestError::Empty)??;

    let mut lines = range.rows();
    let Some(header_cells) = lines.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header_cells
        .iter()
        .map(|c| c.to_string().trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for cells in lines {
        let mut row = RawRow::new();
        for (header, cell) in headers.iter().zip(cells.iter()) {
            if header.is_empty() {
                continue;
            }
            let value = cell_value(cell);
            if !value.is_null() {
                row.insert(header.clone(), value);
            }
        }
        if !row.is_empty() {
            rows.push(row);
        }
    }

    Ok(rows)
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                Value::Null
            } else {
                Value::String(s.to_string())
            }
        }
        Data::Int(i) => Value::from(*i),
        // 整数形式的浮点 (电话号码、金额) 按整数输出
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Value::from(*f as i64),
        Data::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(Value::Null),
        other => Value::String(other.to_string()),
    }
}

fn non_empty(rows: Vec<RawRow>) -> Result<Vec<RawRow>, IngestError> {
    if rows.is_empty() {
        Err(IngestError::Empty)
    } else {
        Ok(rows)
    }
}

/// 为上传行分配 id (`inv-<tag>-<index>`)，已有 id 的行保持不变
pub fn assign_ids(rows: Vec<RawRow>, tag: i64) -> Vec<RawRow> {
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| {
            let has_id = row
                .iter()
                .any(|(k, v)| k.trim().eq_ignore_ascii_case("id") && !v.is_null());
            if has_id {
                return row;
            }
            let mut with_id = RawRow::with_capacity(row.len() + 1);
            with_id.insert("id".to_string(), Value::String(format!("inv-{}-{}", tag, i)));
            with_id.extend(row);
            with_id
        })
        .collect()
}
