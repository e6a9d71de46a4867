//! データ読み込み
//!
//! スクレイピング済みの一覧表（CSV/Excel）をDataTableへ読み込む。
//! ディレクトリが渡されたときは配下のCSVから対象ファイルを探す。

use crate::error::{CarGradeError, Result};
use crate::table::DataTable;
use calamine::{open_workbook_auto, Data, Reader};
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

/// 拡張子で形式を判別して読み込む
pub fn load_table(path: &Path) -> Result<DataTable> {
    if !path.exists() {
        return Err(CarGradeError::FileNotFound(path.display().to_string()));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    let table = match extension.as_deref() {
        Some("csv") => read_csv(path)?,
        Some("xlsx") | Some("xls") => read_excel(path)?,
        _ => {
            return Err(CarGradeError::UnsupportedFormat(path.display().to_string()));
        }
    };

    info!("データ読み込み完了: {}件 ({})", table.len(), path.display());
    Ok(table)
}

/// CSVファイルを読み込む（BOM付きUTF-8対応）
pub fn read_csv(path: &Path) -> Result<DataTable> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_csv_str(&content))
}

/// CSV文字列をパースする
///
/// 1行目をヘッダーとして扱う。空行は読み飛ばす。
pub fn parse_csv_str(content: &str) -> DataTable {
    let content = content.trim_start_matches('\u{feff}');
    let mut lines = content.lines().filter(|line| !line.trim().is_empty());

    let Some(header_line) = lines.next() else {
        return DataTable::default();
    };

    let mut table = DataTable::new(parse_csv_line(header_line));
    for line in lines {
        table.push_row(parse_csv_line(line));
    }
    table
}

/// CSV行をパース（ダブルクォートと "" エスケープ対応）
fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut field));
            }
            _ => field.push(c),
        }
    }
    fields.push(field);

    fields
}

/// Excelファイルの先頭シートを読み込む
pub fn read_excel(path: &Path) -> Result<DataTable> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| CarGradeError::ExcelRead(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| CarGradeError::ExcelRead("シートがありません".to_string()))?
        .map_err(|e| CarGradeError::ExcelRead(e.to_string()))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(DataTable::default());
    };

    let mut table = DataTable::new(header_row.iter().map(cell_to_string).collect());
    for row in rows {
        table.push_row(row.iter().map(cell_to_string).collect());
    }
    Ok(table)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        // 整数値は "2019.0" ではなく "2019" にする
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

/// ディレクトリ配下のCSVデータファイルを列挙する（名前順）
pub fn find_data_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("csv"))
                .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

/// 最終更新が最も新しいデータファイルを返す
pub fn latest_data_file(dir: &Path) -> Result<PathBuf> {
    find_data_files(dir)
        .into_iter()
        .max_by_key(|path| std::fs::metadata(path).and_then(|meta| meta.modified()).ok())
        .ok_or_else(|| CarGradeError::NoDataFound(dir.display().to_string()))
}
