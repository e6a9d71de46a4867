//! 表形式データ
//!
//! CSV/Excelから読み込んだ一覧表をヘッダー名で列参照する。
//! 列の追加・置換は新しい表を返し、元の表は変更しない。

use serde_json::{Map, Value};

/// ヘッダー付きの一覧表
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl DataTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// 行を追加（列数はヘッダーに合わせて調整）
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// 行数
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 列名から列位置を引く（同名列は先頭が優先）
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// セル参照
    pub fn cell(&self, row: usize, name: &str) -> Option<&str> {
        let col = self.column_index(name)?;
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    /// 1列分の値
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let col = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(col).map(String::as_str).unwrap_or(""))
                .collect(),
        )
    }

    /// 列を付加した新しい表を返す
    ///
    /// 同名の列が既にある場合は値を置き換える。各列の値は行数と
    /// 一致していなければならない。
    pub fn with_columns(&self, columns: Vec<(String, Vec<String>)>) -> DataTable {
        let mut result = self.clone();
        for (name, values) in columns {
            assert_eq!(values.len(), result.rows.len(), "列の長さが行数と一致しません");
            match result.column_index(&name) {
                Some(col) => {
                    for (row, value) in result.rows.iter_mut().zip(values) {
                        row[col] = value;
                    }
                }
                None => {
                    result.headers.push(name);
                    for (row, value) in result.rows.iter_mut().zip(values) {
                        row.push(value);
                    }
                }
            }
        }
        result
    }

    /// 1行をヘッダー名のオブジェクトに変換（JSON出力用）
    pub fn to_json_rows(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.headers
                    .iter()
                    .zip(row)
                    .map(|(h, v)| (h.clone(), Value::String(v.clone())))
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> DataTable {
        let mut table = DataTable::new(vec!["車種名".to_string(), "グレード".to_string()]);
        table.push_row(vec!["スイフト".to_string(), "RS".to_string()]);
        table.push_row(vec!["スイフト".to_string(), "XG".to_string()]);
        table
    }

    #[test]
    fn test_column_index() {
        let table = sample_table();
        assert_eq!(table.column_index("グレード"), Some(1));
        assert_eq!(table.column_index("価格"), None);
    }

    #[test]
    fn test_cell() {
        let table = sample_table();
        assert_eq!(table.cell(0, "グレード"), Some("RS"));
        assert_eq!(table.cell(1, "車種名"), Some("スイフト"));
        assert_eq!(table.cell(2, "グレード"), None);
    }

    #[test]
    fn test_push_row_pads_short_rows() {
        let mut table = DataTable::new(vec!["A".to_string(), "B".to_string()]);
        table.push_row(vec!["1".to_string()]);
        assert_eq!(table.cell(0, "B"), Some(""));
    }

    #[test]
    fn test_with_columns_appends() {
        let table = sample_table();
        let enriched = table.with_columns(vec![(
            "正規グレード".to_string(),
            vec!["RS".to_string(), "XG".to_string()],
        )]);

        // 元の表は変更されない
        assert_eq!(table.headers().len(), 2);
        assert_eq!(enriched.headers().len(), 3);
        assert_eq!(enriched.cell(0, "正規グレード"), Some("RS"));
    }

    #[test]
    fn test_with_columns_replaces_existing() {
        let table = sample_table();
        let enriched = table.with_columns(vec![(
            "グレード".to_string(),
            vec!["A".to_string(), "B".to_string()],
        )]);

        assert_eq!(enriched.headers().len(), 2);
        assert_eq!(enriched.cell(0, "グレード"), Some("A"));
        assert_eq!(enriched.cell(1, "グレード"), Some("B"));
    }

    #[test]
    fn test_to_json_rows() {
        let table = sample_table();
        let rows = table.to_json_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("グレード"), Some(&Value::String("RS".to_string())));
    }
}
