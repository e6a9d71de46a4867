//! 結果出力
//!
//! 正規化済みの一覧表とレポートをCSV/Excel/JSONへ書き出す。
//! Excelは正規化済みデータ・グレード別集計・メタデータの3シート構成。

use crate::batch::{NormalizationReport, MATCH_SCORE_COLUMN, NORMALIZED_GRADE_COLUMN};
use crate::error::{CarGradeError, Result};
use crate::table::DataTable;
use lazy_static::lazy_static;
use regex::Regex;
use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook};
use std::collections::HashMap;
use std::path::Path;

/// 価格列
pub const PRICE_COLUMN: &str = "支払総額";

/// CSV書き出し（Excel互換のためBOM付きUTF-8）
pub fn write_csv(table: &DataTable, path: &Path) -> Result<()> {
    let mut out = String::from("\u{feff}");
    out.push_str(&csv_line(table.headers()));
    for row in table.rows() {
        out.push_str(&csv_line(row));
    }
    std::fs::write(path, out)?;
    Ok(())
}

fn csv_line(fields: &[String]) -> String {
    let mut line = fields
        .iter()
        .map(|field| csv_field(field))
        .collect::<Vec<_>>()
        .join(",");
    line.push('\n');
    line
}

fn csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// 一覧表をJSON（行オブジェクトの配列）で書き出す
pub fn write_json(table: &DataTable, path: &Path) -> Result<()> {
    let rows = table.to_json_rows();
    let json = serde_json::to_string_pretty(&rows)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// レポートをJSONで書き出す
pub fn write_report_json(report: &NormalizationReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Excelブックを書き出す
pub fn write_excel(
    table: &DataTable,
    report: &NormalizationReport,
    source: &Path,
    path: &Path,
) -> Result<()> {
    let mut workbook = Workbook::new();

    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xF5F5F5))
        .set_border(FormatBorder::Thin);

    // 正規化済みデータ
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("正規化済みデータ").map_err(excel_err)?;
    for (col, header) in table.headers().iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, header, &header_format)
            .map_err(excel_err)?;
    }
    for (row_idx, row) in table.rows().iter().enumerate() {
        for (col, value) in row.iter().enumerate() {
            write_cell(worksheet, row_idx as u32 + 1, col as u16, value)?;
        }
    }

    // グレード別集計
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("グレード別集計").map_err(excel_err)?;
    let summary_headers = [
        "正規グレード",
        "件数",
        "平均精度",
        "平均価格(万円)",
        "最低価格(万円)",
        "最高価格(万円)",
        "価格データ数",
    ];
    for (col, header) in summary_headers.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, *header, &header_format)
            .map_err(excel_err)?;
    }
    for (row_idx, summary) in grade_summary(table, report).iter().enumerate() {
        let row = row_idx as u32 + 1;
        worksheet.write_string(row, 0, &summary.grade).map_err(excel_err)?;
        worksheet.write_number(row, 1, summary.count as f64).map_err(excel_err)?;
        worksheet
            .write_number(row, 2, round2(summary.mean_score))
            .map_err(excel_err)?;
        worksheet
            .write_number(row, 3, round2(summary.price.mean))
            .map_err(excel_err)?;
        worksheet.write_number(row, 4, summary.price.min).map_err(excel_err)?;
        worksheet.write_number(row, 5, summary.price.max).map_err(excel_err)?;
        worksheet
            .write_number(row, 6, summary.price.count as f64)
            .map_err(excel_err)?;
    }

    // メタデータ
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("メタデータ").map_err(excel_err)?;
    let processed_at = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string();
    let metadata = [
        ("ソースファイル", source.display().to_string()),
        ("処理日時", processed_at),
        ("総件数", report.total_count.to_string()),
        ("正規グレード数", report.unique_normalized_grades.to_string()),
    ];
    for (row_idx, (label, value)) in metadata.iter().enumerate() {
        let row = row_idx as u32;
        worksheet
            .write_string_with_format(row, 0, *label, &header_format)
            .map_err(excel_err)?;
        worksheet.write_string(row, 1, value).map_err(excel_err)?;
    }

    workbook.save(path).map_err(excel_err)?;
    Ok(())
}

/// 数値に見えるセルは数値として書く
fn write_cell(
    worksheet: &mut rust_xlsxwriter::Worksheet,
    row: u32,
    col: u16,
    value: &str,
) -> Result<()> {
    if !value.is_empty() {
        if let Ok(number) = value.parse::<f64>() {
            worksheet.write_number(row, col, number).map_err(excel_err)?;
            return Ok(());
        }
    }
    worksheet.write_string(row, col, value).map_err(excel_err)?;
    Ok(())
}

fn excel_err(e: rust_xlsxwriter::XlsxError) -> CarGradeError {
    CarGradeError::ExcelGeneration(e.to_string())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 価格統計
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

impl PriceStats {
    fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        Self {
            mean: values.iter().sum::<f64>() / values.len() as f64,
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            count: values.len(),
        }
    }
}

/// グレード別集計の1行
#[derive(Debug, Clone)]
pub struct GradeSummaryRow {
    pub grade: String,
    pub count: usize,
    pub mean_score: f64,
    pub price: PriceStats,
}

/// 正規グレードごとの件数・平均精度・価格統計
///
/// 並び順はレポートの件数降順に合わせる。
pub fn grade_summary(table: &DataTable, report: &NormalizationReport) -> Vec<GradeSummaryRow> {
    let Some(normalized) = table.column(NORMALIZED_GRADE_COLUMN) else {
        return Vec::new();
    };
    let scores = table.column(MATCH_SCORE_COLUMN);
    let prices = table.column(PRICE_COLUMN);

    let mut score_sums: HashMap<&str, (f64, usize)> = HashMap::new();
    let mut price_values: HashMap<&str, Vec<f64>> = HashMap::new();

    for (idx, &grade) in normalized.iter().enumerate() {
        if let Some(scores) = &scores {
            let score = scores.get(idx).and_then(|s| s.parse::<f64>().ok()).unwrap_or(0.0);
            let entry = score_sums.entry(grade).or_insert((0.0, 0));
            entry.0 += score;
            entry.1 += 1;
        }
        if let Some(prices) = &prices {
            if let Some(price) = prices.get(idx).and_then(|p| parse_price(p)) {
                price_values.entry(grade).or_default().push(price);
            }
        }
    }

    report
        .grade_distribution
        .iter()
        .map(|entry| {
            let mean_score = score_sums
                .get(entry.grade.as_str())
                .map(|(sum, count)| sum / *count as f64)
                .unwrap_or(0.0);
            let price = price_values
                .get(entry.grade.as_str())
                .map(|values| PriceStats::from_values(values))
                .unwrap_or_default();
            GradeSummaryRow {
                grade: entry.grade.clone(),
                count: entry.count,
                mean_score,
                price,
            }
        })
        .collect()
}

/// 「123.4万円」表記から金額を取り出す
pub fn parse_price(text: &str) -> Option<f64> {
    lazy_static! {
        static ref PRICE: Regex = Regex::new(r"([0-9.]+)万円").unwrap();
    }
    PRICE
        .captures(text)
        .and_then(|caps| caps[1].parse::<f64>().ok())
}

/// レポートをコンソールに表示する
pub fn print_report(report: &NormalizationReport, source: &Path) {
    println!();
    println!("{}", "=".repeat(60));
    println!("📊 分析レポート");
    println!("{}", "=".repeat(60));
    println!("ソースファイル: {}", source.display());

    println!("\n📈 基本統計:");
    println!("  総データ数: {}件", report.total_count);
    println!("  元グレード数: {}種類", report.unique_original_grades);
    println!("  正規グレード数: {}種類", report.unique_normalized_grades);

    let quality = &report.matching_quality;
    println!("\n🎯 マッチング精度:");
    println!("  高精度(≥80%): {}件", quality.high_confidence);
    println!("  中精度(60-80%): {}件", quality.medium_confidence);
    println!("  低精度(<60%): {}件", quality.low_confidence);

    println!("\n📋 グレード別データ数(上位5件):");
    for entry in report.grade_distribution.iter().take(5) {
        println!("  {}: {}件", entry.grade, entry.count);
    }
}
