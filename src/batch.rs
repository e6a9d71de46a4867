//! 一括正規化とレポート
//!
//! 一覧表の各行にグレード解決を適用して3つの派生列
//! （元グレード・正規グレード・マッチング精度）を付加する。
//! 入力の表は変更せず、新しい表を返す。

use crate::resolver::extract::BASE_GRADE;
use crate::resolver::{GradeResolver, MatchThresholds};
use crate::table::DataTable;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

/// 入力列
pub const GRADE_COLUMN: &str = "グレード";
pub const MODEL_COLUMN: &str = "車種名";

/// 派生列
pub const ORIGINAL_GRADE_COLUMN: &str = "元グレード";
pub const NORMALIZED_GRADE_COLUMN: &str = "正規グレード";
pub const MATCH_SCORE_COLUMN: &str = "マッチング精度";

/// 既定のレポート対応例件数
pub const DEFAULT_TOP_N: usize = 10;

struct RowOutcome {
    original: String,
    normalized: String,
    score: f64,
}

/// 一覧表のグレードを正規化した新しい表を返す
///
/// グレード列がない・表が空の場合は警告して入力をそのまま返す。
/// 行ごとに独立して解決するため並列に処理する。
pub fn normalize_table(table: &DataTable, resolver: &GradeResolver) -> DataTable {
    if table.is_empty() {
        warn!("空のデータです");
        return table.clone();
    }

    let Some(grade_col) = table.column_index(GRADE_COLUMN) else {
        warn!("'{}'列が見つかりません", GRADE_COLUMN);
        return table.clone();
    };
    let model_col = table.column_index(MODEL_COLUMN);

    info!("グレード正規化開始: {}件", table.len());

    let total = table.len();
    let done = AtomicUsize::new(0);

    let outcomes: Vec<RowOutcome> = table
        .rows()
        .par_iter()
        .map(|row| {
            let outcome = normalize_row(row, grade_col, model_col, resolver);
            let processed = done.fetch_add(1, Ordering::Relaxed) + 1;
            if processed % 100 == 0 {
                info!("正規化進捗: {}/{}", processed, total);
            }
            outcome
        })
        .collect();

    let thresholds = resolver.thresholds();
    let high = count_tier(&outcomes, |s| s >= thresholds.high_confidence);
    let medium = count_tier(&outcomes, |s| {
        s >= thresholds.medium_confidence && s < thresholds.high_confidence
    });
    let low = count_tier(&outcomes, |s| s < thresholds.medium_confidence);
    info!("正規化完了: 高精度{}件 / 中精度{}件 / 低精度{}件", high, medium, low);

    let mut originals = Vec::with_capacity(outcomes.len());
    let mut normalized = Vec::with_capacity(outcomes.len());
    let mut scores = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        originals.push(outcome.original);
        normalized.push(outcome.normalized);
        scores.push(outcome.score.to_string());
    }

    table.with_columns(vec![
        (ORIGINAL_GRADE_COLUMN.to_string(), originals),
        (NORMALIZED_GRADE_COLUMN.to_string(), normalized),
        (MATCH_SCORE_COLUMN.to_string(), scores),
    ])
}

fn normalize_row(
    row: &[String],
    grade_col: usize,
    model_col: Option<usize>,
    resolver: &GradeResolver,
) -> RowOutcome {
    let raw = row.get(grade_col).map(String::as_str).unwrap_or("");

    // グレード欠損行は既定ラベルに落とす
    if raw.trim().is_empty() {
        return RowOutcome {
            original: String::new(),
            normalized: BASE_GRADE.to_string(),
            score: 0.0,
        };
    }

    let model = model_col
        .and_then(|col| row.get(col))
        .map(String::as_str)
        .unwrap_or("Unknown");

    let matched = resolver.resolve(raw, model);
    RowOutcome {
        original: raw.to_string(),
        normalized: matched.grade,
        score: matched.score,
    }
}

fn count_tier<F: Fn(f64) -> bool>(outcomes: &[RowOutcome], tier: F) -> usize {
    outcomes.iter().filter(|o| tier(o.score)).count()
}

/// マッチング精度の内訳
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct MatchingQuality {
    pub high_confidence: usize,
    pub medium_confidence: usize,
    pub low_confidence: usize,
}

/// 正規グレード別の件数
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GradeCount {
    pub grade: String,
    pub count: usize,
}

/// 元→正規の対応と頻度
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MappingCount {
    pub original: String,
    pub normalized: String,
    pub count: usize,
}

/// 正規化レポート
///
/// 正規化済みの表から導出される読み取り専用の集計。
#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizationReport {
    pub total_count: usize,
    pub unique_original_grades: usize,
    pub unique_normalized_grades: usize,
    pub matching_quality: MatchingQuality,
    /// 件数降順（同数は出現順）
    pub grade_distribution: Vec<GradeCount>,
    /// 対応頻度の上位N件
    pub mapping_examples: Vec<MappingCount>,
}

/// 正規化済みの表からレポートを計算する
///
/// 派生列がない場合は空のレポートを返す。入力は変更しない。
pub fn build_report(
    table: &DataTable,
    thresholds: &MatchThresholds,
    top_n: usize,
) -> NormalizationReport {
    let Some(normalized) = table.column(NORMALIZED_GRADE_COLUMN) else {
        return NormalizationReport::default();
    };
    let originals = table.column(ORIGINAL_GRADE_COLUMN);
    let scores: Vec<f64> = table
        .column(MATCH_SCORE_COLUMN)
        .map(|values| {
            values
                .iter()
                .map(|v| v.parse::<f64>().unwrap_or(0.0))
                .collect()
        })
        .unwrap_or_default();

    let total_count = table.len();

    let unique_normalized_grades = normalized.iter().collect::<HashSet<_>>().len();
    let unique_original_grades = originals
        .as_ref()
        .map(|values| values.iter().collect::<HashSet<_>>().len())
        .unwrap_or(0);

    let mut quality = MatchingQuality::default();
    for &score in &scores {
        if score >= thresholds.high_confidence {
            quality.high_confidence += 1;
        } else if score >= thresholds.medium_confidence {
            quality.medium_confidence += 1;
        } else {
            quality.low_confidence += 1;
        }
    }

    let grade_distribution = count_by(normalized.iter().map(|g| g.to_string()))
        .into_iter()
        .map(|(grade, count)| GradeCount { grade, count })
        .collect();

    let mapping_examples = originals
        .map(|orig| {
            count_by(
                orig.iter()
                    .zip(&normalized)
                    .map(|(o, n)| (o.to_string(), n.to_string())),
            )
            .into_iter()
            .take(top_n)
            .map(|((original, normalized), count)| MappingCount {
                original,
                normalized,
                count,
            })
            .collect()
        })
        .unwrap_or_default();

    NormalizationReport {
        total_count,
        unique_original_grades,
        unique_normalized_grades,
        matching_quality: quality,
        grade_distribution,
        mapping_examples,
    }
}

/// 値ごとの件数を出現順を保ったまま数え、件数降順に並べる
fn count_by<K>(values: impl Iterator<Item = K>) -> Vec<(K, usize)>
where
    K: Eq + std::hash::Hash + Clone,
{
    let mut counts: HashMap<K, usize> = HashMap::new();
    let mut order: Vec<K> = Vec::new();
    for value in values {
        if !counts.contains_key(&value) {
            order.push(value.clone());
        }
        *counts.entry(value).or_insert(0) += 1;
    }

    let mut result: Vec<(K, usize)> = order
        .into_iter()
        .map(|value| {
            let count = counts[&value];
            (value, count)
        })
        .collect();
    // 安定ソートなので同数は出現順のまま
    result.sort_by(|a, b| b.1.cmp(&a.1));
    result
}
