//! グレード解決エンジン
//!
//! 生のグレード表記と車種名から正規グレードと信頼度を求める。
//!
//! ## 処理フロー
//! 1. テキストクリーニング（除外キーワード・括弧・区切り文字）
//! 2. 車種エイリアス解決
//! 3. コアグレード抽出（特殊パターン → ルール表 → 先頭単語）
//! 4. 正規グレードリストとの照合（完全一致 → コア一致 → 部分一致・類似度）

pub mod extract;
pub mod similarity;

use crate::reference::{ExcludeKeywords, GradeReference};
use extract::extract_core_grade;
use lazy_static::lazy_static;
use regex::Regex;
use similarity::similarity_ratio;

/// 完全一致の信頼度
const EXACT_MATCH_SCORE: f64 = 1.0;
/// コアグレード一致・特殊パターン確定の信頼度
const CORE_MATCH_SCORE: f64 = 0.95;

/// 照合のしきい値
///
/// ドメイン調整値なので再設計なしに変えられるよう定数にせず保持する。
#[derive(Debug, Clone, Copy)]
pub struct MatchThresholds {
    /// 類似度をベスト候補として採用する下限
    pub similarity_floor: f64,
    /// 高精度とみなす信頼度の下限
    pub high_confidence: f64,
    /// 中精度とみなす信頼度の下限
    pub medium_confidence: f64,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            similarity_floor: 0.6,
            high_confidence: 0.8,
            medium_confidence: 0.6,
        }
    }
}

/// 照合結果
#[derive(Debug, Clone, PartialEq)]
pub struct GradeMatch {
    /// 正規グレード（未知車種や不一致時は抽出トークン）
    pub grade: String,
    /// 信頼度 0.0〜1.0
    pub score: f64,
}

/// グレード解決エンジン
///
/// 参照データベースと除外キーワードは構築時に固定され、以降は
/// 読み取り専用。`resolve`は純関数なので行単位の並列適用が安全。
#[derive(Debug, Clone, Default)]
pub struct GradeResolver {
    reference: GradeReference,
    exclude: ExcludeKeywords,
    thresholds: MatchThresholds,
}

impl GradeResolver {
    pub fn new(reference: GradeReference, exclude: ExcludeKeywords) -> Self {
        Self {
            reference,
            exclude,
            thresholds: MatchThresholds::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: MatchThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn thresholds(&self) -> &MatchThresholds {
        &self.thresholds
    }

    pub fn reference(&self) -> &GradeReference {
        &self.reference
    }

    /// グレードテキストクリーニング
    ///
    /// 除外キーワードの削除 → 括弧類の除去 → 区切り文字の空白化 →
    /// 連続空白の圧縮とトリム。
    pub fn clean_grade_text(&self, grade_text: &str) -> String {
        if grade_text.is_empty() {
            return String::new();
        }

        lazy_static! {
            static ref BRACKETS: Regex = Regex::new(r"[（）()\[\]【】]").unwrap();
            static ref SEPARATORS: Regex = Regex::new(r"[・／/\-_]").unwrap();
            static ref SPACES: Regex = Regex::new(r"\s+").unwrap();
        }

        let cleaned = self.exclude.strip(grade_text);
        let cleaned = BRACKETS.replace_all(&cleaned, "");
        let cleaned = SEPARATORS.replace_all(&cleaned, " ");
        let cleaned = SPACES.replace_all(&cleaned, " ");
        cleaned.trim().to_string()
    }

    /// 生のグレード表記を正規グレードへ解決する
    ///
    /// 未知車種はヒューリスティック抽出の結果を信頼度0.0で返す。
    /// どの候補もしきい値を超えない場合も抽出トークンを返す（エラーにしない）。
    pub fn resolve(&self, raw_grade: &str, model_name: &str) -> GradeMatch {
        let cleaned = self.clean_grade_text(raw_grade);
        let resolved_name = self.reference.resolve_model_name(model_name);

        let Some(entry) = self.reference.model(resolved_name) else {
            return GradeMatch {
                grade: extract_core_grade(&cleaned),
                score: 0.0,
            };
        };

        // 車種固有の特殊パターンはリスト照合より優先で確定する
        if let Some(label) = entry.special_label(&cleaned) {
            return GradeMatch {
                grade: label.to_string(),
                score: CORE_MATCH_SCORE,
            };
        }

        let core = extract_core_grade(&cleaned);
        let cleaned_lower = cleaned.to_lowercase();
        let core_lower = core.to_lowercase();

        let mut best_grade = core.clone();
        let mut best_score = 0.0_f64;

        // 早期終了しない: 完全一致系以外は全候補を走査してベストを残す
        for official in entry.grades() {
            let official_lower = official.to_lowercase();

            if cleaned_lower == official_lower {
                return GradeMatch {
                    grade: official.clone(),
                    score: EXACT_MATCH_SCORE,
                };
            }

            if core_lower == official_lower {
                return GradeMatch {
                    grade: official.clone(),
                    score: CORE_MATCH_SCORE,
                };
            }

            // 部分一致（双方向）は類似度をそのまま採点に使う
            if official_lower.contains(&core_lower) || cleaned_lower.contains(&official_lower) {
                let score = similarity_ratio(&cleaned, official);
                if score > best_score {
                    best_grade = official.clone();
                    best_score = score;
                }
            }

            // 包含関係がなくても類似度が下限を超えれば候補にする
            let score = similarity_ratio(&cleaned, official);
            if score > best_score && score > self.thresholds.similarity_floor {
                best_grade = official.clone();
                best_score = score;
            }
        }

        GradeMatch {
            grade: best_grade,
            score: best_score,
        }
    }
}
