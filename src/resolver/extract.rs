//! コアグレード抽出
//!
//! クリーニング済みテキストから短いグレードトークンを取り出す。
//! 順序付きのルール表（正規表現 + 変換）→ リテラル特殊グレード表 →
//! 先頭単語の順で評価する。評価順そのものが優先度なので、
//! 表の並びを変えると結果が変わる。

use lazy_static::lazy_static;
use regex::Regex;

/// グレード表記がないときの既定ラベル
pub const BASE_GRADE: &str = "ベース";

/// マッチ結果に適用する変換
enum Transform {
    Upper,
    Title,
    Keep,
}

impl Transform {
    fn apply(&self, text: &str) -> String {
        match self {
            Transform::Upper => text.to_uppercase(),
            Transform::Title => title_case(text),
            Transform::Keep => text.to_string(),
        }
    }
}

struct ExtractionRule {
    pattern: Regex,
    group: usize,
    transform: Transform,
}

impl ExtractionRule {
    fn new(pattern: &str, group: usize, transform: Transform) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("抽出ルールの正規表現が不正"),
            group,
            transform,
        }
    }
}

lazy_static! {
    /// 先勝ちで評価するルール表
    static ref EXTRACTION_RULES: Vec<ExtractionRule> = vec![
        // 排気量 + トリムコード: "2.0 RS" → "RS"
        ExtractionRule::new(r"(?i)(\d+\.\d+)\s+(R[A-Z]+|[A-Z]+)", 2, Transform::Upper),
        // "HYBRID G" などのハイブリッド系
        ExtractionRule::new(r"(?i)(HYBRID\s+[A-Z]+)", 1, Transform::Upper),
        // "Custom G" などのカスタム系
        ExtractionRule::new(r"(?i)(Custom\s+[A-Z]+)", 1, Transform::Title),
        // 単独のトリムコード
        ExtractionRule::new(r"(?i)\b(R[A-Z]|GT|STI|EX|L|G|S|Z|X|RS)\b", 1, Transform::Upper),
        // 裸の排気量表記: "2.5L", "1.8T"
        ExtractionRule::new(r"(?i)\b(\d+\.\d+[LT]?)\b", 1, Transform::Keep),
    ];
}

/// リテラル特殊グレード（先勝ちの部分一致）
const SPECIAL_GRADES: &[(&str, &str)] = &[
    ("ハイパフォーマンス", "ハイパフォーマンス"),
    ("ハイ パフォーマンス", "ハイパフォーマンス"),
    ("スポーツ", "Sport"),
    ("ターボ", "ターボ"),
    ("モノトーン", "モノトーン"),
    ("2トーン", "2トーン"),
];

/// クリーニング済みテキストからコアグレードを抽出する
pub fn extract_core_grade(cleaned: &str) -> String {
    for rule in EXTRACTION_RULES.iter() {
        if let Some(caps) = rule.pattern.captures(cleaned) {
            if let Some(matched) = caps.get(rule.group) {
                return rule.transform.apply(matched.as_str());
            }
        }
    }

    for (pattern, normalized) in SPECIAL_GRADES {
        if cleaned.contains(pattern) {
            return (*normalized).to_string();
        }
    }

    cleaned
        .split_whitespace()
        .next()
        .map(str::to_string)
        .unwrap_or_else(|| BASE_GRADE.to_string())
}

/// 各単語の先頭だけ大文字にする
fn title_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut word_start = true;
    for c in text.chars() {
        if c.is_alphabetic() {
            if word_start {
                result.extend(c.to_uppercase());
            } else {
                result.extend(c.to_lowercase());
            }
            word_start = false;
        } else {
            result.push(c);
            word_start = true;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_prefixed_trim_code() {
        assert_eq!(extract_core_grade("2.0 RS"), "RS");
        assert_eq!(extract_core_grade("1.5 xg"), "XG");
    }

    #[test]
    fn test_hybrid() {
        assert_eq!(extract_core_grade("HYBRID G"), "HYBRID G");
        assert_eq!(extract_core_grade("hybrid rs"), "HYBRID RS");
    }

    #[test]
    fn test_custom_title_cased() {
        assert_eq!(extract_core_grade("custom rs"), "Custom Rs");
        assert_eq!(extract_core_grade("CUSTOM G"), "Custom G");
    }

    #[test]
    fn test_standalone_trim_code() {
        assert_eq!(extract_core_grade("GT リミテッド"), "GT");
        assert_eq!(extract_core_grade("sti"), "STI");
        assert_eq!(extract_core_grade("タイプ S 仕様"), "S");
    }

    #[test]
    fn test_bare_displacement() {
        assert_eq!(extract_core_grade("2.5L"), "2.5L");
        assert_eq!(extract_core_grade("1.8T"), "1.8T");
    }

    #[test]
    fn test_rule_order_is_precedence() {
        // 排気量+コードのルールが裸の排気量ルールより先に当たる
        assert_eq!(extract_core_grade("2.0 GT"), "GT");
    }

    #[test]
    fn test_special_grades() {
        assert_eq!(extract_core_grade("スポーツ仕様"), "Sport");
        assert_eq!(extract_core_grade("ハイ パフォーマンス"), "ハイパフォーマンス");
        assert_eq!(extract_core_grade("ターボ付"), "ターボ");
        assert_eq!(extract_core_grade("2トーンルーフ"), "2トーン");
    }

    #[test]
    fn test_first_word_fallback() {
        assert_eq!(extract_core_grade("アブソルート ホンダセンシング"), "アブソルート");
    }

    #[test]
    fn test_empty_falls_back_to_base() {
        assert_eq!(extract_core_grade(""), BASE_GRADE);
        assert_eq!(extract_core_grade("   "), BASE_GRADE);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("custom rs"), "Custom Rs");
        assert_eq!(title_case("2.0custom"), "2.0Custom");
    }
}
