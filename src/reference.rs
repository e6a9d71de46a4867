//! 正規グレード参照データベース
//!
//! JSON設定（車種ごとの正規グレード・エイリアス・特殊パターン）と
//! 除外キーワード一覧を読み込む。どちらも読み込み失敗は警告にとどめ、
//! 空の構造で処理を続行できるようにする。

use crate::error::Result;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// JSON設定の1車種分
#[derive(Debug, Clone, Deserialize)]
struct ModelConfigEntry {
    car_name: String,
    grades: Vec<String>,
    #[serde(default)]
    aliases: Vec<String>,
    /// 記載順がそのまま優先順になる
    #[serde(default)]
    special_patterns: serde_json::Map<String, serde_json::Value>,
}

/// 1車種分の参照情報
#[derive(Debug, Clone, Default)]
pub struct ModelEntry {
    grades: Vec<String>,
    aliases: Vec<String>,
    special_patterns: Vec<(String, String)>,
}

impl ModelEntry {
    /// 正規グレード一覧（上流で重複排除されないため重複があり得る）
    pub fn grades(&self) -> &[String] {
        &self.grades
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn special_patterns(&self) -> &[(String, String)] {
        &self.special_patterns
    }

    /// 特殊パターン照合（大文字小文字無視・記載順の先勝ち）
    pub fn special_label(&self, cleaned: &str) -> Option<&str> {
        let lowered = cleaned.to_lowercase();
        self.special_patterns
            .iter()
            .find(|(trigger, _)| lowered.contains(&trigger.to_lowercase()))
            .map(|(_, label)| label.as_str())
    }
}

/// 車種名 → 正規グレード一覧の参照データベース
///
/// 構築後は変更しない。設定ファイルの記載順を保持する。
#[derive(Debug, Clone, Default)]
pub struct GradeReference {
    entries: Vec<(String, ModelEntry)>,
    index: HashMap<String, usize>,
}

/// 設定読み込みの結果
///
/// 「設定が読めなかった」と「読めたがグレード定義がない」を
/// 呼び出し側で区別できるようにする。
#[derive(Debug)]
pub enum ReferenceLoad {
    Loaded(GradeReference),
    Empty { reason: String },
}

impl ReferenceLoad {
    pub fn is_loaded(&self) -> bool {
        matches!(self, ReferenceLoad::Loaded(_))
    }

    /// 失敗時は空のデータベースに落とす
    pub fn into_reference(self) -> GradeReference {
        match self {
            ReferenceLoad::Loaded(reference) => reference,
            ReferenceLoad::Empty { .. } => GradeReference::default(),
        }
    }
}

impl GradeReference {
    /// JSONファイルから読み込み（fail-soft）
    pub fn load(path: &Path) -> ReferenceLoad {
        match Self::read(path) {
            Ok(reference) => {
                info!("正規グレードDB読み込み: {}車種", reference.len());
                ReferenceLoad::Loaded(reference)
            }
            Err(e) => {
                warn!("正規グレードDBを読み込めません ({}): {}", path.display(), e);
                ReferenceLoad::Empty {
                    reason: e.to_string(),
                }
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// JSON文字列から読み込み
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: Vec<ModelConfigEntry> = serde_json::from_str(json.trim_start_matches('\u{feff}'))?;
        let mut reference = Self::default();

        for entry in raw {
            let special_patterns = entry
                .special_patterns
                .into_iter()
                .map(|(trigger, label)| {
                    let label = match label {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    };
                    (trigger, label)
                })
                .collect();

            let model = ModelEntry {
                grades: entry.grades,
                aliases: entry.aliases,
                special_patterns,
            };

            // 同名の車種は後の定義で上書き
            match reference.index.get(&entry.car_name) {
                Some(&pos) => reference.entries[pos].1 = model,
                None => {
                    reference.index.insert(entry.car_name.clone(), reference.entries.len());
                    reference.entries.push((entry.car_name, model));
                }
            }
        }

        Ok(reference)
    }

    /// 登録車種数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 車種エントリを取得
    pub fn model(&self, car_name: &str) -> Option<&ModelEntry> {
        self.index.get(car_name).map(|&pos| &self.entries[pos].1)
    }

    /// 車種名正規化（エイリアス対応）
    ///
    /// 完全一致のキーを最優先し、以降は記載順に各車種のエイリアスを
    /// 完全一致 → 双方向の部分一致の順で照合する。どれにも一致しなければ
    /// 入力をそのまま返す（未知車種扱い）。
    pub fn resolve_model_name<'a>(&'a self, car_name: &'a str) -> &'a str {
        if car_name.is_empty() {
            return car_name;
        }
        if self.index.contains_key(car_name) {
            return car_name;
        }

        let lowered = car_name.to_lowercase();
        for (name, entry) in &self.entries {
            if entry.aliases.iter().any(|alias| alias == car_name) {
                return name;
            }
            for alias in &entry.aliases {
                let alias_lower = alias.to_lowercase();
                if lowered.contains(&alias_lower) || alias_lower.contains(&lowered) {
                    return name;
                }
            }
        }

        car_name
    }
}

/// 除外キーワード一覧
///
/// マッチング前に生テキストから取り除く宣伝文句などのノイズ語。
#[derive(Debug, Clone, Default)]
pub struct ExcludeKeywords {
    keywords: Vec<String>,
    patterns: Vec<Regex>,
}

impl ExcludeKeywords {
    /// テキストファイルから読み込み（fail-soft）
    ///
    /// 1行1キーワード。`#` 始まりの行と空行は無視する。
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let keywords = Self::from_lines(&content);
                info!("除外キーワード読み込み: {}件", keywords.len());
                keywords
            }
            Err(e) => {
                warn!("除外キーワードファイルを読み込めません ({}): {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// 行単位のテキストから構築
    pub fn from_lines(content: &str) -> Self {
        let keywords: Vec<String> = content
            .trim_start_matches('\u{feff}')
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(String::from)
            .collect();
        Self::compile(keywords)
    }

    fn compile(keywords: Vec<String>) -> Self {
        let patterns = keywords
            .iter()
            .filter_map(|keyword| {
                Regex::new(&format!(r"(?i)\b{}\b", regex::escape(keyword))).ok()
            })
            .collect();
        Self { keywords, patterns }
    }

    /// 登録キーワードを単語単位・大文字小文字無視で取り除く
    pub fn strip(&self, text: &str) -> String {
        let mut cleaned = text.to_string();
        for pattern in &self.patterns {
            cleaned = pattern.replace_all(&cleaned, "").into_owned();
        }
        cleaned
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_JSON: &str = r#"[
        {
            "car_name": "RC F",
            "grades": ["ベース", "カーボンエクステリア", "パフォーマンス"],
            "aliases": ["RCF", "RC-F"],
            "special_patterns": {
                "カーボンエクステリアパッケージ": "カーボンエクステリア",
                "パフォーマンスパッケージ": "パフォーマンス"
            }
        },
        {
            "car_name": "スイフト",
            "grades": ["XG", "RS", "HYBRID RS"]
        }
    ]"#;

    #[test]
    fn test_from_json() {
        let reference = GradeReference::from_json(TEST_JSON).unwrap();
        assert_eq!(reference.len(), 2);

        let entry = reference.model("RC F").unwrap();
        assert_eq!(entry.grades().len(), 3);
        assert_eq!(entry.aliases(), &["RCF".to_string(), "RC-F".to_string()]);
        assert_eq!(entry.special_patterns().len(), 2);
    }

    #[test]
    fn test_special_patterns_keep_insertion_order() {
        let json = r#"[{
            "car_name": "X",
            "grades": [],
            "special_patterns": {"パッケージB": "B", "パッケージ": "A"}
        }]"#;
        let reference = GradeReference::from_json(json).unwrap();
        let entry = reference.model("X").unwrap();

        // 記載順の先勝ち: より長いパターンが先に書いてあればそちらが当たる
        assert_eq!(entry.special_label("パッケージB付"), Some("B"));
        assert_eq!(entry.special_label("パッケージ付"), Some("A"));
    }

    #[test]
    fn test_special_label_case_insensitive() {
        let json = r#"[{
            "car_name": "X",
            "grades": [],
            "special_patterns": {"Carbon": "カーボン"}
        }]"#;
        let reference = GradeReference::from_json(json).unwrap();
        let entry = reference.model("X").unwrap();
        assert_eq!(entry.special_label("carbon package"), Some("カーボン"));
    }

    #[test]
    fn test_resolve_model_name_exact_key() {
        let reference = GradeReference::from_json(TEST_JSON).unwrap();
        assert_eq!(reference.resolve_model_name("RC F"), "RC F");
    }

    #[test]
    fn test_resolve_model_name_alias() {
        let reference = GradeReference::from_json(TEST_JSON).unwrap();
        assert_eq!(reference.resolve_model_name("RCF"), "RC F");
    }

    #[test]
    fn test_resolve_model_name_partial_alias() {
        let reference = GradeReference::from_json(TEST_JSON).unwrap();
        // 入力がエイリアスを含む
        assert_eq!(reference.resolve_model_name("レクサス RCF"), "RC F");
        // エイリアスが入力を含む
        assert_eq!(reference.resolve_model_name("rc-"), "RC F");
    }

    #[test]
    fn test_resolve_model_name_unknown() {
        let reference = GradeReference::from_json(TEST_JSON).unwrap();
        assert_eq!(reference.resolve_model_name("デミオ"), "デミオ");
    }

    #[test]
    fn test_resolve_model_name_empty() {
        let reference = GradeReference::from_json(TEST_JSON).unwrap();
        // 空文字は部分一致で誤爆させない
        assert_eq!(reference.resolve_model_name(""), "");
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let outcome = GradeReference::load(Path::new("/nonexistent/grades.json"));
        assert!(!outcome.is_loaded());
        assert!(outcome.into_reference().is_empty());
    }

    #[test]
    fn test_load_malformed_json_is_empty() {
        let dir = std::env::temp_dir().join("car-grade-test-badjson");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("grades.json");
        std::fs::write(&path, "{ not json").unwrap();

        let outcome = GradeReference::load(&path);
        assert!(!outcome.is_loaded());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_duplicate_car_name_overwrites() {
        let json = r#"[
            {"car_name": "X", "grades": ["A"]},
            {"car_name": "X", "grades": ["B"]}
        ]"#;
        let reference = GradeReference::from_json(json).unwrap();
        assert_eq!(reference.len(), 1);
        assert_eq!(reference.model("X").unwrap().grades(), &["B".to_string()]);
    }

    #[test]
    fn test_exclude_keywords_from_lines() {
        let content = "# コメント\n禁煙車\n\nナビ\n";
        let keywords = ExcludeKeywords::from_lines(content);
        assert_eq!(keywords.len(), 2);
        assert_eq!(keywords.keywords(), &["禁煙車".to_string(), "ナビ".to_string()]);
    }

    #[test]
    fn test_exclude_keywords_strip() {
        let keywords = ExcludeKeywords::from_lines("禁煙車\nETC\n");
        let cleaned = keywords.strip("RS 禁煙車 etc付き");
        assert!(!cleaned.contains("禁煙車"));
        assert!(cleaned.contains("RS"));
        // 語中に埋まった etc は単語単位の削除では消えない
        assert!(cleaned.contains("etc付き"));
    }

    #[test]
    fn test_exclude_keywords_case_insensitive() {
        let keywords = ExcludeKeywords::from_lines("ETC\n");
        assert_eq!(keywords.strip("RS etc").trim(), "RS");
    }

    #[test]
    fn test_exclude_keywords_load_missing_file() {
        let keywords = ExcludeKeywords::load(Path::new("/nonexistent/keywords.txt"));
        assert!(keywords.is_empty());
    }
}
