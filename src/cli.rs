use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "car-grade")]
#[command(about = "中古車グレード正規化・分析ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 一覧表のグレードを正規化して結果とレポートを出力
    Analyze {
        /// 入力ファイル（CSV/Excel）またはデータディレクトリ
        #[arg(required = true)]
        input: PathBuf,

        /// 正規グレードDB（JSON）
        #[arg(short, long)]
        grades: PathBuf,

        /// 除外キーワードファイル
        #[arg(short, long)]
        exclude: Option<PathBuf>,

        /// 出力先ディレクトリ（デフォルト: 入力ファイルの場所）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 出力形式 (csv/excel/json/all)
        #[arg(short, long, default_value = "excel")]
        format: OutputFormat,

        /// レポートの対応例上位件数
        #[arg(long, default_value = "10")]
        top_n: usize,

        /// 類似度採用の下限 (0.0-1.0)
        #[arg(long, default_value = "0.6")]
        similarity_floor: f64,

        /// ディレクトリ指定時にファイルを対話選択
        #[arg(long)]
        choose: bool,
    },

    /// 正規化済みファイルからレポートを再計算
    Report {
        /// 正規化済みファイル（CSV/Excel）
        #[arg(required = true)]
        input: PathBuf,

        /// レポートJSONの出力先
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 対応例上位件数
        #[arg(long, default_value = "10")]
        top_n: usize,
    },
}

/// 出力形式
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum OutputFormat {
    Csv,
    #[default]
    Excel,
    Json,
    All,
}

impl OutputFormat {
    pub fn wants_csv(&self) -> bool {
        matches!(self, OutputFormat::Csv | OutputFormat::All)
    }

    pub fn wants_excel(&self) -> bool {
        matches!(self, OutputFormat::Excel | OutputFormat::All)
    }

    pub fn wants_json(&self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::All)
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "excel" | "xlsx" => Ok(OutputFormat::Excel),
            "json" => Ok(OutputFormat::Json),
            "all" => Ok(OutputFormat::All),
            _ => Err(format!("Unknown format: {}. Use csv, excel, json, or all", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Excel => write!(f, "excel"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::All => write!(f, "all"),
        }
    }
}
