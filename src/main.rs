use car_grade_rust::{batch, cli, error, export, ingest, reference, resolver};
use clap::Parser;
use cli::{Cli, Commands};
use dialoguer::Select;
use error::{CarGradeError, Result};
use reference::{ExcludeKeywords, GradeReference, ReferenceLoad};
use resolver::{GradeResolver, MatchThresholds};
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Analyze {
            input,
            grades,
            exclude,
            output,
            format,
            top_n,
            similarity_floor,
            choose,
        } => {
            println!("🚗 car-grade - グレード正規化\n");

            // 1. 設定読み込み
            println!("[1/4] 設定を読み込み中...");
            let reference = match GradeReference::load(&grades) {
                ReferenceLoad::Loaded(reference) => {
                    println!("✔ 正規グレードDB: {}車種", reference.len());
                    reference
                }
                ReferenceLoad::Empty { reason } => {
                    println!("⚠ 正規グレードDBなしで続行（ヒューリスティック抽出のみ）: {}", reason);
                    GradeReference::default()
                }
            };
            let exclude = match exclude {
                Some(path) => ExcludeKeywords::load(&path),
                None => ExcludeKeywords::default(),
            };
            println!("✔ 除外キーワード: {}件\n", exclude.len());

            let thresholds = MatchThresholds {
                similarity_floor,
                ..Default::default()
            };
            let resolver = GradeResolver::new(reference, exclude).with_thresholds(thresholds);

            // 2. データ読み込み
            println!("[2/4] データを読み込み中...");
            let source = resolve_input_path(&input, choose)?;
            let table = ingest::load_table(&source)?;
            println!("✔ {}件を読み込み: {}\n", table.len(), source.display());

            // 3. 正規化
            println!("[3/4] グレードを正規化中...");
            let normalized = batch::normalize_table(&table, &resolver);
            let report = batch::build_report(&normalized, resolver.thresholds(), top_n);
            println!("✔ 正規化完了\n");

            // 4. 結果保存
            println!("[4/4] 結果を保存中...");
            let output_dir = match output {
                Some(dir) => dir,
                None => source.parent().unwrap_or(Path::new(".")).to_path_buf(),
            };
            std::fs::create_dir_all(&output_dir)?;
            let base_name = output_base_name(&normalized);

            if format.wants_csv() {
                let path = output_dir.join(format!("{}.csv", base_name));
                export::write_csv(&normalized, &path)?;
                println!("✔ CSV: {}", path.display());
            }
            if format.wants_excel() {
                let path = output_dir.join(format!("{}.xlsx", base_name));
                export::write_excel(&normalized, &report, &source, &path)?;
                println!("✔ Excel: {}", path.display());
            }
            if format.wants_json() {
                let path = output_dir.join(format!("{}.json", base_name));
                export::write_json(&normalized, &path)?;
                let report_path = output_dir.join(format!("{}_report.json", base_name));
                export::write_report_json(&report, &report_path)?;
                println!("✔ JSON: {}", path.display());
            }

            export::print_report(&report, &source);
            println!("\n✅ 分析完了");
        }

        Commands::Report { input, output, top_n } => {
            println!("📊 car-grade - レポート再計算\n");

            let table = ingest::load_table(&input)?;
            let report = batch::build_report(&table, &MatchThresholds::default(), top_n);

            if let Some(path) = output {
                export::write_report_json(&report, &path)?;
                println!("✔ レポート: {}", path.display());
            }

            export::print_report(&report, &input);
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();
}

/// 入力パスを実ファイルに解決する
///
/// ディレクトリの場合は配下のCSVから選ぶ。既定は最新更新のファイル、
/// `--choose` 指定時は対話選択。
fn resolve_input_path(input: &Path, choose: bool) -> Result<PathBuf> {
    if !input.is_dir() {
        return Ok(input.to_path_buf());
    }

    if !choose {
        return ingest::latest_data_file(input);
    }

    let files = ingest::find_data_files(input);
    if files.is_empty() {
        return Err(CarGradeError::NoDataFound(input.display().to_string()));
    }

    let items: Vec<String> = files
        .iter()
        .map(|path| {
            path.strip_prefix(input)
                .unwrap_or(path)
                .display()
                .to_string()
        })
        .collect();

    let selection = Select::new()
        .with_prompt("ファイルを選択")
        .items(&items)
        .default(0)
        .interact()
        .map_err(|e| CarGradeError::Config(format!("ファイル選択エラー: {}", e)))?;

    Ok(files[selection].clone())
}

/// 出力ファイル名: <車種名>_normalized_<タイムスタンプ>
fn output_base_name(table: &car_grade_rust::DataTable) -> String {
    let car_name = table
        .cell(0, batch::MODEL_COLUMN)
        .filter(|name| !name.is_empty())
        .unwrap_or("Unknown");
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    format!("{}_normalized_{}", car_name, timestamp)
}
