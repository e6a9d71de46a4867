use thiserror::Error;

#[derive(Error, Debug)]
pub enum CarGradeError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("サポートされていないファイル形式: {0}")]
    UnsupportedFormat(String),

    #[error("データファイルが見つかりません: {0}")]
    NoDataFound(String),

    #[error("Excel読み込みエラー: {0}")]
    ExcelRead(String),

    #[error("Excel生成エラー: {0}")]
    ExcelGeneration(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CarGradeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_not_found() {
        let error = CarGradeError::FileNotFound("data/listings.csv".to_string());
        let display = format!("{}", error);
        assert!(display.contains("ファイルが見つかりません"));
        assert!(display.contains("data/listings.csv"));
    }

    #[test]
    fn test_error_from_io() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let error: CarGradeError = io_error.into();
        assert!(matches!(error, CarGradeError::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: CarGradeError = json_error.into();
        assert!(matches!(error, CarGradeError::JsonParse(_)));
    }
}
