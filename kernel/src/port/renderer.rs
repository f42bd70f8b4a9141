use shared::error::AppResult;

/// 表データを添付用の画像バイト列に描画する。
pub trait TableRenderer: Send + Sync {
    fn render(&self, rows: &[Vec<String>]) -> AppResult<Vec<u8>>;
}
