use shared::{
    config::DatabaseConfig,
    error::{AppError, AppResult},
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

pub mod model;

fn make_sqlite_connect_options(cfg: &DatabaseConfig) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(&cfg.filename)
        .create_if_missing(true)
}

#[derive(Clone)]
pub struct ConnectionPool(SqlitePool);

impl ConnectionPool {
    pub fn new(pool: SqlitePool) -> Self {
        Self(pool)
    }

    pub fn inner_ref(&self) -> &SqlitePool {
        &self.0
    }

    pub async fn begin(&self) -> AppResult<sqlx::Transaction<'_, sqlx::Sqlite>> {
        self.0.begin().await.map_err(AppError::TransactionError)
    }
}

pub fn connect_database_with(cfg: &DatabaseConfig) -> ConnectionPool {
    // 接続は 1 本に固定して書き込みを直列化する。競合した申請は
    // 先勝ちになり、後続は SQLITE_BUSY ではなく確定済みの行に対する
    // 重複エラーを受け取る。
    ConnectionPool(
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect_lazy_with(make_sqlite_connect_options(cfg)),
    )
}

/// 起動時にテーブルを用意する
pub async fn init_schema(db: &ConnectionPool) -> AppResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reservations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id TEXT NOT NULL,
            organization TEXT NOT NULL,
            room TEXT NOT NULL,
            start_at TEXT NOT NULL,
            end_at TEXT NOT NULL,
            created_at TEXT NOT NULL,
            notified INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(db.inner_ref())
    .await
    .map_err(AppError::SpecificOperationError)?;

    Ok(())
}
