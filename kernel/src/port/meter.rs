use crate::model::meter::MeterStatus;
use async_trait::async_trait;
use shared::error::AppResult;

#[async_trait]
pub trait MeterPort: Send + Sync {
    async fn status(&self) -> AppResult<MeterStatus>;
}
