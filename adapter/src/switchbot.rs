use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use kernel::model::meter::MeterStatus;
use kernel::port::meter::MeterPort;
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use shared::{
    config::SwitchBotConfig,
    error::{AppError, AppResult},
};
use uuid::Uuid;

const API_BASE: &str = "https://api.switch-bot.com/v1.1";

/// SwitchBot API v1.1 から温湿度計のステータスを取得する。
pub struct SwitchBotClient {
    http: Client,
    token: String,
    secret: String,
    device_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusEnvelope {
    status_code: i64,
    #[serde(default)]
    message: String,
    body: Option<MeterStatus>,
}

impl SwitchBotClient {
    pub fn new(cfg: &SwitchBotConfig) -> Self {
        Self {
            http: Client::new(),
            token: cfg.token.clone(),
            secret: cfg.secret.clone(),
            device_id: cfg.device_id.clone(),
        }
    }

    // token + タイムスタンプ + nonce を HMAC-SHA256 で署名する
    fn sign(&self) -> AppResult<(String, String, String)> {
        let t = Utc::now().timestamp_millis().to_string();
        let nonce = Uuid::new_v4().simple().to_string();

        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.as_bytes())
            .map_err(|e| AppError::ExternalServiceError(format!("SwitchBot sign error: {e}")))?;
        mac.update(format!("{}{}{}", self.token, t, nonce).as_bytes());
        let sign = general_purpose::STANDARD.encode(mac.finalize().into_bytes());

        Ok((sign, t, nonce))
    }
}

#[async_trait]
impl MeterPort for SwitchBotClient {
    async fn status(&self) -> AppResult<MeterStatus> {
        let (sign, t, nonce) = self.sign()?;

        let envelope: StatusEnvelope = self
            .http
            .get(format!("{API_BASE}/devices/{}/status", self.device_id))
            .bearer_auth(&self.token)
            .header("sign", sign)
            .header("t", t)
            .header("nonce", nonce)
            .send()
            .await
            .map_err(external)?
            .error_for_status()
            .map_err(external)?
            .json()
            .await
            .map_err(external)?;

        if envelope.status_code != 100 {
            return Err(AppError::ExternalServiceError(format!(
                "SwitchBot API error: {} {}",
                envelope.status_code, envelope.message
            )));
        }

        envelope
            .body
            .ok_or_else(|| AppError::ExternalServiceError("SwitchBot API returned no body".into()))
    }
}

fn external(e: impl std::fmt::Display) -> AppError {
    AppError::ExternalServiceError(format!("SwitchBot API error: {e}"))
}
