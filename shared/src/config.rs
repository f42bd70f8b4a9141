use anyhow::{Context, Result};

pub struct AppConfig {
    pub database: DatabaseConfig,
    pub discord: DiscordConfig,
    pub reservation: ReservationConfig,
    pub switchbot: SwitchBotConfig,
    pub gmail: GmailConfig,
}

impl AppConfig {
    pub fn new() -> Result<Self> {
        Ok(Self {
            database: DatabaseConfig {
                filename: env_or("DATABASE_PATH", "reservations.db"),
            },
            discord: DiscordConfig {
                bot_token: std::env::var("DISCORD_BOT_TOKEN")
                    .context("DISCORD_BOT_TOKEN is not set")?,
                board_channel: env_channel("DISCORD_RSV_BUTTON_CH")?,
                log_channel: env_channel("DISCORD_RSV_LOG_CH")?,
                temperature_channel: env_channel("TEMP_CHANNEL_ID")?,
                mail_channel: env_channel("GMAIL_CHANNEL_ID")?,
                startup_channel: env_channel("TEST_CHANNEL_ID")?,
            },
            reservation: ReservationConfig {
                admin_user_id: env_or("ADMIN_USER_ID", "0"),
                allow_past_edit: env_or("RSV_ALLOW_PAST_EDIT", "true")
                    .parse()
                    .context("RSV_ALLOW_PAST_EDIT must be true or false")?,
            },
            switchbot: SwitchBotConfig {
                token: env_or("SWITCHBOT_TOKEN", ""),
                secret: env_or("SWITCHBOT_SECRET", ""),
                device_id: env_or("SWITCHBOT_DEVICE_ID", ""),
                threshold_temp: env_or("THRESHOLD_TEMP", "5.0")
                    .parse()
                    .context("THRESHOLD_TEMP must be a number")?,
            },
            gmail: GmailConfig {
                access_token: env_or("GMAIL_ACCESS_TOKEN", ""),
                watch_subject: env_or("GMAIL_WATCH_SUBJECT", "Bambu Lab Verification Code"),
            },
        })
    }
}

pub struct DatabaseConfig {
    pub filename: String,
}

pub struct DiscordConfig {
    pub bot_token: String,
    pub board_channel: u64,
    pub log_channel: u64,
    pub temperature_channel: u64,
    pub mail_channel: u64,
    pub startup_channel: u64,
}

pub struct ReservationConfig {
    /// 管理者の Discord ユーザー ID。全予約の編集・削除と全削除コマンドを許可する。
    pub admin_user_id: String,
    /// 開始時刻が過去になる編集を許容するか。既定で許容する。
    pub allow_past_edit: bool,
}

pub struct SwitchBotConfig {
    pub token: String,
    pub secret: String,
    pub device_id: String,
    pub threshold_temp: f64,
}

pub struct GmailConfig {
    pub access_token: String,
    pub watch_subject: String,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_channel(key: &str) -> Result<u64> {
    env_or(key, "0")
        .parse()
        .with_context(|| format!("{key} must be a channel id"))
}
