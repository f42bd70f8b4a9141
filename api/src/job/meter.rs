use async_trait::async_trait;
use chrono::{DateTime, Duration, Local};
use kernel::model::id::ChannelId;
use registry::AppRegistry;
use shared::error::AppResult;
use tokio::sync::Mutex;

use super::Job;

const INTERVAL_MINUTES: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempState {
    Below,
    Above,
}

pub fn classify(temperature: f64, threshold: f64) -> TempState {
    if temperature <= threshold {
        TempState::Below
    } else {
        TempState::Above
    }
}

/// しきい値をまたいだときだけ通知文を返す。初回観測は状態を覚える
/// だけで通知しない。
pub fn transition_message(prev: Option<TempState>, next: TempState, temperature: f64) -> Option<String> {
    match prev {
        None => None,
        Some(p) if p == next => None,
        Some(_) => Some(match next {
            TempState::Below => format!("⚠️現在の温度は{temperature}℃です。"),
            TempState::Above => format!("現在の温度は{temperature}℃です。"),
        }),
    }
}

/// 温湿度計を定期ポーリングし、しきい値をまたいだら通知する。
pub struct MeterWatchJob {
    registry: AppRegistry,
    state: Mutex<Option<TempState>>,
}

impl MeterWatchJob {
    pub fn new(registry: AppRegistry) -> Self {
        Self {
            registry,
            state: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Job for MeterWatchJob {
    fn name(&self) -> &'static str {
        "meter_watch"
    }

    fn next_fire(&self, now: DateTime<Local>) -> DateTime<Local> {
        now + Duration::minutes(INTERVAL_MINUTES)
    }

    async fn run(&self) -> AppResult<()> {
        let status = self.registry.meter().status().await?;
        let threshold = self.registry.config().switchbot.threshold_temp;
        let next = classify(status.temperature, threshold);
        let message = {
            let mut state = self.state.lock().await;
            let message = transition_message(*state, next, status.temperature);
            if state.is_none() {
                tracing::info!(temperature = status.temperature, "温度の初回観測");
            }
            *state = Some(next);
            message
        };
        if let Some(message) = message {
            self.registry
                .chat()
                .send(
                    ChannelId::new(self.registry.config().discord.temperature_channel),
                    &message,
                    None,
                )
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_itself_counts_as_below() {
        assert_eq!(classify(5.0, 5.0), TempState::Below);
        assert_eq!(classify(5.1, 5.0), TempState::Above);
    }

    #[test]
    fn first_observation_is_silent() {
        assert_eq!(transition_message(None, TempState::Below, 3.0), None);
    }

    #[test]
    fn crossing_down_warns() {
        let message = transition_message(Some(TempState::Above), TempState::Below, 4.5);
        assert_eq!(message.as_deref(), Some("⚠️現在の温度は4.5℃です。"));
    }

    #[test]
    fn crossing_up_notifies_without_warning_mark() {
        let message = transition_message(Some(TempState::Below), TempState::Above, 6.2);
        assert_eq!(message.as_deref(), Some("現在の温度は6.2℃です。"));
    }

    #[test]
    fn staying_on_one_side_is_silent() {
        assert_eq!(
            transition_message(Some(TempState::Below), TempState::Below, 2.0),
            None
        );
        assert_eq!(
            transition_message(Some(TempState::Above), TempState::Above, 20.0),
            None
        );
    }
}
