use serde::Deserialize;

/// 温湿度計のステータス。
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MeterStatus {
    pub temperature: f64,
    pub humidity: f64,
    pub battery: f64,
}
