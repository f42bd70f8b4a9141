use kernel::model::meter::MeterStatus;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterStatusResponse {
    pub temperature: f64,
    pub humidity: f64,
    pub battery: f64,
}

impl From<MeterStatus> for MeterStatusResponse {
    fn from(value: MeterStatus) -> Self {
        Self {
            temperature: value.temperature,
            humidity: value.humidity,
            battery: value.battery,
        }
    }
}
