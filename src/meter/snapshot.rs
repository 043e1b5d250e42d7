//! Point-in-time meter values for exporters.

use serde::{Deserialize, Serialize};

/// Values read from a meter at one instant.
///
/// Field names follow the usual metrics exposition convention
/// (`oneMinRate`, `meanRate`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterSnapshot {
    /// Total events recorded
    pub count: u64,
    /// Events per second since creation
    #[serde(rename = "meanRate")]
    pub mean_rate: f64,
    /// One minute moving average
    #[serde(rename = "oneMinRate")]
    pub one_minute_rate: f64,
    /// Five minute moving average
    #[serde(rename = "fiveMinRate")]
    pub five_minute_rate: f64,
    /// Fifteen minute moving average
    #[serde(rename = "fifteenMinRate")]
    pub fifteen_minute_rate: f64,
    /// What is being counted
    pub unit: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_field_names() {
        let snapshot = MeterSnapshot {
            count: 12,
            mean_rate: 0.5,
            one_minute_rate: 1.5,
            five_minute_rate: 1.25,
            fifteen_minute_rate: 1.0,
            unit: "requests".to_string(),
        };

        let value = serde_json::to_value(&snapshot).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), 6);
        assert_eq!(object["count"], 12);
        assert_eq!(object["meanRate"], 0.5);
        assert_eq!(object["oneMinRate"], 1.5);
        assert_eq!(object["fiveMinRate"], 1.25);
        assert_eq!(object["fifteenMinRate"], 1.0);
        assert_eq!(object["unit"], "requests");
    }

    #[test]
    fn test_parse_exported_document() {
        let json = r#"{"count":3,"meanRate":0.0,"oneMinRate":0.6,"fiveMinRate":0.6,"fifteenMinRate":0.6,"unit":"jobs"}"#;
        let snapshot: MeterSnapshot = serde_json::from_str(json).unwrap();

        assert_eq!(snapshot.count, 3);
        assert_eq!(snapshot.one_minute_rate, 0.6);
        assert_eq!(snapshot.unit, "jobs");
    }
}
