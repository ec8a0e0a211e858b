use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};
use domain::services::{Capability, CapabilitySource};
use serde_json::{json, Value};
use shared::types::JsonMap;

pub struct TimeSource;

impl CapabilitySource for TimeSource {
    fn source_name(&self) -> &str {
        "time"
    }

    fn capabilities(&self) -> Vec<Box<dyn Capability>> {
        vec![Box::new(GetCurrentTime), Box::new(GetTimestamp)]
    }
}

pub struct GetCurrentTime;

#[async_trait]
impl Capability for GetCurrentTime {
    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Get the current time and date in multiple formats (time, date, day and a full sentence)"
    }

    async fn invoke(&self, _args: JsonMap) -> anyhow::Result<Value> {
        Ok(describe_time(&Local::now()))
    }
}

pub struct GetTimestamp;

#[async_trait]
impl Capability for GetTimestamp {
    fn name(&self) -> &str {
        "get_timestamp"
    }

    fn description(&self) -> &str {
        "Get the current Unix timestamp"
    }

    async fn invoke(&self, _args: JsonMap) -> anyhow::Result<Value> {
        Ok(json!({
            "timestamp": Local::now().timestamp(),
            "description": "Seconds since January 1, 1970 00:00:00 UTC",
        }))
    }
}

fn describe_time<Tz: TimeZone>(now: &DateTime<Tz>) -> Value
where
    Tz::Offset: std::fmt::Display,
{
    json!({
        "time": now.format("%I:%M %p").to_string(),
        "date": now.format("%A, %B %d, %Y").to_string(),
        "day": now.format("%A").to_string(),
        "full": now.format("%I:%M %p on %A, %B %d, %Y").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_time_formats() {
        let at = Utc.with_ymd_and_hms(2025, 11, 12, 22, 45, 0).unwrap();
        let value = describe_time(&at);
        assert_eq!(value["time"], "10:45 PM");
        assert_eq!(value["date"], "Wednesday, November 12, 2025");
        assert_eq!(value["day"], "Wednesday");
        assert_eq!(value["full"], "10:45 PM on Wednesday, November 12, 2025");
    }

    #[tokio::test]
    async fn test_timestamp_is_positive() {
        let value = GetTimestamp.invoke(JsonMap::new()).await.unwrap();
        assert!(value["timestamp"].as_i64().unwrap() > 1_600_000_000);
    }
}
