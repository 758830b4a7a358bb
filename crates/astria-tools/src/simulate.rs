//! Simulation helpers shared by the tools

use std::time::Duration;

use astria_core::{AgentError, Result, tool::ToolArgs};
use chrono::{SecondsFormat, Utc};

/// Delay before every simulated tool produces its result
pub const SIMULATED_LATENCY: Duration = Duration::from_millis(1500);

/// Wait as long as a real integration would
pub async fn latency() {
    tokio::time::sleep(SIMULATED_LATENCY).await;
}

/// `<prefix>_<unix millis>`
pub fn stamp_id(prefix: &str) -> String {
    format!("{prefix}_{}", Utc::now().timestamp_millis())
}

/// Current time as an ISO 8601 string with millisecond precision
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Required string argument
pub fn str_arg<'a>(args: &'a ToolArgs, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| AgentError::ToolValidation(format!("Missing required parameter: {key}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stamp_id() {
        let id = stamp_id("email");
        assert!(id.starts_with("email_"));
        assert!(id["email_".len()..].parse::<i64>().is_ok());
    }

    #[test]
    fn test_str_arg() {
        let args = json!({"a": "x", "b": 1}).as_object().cloned().unwrap();
        assert_eq!(str_arg(&args, "a").unwrap(), "x");
        assert!(str_arg(&args, "b").is_err());
        assert!(str_arg(&args, "c").is_err());
    }
}
