//! Schedule Meeting Tool

use async_trait::async_trait;
use serde_json::{Value, json};

use astria_core::{
    Result as CoreResult, Tool, ToolDeclaration,
    tool::{ParamType, ParameterSchema, ToolArgs},
};

use crate::simulate;

/// Pretends to put an event on a calendar
pub struct ScheduleMeetingTool;

#[async_trait]
impl Tool for ScheduleMeetingTool {
    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: "schedule_meeting".into(),
            description: "Schedule a calendar meeting or event.".into(),
            parameters: vec![
                ParameterSchema::required("title", ParamType::String, "Title of the meeting"),
                ParameterSchema::optional(
                    "participants",
                    ParamType::Array(Box::new(ParamType::String)),
                    "List of email addresses or names of participants",
                ),
                ParameterSchema::required(
                    "startTime",
                    ParamType::String,
                    "ISO 8601 date-time string for when the meeting starts (e.g., 2023-10-27T10:00:00)",
                ),
                ParameterSchema::optional(
                    "durationMinutes",
                    ParamType::Number,
                    "Duration of the meeting in minutes",
                ),
            ],
        }
    }

    async fn execute(&self, args: &ToolArgs) -> CoreResult<Value> {
        let title = simulate::str_arg(args, "title")?;
        let start_time = simulate::str_arg(args, "startTime")?;
        let attendees = args
            .get("participants")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);

        simulate::latency().await;

        tracing::info!(%title, %start_time, attendees, "Simulated meeting scheduled");
        Ok(json!({
            "status": "success",
            "id": simulate::stamp_id("cal"),
            "message": format!("Meeting '{title}' scheduled."),
            "details": {
                "time": start_time,
                "attendees": attendees,
            },
        }))
    }
}
