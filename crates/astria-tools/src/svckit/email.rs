//! Send Email Tool

use async_trait::async_trait;
use serde_json::{Value, json};

use astria_core::{
    Result as CoreResult, Tool, ToolDeclaration,
    tool::{ParamType, ParameterSchema, ToolArgs},
};

use crate::simulate;

/// Pretends to send an email
pub struct SendEmailTool;

#[async_trait]
impl Tool for SendEmailTool {
    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: "send_email".into(),
            description: "Send an email to a specific recipient with a subject and body.".into(),
            parameters: vec![
                ParameterSchema::required(
                    "recipient",
                    ParamType::String,
                    "Email address of the recipient",
                ),
                ParameterSchema::required(
                    "subject",
                    ParamType::String,
                    "Subject line of the email",
                ),
                ParameterSchema::required("body", ParamType::String, "Content of the email"),
            ],
        }
    }

    async fn execute(&self, args: &ToolArgs) -> CoreResult<Value> {
        let recipient = simulate::str_arg(args, "recipient")?;
        simulate::latency().await;

        tracing::info!(%recipient, "Simulated email sent");
        Ok(json!({
            "status": "success",
            "id": simulate::stamp_id("email"),
            "message": format!("Email sent to {recipient}"),
            "timestamp": simulate::now_iso(),
        }))
    }
}
