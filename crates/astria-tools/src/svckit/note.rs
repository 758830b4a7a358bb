//! Save Note Tool

use async_trait::async_trait;
use serde_json::{Value, json};

use astria_core::{
    Result as CoreResult, Tool, ToolDeclaration,
    tool::{ParamType, ParameterSchema, ToolArgs},
};

use crate::simulate;

const PREVIEW_CHARS: usize = 50;

/// Pretends to store a note
pub struct SaveNoteTool;

/// First characters of the note followed by an ellipsis
fn preview(content: &str) -> String {
    let head: String = content.chars().take(PREVIEW_CHARS).collect();
    format!("{head}...")
}

#[async_trait]
impl Tool for SaveNoteTool {
    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: "save_note".into(),
            description: "Save a text note to the user's personal storage or memory.".into(),
            parameters: vec![
                ParameterSchema::optional("title", ParamType::String, "Title of the note"),
                ParameterSchema::required("content", ParamType::String, "Body text of the note"),
                ParameterSchema::optional(
                    "tags",
                    ParamType::Array(Box::new(ParamType::String)),
                    "Optional tags for categorization",
                ),
            ],
        }
    }

    async fn execute(&self, args: &ToolArgs) -> CoreResult<Value> {
        let content = simulate::str_arg(args, "content")?;
        simulate::latency().await;

        Ok(json!({
            "status": "success",
            "id": simulate::stamp_id("note"),
            "savedAt": simulate::now_iso(),
            "preview": preview(content),
        }))
    }
}
