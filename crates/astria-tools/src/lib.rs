//! # astria-tools
//!
//! Simulated automation tools for the ASTRIA agent.
//!
//! None of these tools talk to a real service. Each one waits a fixed
//! [`SIMULATED_LATENCY`](simulate::SIMULATED_LATENCY) and then fabricates a
//! plausible result, so the interface can exercise its pending state.
//!
//! ```text
//! ┌──────────────────┬──────────────────────────────────────────┐
//! │ send_email       │ recipient, subject, body                 │
//! │ schedule_meeting │ title, startTime, participants?, duration│
//! │ save_note        │ content, title?, tags?                   │
//! │ get_weather      │ location                                 │
//! └──────────────────┴──────────────────────────────────────────┘
//! ```

pub mod simulate;
pub mod svckit;

use astria_core::ToolRegistry;

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::{GetWeatherTool, SaveNoteTool, ScheduleMeetingTool, SendEmailTool};
}

/// Registry holding every simulated tool, in the order advertised to the model
pub fn registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(tools::SendEmailTool);
    registry.register(tools::ScheduleMeetingTool);
    registry.register(tools::SaveNoteTool);
    registry.register(tools::GetWeatherTool);
    registry
}

/// First message of every conversation
pub const WELCOME_MESSAGE: &str = "I am ASTRIA, your automation engine. I can send emails, schedule meetings, save notes, and search the web. How can I assist you today?";

/// System instruction for the ASTRIA agent
pub const ASTRIA_SYSTEM_PROMPT: &str = r#"You are ASTRIA, an advanced Automation & Tool-Calling AI Agent.

Your primary objective is to understand user requests, convert them into structured actions, and execute them using available tools. Always use the most appropriate tool when the task requires external data, calculations, actions, or formatting.

## Core Behavior

1. **Think, decide, act**
   - Analyze the request and determine the intention.
   - If a tool is needed, call it immediately with structured JSON arguments.
   - If no tool is appropriate, respond clearly and directly.

2. **Tool calling protocol**
   - Use tools ONLY when required.
   - Arguments must be clean JSON.
   - If required input is missing, ask the user for it.

3. **Actions available**
   - Sending emails (`send_email`)
   - Scheduling meetings (`schedule_meeting`)
   - Saving notes (`save_note`)
   - Getting weather (`get_weather`)
   - Web search (search grounding)

4. **Output**
   - If you use a tool, output the tool call.
   - Otherwise respond in helpful, professional, plain language.
   - Be concise, structured, and reliable. Stay task-oriented."#;
