//! Service Kit - Agent Tools
//!
//! Simulated tools that implement `astria_core::Tool`.

mod email;
mod meeting;
mod note;
mod weather;

pub use email::SendEmailTool;
pub use meeting::ScheduleMeetingTool;
pub use note::SaveNoteTool;
pub use weather::GetWeatherTool;
