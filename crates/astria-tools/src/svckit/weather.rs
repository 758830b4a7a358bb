//! Weather Tool
//!
//! Fabricates a current-conditions report for any location.

use async_trait::async_trait;
use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::{Value, json};

use astria_core::{
    Result as CoreResult, Tool, ToolDeclaration,
    tool::{ParamType, ParameterSchema, ToolArgs},
};

use crate::simulate;

const CONDITIONS: [&str; 4] = ["Sunny", "Cloudy", "Rainy", "Partly Cloudy"];

/// Celsius, half-open
const TEMPERATURE_RANGE: std::ops::Range<i32> = 10..30;

/// Reports made-up weather
pub struct GetWeatherTool;

fn sample() -> (&'static str, i32) {
    let mut rng = rand::thread_rng();
    let condition = CONDITIONS.choose(&mut rng).copied().unwrap_or(CONDITIONS[0]);
    (condition, rng.gen_range(TEMPERATURE_RANGE))
}

#[async_trait]
impl Tool for GetWeatherTool {
    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: "get_weather".into(),
            description: "Get the current weather for a specific location.".into(),
            parameters: vec![ParameterSchema::required(
                "location",
                ParamType::String,
                "City, state, or zip code",
            )],
        }
    }

    async fn execute(&self, args: &ToolArgs) -> CoreResult<Value> {
        let location = simulate::str_arg(args, "location")?;
        simulate::latency().await;

        let (condition, temperature) = sample();
        Ok(json!({
            "location": location,
            "temperature": format!("{temperature}°C"),
            "condition": condition,
            "humidity": "45%",
            "wind": "12 km/h NW",
        }))
    }
}
