//! Tool System
//!
//! Declarations advertised to the model, the records tracking each requested
//! invocation, and the registry that dispatches invocations to tools.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AgentError, Result};

/// Argument mapping passed to a tool
pub type ToolArgs = Map<String, Value>;

/// Tool invocation requested by the model
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Call ID issued by the provider, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Tool identifier
    pub name: String,

    /// Arguments as key-value pairs
    #[serde(default)]
    pub args: ToolArgs,
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>, args: ToolArgs) -> Self {
        Self {
            id: None,
            name: name.into(),
            args,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Lifecycle state of a tool call
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Pending,
    Success,
    Error,
}

impl ToolStatus {
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One tool call attached to an assistant message.
///
/// A record starts `Pending` and settles exactly once. After that the
/// status and result no longer change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    id: String,
    name: String,
    args: ToolArgs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    status: ToolStatus,
}

impl ToolCallRecord {
    /// Create a pending record for an invocation
    pub fn pending(id: impl Into<String>, invocation: &ToolInvocation) -> Self {
        Self {
            id: id.into(),
            name: invocation.name.clone(),
            args: invocation.args.clone(),
            result: None,
            status: ToolStatus::Pending,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn args(&self) -> &ToolArgs {
        &self.args
    }

    pub const fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub const fn status(&self) -> ToolStatus {
        self.status
    }

    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Error text of a failed record
    pub fn error_message(&self) -> Option<&str> {
        if self.status != ToolStatus::Error {
            return None;
        }
        self.result.as_ref()?.get("error")?.as_str()
    }

    /// Settle as successful with the tool's output
    pub fn succeed(&mut self, result: Value) -> Result<()> {
        self.settle(ToolStatus::Success, result)
    }

    /// Settle as failed; the result becomes `{"error": message}`
    pub fn fail(&mut self, message: impl Into<String>) -> Result<()> {
        self.settle(ToolStatus::Error, json!({ "error": message.into() }))
    }

    fn settle(&mut self, status: ToolStatus, result: Value) -> Result<()> {
        if self.is_terminal() {
            return Err(AgentError::InvalidState(format!(
                "tool call {} already settled as {}",
                self.id, self.status
            )));
        }
        self.status = status;
        self.result = Some(result);
        Ok(())
    }
}

/// Parameter value type
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type", content = "items")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    Array(Box<ParamType>),
    Object,
}

impl ParamType {
    /// JSON Schema type name
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array(_) => "array",
            Self::Object => "object",
        }
    }

    /// JSON Schema fragment for this type
    pub fn json_schema(&self) -> Value {
        match self {
            Self::Array(items) => json!({ "type": "array", "items": items.json_schema() }),
            other => json!({ "type": other.type_name() }),
        }
    }

    /// Whether a JSON value conforms to this type
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Array(items) => value
                .as_array()
                .is_some_and(|values| values.iter().all(|v| items.accepts(v))),
            Self::Object => value.is_object(),
        }
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// Value type
    #[serde(flatten)]
    pub param_type: ParamType,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,
}

impl ParameterSchema {
    pub fn required(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: description.into(),
            required: true,
        }
    }

    pub fn optional(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }
}

/// Tool declaration advertised to the model
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to the model)
    pub description: String,

    /// Parameter definitions, in declaration order
    pub parameters: Vec<ParameterSchema>,
}

impl ToolDeclaration {
    /// Object schema: `{type, properties, required}`
    pub fn parameters_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.parameters {
            let mut schema = param.param_type.json_schema();
            if let Some(obj) = schema.as_object_mut() {
                obj.insert("description".into(), Value::String(param.description.clone()));
            }
            properties.insert(param.name.clone(), schema);
        }

        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Check arguments against the declared parameters
    pub fn validate(&self, args: &ToolArgs) -> Result<()> {
        for param in &self.parameters {
            match args.get(&param.name) {
                None | Some(Value::Null) if param.required => {
                    return Err(AgentError::ToolValidation(format!(
                        "Missing required parameter: {}",
                        param.name
                    )));
                }
                Some(value) if !value.is_null() && !param.param_type.accepts(value) => {
                    return Err(AgentError::ToolValidation(format!(
                        "Parameter '{}' must be of type {}",
                        param.name,
                        param.param_type.type_name()
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Declaration advertised to the model
    fn declaration(&self) -> ToolDeclaration;

    /// Execute the tool with given arguments
    async fn execute(&self, args: &ToolArgs) -> Result<Value>;

    /// Validate arguments before execution
    fn validate(&self, args: &ToolArgs) -> Result<()> {
        self.declaration().validate(args)
    }
}

/// Registry for available tools, in registration order
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool; a tool with the same name is replaced in place
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_boxed(Arc::new(tool));
    }

    /// Register a shared tool
    pub fn register_boxed(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.declaration().name;
        if let Some(&slot) = self.index.get(&name) {
            self.tools[slot] = tool;
        } else {
            self.index.insert(name, self.tools.len());
            self.tools.push(tool);
        }
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&slot| self.tools[slot].clone())
    }

    /// Declarations exposed to the model
    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.tools.iter().map(|t| t.declaration()).collect()
    }

    /// Execute a tool by name.
    ///
    /// An unknown name yields a structured `{"error": ...}` result rather
    /// than an error so the caller can always attach something to the record.
    pub async fn execute(&self, name: &str, args: &ToolArgs) -> Result<Value> {
        let Some(tool) = self.get(name) else {
            tracing::warn!(tool = %name, "Tool not registered");
            return Ok(json!({ "error": format!("Tool {name} not found locally.") }));
        };

        tool.validate(args)?;
        tool.execute(args).await
    }

    /// Get tool names
    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.declaration().name).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry").field("tools", &self.names()).finish()
    }
}
