//! Credential-injecting tool wrapper.
//!
//! A ticket tool is declared as a handler taking a ticketing client plus
//! its own parameters. [`with_zendesk_client`] turns it into a
//! [`ToolHandler`] whose visible parameters are the handler's minus the
//! client; the client is built from the active auth context on every call.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use rmcp::model::JsonObject;
use serde_json::{Map, Value, json};

use crate::tools::{ToolError, ToolFuture, ToolHandler};
use crate::zendesk::{ClientFactory, TicketingApi, factory};

/// Parameter name reserved for the injected client.
const CLIENT_PARAM: &str = "client";

/// JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Integer,
    String,
    Boolean,
}

impl ParamKind {
    fn schema_type(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::String => "string",
            Self::Boolean => "boolean",
        }
    }

    /// Check `value` against this kind, accepting the lax string forms
    /// `"42"` and `"true"` that some clients send.
    fn coerce(self, value: Value) -> Option<Value> {
        match (self, value) {
            (Self::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => Some(Value::Number(n)),
            (Self::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
            (Self::String, v @ Value::String(_)) => Some(v),
            (Self::Boolean, v @ Value::Bool(_)) => Some(v),
            (Self::Boolean, Value::String(s)) => match s.as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        }
    }
}

/// One declared handler parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub description: String,
    pub default: Option<Value>,
}

impl ParamSpec {
    pub fn required(name: &str, kind: ParamKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            description: description.to_string(),
            default: None,
        }
    }

    pub fn optional(name: &str, kind: ParamKind, description: &str, default: Value) -> Self {
        Self {
            default: Some(default),
            ..Self::required(name, kind, description)
        }
    }
}

/// The visible parameter list of a wrapped handler.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    params: Vec<ParamSpec>,
}

impl Signature {
    /// Validate a parameter list.
    ///
    /// Rejects a parameter named `client`, duplicate names, a required
    /// parameter after an optional one, and defaults of the wrong type.
    pub fn new(params: Vec<ParamSpec>) -> Result<Self, ToolError> {
        let mut seen = HashSet::new();
        let mut saw_optional = false;

        for param in &params {
            if param.name.is_empty() {
                return Err(ToolError::InvalidHandlerShape(
                    "parameter names must not be empty".to_string(),
                ));
            }
            if param.name == CLIENT_PARAM {
                return Err(ToolError::InvalidHandlerShape(format!(
                    "'{}' is injected and cannot be declared as a parameter",
                    CLIENT_PARAM
                )));
            }
            if !seen.insert(param.name.as_str()) {
                return Err(ToolError::InvalidHandlerShape(format!(
                    "duplicate parameter '{}'",
                    param.name
                )));
            }
            match &param.default {
                Some(default) => {
                    if param.kind.coerce(default.clone()).as_ref() != Some(default) {
                        return Err(ToolError::InvalidHandlerShape(format!(
                            "default for '{}' is not a {}",
                            param.name,
                            param.kind.schema_type()
                        )));
                    }
                    saw_optional = true;
                }
                None if saw_optional => {
                    return Err(ToolError::InvalidHandlerShape(format!(
                        "required parameter '{}' follows an optional one",
                        param.name
                    )));
                }
                None => {}
            }
        }

        Ok(Self { params })
    }

    /// JSON Schema advertised in `tools/list`.
    pub fn input_schema(&self) -> JsonObject {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &self.params {
            let mut prop = Map::new();
            prop.insert("type".to_string(), json!(param.kind.schema_type()));
            prop.insert("description".to_string(), json!(param.description));
            match &param.default {
                Some(default) => {
                    prop.insert("default".to_string(), default.clone());
                }
                None => required.push(json!(param.name)),
            }
            properties.insert(param.name.clone(), Value::Object(prop));
        }

        let mut schema = JsonObject::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), Value::Object(properties));
        schema.insert("required".to_string(), Value::Array(required));
        schema
    }

    /// Match call arguments to parameters, filling defaults.
    ///
    /// An explicit `null` counts as omitted.
    pub fn bind(&self, mut args: JsonObject) -> Result<BoundArgs, ToolError> {
        let mut values = Map::new();

        for param in &self.params {
            let value = match args.remove(&param.name) {
                Some(Value::Null) | None => match &param.default {
                    Some(default) => default.clone(),
                    None => {
                        return Err(ToolError::InvalidArguments(format!(
                            "missing required argument '{}'",
                            param.name
                        )));
                    }
                },
                Some(value) => param.kind.coerce(value).ok_or_else(|| {
                    ToolError::InvalidArguments(format!(
                        "'{}' must be {} {}",
                        param.name,
                        if param.kind == ParamKind::Integer { "an" } else { "a" },
                        param.kind.schema_type()
                    ))
                })?,
            };
            values.insert(param.name.clone(), value);
        }

        if let Some(unknown) = args.keys().next() {
            return Err(ToolError::InvalidArguments(format!(
                "unexpected argument '{}'",
                unknown
            )));
        }

        Ok(BoundArgs { values })
    }
}

/// Call arguments after binding; every declared parameter has a value.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundArgs {
    values: Map<String, Value>,
}

impl BoundArgs {
    pub fn u64(&self, name: &str) -> Result<u64, ToolError> {
        self.values
            .get(name)
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                ToolError::InvalidArguments(format!("'{}' must be a non-negative integer", name))
            })
    }

    pub fn usize(&self, name: &str) -> Result<usize, ToolError> {
        let value = self.u64(name)?;
        usize::try_from(value)
            .map_err(|_| ToolError::InvalidArguments(format!("'{}' is too large", name)))
    }

    pub fn str(&self, name: &str) -> Result<&str, ToolError> {
        self.values
            .get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments(format!("'{}' must be a string", name)))
    }

    pub fn bool(&self, name: &str) -> Result<bool, ToolError> {
        self.values
            .get(name)
            .and_then(Value::as_bool)
            .ok_or_else(|| ToolError::InvalidArguments(format!("'{}' must be a boolean", name)))
    }
}

type ClientHandlerFuture = Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send>>;
type ClientHandler =
    Arc<dyn Fn(Arc<dyn TicketingApi>, BoundArgs) -> ClientHandlerFuture + Send + Sync>;

/// A tool whose handler receives a per-call ticketing client.
pub struct ClientInjectedTool {
    name: String,
    description: String,
    signature: Signature,
    factory: Arc<dyn ClientFactory>,
    handler: ClientHandler,
}

/// Wrap `handler` so callers never supply the client.
///
/// On every call the arguments are bound against `params`, a client is
/// built for the active auth context via `factory`, and `handler` runs with
/// both. Errors from any step reach the caller unchanged.
pub fn with_zendesk_client<F, Fut>(
    name: &str,
    description: &str,
    params: Vec<ParamSpec>,
    factory: Arc<dyn ClientFactory>,
    handler: F,
) -> Result<ClientInjectedTool, ToolError>
where
    F: Fn(Arc<dyn TicketingApi>, BoundArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
{
    if name.is_empty() {
        return Err(ToolError::InvalidHandlerShape(
            "tool name must not be empty".to_string(),
        ));
    }
    let signature = Signature::new(params)?;

    Ok(ClientInjectedTool {
        name: name.to_string(),
        description: description.to_string(),
        signature,
        factory,
        handler: Arc::new(move |client: Arc<dyn TicketingApi>, args: BoundArgs| {
            Box::pin(handler(client, args)) as ClientHandlerFuture
        }),
    })
}

impl ToolHandler for ClientInjectedTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> JsonObject {
        self.signature.input_schema()
    }

    fn execute(&self, args: JsonObject) -> ToolFuture<'_> {
        Box::pin(async move {
            let bound = self.signature.bind(args)?;
            let client = factory::build(self.factory.as_ref())?;
            (self.handler)(client, bound).await
        })
    }
}
