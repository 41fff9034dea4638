//! The `call_services` tool offered to the orchestration model

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{Error, Result};
use crate::intent::Category;
use crate::llm::ToolDefinition;

pub const CALL_SERVICES: &str = "call_services";

/// One requested call: which agent, and what to ask it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceContext {
    /// Agent name, e.g. `order_query_agent`
    pub service: String,
    /// Message for that agent
    pub msg: String,
}

impl ServiceContext {
    pub fn new(service: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            msg: msg.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallServicesArgs {
    pub service_ctx: Vec<ServiceContext>,
}

/// Tool schema; `service` is constrained to the known agent names
pub fn call_services_tool() -> ToolDefinition {
    let services: Vec<&str> = Category::ALL.iter().map(Category::as_str).collect();
    ToolDefinition::function(
        CALL_SERVICES,
        "Call one or more customer-service agents and return their combined answers. \
         Several agents may be called at once for a more complete answer.",
        json!({
            "type": "object",
            "properties": {
                "service_ctx": {
                    "type": "array",
                    "description": "Calls to make, one entry per agent request",
                    "items": {
                        "type": "object",
                        "properties": {
                            "service": {
                                "type": "string",
                                "enum": services,
                                "description": "Service name"
                            },
                            "msg": {
                                "type": "string",
                                "description": "Specific message for the service"
                            }
                        },
                        "required": ["service", "msg"]
                    }
                }
            },
            "required": ["service_ctx"]
        }),
    )
}

/// Decode the model's JSON arguments for `call_services`
pub fn parse_call_services(arguments: &str) -> Result<Vec<ServiceContext>> {
    let args: CallServicesArgs = serde_json::from_str(arguments).map_err(|e| {
        Error::ReasoningOutput(format!("Invalid {} arguments: {}", CALL_SERVICES, e))
    })?;
    Ok(args.service_ctx)
}
