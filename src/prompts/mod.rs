//! Static prompt templates for ticket work.
//!
//! Prompts only embed their arguments into text; they never call Zendesk
//! and need no credential.

use rmcp::model::{
    GetPromptResult, JsonObject, ListPromptsResult, Prompt as McpPrompt,
    PromptArgument as McpPromptArgument, PromptMessage, PromptMessageRole,
};
use serde_json::Value;

/// Error types for prompt operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    /// Prompt name not found.
    NotFound(String),
    /// Missing or malformed arguments.
    InvalidArguments(String),
}

impl std::fmt::Display for PromptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PromptError::NotFound(name) => write!(f, "Prompt not found: {}", name),
            PromptError::InvalidArguments(msg) => write!(f, "Invalid arguments: {}", msg),
        }
    }
}

impl std::error::Error for PromptError {}

struct TicketPrompt {
    name: &'static str,
    description: &'static str,
    render: fn(u64) -> String,
}

const PROMPTS: [TicketPrompt; 2] = [
    TicketPrompt {
        name: "analyze_ticket",
        description: "Analyze a Zendesk ticket and provide insights",
        render: analyze_ticket,
    },
    TicketPrompt {
        name: "draft_ticket_response",
        description: "Draft a professional response to a Zendesk ticket",
        render: draft_ticket_response,
    },
];

fn analyze_ticket(ticket_id: u64) -> String {
    format!(
        "You are a helpful Zendesk support analyst. You've been asked to analyze ticket #{ticket_id}.

Please fetch the ticket info and comments to analyze it and provide:
1. A summary of the issue
2. The current status and timeline
3. Key points of interaction

Remember to be professional and focus on actionable insights."
    )
}

fn draft_ticket_response(ticket_id: u64) -> String {
    format!(
        "You are a helpful Zendesk support agent. You need to draft a response to ticket #{ticket_id}.

Please fetch the ticket info, comments and knowledge base to draft a professional and helpful response that:
1. Acknowledges the customer's concern
2. Addresses the specific issues raised
3. Provides clear next steps or asks for the specific details needed to proceed
4. Maintains a friendly and professional tone
5. Asks for confirmation before commenting on the ticket

The response should be formatted well and ready to be posted as a comment."
    )
}

/// Prompts advertised in `prompts/list`.
pub fn list_prompts() -> ListPromptsResult {
    let prompts = PROMPTS
        .iter()
        .map(|p| McpPrompt {
            name: p.name.into(),
            title: None,
            description: Some(p.description.into()),
            arguments: Some(vec![McpPromptArgument {
                name: "ticket_id".to_string(),
                title: None,
                description: Some("The ID of the ticket".to_string()),
                required: Some(true),
            }]),
            icons: None,
            meta: None,
        })
        .collect();

    ListPromptsResult {
        meta: None,
        prompts,
        next_cursor: None,
    }
}

/// Render the prompt `name` for the given arguments.
pub fn get_prompt(name: &str, arguments: Option<JsonObject>) -> Result<GetPromptResult, PromptError> {
    let prompt = PROMPTS
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| PromptError::NotFound(name.to_string()))?;

    let ticket_id = ticket_id_argument(arguments.as_ref())?;

    Ok(GetPromptResult {
        description: Some(prompt.description.to_string()),
        messages: vec![PromptMessage::new_text(
            PromptMessageRole::User,
            (prompt.render)(ticket_id),
        )],
    })
}

/// Prompt arguments arrive as strings on the wire; JSON numbers are
/// accepted too.
fn ticket_id_argument(arguments: Option<&JsonObject>) -> Result<u64, PromptError> {
    let value = arguments
        .and_then(|args| args.get("ticket_id"))
        .ok_or_else(|| PromptError::InvalidArguments("missing required argument 'ticket_id'".to_string()))?;

    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| PromptError::InvalidArguments("'ticket_id' must be an integer".to_string()))
}
