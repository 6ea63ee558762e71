//! Ticket and user tools.

use std::sync::Arc;

use serde_json::json;

use crate::tools::{BoundArgs, ParamKind, ParamSpec, ToolError, ToolRegistry, with_zendesk_client};
use crate::zendesk::{ClientFactory, TicketingApi};

const DEFAULT_LIMIT: u64 = 25;

/// Register the six ticketing tools, each resolving its client via `factory`.
pub fn register_tools(
    registry: ToolRegistry,
    factory: Arc<dyn ClientFactory>,
) -> Result<ToolRegistry, ToolError> {
    let ticket_id = || ParamSpec::required("ticket_id", ParamKind::Integer, "The ID of the ticket");
    let limit = || {
        ParamSpec::optional(
            "limit",
            ParamKind::Integer,
            "Maximum number of tickets to return",
            json!(DEFAULT_LIMIT),
        )
    };

    let registry = registry
        .register_handler(with_zendesk_client(
            "get_ticket",
            "Retrieve a Zendesk ticket by its ID",
            vec![ticket_id()],
            factory.clone(),
            get_ticket,
        )?)
        .register_handler(with_zendesk_client(
            "get_ticket_comments",
            "Retrieve all comments for a Zendesk ticket by its ID",
            vec![ticket_id()],
            factory.clone(),
            get_ticket_comments,
        )?)
        .register_handler(with_zendesk_client(
            "create_ticket_comment",
            "Create a new comment on an existing Zendesk ticket",
            vec![
                ticket_id(),
                ParamSpec::required("comment", ParamKind::String, "The comment text/content to add"),
                ParamSpec::optional(
                    "public",
                    ParamKind::Boolean,
                    "Whether the comment should be public",
                    json!(true),
                ),
            ],
            factory.clone(),
            create_ticket_comment,
        )?)
        .register_handler(with_zendesk_client(
            "get_recent_tickets",
            "Retrieve the most recently created Zendesk tickets",
            vec![limit()],
            factory.clone(),
            get_recent_tickets,
        )?)
        .register_handler(with_zendesk_client(
            "search_tickets",
            "Search Zendesk tickets using Zendesk search syntax",
            vec![
                ParamSpec::required(
                    "query",
                    ParamKind::String,
                    "Search query, e.g. 'status:open priority:high'",
                ),
                limit(),
            ],
            factory.clone(),
            search_tickets,
        )?)
        .register_handler(with_zendesk_client(
            "get_user",
            "Retrieve a Zendesk user by their ID",
            vec![ParamSpec::required("user_id", ParamKind::Integer, "The ID of the user")],
            factory,
            get_user,
        )?);

    Ok(registry)
}

async fn get_ticket(client: Arc<dyn TicketingApi>, args: BoundArgs) -> Result<String, ToolError> {
    let ticket = client.get_ticket(args.u64("ticket_id")?).await?;
    Ok(serde_json::to_string(&ticket)?)
}

async fn get_ticket_comments(
    client: Arc<dyn TicketingApi>,
    args: BoundArgs,
) -> Result<String, ToolError> {
    let comments = client.get_ticket_comments(args.u64("ticket_id")?).await?;
    Ok(serde_json::to_string(&comments)?)
}

async fn create_ticket_comment(
    client: Arc<dyn TicketingApi>,
    args: BoundArgs,
) -> Result<String, ToolError> {
    let ticket_id = args.u64("ticket_id")?;
    let comment = args.str("comment")?.to_string();
    let public = args.bool("public")?;

    let posted = client.post_comment(ticket_id, comment, public).await?;
    Ok(format!("Comment created successfully: {}", posted))
}

async fn get_recent_tickets(
    client: Arc<dyn TicketingApi>,
    args: BoundArgs,
) -> Result<String, ToolError> {
    let tickets = client.get_recent_tickets(args.usize("limit")?).await?;
    Ok(serde_json::to_string(&tickets)?)
}

async fn search_tickets(client: Arc<dyn TicketingApi>, args: BoundArgs) -> Result<String, ToolError> {
    let query = args.str("query")?.to_string();
    let tickets = client.search_tickets(query, args.usize("limit")?).await?;
    Ok(serde_json::to_string(&tickets)?)
}

async fn get_user(client: Arc<dyn TicketingApi>, args: BoundArgs) -> Result<String, ToolError> {
    let user = client.get_user(args.u64("user_id")?).await?;
    Ok(serde_json::to_string(&user)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{self, AuthContext, AuthError};
    use crate::types::{BearerToken, Tenant};
    use crate::zendesk::mock::RecordingFactory;
    use rmcp::model::JsonObject;
    use serde_json::Value;

    fn ctx(token: &str) -> AuthContext {
        AuthContext::new(BearerToken::new(token), Tenant::new("acme")).unwrap()
    }

    fn setup() -> (ToolRegistry, RecordingFactory) {
        let factory = RecordingFactory::default();
        let registry = register_tools(ToolRegistry::new(), Arc::new(factory.clone())).unwrap();
        (registry, factory)
    }

    fn args(value: Value) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    async fn call(registry: &ToolRegistry, name: &str, value: Value) -> Result<String, ToolError> {
        auth::scope(ctx("tok-1"), registry.call_tool(name, args(value))).await
    }

    #[test]
    fn test_registers_six_tools_without_client_param() {
        let (registry, _) = setup();
        assert_eq!(
            registry.list_names(),
            vec![
                "create_ticket_comment",
                "get_recent_tickets",
                "get_ticket",
                "get_ticket_comments",
                "get_user",
                "search_tickets",
            ]
        );

        for tool in registry.list_tools() {
            let properties = tool.input_schema["properties"].as_object().unwrap();
            assert!(!properties.contains_key("client"), "{} exposes client", tool.name);
        }
    }

    #[test]
    fn test_schema_defaults() {
        let (registry, _) = setup();
        let comment = registry.get("create_ticket_comment").unwrap().input_schema();
        assert_eq!(comment["properties"]["public"]["default"], json!(true));
        assert_eq!(comment["required"], json!(["ticket_id", "comment"]));

        let search = registry.get("search_tickets").unwrap().input_schema();
        assert_eq!(search["properties"]["limit"]["default"], json!(25));
        assert_eq!(search["required"], json!(["query"]));
    }

    #[tokio::test]
    async fn test_get_ticket_returns_json() {
        let (registry, factory) = setup();
        let out = call(&registry, "get_ticket", json!({"ticket_id": 42})).await.unwrap();

        let ticket: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(ticket["id"], json!(42));
        assert_eq!(ticket["subject"], json!("ticket 42 for tok-1"));
        assert_eq!(ticket["updated_at"], Value::Null);
        assert_eq!(factory.calls(), vec!["get_ticket:42"]);
    }

    #[tokio::test]
    async fn test_get_ticket_comments() {
        let (registry, _) = setup();
        let out = call(&registry, "get_ticket_comments", json!({"ticket_id": 1}))
            .await
            .unwrap();
        let comments: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(comments[0]["html_body"], json!("<p>hello</p>"));
        assert_eq!(comments[0]["public"], json!(true));
    }

    #[tokio::test]
    async fn test_create_ticket_comment_defaults_public() {
        let (registry, factory) = setup();
        let out = call(
            &registry,
            "create_ticket_comment",
            json!({"ticket_id": 7, "comment": "Thanks!"}),
        )
        .await
        .unwrap();

        assert_eq!(out, "Comment created successfully: Thanks!");
        assert_eq!(factory.calls(), vec!["post_comment:7:true:Thanks!"]);
    }

    #[tokio::test]
    async fn test_create_private_comment() {
        let (registry, factory) = setup();
        call(
            &registry,
            "create_ticket_comment",
            json!({"ticket_id": 7, "comment": "internal", "public": false}),
        )
        .await
        .unwrap();
        assert_eq!(factory.calls(), vec!["post_comment:7:false:internal"]);
    }

    #[tokio::test]
    async fn test_recent_tickets_default_limit() {
        let (registry, factory) = setup();
        let out = call(&registry, "get_recent_tickets", json!({})).await.unwrap();
        let tickets: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(tickets.as_array().unwrap().len(), 3);
        assert_eq!(factory.calls(), vec!["get_recent_tickets:25"]);
    }

    #[tokio::test]
    async fn test_search_prefixes_query() {
        let (registry, factory) = setup();
        call(&registry, "search_tickets", json!({"query": "status:open"}))
            .await
            .unwrap();
        call(
            &registry,
            "search_tickets",
            json!({"query": "type:ticket urgent", "limit": 5}),
        )
        .await
        .unwrap();

        assert_eq!(
            factory.calls(),
            vec![
                "search_tickets:type:ticket status:open:25",
                "search_tickets:type:ticket urgent:5",
            ]
        );
    }

    #[tokio::test]
    async fn test_get_user() {
        let (registry, _) = setup();
        let out = call(&registry, "get_user", json!({"user_id": 5})).await.unwrap();
        let user: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(user["name"], json!("user for tok-1"));
        assert_eq!(user["time_zone"], json!("UTC"));
        assert_eq!(user["phone"], Value::Null);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_tagged() {
        let (registry, factory) = setup();
        factory.fail_with("HTTP 404: RecordNotFound");

        let err = call(&registry, "get_user", json!({"user_id": 9}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to get user 9: HTTP 404: RecordNotFound");
        assert!(matches!(err, ToolError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_tools_require_context() {
        let (registry, factory) = setup();
        let err = registry
            .call_tool("get_ticket", args(json!({"ticket_id": 1})))
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::Auth(AuthError::ContextMissing));
        assert!(factory.calls().is_empty());
    }

    #[tokio::test]
    async fn test_each_call_uses_its_own_credential() {
        let (registry, factory) = setup();
        let a = auth::scope(
            ctx("alice"),
            registry.call_tool("get_ticket", args(json!({"ticket_id": 1}))),
        );
        let b = auth::scope(
            ctx("bob"),
            registry.call_tool("get_ticket", args(json!({"ticket_id": 1}))),
        );
        let (a, b) = tokio::join!(a, b);

        assert!(a.unwrap().contains("for alice"));
        assert!(b.unwrap().contains("for bob"));
        let tokens: Vec<String> = factory
            .contexts()
            .iter()
            .map(|c| c.credential().expose().to_string())
            .collect();
        assert_eq!(tokens.len(), 2);
        assert!(tokens.contains(&"alice".to_string()));
        assert!(tokens.contains(&"bob".to_string()));
    }
}
