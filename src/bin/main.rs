use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;
use zendesk_mcp_server::{AuthContext, BearerToken, ServerConfig, create_server};

// rmcp imports for MCP stdio server mode
use rmcp::service::ServiceExt;
use rmcp::transport::stdio;

#[derive(Parser)]
#[command(name = "zendesk-mcp-server")]
#[command(about = "Multi-user Zendesk MCP gateway")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run as an MCP HTTP server; each request carries its own Zendesk token
    McpHttp {
        /// Bind address, e.g. 0.0.0.0:8000
        #[arg(long, env = "ZENDESK_MCP_BIND", default_value = "0.0.0.0:8000")]
        bind: String,
        #[command(flatten)]
        zendesk: ZendeskArgs,
    },
    /// Run as an MCP stdio server for a single user (for use in mcp.json)
    McpStdio {
        /// OAuth token used for every call in this session
        #[arg(long, env = "ZENDESK_OAUTH_TOKEN", hide_env_values = true)]
        oauth_token: String,
        #[command(flatten)]
        zendesk: ZendeskArgs,
    },
}

#[derive(Args)]
struct ZendeskArgs {
    /// Zendesk subdomain, e.g. "acme" for acme.zendesk.com
    #[arg(long, env = "ZENDESK_SUBDOMAIN")]
    subdomain: Option<String>,
    /// Override the instance URL; `{subdomain}` is substituted
    #[arg(long, env = "ZENDESK_API_BASE_URL")]
    api_base_url: Option<String>,
    /// Knowledge-base cache lifetime in seconds
    #[arg(long, env = "ZENDESK_KB_CACHE_TTL_SECS", default_value_t = 3600)]
    kb_cache_ttl_secs: u64,
    /// Timeout for each Zendesk API call in seconds
    #[arg(long, env = "ZENDESK_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    request_timeout_secs: u64,
}

impl ZendeskArgs {
    fn into_config(self) -> Result<ServerConfig> {
        ServerConfig::new(
            self.subdomain,
            self.api_base_url,
            self.kb_cache_ttl_secs,
            self.request_timeout_secs,
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; the environment may already be set.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("zendesk_mcp_server=info".parse()?)
                .add_directive("rmcp=warn".parse()?),
        )
        .with_max_level(Level::INFO)
        // stdout carries the stdio transport
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::McpHttp { bind, zendesk } => {
            let config = zendesk.into_config()?;
            info!(
                "Starting MCP HTTP server (rmcp) on {} for subdomain {:?}",
                bind,
                config.subdomain.as_ref().map(|s| s.as_str())
            );

            let server = create_server(&config)?;
            zendesk_mcp_server::server::start_mcp_http(server, &bind, config.token_auth()).await?;
        }
        Commands::McpStdio {
            oauth_token,
            zendesk,
        } => {
            let config = zendesk.into_config()?;
            let tenant = config
                .subdomain
                .clone()
                .context("ZENDESK_SUBDOMAIN is required in stdio mode")?;
            let ctx = AuthContext::new(BearerToken::new(oauth_token), tenant)
                .context("ZENDESK_OAUTH_TOKEN is not usable")?;

            info!(
                tenant = %ctx.tenant(),
                token = %ctx.credential().fingerprint(),
                "Starting MCP stdio server (rmcp)"
            );

            let server = create_server(&config)?.with_fallback_context(ctx);

            // Run as an MCP stdio server. ZendeskMcpServer implements ServerHandler.
            let service = server
                .serve(stdio())
                .await
                .inspect_err(|e| tracing::error!("serving error: {:?}", e))?;

            // Block until the MCP session ends.
            service.waiting().await?;
            info!("MCP stdio server session ended");
        }
    }

    Ok(())
}
