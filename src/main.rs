use clap::{CommandFactory, Parser};
use pve_mcp::cli::{Args, Commands};
use pve_mcp::mcp::McpServer;
use pve_mcp::proxmox::ProxmoxClient;
use pve_mcp::settings::{ServerType, Settings};
use pve_mcp::{http, logging};
use std::process;
use std::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Some(Commands::Completions { shell }) = &args.command {
        let mut cmd = Args::command();
        let name = cmd.get_name().to_string();
        clap_complete::generate(*shell, &mut cmd, name, &mut std::io::stdout());
        return;
    }

    let mut settings = match Settings::new(args.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };
    settings.apply_args(&args);

    if let Some(Commands::Config { format }) = &args.command {
        match settings.redacted().render(*format) {
            Ok(out) => print!("{}", out),
            Err(e) => {
                eprintln!("Failed to render configuration: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    // Dropping the guard stops the file writer.
    let _guard = match logging::init(&settings) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            process::exit(1);
        }
    };

    let credentials = match settings.credentials() {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            process::exit(1);
        }
    };

    info!("Using Proxmox at {}:{} as {}", credentials.host, credentials.port, credentials.user);

    let mut client = match ProxmoxClient::new(credentials) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to create client: {}", e);
            process::exit(1);
        }
    };
    if let Some(ttl) = settings.ticket_ttl_secs.filter(|&t| t > 0) {
        info!("Reusing session tickets for {}s", ttl);
        client = client.with_ticket_cache(Duration::from_secs(ttl));
    }

    let server = McpServer::new(client);

    let result = match settings.server_type() {
        ServerType::Stdio => {
            info!("Starting MCP server (stdio transport)");
            server.run_stdio().await
        }
        ServerType::Http => {
            let addr = settings.http_addr();
            info!("Starting MCP server (http transport) on {}", addr);
            http::serve(server, &addr, settings.http_auth_token.clone()).await
        }
    };

    if let Err(e) = result {
        error!("Server error: {:#}", e);
        process::exit(1);
    }
}
