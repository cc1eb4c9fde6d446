#![cfg_attr(not(test), deny(clippy::panic))]

use std::net::SocketAddr;
use std::sync::Arc;

use buzzline_server::config;
use buzzline_server::logging;
use buzzline_server::server::GameServer;
use buzzline_server::websocket;
use clap::Parser;

/// Buzzline -- room coordinator for a Jeopardy-style trivia show
#[derive(Parser, Debug)]
#[command(name = "buzzline-server")]
#[command(about = "Real-time room coordinator for a Jeopardy-style trivia show")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines and pre-deployment checks.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON) and exit.
    /// Useful for debugging configuration loading from multiple sources.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration from config.json / env if present, else defaults.
    let cfg = Arc::new(config::load());

    if cli.print_config {
        let json = serde_json::to_string_pretty(&*cfg)
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    // config::load() already ran validation warn-only; capture the result
    // here for a proper exit code and to fail startup on broken settings.
    let validation_result =
        config::validate_config(&cfg).map_err(|e| anyhow::anyhow!("invalid configuration:\n{e}"));

    if cli.validate_config {
        match validation_result {
            Ok(()) => {
                println!("Configuration validation passed");
                println!();
                println!("Configuration summary:");
                println!("  Port: {}", cfg.port);
                println!("  Frontend origin: {}", cfg.security.frontend_origin);
                println!("  Persistence backend: {:?}", cfg.persistence.backend);
                println!(
                    "  Generator configured: {}",
                    cfg.generator.endpoint.is_some()
                );
                println!("  Tie window: {}ms", cfg.server.tie_window_ms);
                println!("  Room grace: {}ms", cfg.server.room_grace_ms);
                return Ok(());
            }
            Err(e) => {
                eprintln!("Configuration validation failed:\n{e}");
                std::process::exit(1);
            }
        }
    }

    validation_result?;

    logging::init(&cfg.logging);

    let port: u16 = cfg.port;
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "Starting Buzzline server");

    let game_server = GameServer::new(cfg.clone());

    // Background reaper for abandoned and finished rooms.
    tokio::spawn(Arc::clone(&game_server).sweep_loop());

    let app = websocket::create_router(&cfg.security.frontend_origin).with_state(game_server);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        cors_origins = %cfg.security.frontend_origin,
        "Server started - WebSocket: /ws, Health: /health, Games API: /api/games"
    );

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod cli_tests {
    use super::Cli;
    use clap::Parser;

    #[test]
    fn test_cli_default_no_flags() {
        let cli = Cli::try_parse_from(["buzzline-server"]).unwrap();
        assert!(!cli.validate_config);
        assert!(!cli.print_config);
    }

    #[test]
    fn test_cli_validate_config_flags() {
        let cli = Cli::try_parse_from(["buzzline-server", "--validate-config"]).unwrap();
        assert!(cli.validate_config);
        let cli = Cli::try_parse_from(["buzzline-server", "-c"]).unwrap();
        assert!(cli.validate_config);
    }

    #[test]
    fn test_cli_print_config() {
        let cli = Cli::try_parse_from(["buzzline-server", "--print-config"]).unwrap();
        assert!(cli.print_config);
        assert!(!cli.validate_config);
    }

    #[test]
    fn test_cli_validate_and_print_config_conflict() {
        let result =
            Cli::try_parse_from(["buzzline-server", "--validate-config", "--print-config"]);
        assert!(result.is_err());
    }
}
