use anyhow::{Context, Result};
use meeting_cli::config::ENV_VERBOSE;
use meeting_cli::session::GOODBYE_MESSAGE;
use meeting_cli::{run_session, AgentConfig, AppContext};
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = AgentConfig::from_env().context("Failed to load configuration")?;
    let mut app = AppContext::bootstrap(config)
        .await
        .context("Failed to start the meeting agent")?;

    let input = BufReader::new(tokio::io::stdin());
    let mut output = tokio::io::stdout();
    tokio::select! {
        result = run_session(&mut app, input, &mut output) => result,
        _ = tokio::signal::ctrl_c() => {
            println!("\n{GOODBYE_MESSAGE}");
            Ok(())
        }
    }
}

/// Logs go to stderr; stdout belongs to the chat.
fn init_logging() {
    let verbose = std::env::var(ENV_VERBOSE)
        .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
        .unwrap_or(false);

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}
