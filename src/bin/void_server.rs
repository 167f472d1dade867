use copper_void::server::{handle_line, ServerState};
use std::io::{self, BufRead, Write};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // stdout carries responses, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    info!("[Server] Starting copper void server...");
    let mut state = ServerState::new();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                error!("[Server] Error reading stdin: {}", e);
                continue;
            }
        };
        if let Some(response) = handle_line(&mut state, &line) {
            writeln!(stdout, "{}", response)?;
            stdout.flush()?;
        }
    }
    info!("[Server] stdin closed, shutting down");
    Ok(())
}
