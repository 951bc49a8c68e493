//! conduit interactive shell.
//!
//! Reads lines from stdin and hands them to a runtime session. Lines wrapped
//! in backticks run on the host, `select ...` goes to the query engine, and
//! anything else is a module command. Type `exit` or `quit` to leave.

mod modules;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use conduit_runtime::RuntimeSession;
use conduit_types::config::ShellConfig;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config()?;
    log::info!(
        "Starting conduit {} (default module '{}', auto-switching {})",
        env!("CARGO_PKG_VERSION"),
        config.default_module,
        if config.auto_switching { "on" } else { "off" },
    );

    let session = RuntimeSession::new(Arc::new(config));
    session.register_modules(modules::builtin_modules());

    run_repl(&session, io::stdin().lock(), &mut io::stdout())?;

    let failures = session.shutdown();
    for failure in &failures {
        log::error!("{failure}");
    }
    log::info!("conduit exited");
    Ok(())
}

/// Config path from the first argument or `CONDUIT_CONFIG`; defaults
/// otherwise.
fn load_config() -> Result<ShellConfig> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("CONDUIT_CONFIG").ok())
        .map(PathBuf::from);
    match path {
        Some(path) => Ok(ShellConfig::load(&path)?),
        None => {
            log::info!("No config given, using defaults");
            Ok(ShellConfig::default())
        },
    }
}

fn run_repl(session: &RuntimeSession, input: impl BufRead, out: &mut impl Write) -> Result<()> {
    write!(out, "{}", session.prompt())?;
    out.flush()?;
    for line in input.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed == "exit" || trimmed == "quit" {
            break;
        }
        match session.interpret(trimmed) {
            Ok(output) if output.is_none() => {},
            Ok(output) => writeln!(out, "{output}")?,
            Err(e) => writeln!(out, "error: {e}")?,
        }
        write!(out, "{}", session.prompt())?;
        out.flush()?;
    }
    Ok(())
}
