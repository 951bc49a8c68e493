//! Line classification and command dispatch.
//!
//! A line is one of: blank, a backtick-wrapped host command, a `select`
//! query, or a module command. Module commands are tokenized, bound to the
//! command's [`ParamSpec`], executed, and may switch the active module.

use std::collections::BTreeMap;
use std::sync::Arc;

use conduit_types::config::DEFAULT_MODULE;
use conduit_types::error::{ConduitError, Result};
use conduit_types::output::CommandOutput;

use crate::args::{ArgList, ParamSpec, parse_line};
use crate::manager::RegisteredCommand;
use crate::passthrough::run_host_command;
use crate::session::RuntimeSession;

/// Keyword that routes a line to the query engine.
pub const QUERY_KEYWORD: &str = "select";

/// Session built-ins, used only when no module registers the same name.
const BUILTINS: &[(&str, &str, &str)] = &[
    ("help", "help [command]", "List commands or show one command's usage"),
    ("modules", "modules", "List registered modules"),
    ("use", "use <module>", "Make a module (by name or prefix) active"),
];

/// How an input line will be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    Empty,
    /// Inner text of a `` `...` `` line.
    Passthrough(&'a str),
    /// The full trimmed statement, keyword included.
    Query(&'a str),
    /// The trimmed command line.
    Command(&'a str),
}

/// Classify a raw input line.
pub fn classify(input: &str) -> LineKind<'_> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return LineKind::Empty;
    }
    if let Some(inner) = trimmed
        .strip_prefix('`')
        .and_then(|rest| rest.strip_suffix('`'))
        && !inner.contains('`')
    {
        return LineKind::Passthrough(inner);
    }
    let first_word = trimmed.split_whitespace().next().unwrap_or("");
    if first_word.eq_ignore_ascii_case(QUERY_KEYWORD) {
        return LineKind::Query(trimmed);
    }
    LineKind::Command(trimmed)
}

/// Classify and run one input line against `session`.
pub(crate) fn interpret(session: &RuntimeSession, input: &str) -> Result<CommandOutput> {
    match classify(input) {
        LineKind::Empty => Ok(CommandOutput::None),
        LineKind::Passthrough(inner) => {
            if inner.trim().is_empty() {
                return Err(ConduitError::Passthrough("empty command".to_string()));
            }
            run_host_command(inner).map(CommandOutput::Text)
        },
        LineKind::Query(statement) => match session.query_engine() {
            Some(engine) => engine.execute(statement, session),
            None => Err(ConduitError::Query(
                "no query engine configured".to_string(),
            )),
        },
        LineKind::Command(line) => dispatch(session, line),
    }
}

fn dispatch(session: &RuntimeSession, line: &str) -> Result<CommandOutput> {
    let list = parse_line(line)?;
    // A line of escapes alone (e.g. `\`) tokenizes to nothing.
    let Some(name) = list.command.clone() else {
        return Ok(CommandOutput::None);
    };

    let Some(registered) = session.modules().find_command(&name) else {
        return match run_builtin(session, &name, &list) {
            Some(result) => result,
            None => Err(ConduitError::CommandNotFound(name)),
        };
    };

    let args = registered.command.params().bind(&list)?;
    log::debug!(
        "dispatch '{name}' -> module '{}'",
        registered.module.name()
    );
    let output = registered.command.execute(&args)?;
    auto_switch(session, &registered);
    Ok(output)
}

/// Make the command's module active after a successful run, when enabled.
///
/// `core` commands only switch when prompt-aware, whichever module the
/// session started in.
fn auto_switch(session: &RuntimeSession, registered: &RegisteredCommand) {
    if !session.settings().auto_switching() {
        return;
    }
    let manager = session.modules();
    let is_core = registered.module.name() == DEFAULT_MODULE;
    if registered.command.prompt_aware() || !is_core {
        let already_active = manager
            .active_module()
            .is_some_and(|m| m.name() == registered.module.name());
        if !already_active {
            log::info!("Switched to module '{}'", registered.module.name());
        }
        manager.set_active_module(Arc::clone(&registered.module));
    }
}

// ---------------------------------------------------------------------------
// Built-ins
// ---------------------------------------------------------------------------

fn run_builtin(
    session: &RuntimeSession,
    name: &str,
    list: &ArgList,
) -> Option<Result<CommandOutput>> {
    let result = match name {
        "help" => ParamSpec::new()
            .positionals(0, Some(1))
            .bind(list)
            .and_then(|args| builtin_help(session, args.positional(0))),
        "modules" => ParamSpec::new()
            .bind(list)
            .map(|_| builtin_modules(session)),
        "use" => ParamSpec::new()
            .positionals(1, Some(1))
            .bind(list)
            .and_then(|args| builtin_use(session, args.positional(0).unwrap_or_default())),
        _ => return None,
    };
    Some(result)
}

fn builtin_help(session: &RuntimeSession, topic: Option<&str>) -> Result<CommandOutput> {
    let commands = session.modules().command_set();

    if let Some(name) = topic {
        if let Some(reg) = commands.get(name) {
            let cmd = &reg.command;
            return Ok(CommandOutput::Text(format!(
                "{} ({})\n  {}\n  Usage: {}",
                cmd.name(),
                reg.module.name(),
                cmd.description(),
                cmd.usage()
            )));
        }
        if let Some((n, usage, desc)) = BUILTINS.iter().find(|(n, _, _)| *n == name) {
            return Ok(CommandOutput::Text(format!(
                "{n} (built-in)\n  {desc}\n  Usage: {usage}"
            )));
        }
        return Err(ConduitError::CommandNotFound(name.to_string()));
    }

    // Group by owning module, sorted.
    let mut by_module: BTreeMap<&str, Vec<(&str, &str)>> = BTreeMap::new();
    for reg in commands.values() {
        by_module
            .entry(reg.module.name())
            .or_default()
            .push((reg.command.name(), reg.command.description()));
    }
    let mut out = String::new();
    for (module, mut cmds) in by_module {
        cmds.sort_by_key(|(name, _)| *name);
        out.push_str(&format!("[{module}]\n"));
        for (name, desc) in cmds {
            out.push_str(&format!("  {name:<12} {desc}\n"));
        }
    }
    out.push_str("[built-in]\n");
    for (name, _, desc) in BUILTINS {
        if !commands.contains_key(*name) {
            out.push_str(&format!("  {name:<12} {desc}\n"));
        }
    }
    out.push_str("  `cmd`        Run a host command\n");
    out.push_str("  select ...   Run a query");
    Ok(CommandOutput::Text(out))
}

fn builtin_modules(session: &RuntimeSession) -> CommandOutput {
    let manager = session.modules();
    let active = manager.active_module();
    let rows = manager
        .modules()
        .iter()
        .map(|m| {
            let marker = if active.as_ref().is_some_and(|a| a.name() == m.name()) {
                "*"
            } else {
                ""
            };
            vec![
                format!("{}{marker}", m.name()),
                m.prefix().to_string(),
                m.commands().len().to_string(),
            ]
        })
        .collect();
    CommandOutput::Table {
        headers: vec!["module".into(), "prefix".into(), "commands".into()],
        rows,
    }
}

fn builtin_use(session: &RuntimeSession, target: &str) -> Result<CommandOutput> {
    let manager = session.modules();
    let module = manager
        .find_by_name(target)
        .or_else(|| manager.find_by_prefix(target))
        .ok_or_else(|| ConduitError::Module(format!("unknown module: {target}")))?;
    log::info!("Switched to module '{}'", module.name());
    manager.set_active_module(module);
    Ok(CommandOutput::None)
}
