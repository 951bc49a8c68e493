//! The `core` module: commands that need no backend.

use std::sync::Arc;

use conduit_runtime::{Command, FlagSpec, Module, ParamSpec, ParsedArgs};
use conduit_types::config::DEFAULT_MODULE;
use conduit_types::error::{ConduitError, Result};
use conduit_types::output::CommandOutput;

pub struct CoreModule;

impl Module for CoreModule {
    fn name(&self) -> &str {
        DEFAULT_MODULE
    }

    fn prefix(&self) -> &str {
        DEFAULT_MODULE
    }

    fn commands(&self) -> Vec<Arc<dyn Command>> {
        vec![
            Arc::new(EchoCmd) as Arc<dyn Command>,
            Arc::new(VersionCmd) as Arc<dyn Command>,
            Arc::new(EnvCmd) as Arc<dyn Command>,
        ]
    }
}

// ---------------------------------------------------------------------------
// echo
// ---------------------------------------------------------------------------

struct EchoCmd;
impl Command for EchoCmd {
    fn name(&self) -> &str {
        "echo"
    }
    fn description(&self) -> &str {
        "Print text"
    }
    fn usage(&self) -> &str {
        "echo [text...]"
    }
    fn params(&self) -> ParamSpec {
        ParamSpec::new().positionals(0, None)
    }
    fn execute(&self, args: &ParsedArgs) -> Result<CommandOutput> {
        Ok(CommandOutput::Text(args.positionals().join(" ")))
    }
}

// ---------------------------------------------------------------------------
// version
// ---------------------------------------------------------------------------

struct VersionCmd;
impl Command for VersionCmd {
    fn name(&self) -> &str {
        "version"
    }
    fn description(&self) -> &str {
        "Show the shell version"
    }
    fn usage(&self) -> &str {
        "version"
    }
    fn params(&self) -> ParamSpec {
        ParamSpec::new()
    }
    fn prompt_aware(&self) -> bool {
        true
    }
    fn execute(&self, _args: &ParsedArgs) -> Result<CommandOutput> {
        Ok(CommandOutput::Text(format!(
            "conduit {}",
            env!("CARGO_PKG_VERSION")
        )))
    }
}

// ---------------------------------------------------------------------------
// env
// ---------------------------------------------------------------------------

struct EnvCmd;
impl Command for EnvCmd {
    fn name(&self) -> &str {
        "env"
    }
    fn description(&self) -> &str {
        "Show environment variables"
    }
    fn usage(&self) -> &str {
        "env [--prefix <text>] [name]"
    }
    fn params(&self) -> ParamSpec {
        ParamSpec::new()
            .flag(FlagSpec::option("prefix").short('p'))
            .positionals(0, Some(1))
    }
    fn execute(&self, args: &ParsedArgs) -> Result<CommandOutput> {
        if let Some(name) = args.positional(0) {
            return std::env::var(name)
                .map(CommandOutput::Text)
                .map_err(|_| ConduitError::Module(format!("env: {name} is not set")));
        }
        let prefix = args.value("prefix").unwrap_or("");
        let mut vars: Vec<(String, String)> = std::env::vars()
            .filter(|(k, _)| k.starts_with(prefix))
            .collect();
        vars.sort();
        Ok(CommandOutput::Table {
            headers: vec!["NAME".into(), "VALUE".into()],
            rows: vars.into_iter().map(|(k, v)| vec![k, v]).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_runtime::args::parse_line;

    fn run(cmd: &dyn Command, line: &str) -> Result<CommandOutput> {
        let args = cmd.params().bind(&parse_line(line)?)?;
        cmd.execute(&args)
    }

    #[test]
    fn echo_joins_arguments() {
        assert_eq!(
            run(&EchoCmd, "echo hello 'big world'").unwrap(),
            CommandOutput::text("hello big world")
        );
    }

    #[test]
    fn echo_rejects_unknown_flag() {
        assert!(matches!(
            run(&EchoCmd, "echo --loud hi").unwrap_err(),
            ConduitError::InvalidArguments { .. }
        ));
    }

    #[test]
    fn version_reports_package_version() {
        let out = run(&VersionCmd, "version").unwrap();
        assert!(out.as_text().unwrap().starts_with("conduit "));
        assert!(VersionCmd.prompt_aware());
    }

    #[test]
    fn env_reads_known_variable() {
        // PATH is set in every test environment we run in.
        assert!(run(&EnvCmd, "env PATH").unwrap().as_text().is_some());
    }

    #[test]
    fn env_missing_variable_fails() {
        let err = run(&EnvCmd, "env CONDUIT_SURELY_UNSET_VARIABLE").unwrap_err();
        assert!(err.to_string().contains("is not set"));
    }

    #[test]
    fn env_lists_filtered_table() {
        match run(&EnvCmd, "env --prefix PAT").unwrap() {
            CommandOutput::Table { headers, rows } => {
                assert_eq!(headers, vec!["NAME", "VALUE"]);
                assert!(rows.iter().all(|r| r[0].starts_with("PAT")));
            },
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn core_module_exposes_commands() {
        let names: Vec<String> = CoreModule
            .commands()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(names, vec!["echo", "version", "env"]);
        assert_eq!(CoreModule.prefix(), "core");
    }
}
