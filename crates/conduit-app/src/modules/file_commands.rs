//! The `file` module: local files as data sources.
//!
//! `file:<path>` opens `<path>` on the host. Input sources yield one record
//! per line; output sources append one line per record. A keyed record is
//! stored as `key<TAB>payload`, and a line containing a tab reads back with
//! the text before the first tab as its key.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::Path;
use std::sync::Arc;

use conduit_runtime::{
    Command, FlagSpec, InputSource, Module, OutputSource, ParamSpec, ParsedArgs, Record,
    split_source_url,
};
use conduit_types::error::{ConduitError, Result};
use conduit_types::output::CommandOutput;

pub struct FileModule;

impl Module for FileModule {
    fn name(&self) -> &str {
        "file"
    }

    fn prefix(&self) -> &str {
        "file"
    }

    fn commands(&self) -> Vec<Arc<dyn Command>> {
        vec![
            Arc::new(LsCmd) as Arc<dyn Command>,
            Arc::new(CatCmd) as Arc<dyn Command>,
        ]
    }

    fn input_source(&self, url: &str) -> Result<Option<Box<dyn InputSource>>> {
        let (_, path) = split_source_url(url)?;
        let file = File::open(path)?;
        log::debug!("opened {url} for reading");
        Ok(Some(Box::new(LineReader {
            url: url.to_string(),
            lines: BufReader::new(file).lines(),
        })))
    }

    fn output_source(&self, url: &str) -> Result<Option<Box<dyn OutputSource>>> {
        let (_, path) = split_source_url(url)?;
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        log::debug!("opened {url} for appending");
        Ok(Some(Box::new(LineWriter {
            url: url.to_string(),
            out: BufWriter::new(file),
        })))
    }
}

struct LineReader {
    url: String,
    lines: Lines<BufReader<File>>,
}

impl InputSource for LineReader {
    fn url(&self) -> &str {
        &self.url
    }

    fn next_record(&mut self) -> Result<Option<Record>> {
        let Some(line) = self.lines.next() else {
            return Ok(None);
        };
        let line = line?;
        Ok(Some(match line.split_once('\t') {
            Some((key, payload)) => Record::with_key(key, payload),
            None => Record::new(line),
        }))
    }
}

struct LineWriter {
    url: String,
    out: BufWriter<File>,
}

impl OutputSource for LineWriter {
    fn url(&self) -> &str {
        &self.url
    }

    fn write_record(&mut self, record: &Record) -> Result<()> {
        if let Some(key) = &record.key {
            self.out.write_all(key)?;
            self.out.write_all(b"\t")?;
        }
        self.out.write_all(&record.payload)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ls
// ---------------------------------------------------------------------------

struct LsCmd;
impl Command for LsCmd {
    fn name(&self) -> &str {
        "ls"
    }
    fn description(&self) -> &str {
        "List directory contents"
    }
    fn usage(&self) -> &str {
        "ls [-a] [path]"
    }
    fn params(&self) -> ParamSpec {
        ParamSpec::new()
            .flag(FlagSpec::switch("all").short('a'))
            .positionals(0, Some(1))
    }
    fn execute(&self, args: &ParsedArgs) -> Result<CommandOutput> {
        let path = Path::new(args.positional(0).unwrap_or("."));
        let show_hidden = args.has_flag("all");

        let mut lines = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !show_hidden && name.starts_with('.') {
                continue;
            }
            let suffix = if entry.file_type()?.is_dir() { "/" } else { "" };
            lines.push(format!("{name}{suffix}"));
        }
        if lines.is_empty() {
            return Ok(CommandOutput::Text("(empty)".to_string()));
        }
        lines.sort();
        Ok(CommandOutput::Text(lines.join("\n")))
    }
}

// ---------------------------------------------------------------------------
// cat
// ---------------------------------------------------------------------------

struct CatCmd;
impl Command for CatCmd {
    fn name(&self) -> &str {
        "cat"
    }
    fn description(&self) -> &str {
        "Print file contents"
    }
    fn usage(&self) -> &str {
        "cat [--head <n>] <path>"
    }
    fn params(&self) -> ParamSpec {
        ParamSpec::new()
            .flag(FlagSpec::option("head").short('h'))
            .positionals(1, Some(1))
    }
    fn execute(&self, args: &ParsedArgs) -> Result<CommandOutput> {
        let head = args
            .value("head")
            .map(|h| {
                h.parse::<usize>().map_err(|_| ConduitError::InvalidArguments {
                    command: "cat".to_string(),
                    reason: format!("--head expects a number, got '{h}'"),
                })
            })
            .transpose()?;
        let text = fs::read_to_string(args.positional(0).unwrap_or_default())?;
        match head {
            Some(n) => Ok(CommandOutput::Text(
                text.lines().take(n).collect::<Vec<_>>().join("\n"),
            )),
            None => Ok(CommandOutput::Text(text)),
        }
    }
}
