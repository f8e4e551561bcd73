//! Subcommand runners and exit-code mapping
//!
//! Exit codes:
//! - 0: success
//! - 2: no match or ambiguous command
//! - 3: missing target or malformed payload
//! - 4: line reference out of range or reversed range
//! - 5: executor failure (filesystem, git, host)
//! - 1: anything else (bad config, unreadable input)

use std::io::{self, BufRead, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use tracing::debug;

use crate::cli::{AppContext, NormalizeArgs, OutputFormat, ResolveArgs, RunArgs, SessionArgs, UtteranceArgs};
use crate::core::context::ActiveContext;
use crate::core::edit::EditError;
use crate::core::normalize::{Utterance, normalize};
use crate::core::ports::ContentProvider;
use crate::core::resolve::{Resolution, ResolveError, Resolver};
use crate::core::session::{Session, SessionError};
use crate::infra::config::Config;
use crate::infra::diff;
use crate::infra::exec::{ExecError, Executor, Report};
use crate::infra::fs::FsWorkspace;

pub fn normalize_run(
    args: NormalizeArgs,
    _ctx: &AppContext,
) -> Result<()> {
    println!("{}", normalize(&Utterance::new(args.text())));
    Ok(())
}

pub fn resolve_run(
    args: ResolveArgs,
    cfg: &Config,
    ctx: &AppContext,
) -> Result<()> {
    let utterance = read_utterance(&args.input)?;
    let workspace = workspace(cfg);
    let context = active_context(args.input.file.as_deref(), &workspace);

    let resolution = Resolver::from_config(&cfg.resolver).resolve(&utterance, &context);
    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&resolution)?),
        OutputFormat::Text => println!("{}", render_resolution(&resolution, ctx)),
    }
    resolution.into_result()?;
    Ok(())
}

pub fn run_run(
    args: RunArgs,
    cfg: &Config,
    ctx: &AppContext,
) -> Result<()> {
    let utterance = read_utterance(&args.input)?;
    let execute = args.apply && !ctx.dry_run;
    let executor = Executor::from_config(cfg).with_dry_run(!execute);

    let mut session = Session::new().with_engine(Executor::engine_for(cfg));
    if let Some(file) = &args.input.file {
        if session.open(file, executor.workspace()).is_err() {
            session = session.with_active_path(file.clone());
        }
    }

    let resolved = session
        .resolve(&Resolver::from_config(&cfg.resolver), &utterance)
        .into_result()?;
    debug!(handler = resolved.handler, confidence = resolved.confidence, "resolved");
    if !ctx.quiet {
        let line = format!("{} ({})", resolved.action, resolved.handler);
        println!("{}", paint(&line, ctx, |s| s.bold().to_string()));
    }

    let report = executor.execute(&mut session, &resolved.action)?;
    print_report(&report, ctx);
    if !execute && !ctx.quiet {
        println!("{}", paint("Preview only; pass --apply to execute", ctx, |s| s.yellow().to_string()));
    }
    Ok(())
}

/// Resolve stdin line by line, carrying the active file across lines
pub fn session_run(
    args: SessionArgs,
    cfg: &Config,
    _ctx: &AppContext,
) -> Result<()> {
    let resolver = Resolver::from_config(&cfg.resolver);
    let mut session = match args.file {
        Some(file) => Session::new().with_active_path(file),
        None => Session::new(),
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for utterance in read_session(stdin.lock())? {
        let resolution = session.resolve(&resolver, &utterance);
        if let Some(action) = resolution.action() {
            session.follow(action);
        }
        writeln!(out, "{}", serde_json::to_string(&resolution)?)?;
    }
    Ok(())
}

/// Split session input into utterances; `<<< text` opens a block closed by
/// a line holding `>>>`
pub fn read_session(input: impl BufRead) -> Result<Vec<Utterance>> {
    let mut utterances = Vec::new();
    let mut open: Option<(String, Vec<String>)> = None;

    for line in input.lines() {
        let line = line.context("Failed to read session input")?;
        match open.take() {
            Some((text, block)) if line.trim() == ">>>" => {
                utterances.push(Utterance::new(text).with_block(block.join("\n")));
            }
            Some((text, mut block)) => {
                block.push(line);
                open = Some((text, block));
            }
            None => {
                let trimmed = line.trim();
                if let Some(rest) = trimmed.strip_prefix("<<<") {
                    open = Some((rest.trim().to_string(), Vec::new()));
                } else if !trimmed.is_empty() && !trimmed.starts_with('#') {
                    utterances.push(Utterance::new(trimmed));
                }
            }
        }
    }
    if let Some((text, _)) = open {
        anyhow::bail!("Unterminated block for `{text}` (missing >>>)");
    }
    Ok(utterances)
}

fn workspace(cfg: &Config) -> FsWorkspace {
    FsWorkspace::new().with_root(cfg.executor.workspace_root.clone())
}

/// Context for `--file`; content is loaded when readable so edge references
/// like "last line" resolve
fn active_context(
    file: Option<&camino::Utf8Path>,
    workspace: &FsWorkspace,
) -> ActiveContext {
    match file {
        Some(path) => {
            let ctx = ActiveContext::with_path(path);
            match workspace.read(path) {
                Ok(text) => ctx.with_content(text),
                Err(_) => ctx,
            }
        }
        None => ActiveContext::new(),
    }
}

fn read_utterance(args: &UtteranceArgs) -> Result<Utterance> {
    let utterance = Utterance::new(args.text());
    let Some(path) = &args.block_file else {
        return Ok(utterance);
    };
    let block = if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read block from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read block file: {:?}", path))?
    };
    Ok(utterance.with_block(block))
}

fn render_resolution(
    resolution: &Resolution,
    ctx: &AppContext,
) -> String {
    match resolution {
        Resolution::Action(r) => {
            let params = serde_json::to_value(&r.action)
                .ok()
                .and_then(|v| v.get("params").map(ToString::to_string))
                .unwrap_or_default();
            let head = paint(r.action.kind(), ctx, |s| s.green().to_string());
            format!("{head} {params} [{} {:.2}]", r.handler, r.confidence).trim_end().to_string()
        }
        Resolution::NoMatch => paint("no match", ctx, |s| s.red().to_string()),
        Resolution::MissingTarget { kind } => {
            paint(&format!("missing target for {kind}"), ctx, |s| s.red().to_string())
        }
        Resolution::Ambiguous { candidates } => {
            paint(&format!("ambiguous: {}", candidates.join(" | ")), ctx, |s| s.yellow().to_string())
        }
    }
}

fn print_report(
    report: &Report,
    ctx: &AppContext,
) {
    match report {
        Report::Edit { summary, diff: patch, committed, .. } => {
            if !patch.is_empty() {
                let shown = if ctx.no_color { patch.clone() } else { diff::colorize(patch) };
                print!("{shown}");
            }
            if !ctx.quiet {
                let mark = if *committed { "✓" } else { "•" };
                println!("{} {summary}", paint(mark, ctx, |s| s.green().to_string()));
            }
        }
        Report::File { message } => println!("{message}"),
        Report::Process { outcome, .. } => {
            let text = outcome.message();
            if !text.is_empty() {
                println!("{text}");
            }
        }
        Report::Planned { command } => {
            if !ctx.quiet {
                println!("{} {command}", paint("would run:", ctx, |s| s.yellow().to_string()));
            }
        }
    }
}

fn paint(
    text: &str,
    ctx: &AppContext,
    style: impl Fn(&str) -> String,
) -> String {
    if ctx.no_color { text.to_string() } else { style(text) }
}

/// Exit code for a failed command
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    if let Some(e) = err.downcast_ref::<ResolveError>() {
        return match e {
            ResolveError::NoMatch | ResolveError::Ambiguous { .. } => 2,
            ResolveError::MissingTarget { .. } => 3,
        };
    }
    if let Some(e) = err.downcast_ref::<EditError>() {
        return edit_code(e);
    }
    if let Some(e) = err.downcast_ref::<SessionError>() {
        return match e {
            SessionError::Edit(e) => edit_code(e),
            SessionError::Storage { .. } => 5,
            SessionError::Dirty { .. } => 1,
        };
    }
    if err.downcast_ref::<ExecError>().is_some() {
        return 5;
    }
    1
}

fn edit_code(e: &EditError) -> i32 {
    match e {
        EditError::NoMatch(_) => 2,
        EditError::MissingTarget { .. } | EditError::MalformedPayload(_) | EditError::UnsupportedAction { .. } => 3,
        EditError::OutOfRange { .. } | EditError::InvalidRange { .. } => 4,
    }
}

/// Convert Result<()> to exit codes for the CLI harness
pub fn finish_with_exit(
    result: Result<()>,
    ctx: &AppContext,
) -> ! {
    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            let label = paint("error:", ctx, |s| s.red().bold().to_string());
            eprintln!("{label} {e:#}");
            std::process::exit(exit_code_for(&e));
        }
    }
}
