use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use sprig_cli::{
    load_workspace, BeanEntry, DiagnosticsReport, InjectionEntry, LoadedWorkspace, Position,
    ResolveReport, UsagesReport,
};
use sprig_config::{init_tracing, load_for_workspace};

#[derive(Parser)]
#[command(
    name = "sprig",
    version,
    about = "Static bean wiring navigation for annotation-driven Java code"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every bean definition in a workspace
    Beans(BeansArgs),
    /// Find the beans that satisfy an injection point
    Resolve(ResolveArgs),
    /// Find the injection points a bean definition satisfies
    Usages(UsagesArgs),
    /// Report unsatisfied and ambiguous injection points
    Diagnostics(DiagnosticsArgs),
}

#[derive(Args)]
struct BeansArgs {
    /// Workspace root directory
    path: PathBuf,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct PositionArgs {
    /// Source file, relative to the workspace root or absolute
    #[arg(long)]
    file: Option<PathBuf>,
    /// Byte offset within `--file`
    #[arg(long, conflicts_with_all = ["line", "column"])]
    offset: Option<usize>,
    /// One-based line within `--file`
    #[arg(long, requires = "column")]
    line: Option<u32>,
    /// One-based column within `--file`
    #[arg(long, requires = "line")]
    column: Option<u32>,
}

impl PositionArgs {
    fn position(&self) -> Option<Position> {
        match (self.offset, self.line, self.column) {
            (Some(offset), _, _) => Some(Position::Offset(offset)),
            (None, Some(line), Some(column)) => Some(Position::LineColumn { line, column }),
            _ => None,
        }
    }
}

#[derive(Args)]
struct ResolveArgs {
    /// Workspace root directory
    path: PathBuf,
    #[command(flatten)]
    at: PositionArgs,
    /// Requested bean type, instead of a source position
    #[arg(long = "type", conflicts_with = "file")]
    ty: Option<String>,
    /// Qualifier for `--type`
    #[arg(long, requires = "ty")]
    qualifier: Option<String>,
    /// Bean name for `--type`
    #[arg(long, requires = "ty")]
    name: Option<String>,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct UsagesArgs {
    /// Workspace root directory
    path: PathBuf,
    #[command(flatten)]
    at: PositionArgs,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct DiagnosticsArgs {
    /// Workspace root directory
    path: PathBuf,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

fn open(root: &Path) -> Result<LoadedWorkspace> {
    let (config, config_path, diagnostics) = load_for_workspace(root)?;
    init_tracing(&config.logging);

    if let Some(path) = &config_path {
        tracing::debug!(target: "sprig.config", path = %path.display(), "using config file");
    }
    for key in &diagnostics.unknown_keys {
        tracing::warn!(target: "sprig.config", key = %key, "unknown config key");
    }
    for warning in &diagnostics.warnings {
        tracing::warn!(target: "sprig.config", ?warning, "config warning");
    }
    if !diagnostics.is_ok() {
        let errors = diagnostics
            .errors
            .iter()
            .map(|err| format!("{err:?}"))
            .collect::<Vec<_>>()
            .join("; ");
        bail!("invalid configuration: {errors}");
    }

    load_workspace(root, &config)
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Beans(args) => {
            let ws = open(&args.path)?;
            print_output(&ws.beans(), args.json)?;
            Ok(0)
        }
        Command::Resolve(args) => {
            let ws = open(&args.path)?;
            let report = match (&args.ty, &args.at.file, args.at.position()) {
                (Some(ty), _, _) => {
                    ws.resolve_query(ty, args.qualifier.as_deref(), args.name.as_deref())
                }
                (None, Some(file), Some(position)) => ws.resolve_at(file, position)?,
                _ => bail!("either --type or --file with --offset (or --line/--column) is required"),
            };
            print_output(&report, args.json)?;
            Ok(0)
        }
        Command::Usages(args) => {
            let ws = open(&args.path)?;
            let (Some(file), Some(position)) = (&args.at.file, args.at.position()) else {
                bail!("--file with --offset (or --line/--column) is required");
            };
            let report = ws.usages_at(file, position)?;
            print_output(&report, args.json)?;
            Ok(0)
        }
        Command::Diagnostics(args) => {
            let ws = open(&args.path)?;
            let report = ws.diagnostics();
            let exit = if report.summary.errors > 0 { 1 } else { 0 };
            print_output(&report, args.json)?;
            Ok(exit)
        }
    }
}

fn print_output<T: Serialize + 'static>(value: &T, json: bool) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(value)?;
        println!("{out}");
        return Ok(());
    }

    // Human output for the report types. Everything else falls back to pretty JSON.
    let any = value as &dyn std::any::Any;
    if let Some(beans) = any.downcast_ref::<Vec<BeanEntry>>() {
        for bean in beans {
            println!("{}", describe_bean(bean));
        }
        println!("summary: {} beans", beans.len());
    } else if let Some(report) = any.downcast_ref::<ResolveReport>() {
        println!("injection: {}", describe_injection(&report.injection));
        println!("outcome: {}", serde_plain(&report.outcome)?);
        for candidate in &report.candidates {
            println!(
                "  {:>3} {:<15} {}",
                candidate.score,
                serde_plain(&candidate.reason)?,
                describe_bean(&candidate.bean)
            );
        }
    } else if let Some(report) = any.downcast_ref::<UsagesReport>() {
        println!("bean: {}", describe_bean(&report.bean));
        for injection in &report.injections {
            println!("  {}", describe_injection(injection));
        }
        println!("summary: {} injection points", report.injections.len());
    } else if let Some(report) = any.downcast_ref::<DiagnosticsReport>() {
        for d in &report.diagnostics {
            println!(
                "{}:{}:{}: {}[{}] {}",
                d.file,
                d.line,
                d.column,
                serde_plain(&d.severity)?,
                d.code,
                d.message
            );
        }
        println!(
            "summary: {} errors, {} warnings",
            report.summary.errors, report.summary.warnings
        );
    } else {
        let out = serde_json::to_string_pretty(value)?;
        println!("{out}");
    }
    Ok(())
}

/// Render a unit enum through its serde name (`type_match`, `error`, ...).
fn serde_plain<T: Serialize>(value: &T) -> Result<String> {
    Ok(match serde_json::to_value(value)? {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

fn describe_bean(bean: &BeanEntry) -> String {
    let mut out = format!(
        "{}:{}:{}: {} ({})",
        bean.location.file, bean.location.line, bean.location.column, bean.name, bean.ty
    );
    if bean.primary {
        out.push_str(" primary");
    }
    if !bean.qualifiers.is_empty() {
        out.push_str(&format!(" qualifiers=[{}]", bean.qualifiers.join(", ")));
    }
    out
}

fn describe_injection(injection: &InjectionEntry) -> String {
    let mut out = match &injection.location {
        Some(place) => format!("{}:{}:{}: {}", place.file, place.line, place.column, injection.ty),
        None => injection.ty.clone(),
    };
    if let Some(qualifier) = &injection.qualifier {
        out.push_str(&format!(" qualifier={qualifier:?}"));
    }
    if let Some(name) = &injection.name {
        out.push_str(&format!(" name={name:?}"));
    }
    out
}
