//! Library side of the `sprig` CLI.
//!
//! The binary (`src/main.rs`) only parses arguments and prints. Source discovery,
//! workspace loading and the serialisable reports live here so they can be tested
//! without spawning a process.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use sprig_beans::{
    AnnotationTable, BeanDefinition, BeanInjectionPoint, BeanScanner, BeanWorkspace,
    DefinitionKind, InjectionKind, JavaSource, MatchReason, ResolutionOutcome, ScanOutcome,
};
use sprig_config::{ScanConfig, SprigConfig};
use sprig_core::{LineCol, LineIndex, Severity, SourceLocation};
use walkdir::WalkDir;

/// File name used for ad-hoc `resolve --type` queries.
const QUERY_FILE: &str = "<query>";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub files: usize,
    /// Too large or unreadable.
    pub skipped: usize,
    /// Read but could not be parsed.
    pub failed: usize,
}

/// A scanned workspace plus what is needed to report positions.
pub struct LoadedWorkspace {
    root: PathBuf,
    workspace: BeanWorkspace,
    line_indexes: HashMap<String, LineIndex>,
    stats: LoadStats,
}

/// Every `.java` file under `root`, skipping excluded directories, in path order.
pub fn discover_sources(root: &Path, scan: &ScanConfig) -> Vec<PathBuf> {
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !scan.is_excluded_dir(&entry.file_name().to_string_lossy())
        });

    let mut out = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(target: "sprig.scan", error = %err, "skipping unreadable path");
                continue;
            }
        };
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|ext| ext.to_str()) == Some("java")
        {
            out.push(entry.into_path());
        }
    }
    out
}

/// Path of `path` relative to `root`, with `/` separators.
fn relative_name(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .filter(|component| !matches!(component, Component::CurDir))
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

pub fn load_workspace(root: &Path, config: &SprigConfig) -> Result<LoadedWorkspace> {
    if !root.is_dir() {
        bail!("{} is not a directory", root.display());
    }
    let root = &root.canonicalize().unwrap_or_else(|_| root.to_path_buf());

    let mut stats = LoadStats::default();
    let mut sources = Vec::new();
    let mut line_indexes = HashMap::new();
    for path in discover_sources(root, &config.scan) {
        let too_large = std::fs::metadata(&path)
            .map(|meta| meta.len() > config.scan.max_file_bytes)
            .unwrap_or(false);
        if too_large {
            tracing::debug!(target: "sprig.scan", path = %path.display(), "skipping oversized file");
            stats.skipped += 1;
            continue;
        }
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(target: "sprig.scan", path = %path.display(), error = %err, "skipping unreadable file");
                stats.skipped += 1;
                continue;
            }
        };
        let name = relative_name(root, &path);
        line_indexes.insert(name.clone(), LineIndex::new(&text));
        sources.push(JavaSource::new(name, text));
    }

    let scanner = BeanScanner::new(AnnotationTable::from_config(&config.annotations));
    let workspace = BeanWorkspace::new(scanner);
    let ticket = workspace.begin_full_scan();
    match workspace.full_scan(&ticket, &sources) {
        ScanOutcome::Committed { files, failed, .. } => {
            stats.files = files;
            stats.failed = failed;
        }
        ScanOutcome::Superseded => bail!("workspace scan was superseded"),
    }

    tracing::debug!(
        target: "sprig.workspace",
        root = %root.display(),
        files = stats.files,
        skipped = stats.skipped,
        failed = stats.failed,
        "workspace loaded"
    );
    Ok(LoadedWorkspace {
        root: root.to_path_buf(),
        workspace,
        line_indexes,
        stats,
    })
}

/// Where to look in a file: a byte offset or a one-based line and column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Position {
    Offset(usize),
    LineColumn { line: u32, column: u32 },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Place {
    pub file: String,
    /// One-based.
    pub line: u32,
    /// One-based.
    pub column: u32,
    pub start: usize,
    pub end: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BeanEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub kind: DefinitionKind,
    pub exposed_types: Vec<String>,
    pub qualifiers: Vec<String>,
    pub primary: bool,
    pub location: Place,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InjectionEntry {
    #[serde(rename = "type")]
    pub ty: String,
    pub name: Option<String>,
    pub qualifier: Option<String>,
    pub kind: InjectionKind,
    pub owner: String,
    pub location: Option<Place>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CandidateEntry {
    pub score: u32,
    pub reason: MatchReason,
    pub bean: BeanEntry,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolveReport {
    pub injection: InjectionEntry,
    pub outcome: ResolutionOutcome,
    pub candidates: Vec<CandidateEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UsagesReport {
    pub bean: BeanEntry,
    pub injections: Vec<InjectionEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiagnosticEntry {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosticsSummary {
    pub errors: usize,
    pub warnings: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiagnosticsReport {
    pub diagnostics: Vec<DiagnosticEntry>,
    pub summary: DiagnosticsSummary,
}

impl LoadedWorkspace {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn workspace(&self) -> &BeanWorkspace {
        &self.workspace
    }

    pub fn stats(&self) -> LoadStats {
        self.stats
    }

    /// Workspace-relative name for a path given on the command line.
    pub fn file_name(&self, file: &Path) -> String {
        if file.is_absolute() {
            let file = file.canonicalize().unwrap_or_else(|_| file.to_path_buf());
            relative_name(&self.root, &file)
        } else {
            relative_name(Path::new(""), file)
        }
    }

    fn offset(&self, file: &str, position: Position) -> Result<usize> {
        match position {
            Position::Offset(offset) => Ok(offset),
            Position::LineColumn { line, column } => {
                let index = self
                    .line_indexes
                    .get(file)
                    .ok_or_else(|| anyhow!("{file} is not part of the workspace"))?;
                let line_col = LineCol {
                    line: line.saturating_sub(1),
                    col: column.saturating_sub(1),
                };
                index
                    .offset(line_col)
                    .ok_or_else(|| anyhow!("{file}:{line}:{column} is outside the file"))
            }
        }
    }

    fn place(&self, location: &SourceLocation) -> Place {
        let line_col = self
            .line_indexes
            .get(location.file())
            .map(|index| index.line_col(location.span.start))
            .unwrap_or(LineCol { line: 0, col: 0 });
        Place {
            file: location.file().to_string(),
            line: line_col.line + 1,
            column: line_col.col + 1,
            start: location.span.start,
            end: location.span.end,
        }
    }

    fn bean_entry(&self, def: &BeanDefinition) -> BeanEntry {
        BeanEntry {
            name: def.name.clone(),
            ty: def.ty.clone(),
            kind: def.kind,
            exposed_types: def.exposed_types.clone(),
            qualifiers: def.qualifiers.iter().cloned().collect(),
            primary: def.is_primary,
            location: self.place(&def.location),
        }
    }

    fn injection_entry(&self, injection: &BeanInjectionPoint) -> InjectionEntry {
        InjectionEntry {
            ty: injection.bean_type.clone(),
            name: injection.bean_name.clone(),
            qualifier: injection.qualifier.clone(),
            kind: injection.kind,
            owner: injection.owner.clone(),
            location: (injection.location.file() != QUERY_FILE)
                .then(|| self.place(&injection.location)),
        }
    }

    pub fn beans(&self) -> Vec<BeanEntry> {
        let snapshot = self.workspace.snapshot();
        snapshot
            .index()
            .iter()
            .map(|def| self.bean_entry(def))
            .collect()
    }

    fn resolve_report(&self, injection: &BeanInjectionPoint) -> ResolveReport {
        let resolution = self.workspace.snapshot().resolve(injection);
        ResolveReport {
            injection: self.injection_entry(injection),
            outcome: resolution.outcome(),
            candidates: resolution
                .candidates()
                .iter()
                .filter_map(|candidate| {
                    Some(CandidateEntry {
                        score: candidate.score(),
                        reason: candidate.result.reason?,
                        bean: self.bean_entry(&candidate.definition),
                    })
                })
                .collect(),
        }
    }

    /// Go to definition from the injection point at `position` in `file`.
    pub fn resolve_at(&self, file: &Path, position: Position) -> Result<ResolveReport> {
        let name = self.file_name(file);
        let offset = self.offset(&name, position)?;
        let snapshot = self.workspace.snapshot();
        let injection = snapshot
            .injection_at(&name, offset)
            .with_context(|| format!("no injection point at {name} offset {offset}"))?;
        Ok(self.resolve_report(injection))
    }

    /// Resolve an injection point described on the command line.
    pub fn resolve_query(
        &self,
        ty: &str,
        qualifier: Option<&str>,
        name: Option<&str>,
    ) -> ResolveReport {
        let mut injection = BeanInjectionPoint::new(ty, SourceLocation::file_start(QUERY_FILE));
        injection.qualifier = qualifier.map(str::to_string);
        injection.bean_name = name.map(str::to_string);
        self.resolve_report(&injection)
    }

    /// Injection points that the bean declared at `position` in `file` satisfies.
    pub fn usages_at(&self, file: &Path, position: Position) -> Result<UsagesReport> {
        let name = self.file_name(file);
        let offset = self.offset(&name, position)?;
        let snapshot = self.workspace.snapshot();
        let def = snapshot
            .definition_at(&name, offset)
            .with_context(|| format!("no bean definition at {name} offset {offset}"))?;
        Ok(UsagesReport {
            bean: self.bean_entry(def),
            injections: snapshot
                .injections_satisfied_by(def)
                .iter()
                .map(|injection| self.injection_entry(injection))
                .collect(),
        })
    }

    pub fn diagnostics(&self) -> DiagnosticsReport {
        let snapshot = self.workspace.snapshot();
        let mut summary = DiagnosticsSummary::default();
        let diagnostics: Vec<DiagnosticEntry> = snapshot
            .diagnostics()
            .into_iter()
            .map(|diag| {
                match diag.diagnostic.severity {
                    Severity::Error => summary.errors += 1,
                    Severity::Warning => summary.warnings += 1,
                    Severity::Info => {}
                }
                let start = diag.diagnostic.span.map(|span| span.start).unwrap_or(0);
                let line_col = self
                    .line_indexes
                    .get(&diag.file)
                    .map(|index| index.line_col(start))
                    .unwrap_or(LineCol { line: 0, col: 0 });
                DiagnosticEntry {
                    file: diag.file,
                    line: line_col.line + 1,
                    column: line_col.col + 1,
                    severity: diag.diagnostic.severity,
                    code: diag.diagnostic.code,
                    message: diag.diagnostic.message,
                }
            })
            .collect();
        DiagnosticsReport {
            diagnostics,
            summary,
        }
    }
}
