//! The session-long bean model: an index plus injection points, published as
//! immutable snapshots.
//!
//! Writers build a modified copy of the current snapshot and swap it in under a
//! lock, so a reader never sees a file half-replaced. Full re-scans run without
//! holding the lock and are discarded when a newer scan has started.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use sprig_core::{Diagnostic, SourceDiagnostic, SourceLocation};

use crate::index::BeanIndex;
use crate::model::{BeanDefinition, BeanInjectionPoint};
use crate::resolve::{matches, Resolution, ResolutionOutcome};
use crate::scan::{BeanScanner, FileScan, JavaSource, ScanError};

pub const SPRIG_NO_BEAN: &str = "SPRIG_NO_BEAN";
pub const SPRIG_AMBIGUOUS_BEAN: &str = "SPRIG_AMBIGUOUS_BEAN";

/// An incremental update for one file.
#[derive(Clone, Debug)]
pub enum FileChange {
    /// The file's declarations are now exactly these.
    Upsert(FileScan),
    Remove(Arc<str>),
}

impl FileChange {
    pub fn file(&self) -> &Arc<str> {
        match self {
            FileChange::Upsert(scan) => &scan.file,
            FileChange::Remove(file) => file,
        }
    }
}

/// A consistent view of every known definition and injection point.
#[derive(Clone, Debug, Default)]
pub struct WorkspaceSnapshot {
    index: BeanIndex,
    injections: BTreeMap<SourceLocation, Arc<BeanInjectionPoint>>,
    revision: u64,
    /// Revision at which each file was last changed incrementally while a full
    /// scan was in flight. Emptied when a scan commits.
    file_revisions: HashMap<Arc<str>, u64>,
}

impl WorkspaceSnapshot {
    pub fn index(&self) -> &BeanIndex {
        &self.index
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// All injection points in location order.
    pub fn injections(&self) -> impl Iterator<Item = &Arc<BeanInjectionPoint>> {
        self.injections.values()
    }

    pub fn injection_count(&self) -> usize {
        self.injections.len()
    }

    /// The injection point whose name covers `offset` in `file`.
    pub fn injection_at(&self, file: &str, offset: usize) -> Option<&Arc<BeanInjectionPoint>> {
        self.injections
            .range(SourceLocation::file_start(file)..)
            .take_while(|(location, _)| location.file() == file)
            .find(|(location, _)| location.contains(file, offset))
            .map(|(_, injection)| injection)
    }

    /// The bean definition whose name covers `offset` in `file`.
    pub fn definition_at(&self, file: &str, offset: usize) -> Option<&Arc<BeanDefinition>> {
        self.index
            .definitions_in_file(file)
            .find(|def| def.location.contains(file, offset))
    }

    /// Go to definition: the ranked candidates for `injection`.
    pub fn resolve(&self, injection: &BeanInjectionPoint) -> Resolution {
        Resolution::new(injection, &self.index)
    }

    /// Injection points whose best candidates include `def`.
    pub fn injections_satisfied_by(&self, def: &BeanDefinition) -> Vec<Arc<BeanInjectionPoint>> {
        self.injections
            .values()
            .filter(|injection| matches(def, injection).is_match())
            .filter(|injection| {
                self.resolve(injection)
                    .best()
                    .iter()
                    .any(|candidate| candidate.definition.location == def.location)
            })
            .cloned()
            .collect()
    }

    /// Unsatisfied and ambiguous injection points, in location order.
    pub fn diagnostics(&self) -> Vec<SourceDiagnostic> {
        let mut out = Vec::new();
        for injection in self.injections.values() {
            let resolution = self.resolve(injection);
            let diagnostic = match resolution.outcome() {
                ResolutionOutcome::Unique => continue,
                ResolutionOutcome::Unresolved => Diagnostic::error(
                    SPRIG_NO_BEAN,
                    format!(
                        "No bean of type `{}` found for injection",
                        injection.bean_type
                    ),
                    Some(injection.location.span),
                ),
                ResolutionOutcome::Ambiguous => {
                    let names = resolution
                        .best()
                        .iter()
                        .map(|candidate| candidate.definition.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ");
                    Diagnostic::error(
                        SPRIG_AMBIGUOUS_BEAN,
                        format!(
                            "Multiple beans of type `{}` match equally ({names}); add a qualifier or mark one as primary",
                            injection.bean_type
                        ),
                        Some(injection.location.span),
                    )
                }
            };
            out.push(SourceDiagnostic::at(&injection.location, diagnostic));
        }
        out
    }

    fn apply(&mut self, change: FileChange) {
        let file = change.file().clone();
        let stale: Vec<SourceLocation> = self
            .injections
            .range(SourceLocation::file_start(file.clone())..)
            .take_while(|(location, _)| location.file() == &*file)
            .map(|(location, _)| location.clone())
            .collect();
        for location in stale {
            self.injections.remove(&location);
        }

        match change {
            FileChange::Upsert(scan) => {
                self.index.replace_file(&file, scan.definitions);
                for injection in scan.injections {
                    self.injections
                        .insert(injection.location.clone(), Arc::new(injection));
                }
            }
            FileChange::Remove(_) => {
                self.index.remove_file(&file);
            }
        }
    }

    fn copy_file_from(&mut self, other: &WorkspaceSnapshot, file: &Arc<str>) {
        let scan = FileScan {
            file: file.clone(),
            definitions: other
                .index
                .definitions_in_file(file)
                .map(|def| (**def).clone())
                .collect(),
            injections: other
                .injections
                .range(SourceLocation::file_start(file.clone())..)
                .take_while(|(location, _)| location.file() == &**file)
                .map(|(_, injection)| (**injection).clone())
                .collect(),
        };
        self.apply(FileChange::Upsert(scan));
    }
}

/// Handle for one full scan. Starting another scan supersedes it.
#[derive(Clone, Debug)]
pub struct ScanTicket {
    generation: u64,
    base_revision: u64,
    latest: Arc<AtomicU64>,
}

impl ScanTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_superseded(&self) -> bool {
        self.latest.load(Ordering::Acquire) != self.generation
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanOutcome {
    Committed {
        revision: u64,
        files: usize,
        failed: usize,
    },
    Superseded,
}

pub struct BeanWorkspace {
    scanner: BeanScanner,
    current: RwLock<Arc<WorkspaceSnapshot>>,
    /// Serialises commits and scan starts; readers never take it.
    write_lock: Mutex<()>,
    latest_scan: Arc<AtomicU64>,
    /// Generation of the last committed full scan.
    committed_scan: AtomicU64,
}

impl Default for BeanWorkspace {
    fn default() -> Self {
        Self::new(BeanScanner::default())
    }
}

impl BeanWorkspace {
    pub fn new(scanner: BeanScanner) -> Self {
        Self {
            scanner,
            current: RwLock::new(Arc::new(WorkspaceSnapshot::default())),
            write_lock: Mutex::new(()),
            latest_scan: Arc::new(AtomicU64::new(0)),
            committed_scan: AtomicU64::new(0),
        }
    }

    pub fn scanner(&self) -> &BeanScanner {
        &self.scanner
    }

    /// The current snapshot. It stays valid (and unchanged) while later updates
    /// are published.
    pub fn snapshot(&self) -> Arc<WorkspaceSnapshot> {
        self.current.read().clone()
    }

    pub fn apply(&self, change: FileChange) -> u64 {
        let _guard = self.write_lock.lock();
        let base = self.snapshot();
        let mut next = (*base).clone();
        let file = change.file().clone();
        next.apply(change);
        next.revision = base.revision + 1;
        if self.scan_in_flight() {
            next.file_revisions.insert(file.clone(), next.revision);
        } else {
            next.file_revisions.remove(&file);
        }

        tracing::debug!(
            target: "sprig.workspace",
            file = %file,
            revision = next.revision,
            definitions = next.index.len(),
            injections = next.injections.len(),
            "applied file change"
        );
        let revision = next.revision;
        *self.current.write() = Arc::new(next);
        revision
    }

    /// Re-scan one file and publish the result.
    pub fn update_source(&self, source: &JavaSource) -> Result<u64, ScanError> {
        let scan = self.scanner.scan(source)?;
        Ok(self.apply(FileChange::Upsert(scan)))
    }

    pub fn remove_file(&self, file: impl Into<Arc<str>>) -> u64 {
        self.apply(FileChange::Remove(file.into()))
    }

    /// Whether a full scan has started since the last one committed.
    fn scan_in_flight(&self) -> bool {
        self.latest_scan.load(Ordering::Acquire) != self.committed_scan.load(Ordering::Acquire)
    }

    /// Start a full scan, superseding any scan already in flight.
    pub fn begin_full_scan(&self) -> ScanTicket {
        let _guard = self.write_lock.lock();
        let generation = self.latest_scan.fetch_add(1, Ordering::AcqRel) + 1;
        let base_revision = self.current.read().revision;
        tracing::debug!(target: "sprig.workspace", generation, base_revision, "full scan started");
        ScanTicket {
            generation,
            base_revision,
            latest: self.latest_scan.clone(),
        }
    }

    /// Rebuild the model from `sources` and publish it unless `ticket` has been
    /// superseded.
    ///
    /// Files that fail to parse are logged and left out. Files changed
    /// incrementally after the ticket was issued keep their live state.
    pub fn full_scan<'s>(
        &self,
        ticket: &ScanTicket,
        sources: impl IntoIterator<Item = &'s JavaSource>,
    ) -> ScanOutcome {
        let mut fresh = WorkspaceSnapshot::default();
        let mut files = 0usize;
        let mut failed = 0usize;

        for source in sources {
            if ticket.is_superseded() {
                tracing::debug!(target: "sprig.scan", generation = ticket.generation, "full scan superseded");
                return ScanOutcome::Superseded;
            }
            match self.scanner.scan(source) {
                Ok(scan) => {
                    fresh.apply(FileChange::Upsert(scan));
                    files += 1;
                }
                Err(err) => {
                    tracing::warn!(target: "sprig.scan", error = %err, "skipping unscannable source");
                    failed += 1;
                }
            }
        }

        let _guard = self.write_lock.lock();
        if ticket.is_superseded() {
            tracing::debug!(target: "sprig.scan", generation = ticket.generation, "full scan superseded");
            return ScanOutcome::Superseded;
        }

        let live = self.snapshot();
        let mut carried = 0usize;
        for (file, &revision) in &live.file_revisions {
            if revision > ticket.base_revision {
                fresh.copy_file_from(&live, file);
                carried += 1;
            }
        }
        fresh.revision = live.revision + 1;
        self.committed_scan.store(ticket.generation, Ordering::Release);

        tracing::debug!(
            target: "sprig.workspace",
            generation = ticket.generation,
            revision = fresh.revision,
            files,
            failed,
            carried,
            definitions = fresh.index.len(),
            injections = fresh.injections.len(),
            "full scan committed"
        );
        let revision = fresh.revision;
        *self.current.write() = Arc::new(fresh);
        ScanOutcome::Committed {
            revision,
            files,
            failed,
        }
    }
}
