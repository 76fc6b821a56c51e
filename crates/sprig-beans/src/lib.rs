//! Static resolution of dependency-injection wiring in annotation-driven Java code.
//!
//! The crate is layered:
//! - [`AnnotationTable`] classifies annotations into bean-definition, injection,
//!   qualifier and primary markers.
//! - [`BeanScanner`] turns a Java source file into [`BeanDefinition`]s and
//!   [`BeanInjectionPoint`]s.
//! - [`BeanIndex`] stores definitions with lookups by type, name and qualifier.
//! - [`resolve`] ranks the definitions that satisfy an injection point.
//! - [`BeanWorkspace`] keeps all of it current across edits and publishes
//!   consistent snapshots for navigation and diagnostics.
//!
//! Nothing here executes the container. Type compatibility is name based: a
//! definition matches when its own type or one of its directly declared
//! supertypes names the requested type.

mod annotations;
mod index;
mod model;
mod resolve;
mod scan;
mod workspace;

pub use annotations::{extract_annotation_parameter, Annotation, AnnotationRole, AnnotationTable};
pub use index::BeanIndex;
pub use model::{
    BeanCandidate, BeanDefinition, BeanInjectionPoint, DefinitionKind, InjectionKind, MatchReason,
    MatchResult,
};
pub use resolve::{is_type_match, matches, resolve, Resolution, ResolutionOutcome};
pub use scan::{decapitalize, BeanScanner, FileScan, JavaSource, ScanError};
pub use workspace::{
    BeanWorkspace, FileChange, ScanOutcome, ScanTicket, WorkspaceSnapshot, SPRIG_AMBIGUOUS_BEAN,
    SPRIG_NO_BEAN,
};
