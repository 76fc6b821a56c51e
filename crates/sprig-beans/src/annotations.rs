//! Recognised-annotation tables.
//!
//! Classification is a plain membership test of an annotation's fully-qualified
//! name against four sets. Anything not in a set is simply "not that role"; unknown
//! annotations are never an error.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use sprig_config::AnnotationsConfig;
use sprig_core::SourceLocation;
use sprig_parse::simple_type_name;

const SPRING_BEAN_DEFINITIONS: &[&str] = &[
    "org.springframework.stereotype.Component",
    "org.springframework.stereotype.Service",
    "org.springframework.stereotype.Repository",
    "org.springframework.stereotype.Controller",
    "org.springframework.web.bind.annotation.RestController",
    "org.springframework.context.annotation.Configuration",
    "org.springframework.context.annotation.Bean",
];

const SPRING_INJECTIONS: &[&str] = &[
    "org.springframework.beans.factory.annotation.Autowired",
    "javax.inject.Inject",
    "jakarta.inject.Inject",
    "javax.annotation.Resource",
    "jakarta.annotation.Resource",
];

const SPRING_QUALIFIERS: &[&str] = &[
    "org.springframework.beans.factory.annotation.Qualifier",
    "javax.inject.Named",
    "jakarta.inject.Named",
];

const SPRING_PRIMARY: &[&str] = &["org.springframework.context.annotation.Primary"];

/// One annotation occurrence on a declaration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Annotation {
    /// Fully-qualified name when the file's imports allow resolving it, otherwise
    /// the name as written.
    pub fqn: String,
    /// Parameters by key; a single positional argument is stored as `value`.
    pub params: BTreeMap<String, String>,
    pub location: SourceLocation,
}

impl Annotation {
    pub fn new(fqn: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            fqn: fqn.into(),
            params: BTreeMap::new(),
            location,
        }
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// Value of `key` on `annotation`, or `None` when it was not written.
///
/// An explicitly empty value (`@Qualifier("")`) is returned as `Some("")`.
pub fn extract_annotation_parameter<'a>(annotation: &'a Annotation, key: &str) -> Option<&'a str> {
    annotation.param(key)
}

/// The role an annotation plays in bean wiring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationRole {
    BeanDefinition,
    Injection,
    Qualifier,
    Primary,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnotationTable {
    bean_definitions: BTreeSet<String>,
    injections: BTreeSet<String>,
    qualifiers: BTreeSet<String>,
    primary: BTreeSet<String>,
    match_simple_names: bool,
}

impl Default for AnnotationTable {
    fn default() -> Self {
        Self::spring()
    }
}

impl AnnotationTable {
    /// Tables with nothing recognised.
    pub fn empty() -> Self {
        Self {
            bean_definitions: BTreeSet::new(),
            injections: BTreeSet::new(),
            qualifiers: BTreeSet::new(),
            primary: BTreeSet::new(),
            match_simple_names: false,
        }
    }

    /// Spring stereotypes plus the JSR-330/JSR-250 injection annotations.
    pub fn spring() -> Self {
        fn set(names: &[&str]) -> BTreeSet<String> {
            names.iter().map(|name| (*name).to_string()).collect()
        }

        Self {
            bean_definitions: set(SPRING_BEAN_DEFINITIONS),
            injections: set(SPRING_INJECTIONS),
            qualifiers: set(SPRING_QUALIFIERS),
            primary: set(SPRING_PRIMARY),
            match_simple_names: false,
        }
    }

    pub fn from_config(config: &AnnotationsConfig) -> Self {
        let mut table = if config.extend_defaults {
            Self::spring()
        } else {
            Self::empty()
        };
        table.bean_definitions.extend(config.bean_definitions.iter().cloned());
        table.injections.extend(config.injections.iter().cloned());
        table.qualifiers.extend(config.qualifiers.iter().cloned());
        table.primary.extend(config.primary.iter().cloned());
        table.match_simple_names = config.match_simple_names;
        table
    }

    #[must_use]
    pub fn with_bean_definition(mut self, fqn: impl Into<String>) -> Self {
        self.bean_definitions.insert(fqn.into());
        self
    }

    #[must_use]
    pub fn with_injection(mut self, fqn: impl Into<String>) -> Self {
        self.injections.insert(fqn.into());
        self
    }

    #[must_use]
    pub fn with_qualifier(mut self, fqn: impl Into<String>) -> Self {
        self.qualifiers.insert(fqn.into());
        self
    }

    #[must_use]
    pub fn with_primary(mut self, fqn: impl Into<String>) -> Self {
        self.primary.insert(fqn.into());
        self
    }

    #[must_use]
    pub fn with_simple_name_matching(mut self, enabled: bool) -> Self {
        self.match_simple_names = enabled;
        self
    }

    pub fn is_bean_definition_annotation(&self, annotation: &Annotation) -> bool {
        self.in_set(&self.bean_definitions, &annotation.fqn)
    }

    pub fn is_injection_annotation(&self, annotation: &Annotation) -> bool {
        self.in_set(&self.injections, &annotation.fqn)
    }

    pub fn is_qualifier_annotation(&self, annotation: &Annotation) -> bool {
        self.in_set(&self.qualifiers, &annotation.fqn)
    }

    pub fn is_primary_annotation(&self, annotation: &Annotation) -> bool {
        self.in_set(&self.primary, &annotation.fqn)
    }

    /// Every role `fqn` is registered for, in a fixed order.
    pub fn roles(&self, fqn: &str) -> Vec<AnnotationRole> {
        [
            (AnnotationRole::BeanDefinition, &self.bean_definitions),
            (AnnotationRole::Injection, &self.injections),
            (AnnotationRole::Qualifier, &self.qualifiers),
            (AnnotationRole::Primary, &self.primary),
        ]
        .into_iter()
        .filter(|(_, set)| self.in_set(set, fqn))
        .map(|(role, _)| role)
        .collect()
    }

    /// Whether `fqn` is exactly one of the recognised names.
    ///
    /// Used while resolving on-demand imports, so it never falls back to simple
    /// names.
    pub fn recognizes(&self, fqn: &str) -> bool {
        [
            &self.bean_definitions,
            &self.injections,
            &self.qualifiers,
            &self.primary,
        ]
        .into_iter()
        .any(|set| set.contains(fqn))
    }

    fn in_set(&self, set: &BTreeSet<String>, name: &str) -> bool {
        if set.contains(name) {
            return true;
        }
        self.match_simple_names
            && !name.contains('.')
            && set.iter().any(|entry| simple_type_name(entry) == name)
    }
}
