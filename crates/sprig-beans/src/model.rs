use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use sprig_core::SourceLocation;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionKind {
    /// A type carrying a bean-definition annotation.
    Component,
    /// A method carrying a bean-definition annotation; the bean type is its return type.
    FactoryMethod,
}

/// A bean the container would register.
///
/// Identity is [`BeanDefinition::location`]; name and type may be shared with other
/// definitions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BeanDefinition {
    pub name: String,
    /// Fully-qualified type name (or the simple name when it could not be qualified).
    pub ty: String,
    /// Directly declared supertypes (`extends` / `implements`) the bean can also be
    /// injected as.
    pub exposed_types: Vec<String>,
    pub qualifiers: BTreeSet<String>,
    pub is_primary: bool,
    pub kind: DefinitionKind,
    pub location: SourceLocation,
}

impl BeanDefinition {
    pub fn new(name: impl Into<String>, ty: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            exposed_types: Vec::new(),
            qualifiers: BTreeSet::new(),
            is_primary: false,
            kind: DefinitionKind::Component,
            location,
        }
    }

    /// Add a qualifier. Empty qualifiers are dropped; they can never be matched.
    #[must_use]
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        let qualifier = qualifier.into();
        if !qualifier.is_empty() {
            self.qualifiers.insert(qualifier);
        }
        self
    }

    #[must_use]
    pub fn with_primary(mut self, is_primary: bool) -> Self {
        self.is_primary = is_primary;
        self
    }

    #[must_use]
    pub fn with_exposed_type(mut self, ty: impl Into<String>) -> Self {
        let ty = ty.into();
        if !ty.is_empty() && ty != self.ty && !self.exposed_types.contains(&ty) {
            self.exposed_types.push(ty);
        }
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: DefinitionKind) -> Self {
        self.kind = kind;
        self
    }

    /// The bean's own type followed by its exposed supertypes.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.ty.as_str()).chain(self.exposed_types.iter().map(String::as_str))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectionKind {
    Field,
    ConstructorParameter,
    MethodParameter,
}

/// A site that asks the container for a bean.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BeanInjectionPoint {
    /// Requested type, fully-qualified or simple.
    pub bean_type: String,
    /// Explicitly requested bean name (e.g. `@Resource(name = "...")`).
    pub bean_name: Option<String>,
    /// Qualifier value. `Some("")` (written but empty) is distinct from `None`.
    pub qualifier: Option<String>,
    pub kind: InjectionKind,
    /// Fully-qualified name of the declaring type; empty when unknown.
    pub owner: String,
    pub location: SourceLocation,
}

impl BeanInjectionPoint {
    pub fn new(bean_type: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            bean_type: bean_type.into(),
            bean_name: None,
            qualifier: None,
            kind: InjectionKind::Field,
            owner: String::new(),
            location,
        }
    }

    #[must_use]
    pub fn with_bean_name(mut self, name: impl Into<String>) -> Self {
        self.bean_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: InjectionKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }
}

/// Why a definition satisfies an injection point, strongest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchReason {
    ExactQualifier,
    ExactName,
    PrimaryBean,
    TypeMatch,
}

impl MatchReason {
    pub const fn score(self) -> u32 {
        match self {
            MatchReason::ExactQualifier => 100,
            MatchReason::ExactName => 90,
            MatchReason::PrimaryBean => 80,
            MatchReason::TypeMatch => 70,
        }
    }
}

/// Outcome of matching one definition against one injection point.
///
/// A match always has a reason and a positive score; a non-match has neither.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub score: u32,
    pub reason: Option<MatchReason>,
}

impl MatchResult {
    pub const NO_MATCH: MatchResult = MatchResult {
        score: 0,
        reason: None,
    };

    pub const fn is_match(&self) -> bool {
        self.reason.is_some()
    }
}

impl From<MatchReason> for MatchResult {
    fn from(reason: MatchReason) -> Self {
        Self {
            score: reason.score(),
            reason: Some(reason),
        }
    }
}

/// A definition together with how well it matched a particular injection point.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BeanCandidate {
    pub definition: Arc<BeanDefinition>,
    pub result: MatchResult,
}

impl BeanCandidate {
    pub fn score(&self) -> u32 {
        self.result.score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reason_scores_are_strictly_ordered() {
        let scores: Vec<u32> = [
            MatchReason::ExactQualifier,
            MatchReason::ExactName,
            MatchReason::PrimaryBean,
            MatchReason::TypeMatch,
        ]
        .into_iter()
        .map(MatchReason::score)
        .collect();
        assert_eq!(scores, vec![100, 90, 80, 70]);
    }

    #[test]
    fn match_result_invariant() {
        assert!(!MatchResult::NO_MATCH.is_match());
        assert_eq!(MatchResult::NO_MATCH.score, 0);

        let result = MatchResult::from(MatchReason::PrimaryBean);
        assert!(result.is_match());
        assert!(result.score > 0);
    }

    #[test]
    fn definition_builders_skip_empty_and_duplicate_entries() {
        let def = BeanDefinition::new("a", "com.example.A", SourceLocation::file_start("A.java"))
            .with_qualifier("")
            .with_qualifier("fast")
            .with_exposed_type("com.example.A")
            .with_exposed_type("com.example.Api")
            .with_exposed_type("com.example.Api");
        assert_eq!(def.qualifiers.iter().collect::<Vec<_>>(), vec!["fast"]);
        assert_eq!(
            def.types().collect::<Vec<_>>(),
            vec!["com.example.A", "com.example.Api"]
        );
    }

    #[test]
    fn injection_keeps_empty_qualifier() {
        let inj = BeanInjectionPoint::new("Foo", SourceLocation::file_start("B.java"))
            .with_qualifier("");
        assert_eq!(inj.qualifier.as_deref(), Some(""));
        assert_eq!(inj.bean_name, None);
    }
}
