//! Ranking bean definitions against an injection point.
//!
//! Everything here is a pure function of its inputs; the index is only read.

use serde::Serialize;

use crate::index::BeanIndex;
use crate::model::{BeanCandidate, BeanDefinition, BeanInjectionPoint, MatchReason, MatchResult};

type Rule = fn(&BeanDefinition, &BeanInjectionPoint) -> Option<MatchReason>;

/// Matching rules in priority order; the first rule that applies decides.
const RULES: &[Rule] = &[exact_qualifier, exact_name, type_compatible];

fn exact_qualifier(def: &BeanDefinition, injection: &BeanInjectionPoint) -> Option<MatchReason> {
    let qualifier = injection.qualifier.as_deref()?;
    def.qualifiers
        .contains(qualifier)
        .then_some(MatchReason::ExactQualifier)
}

fn exact_name(def: &BeanDefinition, injection: &BeanInjectionPoint) -> Option<MatchReason> {
    let name = injection.bean_name.as_deref()?;
    (def.name == name).then_some(MatchReason::ExactName)
}

fn type_compatible(def: &BeanDefinition, injection: &BeanInjectionPoint) -> Option<MatchReason> {
    if !def.types().any(|ty| is_type_match(ty, &injection.bean_type)) {
        return None;
    }
    Some(if def.is_primary {
        MatchReason::PrimaryBean
    } else {
        MatchReason::TypeMatch
    })
}

/// Match one definition against one injection point.
pub fn matches(def: &BeanDefinition, injection: &BeanInjectionPoint) -> MatchResult {
    RULES
        .iter()
        .find_map(|rule| rule(def, injection))
        .map(MatchResult::from)
        .unwrap_or(MatchResult::NO_MATCH)
}

/// Whether two type names denote the same type, allowing one side to be a
/// trailing component sequence of the other.
///
/// `com.example.UserService` matches `UserService` and `example.UserService`, but
/// not `BarUserService`. A bare leading dot (`.UserService`) is not a component.
pub fn is_type_match(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return false;
    }
    long.strip_suffix(short)
        .and_then(|prefix| prefix.strip_suffix('.'))
        .is_some_and(|package| !package.is_empty())
}

/// Every definition in `index` that satisfies `injection`, best first.
///
/// Candidates with equal scores keep index (location) order. An empty result
/// means nothing matched; several entries sharing the top score mean the
/// injection is ambiguous. Neither is an error.
pub fn resolve(injection: &BeanInjectionPoint, index: &BeanIndex) -> Vec<BeanCandidate> {
    let mut candidates: Vec<BeanCandidate> = index
        .find_candidates(injection)
        .into_iter()
        .map(|definition| {
            let result = matches(&definition, injection);
            BeanCandidate { definition, result }
        })
        .filter(|candidate| candidate.result.is_match())
        .collect();
    candidates.sort_by(|a, b| b.score().cmp(&a.score()));
    candidates
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionOutcome {
    Unresolved,
    Unique,
    Ambiguous,
}

/// The ranked candidates for one injection point.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Resolution {
    candidates: Vec<BeanCandidate>,
}

impl Resolution {
    pub fn new(injection: &BeanInjectionPoint, index: &BeanIndex) -> Self {
        Self {
            candidates: resolve(injection, index),
        }
    }

    pub fn candidates(&self) -> &[BeanCandidate] {
        &self.candidates
    }

    /// The candidates sharing the highest score.
    pub fn best(&self) -> &[BeanCandidate] {
        let Some(top) = self.candidates.first().map(BeanCandidate::score) else {
            return &[];
        };
        let end = self
            .candidates
            .iter()
            .position(|candidate| candidate.score() != top)
            .unwrap_or(self.candidates.len());
        &self.candidates[..end]
    }

    pub fn outcome(&self) -> ResolutionOutcome {
        match self.best().len() {
            0 => ResolutionOutcome::Unresolved,
            1 => ResolutionOutcome::Unique,
            _ => ResolutionOutcome::Ambiguous,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use sprig_core::{SourceLocation, Span};

    fn loc(file: &str) -> SourceLocation {
        SourceLocation::new(file, Span::new(10, 20))
    }

    fn summary(candidates: &[BeanCandidate]) -> Vec<(&str, u32)> {
        candidates
            .iter()
            .map(|candidate| (candidate.definition.name.as_str(), candidate.score()))
            .collect()
    }

    fn payment_index() -> BeanIndex {
        let mut index = BeanIndex::new();
        index.add_definition(
            BeanDefinition::new("payPalPaymentService", "com.shop.PayPalPaymentService", loc("PayPal.java"))
                .with_exposed_type("com.shop.PaymentService")
                .with_qualifier("paypal"),
        );
        index.add_definition(
            BeanDefinition::new("stripePaymentService", "com.shop.StripePaymentService", loc("Stripe.java"))
                .with_exposed_type("com.shop.PaymentService")
                .with_primary(true),
        );
        index
    }

    #[test]
    fn type_match_examples() {
        assert!(is_type_match("com.example.UserService", "UserService"));
        assert!(is_type_match("UserService", "com.example.UserService"));
        assert!(is_type_match("example.UserService", "com.example.UserService"));
        assert!(is_type_match("UserService", "UserService"));
        assert!(!is_type_match("com.example.BarUserService", "UserService"));
        assert!(!is_type_match("com.a.UserService", "com.b.UserService"));
        assert!(!is_type_match("", "com.example.UserService"));
        assert!(!is_type_match(".UserService", "UserService"));
    }

    #[test]
    fn rules_apply_in_priority_order() {
        let def = BeanDefinition::new("fastCache", "com.x.Cache", loc("Cache.java"))
            .with_qualifier("fast")
            .with_primary(true);
        let base = BeanInjectionPoint::new("Cache", loc("User.java"));

        let qualified = base.clone().with_qualifier("fast").with_bean_name("fastCache");
        assert_eq!(matches(&def, &qualified).reason, Some(MatchReason::ExactQualifier));

        let named = base.clone().with_bean_name("fastCache");
        assert_eq!(matches(&def, &named).reason, Some(MatchReason::ExactName));

        assert_eq!(matches(&def, &base).reason, Some(MatchReason::PrimaryBean));
        assert_eq!(
            matches(&def.clone().with_primary(false), &base).reason,
            Some(MatchReason::TypeMatch)
        );

        let unrelated = BeanInjectionPoint::new("com.x.Queue", loc("User.java"));
        assert_eq!(matches(&def, &unrelated), MatchResult::NO_MATCH);
    }

    #[test]
    fn empty_qualifier_is_not_a_qualifier_match() {
        let def = BeanDefinition::new("cache", "Cache", loc("Cache.java")).with_qualifier("");
        let inj = BeanInjectionPoint::new("Cache", loc("User.java")).with_qualifier("");
        assert_eq!(matches(&def, &inj).reason, Some(MatchReason::TypeMatch));
    }

    #[test]
    fn primary_payment_service_wins_without_qualifier() {
        let index = payment_index();
        let inj = BeanInjectionPoint::new("PaymentService", loc("Checkout.java"));

        let resolution = Resolution::new(&inj, &index);
        assert_eq!(
            summary(resolution.candidates()),
            vec![("stripePaymentService", 80), ("payPalPaymentService", 70)]
        );
        assert_eq!(resolution.outcome(), ResolutionOutcome::Unique);
        assert_eq!(summary(resolution.best()), vec![("stripePaymentService", 80)]);
    }

    #[test]
    fn qualifier_selects_paypal() {
        let index = payment_index();
        let inj = BeanInjectionPoint::new("PaymentService", loc("Checkout.java")).with_qualifier("paypal");

        let resolution = Resolution::new(&inj, &index);
        assert_eq!(
            summary(resolution.candidates()),
            vec![("payPalPaymentService", 100), ("stripePaymentService", 80)]
        );
        assert_eq!(summary(resolution.best()), vec![("payPalPaymentService", 100)]);
    }

    #[test]
    fn single_implementation_resolves_by_type() {
        let mut index = BeanIndex::new();
        index.add_definition(
            BeanDefinition::new("jpaUserRepository", "com.app.JpaUserRepository", loc("Jpa.java"))
                .with_exposed_type("com.app.UserRepository"),
        );
        let inj = BeanInjectionPoint::new("com.app.UserRepository", loc("Service.java"));

        let resolution = Resolution::new(&inj, &index);
        assert_eq!(summary(resolution.candidates()), vec![("jpaUserRepository", 70)]);
        assert_eq!(
            resolution.candidates()[0].result.reason,
            Some(MatchReason::TypeMatch)
        );
    }

    #[test]
    fn equal_scores_are_ambiguous_and_keep_location_order() {
        let mut index = BeanIndex::new();
        index.add_definition(BeanDefinition::new("b", "com.x.Clock", loc("b/Clock.java")));
        index.add_definition(BeanDefinition::new("a", "com.x.Clock", loc("a/Clock.java")));
        let inj = BeanInjectionPoint::new("Clock", loc("User.java"));

        let resolution = Resolution::new(&inj, &index);
        assert_eq!(summary(resolution.candidates()), vec![("a", 70), ("b", 70)]);
        assert_eq!(resolution.outcome(), ResolutionOutcome::Ambiguous);
    }

    #[test]
    fn same_simple_name_in_another_package_never_wins() {
        let mut index = BeanIndex::new();
        index.add_definition(
            BeanDefinition::new("bStore", "com.b.Store", loc("b/Store.java")).with_qualifier("fast"),
        );
        index.add_definition(BeanDefinition::new("aStore", "com.a.Store", loc("a/Store.java")));

        let qualified = BeanInjectionPoint::new("com.a.Store", loc("User.java")).with_qualifier("fast");
        assert_eq!(summary(&resolve(&qualified, &index)), vec![("aStore", 70)]);

        let named = BeanInjectionPoint::new("com.a.Store", loc("User.java")).with_bean_name("bStore");
        assert_eq!(summary(&resolve(&named, &index)), vec![("aStore", 70)]);

        for candidate in resolve(&BeanInjectionPoint::new("Store", loc("User.java")), &index) {
            assert!(candidate.definition.types().any(|ty| is_type_match(ty, "Store")));
        }
    }

    #[test]
    fn nothing_matching_is_unresolved() {
        let index = payment_index();
        let inj = BeanInjectionPoint::new("com.shop.Ledger", loc("Checkout.java"));
        let resolution = Resolution::new(&inj, &index);
        assert!(resolution.candidates().is_empty());
        assert!(resolution.best().is_empty());
        assert_eq!(resolution.outcome(), ResolutionOutcome::Unresolved);
    }

    fn type_name() -> impl Strategy<Value = String> {
        prop::collection::vec("[A-C][a-c]{0,2}", 1..4).prop_map(|parts| parts.join("."))
    }

    proptest! {
        #[test]
        fn type_match_is_symmetric(a in type_name(), b in type_name()) {
            prop_assert_eq!(is_type_match(&a, &b), is_type_match(&b, &a));
        }

        #[test]
        fn qualified_name_matches_its_simple_name(package in type_name(), simple in "[A-C][a-c]{0,2}") {
            let fqn = format!("{package}.{simple}");
            prop_assert!(is_type_match(&fqn, &simple));
            let prefixed = format!("X{simple}");
            let dotted = format!(".{prefixed}");
            prop_assert!(!is_type_match(&fqn, &prefixed) || fqn.ends_with(&dotted));
        }

        #[test]
        fn resolve_returns_only_matches_sorted_by_score(
            specs in prop::collection::vec((0usize..3, any::<bool>(), any::<bool>(), any::<bool>()), 0..8),
            qualified in any::<bool>(),
            named in any::<bool>(),
        ) {
            const TYPES: [&str; 3] = ["com.x.Repo", "Repo", "com.x.Other"];
            let mut index = BeanIndex::new();
            for (i, (ty, primary, with_qualifier, name_it)) in specs.into_iter().enumerate() {
                let name = if name_it { "target".to_string() } else { format!("bean{i}") };
                let mut def = BeanDefinition::new(name, TYPES[ty], SourceLocation::new("F.java", Span::new(i, i + 1)))
                    .with_primary(primary);
                if with_qualifier {
                    def = def.with_qualifier("q");
                }
                index.add_definition(def);
            }
            let mut inj = BeanInjectionPoint::new("Repo", SourceLocation::file_start("U.java"));
            if qualified {
                inj = inj.with_qualifier("q");
            }
            if named {
                inj = inj.with_bean_name("target");
            }

            let candidates = resolve(&inj, &index);
            for candidate in &candidates {
                prop_assert!(candidate.result.is_match());
                prop_assert!(candidate.score() > 0);
                prop_assert_eq!(candidate.result, matches(&candidate.definition, &inj));
            }
            for pair in candidates.windows(2) {
                prop_assert!(pair[0].score() >= pair[1].score());
            }
        }
    }
}
