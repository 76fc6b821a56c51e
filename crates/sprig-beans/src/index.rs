use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use sprig_core::SourceLocation;
use sprig_parse::simple_type_name;

use crate::model::{BeanDefinition, BeanInjectionPoint};
use crate::resolve::is_type_match;

type Postings = HashMap<String, BTreeSet<SourceLocation>>;

/// All known bean definitions, keyed by location, with secondary lookups by type,
/// simple type name, bean name and qualifier.
///
/// Secondary maps hold locations only; the definition itself lives once in
/// `definitions`. Every mutation keeps all maps in step.
#[derive(Clone, Debug, Default)]
pub struct BeanIndex {
    definitions: BTreeMap<SourceLocation, Arc<BeanDefinition>>,
    by_type: Postings,
    by_simple_name: Postings,
    by_name: Postings,
    by_qualifier: Postings,
}

impl BeanIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Insert `def`, replacing any definition at the same location.
    pub fn add_definition(&mut self, def: BeanDefinition) -> Option<Arc<BeanDefinition>> {
        let previous = self.remove_definition(&def.location);
        let def = Arc::new(def);

        for ty in def.types() {
            post(&mut self.by_type, ty, &def.location);
            post(&mut self.by_simple_name, simple_type_name(ty), &def.location);
        }
        post(&mut self.by_name, &def.name, &def.location);
        for qualifier in &def.qualifiers {
            post(&mut self.by_qualifier, qualifier, &def.location);
        }

        tracing::trace!(
            target: "sprig.index",
            name = %def.name,
            ty = %def.ty,
            location = ?def.location,
            replaced = previous.is_some(),
            "indexed bean definition"
        );
        self.definitions.insert(def.location.clone(), def);
        previous
    }

    pub fn remove_definition(&mut self, location: &SourceLocation) -> Option<Arc<BeanDefinition>> {
        let def = self.definitions.remove(location)?;

        for ty in def.types() {
            unpost(&mut self.by_type, ty, location);
            unpost(&mut self.by_simple_name, simple_type_name(ty), location);
        }
        unpost(&mut self.by_name, &def.name, location);
        for qualifier in &def.qualifiers {
            unpost(&mut self.by_qualifier, qualifier, location);
        }

        tracing::trace!(target: "sprig.index", location = ?location, "removed bean definition");
        Some(def)
    }

    /// Remove every definition declared in `file`.
    pub fn remove_file(&mut self, file: &str) -> Vec<Arc<BeanDefinition>> {
        let locations: Vec<SourceLocation> = self
            .definitions
            .range(SourceLocation::file_start(file)..)
            .take_while(|(location, _)| location.file() == file)
            .map(|(location, _)| location.clone())
            .collect();

        locations
            .iter()
            .filter_map(|location| self.remove_definition(location))
            .collect()
    }

    /// Replace the definitions of `file` with `defs`.
    pub fn replace_file(&mut self, file: &str, defs: impl IntoIterator<Item = BeanDefinition>) {
        let removed = self.remove_file(file).len();
        let mut added = 0usize;
        for def in defs {
            debug_assert_eq!(def.location.file(), file);
            self.add_definition(def);
            added += 1;
        }
        tracing::debug!(target: "sprig.index", file, removed, added, "replaced file definitions");
    }

    /// Definitions whose type could satisfy `injection`, in location order.
    ///
    /// Every candidate is type compatible with the requested type; qualifiers,
    /// names and primary markers are left to the resolver.
    pub fn find_candidates(&self, injection: &BeanInjectionPoint) -> Vec<Arc<BeanDefinition>> {
        self.definitions_of_type(&injection.bean_type)
    }

    /// Definitions whose own or exposed type matches `ty` at a name-component boundary.
    pub fn definitions_of_type(&self, ty: &str) -> Vec<Arc<BeanDefinition>> {
        let mut locations: BTreeSet<&SourceLocation> =
            self.by_type.get(ty).into_iter().flatten().collect();
        // Same simple name, different qualification: only some of these line up.
        let similar = self
            .by_simple_name
            .get(simple_type_name(ty))
            .into_iter()
            .flatten()
            .filter(|location| !locations.contains(location))
            .filter(|location| {
                self.definitions.get(*location).is_some_and(|def| {
                    def.types().any(|candidate| is_type_match(candidate, ty))
                })
            })
            .collect::<Vec<_>>();
        locations.extend(similar);
        self.collect(locations)
    }

    pub fn definitions_named(&self, name: &str) -> Vec<Arc<BeanDefinition>> {
        self.collect(self.by_name.get(name).into_iter().flatten().collect())
    }

    pub fn definitions_qualified(&self, qualifier: &str) -> Vec<Arc<BeanDefinition>> {
        self.collect(self.by_qualifier.get(qualifier).into_iter().flatten().collect())
    }

    pub fn get(&self, location: &SourceLocation) -> Option<&Arc<BeanDefinition>> {
        self.definitions.get(location)
    }

    /// Definitions declared in `file`, in span order.
    pub fn definitions_in_file<'a, 'f>(
        &'a self,
        file: &'f str,
    ) -> impl Iterator<Item = &'a Arc<BeanDefinition>> + 'f
    where
        'a: 'f,
    {
        self.definitions
            .range(SourceLocation::file_start(file)..)
            .take_while(move |(location, _)| location.file() == file)
            .map(|(_, def)| def)
    }

    /// All definitions in location order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<BeanDefinition>> {
        self.definitions.values()
    }

    fn collect(&self, locations: BTreeSet<&SourceLocation>) -> Vec<Arc<BeanDefinition>> {
        locations
            .into_iter()
            .filter_map(|location| self.definitions.get(location).cloned())
            .collect()
    }
}

fn post(map: &mut Postings, key: &str, location: &SourceLocation) {
    map.entry(key.to_string())
        .or_default()
        .insert(location.clone());
}

fn unpost(map: &mut Postings, key: &str, location: &SourceLocation) {
    if let Some(set) = map.get_mut(key) {
        set.remove(location);
        if set.is_empty() {
            map.remove(key);
        }
    }
}
