use std::collections::HashMap;

use tree_sitter::Node;

use crate::{erase_type, name_node, node_text};

/// Name-resolution context of one compilation unit: its package, single-type and
/// on-demand imports, and the top-level types it declares.
///
/// This resolves names only as far as the file itself allows; it never consults
/// other files or a classpath.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImportScope {
    package: Option<String>,
    /// simple name -> fully-qualified name
    single: HashMap<String, String>,
    /// packages (or outer types) imported with `.*`
    on_demand: Vec<String>,
    /// simple name -> fully-qualified name of types declared at top level in this file
    declared: HashMap<String, String>,
}

impl ImportScope {
    /// Build the scope from a `program` root node.
    pub fn from_root(root: Node<'_>, source: &str) -> Self {
        let mut scope = ImportScope::default();
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            match child.kind() {
                "package_declaration" => {
                    let text = node_text(source, child);
                    let name = text
                        .trim()
                        .trim_start_matches("package")
                        .trim_end_matches(';');
                    // Package annotations precede the keyword; keep only the dotted name.
                    let name = name.rsplit(char::is_whitespace).next().unwrap_or(name);
                    let name = erase_type(name);
                    if !name.is_empty() {
                        scope.package = Some(name);
                    }
                }
                "import_declaration" => scope.add_import(node_text(source, child)),
                _ => {}
            }
        }

        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            if !child.kind().ends_with("_declaration")
                || matches!(child.kind(), "import_declaration" | "package_declaration")
            {
                continue;
            }
            if let Some(name) = name_node(child) {
                let simple = node_text(source, name).to_string();
                let fqn = scope.qualify(&simple);
                scope.declared.insert(simple, fqn);
            }
        }

        scope
    }

    fn add_import(&mut self, text: &str) {
        let body = text.trim().trim_start_matches("import").trim_end_matches(';');
        let body = body.trim();
        // Static imports name members, not types.
        if body.starts_with("static ") || body.starts_with("static\t") {
            return;
        }
        let body: String = body.split_whitespace().collect();
        if let Some(pkg) = body.strip_suffix(".*") {
            self.on_demand.push(pkg.to_string());
        } else if let Some((_, simple)) = body.rsplit_once('.') {
            self.single.insert(simple.to_string(), body.clone());
        }
    }

    pub fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    /// Qualify a name declared in this file with the file's package.
    pub fn qualify(&self, name: &str) -> String {
        match &self.package {
            Some(pkg) => format!("{pkg}.{name}"),
            None => name.to_string(),
        }
    }

    /// Resolve a written type reference.
    ///
    /// Qualified names are kept, single-type imports and same-file types are
    /// expanded, anything else stays a simple name.
    pub fn resolve_type(&self, raw: &str) -> String {
        let erased = erase_type(raw);
        let (head, tail) = match erased.split_once('.') {
            Some((head, tail)) => (head, Some(tail)),
            None => (erased.as_str(), None),
        };
        // `Outer.Inner` where `Outer` is imported or declared here.
        let base = self.single.get(head).or_else(|| self.declared.get(head));
        match (base, tail) {
            (Some(base), Some(tail)) => format!("{base}.{tail}"),
            (Some(base), None) => base.clone(),
            (None, _) => erased,
        }
    }

    /// Resolve an annotation name to its fully-qualified form.
    ///
    /// On-demand imports are ambiguous without a classpath, so a candidate from a
    /// `.*` import (or the file's own package) is only chosen when `is_known`
    /// recognises it. Unresolvable names are returned unchanged.
    pub fn resolve_annotation(&self, name: &str, is_known: impl Fn(&str) -> bool) -> String {
        if name.contains('.') {
            return self.resolve_type(name);
        }
        if let Some(fqn) = self.single.get(name).or_else(|| self.declared.get(name)) {
            return fqn.clone();
        }
        self.on_demand
            .iter()
            .map(String::as_str)
            .chain(self.package.as_deref())
            .map(|pkg| format!("{pkg}.{name}"))
            .find(|candidate| is_known(candidate))
            .unwrap_or_else(|| name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_java;
    use pretty_assertions::assert_eq;

    fn scope(src: &str) -> ImportScope {
        let tree = parse_java(src).expect("parse");
        ImportScope::from_root(tree.root_node(), src)
    }

    const SRC: &str = r#"
        package com.example.web;

        import com.example.service.PaymentService;
        import org.springframework.stereotype.*;
        import static java.util.Objects.requireNonNull;

        @Controller
        class CheckoutController {}

        interface Local {}
    "#;

    #[test]
    fn resolves_single_type_imports_and_local_types() {
        let scope = scope(SRC);
        assert_eq!(scope.package(), Some("com.example.web"));
        assert_eq!(
            scope.resolve_type("PaymentService"),
            "com.example.service.PaymentService"
        );
        assert_eq!(scope.resolve_type("Local"), "com.example.web.Local");
        assert_eq!(
            scope.resolve_type("List<PaymentService>"),
            "List",
            "unknown simple names stay simple"
        );
        assert_eq!(scope.resolve_type("requireNonNull"), "requireNonNull");
    }

    #[test]
    fn resolves_nested_references_through_imports() {
        let scope = scope(SRC);
        assert_eq!(
            scope.resolve_type("PaymentService.Mode"),
            "com.example.service.PaymentService.Mode"
        );
        assert_eq!(scope.resolve_type("java.util.Map"), "java.util.Map");
    }

    #[test]
    fn on_demand_annotation_imports_need_a_known_candidate() {
        let scope = scope(SRC);
        let known = |fqn: &str| fqn == "org.springframework.stereotype.Controller";
        assert_eq!(
            scope.resolve_annotation("Controller", known),
            "org.springframework.stereotype.Controller"
        );
        assert_eq!(scope.resolve_annotation("Unknown", known), "Unknown");
    }

    #[test]
    fn file_without_package_keeps_simple_names() {
        let scope = scope("class Foo {}");
        assert_eq!(scope.package(), None);
        assert_eq!(scope.qualify("Foo"), "Foo");
        assert_eq!(scope.resolve_type("Foo"), "Foo");
    }
}
