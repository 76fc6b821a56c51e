//! Extract bean definitions and injection points from Java sources.

use std::path::Path;
use std::sync::Arc;

use sprig_core::{SourceLocation, Span};
use sprig_parse::{
    array_elements, collect_annotations, find_named_child, modifier_node, name_node, node_span,
    node_text, parse_java, ImportScope,
};
use thiserror::Error;
use tree_sitter::Node;

use crate::annotations::{Annotation, AnnotationTable};
use crate::model::{BeanDefinition, BeanInjectionPoint, DefinitionKind, InjectionKind};

const TYPE_DECLARATIONS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "record_declaration",
    "enum_declaration",
];

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to parse {file}: {message}")]
    Parse { file: String, message: String },
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// One Java compilation unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JavaSource {
    pub path: Arc<str>,
    pub text: String,
}

impl JavaSource {
    pub fn new(path: impl Into<Arc<str>>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    /// Read a file from disk; `path` is also used as the source's identity.
    pub fn read(path: &Path) -> Result<Self, ScanError> {
        let text = std::fs::read_to_string(path).map_err(|source| ScanError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::new(path.to_string_lossy().as_ref(), text))
    }
}

/// Everything the scanner found in one file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileScan {
    pub file: Arc<str>,
    pub definitions: Vec<BeanDefinition>,
    pub injections: Vec<BeanInjectionPoint>,
}

#[derive(Clone, Debug, Default)]
pub struct BeanScanner {
    table: AnnotationTable,
}

impl BeanScanner {
    pub fn new(table: AnnotationTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &AnnotationTable {
        &self.table
    }

    pub fn scan(&self, source: &JavaSource) -> Result<FileScan, ScanError> {
        let tree = parse_java(&source.text).map_err(|message| ScanError::Parse {
            file: source.path.to_string(),
            message,
        })?;
        let root = tree.root_node();

        let mut cx = ScanContext {
            table: &self.table,
            scope: ImportScope::from_root(root, &source.text),
            source: &source.text,
            file: source.path.clone(),
            out: FileScan {
                file: source.path.clone(),
                ..FileScan::default()
            },
        };

        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            if TYPE_DECLARATIONS.contains(&child.kind()) {
                cx.type_declaration(child, None);
            }
        }

        tracing::trace!(
            target: "sprig.scan",
            file = %source.path,
            definitions = cx.out.definitions.len(),
            injections = cx.out.injections.len(),
            had_errors = root.has_error(),
            "scanned java source"
        );
        Ok(cx.out)
    }
}

struct ScanContext<'a> {
    table: &'a AnnotationTable,
    scope: ImportScope,
    source: &'a str,
    file: Arc<str>,
    out: FileScan,
}

/// A constructor or method whose parameters are injection candidates.
struct Invocable<'t> {
    params: Vec<Node<'t>>,
    annotations: Vec<Annotation>,
}

impl<'a> ScanContext<'a> {
    fn location(&self, span: Span) -> SourceLocation {
        SourceLocation::new(self.file.clone(), span)
    }

    fn annotations(&self, node: Node<'_>) -> Vec<Annotation> {
        let Some(modifiers) = modifier_node(node) else {
            return Vec::new();
        };
        collect_annotations(modifiers, self.source)
            .into_iter()
            .map(|parsed| Annotation {
                fqn: self
                    .scope
                    .resolve_annotation(&parsed.name, |candidate| self.table.recognizes(candidate)),
                params: parsed.args,
                location: self.location(parsed.span),
            })
            .collect()
    }

    fn type_declaration(&mut self, node: Node<'_>, outer: Option<&str>) {
        let Some(name) = name_node(node) else {
            return;
        };
        let simple = node_text(self.source, name);
        let fqn = match outer {
            Some(outer) => format!("{outer}.{simple}"),
            None => self.scope.qualify(simple),
        };
        let annotations = self.annotations(node);

        let is_bean = annotations
            .iter()
            .any(|a| self.table.is_bean_definition_annotation(a));
        if is_bean {
            let short_name = match self.scope.package() {
                Some(pkg) => fqn
                    .strip_prefix(pkg)
                    .map(|rest| rest.trim_start_matches('.'))
                    .unwrap_or(fqn.as_str()),
                None => fqn.as_str(),
            };
            let name_default = decapitalize(short_name);
            let mut def = self.definition(&annotations, name_default, fqn.clone(), node_span(name));
            for supertype in supertype_nodes(node) {
                def = def.with_exposed_type(self.scope.resolve_type(node_text(self.source, supertype)));
            }
            tracing::trace!(target: "sprig.scan", name = %def.name, ty = %def.ty, "bean class");
            self.out.definitions.push(def);
        }

        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        let members = match body.kind() {
            "enum_body" => find_named_child(body, "enum_body_declarations"),
            _ => Some(body),
        };
        let Some(members) = members else {
            return;
        };

        let mut constructors = Vec::new();
        let mut cursor = members.walk();
        for member in members.named_children(&mut cursor) {
            match member.kind() {
                "field_declaration" => self.field(member, &fqn),
                "constructor_declaration" => constructors.push(self.invocable(member)),
                "method_declaration" => self.method(member, &fqn),
                kind if TYPE_DECLARATIONS.contains(&kind) => self.type_declaration(member, Some(&fqn)),
                _ => {}
            }
        }

        self.constructor_injections(node, is_bean, constructors, &fqn);
    }

    /// Build a definition from the annotations on a class or factory method.
    fn definition(
        &self,
        annotations: &[Annotation],
        default_name: String,
        ty: String,
        span: Span,
    ) -> BeanDefinition {
        let explicit_name = annotations
            .iter()
            .filter(|a| self.table.is_bean_definition_annotation(a))
            .find_map(|a| {
                let value = a.param("name").or_else(|| a.param("value"))?;
                array_elements(value).into_iter().find(|name| !name.is_empty())
            });

        let mut def = BeanDefinition::new(
            explicit_name.unwrap_or(default_name),
            ty,
            self.location(span),
        )
        .with_primary(annotations.iter().any(|a| self.table.is_primary_annotation(a)));
        for qualifier in annotations
            .iter()
            .filter(|a| self.table.is_qualifier_annotation(a))
            .filter_map(|a| a.param("value"))
        {
            def = def.with_qualifier(qualifier);
        }
        def
    }

    fn field(&mut self, node: Node<'_>, owner: &str) {
        let annotations = self.annotations(node);
        let Some(marker) = annotations
            .iter()
            .find(|a| self.table.is_injection_annotation(a))
        else {
            return;
        };
        let Some(ty) = node
            .child_by_field_name("type")
            .or_else(|| infer_type_node(node, "variable_declarator"))
        else {
            return;
        };
        let bean_type = self.scope.resolve_type(node_text(self.source, ty));
        let qualifier = self.qualifier(&annotations);
        let bean_name = requested_name(marker);

        let mut cursor = node.walk();
        for declarator in node.named_children(&mut cursor) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let Some(name) = name_node(declarator) else {
                continue;
            };
            let mut injection =
                BeanInjectionPoint::new(bean_type.clone(), self.location(node_span(name)))
                    .with_kind(InjectionKind::Field)
                    .with_owner(owner);
            injection.qualifier = qualifier.clone();
            injection.bean_name = bean_name.clone();
            self.out.injections.push(injection);
        }
    }

    fn method(&mut self, node: Node<'_>, owner: &str) {
        let annotations = self.annotations(node);
        let is_factory = annotations
            .iter()
            .any(|a| self.table.is_bean_definition_annotation(a));
        let injection_marker = annotations
            .iter()
            .find(|a| self.table.is_injection_annotation(a));
        if !is_factory && injection_marker.is_none() {
            return;
        }

        if is_factory {
            if let Some(def) = self.factory_method(node, &annotations) {
                self.out.definitions.push(def);
            }
        }

        // Setter-style injection lets method-level qualifiers and names apply to
        // parameters; factory method parameters only carry their own.
        let inherited_qualifier = injection_marker.and_then(|_| self.qualifier(&annotations));
        let inherited_name = injection_marker.and_then(requested_name);
        let invocable = self.invocable(node);
        for param in invocable.params {
            self.parameter(
                param,
                owner,
                InjectionKind::MethodParameter,
                inherited_qualifier.as_deref(),
                inherited_name.as_deref(),
            );
        }
    }

    fn factory_method(&self, node: Node<'_>, annotations: &[Annotation]) -> Option<BeanDefinition> {
        let name = name_node(node)?;
        let return_type = node
            .child_by_field_name("type")
            .or_else(|| infer_type_node(node, "identifier"))?;
        if return_type.kind() == "void_type" {
            return None;
        }
        let ty = self.scope.resolve_type(node_text(self.source, return_type));
        let def = self
            .definition(
                annotations,
                node_text(self.source, name).to_string(),
                ty,
                node_span(name),
            )
            .with_kind(DefinitionKind::FactoryMethod);
        tracing::trace!(target: "sprig.scan", name = %def.name, ty = %def.ty, "factory method");
        Some(def)
    }

    fn invocable<'t>(&self, node: Node<'t>) -> Invocable<'t> {
        let params = node
            .child_by_field_name("parameters")
            .or_else(|| find_named_child(node, "formal_parameters"))
            .map(formal_parameters)
            .unwrap_or_default();
        Invocable {
            params,
            annotations: self.annotations(node),
        }
    }

    fn constructor_injections(
        &mut self,
        node: Node<'_>,
        is_bean: bool,
        constructors: Vec<Invocable<'_>>,
        owner: &str,
    ) {
        let annotated: Vec<&Invocable<'_>> = constructors
            .iter()
            .filter(|ctor| {
                ctor.annotations
                    .iter()
                    .any(|a| self.table.is_injection_annotation(a))
            })
            .collect();

        let params: Vec<Node<'_>> = if !annotated.is_empty() {
            annotated.into_iter().flat_map(|ctor| ctor.params.iter().copied()).collect()
        } else if !is_bean {
            Vec::new()
        } else if constructors.len() == 1 {
            constructors[0].params.clone()
        } else if constructors.is_empty() && node.kind() == "record_declaration" {
            // A record bean is built through its canonical constructor.
            node.child_by_field_name("parameters")
                .or_else(|| find_named_child(node, "formal_parameters"))
                .map(formal_parameters)
                .unwrap_or_default()
        } else {
            Vec::new()
        };

        for param in params {
            self.parameter(param, owner, InjectionKind::ConstructorParameter, None, None);
        }
    }

    fn parameter(
        &mut self,
        node: Node<'_>,
        owner: &str,
        kind: InjectionKind,
        inherited_qualifier: Option<&str>,
        inherited_name: Option<&str>,
    ) {
        let name = name_node(node)
            .or_else(|| find_named_child(node, "variable_declarator").and_then(name_node));
        let Some(name) = name else {
            return;
        };
        let Some(ty) = node
            .child_by_field_name("type")
            .or_else(|| infer_type_node(node, "identifier"))
        else {
            return;
        };
        let annotations = self.annotations(node);
        let bean_type = self.scope.resolve_type(node_text(self.source, ty));

        let mut injection = BeanInjectionPoint::new(bean_type, self.location(node_span(name)))
            .with_kind(kind)
            .with_owner(owner);
        injection.qualifier = self
            .qualifier(&annotations)
            .or_else(|| inherited_qualifier.map(str::to_string));
        injection.bean_name = annotations
            .iter()
            .filter(|a| self.table.is_injection_annotation(a))
            .find_map(requested_name)
            .or_else(|| inherited_name.map(str::to_string));
        self.out.injections.push(injection);
    }

    /// The qualifier written on an element. A marker without a value yields `""`.
    fn qualifier(&self, annotations: &[Annotation]) -> Option<String> {
        annotations
            .iter()
            .find(|a| self.table.is_qualifier_annotation(a))
            .map(|a| a.param("value").unwrap_or_default().to_string())
    }
}

fn requested_name(marker: &Annotation) -> Option<String> {
    marker
        .param("name")
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

fn formal_parameters(params: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = params.walk();
    let nodes = params
        .named_children(&mut cursor)
        .filter(|child| matches!(child.kind(), "formal_parameter" | "spread_parameter"))
        .collect();
    nodes
}

/// Type nodes written in a declaration's `extends` / `implements` clauses.
fn supertype_nodes(node: Node<'_>) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    let mut cursor = node.walk();
    for clause in node.named_children(&mut cursor) {
        if !matches!(
            clause.kind(),
            "superclass" | "super_interfaces" | "extends_interfaces"
        ) {
            continue;
        }
        let mut clause_cursor = clause.walk();
        for child in clause.named_children(&mut clause_cursor) {
            if child.kind() == "type_list" {
                let mut list_cursor = child.walk();
                out.extend(child.named_children(&mut list_cursor));
            } else {
                out.push(child);
            }
        }
    }
    out
}

/// The first child that is neither a modifier nor the `stop` node; the grammar
/// does not always expose the type as a field.
fn infer_type_node<'t>(node: Node<'t>, stop: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            k if k == "modifiers" || k.ends_with("annotation") || k == "type_parameters" => continue,
            k if k == stop => break,
            _ => return Some(child),
        }
    }
    None
}

/// Default bean name for a type: the short class name with a lower-case first
/// letter, unless it starts with two capitals (`URLService` stays as is).
pub fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    if chars.next().is_some_and(char::is_uppercase) && first.is_uppercase() {
        return name.to_string();
    }
    let mut out = String::with_capacity(name.len());
    out.extend(first.to_lowercase());
    out.push_str(&name[first.len_utf8()..]);
    out
}
