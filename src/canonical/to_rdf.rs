//! JSON-LD to RDF conversion.
//!
//! Covers the subset of JSON-LD 1.1 that composed vocabularies and entity
//! documents use: inline contexts (objects and arrays), `@vocab`, `@base`,
//! `@language`, compact IRIs, keyword aliases, type coercion, `@list`,
//! `@set` and `@language` containers, value objects, `@nest`, embedded and
//! term-scoped contexts, `@propagate` and `@graph`.
//!
//! Anything outside that subset is an error, never a silent guess: remote
//! contexts, `@reverse`, `@included`, `@json`, `@import`, and index/id/type
//! maps.
//!
//! Two deliberate departures from JSON-LD:
//! - A term definition object that carries no term-definition keyword
//!   (`{"data": {"name": "...", ...}}`) is a property-scoped context: the
//!   term behaves like `@nest` and its value's keys are read against the
//!   embedded mapping. This is the shape `property_scoped` composition emits.
//! - Relative IRIs with no `@base` are kept verbatim instead of dropped.

use std::collections::HashMap;

use serde_json::{Map, Number, Value};
use tracing::warn;
use url::Url;

use crate::canonical::rdf::{
    Quad, Term, RDF_FIRST, RDF_NIL, RDF_REST, RDF_TYPE, XSD_BOOLEAN, XSD_DOUBLE, XSD_INTEGER,
    XSD_STRING,
};
use crate::canonical::CanonicalizationError;

const MAX_CONTEXT_DEPTH: usize = 32;

const KEYWORDS: &[&str] = &[
    "@base",
    "@container",
    "@context",
    "@direction",
    "@graph",
    "@id",
    "@import",
    "@included",
    "@index",
    "@json",
    "@language",
    "@list",
    "@nest",
    "@none",
    "@prefix",
    "@propagate",
    "@protected",
    "@reverse",
    "@set",
    "@type",
    "@value",
    "@version",
    "@vocab",
];

// Keys that make an object a term definition rather than an embedded context.
const TERM_DEFINITION_KEYS: &[&str] = &[
    "@id",
    "@reverse",
    "@type",
    "@container",
    "@language",
    "@context",
    "@nest",
    "@index",
    "@prefix",
    "@protected",
    "@direction",
];

fn is_keyword(value: &str) -> bool {
    KEYWORDS.contains(&value)
}

#[derive(Debug, Clone, PartialEq)]
enum Coercion {
    Id,
    Vocab,
    Datatype(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Container {
    None,
    List,
    Set,
    Language,
}

#[derive(Debug, Clone, PartialEq)]
enum Mapping {
    Iri(String),
    Keyword(String),
    /// Property-scoped embedded context, read like `@nest`.
    Nest,
    /// Explicitly undefined; the key is dropped.
    Null,
}

#[derive(Debug, Clone)]
struct TermDefinition {
    mapping: Mapping,
    coercion: Option<Coercion>,
    container: Container,
    /// `Some(None)` resets the default language for this term.
    language: Option<Option<String>>,
    scoped: Option<Value>,
}

impl TermDefinition {
    fn with_mapping(mapping: Mapping) -> Self {
        Self {
            mapping,
            coercion: None,
            container: Container::None,
            language: None,
            scoped: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expanded {
    Keyword(String),
    Iri(String),
    Blank(String),
}

#[derive(Debug, Clone, Default)]
struct ActiveContext {
    terms: HashMap<String, TermDefinition>,
    vocab: Option<String>,
    base: Option<String>,
    language: Option<String>,
    /// Set by `@propagate: false`; nested node objects revert to it.
    previous: Option<Box<ActiveContext>>,
}

impl ActiveContext {
    fn propagated(&self) -> &ActiveContext {
        self.previous.as_deref().unwrap_or(self)
    }

    fn apply(&self, local: &Value, depth: usize) -> Result<ActiveContext, CanonicalizationError> {
        if depth > MAX_CONTEXT_DEPTH {
            return Err(CanonicalizationError::InvalidContext(
                "scoped contexts nested too deeply".into(),
            ));
        }

        let layers: Vec<&Value> = match local {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };

        let mut result = self.clone();
        let propagate = layers
            .iter()
            .all(|layer| layer.get("@propagate").and_then(Value::as_bool) != Some(false));
        if !propagate && result.previous.is_none() {
            result.previous = Some(Box::new(self.clone()));
        }

        for layer in layers {
            match layer {
                Value::Null => {
                    result = ActiveContext {
                        base: result.base.take(),
                        previous: result.previous.take(),
                        ..ActiveContext::default()
                    };
                }
                Value::String(iri) => return Err(CanonicalizationError::RemoteContext(iri.clone())),
                Value::Object(map) => result.merge_local(map, depth)?,
                other => {
                    return Err(CanonicalizationError::InvalidContext(format!(
                        "context entries must be objects, got {other}"
                    )))
                }
            }
        }
        Ok(result)
    }

    fn merge_local(
        &mut self,
        local: &Map<String, Value>,
        depth: usize,
    ) -> Result<(), CanonicalizationError> {
        if local.contains_key("@import") {
            return Err(CanonicalizationError::Unsupported("@import".into()));
        }

        match local.get("@base") {
            None => {}
            Some(Value::Null) => self.base = None,
            Some(Value::String(base)) => self.base = Some(self.resolve_relative(base)),
            Some(_) => {
                return Err(CanonicalizationError::InvalidContext(
                    "@base must be a string".into(),
                ))
            }
        }

        match local.get("@vocab") {
            None => {}
            Some(Value::Null) => self.vocab = None,
            Some(Value::String(vocab)) => {
                let expanded = match self.expand_iri(vocab, true, true) {
                    Some(Expanded::Iri(iri)) => iri,
                    _ => vocab.clone(),
                };
                self.vocab = Some(expanded);
            }
            Some(_) => {
                return Err(CanonicalizationError::InvalidContext(
                    "@vocab must be a string".into(),
                ))
            }
        }

        match local.get("@language") {
            None => {}
            Some(Value::Null) => self.language = None,
            Some(Value::String(lang)) => self.language = Some(lang.to_lowercase()),
            Some(_) => {
                return Err(CanonicalizationError::InvalidContext(
                    "@language must be a string".into(),
                ))
            }
        }

        let mut defined: HashMap<String, bool> = HashMap::new();
        for term in local.keys() {
            // `@nest`, `@version`, `@propagate`, ... are settings, not terms.
            if term.starts_with('@') {
                continue;
            }
            self.define_term(local, term, &mut defined, depth)?;
        }
        Ok(())
    }

    fn define_term(
        &mut self,
        local: &Map<String, Value>,
        term: &str,
        defined: &mut HashMap<String, bool>,
        depth: usize,
    ) -> Result<(), CanonicalizationError> {
        match defined.get(term) {
            Some(true) => return Ok(()),
            Some(false) => {
                return Err(CanonicalizationError::InvalidContext(format!(
                    "cyclic IRI mapping for '{term}'"
                )))
            }
            None => {}
        }
        defined.insert(term.to_string(), false);

        let definition = match local.get(term) {
            None | Some(Value::Null) => TermDefinition::with_mapping(Mapping::Null),
            Some(Value::String(id)) => self.definition_for_id(local, term, id, defined, depth)?,
            Some(value @ Value::Object(map)) => {
                // Term definitions only carry keywords; any plain key means a context.
                let is_embedded_context = map.keys().any(|k| !k.starts_with('@'))
                    || (!map.is_empty()
                        && !map.keys().any(|k| TERM_DEFINITION_KEYS.contains(&k.as_str())));
                if is_embedded_context {
                    // Validate eagerly so a bad embedded context fails here.
                    self.apply(value, depth + 1)?;
                    let mut definition = TermDefinition::with_mapping(Mapping::Nest);
                    definition.scoped = Some(value.clone());
                    definition
                } else {
                    self.expanded_definition(local, term, map, defined, depth)?
                }
            }
            Some(_) => return Err(CanonicalizationError::InvalidTermDefinition(term.to_string())),
        };

        self.terms.insert(term.to_string(), definition);
        defined.insert(term.to_string(), true);
        Ok(())
    }

    fn expanded_definition(
        &mut self,
        local: &Map<String, Value>,
        term: &str,
        map: &Map<String, Value>,
        defined: &mut HashMap<String, bool>,
        depth: usize,
    ) -> Result<TermDefinition, CanonicalizationError> {
        if map.contains_key("@reverse") {
            return Err(CanonicalizationError::Unsupported("@reverse".into()));
        }

        let mut definition = match map.get("@id") {
            Some(Value::Null) => TermDefinition::with_mapping(Mapping::Null),
            Some(Value::String(id)) => self.definition_for_id(local, term, id, defined, depth)?,
            Some(_) => return Err(CanonicalizationError::InvalidTermDefinition(term.to_string())),
            None => self.definition_for_id(local, term, term, defined, depth)?,
        };

        match map.get("@type") {
            None => {}
            Some(Value::String(t)) => {
                definition.coercion = Some(match t.as_str() {
                    "@id" => Coercion::Id,
                    "@vocab" => Coercion::Vocab,
                    "@json" | "@none" => return Err(CanonicalizationError::Unsupported(t.clone())),
                    datatype => {
                        match self.expand_for_definition(local, term, datatype, defined, depth)? {
                            Some(iri) => Coercion::Datatype(iri),
                            None => {
                                return Err(CanonicalizationError::InvalidTermDefinition(
                                    term.to_string(),
                                ))
                            }
                        }
                    }
                });
            }
            Some(_) => return Err(CanonicalizationError::InvalidTermDefinition(term.to_string())),
        }

        if let Some(container) = map.get("@container") {
            definition.container = parse_container(term, container)?;
        }

        match map.get("@language") {
            None => {}
            Some(Value::Null) => definition.language = Some(None),
            Some(Value::String(lang)) => definition.language = Some(Some(lang.to_lowercase())),
            Some(_) => return Err(CanonicalizationError::InvalidTermDefinition(term.to_string())),
        }

        if let Some(scoped) = map.get("@context") {
            self.apply(scoped, depth + 1)?;
            definition.scoped = Some(scoped.clone());
        }

        Ok(definition)
    }

    fn definition_for_id(
        &mut self,
        local: &Map<String, Value>,
        term: &str,
        id: &str,
        defined: &mut HashMap<String, bool>,
        depth: usize,
    ) -> Result<TermDefinition, CanonicalizationError> {
        if is_keyword(id) {
            if id == "@context" {
                return Err(CanonicalizationError::InvalidTermDefinition(term.to_string()));
            }
            return Ok(TermDefinition::with_mapping(Mapping::Keyword(id.to_string())));
        }
        if id.starts_with('@') {
            // Reserved keyword form: JSON-LD ignores it.
            return Ok(TermDefinition::with_mapping(Mapping::Null));
        }
        let mapping = match self.expand_for_definition(local, term, id, defined, depth)? {
            Some(iri) => Mapping::Iri(iri),
            None => Mapping::Null,
        };
        Ok(TermDefinition::with_mapping(mapping))
    }

    // IRI expansion inside a context, defining dependencies on demand.
    fn expand_for_definition(
        &mut self,
        local: &Map<String, Value>,
        term: &str,
        value: &str,
        defined: &mut HashMap<String, bool>,
        depth: usize,
    ) -> Result<Option<String>, CanonicalizationError> {
        if let Some((prefix, suffix)) = value.split_once(':') {
            if prefix == "_" || suffix.starts_with("//") {
                return Ok(Some(value.to_string()));
            }
            if prefix != term && local.contains_key(prefix) {
                self.define_term(local, prefix, defined, depth)?;
            }
            if let Some(TermDefinition {
                mapping: Mapping::Iri(base),
                ..
            }) = self.terms.get(prefix)
            {
                return Ok(Some(format!("{base}{suffix}")));
            }
            return Ok(Some(value.to_string()));
        }

        if value != term && local.contains_key(value) {
            self.define_term(local, value, defined, depth)?;
            if let Some(TermDefinition {
                mapping: Mapping::Iri(iri),
                ..
            }) = self.terms.get(value)
            {
                return Ok(Some(iri.clone()));
            }
        }

        Ok(self.vocab.as_ref().map(|vocab| format!("{vocab}{value}")))
    }

    fn expand_iri(&self, value: &str, vocab: bool, document_relative: bool) -> Option<Expanded> {
        if is_keyword(value) {
            return Some(Expanded::Keyword(value.to_string()));
        }

        if vocab {
            if let Some(definition) = self.terms.get(value) {
                return match &definition.mapping {
                    Mapping::Iri(iri) => Some(iri_or_blank(iri)),
                    Mapping::Keyword(keyword) => Some(Expanded::Keyword(keyword.clone())),
                    Mapping::Nest | Mapping::Null => None,
                };
            }
        }

        if let Some((prefix, suffix)) = value.split_once(':') {
            if prefix == "_" {
                return Some(Expanded::Blank(suffix.to_string()));
            }
            if !suffix.starts_with("//") {
                if let Some(TermDefinition {
                    mapping: Mapping::Iri(base),
                    ..
                }) = self.terms.get(prefix)
                {
                    return Some(iri_or_blank(&format!("{base}{suffix}")));
                }
            }
            return Some(Expanded::Iri(value.to_string()));
        }

        if vocab {
            if let Some(base) = &self.vocab {
                return Some(Expanded::Iri(format!("{base}{value}")));
            }
        }

        if document_relative {
            return Some(Expanded::Iri(self.resolve_relative(value)));
        }
        None
    }

    fn resolve_relative(&self, value: &str) -> String {
        self.base
            .as_deref()
            .and_then(|base| Url::parse(base).ok())
            .and_then(|base| base.join(value).ok())
            .map(String::from)
            .unwrap_or_else(|| value.to_string())
    }

    fn keyword_of<'a>(&'a self, key: &'a str) -> Option<&'a str> {
        if is_keyword(key) {
            return Some(key);
        }
        match self.terms.get(key).map(|d| &d.mapping) {
            Some(Mapping::Keyword(keyword)) => Some(keyword.as_str()),
            _ => None,
        }
    }

    fn keyword_entry<'v>(&self, map: &'v Map<String, Value>, keyword: &str) -> Option<&'v Value> {
        map.iter()
            .find(|(key, _)| self.keyword_of(key) == Some(keyword))
            .map(|(_, value)| value)
    }
}

fn iri_or_blank(iri: &str) -> Expanded {
    match iri.strip_prefix("_:") {
        Some(label) => Expanded::Blank(label.to_string()),
        None => Expanded::Iri(iri.to_string()),
    }
}

fn parse_container(term: &str, value: &Value) -> Result<Container, CanonicalizationError> {
    let entries: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    let mut container = Container::None;
    for entry in entries {
        match entry.as_str() {
            Some("@list") => container = Container::List,
            Some("@set") if container == Container::None => container = Container::Set,
            Some("@set") | Some("@index") => {}
            Some("@language") => container = Container::Language,
            Some(other @ ("@graph" | "@id" | "@type")) => {
                return Err(CanonicalizationError::Unsupported(format!("{other} container")))
            }
            _ => return Err(CanonicalizationError::InvalidTermDefinition(term.to_string())),
        }
    }
    Ok(container)
}

/// Flattens nested arrays; JSON-LD arrays outside `@list` are unordered sets.
fn as_values(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().flat_map(as_values).collect(),
        other => vec![other],
    }
}

/// Converts a JSON-LD document into RDF quads.
pub fn to_rdf(document: &Value) -> Result<Vec<Quad>, CanonicalizationError> {
    let mut emitter = Emitter::default();
    let root = ActiveContext::default();
    match document {
        Value::Array(items) => {
            for item in items {
                emitter.top_level(&root, item)?;
            }
        }
        Value::Object(_) => emitter.top_level(&root, document)?,
        _ => {
            return Err(CanonicalizationError::InvalidDocument(
                "top-level value must be an object or array".into(),
            ))
        }
    }
    Ok(emitter.quads)
}

#[derive(Default)]
struct Emitter {
    quads: Vec<Quad>,
    counter: usize,
    labels: HashMap<String, String>,
}

impl Emitter {
    fn fresh_blank(&mut self) -> Term {
        let label = format!("b{}", self.counter);
        self.counter += 1;
        Term::Blank(label)
    }

    fn document_blank(&mut self, label: &str) -> Term {
        if let Some(existing) = self.labels.get(label) {
            return Term::Blank(existing.clone());
        }
        let term = self.fresh_blank();
        if let Term::Blank(assigned) = &term {
            self.labels.insert(label.to_string(), assigned.clone());
        }
        term
    }

    fn emit(&mut self, subject: &Term, predicate: &Term, object: Term, graph: &Option<Term>) {
        self.quads.push(Quad {
            subject: subject.clone(),
            predicate: predicate.clone(),
            object,
            graph: graph.clone(),
        });
    }

    fn expanded_term(&mut self, expanded: Option<Expanded>) -> Option<Term> {
        match expanded? {
            Expanded::Iri(iri) => Some(Term::Iri(iri)),
            Expanded::Blank(label) => Some(self.document_blank(&label)),
            Expanded::Keyword(_) => None,
        }
    }

    fn top_level(
        &mut self,
        ctx: &ActiveContext,
        value: &Value,
    ) -> Result<(), CanonicalizationError> {
        let Value::Object(map) = value else {
            return Err(CanonicalizationError::InvalidDocument(
                "top-level entries must be objects".into(),
            ));
        };

        let local;
        let ctx = match map.get("@context") {
            Some(context) => {
                local = ctx.apply(context, 0)?;
                &local
            }
            None => ctx,
        };

        let graph_only = map.keys().all(|key| {
            matches!(ctx.keyword_of(key), Some("@context") | Some("@graph"))
        });
        if graph_only {
            if let Some(graph) = ctx.keyword_entry(map, "@graph") {
                for item in as_values(graph) {
                    self.node_value(ctx, item, &None)?;
                }
                return Ok(());
            }
        }

        self.node(ctx, map, &None)?;
        Ok(())
    }

    fn node_value(
        &mut self,
        ctx: &ActiveContext,
        value: &Value,
        graph: &Option<Term>,
    ) -> Result<(), CanonicalizationError> {
        match value {
            Value::Object(map) => {
                self.node(ctx, map, graph)?;
                Ok(())
            }
            Value::Null => Ok(()),
            _ => Err(CanonicalizationError::InvalidDocument(
                "@graph entries must be node objects".into(),
            )),
        }
    }

    fn node(
        &mut self,
        ctx: &ActiveContext,
        map: &Map<String, Value>,
        graph: &Option<Term>,
    ) -> Result<Term, CanonicalizationError> {
        let local;
        let ctx = match map.get("@context") {
            Some(context) => {
                local = ctx.apply(context, 0)?;
                &local
            }
            None => ctx,
        };

        let subject = match ctx.keyword_entry(map, "@id") {
            Some(Value::String(id)) => {
                let expanded = ctx.expand_iri(id, false, true);
                self.expanded_term(expanded).ok_or_else(|| {
                    CanonicalizationError::InvalidDocument(format!("'{id}' is not a valid @id"))
                })?
            }
            Some(_) => {
                return Err(CanonicalizationError::InvalidDocument("@id must be a string".into()))
            }
            None => self.fresh_blank(),
        };

        self.properties(ctx, map, &subject, graph)?;
        Ok(subject)
    }

    fn properties(
        &mut self,
        ctx: &ActiveContext,
        map: &Map<String, Value>,
        subject: &Term,
        graph: &Option<Term>,
    ) -> Result<(), CanonicalizationError> {
        for (key, value) in map {
            if key == "@context" {
                continue;
            }

            let definition = ctx.terms.get(key);
            if let Some(TermDefinition {
                mapping: Mapping::Nest,
                scoped,
                ..
            }) = definition
            {
                let local;
                let nest_ctx = match scoped {
                    Some(scoped) => {
                        local = ctx.apply(scoped, 1)?;
                        &local
                    }
                    None => ctx,
                };
                self.nest(nest_ctx, value, subject, graph)?;
                continue;
            }

            match ctx.expand_iri(key, true, false) {
                Some(Expanded::Keyword(keyword)) => match keyword.as_str() {
                    "@id" | "@context" | "@index" => {}
                    "@type" => self.types(ctx, value, subject, graph)?,
                    "@nest" => self.nest(ctx, value, subject, graph)?,
                    "@graph" => {
                        let named = Some(subject.clone());
                        for item in as_values(value) {
                            self.node_value(ctx.propagated(), item, &named)?;
                        }
                    }
                    "@reverse" | "@included" => {
                        return Err(CanonicalizationError::Unsupported(keyword.clone()))
                    }
                    "@value" | "@list" | "@set" | "@language" => {
                        return Err(CanonicalizationError::InvalidDocument(format!(
                            "'{keyword}' is not valid on a node object"
                        )))
                    }
                    _ => {}
                },
                Some(Expanded::Iri(predicate)) => {
                    self.property(ctx, definition, Term::Iri(predicate), value, subject, graph)?;
                }
                Some(Expanded::Blank(_)) | None => {
                    warn!(key = %key, "dropping key with no IRI mapping; it is not signed");
                }
            }
        }
        Ok(())
    }

    fn types(
        &mut self,
        ctx: &ActiveContext,
        value: &Value,
        subject: &Term,
        graph: &Option<Term>,
    ) -> Result<(), CanonicalizationError> {
        let rdf_type = Term::Iri(RDF_TYPE.into());
        for item in as_values(value) {
            let Value::String(name) = item else {
                return Err(CanonicalizationError::InvalidDocument(
                    "@type values must be strings".into(),
                ));
            };
            let expanded = ctx.expand_iri(name, true, true);
            if let Some(object) = self.expanded_term(expanded) {
                self.emit(subject, &rdf_type, object, graph);
            }
        }
        Ok(())
    }

    fn nest(
        &mut self,
        ctx: &ActiveContext,
        value: &Value,
        subject: &Term,
        graph: &Option<Term>,
    ) -> Result<(), CanonicalizationError> {
        for item in as_values(value) {
            match item {
                Value::Object(map) => self.properties(ctx, map, subject, graph)?,
                Value::Null => {}
                _ => {
                    return Err(CanonicalizationError::InvalidDocument(
                        "nested property values must be objects".into(),
                    ))
                }
            }
        }
        Ok(())
    }

    fn property(
        &mut self,
        ctx: &ActiveContext,
        definition: Option<&TermDefinition>,
        predicate: Term,
        value: &Value,
        subject: &Term,
        graph: &Option<Term>,
    ) -> Result<(), CanonicalizationError> {
        let local;
        let value_ctx = match definition.and_then(|d| d.scoped.as_ref()) {
            Some(scoped) => {
                local = ctx.apply(scoped, 1)?;
                &local
            }
            None => ctx,
        };
        let container = definition.map_or(Container::None, |d| d.container);

        match (container, value) {
            (Container::List, Value::Array(items)) => {
                let head = self.list(value_ctx, definition, items, graph)?;
                self.emit(subject, &predicate, head, graph);
            }
            (Container::Language, Value::Object(map))
                if value_ctx.keyword_entry(map, "@value").is_none() =>
            {
                for (language, strings) in map {
                    for item in as_values(strings) {
                        let object = match item {
                            Value::Null => continue,
                            Value::String(s) if language == "@none" => {
                                Term::literal(s.clone(), XSD_STRING)
                            }
                            Value::String(s) => Term::lang_string(s.clone(), language.clone()),
                            _ => {
                                return Err(CanonicalizationError::InvalidDocument(
                                    "language map values must be strings".into(),
                                ))
                            }
                        };
                        self.emit(subject, &predicate, object, graph);
                    }
                }
            }
            (Container::List, other) => {
                let head = self.list(value_ctx, definition, std::slice::from_ref(other), graph)?;
                self.emit(subject, &predicate, head, graph);
            }
            _ => {
                for item in as_values(value) {
                    for object in self.value(value_ctx, definition, item, graph)? {
                        self.emit(subject, &predicate, object, graph);
                    }
                }
            }
        }
        Ok(())
    }

    fn value(
        &mut self,
        ctx: &ActiveContext,
        definition: Option<&TermDefinition>,
        value: &Value,
        graph: &Option<Term>,
    ) -> Result<Vec<Term>, CanonicalizationError> {
        let coercion = definition.and_then(|d| d.coercion.as_ref());
        match value {
            Value::Null => Ok(Vec::new()),
            Value::String(s) => Ok(self.string_value(ctx, definition, s).into_iter().collect()),
            Value::Bool(b) => {
                let datatype = match coercion {
                    Some(Coercion::Datatype(dt)) => dt.as_str(),
                    _ => XSD_BOOLEAN,
                };
                Ok(vec![Term::literal(b.to_string(), datatype)])
            }
            Value::Number(n) => {
                let datatype = match coercion {
                    Some(Coercion::Datatype(dt)) => Some(dt.as_str()),
                    _ => None,
                };
                Ok(vec![number_literal(n, datatype)])
            }
            Value::Array(items) => {
                let mut terms = Vec::new();
                for item in items {
                    terms.extend(self.value(ctx, definition, item, graph)?);
                }
                Ok(terms)
            }
            Value::Object(map) => {
                if ctx.keyword_entry(map, "@value").is_some() {
                    return self.value_object(ctx, map);
                }
                if let Some(list) = ctx.keyword_entry(map, "@list") {
                    let items: Vec<Value> = match list {
                        Value::Array(items) => items.clone(),
                        other => vec![other.clone()],
                    };
                    return Ok(vec![self.list(ctx, definition, &items, graph)?]);
                }
                if let Some(set) = ctx.keyword_entry(map, "@set") {
                    let mut terms = Vec::new();
                    for item in as_values(set) {
                        terms.extend(self.value(ctx, definition, item, graph)?);
                    }
                    return Ok(terms);
                }
                Ok(vec![self.node(ctx.propagated(), map, graph)?])
            }
        }
    }

    fn string_value(
        &mut self,
        ctx: &ActiveContext,
        definition: Option<&TermDefinition>,
        s: &str,
    ) -> Option<Term> {
        match definition.and_then(|d| d.coercion.as_ref()) {
            Some(Coercion::Id) => {
                let expanded = ctx.expand_iri(s, false, true);
                self.expanded_term(expanded)
            }
            Some(Coercion::Vocab) => {
                let expanded = ctx.expand_iri(s, true, true);
                self.expanded_term(expanded)
            }
            Some(Coercion::Datatype(dt)) => Some(Term::literal(s, dt.clone())),
            None => {
                let language = match definition.and_then(|d| d.language.as_ref()) {
                    Some(term_language) => term_language.clone(),
                    None => ctx.language.clone(),
                };
                Some(match language {
                    Some(lang) => Term::lang_string(s, lang),
                    None => Term::literal(s, XSD_STRING),
                })
            }
        }
    }

    fn value_object(
        &mut self,
        ctx: &ActiveContext,
        map: &Map<String, Value>,
    ) -> Result<Vec<Term>, CanonicalizationError> {
        let datatype = match ctx.keyword_entry(map, "@type") {
            None => None,
            Some(Value::String(t)) if t == "@json" => {
                return Err(CanonicalizationError::Unsupported("@json".into()))
            }
            Some(Value::String(t)) => match ctx.expand_iri(t, true, true) {
                Some(Expanded::Iri(iri)) => Some(iri),
                _ => {
                    return Err(CanonicalizationError::InvalidDocument(format!(
                        "'{t}' is not a valid datatype"
                    )))
                }
            },
            Some(_) => {
                return Err(CanonicalizationError::InvalidDocument(
                    "@type in a value object must be a string".into(),
                ))
            }
        };
        let language = match ctx.keyword_entry(map, "@language") {
            Some(Value::String(lang)) => Some(lang.clone()),
            _ => None,
        };

        let term = match ctx.keyword_entry(map, "@value") {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::String(s)) => match (datatype, language) {
                (Some(dt), _) => Term::literal(s.clone(), dt),
                (None, Some(lang)) => Term::lang_string(s.clone(), lang),
                (None, None) => Term::literal(s.clone(), XSD_STRING),
            },
            Some(Value::Bool(b)) => {
                let datatype = datatype.unwrap_or_else(|| XSD_BOOLEAN.into());
                Term::literal(b.to_string(), datatype)
            }
            Some(Value::Number(n)) => number_literal(n, datatype.as_deref()),
            Some(_) => {
                return Err(CanonicalizationError::InvalidDocument("@value must be a scalar".into()))
            }
        };
        Ok(vec![term])
    }

    fn list(
        &mut self,
        ctx: &ActiveContext,
        definition: Option<&TermDefinition>,
        items: &[Value],
        graph: &Option<Term>,
    ) -> Result<Term, CanonicalizationError> {
        let first = Term::Iri(RDF_FIRST.into());
        let rest = Term::Iri(RDF_REST.into());

        let mut objects = Vec::new();
        for item in items {
            if item.is_array() {
                return Err(CanonicalizationError::Unsupported("lists of lists".into()));
            }
            objects.extend(self.value(ctx, definition, item, graph)?);
        }
        if objects.is_empty() {
            return Ok(Term::Iri(RDF_NIL.into()));
        }

        let cells: Vec<Term> = objects.iter().map(|_| self.fresh_blank()).collect();
        for (index, object) in objects.into_iter().enumerate() {
            let next = cells
                .get(index + 1)
                .cloned()
                .unwrap_or_else(|| Term::Iri(RDF_NIL.into()));
            self.emit(&cells[index], &first, object, graph);
            self.emit(&cells[index], &rest, next, graph);
        }
        Ok(cells[0].clone())
    }
}

fn number_literal(n: &Number, coerced: Option<&str>) -> Term {
    let as_float = n.as_f64().unwrap_or_default();
    let exact_integer = n.is_i64() || n.is_u64();
    let integral = exact_integer || (as_float.fract() == 0.0 && as_float.abs() < 1e21);

    if integral && coerced != Some(XSD_DOUBLE) {
        let lexical = if exact_integer {
            n.to_string()
        } else {
            format!("{as_float:.0}")
        };
        Term::literal(lexical, coerced.unwrap_or(XSD_INTEGER))
    } else {
        Term::literal(canonical_double(as_float), coerced.unwrap_or(XSD_DOUBLE))
    }
}

// xsd:double canonical form: "1.1E1", "1.0E0".
fn canonical_double(value: f64) -> String {
    let formatted = format!("{value:E}");
    match formatted.split_once('E') {
        Some((mantissa, exponent)) if !mantissa.contains('.') => format!("{mantissa}.0E{exponent}"),
        _ => formatted,
    }
}
