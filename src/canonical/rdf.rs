//! Minimal RDF dataset model and N-Quads serialization.

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDF_FIRST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#first";
pub const RDF_REST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#rest";
pub const RDF_NIL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#nil";
pub const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    Iri(String),
    /// Label without the `_:` prefix.
    Blank(String),
    Literal {
        value: String,
        datatype: String,
        language: Option<String>,
    },
}

impl Term {
    pub fn literal(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Term::Literal {
            value: value.into(),
            datatype: datatype.into(),
            language: None,
        }
    }

    pub fn lang_string(value: impl Into<String>, language: impl Into<String>) -> Self {
        Term::Literal {
            value: value.into(),
            datatype: RDF_LANG_STRING.into(),
            language: Some(language.into().to_lowercase()),
        }
    }

    pub fn blank_label(&self) -> Option<&str> {
        match self {
            Term::Blank(label) => Some(label),
            _ => None,
        }
    }

    fn write_nquads(&self, out: &mut String) {
        match self {
            Term::Iri(iri) => {
                out.push('<');
                out.push_str(iri);
                out.push('>');
            }
            Term::Blank(label) => {
                out.push_str("_:");
                out.push_str(label);
            }
            Term::Literal {
                value,
                datatype,
                language,
            } => {
                out.push('"');
                escape_literal(value, out);
                out.push('"');
                if let Some(lang) = language {
                    out.push('@');
                    out.push_str(lang);
                } else if datatype != XSD_STRING {
                    out.push_str("^^<");
                    out.push_str(datatype);
                    out.push('>');
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Quad {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
    /// `None` is the default graph.
    pub graph: Option<Term>,
}

impl Quad {
    /// One N-Quads line including the trailing newline.
    pub fn to_nquad(&self) -> String {
        let mut out = String::new();
        self.subject.write_nquads(&mut out);
        out.push(' ');
        self.predicate.write_nquads(&mut out);
        out.push(' ');
        self.object.write_nquads(&mut out);
        if let Some(graph) = &self.graph {
            out.push(' ');
            graph.write_nquads(&mut out);
        }
        out.push_str(" .\n");
        out
    }

    /// Same quad with every blank node label passed through `relabel`.
    pub fn map_blanks<F>(&self, mut relabel: F) -> Quad
    where
        F: FnMut(&str) -> String,
    {
        let mut map = |term: &Term| match term {
            Term::Blank(label) => Term::Blank(relabel(label)),
            other => other.clone(),
        };
        Quad {
            subject: map(&self.subject),
            predicate: self.predicate.clone(),
            object: map(&self.object),
            graph: self.graph.as_ref().map(&mut map),
        }
    }

    pub fn blank_labels(&self) -> impl Iterator<Item = &str> {
        [Some(&self.subject), Some(&self.object), self.graph.as_ref()]
            .into_iter()
            .flatten()
            .filter_map(Term::blank_label)
    }
}

fn escape_literal(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nquad_line() {
        let quad = Quad {
            subject: Term::Iri("http://ex/a".into()),
            predicate: Term::Iri("http://ex/p".into()),
            object: Term::literal("say \"hi\"\n", XSD_STRING),
            graph: None,
        };
        assert_eq!(quad.to_nquad(), "<http://ex/a> <http://ex/p> \"say \\\"hi\\\"\\n\" .\n");
    }

    #[test]
    fn test_typed_and_lang_literals() {
        let quad = Quad {
            subject: Term::Blank("b0".into()),
            predicate: Term::Iri("http://ex/p".into()),
            object: Term::literal("5", XSD_INTEGER),
            graph: Some(Term::Iri("http://ex/g".into())),
        };
        assert_eq!(
            quad.to_nquad(),
            "_:b0 <http://ex/p> \"5\"^^<http://www.w3.org/2001/XMLSchema#integer> <http://ex/g> .\n"
        );

        let lang = Term::lang_string("chat", "FR");
        let mut out = String::new();
        lang.write_nquads(&mut out);
        assert_eq!(out, "\"chat\"@fr");
    }
}
