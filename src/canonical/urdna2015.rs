//! URDNA2015 dataset canonicalization.
//!
//! Blank nodes are relabeled `_:c14n0`, `_:c14n1`, ... by hashing their
//! surroundings, so two isomorphic datasets serialize to identical sorted
//! N-Quads whatever labels or quad order they arrived with.

use std::collections::{BTreeMap, HashMap};

use sha2::{Digest, Sha256};
use tracing::trace;

use crate::canonical::rdf::{Quad, Term};
use crate::canonical::CanonicalizationError;

const CANONICAL_PREFIX: &str = "c14n";
const TEMPORARY_PREFIX: &str = "b";

/// Issues sequential identifiers and remembers the order they were issued in.
#[derive(Debug, Clone)]
pub struct IdentifierIssuer {
    prefix: &'static str,
    counter: usize,
    issued: HashMap<String, String>,
    order: Vec<String>,
}

impl IdentifierIssuer {
    pub fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            counter: 0,
            issued: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn issue(&mut self, existing: &str) -> String {
        if let Some(id) = self.issued.get(existing) {
            return id.clone();
        }
        let id = format!("{}{}", self.prefix, self.counter);
        self.counter += 1;
        self.issued.insert(existing.to_string(), id.clone());
        self.order.push(existing.to_string());
        id
    }

    pub fn get(&self, existing: &str) -> Option<&str> {
        self.issued.get(existing).map(String::as_str)
    }

    /// Original labels in issue order.
    pub fn issued_order(&self) -> &[String] {
        &self.order
    }
}

fn sha256_hex(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

/// Canonical N-Quads for `quads`.
///
/// `max_work` bounds the number of permutations explored while breaking
/// ties between blank nodes with identical first-degree hashes.
pub fn canonicalize(quads: &[Quad], max_work: usize) -> Result<String, CanonicalizationError> {
    let mut dataset = quads.to_vec();
    dataset.sort();
    dataset.dedup();

    let mut state = State::new(&dataset, max_work);
    let canonical = state.label_blank_nodes()?;

    let mut lines: Vec<String> = dataset
        .iter()
        .map(|quad| {
            quad.map_blanks(|label| canonical.get(label).unwrap_or(label).to_string())
                .to_nquad()
        })
        .collect();
    lines.sort();
    lines.dedup();
    Ok(lines.concat())
}

struct State<'a> {
    quads: &'a [Quad],
    blank_to_quads: BTreeMap<String, Vec<usize>>,
    first_degree: HashMap<String, String>,
    canonical: IdentifierIssuer,
    work: usize,
    max_work: usize,
}

impl<'a> State<'a> {
    fn new(quads: &'a [Quad], max_work: usize) -> Self {
        let mut blank_to_quads: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (index, quad) in quads.iter().enumerate() {
            for label in quad.blank_labels() {
                let entry = blank_to_quads.entry(label.to_string()).or_default();
                if entry.last() != Some(&index) {
                    entry.push(index);
                }
            }
        }
        Self {
            quads,
            blank_to_quads,
            first_degree: HashMap::new(),
            canonical: IdentifierIssuer::new(CANONICAL_PREFIX),
            work: 0,
            max_work,
        }
    }

    fn label_blank_nodes(&mut self) -> Result<IdentifierIssuer, CanonicalizationError> {
        let labels: Vec<String> = self.blank_to_quads.keys().cloned().collect();

        let mut hash_to_blank: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for label in &labels {
            let hash = self.hash_first_degree(label);
            hash_to_blank.entry(hash).or_default().push(label.clone());
        }

        // Unique first-degree hashes are labeled straight away, in hash order.
        let mut shared = Vec::new();
        for (hash, blanks) in hash_to_blank {
            if let [only] = blanks.as_slice() {
                self.canonical.issue(only);
            } else {
                shared.push((hash, blanks));
            }
        }

        for (hash, blanks) in shared {
            trace!(hash = %hash, count = blanks.len(), "breaking blank node tie");
            let mut paths = Vec::with_capacity(blanks.len());
            for blank in &blanks {
                if self.canonical.get(blank).is_some() {
                    continue;
                }
                let mut temporary = IdentifierIssuer::new(TEMPORARY_PREFIX);
                temporary.issue(blank);
                paths.push(self.hash_n_degree(blank, temporary)?);
            }
            paths.sort_by(|a, b| a.0.cmp(&b.0));
            for (_, issuer) in paths {
                for existing in issuer.issued_order() {
                    self.canonical.issue(existing);
                }
            }
        }

        Ok(self.canonical.clone())
    }

    fn quads_of(&self, label: &str) -> Vec<usize> {
        self.blank_to_quads.get(label).cloned().unwrap_or_default()
    }

    fn hash_first_degree(&mut self, label: &str) -> String {
        if let Some(hash) = self.first_degree.get(label) {
            return hash.clone();
        }
        let mut nquads: Vec<String> = self
            .quads_of(label)
            .into_iter()
            .map(|index| {
                self.quads[index]
                    .map_blanks(|other| if other == label { "a".into() } else { "z".into() })
                    .to_nquad()
            })
            .collect();
        nquads.sort();
        let hash = sha256_hex(&nquads.concat());
        self.first_degree.insert(label.to_string(), hash.clone());
        hash
    }

    fn hash_related(
        &mut self,
        related: &str,
        quad: &Quad,
        issuer: &IdentifierIssuer,
        position: char,
    ) -> String {
        let issued = self
            .canonical
            .get(related)
            .or_else(|| issuer.get(related))
            .map(|id| format!("_:{id}"));
        let identifier = match issued {
            Some(id) => id,
            None => self.hash_first_degree(related),
        };
        let mut input = String::new();
        input.push(position);
        if position != 'g' {
            if let Term::Iri(predicate) = &quad.predicate {
                input.push('<');
                input.push_str(predicate);
                input.push('>');
            }
        }
        input.push_str(&identifier);
        sha256_hex(&input)
    }

    fn charge(&mut self) -> Result<(), CanonicalizationError> {
        self.work += 1;
        if self.work > self.max_work {
            return Err(CanonicalizationError::ComplexityLimit(self.max_work));
        }
        Ok(())
    }

    fn hash_n_degree(
        &mut self,
        label: &str,
        mut issuer: IdentifierIssuer,
    ) -> Result<(String, IdentifierIssuer), CanonicalizationError> {
        self.charge()?;

        let quads = self.quads;
        let mut hash_to_related: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for index in self.quads_of(label) {
            let quad = &quads[index];
            let components = [
                (Some(&quad.subject), 's'),
                (Some(&quad.object), 'o'),
                (quad.graph.as_ref(), 'g'),
            ];
            for (component, position) in components {
                let Some(Term::Blank(related)) = component else {
                    continue;
                };
                if related == label {
                    continue;
                }
                let hash = self.hash_related(related, quad, &issuer, position);
                hash_to_related.entry(hash).or_default().push(related.clone());
            }
        }

        let mut data_to_hash = String::new();
        for (related_hash, mut blanks) in hash_to_related {
            data_to_hash.push_str(&related_hash);
            blanks.sort();

            let mut chosen_path = String::new();
            let mut chosen_issuer: Option<IdentifierIssuer> = None;

            loop {
                self.charge()?;
                let attempt = self.try_permutation(&blanks, &issuer, &chosen_path)?;
                if let Some((path, candidate)) = attempt {
                    if chosen_path.is_empty() || path < chosen_path {
                        chosen_path = path;
                        chosen_issuer = Some(candidate);
                    }
                }
                if !next_permutation(&mut blanks) {
                    break;
                }
            }

            data_to_hash.push_str(&chosen_path);
            if let Some(chosen) = chosen_issuer {
                issuer = chosen;
            }
        }

        Ok((sha256_hex(&data_to_hash), issuer))
    }

    // Returns `None` when the permutation can no longer beat `chosen_path`.
    fn try_permutation(
        &mut self,
        permutation: &[String],
        issuer: &IdentifierIssuer,
        chosen_path: &str,
    ) -> Result<Option<(String, IdentifierIssuer)>, CanonicalizationError> {
        let worse = |path: &str| {
            !chosen_path.is_empty() && path.len() >= chosen_path.len() && path > chosen_path
        };

        let mut issuer_copy = issuer.clone();
        let mut path = String::new();
        let mut recursion = Vec::new();

        for related in permutation {
            if let Some(id) = self.canonical.get(related) {
                path.push_str("_:");
                path.push_str(id);
            } else {
                if issuer_copy.get(related).is_none() {
                    recursion.push(related.clone());
                }
                path.push_str("_:");
                path.push_str(&issuer_copy.issue(related));
            }
            if worse(path.as_str()) {
                return Ok(None);
            }
        }

        for related in recursion {
            let (hash, result_issuer) = self.hash_n_degree(&related, issuer_copy.clone())?;
            path.push_str("_:");
            path.push_str(&issuer_copy.issue(&related));
            path.push('<');
            path.push_str(&hash);
            path.push('>');
            issuer_copy = result_issuer;
            if worse(path.as_str()) {
                return Ok(None);
            }
        }

        Ok(Some((path, issuer_copy)))
    }
}

/// Advances `items` to the next lexicographic permutation.
fn next_permutation(items: &mut [String]) -> bool {
    if items.len() < 2 {
        return false;
    }
    let mut i = items.len() - 1;
    while i > 0 && items[i - 1] >= items[i] {
        i -= 1;
    }
    if i == 0 {
        return false;
    }
    let mut j = items.len() - 1;
    while items[j] <= items[i - 1] {
        j -= 1;
    }
    items.swap(i - 1, j);
    items[i..].reverse();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::rdf::XSD_STRING;

    fn iri(value: &str) -> Term {
        Term::Iri(value.to_string())
    }

    fn blank(label: &str) -> Term {
        Term::Blank(label.to_string())
    }

    fn quad(subject: Term, predicate: &str, object: Term) -> Quad {
        Quad {
            subject,
            predicate: iri(predicate),
            object,
            graph: None,
        }
    }

    #[test]
    fn test_issuer_is_stable() {
        let mut issuer = IdentifierIssuer::new("c14n");
        assert_eq!(issuer.issue("x"), "c14n0");
        assert_eq!(issuer.issue("y"), "c14n1");
        assert_eq!(issuer.issue("x"), "c14n0");
        assert_eq!(issuer.issued_order(), ["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_ground_dataset_is_sorted() {
        let quads = vec![
            quad(iri("http://ex/b"), "http://ex/p", iri("http://ex/c")),
            quad(iri("http://ex/a"), "http://ex/p", iri("http://ex/c")),
        ];
        let out = canonicalize(&quads, 100).unwrap();
        assert_eq!(
            out,
            "<http://ex/a> <http://ex/p> <http://ex/c> .\n\
             <http://ex/b> <http://ex/p> <http://ex/c> .\n"
        );
    }

    #[test]
    fn test_single_blank_node() {
        let quads = vec![quad(blank("anything"), "http://ex/p", iri("http://ex/o"))];
        assert_eq!(canonicalize(&quads, 100).unwrap(), "_:c14n0 <http://ex/p> <http://ex/o> .\n");
    }

    #[test]
    fn test_relabeling_is_label_independent() {
        let first = vec![
            quad(blank("x"), "http://ex/p", blank("y")),
            quad(blank("y"), "http://ex/p", blank("x")),
        ];
        let second = vec![
            quad(blank("q"), "http://ex/p", blank("r")),
            quad(blank("r"), "http://ex/p", blank("q")),
        ];
        let a = canonicalize(&first, 1000).unwrap();
        let b = canonicalize(&second, 1000).unwrap();
        assert_eq!(a, b);
        assert!(a.contains("_:c14n0"));
        assert!(a.contains("_:c14n1"));
    }

    #[test]
    fn test_distinguishable_blanks_follow_their_data() {
        let first = vec![
            quad(blank("x"), "http://ex/name", Term::literal("A", XSD_STRING)),
            quad(blank("y"), "http://ex/name", Term::literal("B", XSD_STRING)),
        ];
        let swapped = vec![
            quad(blank("y"), "http://ex/name", Term::literal("A", XSD_STRING)),
            quad(blank("x"), "http://ex/name", Term::literal("B", XSD_STRING)),
        ];
        assert_eq!(canonicalize(&first, 100).unwrap(), canonicalize(&swapped, 100).unwrap());
    }

    #[test]
    fn test_work_limit() {
        // A clique of indistinguishable blank nodes forces permutation search.
        let labels: Vec<String> = (0..6).map(|i| format!("n{i}")).collect();
        let mut quads = Vec::new();
        for a in &labels {
            for b in &labels {
                if a != b {
                    quads.push(quad(blank(a), "http://ex/p", blank(b)));
                }
            }
        }
        let err = canonicalize(&quads, 10).unwrap_err();
        assert_eq!(err, CanonicalizationError::ComplexityLimit(10));
    }

    #[test]
    fn test_next_permutation() {
        let mut items = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let mut count = 1;
        while next_permutation(&mut items) {
            count += 1;
        }
        assert_eq!(count, 6);
    }
}
