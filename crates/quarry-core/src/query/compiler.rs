//! Query compiler: `SearchQuerySpec` -> provider query strings.
//!
//! Pure functions that cannot fail. An empty spec
//! compiles to an empty string (or to the caller's fallback for semantic
//! queries).

use std::collections::HashSet;

use quarry_types::query::{CompiledQuery, SearchQuerySpec};

/// Wrap a term in double quotes when it contains whitespace.
pub fn quote_term(term: &str) -> String {
    if term.chars().any(char::is_whitespace) {
        format!("\"{term}\"")
    } else {
        term.to_string()
    }
}

/// Trim every term, drop empties, and de-duplicate keeping the first
/// occurrence.
pub fn clean_terms(terms: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    terms
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(*t))
        .map(str::to_string)
        .collect()
}

/// One item stays bare; several become a parenthesized OR-group.
fn or_group(items: Vec<String>) -> Option<String> {
    match items.len() {
        0 => None,
        1 => items.into_iter().next(),
        _ => Some(format!("({})", items.join(" OR "))),
    }
}

/// Compile a spec into a boolean query string for lexical providers.
///
/// A non-empty `raw` is returned verbatim. Otherwise clauses are emitted in
/// a fixed order (any-group, all terms, phrases, exclusions, site-group,
/// filetypes, intitle, inurl) and joined with ` AND `.
pub fn compile_boolean(spec: &SearchQuerySpec) -> String {
    if let Some(raw) = spec.raw_query() {
        return raw.to_string();
    }

    let mut clauses: Vec<String> = Vec::new();

    let any: Vec<String> = clean_terms(&spec.any_terms)
        .iter()
        .map(|t| quote_term(t))
        .collect();
    clauses.extend(or_group(any));

    clauses.extend(clean_terms(&spec.all_terms).iter().map(|t| quote_term(t)));
    clauses.extend(clean_terms(&spec.phrases).iter().map(|t| format!("\"{t}\"")));
    clauses.extend(
        clean_terms(&spec.excluded)
            .iter()
            .map(|t| format!("NOT {}", quote_term(t))),
    );

    let sites: Vec<String> = clean_terms(&spec.sites)
        .iter()
        .map(|s| format!("site:{s}"))
        .collect();
    clauses.extend(or_group(sites));

    clauses.extend(
        clean_terms(&spec.filetypes)
            .iter()
            .map(|t| format!("filetype:{t}")),
    );
    clauses.extend(
        clean_terms(&spec.intitle)
            .iter()
            .map(|t| format!("intitle:{}", quote_term(t))),
    );
    clauses.extend(
        clean_terms(&spec.inurl)
            .iter()
            .map(|t| format!("inurl:{}", quote_term(t))),
    );

    clauses.join(" AND ")
}

/// Compile a spec into a natural-language query for semantic providers.
///
/// Raw wins; otherwise phrases, all terms and any terms are space-joined in
/// that order; if all of those are empty, `fallback` is returned.
pub fn compile_semantic(spec: &SearchQuerySpec, fallback: &str) -> String {
    if let Some(raw) = spec.raw_query() {
        return raw.to_string();
    }

    let parts: Vec<String> = clean_terms(&spec.phrases)
        .into_iter()
        .chain(clean_terms(&spec.all_terms))
        .chain(clean_terms(&spec.any_terms))
        .collect();

    if parts.is_empty() {
        fallback.to_string()
    } else {
        parts.join(" ")
    }
}

/// Compile both query strings for a run.
///
/// Without a spec, or when the boolean query comes out empty, the topic is
/// used so lexical providers always receive something to search for.
pub fn compile(spec: Option<&SearchQuerySpec>, topic: &str) -> CompiledQuery {
    let spec = spec.cloned().unwrap_or_default();

    let boolean = compile_boolean(&spec);
    let boolean = if boolean.is_empty() {
        topic.to_string()
    } else {
        boolean
    };

    CompiledQuery {
        boolean,
        semantic: compile_semantic(&spec, topic),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_raw_takes_precedence() {
        let spec = SearchQuerySpec {
            raw: Some("X".to_string()),
            any_terms: terms(&["a", "b"]),
            sites: terms(&["example.com"]),
            ..Default::default()
        };
        assert_eq!(compile_boolean(&spec), "X");
        assert_eq!(compile_semantic(&spec, "topic"), "X");
    }

    #[test]
    fn test_any_group_and_all_terms() {
        let spec = SearchQuerySpec {
            any_terms: terms(&["a", "b"]),
            all_terms: terms(&["c"]),
            ..Default::default()
        };
        assert_eq!(compile_boolean(&spec), "(a OR b) AND c");
    }

    #[test]
    fn test_empty_spec_compiles_to_empty_string() {
        assert_eq!(compile_boolean(&SearchQuerySpec::default()), "");
    }

    #[test]
    fn test_duplicates_collapse_in_first_seen_order() {
        let spec = SearchQuerySpec {
            any_terms: terms(&[" b ", "a", "b", "", "a"]),
            ..Default::default()
        };
        assert_eq!(compile_boolean(&spec), "(b OR a)");
        assert_eq!(clean_terms(&terms(&["x", " x", "y ", "  "])), terms(&["x", "y"]));
    }

    #[test]
    fn test_single_any_term_is_not_parenthesized() {
        let spec = SearchQuerySpec {
            any_terms: terms(&["graph theory"]),
            ..Default::default()
        };
        assert_eq!(compile_boolean(&spec), "\"graph theory\"");
    }

    #[test]
    fn test_every_clause_kind_in_order() {
        let spec = SearchQuerySpec {
            raw: None,
            all_terms: terms(&["rust"]),
            any_terms: terms(&["async", "tokio runtime"]),
            phrases: terms(&["zero cost"]),
            excluded: terms(&["python", "go lang"]),
            sites: terms(&["docs.rs", "github.com"]),
            filetypes: terms(&["pdf"]),
            intitle: terms(&["benchmark results"]),
            inurl: terms(&["blog"]),
        };
        assert_eq!(
            compile_boolean(&spec),
            "(async OR \"tokio runtime\") AND rust AND \"zero cost\" AND NOT python \
             AND NOT \"go lang\" AND (site:docs.rs OR site:github.com) AND filetype:pdf \
             AND intitle:\"benchmark results\" AND inurl:blog"
        );
    }

    #[test]
    fn test_single_site_is_bare() {
        let spec = SearchQuerySpec {
            all_terms: terms(&["lsm"]),
            sites: terms(&["arxiv.org"]),
            ..Default::default()
        };
        assert_eq!(compile_boolean(&spec), "lsm AND site:arxiv.org");
    }

    #[test]
    fn test_phrases_are_always_quoted() {
        let spec = SearchQuerySpec {
            phrases: terms(&["wal"]),
            ..Default::default()
        };
        assert_eq!(compile_boolean(&spec), "\"wal\"");
    }

    #[test]
    fn test_semantic_joins_phrases_all_then_any() {
        let spec = SearchQuerySpec {
            any_terms: terms(&["c"]),
            all_terms: terms(&["b"]),
            phrases: terms(&["a a"]),
            excluded: terms(&["ignored"]),
            ..Default::default()
        };
        assert_eq!(compile_semantic(&spec, "fallback"), "a a b c");
    }

    #[test]
    fn test_semantic_falls_back_when_empty() {
        let spec = SearchQuerySpec {
            sites: terms(&["example.com"]),
            ..Default::default()
        };
        assert_eq!(compile_semantic(&spec, "graph databases"), "graph databases");
    }

    #[test]
    fn test_compile_without_spec_uses_topic() {
        let compiled = compile(None, "graph databases");
        assert_eq!(compiled.boolean, "graph databases");
        assert_eq!(compiled.semantic, "graph databases");
    }

    #[test]
    fn test_compile_with_spec() {
        let spec = SearchQuerySpec {
            any_terms: terms(&["graph", "db"]),
            ..Default::default()
        };
        let compiled = compile(Some(&spec), "graph databases");
        assert_eq!(compiled.boolean, "(graph OR db)");
        assert_eq!(compiled.semantic, "graph db");
    }
}
