//! Extraction tests: which elements a selector yields, in what order, and
//! how malformed input is reported.

#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;

use xmlpluck::{NamespacePolicy, ParseOptions, Parser, PathSelector, PickError};

fn parser<'a>(xml: &'a str, selector: &str, policy: NamespacePolicy) -> Parser<&'a [u8]> {
    Parser::new(
        xml.as_bytes(),
        PathSelector::new(selector),
        ParseOptions::default().namespace(policy),
    )
}

/// Paths of every match, or the first error message.
fn paths(xml: &str, selector: &str, policy: NamespacePolicy) -> Result<Vec<String>, String> {
    parser(xml, selector, policy)
        .map(|found| found.map(|m| m.path()).map_err(|e| e.to_string()))
        .collect()
}

fn count(xml: &str, policy: NamespacePolicy) -> Result<usize, String> {
    paths(xml, "/", policy).map(|p| p.len())
}

// ---------------------------------------------------------------------------
// Selector matching
// ---------------------------------------------------------------------------

#[test]
fn test_selector_table() {
    let flat = "<a><b/><c/><b/></a>";
    let deep = "<a><b><c/></b><c/><b><c/></b><b><d/></b></a>";
    let cases: &[(&str, &str, &[&str])] = &[
        ("", flat, &["/a"]),
        ("*", flat, &["/a"]),
        ("/", flat, &["/a"]),
        ("/*", flat, &["/a"]),
        ("/a", flat, &["/a"]),
        ("/a/", flat, &["/a/b", "/a/c", "/a/b"]),
        ("/a/*", flat, &["/a/b", "/a/c", "/a/b"]),
        ("/*/", flat, &["/a/b", "/a/c", "/a/b"]),
        ("/a/b", flat, &["/a/b", "/a/b"]),
        ("/*/b", flat, &["/a/b", "/a/b"]),
        ("/x", flat, &[]),
        ("/a/b/c", deep, &["/a/b/c", "/a/b/c"]),
        ("/a/*/c", deep, &["/a/b/c", "/a/b/c"]),
        ("/*/b/c", deep, &["/a/b/c", "/a/b/c"]),
        ("/*/*/c", deep, &["/a/b/c", "/a/b/c"]),
    ];
    for (selector, xml, expected) in cases {
        for policy in NamespacePolicy::ALL {
            assert_eq!(
                paths(xml, selector, policy),
                Ok(expected.iter().map(ToString::to_string).collect::<Vec<_>>()),
                "selector {selector:?} under {policy}"
            );
        }
    }
}

#[test]
fn test_nothing_below_a_match_is_reselected() {
    // the inner `b` belongs to the outer match and is never offered to the selector
    let any_b = |candidate: &xmlpluck::tree::Ancestor| candidate.name.local == "b";
    let found: Vec<String> = Parser::new(&b"<a><b><b/></b><b/></a>"[..], any_b, ParseOptions::default())
        .map(|m| m.unwrap().path())
        .collect();
    assert_eq!(found, vec!["/a/b", "/a/b"]);
}

#[test]
fn test_matches_follow_document_order() {
    let xml = "<r><x n='1'/><y n='2'/><x n='3'/></r>";
    let ids: Vec<String> = parser(xml, "/r/", NamespacePolicy::Prefix)
        .map(|m| m.unwrap().element().attribute("n").unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
}

#[test]
fn test_content_outside_matches_is_invisible() {
    let plain = "<r><x>1</x><x>2</x></r>";
    let noisy = "<?xml version='1.0'?><!DOCTYPE r><!-- c --><r attr='z'>junk<y><z>deep</z></y><x>1</x>more<?pi?><x>2</x><!-- c --></r>";
    let texts = |xml: &str| -> Vec<String> {
        parser(xml, "/r/x", NamespacePolicy::Prefix)
            .map(|m| m.unwrap().element().text())
            .collect()
    };
    assert_eq!(texts(plain), texts(noisy));
}

// ---------------------------------------------------------------------------
// Namespace identifiers per policy
// ---------------------------------------------------------------------------

#[test]
fn test_sibling_namespaces() {
    let xml = r#"<root xmlns:x="X" xmlns:y="Y"><x:a/><y:a/><x:a/></root>"#;
    let owned = |v: &[&str]| -> Result<Vec<String>, String> {
        Ok(v.iter().map(ToString::to_string).collect())
    };
    assert_eq!(
        paths(xml, "/root/", NamespacePolicy::Expand),
        owned(&["/root/X:a", "/root/Y:a", "/root/X:a"])
    );
    assert_eq!(
        paths(xml, "/root/", NamespacePolicy::Strip),
        owned(&["/root/a", "/root/a", "/root/a"])
    );
    assert_eq!(
        paths(xml, "/root/", NamespacePolicy::Prefix),
        owned(&["/root/x:a", "/root/y:a", "/root/x:a"])
    );
}

#[test]
fn test_redeclared_prefix() {
    let xml = r#"<root xmlns:x="X"><x:a xmlns:x="X2"></x:a><x:b/></root>"#;
    assert_eq!(
        paths(xml, "/root/", NamespacePolicy::Expand),
        Ok(vec!["/root/X2:a".to_string(), "/root/X:b".to_string()])
    );
    assert_eq!(
        paths(xml, "/root/", NamespacePolicy::Prefix),
        Ok(vec!["/root/x:a".to_string(), "/root/x:b".to_string()])
    );

    let resolved: Vec<String> = parser(xml, "/root/", NamespacePolicy::Prefix)
        .map(|m| {
            let m = m.unwrap();
            m.lookup_prefix(&m.element().name.space).unwrap().to_string()
        })
        .collect();
    assert_eq!(resolved, vec!["X2", "X"]);
}

#[test]
fn test_prefix_policy_records_only_own_declarations() {
    let xml = r#"<root xmlns:x="X"><x:a xmlns:y="Y"/></root>"#;
    let m = parser(xml, "/root/a", NamespacePolicy::Prefix)
        .next()
        .unwrap()
        .unwrap();
    let own = m.element().namespaces.clone().unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(own.get("y").map(String::as_str), Some("Y"));
    assert_eq!(m.lookup_prefix("x"), Some("X"));
    assert!(m.element().attributes.is_empty());
}

#[test]
fn test_expand_and_strip_record_no_declarations() {
    let xml = r#"<root xmlns="D" xmlns:x="X" x:k="v"/>"#;
    for policy in [NamespacePolicy::Expand, NamespacePolicy::Strip] {
        let m = parser(xml, "/", policy).next().unwrap().unwrap();
        assert_eq!(m.element().namespaces, None);
        assert_eq!(m.element().attributes.len(), 1);
    }
}

// ---------------------------------------------------------------------------
// Document shapes and syntax errors
// ---------------------------------------------------------------------------

#[test]
fn test_control_and_empty_documents() {
    for policy in NamespacePolicy::ALL {
        assert_eq!(count("<a/>", policy), Ok(1));
        assert_eq!(count("", policy), Ok(0));
        assert_eq!(count("   abc>@;:&#38;\"\"''!-123 ", policy), Ok(0));
    }
}

#[test]
fn test_structural_errors() {
    for policy in NamespacePolicy::ALL {
        assert_eq!(count("<a>", policy), Err("unexpected end of input".to_string()));
        assert_eq!(count("</a>", policy), Err("unexpected end element </a>".to_string()));
        assert_eq!(count("<a></b>", policy), Err("element <a> closed by </b>".to_string()));
    }
    assert_eq!(
        count("<x:a></y:a>", NamespacePolicy::Prefix),
        Err("element <a> in space x closed by </a> in space y".to_string())
    );
    assert_eq!(count("<x:a></y:a>", NamespacePolicy::Strip), Ok(1));
}

#[test]
fn test_error_then_poisoned() {
    let mut p = parser("<a><b/></c>", "/a/b", NamespacePolicy::Prefix);
    assert!(p.next_match().unwrap().is_some());
    assert!(matches!(p.next_match(), Err(PickError::MismatchedEndElement { .. })));
    assert!(matches!(p.next_match(), Err(PickError::Poisoned)));
}

#[test]
fn test_clean_end_is_repeatable() {
    let mut p = parser("<a/>", "/", NamespacePolicy::Prefix);
    assert!(p.next_match().unwrap().is_some());
    assert!(p.next_match().unwrap().is_none());
    assert!(p.next_match().unwrap().is_none());
}

#[test]
fn test_text_trimming_and_entities() {
    let xml = "<a>\n  one &amp; two\n  <b> <![CDATA[<raw>]]> </b>\n  \n</a>";
    let m = parser(xml, "/", NamespacePolicy::Prefix).next().unwrap().unwrap();
    assert_eq!(m.element().text(), "one & two");
    let b = m.element().child_elements().next().unwrap();
    assert_eq!(b.text(), "<raw>");
    assert_eq!(m.element().children.len(), 2);
}

#[test]
fn test_unknown_entity_inside_match() {
    assert_eq!(
        count("<a>&bogus;</a>", NamespacePolicy::Prefix),
        Err("unknown entity &bogus;".to_string())
    );
}

#[test]
fn test_closure_selector() {
    let xml = r#"<a><b keep="yes"/><b/><c><b keep="yes"/></c></a>"#;
    let keep = |candidate: &xmlpluck::tree::Ancestor| {
        candidate.attributes.iter().any(|a| a.name.local == "keep")
    };
    let found: Vec<String> = Parser::new(xml.as_bytes(), keep, ParseOptions::default())
        .map(|m| m.unwrap().path())
        .collect();
    assert_eq!(found, vec!["/a/b", "/a/c/b"]);
}
