//! Address normalization and pattern matching tests

use oscwire_core::address::{pattern_to_regex, validate_literal};
use oscwire_core::{prepare_address, Pattern, ToAddress};

#[test]
fn test_prepare_is_idempotent() {
    let inputs = ["", "/", "//", "a", "a/b/", "/a/b", "/a/b///", "  /x"];
    for input in inputs {
        let once = prepare_address(input);
        assert_eq!(prepare_address(&once), once, "input {:?}", input);
    }
}

#[test]
fn test_segment_and_string_forms_agree() {
    assert_eq!(["a", "test", "path"].to_address(), "/a/test/path".to_address());
    assert_eq!("a/test/path/".to_address(), "/a/test/path");
}

#[test]
fn test_literal_rejects_every_reserved_character() {
    for c in ['#', '*', '[', ']', ',', '{', '}', '|', '?', ' ', '\t'] {
        let address = format!("/a{}b", c);
        assert!(validate_literal(&address).is_err(), "accepted {:?}", address);
    }
    assert!(validate_literal("/a/b.c/d-e_f/1").is_ok());
}

#[test]
fn test_wildcards() {
    let pattern = Pattern::compile("/mixer/channel/?/gain").unwrap();
    assert!(pattern.matches("/mixer/channel/1/gain"));
    assert!(!pattern.matches("/mixer/channel/12/gain"));

    let pattern = Pattern::compile("/mixer/*/gain").unwrap();
    assert!(pattern.matches("/mixer/channel/gain"));
    assert!(pattern.matches("/mixer/channel/12/gain"));
    assert!(!pattern.matches("/mixer/gain"));
}

#[test]
fn test_character_classes() {
    let pattern = Pattern::compile("/ch/[1-3]").unwrap();
    assert!(pattern.matches("/ch/2"));
    assert!(!pattern.matches("/ch/4"));

    let pattern = Pattern::compile("/ch/[!1-3]").unwrap();
    assert!(!pattern.matches("/ch/2"));
    assert!(pattern.matches("/ch/4"));
}

#[test]
fn test_alternatives() {
    let pattern = Pattern::compile("/two/{test,some}/path").unwrap();
    assert!(pattern.matches("/two/test/path"));
    assert!(pattern.matches("/two/some/path"));
    assert!(!pattern.matches("/two/other/path"));
}

#[test]
fn test_regex_metacharacters_are_literal() {
    let pattern = Pattern::compile("/a.b").unwrap();
    assert!(pattern.matches("/a.b"));
    assert!(!pattern.matches("/axb"));

    let pattern = Pattern::compile("/price$+(tax)").unwrap();
    assert!(pattern.matches("/price$+(tax)"));

    assert_eq!(pattern_to_regex("/a^b"), "/a\\^b");
}

#[test]
fn test_pattern_is_normalized() {
    let pattern = Pattern::compile("test/path/").unwrap();
    assert_eq!(pattern.as_str(), "/test/path");
    assert!(pattern.matches("/test/path"));
}
