use super::*;

fn key(v: &str) -> VersionKey {
    VersionKey::parse(v).unwrap()
}

#[test]
fn test_sorts_dotted_versions() {
    let expected = ["1.0.0", "1.0.1", "1.0.7", "1.0.7.2", "1.1.0", "1.1.2", "2"];
    let mut shuffled = vec!["1.1.2", "2", "1.0.7.2", "1.0.0", "1.1.0", "1.0.7", "1.0.1"];
    shuffled.sort_by_key(|v| key(v));
    assert_eq!(shuffled, expected);
}

#[test]
fn test_double_digit_segments_compare_numerically() {
    assert!(key("1.9") < key("1.10"));
    assert!(key("1.10") < key("2"));
    assert!(key("0.99.99") < key("1"));
}

#[test]
fn test_missing_trailing_segments_are_zero() {
    assert_eq!(key("1.0"), key("1.0.0"));
    assert_eq!(key("1"), key("1.0.0.0"));
    assert!(key("1.0") < key("1.0.1"));
}

#[test]
fn test_ordering_is_transitive() {
    let versions = ["3", "1.2", "1.10.1", "1.2.0.1", "0.1", "10"];
    let keys: Vec<VersionKey> = versions.iter().map(|v| key(v)).collect();
    for a in &keys {
        for b in &keys {
            for c in &keys {
                if a <= b && b <= c {
                    assert!(a <= c, "{a} <= {b} <= {c} but not {a} <= {c}");
                }
            }
        }
    }
}

#[test]
fn test_rejects_non_numeric_segment() {
    let err = VersionKey::parse("1.a.0").unwrap_err();
    assert!(matches!(err, CoreError::MalformedVersion { ref version, .. } if version == "1.a.0"));
}

#[test]
fn test_rejects_empty_segments() {
    for bad in ["", "1..0", ".1", "1.", "1.-2", " 1"] {
        assert!(
            matches!(
                VersionKey::parse(bad),
                Err(CoreError::MalformedVersion { .. })
            ),
            "expected '{bad}' to be malformed"
        );
    }
}

#[test]
fn test_rejects_overflowing_segment() {
    assert!(VersionKey::parse("1.99999999999999999999999").is_err());
}

#[test]
fn test_display_keeps_written_segments() {
    assert_eq!(key("1.0.7").to_string(), "1.0.7");
    assert_eq!(key("007").to_string(), "7");
}

#[test]
fn test_is_version_like() {
    assert!(is_version_like("1.0.0"));
    assert!(is_version_like("2"));
    assert!(!is_version_like("ChangeSet.json"));
    assert!(!is_version_like("notes"));
}
