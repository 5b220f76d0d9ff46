//! Lock tokens and the "same lock" predicate.
//!
//! Editors hand the host an opaque lock string. Some editors send a JSON
//! object instead and, while holding the lock, re-send it with extra metadata
//! fields. Such a token must still be recognised as the same lock, so token
//! equality is a [`TokenMatcher`] rather than raw string comparison.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::TypeError;

/// A lock token presented by an editing client.
///
/// The derived `PartialEq` is exact structural equality. Use a
/// [`TokenMatcher`] to decide whether two tokens denote the same lock.
#[derive(Clone, Debug, PartialEq)]
pub enum LockToken {
    /// Any token that does not decode as a JSON object.
    Opaque(String),
    /// A token whose text decodes as a JSON object.
    ///
    /// `raw` is kept verbatim so the lock is echoed back exactly as received.
    Structured {
        raw: String,
        fields: Map<String, Value>,
    },
}

impl LockToken {
    /// Parse a token from its wire text.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        if raw.is_empty() {
            return Err(TypeError::EmptyLockToken);
        }
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(fields)) => Ok(Self::Structured {
                raw: raw.to_string(),
                fields,
            }),
            _ => Ok(Self::Opaque(raw.to_string())),
        }
    }

    /// Parse an optional header value, treating an empty value as absent.
    pub fn parse_optional(raw: Option<&str>) -> Result<Option<Self>, TypeError> {
        match raw {
            None | Some("") => Ok(None),
            Some(text) => Self::parse(text).map(Some),
        }
    }

    /// The token exactly as received.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Opaque(raw) | Self::Structured { raw, .. } => raw,
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured { .. })
    }

    /// A sub-field of a structured token.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Opaque(_) => None,
            Self::Structured { fields, .. } => fields.get(name),
        }
    }
}

impl FromStr for LockToken {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for LockToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LockToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Decides whether two tokens denote the same lock.
///
/// Implementations must be pure, reflexive and symmetric.
pub trait TokenMatcher: Send + Sync + fmt::Debug {
    fn matches(&self, a: &LockToken, b: &LockToken) -> bool;
}

/// Byte-identical comparison only.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExactMatch;

impl TokenMatcher for ExactMatch {
    fn matches(&self, a: &LockToken, b: &LockToken) -> bool {
        a.as_str() == b.as_str()
    }
}

/// Byte-identical tokens match; structured tokens also match when their
/// identity fields agree.
#[derive(Clone, Debug)]
pub struct StructuredIdentity {
    fields: Vec<String>,
}

impl StructuredIdentity {
    /// Field that identifies an editing session in structured lock tokens.
    pub const DEFAULT_FIELD: &'static str = "S";

    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

impl Default for StructuredIdentity {
    fn default() -> Self {
        Self::new([Self::DEFAULT_FIELD])
    }
}

impl TokenMatcher for StructuredIdentity {
    fn matches(&self, a: &LockToken, b: &LockToken) -> bool {
        tokens_match(a, b, &self.fields)
    }
}

/// The token equality rule.
///
/// Two tokens match if their text is identical, or if both are structured
/// and every identity field is either equal in both or absent from both,
/// with at least one identity field present.
pub fn tokens_match<F: AsRef<str>>(a: &LockToken, b: &LockToken, identity_fields: &[F]) -> bool {
    if a.as_str() == b.as_str() {
        return true;
    }
    let (
        LockToken::Structured { fields: fa, .. },
        LockToken::Structured { fields: fb, .. },
    ) = (a, b)
    else {
        return false;
    };

    let mut compared = false;
    for name in identity_fields {
        match (fa.get(name.as_ref()), fb.get(name.as_ref())) {
            (Some(x), Some(y)) if x == y => compared = true,
            (None, None) => {}
            _ => return false,
        }
    }
    compared
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tok(s: &str) -> LockToken {
        LockToken::parse(s).unwrap()
    }

    #[test]
    fn empty_token_rejected() {
        assert_eq!(LockToken::parse(""), Err(TypeError::EmptyLockToken));
    }

    #[test]
    fn parse_optional_treats_empty_as_absent() {
        assert_eq!(LockToken::parse_optional(None).unwrap(), None);
        assert_eq!(LockToken::parse_optional(Some("")).unwrap(), None);
        assert_eq!(
            LockToken::parse_optional(Some("T1")).unwrap(),
            Some(LockToken::Opaque("T1".into()))
        );
    }

    #[test]
    fn json_object_is_structured() {
        let t = tok(r#"{"S":"x","F":1}"#);
        assert!(t.is_structured());
        assert_eq!(t.field("S"), Some(&Value::from("x")));
        assert_eq!(t.as_str(), r#"{"S":"x","F":1}"#);
    }

    #[test]
    fn json_scalars_stay_opaque() {
        assert!(!tok("42").is_structured());
        assert!(!tok(r#""quoted""#).is_structured());
        assert!(!tok("[1,2]").is_structured());
        assert!(!tok("{not json").is_structured());
    }

    #[test]
    fn identical_text_matches() {
        let m = StructuredIdentity::default();
        assert!(m.matches(&tok("T1"), &tok("T1")));
        assert!(!m.matches(&tok("T1"), &tok("T2")));
    }

    #[test]
    fn structured_match_ignores_metadata_fields() {
        let m = StructuredIdentity::default();
        let a = tok(r#"{"S":"x","F":1}"#);
        let b = tok(r#"{"S":"x","F":2}"#);
        let c = tok(r#"{"S":"y","F":1}"#);
        assert!(m.matches(&a, &b));
        assert!(!m.matches(&a, &c));
    }

    #[test]
    fn structured_never_matches_opaque() {
        let m = StructuredIdentity::default();
        assert!(!m.matches(&tok(r#"{"S":"x"}"#), &tok("x")));
    }

    #[test]
    fn structured_without_identity_fields_needs_identical_text() {
        let m = StructuredIdentity::default();
        assert!(!m.matches(&tok(r#"{"F":1}"#), &tok(r#"{"F":2}"#)));
        assert!(m.matches(&tok(r#"{"F":1}"#), &tok(r#"{"F":1}"#)));
    }

    #[test]
    fn identity_field_present_on_one_side_only() {
        let m = StructuredIdentity::default();
        assert!(!m.matches(&tok(r#"{"S":"x"}"#), &tok(r#"{"F":"x"}"#)));
    }

    #[test]
    fn multiple_identity_fields_all_compared() {
        let m = StructuredIdentity::new(["S", "F"]);
        assert!(m.matches(&tok(r#"{"S":"x","F":1,"E":2}"#), &tok(r#"{"S":"x","F":1}"#)));
        assert!(!m.matches(&tok(r#"{"S":"x","F":1}"#), &tok(r#"{"S":"x","F":2}"#)));
    }

    #[test]
    fn exact_match_ignores_structure() {
        let a = tok(r#"{"S":"x","F":1}"#);
        let b = tok(r#"{"S":"x","F":2}"#);
        assert!(!ExactMatch.matches(&a, &b));
        assert!(ExactMatch.matches(&a, &a.clone()));
    }

    #[test]
    fn serde_uses_raw_text() {
        let t = tok(r#"{"S":"x"}"#);
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, r#""{\"S\":\"x\"}""#);
        let back: LockToken = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }

    fn structured(session: &str, meta: u32) -> LockToken {
        tok(&serde_json::json!({ "S": session, "F": meta }).to_string())
    }

    proptest! {
        #[test]
        fn matching_is_reflexive(raw in "[ -~]{1,40}") {
            let t = tok(&raw);
            prop_assert!(StructuredIdentity::default().matches(&t, &t));
        }

        #[test]
        fn matching_is_symmetric(a in "[ -~]{1,24}", b in "[ -~]{1,24}") {
            let (ta, tb) = (tok(&a), tok(&b));
            let m = StructuredIdentity::default();
            prop_assert_eq!(m.matches(&ta, &tb), m.matches(&tb, &ta));
        }

        #[test]
        fn metadata_extension_keeps_identity(
            session in "[a-z0-9]{1,12}",
            f1 in 0u32..1000,
            f2 in 0u32..1000,
        ) {
            let m = StructuredIdentity::default();
            prop_assert!(m.matches(&structured(&session, f1), &structured(&session, f2)));
        }

        #[test]
        fn distinct_sessions_never_match(
            s1 in "[a-z]{1,8}",
            s2 in "[0-9]{1,8}",
            f in 0u32..1000,
        ) {
            let m = StructuredIdentity::default();
            prop_assert!(!m.matches(&structured(&s1, f), &structured(&s2, f)));
        }
    }
}
