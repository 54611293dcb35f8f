//! Predicate evaluation against content entries.
//!
//! Shared by the content store when it runs selectors and by the query
//! processor when it applies filters that were not pushed into a selector.
//!
//! Comparisons follow SQL: a test on an unset or null property is false,
//! whether or not it is negated. Only `IS NULL` matches missing values.

use std::cmp::Ordering;

use folio_proto::{CompareOp, ContentEntry, Predicate, Value};

/// Evaluates predicates against content entries.
pub struct FilterEvaluator;

impl FilterEvaluator {
    /// Whether the entry satisfies the predicate.
    pub fn matches(predicate: &Predicate, entry: &ContentEntry) -> bool {
        match predicate {
            Predicate::Compare {
                property,
                op,
                value,
            } => match Self::present(entry, property) {
                Some(actual) => actual
                    .compare(value)
                    .is_some_and(|ord| Self::satisfies(*op, ord)),
                None => false,
            },
            Predicate::In {
                property,
                values,
                negated,
            } => match Self::present(entry, property) {
                Some(actual) => {
                    let found = values
                        .iter()
                        .any(|v| actual.compare(v) == Some(Ordering::Equal));
                    found != *negated
                }
                None => false,
            },
            Predicate::Like {
                property,
                pattern,
                negated,
            } => match Self::present(entry, property) {
                Some(Value::String(s)) => Self::like_match(&s, pattern) != *negated,
                _ => false,
            },
            Predicate::IsNull { property, negated } => {
                Self::present(entry, property).is_none() != *negated
            }
            Predicate::InFolder(folder_id) => entry.parent_id.as_deref() == Some(folder_id),
            Predicate::And(parts) => parts.iter().all(|p| Self::matches(p, entry)),
            Predicate::Or(parts) => parts.iter().any(|p| Self::matches(p, entry)),
            Predicate::Not(inner) => !Self::matches(inner, entry),
        }
    }

    /// Whether the entry satisfies an optional predicate; `None` matches all.
    pub fn matches_opt(predicate: Option<&Predicate>, entry: &ContentEntry) -> bool {
        predicate.map_or(true, |p| Self::matches(p, entry))
    }

    /// Match a string against a LIKE pattern.
    ///
    /// `%` matches any run of characters, `_` exactly one; a backslash makes
    /// the following character literal.
    pub fn like_match(value: &str, pattern: &str) -> bool {
        let pattern = LikeToken::parse(pattern);
        let value: Vec<char> = value.chars().collect();

        let (mut v, mut p) = (0, 0);
        // Last `%` seen and the value position it was tried at.
        let mut backtrack: Option<(usize, usize)> = None;

        while v < value.len() {
            match pattern.get(p) {
                Some(LikeToken::Any) => {
                    backtrack = Some((p, v));
                    p += 1;
                }
                Some(LikeToken::One) => {
                    v += 1;
                    p += 1;
                }
                Some(LikeToken::Char(c)) if *c == value[v] => {
                    v += 1;
                    p += 1;
                }
                _ => match backtrack {
                    Some((star, tried)) => {
                        p = star + 1;
                        v = tried + 1;
                        backtrack = Some((star, tried + 1));
                    }
                    None => return false,
                },
            }
        }

        pattern[p..].iter().all(|t| matches!(t, LikeToken::Any))
    }

    fn present(entry: &ContentEntry, property: &str) -> Option<Value> {
        entry.property(property).filter(|v| !v.is_null())
    }

    fn satisfies(op: CompareOp, ord: Ordering) -> bool {
        match op {
            CompareOp::Eq => ord.is_eq(),
            CompareOp::Ne => ord.is_ne(),
            CompareOp::Lt => ord.is_lt(),
            CompareOp::Le => ord.is_le(),
            CompareOp::Gt => ord.is_gt(),
            CompareOp::Ge => ord.is_ge(),
        }
    }
}

#[derive(Debug, PartialEq)]
enum LikeToken {
    Any,
    One,
    Char(char),
}

impl LikeToken {
    fn parse(pattern: &str) -> Vec<LikeToken> {
        let mut out = Vec::with_capacity(pattern.len());
        let mut chars = pattern.chars();
        while let Some(c) = chars.next() {
            out.push(match c {
                '%' => LikeToken::Any,
                '_' => LikeToken::One,
                '\\' => LikeToken::Char(chars.next().unwrap_or('\\')),
                c => LikeToken::Char(c),
            });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_proto::properties;

    fn entry() -> ContentEntry {
        ContentEntry::document("doc-1", "Quarterly Report.pdf")
            .in_folder("reports")
            .with_property(properties::CONTENT_STREAM_LENGTH, 2048i64)
            .with_property(properties::CREATED_BY, "alice")
            .with_property("acme:reviewed", Value::Null)
    }

    #[test]
    fn test_compare() {
        let e = entry();
        let length = properties::CONTENT_STREAM_LENGTH;
        assert!(FilterEvaluator::matches(&Predicate::compare(length, CompareOp::Gt, 1024i64), &e));
        assert!(FilterEvaluator::matches(&Predicate::compare(length, CompareOp::Le, 2048.0), &e));
        assert!(!FilterEvaluator::matches(&Predicate::compare(length, CompareOp::Lt, 10i64), &e));
        assert!(FilterEvaluator::matches(&Predicate::eq(properties::NAME, "Quarterly Report.pdf"), &e));
        assert!(!FilterEvaluator::matches(&Predicate::eq(length, "2048"), &e));
    }

    #[test]
    fn test_missing_and_null_properties() {
        let e = entry();
        assert!(!FilterEvaluator::matches(&Predicate::compare("acme:missing", CompareOp::Ne, 1i64), &e));
        assert!(!FilterEvaluator::matches(&Predicate::eq("acme:reviewed", true), &e));

        let is_null = |property: &str, negated| Predicate::IsNull {
            property: property.into(),
            negated,
        };
        assert!(FilterEvaluator::matches(&is_null("acme:missing", false), &e));
        assert!(FilterEvaluator::matches(&is_null("acme:reviewed", false), &e));
        assert!(FilterEvaluator::matches(&is_null(properties::CREATED_BY, true), &e));
    }

    #[test]
    fn test_in() {
        let e = entry();
        let in_list = |negated| Predicate::In {
            property: properties::CREATED_BY.into(),
            values: vec!["bob".into(), "alice".into()],
            negated,
        };
        assert!(FilterEvaluator::matches(&in_list(false), &e));
        assert!(!FilterEvaluator::matches(&in_list(true), &e));
    }

    #[test]
    fn test_in_folder_and_connectives() {
        let e = entry();
        let in_reports = Predicate::in_folder("reports");
        let by_bob = Predicate::eq(properties::CREATED_BY, "bob");

        assert!(FilterEvaluator::matches(&in_reports, &e));
        assert!(!FilterEvaluator::matches(&Predicate::in_folder("other"), &e));
        assert!(!FilterEvaluator::matches(&in_reports.clone().and(by_bob.clone()), &e));
        assert!(FilterEvaluator::matches(&Predicate::Or(vec![in_reports, by_bob.clone()]), &e));
        assert!(FilterEvaluator::matches(&Predicate::Not(Box::new(by_bob)), &e));
        assert!(FilterEvaluator::matches_opt(None, &e));
    }

    #[test]
    fn test_like_match() {
        assert!(FilterEvaluator::like_match("report.pdf", "%.pdf"));
        assert!(FilterEvaluator::like_match("report.pdf", "report%"));
        assert!(FilterEvaluator::like_match("report.pdf", "r_port%"));
        assert!(FilterEvaluator::like_match("abcbc", "%bc"));
        assert!(FilterEvaluator::like_match("", "%"));
        assert!(FilterEvaluator::like_match("100%", "100\\%"));
        assert!(!FilterEvaluator::like_match("1000", "100\\%"));
        assert!(!FilterEvaluator::like_match("report.doc", "%.pdf"));
        assert!(!FilterEvaluator::like_match("ab", "a_b"));
    }

    #[test]
    fn test_like_predicate() {
        let e = entry();
        let like = |pattern: &str, negated| Predicate::Like {
            property: properties::NAME.into(),
            pattern: pattern.into(),
            negated,
        };
        assert!(FilterEvaluator::matches(&like("Quarterly%", false), &e));
        assert!(FilterEvaluator::matches(&like("%.doc", true), &e));
        assert!(!FilterEvaluator::matches(
            &Predicate::like(properties::CONTENT_STREAM_LENGTH, "2%"),
            &e
        ));
    }
}
