//! Tag normalization.
//!
//! Tags arrive as free-form comma-separated strings. Matching elsewhere is
//! exact, so every element is trimmed and lower-cased before storage.

/// Split a comma-separated tag string into normalized elements.
///
/// Order and duplicates are preserved; the index collapses duplicates when it
/// stores them.
///
/// ```
/// use trustroot_core::normalize_tags;
///
/// assert_eq!(normalize_tags(" Web , DB ,web"), vec!["web", "db", "web"]);
/// ```
pub fn normalize_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|element| element.to_lowercase().trim().to_string())
        .collect()
}

/// Join tags back into the comma-separated form.
pub fn join_tags<I, S>(tags: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|t| t.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_example() {
        assert_eq!(normalize_tags(" Web , DB ,web"), vec!["web", "db", "web"]);
    }

    #[test]
    fn test_normalize_single() {
        assert_eq!(normalize_tags("Prod"), vec!["prod"]);
    }

    #[test]
    fn test_normalize_keeps_empty_elements() {
        assert_eq!(normalize_tags("a,,b"), vec!["a", "", "b"]);
        assert_eq!(normalize_tags(""), vec![""]);
    }

    #[test]
    fn test_join_tags() {
        assert_eq!(join_tags(["a", "b"]), "a,b");
        assert_eq!(join_tags(Vec::<String>::new()), "");
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(s in ".*") {
            let once = normalize_tags(&s);
            let twice = normalize_tags(&join_tags(&once));
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn normalized_elements_are_trimmed(s in "[ a-zA-Z,\t]{0,40}") {
            for tag in normalize_tags(&s) {
                prop_assert_eq!(tag.trim(), tag.as_str());
                prop_assert_eq!(tag.to_lowercase(), tag.clone());
            }
        }

        #[test]
        fn element_count_matches_commas(s in "[a-z ,]{0,40}") {
            let commas = s.matches(',').count();
            prop_assert_eq!(normalize_tags(&s).len(), commas + 1);
        }
    }
}
