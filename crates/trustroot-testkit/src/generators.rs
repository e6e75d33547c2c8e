//! Proptest generators.

use proptest::prelude::*;
use trustroot_x509::DnScope;

/// A resource name: lowercase start, then letters, digits and dashes.
pub fn name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,15}"
}

/// A single raw tag element with surrounding spaces and mixed case.
pub fn raw_tag() -> impl Strategy<Value = String> {
    "[ ]{0,2}[A-Za-z0-9]{0,8}[ ]{0,2}"
}

/// A free-form comma-separated tag string.
pub fn tag_string() -> impl Strategy<Value = String> {
    prop::collection::vec(raw_tag(), 0..6).prop_map(|tags| tags.join(","))
}

fn component() -> impl Strategy<Value = Option<String>> {
    prop::option::of("[A-Za-z][A-Za-z ]{0,11}")
}

/// A DN scope with any subset of components set.
pub fn dn_scope() -> impl Strategy<Value = DnScope> {
    (
        component(),
        component(),
        component(),
        component(),
        component(),
        component(),
        component(),
    )
        .prop_map(
            |(country, province, locality, organization, organizational_unit, street_address, postal_code)| {
                DnScope {
                    country,
                    province,
                    locality,
                    organization,
                    organizational_unit,
                    street_address,
                    postal_code,
                }
            },
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use trustroot_core::normalize_tags;

    proptest! {
        #[test]
        fn normalized_tags_have_no_edges(s in tag_string()) {
            for tag in normalize_tags(&s) {
                prop_assert_eq!(tag.trim(), tag.as_str());
                prop_assert_eq!(tag.to_lowercase(), tag.clone());
            }
        }

        #[test]
        fn merge_with_self_is_identity(scope in dn_scope()) {
            let mut merged = scope.clone();
            merged.merge(&scope);
            prop_assert_eq!(merged, scope);
        }
    }
}
