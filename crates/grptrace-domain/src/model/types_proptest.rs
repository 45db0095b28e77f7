//! Property-based tests for directory model types.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::model::{CompositeOperator, MembershipType};

    /// Strategy producing a known membership type in random letter case.
    fn mixed_case_strategy(word: &'static str) -> impl Strategy<Value = String> {
        proptest::collection::vec(any::<bool>(), word.len()).prop_map(move |upper| {
            word.chars()
                .zip(upper)
                .map(|(c, u)| if u { c.to_ascii_uppercase() } else { c })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn test_membership_type_parsing_ignores_case(raw in mixed_case_strategy("effective")) {
            let parsed: MembershipType = raw.parse().unwrap();
            prop_assert_eq!(parsed, MembershipType::Effective);
        }

        #[test]
        fn test_composite_operator_parsing_ignores_case(raw in mixed_case_strategy("intersection")) {
            let parsed: CompositeOperator = raw.parse().unwrap();
            prop_assert_eq!(parsed, CompositeOperator::Intersection);
        }

        #[test]
        fn test_unrecognized_membership_type_keeps_raw_value(raw in "[a-z]{1,12}") {
            prop_assume!(!matches!(raw.as_str(), "immediate" | "effective" | "composite"));
            let parsed: MembershipType = raw.parse().unwrap();
            prop_assert!(!parsed.is_known());
            prop_assert_eq!(parsed.as_str(), raw.as_str());
        }
    }

    #[test]
    fn test_membership_type_serializes_lowercase() {
        let json = serde_json::to_string(&MembershipType::Composite).unwrap();
        assert_eq!(json, "\"composite\"");

        let parsed: MembershipType = serde_json::from_str("\"IMMEDIATE\"").unwrap();
        assert_eq!(parsed, MembershipType::Immediate);
    }

    #[test]
    fn test_composite_operator_accepts_directory_and_fixture_spelling() {
        let upper: CompositeOperator = serde_json::from_str("\"UNION\"").unwrap();
        let lower: CompositeOperator = serde_json::from_str("\"union\"").unwrap();
        assert_eq!(upper, CompositeOperator::Union);
        assert_eq!(lower, CompositeOperator::Union);
        assert!("xor".parse::<CompositeOperator>().is_err());
    }
}
