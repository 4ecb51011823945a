use proptest::prelude::*;

use runqc::normalize::CountyStateExtractor;

#[test]
fn extractor_handles_the_documented_shapes() {
    let extractor = CountyStateExtractor::new().expect("extractor");
    assert_eq!(
        extractor.extract("Loving County TX"),
        (Some("TX".to_string()), "Loving".to_string())
    );
    assert_eq!(
        extractor.extract("Caddo Parish LA"),
        (Some("LA".to_string()), "Caddo".to_string())
    );
    assert_eq!(
        extractor.extract("Eddy county"),
        (None, "Eddy".to_string())
    );
    assert_eq!(
        extractor.extract("  San   Augustine  "),
        (None, "San Augustine".to_string())
    );
}

proptest! {
    #[test]
    fn trailing_state_code_is_always_recovered(
        base in "[A-Z][a-z]{2,10}",
        state in "[A-Z]{2}",
        word in prop_oneof![Just("County"), Just("Parish")],
    ) {
        let extractor = CountyStateExtractor::new().expect("extractor");
        let raw = format!("{base} {word} {state}");
        let (found, cleaned) = extractor.extract(&raw);
        prop_assert_eq!(found, Some(state));
        prop_assert_eq!(cleaned, base);
    }

    #[test]
    fn values_without_a_trailing_code_keep_a_null_state(
        base in "[A-Z][a-z]{2,10}",
    ) {
        let extractor = CountyStateExtractor::new().expect("extractor");
        let (found, cleaned) = extractor.extract(&format!("{base} County"));
        prop_assert_eq!(found, None);
        prop_assert_eq!(cleaned, base);
    }
}
