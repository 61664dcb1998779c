use arbiter_model::{Analysis, DecisionOption, EntityError, Metadata, Recommendation};
use proptest::prelude::*;

fn option(id: &str, score: f64) -> Result<DecisionOption, EntityError> {
    DecisionOption::new(id, "Title", "description", Metadata::new(), score)
}

#[test]
fn test_similarity_boundaries() {
    assert!(option("o", 0.0).is_ok());
    assert!(option("o", 1.0).is_ok());
    assert!(option("o", 1.5).is_err());
    assert!(option("o", -0.1).is_err());
}

proptest! {
    #[test]
    fn prop_similarity_in_range_accepted(score in 0.0f64..=1.0) {
        prop_assert!(option("o", score).is_ok());
    }

    #[test]
    fn prop_similarity_out_of_range_rejected(
        score in prop_oneof![-1.0e6f64..-f64::EPSILON, (1.0f64 + 1.0e-9)..1.0e6]
    ) {
        let err = option("o", score).unwrap_err();
        prop_assert_eq!(err.rule(), Some("similarity score out of range"));
    }

    #[test]
    fn prop_confidence_bounds(confidence in -20.0f64..20.0) {
        let res = Analysis::new("o", vec![], vec![], "summary", confidence);
        prop_assert_eq!(res.is_ok(), (0.0..=10.0).contains(&confidence));
    }

    #[test]
    fn prop_mismatched_ids_always_consistency_error(
        option_id in "[a-z]{1,8}",
        analysis_id in "[a-z]{1,8}",
        score in -10.0f64..10.0,
        reasoning in ".{0,12}",
        rank in 0u32..5,
    ) {
        prop_assume!(option_id != analysis_id);
        let opt = option(&option_id, 0.5).unwrap();
        let analysis = Analysis::new(analysis_id, vec![], vec![], "summary", 5.0).unwrap();

        let err = Recommendation::new(opt, analysis, score, reasoning, rank).unwrap_err();
        prop_assert!(err.is_consistency());
    }

    #[test]
    fn prop_matching_ids_with_valid_fields_accepted(
        id in "[a-z]{1,8}",
        score in 0.0f64..100.0,
        rank in 1u32..1000,
    ) {
        let opt = option(&id, 0.5).unwrap();
        let analysis = Analysis::new(id, vec![], vec![], "summary", 5.0).unwrap();
        let rec = Recommendation::new(opt, analysis, score, "reasoning", rank).unwrap();
        prop_assert_eq!(rec.rank(), rank);
    }
}
