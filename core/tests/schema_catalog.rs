use delinquency_core::schema::{
    all_feature_names, field_catalog, is_base_input, is_derived_feature, BASE_INPUTS, DERIVED_FEATURES,
};

#[test]
fn catalog_sizes_are_fixed() {
    assert_eq!(BASE_INPUTS.len(), 34);
    assert_eq!(DERIVED_FEATURES.len(), 6);
    assert_eq!(all_feature_names().count(), 40);
}

/// The catalog is pure: two calls serialize identically.
#[test]
fn schema_is_identical_across_calls() {
    let a = serde_json::to_string(&field_catalog()).unwrap();
    let b = serde_json::to_string(&field_catalog()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn catalog_preserves_canonical_order_and_labels() {
    let body = serde_json::to_value(field_catalog()).unwrap();
    let base = body["base_inputs"].as_object().unwrap();

    let keys: Vec<&str> = base.keys().map(String::as_str).collect();
    assert_eq!(keys.first(), Some(&"sim_age_days"));
    assert_eq!(keys.last(), Some(&"median_main_prebal_90d"));
    assert_eq!(base["date_month"], "Current Month (1-12)");
    assert!(body["description"].as_str().unwrap().contains("derived features"));
}

#[test]
fn base_and_derived_sets_are_disjoint() {
    for (name, _) in DERIVED_FEATURES {
        assert!(is_derived_feature(name));
        assert!(!is_base_input(name), "{name} must not be a base input");
    }
    assert!(is_base_input("loan_count_30d"));
}
