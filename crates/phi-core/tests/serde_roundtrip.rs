use phi_core::{SchemaVersion, Spectrum};
use proptest::prelude::*;

#[test]
fn spectrum_round_trip_json() {
    let spectrum = Spectrum::new(vec![0.01, 0.05, 0.2], vec![2.0e4, 1.1e4, 2.5e3]).expect("valid");
    let json = serde_json::to_string_pretty(&spectrum).expect("serialize");
    let decoded: Spectrum = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(decoded, spectrum);
    assert_eq!(SchemaVersion::default(), SchemaVersion::new(1, 0, 0));
}

proptest! {
    #[test]
    fn sorted_positive_grids_are_accepted(mut values in prop::collection::vec(1e-4f64..10.0, 1..32)) {
        values.sort_by(|a, b| a.partial_cmp(b).unwrap());
        values.dedup();
        let pk = vec![1.0; values.len()];
        let spectrum = Spectrum::new(values.clone(), pk).unwrap();
        prop_assert_eq!(spectrum.k(), values.as_slice());
        let (lo, hi) = spectrum.k_range();
        prop_assert!(lo <= hi);
    }
}
