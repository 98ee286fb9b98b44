//! Public `Datum` construction, uncertainty columns, and projection.

use tracklike::{Datum, TrackError};

#[test]
fn err_suffix_and_prefix_conventions_both_populate_the_covariance_diagonal() {
    let suffix = Datum::from_mapping(&[("x", 1.0), ("x_err", 2.0)]).unwrap();
    let prefix = Datum::from_mapping(&[("x", 1.0), ("err_x", 2.0)]).unwrap();
    assert_eq!(suffix.cov().get(0, 0), 4.0);
    assert_eq!(prefix.cov().get(0, 0), 4.0);
}

#[test]
fn uncertainty_column_with_no_matching_base_is_rejected() {
    let err = Datum::from_mapping(&[("x_err", 1.0)]).unwrap_err();
    assert_eq!(err, TrackError::MissingBase("x".to_string()));
}

#[test]
fn project_onto_a_relabeled_subset_preserves_values_and_order() {
    let datum = Datum::from_mapping(&[("x", 1.0), ("y", 2.0), ("z", 3.0)]).unwrap();
    let projected = datum.project(&["z", "x"]).unwrap();
    assert_eq!(projected.dim(), 2);
    assert_eq!(projected.get("z").unwrap(), 3.0);
    assert_eq!(projected.get("x").unwrap(), 1.0);
}

#[test]
fn unknown_label_errors_but_a_sample_assigned_shadow_label_reads_as_nan() {
    let mut datum = Datum::from_mapping(&[("x", 1.0)]).unwrap();
    assert!(matches!(datum.get("y"), Err(TrackError::UnknownLabel(_))));
    datum.set("x", 9.0).unwrap();
    assert_eq!(datum.get("x").unwrap(), 9.0);
}
