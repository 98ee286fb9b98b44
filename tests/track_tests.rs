//! Public `Track` construction, indexing, and projection behavior.

use tracklike::{Track, TrackError};

#[test]
fn from_mapping_rejects_ragged_columns() {
    let err = Track::from_mapping(&[("x", vec![0.0, 1.0]), ("y", vec![0.0])], None).unwrap_err();
    assert!(matches!(err, TrackError::Shape(_)));
}

#[test]
fn weights_column_and_weights_argument_are_mutually_exclusive() {
    let err = Track::from_mapping(
        &[("x", vec![0.0, 1.0]), ("weights", vec![0.5, 0.5])],
        Some(vec![1.0, 1.0]),
    )
    .unwrap_err();
    assert_eq!(err, TrackError::DuplicateWeights);
}

#[test]
fn project_onto_a_subset_of_labels_keeps_vertex_count() {
    let track = Track::from_mapping(
        &[
            ("x", vec![0.0, 1.0, 2.0]),
            ("y", vec![10.0, 11.0, 12.0]),
            ("z", vec![20.0, 21.0, 22.0]),
        ],
        None,
    )
    .unwrap();

    let projected = track.project(&["z", "x"]).unwrap();
    assert_eq!(projected.n_vertices(), 3);
    assert_eq!(projected.labels(), &["z".to_string(), "x".to_string()]);
    assert_eq!(projected.value("z", 2).unwrap(), 22.0);
}

#[test]
fn project_onto_no_known_labels_is_none() {
    let track = Track::from_mapping(&[("x", vec![0.0, 1.0])], None).unwrap();
    assert!(track.project(&["q"]).is_none());
}

#[test]
fn n_threads_above_one_requires_the_std_feature() {
    let mut track = Track::from_mapping(&[("x", vec![0.0, 1.0])], None).unwrap();
    if cfg!(feature = "std") {
        assert!(track.set_n_threads(8).is_ok());
    } else {
        assert_eq!(track.set_n_threads(8), Err(TrackError::NoConcurrency));
    }
}
