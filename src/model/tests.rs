use ndarray::{Array, ArrayD, IxDyn};

use super::{Affine, ImageState, ModelError, ViewMode};

fn ramp(shape: &[usize]) -> ArrayD<f32> {
    let len = shape.iter().product::<usize>();
    Array::from_shape_vec(IxDyn(shape), (0..len).map(|value| value as f32).collect())
        .expect("shape")
}

#[test]
fn rejects_unsupported_rank() {
    let error = ImageState::with_identity(ramp(&[4])).expect_err("1D rejected");
    assert!(matches!(error, ModelError::UnsupportedRank { ndim: 1 }));
    let error = ImageState::with_identity(ramp(&[2, 2, 2, 2, 2])).expect_err("5D rejected");
    assert!(matches!(error, ModelError::UnsupportedRank { ndim: 5 }));
}

#[test]
fn rejects_zero_sized_axis() {
    let data = ArrayD::<f32>::zeros(IxDyn(&[3, 0, 2]));
    assert!(matches!(
        ImageState::with_identity(data),
        Err(ModelError::ZeroSizedDimension { axis: 1 })
    ));
}

#[test]
fn mode_follows_shape() {
    let volume = ImageState::with_identity(ramp(&[4, 4, 3])).expect("state");
    let disguised = ImageState::with_identity(ramp(&[4, 4, 3, 1])).expect("state");
    let cine = ImageState::with_identity(ramp(&[4, 4, 3, 5])).expect("state");
    assert_eq!(volume.mode(), ViewMode::Static3D);
    assert_eq!(disguised.mode(), ViewMode::Static3D);
    assert!(disguised.is_disguised_volume());
    assert_eq!(cine.mode(), ViewMode::Cine4D);
    assert_eq!(cine.frame_count(), 5);
}

#[test]
fn slice_of_2d_is_whole_image() {
    let state = ImageState::with_identity(ramp(&[3, 2])).expect("state");
    let plane = state.slice(7, 9).expect("2D slice ignores indices");
    assert_eq!(plane.dim(), (3, 2));
    assert_eq!(plane[[2, 1]], 5.0);
}

#[test]
fn slice_of_3d_selects_third_axis() {
    let state = ImageState::with_identity(ramp(&[2, 3, 4])).expect("state");
    let plane = state.slice(2, 0).expect("slice");
    assert_eq!(plane.dim(), (2, 3));
    assert_eq!(plane[[1, 2]], state.voxels()[IxDyn(&[1, 2, 2])]);
}

#[test]
fn disguised_volume_ignores_time_index() {
    let state = ImageState::with_identity(ramp(&[3, 3, 4, 1])).expect("state");
    let reference = state.slice(2, 0).expect("slice");
    for time_index in [0, 1, 7, 100] {
        assert_eq!(state.slice(2, time_index).expect("slice"), reference);
    }
}

#[test]
fn cine_slice_selects_frame() {
    let state = ImageState::with_identity(ramp(&[2, 2, 3, 4])).expect("state");
    let plane = state.slice(1, 3).expect("slice");
    assert_eq!(plane[[0, 1]], state.voxels()[IxDyn(&[0, 1, 1, 3])]);
    assert!(matches!(
        state.slice(1, 4),
        Err(ModelError::IndexOutOfRange { axis: 3, index: 4, len: 4 })
    ));
    assert!(matches!(
        state.slice(3, 0),
        Err(ModelError::IndexOutOfRange { axis: 2, .. })
    ));
}

#[test]
fn affine_inverse_round_trips_points() {
    let affine = Affine::from_rows([
        [0.0, -2.0, 0.0, 10.0],
        [1.5, 0.0, 0.0, -4.0],
        [0.0, 0.0, 3.0, 7.5],
        [0.0, 0.0, 0.0, 1.0],
    ])
    .expect("affine");
    let inverse = affine.inverse().expect("invertible");
    let point = [3.0, -1.0, 2.5];
    let back = inverse.transform_point(affine.transform_point(point));
    for (expected, actual) in point.iter().zip(back) {
        assert!((expected - actual).abs() < 1e-9);
    }
    let spacing = affine.spacing();
    assert!((spacing[0] - 1.5).abs() < 1e-12);
    assert!((spacing[1] - 2.0).abs() < 1e-12);
    assert!((spacing[2] - 3.0).abs() < 1e-12);
}

#[test]
fn singular_affine_is_reported() {
    let affine = Affine::from_spacing([1.0, 0.0, 1.0]);
    assert!(matches!(affine.inverse(), Err(ModelError::SingularAffine)));
}

#[test]
fn affine_rejects_projective_rows() {
    let mut rows = *Affine::identity().rows();
    rows[3][0] = 0.5;
    assert!(matches!(Affine::from_rows(rows), Err(ModelError::NotAffine)));
}

#[test]
fn refined_affine_shrinks_spacing() {
    let affine = Affine::from_spacing([2.0, 2.0, 4.0]).with_translation([1.0, 2.0, 3.0]);
    let refined = affine.refined(2.0);
    assert_eq!(refined.spacing(), [1.0, 1.0, 2.0]);
    assert_eq!(refined.translation(), [1.0, 2.0, 3.0]);
}

#[test]
fn clones_share_voxels() {
    let state = ImageState::with_identity(ramp(&[2, 2, 2])).expect("state");
    let copy = state.clone();
    assert!(state.is_same_snapshot(&copy));
    let moved = state.with_affine(Affine::from_spacing([2.0, 2.0, 2.0]));
    assert!(!state.is_same_snapshot(&moved));
    assert_ne!(state, moved);
}
