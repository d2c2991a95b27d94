//! Integration tests for interval signatures.

use sigtensors::operations::{concat_leading, max_abs_diff, scale, slice_leading};
use sigtensors::{ParallelConfig, Path, SignatureError, SignatureOptions, Tensor, signature_forward, signature_to_logsignature};

fn random_path(shape: &[usize], seed: u64) -> Tensor<f64> {
    scale(&Tensor::randn_seeded(shape, seed), 0.5)
}

fn direct_signature(samples: &Tensor<f64>, start: usize, end: usize, depth: usize) -> Tensor<f64> {
    let piece = slice_leading(samples, start..end).unwrap();
    signature_forward(&piece, &SignatureOptions::new(depth), None, None).unwrap().0
}

fn assert_close(a: &Tensor<f64>, b: &Tensor<f64>) {
    assert_eq!(a.shape(), b.shape());
    let diff = max_abs_diff(a, b).unwrap();
    assert!(diff < 1e-11, "max abs diff {diff}");
}

#[test]
fn test_every_interval_matches_direct_signature() {
    let samples = random_path(&[7, 2, 2], 1);
    let path = Path::new(&samples, 3, None).unwrap();
    for start in 0..7 {
        for end in start + 2..=7 {
            let sig = path.signature(Some(start as isize), Some(end as isize)).unwrap();
            assert_close(&sig, &direct_signature(&samples, start, end, 3));
        }
    }
}

#[test]
fn test_basepoint_is_first_point() {
    let samples = random_path(&[5, 2, 3], 2);
    let basepoint = random_path(&[1, 2, 3], 3);
    let extended = concat_leading(&[&basepoint, &samples]).unwrap();
    let basepoint = basepoint.reshape(&[2, 3]).unwrap();

    let path = Path::new(&samples, 2, Some(&basepoint)).unwrap();
    assert_eq!(path.len(), 6);
    assert_close(&path.path().unwrap(), &extended);
    for start in 0..5 {
        let sig = path.signature(Some(start as isize), None).unwrap();
        assert_close(&sig, &direct_signature(&extended, start, 6, 2));
    }
}

#[test]
fn test_update_matches_concatenated_path() {
    let first = random_path(&[4, 2, 2], 4);
    let second = random_path(&[3, 2, 2], 5);
    let third = random_path(&[1, 2, 2], 6);
    let whole = concat_leading(&[&first, &second, &third]).unwrap();

    let mut path = Path::new(&first, 4, None).unwrap();
    path.update(&second).unwrap();
    path.update(&third).unwrap();
    assert_eq!(path.len(), 8);
    assert_eq!(path.signature_len(), 7);
    assert_eq!(path.shape(), [8, 2, 2]);
    assert_eq!(path.pieces().len(), 3);

    for start in 0..8 {
        for end in start + 2..=8 {
            let sig = path.signature(Some(start as isize), Some(end as isize)).unwrap();
            assert_close(&sig, &direct_signature(&whole, start, end, 4));
        }
    }
}

#[test]
fn test_negative_and_clamped_indices() {
    let samples = random_path(&[6, 1, 2], 7);
    let path = Path::new(&samples, 3, None).unwrap();

    let all = path.signature(None, None).unwrap();
    assert_close(&all, &direct_signature(&samples, 0, 6, 3));
    assert_close(&path.signature(Some(-100), Some(100)).unwrap(), &all);
    assert_close(
        &path.signature(Some(-4), Some(-1)).unwrap(),
        &direct_signature(&samples, 2, 5, 3),
    );

    assert!(matches!(
        path.signature(Some(-1), None),
        Err(SignatureError::InvalidInterval { resolved_start: 5, resolved_end: 6, length: 6, .. })
    ));
}

#[test]
fn test_logsignature_on_interval() {
    let samples = random_path(&[6, 2, 2], 8);
    let path = Path::new(&samples, 3, None).unwrap();
    let logsig = path.logsignature(Some(1), Some(5)).unwrap();
    let expected = signature_to_logsignature(&direct_signature(&samples, 1, 5, 3), 2, 3).unwrap();
    assert_close(&logsig, &expected);
}

#[test]
fn test_accessors() {
    let samples = random_path(&[5, 3, 2], 9);
    let path = Path::with_parallel(&samples, 3, None, ParallelConfig::new().with_max_threads(2)).unwrap();
    assert_eq!(path.depth(), 3);
    assert_eq!(path.channels(), 2);
    assert_eq!(path.batch_size(), 3);
    assert_eq!(path.signature_channels(), 14);
    assert_eq!(path.signature_len(), 4);
    assert!(!path.is_empty());
}
