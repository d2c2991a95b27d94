//! Integration tests for the signature forward pass.
//!
//! Results are checked against a naive tensor-algebra reference built from
//! nested vectors, and against the algebraic identities signatures obey.

use approx::assert_relative_eq;
use sigtensors::operations::{concat_leading, max_abs_diff, scale, slice_leading};
use sigtensors::{
    ParallelConfig, ParallelPlan, SignatureOptions, Tensor, combine, multi_combine, signature_channels,
    signature_forward,
};

fn random_path(shape: &[usize], seed: u64) -> Tensor<f64> {
    scale(&Tensor::randn_seeded(shape, seed), 0.5)
}

/// Levels 1..=depth of a tensor-algebra element, each flattened row-major.
type Levels = Vec<Vec<f64>>;

fn naive_exp(x: &[f64], depth: usize) -> Levels {
    let mut levels = vec![x.to_vec()];
    for k in 1..depth {
        let prev = &levels[k - 1];
        let mut next = Vec::with_capacity(prev.len() * x.len());
        for p in prev {
            for v in x {
                next.push(p * v / (k + 1) as f64);
            }
        }
        levels.push(next);
    }
    levels
}

fn naive_mult(a: &Levels, b: &Levels) -> Levels {
    let depth = a.len();
    (0..depth)
        .map(|n| {
            let mut out: Vec<f64> = a[n].iter().zip(&b[n]).map(|(x, y)| x + y).collect();
            for i in 0..n {
                let (left, right) = (&a[i], &b[n - 1 - i]);
                for (l_idx, l) in left.iter().enumerate() {
                    for (r_idx, r) in right.iter().enumerate() {
                        out[l_idx * right.len() + r_idx] += l * r;
                    }
                }
            }
            out
        })
        .collect()
}

/// Signature of batch element `b` by multiplying segment exponentials.
fn naive_signature(path: &Tensor<f64>, b: usize, depth: usize) -> Vec<f64> {
    let channels = path.shape()[2];
    let increment = |i: usize| -> Vec<f64> {
        (0..channels)
            .map(|c| path.get(&[i + 1, b, c]).unwrap() - path.get(&[i, b, c]).unwrap())
            .collect()
    };
    let mut acc = naive_exp(&increment(0), depth);
    for i in 1..path.shape()[0] - 1 {
        acc = naive_mult(&acc, &naive_exp(&increment(i), depth));
    }
    acc.concat()
}

fn assert_tensors_close(a: &Tensor<f64>, b: &Tensor<f64>, tol: f64) {
    assert_eq!(a.shape(), b.shape());
    let diff = max_abs_diff(a, b).unwrap();
    assert!(diff < tol, "max abs diff {diff} exceeds {tol}");
}

#[test]
fn test_matches_naive_reference() {
    for depth in 1..=4 {
        let path = random_path(&[6, 3, 2], depth as u64);
        let (sig, _) = signature_forward(&path, &SignatureOptions::new(depth), None, None).unwrap();
        assert_eq!(sig.shape(), &[3, signature_channels(2, depth)]);
        for b in 0..3 {
            let expected = naive_signature(&path, b, depth);
            for (a, e) in sig.slab(b).iter().zip(&expected) {
                assert_relative_eq!(*a, *e, epsilon = 1e-12);
            }
        }
    }
}

#[test]
fn test_depth_one_is_total_increment() {
    let path = random_path(&[9, 2, 3], 11);
    let (sig, _) = signature_forward(&path, &SignatureOptions::new(1), None, None).unwrap();
    for b in 0..2 {
        for c in 0..3 {
            let expected = path.get(&[8, b, c]).unwrap() - path.get(&[0, b, c]).unwrap();
            assert_relative_eq!(*sig.get(&[b, c]).unwrap(), expected, epsilon = 1e-12);
        }
    }
}

#[test]
fn test_basepoint_equals_prepended_sample() {
    let path = random_path(&[5, 2, 3], 21);
    let basepoint = random_path(&[1, 2, 3], 22);
    let extended = concat_leading(&[&basepoint, &path]).unwrap();
    let basepoint = basepoint.reshape(&[2, 3]).unwrap();

    for inverse in [false, true] {
        let opts = SignatureOptions::new(3).inverse(inverse);
        let (with_basepoint, _) = signature_forward(&path, &opts, Some(&basepoint), None).unwrap();
        let (prepended, _) = signature_forward(&extended, &opts, None, None).unwrap();
        assert_tensors_close(&with_basepoint, &prepended, 1e-12);
    }
}

#[test]
fn test_inverse_cancels_signature() {
    for depth in 1..=4 {
        let path = random_path(&[7, 2, 2], 30 + depth as u64);
        let opts = SignatureOptions::new(depth);
        let (sig, _) = signature_forward(&path, &opts, None, None).unwrap();
        let (inv, _) = signature_forward(&path, &opts.inverse(true), None, None).unwrap();

        let zero = Tensor::zeros(sig.shape());
        assert_tensors_close(&combine(&sig, &inv, 2, depth).unwrap(), &zero, 1e-12);
        assert_tensors_close(&combine(&inv, &sig, 2, depth).unwrap(), &zero, 1e-12);
    }
}

#[test]
fn test_chen_identity() {
    for depth in 1..=5 {
        let path = random_path(&[10, 2, 2], 40 + depth as u64);
        let opts = SignatureOptions::new(depth);
        let (whole, _) = signature_forward(&path, &opts, None, None).unwrap();

        let first = slice_leading(&path, 0..5).unwrap();
        let second = slice_leading(&path, 4..10).unwrap();
        let (sig_first, _) = signature_forward(&first, &opts, None, None).unwrap();
        let (sig_second, _) = signature_forward(&second, &opts, None, None).unwrap();

        let combined = combine(&sig_first, &sig_second, 2, depth).unwrap();
        assert_tensors_close(&combined, &whole, 1e-12);
    }
}

#[test]
fn test_initial_is_multiplied_on() {
    let path = random_path(&[6, 2, 3], 50);
    let prefix = random_path(&[4, 2, 3], 51);
    let opts = SignatureOptions::new(3);
    let (initial, _) = signature_forward(&prefix, &opts, None, None).unwrap();

    let (with_initial, _) = signature_forward(&path, &opts, None, Some(&initial)).unwrap();
    let (sig, _) = signature_forward(&path, &opts, None, None).unwrap();
    assert_tensors_close(&with_initial, &combine(&initial, &sig, 3, 3).unwrap(), 1e-12);

    let (inv_initial, _) = signature_forward(&prefix, &opts.inverse(true), None, None).unwrap();
    let (inv_with_initial, _) = signature_forward(&path, &opts.inverse(true), None, Some(&inv_initial)).unwrap();
    let (inv, _) = signature_forward(&path, &opts.inverse(true), None, None).unwrap();
    assert_tensors_close(&inv_with_initial, &combine(&inv, &inv_initial, 3, 3).unwrap(), 1e-12);
}

#[test]
fn test_history_holds_every_prefix() {
    let path = random_path(&[6, 2, 2], 60);
    for inverse in [false, true] {
        let opts = SignatureOptions::new(3).inverse(inverse);
        let (history, increments) = signature_forward(&path, &opts.retain_history(true), None, None).unwrap();
        assert_eq!(history.shape(), &[5, 2, 14]);
        assert_eq!(increments.shape(), &[5, 2, 2]);

        for end in 2..=6 {
            let prefix = slice_leading(&path, 0..end).unwrap();
            let (sig, _) = signature_forward(&prefix, &opts, None, None).unwrap();
            assert_tensors_close(&history.slab_tensor(end - 2).unwrap(), &sig, 1e-12);
        }
    }
}

#[test]
fn test_parallel_matches_serial() {
    let parallel = ParallelConfig::new()
        .with_max_threads(4)
        .with_volume_threshold(0)
        .with_min_chunk_len(1);
    let basepoint = random_path(&[2, 3], 71);
    let initial = random_path(&[2, signature_channels(3, 3)], 72);

    for batch in [1, 2, 5] {
        let path = random_path(&[23, batch, 3], 70 + batch as u64);
        let basepoint = slice_leading(&basepoint, 0..batch.min(2)).unwrap();
        let initial = slice_leading(&initial, 0..batch.min(2)).unwrap();
        for inverse in [false, true] {
            for history in [false, true] {
                let serial = SignatureOptions::new(3).inverse(inverse).retain_history(history);
                let threaded = serial.parallel(parallel);

                let (a, _) = signature_forward(&path, &serial, None, None).unwrap();
                let (b, _) = signature_forward(&path, &threaded, None, None).unwrap();
                assert_tensors_close(&a, &b, 1e-10);

                if batch <= 2 {
                    let (a, _) = signature_forward(&path, &serial, Some(&basepoint), Some(&initial)).unwrap();
                    let (b, _) = signature_forward(&path, &threaded, Some(&basepoint), Some(&initial)).unwrap();
                    assert_tensors_close(&a, &b, 1e-10);
                }
            }
        }
    }
}

#[test]
fn test_parallel_matches_serial_at_default_threshold() {
    // both shapes sit just above the default volume threshold at depth 4
    let parallel = ParallelConfig::new().with_max_threads(4);
    let sig_channels = signature_channels(4, 4);

    for (shape, seed) in [([130, 33, 4], 73), ([5000, 1, 4], 74)] {
        let [stream, batch, _] = shape;
        let plan = ParallelPlan::choose(&parallel, batch, stream, stream - 1, sig_channels, false);
        assert!(!plan.is_serial(), "{shape:?} should run threaded");

        let path = scale(&random_path(&shape, seed), 0.2);
        let serial = SignatureOptions::new(4);
        let (a, _) = signature_forward(&path, &serial, None, None).unwrap();
        let (b, _) = signature_forward(&path, &serial.parallel(parallel), None, None).unwrap();
        let magnitude = a.data().iter().fold(1.0_f64, |m, v| m.max(v.abs()));
        assert_tensors_close(&a, &b, 1e-10 * magnitude);
    }
}

#[test]
fn test_multi_combine_of_segments() {
    let path = random_path(&[7, 2, 2], 80);
    let opts = SignatureOptions::new(4);
    let (whole, _) = signature_forward(&path, &opts, None, None).unwrap();

    let pieces: Vec<Tensor<f64>> = [0..3, 2..5, 4..7]
        .into_iter()
        .map(|range| {
            let piece = slice_leading(&path, range).unwrap();
            signature_forward(&piece, &opts, None, None).unwrap().0
        })
        .collect();
    let refs: Vec<&Tensor<f64>> = pieces.iter().collect();
    assert_tensors_close(&multi_combine(&refs, 2, 4).unwrap(), &whole, 1e-12);
}

#[test]
fn test_f32_agrees_with_f64() {
    let path = random_path(&[5, 2, 2], 90);
    let path32 = Tensor::from_vec(path.data().iter().map(|&v| v as f32).collect(), path.shape()).unwrap();
    let (sig, _) = signature_forward(&path, &SignatureOptions::new(3), None, None).unwrap();
    let (sig32, _) = signature_forward(&path32, &SignatureOptions::new(3), None, None).unwrap();
    for (a, b) in sig.data().iter().zip(sig32.data()) {
        assert_relative_eq!(*a, f64::from(*b), epsilon = 1e-4);
    }
}
