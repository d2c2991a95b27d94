//! Integration tests for log-signatures.

use approx::assert_relative_eq;
use sigtensors::operations::scale;
use sigtensors::{
    GradedLayout, SignatureError, SignatureOptions, Tensor, signature_forward, signature_to_logsignature,
    slice_at_stream, slice_by_term,
};

fn random_path(shape: &[usize], seed: u64) -> Tensor<f64> {
    scale(&Tensor::randn_seeded(shape, seed), 0.5)
}

#[test]
fn test_straight_line_has_only_first_level() {
    // collinear samples: the log-signature is the displacement
    let direction = [0.3, -1.2, 0.7];
    let data: Vec<f64> = (0..5).flat_map(|t| direction.iter().map(move |d| t as f64 * d)).collect();
    let path = Tensor::from_vec(data, &[5, 1, 3]).unwrap();

    for depth in 1..=4 {
        let (sig, _) = signature_forward(&path, &SignatureOptions::new(depth), None, None).unwrap();
        let logsig = signature_to_logsignature(&sig, 3, depth).unwrap();
        let terms = slice_by_term(&logsig, &GradedLayout::new(3, depth)).unwrap();
        for (c, d) in direction.iter().enumerate() {
            assert_relative_eq!(*terms[0].get(&[0, c]).unwrap(), 4.0 * d, epsilon = 1e-12);
        }
        for term in &terms[1..] {
            for v in term.data() {
                assert_relative_eq!(*v, 0.0, epsilon = 1e-10);
            }
        }
    }
}

#[test]
fn test_second_level_is_levy_area() {
    // two segments x then y: level two of the log is (x⊗y - y⊗x) / 2
    let x = [1.0, 0.0];
    let y = [0.0, 2.0];
    let data = vec![0.0, 0.0, x[0], x[1], x[0] + y[0], x[1] + y[1]];
    let path = Tensor::from_vec(data, &[3, 1, 2]).unwrap();

    let (sig, _) = signature_forward(&path, &SignatureOptions::new(2), None, None).unwrap();
    let logsig = signature_to_logsignature(&sig, 2, 2).unwrap();
    let terms = slice_by_term(&logsig, &GradedLayout::new(2, 2)).unwrap();

    assert_eq!(terms[1].shape(), &[1, 4]);
    for i in 0..2 {
        for j in 0..2 {
            let area = 0.5 * (x[i] * y[j] - y[i] * x[j]);
            assert_relative_eq!(*terms[1].get(&[0, 2 * i + j]).unwrap(), area, epsilon = 1e-12);
        }
    }
}

#[test]
fn test_history_rows_match_individual_logsignatures() {
    let path = random_path(&[5, 2, 2], 7);
    let opts = SignatureOptions::new(3);
    let (history, _) = signature_forward(&path, &opts.retain_history(true), None, None).unwrap();
    let logsig_history = signature_to_logsignature(&history, 2, 3).unwrap();
    assert_eq!(logsig_history.shape(), history.shape());

    let (last, _) = signature_forward(&path, &opts, None, None).unwrap();
    let logsig_last = signature_to_logsignature(&last, 2, 3).unwrap();

    let terms = slice_by_term(&logsig_history, &GradedLayout::new(2, 3)).unwrap();
    let final_terms = slice_at_stream(&terms, 3).unwrap();
    let expected_terms = slice_by_term(&logsig_last, &GradedLayout::new(2, 3)).unwrap();
    for (a, b) in final_terms.iter().zip(&expected_terms) {
        assert_eq!(a.shape(), b.shape());
        for (x, y) in a.data().iter().zip(b.data()) {
            assert_relative_eq!(*x, *y, epsilon = 1e-12);
        }
    }
}

#[test]
fn test_rejects_wrong_rank() {
    let sig = Tensor::<f64>::zeros(&[6]);
    assert!(matches!(
        signature_to_logsignature(&sig, 2, 2),
        Err(SignatureError::Rank { .. })
    ));
}
