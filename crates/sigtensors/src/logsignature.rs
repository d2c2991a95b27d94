//! Log-signatures in expanded tensor-algebra form.
//!
//! The log-signature is the truncated logarithm of the signature, stored in
//! the same graded layout. No Lyndon compression is applied.

use crate::algebra::{log, log_backward};
use crate::error::SignatureError;
use crate::graded::GradedLayout;
use crate::reciprocals::Reciprocals;
use crate::scalar::Scalar;
use crate::tensor::Tensor;
use crate::validate;

/// Take the logarithm of every signature row.
///
/// `signature` has shape `(batch, signature_channels)` or, for a retained
/// history, `(stream, batch, signature_channels)`. The output has the same
/// shape.
///
/// # Errors
///
/// Returns a [`SignatureError`] if the trailing dimension does not match
/// `signature_channels(channels, depth)`.
///
/// # Example
///
/// ```
/// use sigtensors::{Tensor, signature_to_logsignature};
///
/// // one channel, depth 2: the signature of the increment 2 is (2, 2)
/// let sig = Tensor::<f64>::from_vec(vec![2.0, 2.0], &[1, 2]).unwrap();
/// let logsig = signature_to_logsignature(&sig, 1, 2).unwrap();
/// assert!((logsig.data()[0] - 2.0).abs() < 1e-12);
/// assert!(logsig.data()[1].abs() < 1e-12);
/// ```
pub fn signature_to_logsignature<T: Scalar>(
    signature: &Tensor<T>,
    channels: usize,
    depth: usize,
) -> Result<Tensor<T>, SignatureError> {
    validate::check_signature_tensor(signature, "signature", channels, depth, true)?;
    let layout = GradedLayout::new(channels, depth);
    let reciprocals = Reciprocals::new(depth);
    let row_len = layout.row_len();

    let mut out = Tensor::zeros(signature.shape());
    for (out_row, row) in out.data_mut().chunks_exact_mut(row_len).zip(signature.data().chunks_exact(row_len)) {
        log(&layout, out_row, row, &reciprocals);
    }
    Ok(out)
}

/// Gradient of [`signature_to_logsignature`] with respect to the signature.
///
/// # Errors
///
/// Returns a [`SignatureError`] if `grad` and `signature` differ in shape or
/// the signature is malformed.
pub fn signature_to_logsignature_backward<T: Scalar>(
    grad: &Tensor<T>,
    signature: &Tensor<T>,
    channels: usize,
    depth: usize,
) -> Result<Tensor<T>, SignatureError> {
    validate::check_signature_tensor(signature, "signature", channels, depth, true)?;
    if grad.shape() != signature.shape() {
        return Err(SignatureError::ArgumentShape {
            argument: "grad",
            expected: signature.shape().to_vec(),
            actual: grad.shape().to_vec(),
        });
    }
    let layout = GradedLayout::new(channels, depth);
    let reciprocals = Reciprocals::new(depth);
    let row_len = layout.row_len();

    let mut grad_out = grad.clone();
    let mut grad_signature = Tensor::zeros(signature.shape());
    let rows = grad_out
        .data_mut()
        .chunks_exact_mut(row_len)
        .zip(grad_signature.data_mut().chunks_exact_mut(row_len))
        .zip(signature.data().chunks_exact(row_len));
    for ((grad_out_row, grad_row), row) in rows {
        log_backward(&layout, grad_out_row, grad_row, row, &reciprocals);
    }
    Ok(grad_signature)
}
