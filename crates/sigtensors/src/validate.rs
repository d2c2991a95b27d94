//! Argument checks at the public boundary.
//!
//! Kernels assume well-formed input; everything they rely on is checked
//! here and reported as a [`SignatureError`].

use crate::error::SignatureError;
use crate::graded::signature_channels;
use crate::scalar::Scalar;
use crate::tensor::Tensor;

fn check_rank<T: Scalar>(tensor: &Tensor<T>, argument: &'static str, expected: usize) -> Result<(), SignatureError> {
    if tensor.ndim() != expected {
        return Err(SignatureError::Rank {
            argument,
            expected,
            actual: tensor.ndim(),
        });
    }
    Ok(())
}

fn check_shape<T: Scalar>(tensor: &Tensor<T>, argument: &'static str, expected: &[usize]) -> Result<(), SignatureError> {
    if tensor.shape() != expected {
        return Err(SignatureError::ArgumentShape {
            argument,
            expected: expected.to_vec(),
            actual: tensor.shape().to_vec(),
        });
    }
    Ok(())
}

pub fn check_depth(depth: usize) -> Result<(), SignatureError> {
    if depth < 1 {
        return Err(SignatureError::InvalidDepth { depth });
    }
    Ok(())
}

/// A `(stream, batch, channel)` path with no empty axis.
pub fn check_path<T: Scalar>(path: &Tensor<T>, has_basepoint: bool) -> Result<(), SignatureError> {
    check_rank(path, "path", 3)?;
    if path.shape().contains(&0) {
        return Err(SignatureError::ZeroSizedDimension {
            argument: "path",
            shape: path.shape().to_vec(),
        });
    }
    if !has_basepoint && path.shape()[0] < 2 {
        return Err(SignatureError::StreamTooShort {
            stream: path.shape()[0],
        });
    }
    Ok(())
}

/// Everything `signature_forward` needs before it runs.
pub fn check_signature_args<T: Scalar>(
    path: &Tensor<T>,
    depth: usize,
    basepoint: Option<&Tensor<T>>,
    initial: Option<&Tensor<T>>,
) -> Result<(), SignatureError> {
    check_path(path, basepoint.is_some())?;
    check_depth(depth)?;
    let batch = path.shape()[1];
    let channels = path.shape()[2];
    if let Some(basepoint) = basepoint {
        check_shape(basepoint, "basepoint", &[batch, channels])?;
    }
    if let Some(initial) = initial {
        check_shape(initial, "initial", &[batch, signature_channels(channels, depth)])?;
    }
    Ok(())
}

/// Everything `signature_backward` needs before it runs.
///
/// The increments fix the expected signature shape; the gradient must
/// match the signature exactly.
pub fn check_backward_args<T: Scalar>(
    grad: &Tensor<T>,
    signature: &Tensor<T>,
    increments: &Tensor<T>,
    depth: usize,
    retain_history: bool,
) -> Result<(), SignatureError> {
    check_depth(depth)?;
    check_rank(increments, "increments", 3)?;
    if increments.shape().contains(&0) {
        return Err(SignatureError::ZeroSizedDimension {
            argument: "increments",
            shape: increments.shape().to_vec(),
        });
    }
    let [stream, batch, channels] = [increments.shape()[0], increments.shape()[1], increments.shape()[2]];
    let sig_channels = signature_channels(channels, depth);
    if retain_history {
        check_shape(signature, "signature", &[stream, batch, sig_channels])?;
    } else {
        check_shape(signature, "signature", &[batch, sig_channels])?;
    }
    check_shape(grad, "grad", signature.shape())
}

/// A `(batch, signature_channels)` signature, or with a leading stream
/// axis when `allow_stream` is set.
pub fn check_signature_tensor<T: Scalar>(
    signature: &Tensor<T>,
    argument: &'static str,
    channels: usize,
    depth: usize,
    allow_stream: bool,
) -> Result<(), SignatureError> {
    check_depth(depth)?;
    let rank_ok = signature.ndim() == 2 || (allow_stream && signature.ndim() == 3);
    if !rank_ok {
        return Err(SignatureError::Rank {
            argument,
            expected: 2,
            actual: signature.ndim(),
        });
    }
    let expected = signature_channels(channels, depth);
    let actual = signature.shape()[signature.ndim() - 1];
    if actual != expected {
        let mut expected_shape = signature.shape().to_vec();
        expected_shape[signature.ndim() - 1] = expected;
        return Err(SignatureError::ArgumentShape {
            argument,
            expected: expected_shape,
            actual: signature.shape().to_vec(),
        });
    }
    Ok(())
}

/// Two signatures that can be multiplied row by row.
pub fn check_combine_args<T: Scalar>(
    left: &Tensor<T>,
    right: &Tensor<T>,
    channels: usize,
    depth: usize,
) -> Result<(), SignatureError> {
    check_signature_tensor(left, "sigtensor1", channels, depth, false)?;
    check_signature_tensor(right, "sigtensor2", channels, depth, false)?;
    check_shape(right, "sigtensor2", left.shape())
}
