//! Kernels of the truncated tensor algebra.
//!
//! Every kernel works on a single batch row laid out by a
//! [`GradedLayout`](crate::graded::GradedLayout) and updates its output in
//! place. Each forward kernel has a hand-written backward counterpart;
//! where the backward needs intermediates that the forward discards, they
//! are replayed into an explicit residuals value first
//! ([`FusedResiduals`], [`LogResiduals`]).

mod exp;
mod log;
mod mult;

pub use exp::{
    FusedResiduals, FusedWorkspace, mult_fused_restricted_exp, mult_fused_restricted_exp_backward, restricted_exp,
    restricted_exp_backward,
};
pub use log::{LogResiduals, log, log_backward};
pub use mult::{mult, mult_backward, mult_partial, mult_partial_backward};
