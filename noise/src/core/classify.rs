//! Classification of platform failures into recovery classes.
//!
//! The self-approval check is a substring match on the platform's message.
//! It lives here, and only here, so a wording change on the platform side is
//! a one-line fix.

use crate::core::errors::ApiError;

/// Recovery class of a failed platform call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Connectivity problem, rate limit or server-side error.
    Transient,
    /// The acting identity tried to approve its own pull request.
    SelfApproval,
    Other,
}

const SELF_APPROVAL_MARKER: &str = "approve your own pull request";

pub fn classify_api_error(err: &ApiError) -> FailureClass {
    match err {
        ApiError::Transport { .. } => FailureClass::Transient,
        ApiError::Status { status, body, .. } => {
            if body.to_ascii_lowercase().contains(SELF_APPROVAL_MARKER) {
                FailureClass::SelfApproval
            } else if *status == 429 || (500..=599).contains(status) {
                FailureClass::Transient
            } else {
                FailureClass::Other
            }
        }
        ApiError::Decode { .. } => FailureClass::Other,
    }
}
