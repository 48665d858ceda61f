//! Response validation guard.
//!
//! When a session requires validated responses, a move that carries an
//! all-empty response set is rejected before the navigation suspension
//! point is ever reached, and the session stays at its prior position.

use qtiforge_core::responses::NavigationParams;

use crate::error::SequencerError;

/// Reject a move whose params carry no usable response.
///
/// A plain move with no response payload at all is allowed; only a
/// submission whose every response list is empty is rejected.
pub fn check_responses(
    params: &NavigationParams,
    validate_responses: bool,
) -> Result<(), SequencerError> {
    if !validate_responses {
        return Ok(());
    }
    if params.responses.is_empty() {
        return Ok(());
    }
    if params.is_empty_response() {
        return Err(SequencerError::EmptyResponseRejected);
    }
    Ok(())
}
