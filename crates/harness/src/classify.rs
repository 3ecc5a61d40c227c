//! Outcome classification for reopen attempts
//!
//! | Reopen result | Outcome |
//! |---------------|---------|
//! | not found | pass |
//! | stale | pass |
//! | handle opened | fail (the handle is closed first) |
//! | any other error | fail |

use stalefh_core::{FailureReason, ObjectIndex, Outcome, OutcomeRecord, PassKind, ReopenError};
use stalefh_platform::OpenedObject;
use std::io;
use tracing::warn;

/// Classify the result of reopening the reference captured for `index`.
///
/// A handle that was opened is released before the record is returned.
pub fn classify(
    index: ObjectIndex,
    result: Result<Box<dyn OpenedObject>, ReopenError>,
) -> OutcomeRecord {
    let outcome = match result {
        Err(ReopenError::NotFound) => Outcome::Pass {
            kind: PassKind::NotFound,
        },
        Err(ReopenError::Stale) => Outcome::Pass {
            kind: PassKind::Stale,
        },
        Err(ReopenError::Other(err)) => Outcome::Fail {
            reason: unexpected_error(&err),
        },
        Ok(object) => {
            if let Err(e) = object.close() {
                warn!(
                    target: "stalefh::harness",
                    index = index.get(),
                    error = %e,
                    "Failed to close handle opened from a stale reference"
                );
            }
            Outcome::Fail {
                reason: FailureReason::UnexpectedOpen,
            }
        }
    };
    OutcomeRecord::new(index, outcome)
}

fn unexpected_error(err: &io::Error) -> FailureReason {
    FailureReason::UnexpectedError {
        code: err.raw_os_error(),
        message: err.to_string(),
    }
}

/// Extra context for a failure, if one applies.
pub fn failure_hint(reason: &FailureReason) -> Option<&'static str> {
    match reason {
        FailureReason::UnexpectedError {
            code: Some(libc::EPERM),
            ..
        } => Some("reopen by handle requires CAP_DAC_READ_SEARCH; run as root"),
        _ => None,
    }
}

/// The hint of the first failing record that has one, in index order.
///
/// Reported once per run rather than once per failing record.
pub fn run_hint<'a>(
    records: impl IntoIterator<Item = &'a OutcomeRecord>,
) -> Option<&'static str> {
    records
        .into_iter()
        .filter_map(OutcomeRecord::failure)
        .find_map(failure_hint)
}
