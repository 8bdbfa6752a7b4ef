//! The Transport Adapter layer (spec §4.1): one trait, two implementations, plus the sense
//! classification and retry policy the Command Library builds its blocking command calls on.

pub mod adapter;
pub mod dummy;
pub mod retry;
pub mod sense;
pub mod sgio;
mod trace;

use std::os::fd::RawFd;
use std::thread;

pub use adapter::{Adapter, CommandRequest, Direction, IssueOutcome, TransportError};
pub use sense::Category;

/// Runs one command to completion, retrying while [`sense::classify`] reports [`Category::Retry`]
/// and the command's timeout budget has not elapsed.
///
/// This is the single place the Command Library goes through to reach an adapter; individual
/// command modules build the CDB and interpret the data phase, but never call `Adapter::issue`
/// directly.
pub fn run_with_retry<A: Adapter>(
    adapter: &A,
    fd: RawFd,
    name: &str,
    mut make_request: impl FnMut() -> CommandRequest<'_>,
    backoff: retry::Backoff,
) -> Result<(IssueOutcome, Category), TransportError> {
    let deadline = retry::DeadlineClock::new(make_request().timeout_ms);
    let mut attempt = 0u32;

    loop {
        let request = make_request();
        trace::log_request(name, &request);
        let outcome = adapter.issue(fd, request)?;
        trace::log_outcome(name, &outcome);

        let category = sense::classify(outcome.check_condition, &outcome.sense);

        if category != Category::Retry || deadline.expired() {
            return Ok((outcome, category));
        }

        thread::sleep(backoff.delay_for_attempt(attempt));
        attempt += 1;
    }
}
