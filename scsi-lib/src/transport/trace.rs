//! Per-command tracing under the `chromadisc::cmd_trace` target (spec §9 logging notes).

use super::adapter::{CommandRequest, IssueOutcome};

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(" ")
}

pub fn log_request(name: &str, request: &CommandRequest<'_>) {
    tracing::trace!(
        target: "chromadisc::cmd_trace",
        command = name,
        cdb = %hex(request.cdb),
        direction = ?request.direction,
        transfer_len = request.transfer_len,
        timeout_ms = request.timeout_ms,
        "issuing command"
    );
}

pub fn log_outcome(name: &str, outcome: &IssueOutcome) {
    if outcome.check_condition {
        tracing::debug!(
            target: "chromadisc::cmd_trace",
            command = name,
            sense = %hex(&outcome.sense),
            host_status = outcome.host_status,
            driver_status = outcome.driver_status,
            duration_ms = outcome.duration_ms,
            "command ended in CHECK CONDITION"
        );
    } else {
        tracing::trace!(
            target: "chromadisc::cmd_trace",
            command = name,
            bytes_transferred = outcome.data.len(),
            duration_ms = outcome.duration_ms,
            "command completed"
        );
    }
}
