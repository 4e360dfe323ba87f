//! Smart error diagnosis with actionable guidance

/// Provide context-aware guidance for common error patterns.
///
/// Returns `Some(hint)` if the error message matches a known pattern,
/// providing the user with actionable steps to resolve the issue.
pub fn diagnose(err: &dyn std::fmt::Display) -> Option<String> {
    let msg = err.to_string();
    let lower = msg.to_lowercase();

    if lower.contains("connection refused") {
        return Some(
            "The rendezvous relay may be down or unreachable. Try:\n  \
             1. Check your internet connection\n  \
             2. Try a different relay: latch new --relay <address>"
                .to_string(),
        );
    }
    if lower.contains("timed out") || lower.contains("timeout") {
        return Some(
            "Handshake timed out. The peer may not have joined yet, or the \
             relay may be slow. Double-check the passphrase and try again."
                .to_string(),
        );
    }
    if lower.contains("bad key") || lower.contains("passphrase mismatch") {
        return Some(
            "The passphrases didn't match. Re-check the phrase was copied \
             exactly, including hyphens, and that it hasn't already been \
             used once (a slot retires itself after the first wrong guess)."
                .to_string(),
        );
    }
    if lower.contains("no such slot") {
        return Some(
            "That slot doesn't exist. It may have expired, already paired, \
             or never been created. Ask the other peer for a fresh code."
                .to_string(),
        );
    }
    if lower.contains("broken pipe") || lower.contains("peer hung up") {
        return Some("The other peer disconnected before the handshake finished.".to_string());
    }

    None
}
