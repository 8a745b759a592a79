//! Hub JSON wire protocol: handshake, negotiation, and message framing.

pub mod handshake;
pub mod message;
pub mod negotiate;

/// Terminates every JSON record on the wire.
pub const RECORD_SEPARATOR: char = '\u{1e}';

/// Split a text frame into its records, skipping empty trailing pieces.
pub fn split_records(frame: &str) -> impl Iterator<Item = &str> {
    frame
        .split(RECORD_SEPARATOR)
        .filter(|record| !record.trim().is_empty())
}
