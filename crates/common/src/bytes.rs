//! Byte-sequence helpers shared across the workspace.

/// Decode store bytes for the wire model.
///
/// The wire model carries UTF-8 strings only; non-UTF-8 content is
/// decoded lossily (invalid sequences become U+FFFD), not rejected.
pub fn decode_utf8_lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
