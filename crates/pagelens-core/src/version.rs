//! Signature-based markup version detection.

/// Label used when no known doctype signature is present.
pub const UNKNOWN_VERSION: &str = "Unknown";

/// Doctype fragments and the version they identify, checked in order.
const SIGNATURES: &[(&str, &str)] = &[
    ("<!doctype html>", "HTML5"),
    ("-//w3c//dtd html 4.01//en", "HTML 4.01 Strict"),
    ("-//w3c//dtd xhtml 1.0 strict//en", "XHTML 1.0 Strict"),
    ("-//ietf//dtd html 2.0//en", "HTML 2.0"),
    ("-//w3c//dtd html 3.2 final//en", "HTML 3.2"),
    ("-//w3c//dtd xhtml 1.1//en", "XHTML 1.1"),
    ("html profile=", "HTML5 with profile"),
];

/// Guess the markup version of a raw document body.
///
/// Signatures may appear anywhere in the document, not only on the first
/// line. The first entry of the table that matches wins.
pub fn detect_html_version(body: &str) -> &'static str {
    let normalized = body.trim_start().to_lowercase();

    SIGNATURES
        .iter()
        .find(|(signature, _)| normalized.contains(signature))
        .map(|(_, version)| *version)
        .unwrap_or(UNKNOWN_VERSION)
}
