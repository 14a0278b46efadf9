//! Content normalisation: turn uploaded bytes into Markdown the converter
//! sees the same way regardless of where the file was edited.
//!
//! Rules (applied in order):
//! 1. Decode as UTF-8, dropping a leading byte-order mark
//! 2. Normalise line endings (CRLF / CR → LF)
//! 3. Ensure the text ends with exactly one newline
//!
//! Every other character passes through untouched: zero-width joiners and
//! non-joiners are part of the text in Persian, the Indic scripts and emoji
//! sequences. Trailing double spaces (Markdown hard breaks) and blank lines
//! inside fenced code survive as well.

/// Decode an uploaded buffer and normalise it.
///
/// # Errors
/// Returns the decoder's message when `bytes` is not valid UTF-8.
pub fn decode_source(bytes: &[u8]) -> Result<String, String> {
    let text = std::str::from_utf8(bytes).map_err(|e| e.to_string())?;
    Ok(normalize_markup(text))
}

/// Apply the text-level normalisation rules.
pub fn normalize_markup(input: &str) -> String {
    let s = input.strip_prefix('\u{FEFF}').unwrap_or(input);
    let s = normalise_line_endings(s);
    ensure_final_newline(&s)
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Ensure file ends with single newline ─────────────────────────────

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end_matches('\n');
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
