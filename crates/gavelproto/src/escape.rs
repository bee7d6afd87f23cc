//! The payload escape alphabet.
//!
//! Four bytes are reserved by the framing (`%`), the field separator (`#`)
//! and legacy client internals (`$`, `&`); payload text substitutes them:
//!
//! | raw | wire token  |
//! |-----|-------------|
//! | `%` | `<percent>` |
//! | `#` | `<num>`     |
//! | `$` | `<dollar>`  |
//! | `&` | `<and>`     |
//!
//! Replacement tokens contain none of the reserved bytes and the reserved
//! bytes cannot complete a token, so sequential single-token passes are
//! order-independent and `decode(encode(s)) == s` for every string.

const TABLE: &[(char, &str)] = &[
    ('%', "<percent>"),
    ('#', "<num>"),
    ('$', "<dollar>"),
    ('&', "<and>"),
];

/// Escapes the reserved bytes of a raw payload string for the wire.
pub fn encode(s: &str) -> String {
    let mut out = s.to_string();
    for (raw, token) in TABLE {
        if out.contains(*raw) {
            out = out.replace(*raw, token);
        }
    }
    out
}

/// Reverses the escape substitutions of an inbound payload field.
pub fn decode(s: &str) -> String {
    let mut out = s.to_string();
    for (raw, token) in TABLE {
        if out.contains(token) {
            out = out.replace(token, &raw.to_string());
        }
    }
    out
}
