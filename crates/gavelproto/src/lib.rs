//! `gavelproto`: the text wire codec shared by the courtroom server.
//!
//! A packet is `OPCODE#arg1#arg2#...#%`. The outer `%` terminator is handled
//! by the stream framer; this crate parses the remaining text into a
//! [`packet::Packet`] and applies the four-token escape alphabet to payload
//! fields (`escape::encode` / `escape::decode`). Opcodes and separators are
//! never escaped; decoded strings are validated at the semantic layer only.

pub mod escape;
pub mod packet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtoError {
    Empty,
    Malformed(&'static str),
}

impl std::fmt::Display for ProtoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtoError::Empty => write!(f, "empty packet"),
            ProtoError::Malformed(s) => write!(f, "malformed packet: {s}"),
        }
    }
}

impl std::error::Error for ProtoError {}
