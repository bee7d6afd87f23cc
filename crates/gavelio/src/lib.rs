//! `gavelio`: async stream framing for the courtroom wire protocol.
//!
//! Frames on the wire are text packets terminated by a `%` byte
//! (`OPCODE#arg1#...#%`). The reader splits the inbound byte stream on that
//! terminator; the terminator itself is consumed and not returned.

pub mod frame;
