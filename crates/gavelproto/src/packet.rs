use crate::ProtoError;

/// One protocol packet: an opcode plus its `#`-separated argument fields.
///
/// Parsing takes a frame's text with the `%` terminator already stripped,
/// e.g. `CT#name#/help#`. Every well-formed packet ends with one separator
/// before the terminator; that trailing separator is a framing artifact and
/// is dropped, so `body.len()` equals the number of fields the client sent.
/// Interior empty fields are preserved (`CT#name##` has body `["name", ""]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub name: String,
    pub body: Vec<String>,
}

impl Packet {
    pub fn with_body(name: &str, body: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            body,
        }
    }

    pub fn parse(frame: &str) -> Result<Self, ProtoError> {
        let frame = frame.strip_suffix('#').unwrap_or(frame);
        if frame.is_empty() {
            return Err(ProtoError::Empty);
        }

        let mut parts = frame.split('#');
        let name = parts.next().unwrap_or_default();
        if name.is_empty() {
            return Err(ProtoError::Malformed("missing opcode"));
        }

        Ok(Self {
            name: name.to_string(),
            body: parts.map(str::to_string).collect(),
        })
    }
}

impl std::fmt::Display for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.body.is_empty() {
            write!(f, "{}#%", self.name)
        } else {
            write!(f, "{}#{}#%", self.name, self.body.join("#"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_args() {
        let p = Packet::parse("CT#name#/help#").unwrap();
        assert_eq!(p.name, "CT");
        assert_eq!(p.body, vec!["name", "/help"]);
    }

    #[test]
    fn parses_no_args() {
        let p = Packet::parse("askchaa#").unwrap();
        assert_eq!(p.name, "askchaa");
        assert!(p.body.is_empty());
    }

    #[test]
    fn preserves_interior_empty_fields() {
        let p = Packet::parse("CT#name##").unwrap();
        assert_eq!(p.body, vec!["name", ""]);
    }

    #[test]
    fn rejects_empty_and_nameless() {
        assert_eq!(Packet::parse("#"), Err(ProtoError::Empty));
        assert_eq!(
            Packet::parse("#a#b#"),
            Err(ProtoError::Malformed("missing opcode"))
        );
    }

    #[test]
    fn renders_wire_form() {
        let p = Packet::with_body("MS", vec!["chat".into(), "pre".into()]);
        assert_eq!(p.to_string(), "MS#chat#pre#%");
        let p = Packet::with_body("DONE", vec![]);
        assert_eq!(p.to_string(), "DONE#%");
    }

    #[test]
    fn display_round_trips() {
        let p = Packet::with_body("HP", vec!["1".into(), "10".into()]);
        let text = p.to_string();
        let back = Packet::parse(text.strip_suffix('%').unwrap()).unwrap();
        assert_eq!(back, p);
    }
}
