//! Packet payloads carried between devices.

/// An opaque packet placed on a channel.
///
/// `Fill` stands in for a payload of a given size without materializing
/// the bytes — handy for traffic generators where only the
/// serialization time matters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum Packet {
    /// Raw bytes.
    Data(Vec<u8>),
    /// Human-readable text, convenient in tests and examples.
    Text(String),
    /// A synthetic payload of `n` bytes.
    Fill(u32),
}

impl Packet {
    /// On-wire size in bytes.
    pub fn len(&self) -> usize {
        match self {
            Packet::Data(d) => d.len(),
            Packet::Text(s) => s.len(),
            Packet::Fill(n) => *n as usize,
        }
    }

    /// `true` for zero-length packets.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Display for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Packet::Data(d) => write!(f, "Data({} bytes)", d.len()),
            Packet::Text(s) => match s.char_indices().nth(32) {
                Some((cut, _)) => write!(f, "Text(\"{}…\")", &s[..cut]),
                None => write!(f, "Text({:?})", s),
            },
            Packet::Fill(n) => write!(f, "Fill({} bytes)", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_len() {
        assert_eq!(Packet::Data(vec![0; 10]).len(), 10);
        assert_eq!(Packet::Text("hello".into()).len(), 5);
        assert_eq!(Packet::Fill(1024).len(), 1024);
        assert!(Packet::Fill(0).is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(Packet::Fill(1024).to_string(), "Fill(1024 bytes)");
        assert_eq!(Packet::Text("hi".into()).to_string(), "Text(\"hi\")");
    }
}
