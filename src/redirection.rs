use std::fmt;

/// Registry view selector on multi-architecture installations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Redirection {
    #[default]
    None,
    Wow32,
    Wow64,
}

impl Redirection {
    /// Unknown tags map to `None`, matching an absent attribute.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim() {
            "32" => Redirection::Wow32,
            "64" => Redirection::Wow64,
            _ => Redirection::None,
        }
    }

    pub fn as_tag(&self) -> Option<&'static str> {
        match self {
            Redirection::None => None,
            Redirection::Wow32 => Some("32"),
            Redirection::Wow64 => Some("64"),
        }
    }
}

impl fmt::Display for Redirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag().unwrap_or("0"))
    }
}
