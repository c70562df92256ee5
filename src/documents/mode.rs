//! File open modes accepted by document clients.

use std::str::FromStr;

use super::DocumentError;

/// Mode string passed to `open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
    WriteAppend,
    WriteTruncate,
    ReadWrite,
    ReadWriteTruncate,
}

impl OpenMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "r",
            Self::Write => "w",
            Self::WriteAppend => "wa",
            Self::WriteTruncate => "wt",
            Self::ReadWrite => "rw",
            Self::ReadWriteTruncate => "rwt",
        }
    }

    #[must_use]
    pub fn is_read_only(self) -> bool {
        self == Self::Read
    }
}

impl FromStr for OpenMode {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "r" => Ok(Self::Read),
            "w" => Ok(Self::Write),
            "wa" => Ok(Self::WriteAppend),
            "wt" => Ok(Self::WriteTruncate),
            "rw" => Ok(Self::ReadWrite),
            "rwt" => Ok(Self::ReadWriteTruncate),
            _ => Err(DocumentError::UnsupportedMode(s.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_only_read_is_read_only() {
        for mode in ["r", "w", "wa", "wt", "rw", "rwt"] {
            let parsed = mode.parse::<OpenMode>().unwrap();
            assert_eq!(parsed.as_str(), mode);
            assert_eq!(parsed.is_read_only(), mode == "r");
        }
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(matches!(
            "x".parse::<OpenMode>(),
            Err(DocumentError::UnsupportedMode(_))
        ));
    }
}
