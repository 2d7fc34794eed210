//! Input source codes
//!
//! The device reports and accepts its input source as a single byte. It is
//! shown to users as two lowercase hex digits (`"21"`), and can also be
//! parsed from the names in the documented source table.

use core::fmt;
use core::str::FromStr;

use crate::frame::FrameError;

/// A one-byte input source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputCode(u8);

// Wire format values (incomplete; devices accept other codes too)
const SOURCES: &[(u8, &str, &[&str])] = &[
    (0x04, "S-Video", &[]),
    (0x08, "Component", &[]),
    (0x0C, "AV", &[]),
    (0x14, "PC", &[]),
    (0x18, "DVI", &[]),
    (0x1E, "BNC", &[]),
    (0x1F, "DVI_VIDEO", &[]),
    (0x20, "MagicNet", &[]),
    (0x21, "HDMI", &["HDMI1", "HM1"]),
    (0x22, "HDMI_PC", &["HDMI1_PC"]),
    (0x23, "HDMI2", &["HM2"]),
    (0x24, "HDMI2_PC", &[]),
    (0x25, "DisplayPort", &["DP"]),
    (0x30, "RF(TV)", &["TV"]),
    (0x40, "DTV", &[]),
];

impl InputCode {
    pub const fn new(code: u8) -> Self {
        Self(code)
    }

    /// Wire format byte
    pub const fn code(self) -> u8 {
        self.0
    }

    /// Name from the source table, if known
    pub fn name(self) -> Option<&'static str> {
        SOURCES
            .iter()
            .find(|(code, _, _)| *code == self.0)
            .map(|(_, name, _)| *name)
    }

    /// Parse a two-digit hex code or a source name
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let text = text.trim();

        if text.len() == 2 && text.bytes().all(|b| b.is_ascii_hexdigit()) {
            return u8::from_str_radix(text, 16)
                .map(Self)
                .map_err(|_| FrameError::InvalidInputCode);
        }

        SOURCES
            .iter()
            .find(|(_, name, aliases)| {
                name.eq_ignore_ascii_case(text)
                    || aliases.iter().any(|alias| alias.eq_ignore_ascii_case(text))
            })
            .map(|(code, _, _)| Self(*code))
            .ok_or(FrameError::InvalidInputCode)
    }
}

impl From<u8> for InputCode {
    fn from(code: u8) -> Self {
        Self(code)
    }
}

impl FromStr for InputCode {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for InputCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write;
    use heapless::String;

    #[test]
    fn test_parse_hex() {
        assert_eq!(InputCode::parse("21"), Ok(InputCode::new(0x21)));
        assert_eq!(InputCode::parse("1f"), Ok(InputCode::new(0x1f)));
        assert_eq!(InputCode::parse("1F"), Ok(InputCode::new(0x1f)));
    }

    #[test]
    fn test_parse_names_and_aliases() {
        assert_eq!(InputCode::parse("HM1"), Ok(InputCode::new(0x21)));
        assert_eq!(InputCode::parse("hdmi"), Ok(InputCode::new(0x21)));
        assert_eq!(InputCode::parse("DP"), Ok(InputCode::new(0x25)));
        assert_eq!(InputCode::parse("magicnet"), Ok(InputCode::new(0x20)));
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert_eq!(InputCode::parse("HM9"), Err(FrameError::InvalidInputCode));
        assert_eq!(InputCode::parse("2g"), Err(FrameError::InvalidInputCode));
        assert_eq!(InputCode::parse(""), Err(FrameError::InvalidInputCode));
    }

    #[test]
    fn test_display_is_lower_hex() {
        let mut text: String<4> = String::new();
        write!(text, "{}", InputCode::new(0x0C)).unwrap();
        assert_eq!(text.as_str(), "0c");
    }

    #[test]
    fn test_name() {
        assert_eq!(InputCode::new(0x21).name(), Some("HDMI"));
        assert_eq!(InputCode::new(0x99).name(), None);
    }
}
