use std::fmt;
use std::str::FromStr;

/// Hardware (EUI-48) address of a network interface, most-significant
/// octet first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MacAddr([u8; 6]);

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ParseMacError {
    #[error("expected 12 hex digits, found {found}")]
    Length { found: usize },
    #[error("{0:?} is not a hex digit")]
    NonHexDigit(char),
    #[error("{0} cannot belong to a real interface")]
    Suspicious(MacAddr),
}

impl MacAddr {
    pub const BROADCAST: MacAddr = MacAddr([0xFF; 6]);

    pub fn new(octets: [u8; 6]) -> MacAddr {
        MacAddr(octets)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 6]
    }

    pub fn is_broadcast(&self) -> bool {
        self.0 == [0xFF; 6]
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5],
        )
    }
}

impl FromStr for MacAddr {
    type Err = ParseMacError;

    /// Accepts colon-separated, hyphen-separated, and bare hex forms:
    /// `AA:BB:CC:DD:EE:01`, `aa-bb-cc-dd-ee-01`, `aabbccddee01`. The
    /// all-zero and all-FF addresses parse but are rejected, since a wake
    /// aimed at either is a misconfigured registry entry rather than a
    /// machine.
    fn from_str(raw: &str) -> Result<MacAddr, ParseMacError> {
        let digits: Vec<char> = raw.chars().filter(|c| !matches!(c, ':' | '-')).collect();
        if digits.len() != 12 {
            return Err(ParseMacError::Length {
                found: digits.len(),
            });
        }
        let mut octets = [0u8; 6];
        for (i, c) in digits.iter().enumerate() {
            let nibble = c.to_digit(16).ok_or(ParseMacError::NonHexDigit(*c))? as u8;
            octets[i / 2] = octets[i / 2] << 4 | nibble;
        }
        let addr = MacAddr(octets);
        if addr.is_zero() || addr.is_broadcast() {
            return Err(ParseMacError::Suspicious(addr));
        }
        Ok(addr)
    }
}
