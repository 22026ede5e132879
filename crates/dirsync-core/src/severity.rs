//! Severity bitmask encoding.
//!
//! The target system stores notification severities as a 6-bit mask. The
//! configuration accepts either a pre-encoded decimal mask or a
//! comma-separated list of human-readable level names.

use crate::error::{SyncError, SyncResult};

/// The fixed severity levels, most significant bit first.
const LEVELS: [&str; 6] = [
    "Disaster",
    "High",
    "Average",
    "Warning",
    "Information",
    "Not Classified",
];

/// Encode a severity specification into the target system's decimal bitmask.
///
/// Fully numeric input is treated as already encoded and passed through
/// unchanged. Otherwise each named level sets its bit (Disaster is the most
/// significant); an unknown name fails with [`SyncError::InvalidSeverity`].
pub fn encode(input: &str) -> SyncResult<String> {
    let trimmed = input.trim();

    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Ok(trimmed.to_string());
    }

    let mut mask: u8 = 0;
    for name in trimmed.split(',') {
        let name = name.trim();
        let position = LEVELS
            .iter()
            .position(|level| *level == name)
            .ok_or_else(|| SyncError::InvalidSeverity {
                name: name.to_string(),
            })?;
        mask |= 1 << (LEVELS.len() - 1 - position);
    }

    let encoded = mask.to_string();
    tracing::debug!(input = %input, encoded = %encoded, "converted severity");
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_level() {
        // Disaster is the most significant of six bits: 0b100000 = 32.
        assert_eq!(encode("Disaster").unwrap(), "32");
        assert_eq!(encode("Not Classified").unwrap(), "1");
    }

    #[test]
    fn test_level_list() {
        // High | Average | Warning | Information = 0b011110 = 30.
        assert_eq!(encode("High,Average,Warning,Information").unwrap(), "30");
        assert_eq!(encode(" Disaster , Not Classified ").unwrap(), "33");
    }

    #[test]
    fn test_numeric_passthrough() {
        assert_eq!(encode("42").unwrap(), "42");
        assert_eq!(encode(" 63 ").unwrap(), "63");
    }

    #[test]
    fn test_unknown_level_fails() {
        let err = encode("Bogus").unwrap_err();
        assert!(matches!(err, SyncError::InvalidSeverity { name } if name == "Bogus"));

        // Digit-prefixed garbage is not a pre-encoded mask.
        assert!(encode("12abc").is_err());
    }
}
