//! CRC32 checksums of snapshot images
//!
//! Checksums are written `crc32:XXXXXXXX` (lowercase hex, zero-padded).

use crc32fast::Hasher;

/// CRC32 (IEEE) of the given bytes
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

pub fn format_checksum(checksum: u32) -> String {
    format!("crc32:{:08x}", checksum)
}

/// Parses `crc32:XXXXXXXX`, `None` when malformed
pub fn parse_checksum(formatted: &str) -> Option<u32> {
    let hex = formatted.strip_prefix("crc32:")?;
    if hex.len() != 8 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_deterministic() {
        let data = b"Orders Products orderToProduct";
        assert_eq!(compute_checksum(data), compute_checksum(data));
        assert_ne!(compute_checksum(data), compute_checksum(b"Orders"));
    }

    #[test]
    fn test_format_and_parse() {
        assert_eq!(format_checksum(0xDEADBEEF), "crc32:deadbeef");
        assert_eq!(format_checksum(0x1), "crc32:00000001");
        assert_eq!(parse_checksum("crc32:deadbeef"), Some(0xDEADBEEF));
        assert_eq!(parse_checksum("md5:deadbeef"), None);
        assert_eq!(parse_checksum("crc32:beef"), None);
    }
}
