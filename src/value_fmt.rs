//! Property-value presentation heuristics (`spec.md` §4.G.2).
//!
//! None of these are driven by the property's declared type; they're
//! guessed from substrings in the property's *name*, exactly as the format
//! this crate reads does it. A property named `PageWidth` and one named
//! `UnrelatedWidthCounter` get the same half-inch-to-pixel treatment.

use uuid::Uuid;

const FILETIME_TICKS_PER_SECOND: i64 = 10_000_000;
const FILETIME_EPOCH_OFFSET_SECONDS: i64 = 11_644_473_600;
const TIME32_EPOCH_OFFSET_SECONDS: i64 = 315_532_800; // 1980-01-01 - 1970-01-01

/// Windows FILETIME (100ns ticks since 1601-01-01 UTC) rendered as an RFC
/// 3339 timestamp.
pub fn filetime_to_string(filetime: u64) -> String {
    let total_seconds = filetime as i64 / FILETIME_TICKS_PER_SECOND;
    let nanos = (filetime as i64 % FILETIME_TICKS_PER_SECOND) * 100;
    let unix_seconds = total_seconds - FILETIME_EPOCH_OFFSET_SECONDS;
    unix_timestamp_to_rfc3339(unix_seconds, nanos as u32)
        .unwrap_or_else(|| format!("<invalid filetime {filetime}>"))
}

/// Time32 (seconds since 1980-01-01 UTC) rendered as an RFC 3339 timestamp.
pub fn time32_to_string(time32: u32) -> String {
    let unix_seconds = time32 as i64 + TIME32_EPOCH_OFFSET_SECONDS;
    unix_timestamp_to_rfc3339(unix_seconds, 0)
        .unwrap_or_else(|| format!("<invalid time32 {time32}>"))
}

fn unix_timestamp_to_rfc3339(unix_seconds: i64, nanos: u32) -> Option<String> {
    use chrono::{NaiveDateTime, TimeZone, Utc};
    let naive = NaiveDateTime::from_timestamp_opt(unix_seconds, nanos)?;
    Some(Utc.from_utc_datetime(&naive).to_rfc3339())
}

/// Half-inch float measurement to device pixels at the given DPI (96 for
/// every seed scenario this crate has seen).
pub fn half_inch_to_pixels(value: f32, dpi: u32) -> i64 {
    let pixels_per_half_inch = dpi as f64 / 2.0;
    (value as f64 * pixels_per_half_inch) as i64
}

/// Windows LCID to locale tag. Only the handful of locales observed in
/// practice are tabulated; everything else renders as `Unknown LCID`.
pub fn lcid_to_name(lcid: u32) -> &'static str {
    match lcid {
        0x0409 => "en_US",
        0x0809 => "en_GB",
        0x040C => "fr_FR",
        0x0407 => "de_DE",
        0x0410 => "it_IT",
        0x0411 => "ja_JP",
        0x0412 => "ko_KR",
        0x0804 => "zh_CN",
        0x0404 => "zh_TW",
        0x040A => "es_ES",
        0x0416 => "pt_BR",
        0x0419 => "ru_RU",
        _ => "Unknown LCID",
    }
}

pub fn lcid_label(lcid: u32) -> String {
    format!("{}({})", lcid_to_name(lcid), lcid)
}

/// Decode a type-0x7 (`PrtFourBytesOfLengthFollowedByData`) payload for a
/// property whose name contains "guid": bytes are a little-endian GUID.
pub fn bytes_as_guid(bytes: &[u8]) -> Option<Uuid> {
    let arr: [u8; 16] = bytes.try_into().ok()?;
    Some(Uuid::from_bytes_le(arr))
}

/// Decode a type-0x7 payload for any other property: UTF-16LE if it
/// decodes cleanly, else a hex dump.
pub fn bytes_as_text_or_hex(bytes: &[u8]) -> String {
    if bytes.len() % 2 == 0 {
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        if let Ok(s) = String::from_utf16(&units) {
            return s;
        }
    }
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filetime_decodes_known_value() {
        // 2010-01-01T00:00:00Z in FILETIME ticks.
        let ticks: u64 = 129_343_104_000_000_000;
        let s = filetime_to_string(ticks);
        assert!(s.starts_with("2010-01-01T00:00:00"));
    }

    #[test]
    fn time32_epoch_is_1980() {
        assert!(time32_to_string(0).starts_with("1980-01-01T00:00:00"));
    }

    #[test]
    fn half_inch_to_pixels_at_96_dpi() {
        assert_eq!(half_inch_to_pixels(1.0, 96), 48);
        assert_eq!(half_inch_to_pixels(2.5, 96), 120);
    }

    #[test]
    fn lcid_label_formats_known_and_unknown() {
        assert_eq!(lcid_label(0x0409), "en_US(1033)");
        assert_eq!(lcid_label(0xFFFF), "Unknown LCID(65535)");
    }

    #[test]
    fn bytes_as_text_or_hex_falls_back_to_hex_for_odd_length() {
        assert_eq!(bytes_as_text_or_hex(&[0xAB]), "ab");
    }
}
