use chrono::{DateTime, Utc};
use std::io::{Read, Seek, SeekFrom};

/// Seconds between 1904-01-01 (the QuickTime epoch) and 1970-01-01.
pub const MAC_EPOCH_OFFSET: i64 = 2_082_844_800;

pub fn read_slice<R: Read + Seek>(r: &mut R, offset: u64, len: u64) -> std::io::Result<Vec<u8>> {
    r.seek(SeekFrom::Start(offset))?;
    let mut v = vec![0u8; len as usize];
    r.read_exact(&mut v)?;
    Ok(v)
}

pub fn hex_dump(bytes: &[u8], start_offset: u64) -> String {
    let mut out = String::new();
    for (i, chunk) in bytes.chunks(16).enumerate() {
        let offs = start_offset + (i as u64) * 16;
        let hexs: String = chunk.iter().map(|b| format!("{:02x} ", b)).collect();
        let ascii: String = chunk.iter().map(|b| {
            let c = *b;
            if (32..=126).contains(&c) { c as char } else { '.' }
        }).collect();
        out.push_str(&format!("{:08x}  {:<48}  |{}|\n", offs, hexs, ascii));
    }
    out
}

/// Signed 16.16 fixed point ("QuickTime float").
pub fn fixed_16_16(raw: u32) -> f64 {
    let whole = (raw as i32 >> 16) as f64;
    let frac = (raw & 0xFFFF) as f64 / 65536.0;
    whole + frac
}

/// Unsigned 16.16 fixed point, as used for audio sample rates.
pub fn ufixed_16_16(raw: u32) -> f64 {
    (raw >> 16) as f64 + (raw & 0xFFFF) as f64 / 65536.0
}

/// Convert seconds since 1904-01-01 UTC into a calendar time.
pub fn mac_epoch_to_datetime(secs: u64) -> Option<DateTime<Utc>> {
    let unix = i64::try_from(secs).ok()?.checked_sub(MAC_EPOCH_OFFSET)?;
    DateTime::from_timestamp(unix, 0)
}

/// Render a frame count as `HH:MM:SS:FF` at the given (rounded) frame rate.
pub fn frames_to_timecode(framerate: f64, frames: u64) -> String {
    // u128 so `3600 * fps` holds for any rate a u64 can carry
    let fps = u128::from(framerate.round() as u64);
    if fps == 0 {
        return "00:00:00:00".to_string();
    }
    let frames = u128::from(frames);
    let (hh, rest) = (frames / (3600 * fps), frames % (3600 * fps));
    let (mm, rest) = (rest / (60 * fps), rest % (60 * fps));
    format!("{:02}:{:02}:{:02}:{:02}", hh, mm, rest / fps, rest % fps)
}

pub(crate) mod hex_bytes {
    use serde::Serializer;

    pub fn serialize<S: Serializer, T: AsRef<[u8]>>(bytes: T, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn fixed_point_splits_whole_and_fraction() {
        assert_eq!(fixed_16_16(0x0048_0000), 72.0);
        assert!((fixed_16_16((3 << 16) | 0x8000) - 3.5).abs() < 1e-9);
        assert!((fixed_16_16((1 << 16) | 1) - (1.0 + 1.0 / 65536.0)).abs() < 1e-12);
    }

    #[test]
    fn signed_fixed_point_keeps_sign_of_whole_part() {
        assert_eq!(fixed_16_16(0xFFFF_0000), -1.0);
        assert_eq!(ufixed_16_16(0xFFFF_0000), 65535.0);
        assert_eq!(ufixed_16_16(0xBB80_0000), 48000.0);
    }

    #[test]
    fn mac_epoch_zero_is_1904() {
        let t = mac_epoch_to_datetime(0).unwrap();
        assert_eq!((t.year(), t.month(), t.day()), (1904, 1, 1));

        let unix_zero = mac_epoch_to_datetime(MAC_EPOCH_OFFSET as u64).unwrap();
        assert_eq!(unix_zero.timestamp(), 0);
        assert_eq!(unix_zero.hour(), 0);
    }

    #[test]
    fn timecode_from_frames() {
        assert_eq!(frames_to_timecode(25.0, 0), "00:00:00:00");
        assert_eq!(frames_to_timecode(25.0, 90_000 + 1500 + 50 + 3), "01:01:02:03");
        assert_eq!(frames_to_timecode(29.97, 30), "00:00:01:00");
        assert_eq!(frames_to_timecode(0.0, 100), "00:00:00:00");
    }

    #[test]
    fn timecode_at_extreme_rates() {
        assert_eq!(frames_to_timecode(4.0e18, 5), "00:00:00:05");
        assert_eq!(frames_to_timecode(f64::MAX, 7), "00:00:00:07");
        assert_eq!(frames_to_timecode(1.0, u64::MAX), format!("{}:00:15:00", u64::MAX / 3600));
        assert_eq!(frames_to_timecode(f64::NAN, 10), "00:00:00:00");
        assert_eq!(frames_to_timecode(-25.0, 10), "00:00:00:00");
    }

    #[test]
    fn hex_dump_prints_ascii_column() {
        let out = hex_dump(b"moov", 0x10);
        assert!(out.starts_with("00000010  6d 6f 6f 76"));
        assert!(out.trim_end().ends_with("|moov|"));
    }
}
