use crate::boxes::FourCC;
use crate::cursor::Segment;
use crate::known_boxes::Decoder;
use crate::parser::{ParseError, Result, WalkContext};
use crate::util::hex_bytes;
use chrono::{DateTime, Utc};
use log::{debug, trace};
use serde::Serialize;

/// Brand a file must carry (major or compatible) to be parsed as QuickTime.
pub const QUICKTIME_BRAND: FourCC = FourCC(*b"qt  ");

pub const HANDLER_VIDEO: FourCC = FourCC(*b"vide");
pub const HANDLER_SOUND: FourCC = FourCC(*b"soun");
pub const HANDLER_TIMECODE: FourCC = FourCC(*b"tmcd");

/// A decoded leaf atom.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodedAtom {
    FileType(FtypData),
    MovieHeader(MvhdData),
    TrackHeader(TkhdData),
    MediaHeader(MdhdData),
    HandlerReference(HdlrData),
    Aperture(ApertureData),
    TimeToSample(SttsData),
    SampleDescription(StsdData),
}

/// File Type atom (`ftyp`)
#[derive(Debug, Clone, Serialize)]
pub struct FtypData {
    pub major_brand: FourCC,
    pub minor_version: u32,
    pub compatible_brands: Vec<FourCC>,
}

/// Movie Header atom (`mvhd`)
#[derive(Debug, Clone, Serialize)]
pub struct MvhdData {
    pub version: u8,
    pub flags: u32,
    pub creation_time: Option<DateTime<Utc>>,
    pub modification_time: Option<DateTime<Utc>>,
    pub timescale: u32,
    pub duration: u64,
    pub preferred_rate: u32,
    pub preferred_volume: u16,
    #[serde(serialize_with = "hex_bytes::serialize")]
    pub matrix: [u8; 36],
    pub preview_time: u32,
    pub preview_duration: u32,
    pub poster_time: u32,
    pub selection_time: u32,
    pub selection_duration: u32,
    pub current_time: u32,
    pub next_track_id: u32,
}

/// Track Header atom (`tkhd`)
#[derive(Debug, Clone, Serialize)]
pub struct TkhdData {
    pub version: u8,
    pub flags: u32,
    pub creation_time: Option<DateTime<Utc>>,
    pub modification_time: Option<DateTime<Utc>>,
    pub track_id: u32,
    pub duration: u64,
    pub layer: u16,
    pub alternate_group: u16,
    pub volume: u16,
    #[serde(serialize_with = "hex_bytes::serialize")]
    pub matrix: [u8; 36],
    pub width: f64,
    pub height: f64,
}

/// Media Header atom (`mdhd`)
#[derive(Debug, Clone, Serialize)]
pub struct MdhdData {
    pub version: u8,
    pub flags: u32,
    pub creation_time: Option<DateTime<Utc>>,
    pub modification_time: Option<DateTime<Utc>>,
    pub timescale: u32,
    pub duration: u64,
    pub language: String,
    pub quality: u16,
}

/// Handler Reference atom (`hdlr`)
#[derive(Debug, Clone, Serialize)]
pub struct HdlrData {
    pub version: u8,
    pub flags: u32,
    pub component_type: FourCC,
    pub subtype: FourCC,
    pub manufacturer: u32,
    pub component_flags: u32,
    pub component_flags_mask: u32,
    pub name: String,
}

/// Clean, production or encoded aperture dimensions (`clef`, `prof`, `enof`)
#[derive(Debug, Clone, Serialize)]
pub struct ApertureData {
    pub version: u8,
    pub flags: u32,
    pub width: f64,
    pub height: f64,
}

/// Time-to-Sample atom (`stts`)
#[derive(Debug, Clone, Serialize)]
pub struct SttsData {
    pub version: u8,
    pub flags: u32,
    pub entries: Vec<SttsEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SttsEntry {
    pub sample_count: u32,
    pub sample_duration: u32,
}

impl SttsData {
    /// Sum of `count * duration` over all runs, and the total sample count.
    ///
    /// At most `u32::MAX` runs of `u32` counts fit, so the sample count cannot
    /// overflow `u64`; the duration sum needs `u128`.
    pub fn totals(&self) -> (u128, u64) {
        self.entries.iter().fold((0, 0), |(duration, samples), e| {
            (
                duration + u128::from(e.sample_count) * u128::from(e.sample_duration),
                samples + u64::from(e.sample_count),
            )
        })
    }
}

/// Sample Description atom (`stsd`)
#[derive(Debug, Clone, Serialize)]
pub struct StsdData {
    pub version: u8,
    pub flags: u32,
    pub entries: Vec<SampleEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SampleEntry {
    pub size: u32,
    pub format: FourCC,
    pub data_reference_index: u16,
    pub version: u16,
    pub revision: u16,
    pub media: SampleMedia,
}

/// Media-specific part of a sample description entry, chosen by the track's handler subtype.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "media", rename_all = "snake_case")]
pub enum SampleMedia {
    Video(VisualSampleEntry),
    Audio(SoundSampleEntry),
    Timecode(TimecodeSampleEntry),
    Other,
}

#[derive(Debug, Clone, Serialize)]
pub struct VisualSampleEntry {
    pub vendor: FourCC,
    pub temporal_quality: i32,
    pub spatial_quality: i32,
    pub width: i16,
    pub height: i16,
    pub horizontal_resolution: f64,
    pub vertical_resolution: f64,
    pub data_size: i32,
    pub frame_count: i16,
    pub compressor: String,
    pub depth: u16,
    pub color_table_id: i16,
    pub field: Option<FieldInfo>,
    pub color: Option<ColorInfo>,
    pub pixel_aspect: Option<(u32, u32)>,
    pub gamma: Option<f64>,
    pub clean_aperture: Option<[u32; 8]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldInfo {
    pub field_type: u8,
    pub field_order: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColorInfo {
    pub parameter_type: FourCC,
    pub primaries: u16,
    pub transfer_function: u16,
    pub matrix: u16,
}

#[derive(Debug, Clone, Serialize)]
pub struct SoundSampleEntry {
    pub vendor: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub compression_id: i16,
    pub packet_size: u16,
    pub sample_rate: f64,
    pub packet_info: Option<SoundPacketInfo>,
    pub channel_assignment: String,
}

/// Version 1 sound description fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SoundPacketInfo {
    pub samples_per_packet: i32,
    pub bytes_per_packet: i32,
    pub bytes_per_frame: i32,
    pub bytes_per_sample: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimecodeSampleEntry {
    pub drop_frame: u8,
}

impl Decoder {
    /// Decode one leaf atom whose payload is exactly `seg`.
    pub fn decode(self, seg: &mut Segment<'_>, ctx: &mut WalkContext) -> Result<DecodedAtom> {
        match self {
            Decoder::FileType => decode_ftyp(seg).map(DecodedAtom::FileType),
            Decoder::MovieHeader => decode_mvhd(seg).map(DecodedAtom::MovieHeader),
            Decoder::TrackHeader => decode_tkhd(seg).map(DecodedAtom::TrackHeader),
            Decoder::MediaHeader => decode_mdhd(seg).map(DecodedAtom::MediaHeader),
            Decoder::HandlerReference => {
                let hdlr = decode_hdlr(seg)?;
                ctx.handler = Some(hdlr.subtype);
                Ok(DecodedAtom::HandlerReference(hdlr))
            }
            Decoder::CleanAperture | Decoder::ProductionAperture | Decoder::EncodedAperture => {
                decode_aperture(seg).map(DecodedAtom::Aperture)
            }
            Decoder::TimeToSample => decode_stts(seg).map(DecodedAtom::TimeToSample),
            Decoder::SampleDescription => {
                decode_stsd(seg, ctx.handler).map(DecodedAtom::SampleDescription)
            }
        }
    }
}

// ---------- Helpers ----------

fn lang_from_u16(code: u16) -> String {
    if code == 0 {
        return "und".to_string();
    }
    let c1 = ((code >> 10) & 0x1F) as u8 + 0x60;
    let c2 = ((code >> 5) & 0x1F) as u8 + 0x60;
    let c3 = (code & 0x1F) as u8 + 0x60;
    format!("{}{}{}", c1 as char, c2 as char, c3 as char,)
}

/// Component names are Pascal strings in QuickTime and C strings in ISO files.
fn component_name(bytes: &[u8]) -> String {
    let mut bytes = bytes;
    if let Some((&len, rest)) = bytes.split_first()
        && len as usize == rest.len()
    {
        bytes = rest;
    }
    while bytes.last() == Some(&0) {
        bytes = &bytes[..bytes.len() - 1];
    }
    String::from_utf8_lossy(bytes).to_string()
}

/// 32-byte Pascal string: a length byte followed by up to 31 characters.
fn pascal_string_32(buf: &[u8; 32]) -> String {
    let len = (buf[0] as usize).min(31);
    String::from_utf8_lossy(&buf[1..1 + len]).to_string()
}

// ---------- Decoders ----------

// ftyp: the file-format gate
fn decode_ftyp(seg: &mut Segment<'_>) -> Result<FtypData> {
    let major_brand = seg.read_fourcc()?;
    let minor_version = seg.read_u32()?;

    let mut compatible_brands = Vec::new();
    while seg.remaining() >= 4 {
        compatible_brands.push(seg.read_fourcc()?);
    }
    if seg.remaining() > 0 {
        debug!("ftyp: ignoring {} trailing bytes", seg.remaining());
    }

    if major_brand != QUICKTIME_BRAND && !compatible_brands.contains(&QUICKTIME_BRAND) {
        return Err(ParseError::FormatMismatch { major_brand });
    }

    Ok(FtypData { major_brand, minor_version, compatible_brands })
}

// mvhd: movie timescale + duration
fn decode_mvhd(seg: &mut Segment<'_>) -> Result<MvhdData> {
    let (version, flags) = seg.read_version_flags()?;

    let (creation_time, modification_time, timescale, duration) = if version == 1 {
        let creation = seg.read_mac_timestamp64()?;
        let modification = seg.read_mac_timestamp64()?;
        let ts = seg.read_u32()?;
        (creation, modification, ts, seg.read_u64()?)
    } else {
        let creation = seg.read_mac_timestamp()?;
        let modification = seg.read_mac_timestamp()?;
        let ts = seg.read_u32()?;
        (creation, modification, ts, seg.read_u32()? as u64)
    };

    let preferred_rate = seg.read_u32()?;
    let preferred_volume = seg.read_u16()?;
    seg.skip(10)?;
    let matrix = seg.read_array::<36>()?;

    Ok(MvhdData {
        version,
        flags,
        creation_time,
        modification_time,
        timescale,
        duration,
        preferred_rate,
        preferred_volume,
        matrix,
        preview_time: seg.read_u32()?,
        preview_duration: seg.read_u32()?,
        poster_time: seg.read_u32()?,
        selection_time: seg.read_u32()?,
        selection_duration: seg.read_u32()?,
        current_time: seg.read_u32()?,
        next_track_id: seg.read_u32()?,
    })
}

// tkhd: track id, duration, presentation size
fn decode_tkhd(seg: &mut Segment<'_>) -> Result<TkhdData> {
    let (version, flags) = seg.read_version_flags()?;

    let (creation_time, modification_time, track_id, duration) = if version == 1 {
        let creation = seg.read_mac_timestamp64()?;
        let modification = seg.read_mac_timestamp64()?;
        let id = seg.read_u32()?;
        seg.skip(4)?;
        (creation, modification, id, seg.read_u64()?)
    } else {
        let creation = seg.read_mac_timestamp()?;
        let modification = seg.read_mac_timestamp()?;
        let id = seg.read_u32()?;
        seg.skip(4)?;
        (creation, modification, id, seg.read_u32()? as u64)
    };

    seg.skip(8)?;
    let layer = seg.read_u16()?;
    let alternate_group = seg.read_u16()?;
    let volume = seg.read_u16()?;
    seg.skip(2)?;
    let matrix = seg.read_array::<36>()?;

    Ok(TkhdData {
        version,
        flags,
        creation_time,
        modification_time,
        track_id,
        duration,
        layer,
        alternate_group,
        volume,
        matrix,
        width: seg.read_fixed_16_16()?,
        height: seg.read_fixed_16_16()?,
    })
}

// mdhd: media timescale, duration, language
fn decode_mdhd(seg: &mut Segment<'_>) -> Result<MdhdData> {
    let (version, flags) = seg.read_version_flags()?;

    let (creation_time, modification_time, timescale, duration) = if version == 1 {
        let creation = seg.read_mac_timestamp64()?;
        let modification = seg.read_mac_timestamp64()?;
        let ts = seg.read_u32()?;
        (creation, modification, ts, seg.read_u64()?)
    } else {
        let creation = seg.read_mac_timestamp()?;
        let modification = seg.read_mac_timestamp()?;
        let ts = seg.read_u32()?;
        (creation, modification, ts, seg.read_u32()? as u64)
    };

    let language = lang_from_u16(seg.read_u16()?);
    let quality = seg.read_u16()?;

    Ok(MdhdData {
        version,
        flags,
        creation_time,
        modification_time,
        timescale,
        duration,
        language,
        quality,
    })
}

// hdlr: component type/subtype + name
fn decode_hdlr(seg: &mut Segment<'_>) -> Result<HdlrData> {
    let (version, flags) = seg.read_version_flags()?;
    let component_type = seg.read_fourcc()?;
    let subtype = seg.read_fourcc()?;
    let manufacturer = seg.read_u32()?;
    let component_flags = seg.read_u32()?;
    let component_flags_mask = seg.read_u32()?;
    let name = component_name(seg.read_rest()?);

    Ok(HdlrData {
        version,
        flags,
        component_type,
        subtype,
        manufacturer,
        component_flags,
        component_flags_mask,
        name,
    })
}

// clef / prof / enof
fn decode_aperture(seg: &mut Segment<'_>) -> Result<ApertureData> {
    let (version, flags) = seg.read_version_flags()?;
    Ok(ApertureData {
        version,
        flags,
        width: seg.read_fixed_16_16()?,
        height: seg.read_fixed_16_16()?,
    })
}

// stts: (count, duration) runs
fn decode_stts(seg: &mut Segment<'_>) -> Result<SttsData> {
    let (version, flags) = seg.read_version_flags()?;
    let entry_count = seg.read_u32()?;

    let mut entries = Vec::new();
    for _ in 0..entry_count {
        let sample_count = seg.read_u32()?;
        let sample_duration = seg.read_u32()?;
        entries.push(SttsEntry { sample_count, sample_duration });
    }

    Ok(SttsData { version, flags, entries })
}

// stsd: per-entry layout depends on the handler subtype of the enclosing track
fn decode_stsd(seg: &mut Segment<'_>, handler: Option<FourCC>) -> Result<StsdData> {
    let (version, flags) = seg.read_version_flags()?;
    let entry_count = seg.read_u32()?;

    if handler.is_none() {
        debug!("stsd: no handler reference seen for this track, decoding common fields only");
    }

    let mut entries = Vec::new();
    for _ in 0..entry_count {
        let size = seg.read_u32()?;
        let format = seg.read_fourcc()?;
        seg.skip(6)?;
        let data_reference_index = seg.read_u16()?;
        let entry_version = seg.read_u16()?;
        let revision = seg.read_u16()?;

        let media = match handler {
            Some(HANDLER_VIDEO) => SampleMedia::Video(decode_visual_entry(seg)?),
            Some(HANDLER_SOUND) => SampleMedia::Audio(decode_sound_entry(seg)?),
            Some(HANDLER_TIMECODE) => SampleMedia::Timecode(decode_timecode_entry(seg)?),
            _ => SampleMedia::Other,
        };

        entries.push(SampleEntry {
            size,
            format,
            data_reference_index,
            version: entry_version,
            revision,
            media,
        });
    }

    Ok(StsdData { version, flags, entries })
}

fn decode_visual_entry(seg: &mut Segment<'_>) -> Result<VisualSampleEntry> {
    let mut entry = VisualSampleEntry {
        vendor: seg.read_fourcc()?,
        temporal_quality: seg.read_i32()?,
        spatial_quality: seg.read_i32()?,
        width: seg.read_i16()?,
        height: seg.read_i16()?,
        horizontal_resolution: seg.read_fixed_16_16()?,
        vertical_resolution: seg.read_fixed_16_16()?,
        data_size: seg.read_i32()?,
        frame_count: seg.read_i16()?,
        compressor: pascal_string_32(&seg.read_array::<32>()?),
        depth: seg.read_u16()?,
        color_table_id: seg.read_i16()?,
        field: None,
        color: None,
        pixel_aspect: None,
        gamma: None,
        clean_aperture: None,
    };

    // Extensions are probed with a 16-bit length; anything outside 1..=60 ends the scan.
    while seg.remaining() > 0 {
        let probe = seg.read_u16()?;
        if !(1..=60).contains(&probe) {
            trace!("stsd: extension probe {} out of range, stopping", probe);
            break;
        }

        let tag = seg.read_fourcc()?;
        match &tag.0 {
            b"fiel" => {
                entry.field = Some(FieldInfo {
                    field_type: seg.read_u8()?,
                    field_order: seg.read_u8()?,
                });
            }
            b"colr" => {
                entry.color = Some(ColorInfo {
                    parameter_type: seg.read_fourcc()?,
                    primaries: seg.read_u16()?,
                    transfer_function: seg.read_u16()?,
                    matrix: seg.read_u16()?,
                });
            }
            b"pasp" => entry.pixel_aspect = Some((seg.read_u32()?, seg.read_u32()?)),
            b"gama" => entry.gamma = Some(seg.read_fixed_16_16()?),
            b"clap" => {
                let mut clap = [0u32; 8];
                for v in clap.iter_mut() {
                    *v = seg.read_u32()?;
                }
                entry.clean_aperture = Some(clap);
            }
            _ => {
                trace!("stsd: unhandled extension {}, stopping", tag);
                break;
            }
        }
    }

    Ok(entry)
}

fn decode_sound_entry(seg: &mut Segment<'_>) -> Result<SoundSampleEntry> {
    let vendor = seg.read_u32()?;
    let channels = seg.read_u16()?;
    let bits_per_sample = seg.read_u16()?;
    let compression_id = seg.read_i16()?;
    let packet_size = seg.read_u16()?;
    let sample_rate = seg.read_ufixed_16_16()?;

    let mut packet_info = None;
    let mut assignment = None;
    if seg.remaining() > 0 {
        packet_info = Some(SoundPacketInfo {
            samples_per_packet: seg.read_i32()?,
            bytes_per_packet: seg.read_i32()?,
            bytes_per_frame: seg.read_i32()?,
            bytes_per_sample: seg.read_i32()?,
        });

        if seg.remaining() > 0 {
            // format-specific extension (wave/frma/enda), skipped whole; the length counts itself
            let ext_len = seg.read_u32()?;
            seg.skip(u64::from(ext_len).saturating_sub(4))?;

            if seg.remaining() > 0 {
                assignment = Some(decode_channel_layout(seg, channels)?);
            }
        }
    }

    Ok(SoundSampleEntry {
        vendor,
        channels,
        bits_per_sample,
        compression_id,
        packet_size,
        sample_rate,
        packet_info,
        channel_assignment: assignment.unwrap_or_else(|| default_assignment(channels)),
    })
}

fn default_assignment(channels: u16) -> String {
    match channels {
        2 => "Stereo".to_string(),
        1 => "Mono".to_string(),
        n => format!("Mono x{}", n),
    }
}

fn decode_channel_layout(seg: &mut Segment<'_>, channels: u16) -> Result<String> {
    let size = seg.read_u32()?;
    let _typ = seg.read_fourcc()?;
    let _ = seg.read_version_flags()?;

    if size == 24 {
        let _tag = seg.read_u16()?;
        let discrete = seg.read_u16()?;
        let _kind = seg.read_u16()?;
        let _id = seg.read_u16()?;
        return Ok(format!("Discrete x{}", discrete));
    }
    if size < 24 {
        return Ok("???".to_string());
    }

    let _layout_tag = seg.read_u32()?;
    let _bitmap = seg.read_u32()?;
    let descriptions = seg.read_u32()?;
    if descriptions == 0 {
        let label = match channels {
            2 => "Stereo",
            1 => "Mono",
            _ => "Unknown",
        };
        return Ok(label.to_string());
    }

    let mut out = String::new();
    for _ in 0..descriptions {
        let kind = seg.read_u16()?;
        let id = seg.read_u16()?;
        let label = if kind == 1 {
            format!("Discrete {}", id)
        } else {
            speaker_label(id)
        };
        seg.skip(16)?;
        out.push_str(&label);
        out.push_str("  ");
    }
    Ok(out.trim_end().to_string())
}

/// Speaker position for a channel label id.
pub fn speaker_label(id: u16) -> String {
    let label = match id {
        0 => "Unknown",
        1 => "Left",
        2 => "Right",
        3 => "Center",
        4 => "LFE",
        5 => "Ls",
        6 => "Rs",
        7 => "Left Center",
        8 => "Right Center",
        9 => "Center Surround",
        38 => "Left Total",
        39 => "Right Total",
        42 => "Mono",
        _ => return format!("Unknown({})", id),
    };
    label.to_string()
}

fn decode_timecode_entry(seg: &mut Segment<'_>) -> Result<TimecodeSampleEntry> {
    seg.skip(3)?;
    let drop_frame = seg.read_u8()?;
    seg.skip(2)?;
    let _time_scale = seg.read_u16()?;
    seg.skip(2)?;
    let _frame_duration = seg.read_u16()?;
    let _frames_per_second = seg.read_u8()?;
    let _reserved = seg.read_u8()?;
    Ok(TimecodeSampleEntry { drop_frame })
}
