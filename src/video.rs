//! Stream descriptors produced by a parse.

use crate::boxes::FourCC;
use crate::util::frames_to_timecode;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Default, Serialize)]
pub struct VideoFile {
    pub container: String,
    /// Set when a timecode track signals NTSC drop-frame counting.
    pub drop_frame: bool,
    streams: Vec<Stream>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Stream {
    Video(VideoStream),
    Audio(AudioStream),
}

impl Stream {
    pub fn kind(&self) -> &'static str {
        match self {
            Stream::Video(_) => "Video",
            Stream::Audio(_) => "Audio",
        }
    }
}

impl VideoFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_container(&mut self, format: impl Into<String>) {
        self.container = format.into();
    }

    /// Append a video stream, returning its 1-based index.
    pub fn add_video_stream(&mut self, stream: VideoStream) -> usize {
        self.streams.push(Stream::Video(stream));
        self.streams.len()
    }

    /// Append an audio stream, returning its 1-based index.
    pub fn add_audio_stream(&mut self, stream: AudioStream) -> usize {
        self.streams.push(Stream::Audio(stream));
        self.streams.len()
    }

    /// Stream by 1-based index.
    pub fn get_stream(&self, index: usize) -> Option<&Stream> {
        index.checked_sub(1).and_then(|i| self.streams.get(i))
    }

    pub fn streams(&self) -> &[Stream] {
        &self.streams
    }

    pub fn video_streams(&self) -> impl Iterator<Item = &VideoStream> {
        self.streams.iter().filter_map(|s| match s {
            Stream::Video(v) => Some(v),
            Stream::Audio(_) => None,
        })
    }

    pub fn video_streams_mut(&mut self) -> impl Iterator<Item = &mut VideoStream> {
        self.streams.iter_mut().filter_map(|s| match s {
            Stream::Video(v) => Some(v),
            Stream::Audio(_) => None,
        })
    }

    pub fn audio_streams(&self) -> impl Iterator<Item = &AudioStream> {
        self.streams.iter().filter_map(|s| match s {
            Stream::Audio(a) => Some(a),
            Stream::Video(_) => None,
        })
    }
}

impl fmt::Display for VideoFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, " Container format: {}", self.container)?;
        writeln!(f, " Streams:")?;
        for (i, s) in self.streams.iter().enumerate() {
            match s {
                Stream::Video(v) => writeln!(f, "   {} ({}) => {}", i + 1, s.kind(), v)?,
                Stream::Audio(a) => writeln!(f, "   {} ({}) => {}", i + 1, s.kind(), a)?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoStream {
    pub track_id: u32,
    pub width: u32,
    pub height: u32,
    pub framerate: f64,
    /// Seconds.
    pub duration: f64,
    pub codec: String,
    pub source_timecode: Option<u32>,
    pub drop_frame: bool,
    pub clean_aperture: Option<(u32, u32)>,
    pub production_aperture: Option<(u32, u32)>,
    pub encoded_aperture: Option<(u32, u32)>,
    pub pixel_aspect: Option<String>,
    pub clean_aperture_rect: Option<[u32; 8]>,
    pub color_space: Option<String>,
    pub gamma: Option<f64>,
    pub field_type: String,
    pub field_order: String,
}

impl Default for VideoStream {
    fn default() -> Self {
        VideoStream {
            track_id: 0,
            width: 0,
            height: 0,
            framerate: 0.0,
            duration: 0.0,
            codec: String::new(),
            source_timecode: None,
            drop_frame: false,
            clean_aperture: None,
            production_aperture: None,
            encoded_aperture: None,
            pixel_aspect: None,
            clean_aperture_rect: None,
            color_space: None,
            gamma: None,
            field_type: "Not set".to_string(),
            field_order: "Not set".to_string(),
        }
    }
}

impl VideoStream {
    /// Interpret the `fiel` extension.
    ///
    /// An interlaced field order of 1 leaves the current order untouched.
    pub fn set_fields(&mut self, field_type: u8, field_order: u8) {
        if field_type == 1 {
            self.field_type = "Progressive".to_string();
            self.field_order = "None".to_string();
            return;
        }

        self.field_type = "Interlaced".to_string();
        let order = match field_order {
            0 => "No Fields",
            1 => return,
            9 => "Top Field",
            6 | 14 => "Bottom Field",
            _ => "Unknown Field Order",
        };
        self.field_order = order.to_string();
    }

    pub fn set_pixel_aspect(&mut self, h_spacing: u32, v_spacing: u32) {
        self.pixel_aspect = Some(classify_pixel_aspect(h_spacing, v_spacing));
    }

    pub fn set_color(&mut self, parameter_type: FourCC, primaries: u16, transfer: u16, matrix: u16) {
        self.color_space =
            Some(classify_color_space(parameter_type, primaries, transfer, matrix).to_string());
    }

    /// Source timecode rendered at this stream's frame rate.
    pub fn source_timecode_string(&self) -> Option<String> {
        self.source_timecode
            .map(|frames| frames_to_timecode(self.framerate, u64::from(frames)))
    }
}

impl fmt::Display for VideoStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "codec: {}, length: {}, resolution: {}x{}, fps: {}",
            self.codec,
            format_duration(self.duration),
            self.width,
            self.height,
            self.framerate
        )
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AudioStream {
    pub track_id: u32,
    pub channels: u16,
    pub sample_rate: f64,
    pub bits_per_sample: u16,
    pub codec: String,
    /// Seconds.
    pub duration: f64,
    pub channel_assignment: String,
}

impl fmt::Display for AudioStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "codec: {}, length: {}, channels: {}, sample-rate: {}, bits per sample: {}, assignment: {}",
            self.codec,
            format_duration(self.duration),
            self.channels,
            self.sample_rate,
            self.bits_per_sample,
            self.channel_assignment
        )
    }
}

pub fn classify_pixel_aspect(h_spacing: u32, v_spacing: u32) -> String {
    let label = match (h_spacing, v_spacing) {
        (1, 1) => "1:1",
        (10000, 7031) | (1024, 720) => "PAL 16x9",
        (59, 54) => "PAL 4x3",
        (10, 11) => "NTSC 4x3",
        (40, 33) => "NTSC 16x9",
        (h, v) => return format!("{}:{} Unknown", h, v),
    };
    label.to_string()
}

pub fn classify_color_space(parameter_type: FourCC, primaries: u16, transfer: u16, matrix: u16) -> &'static str {
    if &parameter_type.0 != b"nclc" {
        return "Unknown";
    }
    match (primaries, transfer, matrix) {
        (1, 1, 1) => "HD",
        (5, 1, 6) => "PAL",
        (6, 1, 6) => "NTSC",
        _ => "Unknown",
    }
}

/// `H:MM:SS.ffffff`
fn format_duration(secs: f64) -> String {
    let micros = (secs.max(0.0) * 1_000_000.0).round() as u64;
    let (whole, frac) = (micros / 1_000_000, micros % 1_000_000);
    format!("{}:{:02}:{:02}.{:06}", whole / 3600, (whole / 60) % 60, whole % 60, frac)
}
