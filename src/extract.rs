//! Projection of a decoded atom tree onto stream descriptors.

use crate::boxes::FourCC;
use crate::parser::{AtomTree, ParseError, Result, ResultTree};
use crate::registry::{
    DecodedAtom, HANDLER_SOUND, HANDLER_TIMECODE, HANDLER_VIDEO, HdlrData, MdhdData, SampleEntry,
    SampleMedia, SoundSampleEntry, SttsData, TkhdData, VisualSampleEntry,
};
use crate::video::{AudioStream, VideoFile, VideoStream};
use log::{debug, warn};

/// Atoms of one `trak` that projection reads.
struct TrackAtoms<'a> {
    tkhd: Option<&'a TkhdData>,
    mdhd: Option<&'a MdhdData>,
    hdlr: &'a HdlrData,
    stts: Option<&'a SttsData>,
    entry: &'a SampleEntry,
    tapt: Option<&'a ResultTree>,
}

impl<'a> TrackAtoms<'a> {
    fn resolve(trak: &'a ResultTree) -> Option<Self> {
        let mdia = trak.subtree(b"mdia")?;
        let hdlr = match mdia.record(b"hdlr")? {
            DecodedAtom::HandlerReference(h) => h,
            _ => return None,
        };
        let stbl = mdia.path(&[b"minf", b"stbl"])?;
        let entry = match stbl.record(b"stsd")? {
            DecodedAtom::SampleDescription(stsd) => stsd.entries.first()?,
            _ => return None,
        };

        Some(TrackAtoms {
            tkhd: match trak.record(b"tkhd") {
                Some(DecodedAtom::TrackHeader(h)) => Some(h),
                _ => None,
            },
            mdhd: match mdia.record(b"mdhd") {
                Some(DecodedAtom::MediaHeader(h)) => Some(h),
                _ => None,
            },
            hdlr,
            stts: match stbl.record(b"stts") {
                Some(DecodedAtom::TimeToSample(t)) => Some(t),
                _ => None,
            },
            entry,
            tapt: trak.subtree(b"tapt"),
        })
    }

    fn track_id(&self) -> u32 {
        self.tkhd.map_or(0, |h| h.track_id)
    }

    fn timescale(&self) -> u32 {
        self.mdhd.map_or(0, |m| m.timescale)
    }

    fn sample_totals(&self) -> (u128, u64) {
        self.stts.map_or((0, 0), SttsData::totals)
    }

    fn aperture(&self, typ: &[u8; 4]) -> Option<(u32, u32)> {
        match self.tapt?.record(typ)? {
            DecodedAtom::Aperture(a) => Some((a.width as u32, a.height as u32)),
            _ => None,
        }
    }
}

/// Fill `video` with one descriptor per recognised track of `tree`, in track order.
pub fn extract_information(tree: &AtomTree, video: &mut VideoFile) -> Result<()> {
    let moov = tree.root.subtree(b"moov").ok_or(ParseError::MissingAtom("moov"))?;
    let movie_timescale = match moov.record(b"mvhd") {
        Some(DecodedAtom::MovieHeader(mvhd)) => mvhd.timescale,
        _ => return Err(ParseError::MissingAtom("moov/mvhd")),
    };
    video.drop_frame = false;

    for (index, trak) in moov.subtrees(b"trak").enumerate() {
        let Some(track) = TrackAtoms::resolve(trak) else {
            warn!("track {}: no handler reference or sample description, skipped", index + 1);
            continue;
        };

        match (track.hdlr.subtype, &track.entry.media) {
            (HANDLER_VIDEO, SampleMedia::Video(visual)) => {
                let stream = project_video(&track, visual, tree.source_timecode);
                video.add_video_stream(stream);
            }
            (HANDLER_SOUND, SampleMedia::Audio(sound)) => {
                let stream = project_audio(&track, sound);
                video.add_audio_stream(stream);
            }
            (HANDLER_TIMECODE, SampleMedia::Timecode(tc)) => {
                if movie_timescale > 2980 && movie_timescale < 3010 && tc.drop_frame > 0 {
                    video.drop_frame = true;
                }
            }
            (subtype, _) => {
                debug!("track {}: handler '{}' not projected", index + 1, subtype);
            }
        }
    }

    if video.drop_frame {
        for v in video.video_streams_mut() {
            v.drop_frame = true;
        }
    }
    Ok(())
}

fn project_video(track: &TrackAtoms<'_>, visual: &VisualSampleEntry, source_timecode: Option<u32>) -> VideoStream {
    let (total_duration, total_samples) = track.sample_totals();
    let (framerate, duration) = video_timing(track.timescale(), total_duration, total_samples);

    let mut stream = VideoStream {
        track_id: track.track_id(),
        width: visual.width.max(0) as u32,
        height: visual.height.max(0) as u32,
        framerate,
        duration,
        codec: video_codec_label(&visual.compressor, track.entry.format),
        source_timecode,
        clean_aperture: track.aperture(b"clef"),
        production_aperture: track.aperture(b"prof"),
        encoded_aperture: track.aperture(b"enof"),
        clean_aperture_rect: visual.clean_aperture,
        gamma: visual.gamma,
        ..VideoStream::default()
    };

    if let Some(field) = visual.field {
        stream.set_fields(field.field_type, field.field_order);
    }
    if let Some(c) = visual.color {
        stream.set_color(c.parameter_type, c.primaries, c.transfer_function, c.matrix);
    }
    if let Some((h, v)) = visual.pixel_aspect {
        stream.set_pixel_aspect(h, v);
    }
    stream
}

fn project_audio(track: &TrackAtoms<'_>, sound: &SoundSampleEntry) -> AudioStream {
    let (total_duration, _) = track.sample_totals();
    let timescale = track.timescale();
    let duration = if timescale == 0 {
        0.0
    } else {
        total_duration as f64 / timescale as f64
    };

    AudioStream {
        track_id: track.track_id(),
        channels: sound.channels,
        sample_rate: sound.sample_rate,
        bits_per_sample: sound.bits_per_sample,
        codec: audio_codec_label(track.entry.format),
        duration,
        channel_assignment: sound.channel_assignment.clone(),
    }
}

/// Average frame rate and duration in seconds from summed time-to-sample runs.
///
/// Duration is recomputed from the derived rate rather than read from the
/// media header. An empty table yields `(0.0, 0.0)`.
pub fn video_timing(timescale: u32, total_duration: u128, total_samples: u64) -> (f64, f64) {
    if total_duration == 0 || total_samples == 0 {
        return (0.0, 0.0);
    }
    let framerate = timescale as f64 / (total_duration as f64 / total_samples as f64);
    if framerate == 0.0 {
        return (0.0, 0.0);
    }
    (framerate, total_samples as f64 / framerate)
}

/// Compressor name when present, otherwise a display name for known ProRes tags.
pub fn video_codec_label(compressor: &str, format: FourCC) -> String {
    if !compressor.is_empty() {
        return compressor.to_string();
    }
    let label = match &format.0 {
        b"apch" => "Apple ProRes 422 (HQ)",
        b"apcn" => "Apple ProRes 422",
        b"apcs" => "Apple ProRes 422 (LT)",
        b"apco" => "Apple ProRes 422 (Proxy)",
        b"ap4h" => "Apple ProRes 4444",
        _ => return format.to_string(),
    };
    label.to_string()
}

/// PCM formats report their bit depth; everything else its format tag.
pub fn audio_codec_label(format: FourCC) -> String {
    match &format.0 {
        b"sowt" | b"twos" => "16".to_string(),
        b"in24" => "24".to_string(),
        _ => format.to_string(),
    }
}
