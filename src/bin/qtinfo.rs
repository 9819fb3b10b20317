use clap::Parser;
use qtmeta::{AudioStream, Stream, VideoFile, VideoStream, parse_file};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "QuickTime stream info (codec, size, timing, audio layout)")]
struct Args {
    /// QuickTime (.mov) file path
    path: String,

    /// Output as JSON instead of human-readable text
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct MediaInfo<'a> {
    file: String,
    #[serde(flatten)]
    video: &'a VideoFile,
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let args = Args::parse();
    let path = PathBuf::from(&args.path);

    let video = parse_file(&path)?;

    if args.json {
        let info = MediaInfo { file: path.display().to_string(), video: &video };
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        print_human(&path.display().to_string(), &video);
    }

    Ok(())
}

// ---- human-readable output -----------------------------------------

fn print_human(file: &str, video: &VideoFile) {
    println!("File: {}", file);
    println!("Container: {}", video.container);
    if video.drop_frame {
        println!("Timecode: drop-frame");
    }

    if video.streams().is_empty() {
        println!("Streams: (none)");
        return;
    }

    println!("Streams:");
    for (i, s) in video.streams().iter().enumerate() {
        println!("  Stream {} ({}):", i + 1, s.kind());
        let lines = match s {
            Stream::Video(v) => video_lines(v),
            Stream::Audio(a) => audio_lines(a),
        };
        for line in lines {
            println!("    {}", line);
        }
    }
}

fn video_lines(v: &VideoStream) -> Vec<String> {
    let mut out = vec![
        format!("track id: {}", v.track_id),
        format!("codec: {}", v.codec),
        format!("size: {}x{}", v.width, v.height),
        format!("frame rate: {:.3}", v.framerate),
        format!("duration: {:.3} s", v.duration),
        format!("fields: {} ({})", v.field_type, v.field_order),
    ];
    if let Some(tc) = v.source_timecode_string() {
        out.push(format!("source timecode: {}", tc));
    }
    if let Some(par) = &v.pixel_aspect {
        out.push(format!("pixel aspect: {}", par));
    }
    if let Some(cs) = &v.color_space {
        out.push(format!("color space: {}", cs));
    }
    if let Some(g) = v.gamma {
        out.push(format!("gamma: {:.2}", g));
    }
    for (name, ap) in [
        ("clean aperture", v.clean_aperture),
        ("production aperture", v.production_aperture),
        ("encoded pixels", v.encoded_aperture),
    ] {
        if let Some((w, h)) = ap {
            out.push(format!("{}: {}x{}", name, w, h));
        }
    }
    out
}

fn audio_lines(a: &AudioStream) -> Vec<String> {
    vec![
        format!("track id: {}", a.track_id),
        format!("codec: {}", a.codec),
        format!("channels: {} ({})", a.channels, a.channel_assignment),
        format!("sample rate: {}", a.sample_rate),
        format!("bits per sample: {}", a.bits_per_sample),
        format!("duration: {:.3} s", a.duration),
    ]
}
