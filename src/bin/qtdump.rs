use clap::{ArgAction, Parser};
use qtmeta::{
    AtomHeader, DecodedAtom, FourCC, ResultNode, ResultTree, Segment, hex_range,
    known_boxes::full_name,
    parse_atoms, read_atom_header,
    registry::SampleMedia,
};

#[derive(Parser, Debug)]
#[command(version, about = "QuickTime atom tree explorer")]
struct Args {
    /// QuickTime (.mov) file path
    path: String,

    /// Dump raw payload of every top-level atom with this 4CC (e.g. --raw mdat)
    #[arg(long = "raw")]
    raw: Option<String>,

    /// Bytes to show when dumping raw (0 means entire payload)
    #[arg(long, default_value_t = 0)]
    bytes: usize,

    /// Emit JSON instead of a human-readable tree
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let args = Args::parse();
    let data = std::fs::read(&args.path)?;

    let tree = parse_atoms(&data)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&tree)?);
        return Ok(());
    }

    print_tree(&tree.root, 0);
    if let Some(tc) = tree.source_timecode {
        println!("source timecode: {}", tc);
    }

    if let Some(sel) = args.raw.as_ref() {
        let typ = FourCC::from_str(sel)
            .ok_or_else(|| anyhow::anyhow!("--raw expects a four character code, got {:?}", sel))?;
        dump_raw(&args.path, &data, typ, args.bytes)?;
    }

    Ok(())
}

// ---------- Human-readable tree ----------

fn print_tree(tree: &ResultTree, depth: usize) {
    let indent = "  ".repeat(depth);
    for (typ, nodes) in tree.iter() {
        let name = full_name(typ).unwrap_or("Unknown");
        for (i, node) in nodes.iter().enumerate() {
            let label = if nodes.len() > 1 {
                format!("{}[{}]", typ, i)
            } else {
                typ.to_string()
            };
            match node {
                ResultNode::SubTree(child) => {
                    println!("{indent}{} ({})", label, name);
                    print_tree(child, depth + 1);
                }
                ResultNode::Record(rec) => {
                    println!("{indent}{} ({}): {}", label, name, summary(rec));
                }
            }
        }
    }
}

fn summary(rec: &DecodedAtom) -> String {
    match rec {
        DecodedAtom::FileType(f) => {
            let compat: Vec<String> = f.compatible_brands.iter().map(|b| b.to_string()).collect();
            format!("major={} minor={} compatible={:?}", f.major_brand, f.minor_version, compat)
        }
        DecodedAtom::MovieHeader(m) => format!(
            "timescale={} duration={} next_track_id={}",
            m.timescale, m.duration, m.next_track_id
        ),
        DecodedAtom::TrackHeader(t) => format!(
            "track_id={} duration={} width={} height={}",
            t.track_id, t.duration, t.width, t.height
        ),
        DecodedAtom::MediaHeader(m) => format!(
            "timescale={} duration={} language={}",
            m.timescale, m.duration, m.language
        ),
        DecodedAtom::HandlerReference(h) => format!(
            "type={} subtype={} name={:?}",
            h.component_type, h.subtype, h.name
        ),
        DecodedAtom::Aperture(a) => format!("{}x{}", a.width, a.height),
        DecodedAtom::TimeToSample(t) => {
            let (duration, samples) = t.totals();
            format!("entries={} samples={} duration={}", t.entries.len(), samples, duration)
        }
        DecodedAtom::SampleDescription(s) => {
            let formats: Vec<String> = s
                .entries
                .iter()
                .map(|e| match &e.media {
                    SampleMedia::Video(v) => format!("{} {}x{}", e.format, v.width, v.height),
                    SampleMedia::Audio(a) => {
                        format!("{} {}ch {}Hz", e.format, a.channels, a.sample_rate)
                    }
                    SampleMedia::Timecode(t) => format!("{} drop_frame={}", e.format, t.drop_frame),
                    SampleMedia::Other => e.format.to_string(),
                })
                .collect();
            format!("entries=[{}]", formats.join(", "))
        }
    }
}

// ---------- Raw payload dump ----------

/// Top-level atoms tagged `typ`, with their payload lengths.
///
/// Sizes follow the walker: a zero-sized `mdat` runs to the end of the file,
/// any other zero-sized atom is header-only.
fn find_top_level(data: &[u8], typ: FourCC) -> anyhow::Result<Vec<(AtomHeader, u64)>> {
    let mut seg = Segment::new(data);
    let mut found = Vec::new();
    while seg.remaining() > 0 {
        let h = read_atom_header(&mut seg)?;
        let open_ended = h.size == 0 && h.typ == FourCC::MDAT;
        let payload_len = if open_ended {
            seg.remaining() as u64
        } else {
            h.payload_len()
        };
        seg.skip(payload_len)?;

        if h.typ == typ {
            found.push((h, payload_len));
        }
        if open_ended {
            break;
        }
    }
    Ok(found)
}

fn dump_raw(path: &str, data: &[u8], typ: FourCC, max_bytes: usize) -> anyhow::Result<()> {
    for (h, payload_len) in find_top_level(data, typ)? {
        let shown = if max_bytes == 0 {
            payload_len
        } else {
            (max_bytes as u64).min(payload_len)
        };
        let dump = hex_range(path, h.start + h.header_size, shown)?;
        println!(
            "\n{} at {:#x}: {} payload bytes (showing {})",
            h.typ, h.start, payload_len, dump.length
        );
        print!("{}", dump.hex);
    }
    Ok(())
}
