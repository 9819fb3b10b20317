use crate::boxes::FourCC;

/// Leaf decoders the walker can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decoder {
    FileType,
    MovieHeader,
    TrackHeader,
    MediaHeader,
    HandlerReference,
    CleanAperture,
    ProductionAperture,
    EncodedAperture,
    TimeToSample,
    SampleDescription,
}

/// How the walker treats an atom at a given nesting level.
///
/// Atoms absent from a container's child list are unknown and skipped the
/// same way as [`SchemaNode::Skip`]; the distinction only matters for
/// documentation and tooling.
#[derive(Debug, Clone, Copy)]
pub enum SchemaNode {
    Container(&'static [SchemaEntry]),
    Leaf(Decoder),
    Skip,
}

#[derive(Debug)]
pub struct SchemaEntry {
    pub typ: FourCC,
    pub name: &'static str,
    pub node: SchemaNode,
}

impl SchemaNode {
    /// Look up `typ` among this node's children. Leaves and skipped atoms have none.
    pub fn child(&self, typ: FourCC) -> Option<&'static SchemaEntry> {
        self.children().iter().find(|e| e.typ == typ)
    }

    pub fn children(&self) -> &'static [SchemaEntry] {
        match *self {
            SchemaNode::Container(kids) => kids,
            SchemaNode::Leaf(_) | SchemaNode::Skip => &[],
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, SchemaNode::Container(_))
    }
}

const fn entry(typ: &[u8; 4], name: &'static str, node: SchemaNode) -> SchemaEntry {
    SchemaEntry { typ: FourCC(*typ), name, node }
}

use SchemaNode::{Container, Leaf, Skip};

const META: &[SchemaEntry] = &[
    entry(b"hdlr", "Metadata Handler", Skip),
    entry(b"keys", "Metadata Item Keys", Skip),
    entry(b"ilst", "Metadata Item List", Skip),
];

const STBL: &[SchemaEntry] = &[
    entry(b"stsd", "Sample Description", Leaf(Decoder::SampleDescription)),
    entry(b"stts", "Time-to-Sample", Leaf(Decoder::TimeToSample)),
    entry(b"stsc", "Sample-to-Chunk", Skip),
    entry(b"stsz", "Sample Size", Skip),
    entry(b"stco", "Chunk Offset", Skip),
    entry(b"co64", "64-bit Chunk Offset", Skip),
];

const DINF: &[SchemaEntry] = &[entry(b"dref", "Data Reference", Skip)];

const MINF: &[SchemaEntry] = &[
    entry(b"vmhd", "Video Media Information Header", Skip),
    entry(b"smhd", "Sound Media Information Header", Skip),
    entry(b"gmhd", "Base Media Information Header", Skip),
    entry(b"hdlr", "Data Handler Reference", Skip),
    entry(b"dinf", "Data Information", Container(DINF)),
    entry(b"stbl", "Sample Table", Container(STBL)),
];

const MDIA: &[SchemaEntry] = &[
    entry(b"mdhd", "Media Header", Leaf(Decoder::MediaHeader)),
    entry(b"hdlr", "Media Handler Reference", Leaf(Decoder::HandlerReference)),
    entry(b"minf", "Media Information", Container(MINF)),
];

const CLIP: &[SchemaEntry] = &[entry(b"crgn", "Clipping Region", Skip)];
const MATT: &[SchemaEntry] = &[entry(b"kmat", "Compressed Matte", Skip)];
const EDTS: &[SchemaEntry] = &[entry(b"elst", "Edit List", Skip)];
const TREF: &[SchemaEntry] = &[entry(b"tmcd", "Timecode Reference", Skip)];

const TAPT: &[SchemaEntry] = &[
    entry(b"clef", "Clean Aperture Dimensions", Leaf(Decoder::CleanAperture)),
    entry(b"prof", "Production Aperture Dimensions", Leaf(Decoder::ProductionAperture)),
    entry(b"enof", "Encoded Pixels Dimensions", Leaf(Decoder::EncodedAperture)),
];

const TRAK: &[SchemaEntry] = &[
    entry(b"tkhd", "Track Header", Leaf(Decoder::TrackHeader)),
    entry(b"clip", "Track Clipping", Container(CLIP)),
    entry(b"matt", "Track Matte", Container(MATT)),
    entry(b"edts", "Edit", Container(EDTS)),
    entry(b"tapt", "Track Aperture Mode Dimensions", Container(TAPT)),
    entry(b"tref", "Track Reference", Container(TREF)),
    entry(b"mdia", "Media", Container(MDIA)),
    entry(b"udta", "User Data", Skip),
    entry(b"meta", "Metadata", Container(META)),
];

const MOOV: &[SchemaEntry] = &[
    entry(b"mvhd", "Movie Header", Leaf(Decoder::MovieHeader)),
    entry(b"trak", "Track", Container(TRAK)),
    entry(b"skip", "Skip", Skip),
    entry(b"udta", "User Data", Skip),
    entry(b"meta", "Metadata", Container(META)),
    entry(b"ctab", "Color Table", Skip),
    entry(b"cmov", "Compressed Movie", Skip),
    entry(b"rmra", "Reference Movie", Skip),
];

const FILE: &[SchemaEntry] = &[
    entry(b"ftyp", "File Type", Leaf(Decoder::FileType)),
    entry(b"moov", "Movie", Container(MOOV)),
    entry(b"free", "Free Space", Skip),
    entry(b"wide", "Wide Reserve", Skip),
    entry(b"mdat", "Media Data", Skip),
];

/// Root of the QuickTime movie grammar: the top level of a file.
pub static MOVIE_SCHEMA: SchemaNode = Container(FILE);

/// Human-readable name for `typ` at any level of the schema, if it is known.
pub fn full_name(typ: FourCC) -> Option<&'static str> {
    fn find(node: &SchemaNode, typ: FourCC) -> Option<&'static str> {
        for e in node.children() {
            if e.typ == typ {
                return Some(e.name);
            }
            if let Some(name) = find(&e.node, typ) {
                return Some(name);
            }
        }
        None
    }
    find(&MOVIE_SCHEMA, typ)
}
