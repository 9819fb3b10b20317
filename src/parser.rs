use crate::boxes::{AtomHeader, FourCC};
use crate::cursor::Segment;
use crate::known_boxes::{MOVIE_SCHEMA, SchemaNode};
use crate::registry::DecodedAtom;
use log::{debug, trace, warn};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("truncated: needed {needed} bytes at offset {offset:#x}, only {available} available")]
    Truncated { offset: u64, needed: u64, available: u64 },
    #[error("not a QuickTime file (major brand '{major_brand}')")]
    FormatMismatch { major_brand: FourCC },
    #[error("atom '{typ}' at offset {offset:#x} declares size {size}, smaller than its {header_size}-byte header")]
    InvalidSize { typ: FourCC, offset: u64, size: u64, header_size: u64 },
    #[error("missing required atom {0}")]
    MissingAtom(&'static str),
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// State threaded through one walk.
///
/// `handler` is the media handler subtype of the track being walked; it is
/// reset on entry to every `trak` and consulted when decoding `stsd`.
#[derive(Debug, Clone, Default)]
pub struct WalkContext {
    pub handler: Option<FourCC>,
    pub source_timecode: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResultNode {
    SubTree(ResultTree),
    Record(DecodedAtom),
}

impl ResultNode {
    pub fn as_tree(&self) -> Option<&ResultTree> {
        match self {
            ResultNode::SubTree(t) => Some(t),
            ResultNode::Record(_) => None,
        }
    }

    pub fn as_record(&self) -> Option<&DecodedAtom> {
        match self {
            ResultNode::Record(r) => Some(r),
            ResultNode::SubTree(_) => None,
        }
    }
}

/// Decoded atoms of one nesting level, grouped by type.
///
/// Each type maps to the occurrences of that type in file order; types are
/// kept in the order they were first seen.
#[derive(Debug, Clone, Default)]
pub struct ResultTree {
    entries: Vec<(FourCC, Vec<ResultNode>)>,
}

impl ResultTree {
    pub fn push(&mut self, typ: FourCC, node: ResultNode) {
        match self.entries.iter_mut().find(|(t, _)| *t == typ) {
            Some((_, nodes)) => nodes.push(node),
            None => self.entries.push((typ, vec![node])),
        }
    }

    /// All occurrences of `typ`, empty when none were recorded.
    pub fn get(&self, typ: &[u8; 4]) -> &[ResultNode] {
        self.entries
            .iter()
            .find(|(t, _)| t.0 == *typ)
            .map(|(_, nodes)| nodes.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, typ: &[u8; 4]) -> bool {
        !self.get(typ).is_empty()
    }

    /// First occurrence of container `typ`.
    pub fn subtree(&self, typ: &[u8; 4]) -> Option<&ResultTree> {
        self.get(typ).first().and_then(ResultNode::as_tree)
    }

    pub fn subtrees<'a>(&'a self, typ: &[u8; 4]) -> impl Iterator<Item = &'a ResultTree> + use<'a> {
        self.get(typ).iter().filter_map(ResultNode::as_tree)
    }

    /// First occurrence of leaf `typ`.
    pub fn record(&self, typ: &[u8; 4]) -> Option<&DecodedAtom> {
        self.get(typ).first().and_then(ResultNode::as_record)
    }

    /// Follow the first occurrence of each container in `path`.
    pub fn path(&self, path: &[&[u8; 4]]) -> Option<&ResultTree> {
        path.iter().try_fold(self, |tree, typ| tree.subtree(typ))
    }

    pub fn iter(&self) -> impl Iterator<Item = (FourCC, &[ResultNode])> {
        self.entries.iter().map(|(t, nodes)| (*t, nodes.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ResultTree {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(Some(self.entries.len()))?;
        for (typ, nodes) in &self.entries {
            map.serialize_entry(typ, nodes)?;
        }
        map.end()
    }
}

/// Result of walking a whole file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AtomTree {
    pub root: ResultTree,
    /// Value of a 4-byte `mdat` atom, which some tools use to store a source timecode.
    pub source_timecode: Option<u32>,
}

pub fn read_atom_header(seg: &mut Segment<'_>) -> Result<AtomHeader> {
    let start = seg.offset();
    let size32 = seg.read_u32()?;
    let typ = seg.read_fourcc()?;

    let (size, header_size) = if size32 == 1 {
        (seg.read_u64()?, 16)
    } else {
        (size32 as u64, 8)
    };

    // size 0 is only meaningful in the 32-bit field; the walker resolves it
    if (size32 == 1 || size != 0) && size < header_size {
        return Err(ParseError::InvalidSize { typ, offset: start, size, header_size });
    }

    Ok(AtomHeader { size, typ, header_size, start })
}

/// Walk every atom in `seg` against `schema`, appending decoded nodes to `tree`.
pub fn walk(
    seg: &mut Segment<'_>,
    schema: &SchemaNode,
    tree: &mut ResultTree,
    ctx: &mut WalkContext,
) -> Result<()> {
    while seg.remaining() > 0 {
        let mut h = read_atom_header(seg)?;

        if h.size == 0 {
            if h.typ == FourCC::MDAT {
                debug!("open-ended mdat at {:#x}, no further atoms", h.start);
                break;
            }
            warn!("zero-sized '{}' atom at {:#x}, treating as empty", h.typ, h.start);
            h.size = h.header_size;
        }
        let payload_len = h.payload_len();

        if h.typ == FourCC::MDAT && h.size == 12 && h.header_size == 8 {
            let tc = seg.read_u32()?;
            debug!("mdat at {:#x} carries source timecode {}", h.start, tc);
            ctx.source_timecode = Some(tc);
            continue;
        }

        let Some(entry) = schema.child(h.typ) else {
            debug!("skipping unknown atom '{}' ({} bytes) at {:#x}", h.typ, h.size, h.start);
            seg.skip(payload_len)?;
            continue;
        };

        match entry.node {
            SchemaNode::Container(_) => {
                trace!("entering '{}' at {:#x}", h.typ, h.start);
                let mut sub = seg.sub_segment(payload_len)?;
                if h.typ == FourCC::TRAK {
                    ctx.handler = None;
                }
                let mut child = ResultTree::default();
                walk(&mut sub, &entry.node, &mut child, ctx)?;
                tree.push(h.typ, ResultNode::SubTree(child));
            }
            SchemaNode::Leaf(decoder) => {
                let mut sub = seg.sub_segment(payload_len)?;
                let record = decoder.decode(&mut sub, ctx)?;
                if sub.remaining() > 0 {
                    trace!("'{}' decoder left {} bytes unread", h.typ, sub.remaining());
                }
                tree.push(h.typ, ResultNode::Record(record));
            }
            SchemaNode::Skip => {
                debug!("skipping '{}' ({} bytes) at {:#x}", h.typ, h.size, h.start);
                seg.skip(payload_len)?;
            }
        }
    }
    Ok(())
}

/// Walk a complete file held in memory against the movie schema.
pub fn parse_atoms(data: &[u8]) -> Result<AtomTree> {
    let mut seg = Segment::new(data);
    let mut root = ResultTree::default();
    let mut ctx = WalkContext::default();
    walk(&mut seg, &MOVIE_SCHEMA, &mut root, &mut ctx)?;
    Ok(AtomTree { root, source_timecode: ctx.source_timecode })
}
