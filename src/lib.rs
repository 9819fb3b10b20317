pub mod api;
pub mod boxes;
pub mod cursor;
pub mod extract;
pub mod known_boxes;
pub mod parser;
pub mod registry;
pub mod util;
pub mod video;

pub use api::{CONTAINER_NAME, HexDump, decode_tree, hex_range, parse_bytes, parse_file};
pub use boxes::{AtomHeader, FourCC};
pub use cursor::Segment;
pub use known_boxes::{Decoder, MOVIE_SCHEMA, SchemaNode};
pub use parser::{AtomTree, ParseError, ResultNode, ResultTree, WalkContext, parse_atoms, read_atom_header, walk};
pub use registry::DecodedAtom;
pub use video::{AudioStream, Stream, VideoFile, VideoStream};
