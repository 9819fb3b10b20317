use crate::{
    extract::extract_information,
    parser::{AtomTree, Result, parse_atoms},
    util::{hex_dump, read_slice},
    video::VideoFile,
};
use serde::Serialize;
use std::{fs::File, path::Path};

/// Container label reported for every successfully parsed file.
pub const CONTAINER_NAME: &str = "QuickTime";

/// Parse a QuickTime file held in memory into stream descriptors.
///
/// Fails with [`ParseError::FormatMismatch`](crate::ParseError::FormatMismatch)
/// when the `ftyp` brand is not QuickTime, so callers probing several
/// container parsers can move on to the next one.
///
/// # Example
/// ```no_run
/// let data = std::fs::read("clip.mov")?;
/// let video = qtmeta::parse_bytes(&data)?;
/// for v in video.video_streams() {
///     println!("{} {}x{} @ {:.3}", v.codec, v.width, v.height, v.framerate);
/// }
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn parse_bytes(data: &[u8]) -> Result<VideoFile> {
    let tree = parse_atoms(data)?;
    let mut video = VideoFile::new();
    extract_information(&tree, &mut video)?;
    video.set_container(CONTAINER_NAME);
    Ok(video)
}

/// Read `path` and parse it with [`parse_bytes`].
pub fn parse_file(path: impl AsRef<Path>) -> Result<VideoFile> {
    let data = std::fs::read(path)?;
    parse_bytes(&data)
}

/// Read `path` and return its decoded atom tree without projecting it.
pub fn decode_tree(path: impl AsRef<Path>) -> Result<AtomTree> {
    let data = std::fs::read(path)?;
    parse_atoms(&data)
}

/// Result of a hex dump operation containing the formatted hex output.
#[derive(Serialize)]
pub struct HexDump {
    /// Starting offset of the dumped data
    pub offset: u64,
    /// Actual number of bytes that were read and dumped
    pub length: u64,
    /// Formatted hex dump string with addresses and ASCII representation
    pub hex: String,
}

/// Hex-dump up to `max_len` bytes of `path` starting at `offset`.
///
/// Never reads past EOF; the returned length may be smaller than `max_len`.
pub fn hex_range(path: impl AsRef<Path>, offset: u64, max_len: u64) -> Result<HexDump> {
    let mut f = File::open(path)?;
    let size = f.metadata()?.len();

    let to_read = size.saturating_sub(offset).min(max_len);
    if to_read == 0 {
        return Ok(HexDump { offset, length: 0, hex: String::new() });
    }

    let data = read_slice(&mut f, offset, to_read)?;
    Ok(HexDump {
        offset,
        length: to_read,
        hex: hex_dump(&data, offset),
    })
}
