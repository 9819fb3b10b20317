#![allow(dead_code)]

// Builders for synthetic QuickTime atoms.

pub fn atom(typ: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&(8 + payload.len() as u32).to_be_bytes());
    v.extend_from_slice(typ);
    v.extend_from_slice(payload);
    v
}

/// Same atom, written with the 64-bit extended size field.
pub fn large_atom(typ: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&1u32.to_be_bytes());
    v.extend_from_slice(typ);
    v.extend_from_slice(&(16 + payload.len() as u64).to_be_bytes());
    v.extend_from_slice(payload);
    v
}

pub fn container(typ: &[u8; 4], children: &[Vec<u8>]) -> Vec<u8> {
    atom(typ, &children.concat())
}

pub fn fixed(whole: u16, frac: u16) -> [u8; 4] {
    (((whole as u32) << 16) | frac as u32).to_be_bytes()
}

pub fn ftyp(major: &[u8; 4], compatible: &[&[u8; 4]]) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(major);
    p.extend_from_slice(&0x2005_0300u32.to_be_bytes());
    for b in compatible {
        p.extend_from_slice(*b);
    }
    atom(b"ftyp", &p)
}

pub fn mvhd_payload(timescale: u32, duration: u32) -> Vec<u8> {
    let mut p = vec![0u8; 4]; // version + flags
    p.extend_from_slice(&100u32.to_be_bytes()); // creation
    p.extend_from_slice(&200u32.to_be_bytes()); // modification
    p.extend_from_slice(&timescale.to_be_bytes());
    p.extend_from_slice(&duration.to_be_bytes());
    p.extend_from_slice(&fixed(1, 0)); // preferred rate
    p.extend_from_slice(&0x0100u16.to_be_bytes()); // preferred volume
    p.extend_from_slice(&[0u8; 10]);
    p.extend_from_slice(&[0u8; 36]);
    for v in 0..7u32 {
        p.extend_from_slice(&v.to_be_bytes());
    }
    assert_eq!(p.len(), 100);
    p
}

pub fn mvhd(timescale: u32, duration: u32) -> Vec<u8> {
    atom(b"mvhd", &mvhd_payload(timescale, duration))
}

pub fn tkhd(track_id: u32) -> Vec<u8> {
    let mut p = vec![0u8; 4];
    p.extend_from_slice(&0u32.to_be_bytes());
    p.extend_from_slice(&0u32.to_be_bytes());
    p.extend_from_slice(&track_id.to_be_bytes());
    p.extend_from_slice(&[0u8; 4]);
    p.extend_from_slice(&1000u32.to_be_bytes()); // duration
    p.extend_from_slice(&[0u8; 8]);
    p.extend_from_slice(&0u16.to_be_bytes()); // layer
    p.extend_from_slice(&0u16.to_be_bytes()); // alternate group
    p.extend_from_slice(&0u16.to_be_bytes()); // volume
    p.extend_from_slice(&[0u8; 2]);
    p.extend_from_slice(&[0u8; 36]);
    p.extend_from_slice(&fixed(1920, 0));
    p.extend_from_slice(&fixed(1080, 0));
    assert_eq!(p.len(), 84);
    atom(b"tkhd", &p)
}

pub fn mdhd(timescale: u32, duration: u32) -> Vec<u8> {
    let mut p = vec![0u8; 4];
    p.extend_from_slice(&0u32.to_be_bytes());
    p.extend_from_slice(&0u32.to_be_bytes());
    p.extend_from_slice(&timescale.to_be_bytes());
    p.extend_from_slice(&duration.to_be_bytes());
    p.extend_from_slice(&0x55C4u16.to_be_bytes()); // "und"
    p.extend_from_slice(&0u16.to_be_bytes());
    atom(b"mdhd", &p)
}

pub fn hdlr_payload(subtype: &[u8; 4], name: &str) -> Vec<u8> {
    let mut p = vec![0u8; 4];
    p.extend_from_slice(b"mhlr");
    p.extend_from_slice(subtype);
    p.extend_from_slice(b"appl");
    p.extend_from_slice(&0u32.to_be_bytes());
    p.extend_from_slice(&0u32.to_be_bytes());
    p.push(name.len() as u8);
    p.extend_from_slice(name.as_bytes());
    p
}

pub fn hdlr(subtype: &[u8; 4]) -> Vec<u8> {
    atom(b"hdlr", &hdlr_payload(subtype, "Handler"))
}

pub fn stts_payload(runs: &[(u32, u32)]) -> Vec<u8> {
    let mut p = vec![0u8; 4];
    p.extend_from_slice(&(runs.len() as u32).to_be_bytes());
    for (count, duration) in runs {
        p.extend_from_slice(&count.to_be_bytes());
        p.extend_from_slice(&duration.to_be_bytes());
    }
    p
}

pub fn stts(runs: &[(u32, u32)]) -> Vec<u8> {
    atom(b"stts", &stts_payload(runs))
}

/// One sample description entry: common prefix followed by `body`.
pub fn sample_entry(format: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut e = Vec::new();
    e.extend_from_slice(&(16 + body.len() as u32).to_be_bytes());
    e.extend_from_slice(format);
    e.extend_from_slice(&[0u8; 6]);
    e.extend_from_slice(&1u16.to_be_bytes()); // data reference index
    e.extend_from_slice(&0u16.to_be_bytes()); // version
    e.extend_from_slice(&0u16.to_be_bytes()); // revision
    e.extend_from_slice(body);
    e
}

/// Video entry body with `extensions` appended after the color table id.
pub fn video_body(compressor: &str, width: i16, height: i16, extensions: &[u8]) -> Vec<u8> {
    let mut b = Vec::new();
    b.extend_from_slice(b"appl");
    b.extend_from_slice(&0i32.to_be_bytes());
    b.extend_from_slice(&1023i32.to_be_bytes());
    b.extend_from_slice(&width.to_be_bytes());
    b.extend_from_slice(&height.to_be_bytes());
    b.extend_from_slice(&fixed(72, 0));
    b.extend_from_slice(&fixed(72, 0));
    b.extend_from_slice(&0i32.to_be_bytes());
    b.extend_from_slice(&1i16.to_be_bytes());
    let mut name = [0u8; 32];
    name[0] = compressor.len() as u8;
    name[1..1 + compressor.len()].copy_from_slice(compressor.as_bytes());
    b.extend_from_slice(&name);
    b.extend_from_slice(&24u16.to_be_bytes());
    b.extend_from_slice(&(-1i16).to_be_bytes());
    b.extend_from_slice(extensions);
    b
}

/// Extension as the sample description decoder probes it: 16-bit length, tag, data.
pub fn extension(tag: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut e = Vec::new();
    e.extend_from_slice(&(6 + data.len() as u16).to_be_bytes());
    e.extend_from_slice(tag);
    e.extend_from_slice(data);
    e
}

pub fn sound_body(channels: u16, bits: u16, rate: u16, tail: &[u8]) -> Vec<u8> {
    let mut b = Vec::new();
    b.extend_from_slice(&0u32.to_be_bytes());
    b.extend_from_slice(&channels.to_be_bytes());
    b.extend_from_slice(&bits.to_be_bytes());
    b.extend_from_slice(&0i16.to_be_bytes());
    b.extend_from_slice(&0u16.to_be_bytes());
    b.extend_from_slice(&fixed(rate, 0));
    b.extend_from_slice(tail);
    b
}

/// Version 1 sound fields plus an opaque extension of `ext_len` bytes (length included).
pub fn sound_v1_tail(ext_len: u32) -> Vec<u8> {
    let mut t = Vec::new();
    for v in [1i32, 2, 4, 2] {
        t.extend_from_slice(&v.to_be_bytes());
    }
    t.extend_from_slice(&ext_len.to_be_bytes());
    t.extend_from_slice(&vec![0u8; ext_len.saturating_sub(4) as usize]);
    t
}

pub fn channel_layout_header(size: u32) -> Vec<u8> {
    let mut c = Vec::new();
    c.extend_from_slice(&size.to_be_bytes());
    c.extend_from_slice(b"chan");
    c.extend_from_slice(&[0u8; 4]);
    c
}

pub fn timecode_body(drop_frame: u8) -> Vec<u8> {
    let mut b = vec![0, 0, 0, drop_frame, 0, 0];
    b.extend_from_slice(&30000u16.to_be_bytes());
    b.extend_from_slice(&[0, 0]);
    b.extend_from_slice(&1001u16.to_be_bytes());
    b.push(30);
    b.push(0);
    b
}

pub fn stsd_payload(entries: &[Vec<u8>]) -> Vec<u8> {
    let mut p = vec![0u8; 4];
    p.extend_from_slice(&(entries.len() as u32).to_be_bytes());
    for e in entries {
        p.extend_from_slice(e);
    }
    p
}

pub fn stsd(entries: &[Vec<u8>]) -> Vec<u8> {
    atom(b"stsd", &stsd_payload(entries))
}

/// trak → tkhd, mdia → mdhd, hdlr, minf → stbl → stsd, stts
pub fn track(track_id: u32, subtype: &[u8; 4], timescale: u32, entry: Vec<u8>, runs: &[(u32, u32)]) -> Vec<u8> {
    let stbl = container(b"stbl", &[stsd(&[entry]), stts(runs)]);
    let minf = container(b"minf", &[atom(b"vmhd", &[0u8; 12]), stbl]);
    let mdia = container(b"mdia", &[mdhd(timescale, 0), hdlr(subtype), minf]);
    container(b"trak", &[tkhd(track_id), mdia])
}

pub fn movie(timescale: u32, tracks: &[Vec<u8>]) -> Vec<u8> {
    let mut kids = vec![mvhd(timescale, 0)];
    kids.extend_from_slice(tracks);
    container(b"moov", &kids)
}

pub fn quicktime_file(parts: &[Vec<u8>]) -> Vec<u8> {
    let mut v = ftyp(b"qt  ", &[b"qt  "]);
    for p in parts {
        v.extend_from_slice(p);
    }
    v
}
