mod common;

use common::*;
use qtmeta::{ParseError, decode_tree, parse_file};
use std::path::PathBuf;

fn write_temp(name: &str, bytes: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("qtmeta_{}_{}.mov", name, std::process::id()));
    std::fs::write(&path, bytes).unwrap();
    path
}

fn sample_movie() -> Vec<u8> {
    let video = sample_entry(b"apco", &video_body("", 720, 486, &[]));
    let audio = sample_entry(b"twos", &sound_body(2, 16, 48000, &[]));
    quicktime_file(&[
        atom(b"wide", &[]),
        atom(b"mdat", &[0u8; 64]),
        movie(
            600,
            &[track(1, b"vide", 30000, video, &[(300, 1001)]), track(2, b"soun", 48000, audio, &[(480_480, 1)])],
        ),
    ])
}

#[test]
fn parse_file_reads_streams_from_disk() {
    let path = write_temp("parse_file", &sample_movie());

    let video = parse_file(&path).expect("parse_file failed");

    assert_eq!(video.container, "QuickTime");
    let v = video.video_streams().next().unwrap();
    assert_eq!(v.codec, "Apple ProRes 422 (Proxy)");
    assert_eq!((v.width, v.height), (720, 486));
    assert!((v.framerate - 29.97).abs() < 0.001);
    let a = video.audio_streams().next().unwrap();
    assert!((a.duration - 10.01).abs() < 1e-9);
}

#[test]
fn decode_tree_keeps_raw_records() {
    let path = write_temp("decode_tree", &sample_movie());

    let tree = decode_tree(&path).expect("decode_tree failed");

    let moov = tree.root.subtree(b"moov").unwrap();
    assert_eq!(moov.get(b"trak").len(), 2);
    assert!(!tree.root.contains(b"mdat"));

    let json = serde_json::to_value(&tree).unwrap();
    assert_eq!(json["root"]["ftyp"][0]["kind"], "file_type");
    assert_eq!(json["root"]["ftyp"][0]["major_brand"], "qt  ");
}

#[test]
fn missing_file_is_an_io_error() {
    let path = std::env::temp_dir().join("qtmeta_does_not_exist.mov");
    let err = parse_file(&path).unwrap_err();
    assert!(matches!(err, ParseError::Io(_)));
}
