use embedfs::embedder::{ArtifactPaths, EmbedOptions, Embedder};
use embedfs::error::{last_error, ErrorKind};
use embedfs::manifest::Manifest;
use embedfs::stream::Origin;
use embedfs::{embedded_fs, EmbeddedFs, Index};
use std::fs;
use std::io::Read;
use tempfile::TempDir;

#[test]
fn test_two_file_scenario() {
    let mut embedder = Embedder::new();
    embedder.add_file("greeting.txt", b"hi\n").unwrap();
    embedder.add_file("data/x.bin", &[0x01, 0x02, 0x03]).unwrap();
    let built = embedder.finish();
    let index = built.index.to_bytes();
    let fs = EmbeddedFs::new(&index, &built.blob).unwrap();

    let mut greeting = fs.open("greeting.txt").unwrap();
    let mut buf = [0u8; 3];
    assert_eq!(greeting.read_elements(&mut buf, 1, 3).unwrap(), 3);
    assert_eq!(&buf, b"hi\n");
    assert!(greeting.at_end().unwrap());

    let mut bin = fs.open("data/x.bin").unwrap();
    let mut buf = [0u8; 4];
    assert_eq!(bin.read_elements(&mut buf, 1, 4).unwrap(), 3);
    assert_eq!(&buf[..3], &[0x01, 0x02, 0x03]);
    assert!(bin.at_end().unwrap());
}

#[test]
fn test_pack_directory_to_disk_and_read_back() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    fs::create_dir_all(src.path().join("data")).unwrap();
    fs::write(src.path().join("greeting.txt"), b"hi\n").unwrap();
    fs::write(src.path().join("data/x.bin"), [1u8, 2, 3]).unwrap();

    let opts = EmbedOptions { strip_prefix: Some(src.path().to_path_buf()), ..Default::default() };
    let mut embedder = Embedder::with_options(opts);
    assert_eq!(embedder.add_input(src.path()).unwrap(), 2);
    let built = embedder.finish();

    let paths = ArtifactPaths::from_stem(out.path().join("nested/assets"));
    built.write_to(&paths, true).unwrap();

    let index = fs::read(&paths.index).unwrap();
    let blob = fs::read(&paths.blob).unwrap();
    let manifest = Manifest::from_bytes(&fs::read(&paths.manifest).unwrap()).unwrap();
    assert_eq!(index.len(), 24);
    assert_eq!(Index::from_bytes(&index).unwrap(), built.index);

    let efs = EmbeddedFs::new(&index, &blob).unwrap();
    assert!(manifest.verify(&efs).is_empty());
    assert_eq!(efs.read("greeting.txt").unwrap(), b"hi\n");
    assert_eq!(efs.read("data/x.bin").unwrap(), &[1, 2, 3]);

    let mut s = String::new();
    efs.open("greeting.txt").unwrap().read_to_string(&mut s).unwrap();
    assert_eq!(s, "hi\n");
}

#[test]
fn test_manifest_is_optional() {
    let out = TempDir::new().unwrap();
    let mut embedder = Embedder::new();
    embedder.add_file("a", b"a").unwrap();
    let paths = ArtifactPaths::from_stem(out.path().join("plain"));
    embedder.finish().write_to(&paths, false).unwrap();
    assert!(paths.index.exists());
    assert!(paths.blob.exists());
    assert!(!paths.manifest.exists());
}

#[test]
fn test_lookup_miss_sets_thread_error() {
    let mut embedder = Embedder::new();
    embedder.add_file("present.txt", b"x").unwrap();
    let built = embedder.finish();
    let index = built.index.to_bytes();
    let fs = EmbeddedFs::new(&index, &built.blob).unwrap();

    let err = fs.open("absent.txt").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(last_error(), ErrorKind::NotFound);
}

#[test]
fn test_seek_tell_on_embedded_file() {
    let mut embedder = Embedder::new();
    embedder.add_file("pad", b"----").unwrap();
    embedder.add_file("digits", b"0123456789").unwrap();
    let built = embedder.finish();
    let index = built.index.to_bytes();
    let fs = EmbeddedFs::new(&index, &built.blob).unwrap();
    let mut f = fs.open("digits").unwrap();
    let size = f.size() as i64;

    f.seek(0, Origin::Set).unwrap();
    assert_eq!(f.tell(), 0);
    f.seek(size, Origin::Set).unwrap();
    assert!(f.at_end().unwrap());

    let err = f.seek(size + 1, Origin::Set).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CursorOutOfRange);
    assert_eq!(f.tell(), size + 1);

    // A neighbouring file's bytes are never reachable.
    f.rewind();
    let mut buf = [0u8; 32];
    assert_eq!(f.read_elements(&mut buf, 1, 32).unwrap(), 10);
    assert_eq!(&buf[..10], b"0123456789");
}

#[test]
fn test_corrupt_artifacts_are_rejected() {
    let mut embedder = Embedder::new();
    embedder.add_file("a", b"abcdef").unwrap();
    let built = embedder.finish();
    let index = built.index.to_bytes();

    let err = EmbeddedFs::new(&index[..11], &built.blob).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IndexCorrupt);
    let err = EmbeddedFs::new(&index, &built.blob[..5]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IndexCorrupt);
}

#[test]
fn test_embedded_fs_macro() {
    let fs = embedded_fs!("fixtures/hello.idx", "fixtures/hello.blob").unwrap();
    assert_eq!(fs.len(), 2);
    assert_eq!(fs.read("greeting.txt").unwrap(), b"hi\n");
    assert_eq!(fs.read("data/x.bin").unwrap(), &[1, 2, 3]);
}
