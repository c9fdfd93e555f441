use super::*;
use crate::foundation::core::Canvas;

fn red(w: u32, h: u32) -> Raster {
    Raster::filled(Canvas::new(w, h).unwrap(), [255, 0, 0, 255])
}

#[test]
fn rel_paths_are_normalized_and_confined() {
    assert_eq!(normalize_rel_path("a/./b\\c.png").unwrap(), "a/b/c.png");
    assert!(normalize_rel_path("/etc/passwd").is_err());
    assert!(normalize_rel_path("../x.png").is_err());
    assert!(normalize_rel_path("./").is_err());
}

#[test]
fn data_uri_decodes_to_original_pixels() {
    let uri = red(2, 2).to_data_uri().unwrap();
    let bytes = decode_data_uri(&uri).unwrap();
    assert_eq!(Raster::decode(&bytes).unwrap(), red(2, 2));
    assert!(decode_data_uri("data:text/plain,hello").is_err());
    assert!(decode_data_uri("nope").is_err());
}

#[test]
fn memory_resolver_serves_inserted_media() {
    let cache = MemoryAssetResolver::new();
    assert!(cache.is_empty());
    cache.insert("https://cdn.test/a.png", red(3, 1));
    assert!(cache.contains("https://cdn.test/a.png"));
    assert_eq!(cache.load("https://cdn.test/a.png").unwrap().width, 3);
    assert!(cache.load("https://cdn.test/missing.png").is_err());
}

#[test]
fn memory_resolver_decodes_data_uris_without_caching() {
    let cache = MemoryAssetResolver::new();
    let uri = red(1, 1).to_data_uri().unwrap();
    assert_eq!(*cache.load(&uri).unwrap(), red(1, 1));
    assert_eq!(cache.len(), 0);
}

#[test]
fn fs_resolver_reads_relative_files_and_rejects_remote() {
    let root = std::env::temp_dir().join(format!("scenereel-assets-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(root.join("img")).unwrap();
    std::fs::write(root.join("img/dot.png"), red(2, 3).encode_png().unwrap()).unwrap();

    let fs = FsAssetResolver::new(&root);
    assert_eq!(fs.load("img/dot.png").unwrap().height, 3);
    assert!(fs.load("https://cdn.test/a.png").is_err());
    assert!(fs.load("../img/dot.png").is_err());

    let layered = MemoryAssetResolver::with_fallback(fs);
    assert_eq!(layered.load("img/dot.png").unwrap().width, 2);

    std::fs::remove_dir_all(&root).unwrap();
}
