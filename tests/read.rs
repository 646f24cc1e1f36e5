use std::io::Write;
use std::path::Path;

use n5_reader::{
    DataType, N5Compression, N5Reader, PathKind, StoreBackend, Version, storage::N5Backend,
};
use serde_json::{Value, json};
use tempfile::TempDir;
use zarrs::filesystem::FilesystemStore;

type Reader = N5Reader<StoreBackend<FilesystemStore>>;

fn write_file(root: &Path, rel: &str, bytes: &[u8]) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, bytes).unwrap();
}

fn write_attributes(root: &Path, node: &str, value: &Value) {
    let rel = if node.is_empty() {
        "attributes.json".to_string()
    } else {
        format!("{node}/attributes.json")
    };
    write_file(root, &rel, value.to_string().as_bytes());
}

fn encode_block(size: &[i32], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0u16.to_be_bytes());
    out.extend_from_slice(&(size.len() as u16).to_be_bytes());
    for n in size {
        out.extend_from_slice(&n.to_be_bytes());
    }
    out.extend_from_slice(payload);
    out
}

fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
}

/// Value stored at a position of the `gzip` fixture.
fn gzip_value(x: usize, y: usize) -> f32 {
    (y * 5 + x) as f32 * 0.5
}

/// Write a container with:
/// - `volume`: uint8, 64^3 in 32^3 raw blocks, every block filled with its linear grid index
/// - `group/gzip`: float32, [5, 3] in [4, 2] gzip blocks, with partial edge blocks
/// - `group/empty`: a group without attributes
fn fixture() -> TempDir {
    env_logger::try_init().ok();
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path();

    write_attributes(root, "", &json!({"n5": "2.0.2"}));
    write_attributes(
        root,
        "volume",
        &json!({
            "dimensions": [64, 64, 64],
            "blockSize": [32, 32, 32],
            "dataType": "uint8",
            "compression": {"type": "raw"},
            "resolution": [4, 4, 40],
        }),
    );
    for z in 0..2 {
        for y in 0..2 {
            for x in 0..2 {
                let value = (x + 2 * y + 4 * z) as u8;
                let payload = vec![value; 32 * 32 * 32];
                write_file(
                    root,
                    &format!("volume/{x}/{y}/{z}"),
                    &encode_block(&[32, 32, 32], &payload),
                );
            }
        }
    }

    write_attributes(root, "group", &json!({"owner": "test"}));
    write_attributes(
        root,
        "group/gzip",
        &json!({
            "dimensions": [5, 3],
            "blockSize": [4, 2],
            "dataType": "float32",
            "compression": {"type": "gzip", "level": 6},
        }),
    );
    for gy in 0..2usize {
        for gx in 0..2usize {
            let (x0, y0) = (gx * 4, gy * 2);
            let w = 4.min(5 - x0);
            let h = 2.min(3 - y0);
            // N5 stores the first axis fastest.
            let mut payload = Vec::new();
            for y in y0..y0 + h {
                for x in x0..x0 + w {
                    payload.extend_from_slice(&gzip_value(x, y).to_be_bytes());
                }
            }
            let mut block = encode_block(&[w as i32, h as i32], &[]);
            block.extend(gzip(&payload));
            write_file(root, &format!("group/gzip/{gx}/{gy}"), &block);
        }
    }
    std::fs::create_dir_all(root.join("group/empty/child")).unwrap();
    write_file(root, "group/empty/child/attributes.json", b"{}");

    dir
}

async fn open(dir: &TempDir) -> Reader {
    let store = FilesystemStore::new(dir.path()).expect("should be able to create store");
    N5Reader::open(StoreBackend::new(store))
        .await
        .expect("open container")
}

#[tokio::test]
async fn test_version() {
    let dir = fixture();
    let reader = open(&dir).await;
    assert_eq!(reader.get_version().await.unwrap(), Version::new(2, 0, 2));
}

#[tokio::test]
async fn test_node_kinds() {
    let dir = fixture();
    let reader = open(&dir).await;

    assert_eq!(reader.path_kind("volume").await.unwrap(), PathKind::Dataset);
    assert_eq!(reader.path_kind("group").await.unwrap(), PathKind::Group);
    assert_eq!(reader.path_kind("group/empty").await.unwrap(), PathKind::Group);
    assert_eq!(reader.path_kind("foobar").await.unwrap(), PathKind::Absent);

    assert!(reader.exists("group/empty").await.unwrap());
    assert!(!reader.exists("foobar").await.unwrap());
    assert!(reader.dataset_exists("volume").await.unwrap());
    assert!(reader.dataset_exists("group/gzip").await.unwrap());
    assert!(!reader.dataset_exists("group").await.unwrap());
    assert!(!reader.dataset_exists("group/empty").await.unwrap());
    assert!(!reader.dataset_exists("foobar").await.unwrap());

    let mut children = reader.list("group").await.unwrap();
    children.sort();
    assert_eq!(children, vec!["empty", "gzip"]);
}

#[tokio::test]
async fn test_attributes() {
    let dir = fixture();
    let reader = open(&dir).await;

    let attrs = reader.list_attributes("volume").await.unwrap();
    assert_eq!(attrs.get("resolution"), Some(&json!([4, 4, 40])));

    let da = reader.get_dataset_attributes("volume").await.unwrap();
    assert_eq!(da.dimensions(), &[64, 64, 64]);
    assert_eq!(da.block_size(), &[32, 32, 32]);
    assert_eq!(da.data_type(), DataType::Uint8);
    assert_eq!(da.compression(), &N5Compression::Raw);
    assert_eq!(da.grid_size(), vec![2, 2, 2]);

    assert!(reader.get_dataset_attributes("group").await.is_err());
}

#[tokio::test]
async fn test_single_block() {
    let dir = fixture();
    let reader = open(&dir).await;
    let da = reader.get_dataset_attributes("volume").await.unwrap();

    let block = reader
        .read_block("volume", &da, vec![0, 0, 0])
        .await
        .unwrap()
        .expect("block should exist");
    assert_eq!(block.size(), &[32, 32, 32]);
    assert_eq!(block.num_elements(), 32768);

    let missing = reader.read_block("volume", &da, vec![10, 10, 10]).await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_concurrent_blocks() {
    let dir = fixture();
    let reader = open(&dir).await;
    let da = reader.get_dataset_attributes("volume").await.unwrap();

    let positions: Vec<Vec<i64>> = (0..8)
        .map(|i| vec![i & 1, (i >> 1) & 1, (i >> 2) & 1])
        .collect();
    let blocks = futures::future::join_all(
        positions
            .iter()
            .map(|p| reader.read_block("volume", &da, p.clone())),
    )
    .await;

    for (position, block) in positions.iter().zip(blocks) {
        let block = block.unwrap().unwrap();
        let expected = (position[0] + 2 * position[1] + 4 * position[2]) as u8;
        assert_eq!(block.grid_position(), position.as_slice());
        assert!(block.as_slice::<u8>().unwrap().iter().all(|&v| v == expected));
    }
}

#[tokio::test]
async fn test_gzip_edge_blocks() {
    let dir = fixture();
    let reader = open(&dir).await;
    let da = reader.get_dataset_attributes("group/gzip").await.unwrap();
    assert_eq!(da.grid_size(), vec![2, 2]);

    let mut seen = 0;
    for gy in 0..2i64 {
        for gx in 0..2i64 {
            let block = reader
                .read_block("group/gzip", &da, vec![gx, gy])
                .await
                .unwrap()
                .unwrap();
            let [w, h] = [block.size()[0] as usize, block.size()[1] as usize];
            assert_eq!(w, if gx == 0 { 4 } else { 1 });
            assert_eq!(h, if gy == 0 { 2 } else { 1 });

            let data = block.as_slice::<f32>().unwrap();
            for (i, v) in data.iter().enumerate() {
                let x = gx as usize * 4 + i % w;
                let y = gy as usize * 2 + i / w;
                assert_eq!(*v, gzip_value(x, y));
            }
            seen += data.len();
        }
    }
    assert_eq!(seen, 15);
}

#[tokio::test]
async fn test_backend_paths() {
    let dir = fixture();
    let reader = open(&dir).await;
    assert_eq!(reader.block_path("/volume/", &[1, 0, 1]), "volume/1/0/1");
    assert!(
        reader
            .backend()
            .fetch_bytes("volume/1/0/1")
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn test_grid_position_arity() {
    let dir = fixture();
    let reader = open(&dir).await;
    let da = reader.get_dataset_attributes("volume").await.unwrap();

    let err = reader.read_block("volume", &da, vec![0, 0]).await.unwrap_err();
    assert!(err.is_format(), "{err}");
    assert!(err.to_string().contains("grid position has 2 axes"), "{err}");
}

#[tokio::test]
async fn test_block_etags() {
    let dir = fixture();
    let reader = open(&dir).await;
    let da = reader.get_dataset_attributes("volume").await.unwrap();

    let etag = reader.block_etag("volume", &da, &[1, 1, 0]).await.unwrap();
    let (block, fetched) = reader
        .read_block_with_etag("volume", &da, vec![1, 1, 0])
        .await
        .unwrap()
        .unwrap();
    assert!(etag.is_some());
    assert_eq!(etag, fetched);
    assert!(block.as_slice::<u8>().unwrap().iter().all(|&v| v == 3));

    // blocks with different content have different etags
    let other = reader.block_etag("volume", &da, &[0, 0, 0]).await.unwrap();
    assert_ne!(etag, other);

    let mut payload = vec![9u8; 32 * 32 * 32];
    payload[0] = 3;
    write_file(dir.path(), "volume/1/1/0", &encode_block(&[32, 32, 32], &payload));
    let rewritten = reader.block_etag("volume", &da, &[1, 1, 0]).await.unwrap();
    assert_ne!(etag, rewritten);

    assert_eq!(reader.block_etag("volume", &da, &[5, 5, 5]).await.unwrap(), None);
}
