//! A real seeder and a real downloader, talking over loopback TCP, no
//! discovery broadcast involved.

use fileshare_catalog::{Catalog, Status};
use fileshare_core::{NodeConfig, NullProgress};
use fileshare_integration_tests::SeederNode;
use tokio_util::sync::CancellationToken;

async fn write_file(dir: &tempfile::TempDir, name: &str, contents: &[u8]) -> String {
    let path = dir.path().join(name);
    tokio::fs::write(&path, contents).await.unwrap();
    path.to_string_lossy().into_owned()
}

#[tokio::test]
async fn downloads_a_multi_fragment_file_from_a_real_seeder() {
    let seed_dir = tempfile::tempdir().unwrap();
    let data: Vec<u8> = (0..3 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
    let source_path = write_file(&seed_dir, "asset.bin", &data).await;

    let seeder_catalog = Catalog::open_in_memory().await.unwrap();
    seeder_catalog.publish(&source_path, "seeder").await.unwrap();

    let seeder = SeederNode::start_with_catalog(seeder_catalog, false).await;

    let dl_dir = tempfile::tempdir().unwrap();
    let downloader_catalog = Catalog::open_in_memory().await.unwrap();

    // Downloading by fingerprint, passing only the destination *directory*
    // the way `fileshare-cli`'s `download` command does: the written file
    // must end up named after the resolved metadata's `name` ("asset.bin"),
    // never after the fingerprint search key itself.
    let fingerprint = fileshare_files::fingerprint_bytes(&data);
    fileshare_core::download(
        &downloader_catalog,
        seeder.resolver(),
        &NodeConfig::default(),
        &fingerprint,
        dl_dir.path().to_str().unwrap(),
        &NullProgress,
        CancellationToken::new(),
    )
    .await
    .unwrap();

    let dest = dl_dir.path().join("asset.bin");
    let on_disk = tokio::fs::read(&dest).await.unwrap();
    assert_eq!(on_disk, data);
    assert!(
        !dl_dir.path().join(&fingerprint).exists(),
        "download must not name the file after the fingerprint search key"
    );

    let found = downloader_catalog
        .find_by_fingerprint(&fingerprint)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.status, Status::Seeding);
    assert_eq!(found.held_fragments.len(), found.fragment_count as usize);
    assert_eq!(found.file_path, dest.to_string_lossy());

    seeder.shutdown().await;
}

#[tokio::test]
async fn downloads_by_display_name_when_fingerprint_is_unknown_locally() {
    let seed_dir = tempfile::tempdir().unwrap();
    let data = b"a small published file".to_vec();
    let source_path = write_file(&seed_dir, "notes.txt", &data).await;

    let seeder_catalog = Catalog::open_in_memory().await.unwrap();
    seeder_catalog.publish(&source_path, "seeder").await.unwrap();
    let seeder = SeederNode::start_with_catalog(seeder_catalog, false).await;

    let dl_dir = tempfile::tempdir().unwrap();
    let downloader_catalog = Catalog::open_in_memory().await.unwrap();

    fileshare_core::download(
        &downloader_catalog,
        seeder.resolver(),
        &NodeConfig::default(),
        "notes.txt",
        dl_dir.path().to_str().unwrap(),
        &NullProgress,
        CancellationToken::new(),
    )
    .await
    .unwrap();

    let dest = dl_dir.path().join("notes.txt");
    assert_eq!(tokio::fs::read(&dest).await.unwrap(), data);

    seeder.shutdown().await;
}
