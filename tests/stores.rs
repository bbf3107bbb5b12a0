use image::{DynamicImage, RgbImage};
use std::sync::Arc;

use oral_screening::adapters::storage::{result_store::FsResultStore, upload_store::FsUploadStore};
use oral_screening::application::ports::{ResultStorePort, UploadStorePort};
use oral_screening::domain::detection::{BBox, Category, RawInstance};
use oral_screening::domain::errors::DomainError;
use oral_screening::domain::normalizer::normalize;
use oral_screening::domain::result::{ResultDetails, Severity};

fn sample_result(surgeries: usize) -> oral_screening::domain::result::DetectionResult {
    let instances: Vec<_> = (0..surgeries)
        .map(|i| {
            let x = i as f32 * 10.0;
            RawInstance::new(Category::Surgery, 0.8, BBox::new(x, 0.0, x + 5.0, 5.0))
        })
        .collect();
    normalize(&instances, 0.5, ResultDetails::default())
}

#[tokio::test]
async fn saved_result_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsResultStore::new(dir.path());

    let result = sample_result(2);
    let id = store.save(&result, "scan.png").await.unwrap();

    let record = store.get(&id).await.unwrap();
    assert_eq!(record.id, id);
    assert_eq!(record.filename, "scan.png");
    assert_eq!(record.result, result);
    assert_eq!(record.result.severity, Severity::Severe);
    assert!(dir.path().join(format!("{}.json", id)).exists());
}

#[tokio::test]
async fn unknown_and_malformed_ids() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsResultStore::new(dir.path());

    let missing = store.get("0b6d8f2e-7a4c-4f55-9c1e-2d3b4a5c6d7e").await;
    assert!(matches!(missing, Err(DomainError::NotFound(_))));

    let traversal = store.get("../../etc/passwd").await;
    assert!(matches!(traversal, Err(DomainError::InvalidInput(_))));
}

#[tokio::test]
async fn history_is_newest_first_and_limited() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsResultStore::new(dir.path());

    let mut ids = Vec::new();
    for n in 0..3 {
        ids.push(store.save(&sample_result(n), "scan.png").await.unwrap());
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    std::fs::write(dir.path().join("garbage.json"), "{").unwrap();

    let all = store.history(50).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].id, ids[2]);
    assert_eq!(all[2].id, ids[0]);
    assert!(!all[2].disease_detected);

    let limited = store.history(2).await.unwrap();
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].id, ids[2]);
}

#[tokio::test]
async fn history_of_missing_directory_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsResultStore::new(dir.path().join("never-created"));
    assert!(store.history(50).await.unwrap().is_empty());
}

#[tokio::test]
async fn upload_rejections() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsUploadStore::new(dir.path(), 16);

    let empty = store.save_upload("", vec![1, 2, 3]).await;
    assert!(matches!(empty, Err(DomainError::InvalidInput(m)) if m == "未选择文件"));

    let bad_ext = store.save_upload("notes.txt", vec![1, 2, 3]).await;
    assert!(matches!(bad_ext, Err(DomainError::InvalidInput(m)) if m == "不支持的文件格式"));

    let too_big = store.save_upload("scan.png", vec![0; 17]).await;
    assert!(matches!(too_big, Err(DomainError::InvalidInput(m)) if m.starts_with("文件大小超过限制")));
}

#[tokio::test]
async fn upload_is_stored_under_a_fresh_name() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsUploadStore::new(dir.path(), 1024);

    let info = store.save_upload("Scan.PNG", vec![7; 10]).await.unwrap();
    assert!(info.filename.ends_with(".png"));
    assert_eq!(info.preview_url, format!("/uploads/{}", info.filename));
    assert_eq!(std::fs::read(dir.path().join(&info.filename)).unwrap(), vec![7; 10]);
}

#[tokio::test]
async fn decoded_images_can_be_loaded_back() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsUploadStore::new(dir.path(), 1024);

    let image = Arc::new(DynamicImage::ImageRgb8(RgbImage::new(32, 24)));
    let filename = store.save_image(image).await.unwrap();
    assert!(filename.starts_with("temp_"));

    let loaded = store.load(&filename).await.unwrap();
    assert_eq!((loaded.width(), loaded.height()), (32, 24));

    let missing = store.load("nope.jpg").await;
    assert!(matches!(missing, Err(DomainError::NotFound(_))));
}

#[tokio::test]
async fn non_finite_scores_still_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsResultStore::new(dir.path());

    let instances = vec![
        RawInstance::new(Category::Surgery, 0.9, BBox::new(0.0, 0.0, 4.0, 4.0)),
        RawInstance::new(Category::Surgery, f32::NAN, BBox::new(0.0, 0.0, f32::NAN, 4.0)),
    ];
    let result = normalize(&instances, 0.5, ResultDetails::default());
    assert!(result.confidence.is_finite());

    let id = store.save(&result, "scan.png").await.unwrap();
    let record = store.get(&id).await.unwrap();
    assert_eq!(record.result, result);
    assert_eq!(store.history(50).await.unwrap().len(), 1);
}
