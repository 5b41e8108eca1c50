mod common;

use std::collections::HashSet;
use std::time::Duration;

use assert_matches::assert_matches;
use lumen_client::collection::{GalleryEntry, PendingStatus};
use lumen_client::error::UploadError;

use common::*;

// ---------------------------------------------------------------------------
// Test: each selected file gets exactly one pending entry
// ---------------------------------------------------------------------------

#[tokio::test]
async fn each_selected_file_gets_one_pending_entry() {
    let backend = FakeBackend::gated();
    let session = session_with(&backend);
    let uploader = session.uploader(GALLERY);

    let handles = uploader
        .select_files(vec![
            png("one.png", 10, 10),
            png("two.png", 10, 10),
            png("three.png", 10, 10),
        ])
        .await;

    let pending = uploader.collection().pending_entries();
    assert_eq!(pending.len(), 3);
    let ids: HashSet<_> = pending.iter().map(|p| p.client_id).collect();
    assert_eq!(ids.len(), 3, "client ids must be unique");
    let handle_ids: HashSet<_> = handles.iter().map(|h| h.client_id).collect();
    assert_eq!(ids, handle_ids);
    assert!(pending.iter().all(|p| p.status == PendingStatus::Uploading));

    backend.open_gate();
    for handle in handles {
        handle.task.await.unwrap().unwrap();
    }

    assert!(uploader.collection().pending_entries().is_empty());
    assert_eq!(uploader.collection().durable().len(), 3);
    assert_eq!(backend.negotiations(), 3);
}

// ---------------------------------------------------------------------------
// Test: A.jpg and B.png scenario
// ---------------------------------------------------------------------------

#[tokio::test]
async fn landscape_jpeg_and_square_png_flow_end_to_end() {
    let backend = FakeBackend::gated();
    let session = session_with(&backend);
    let uploader = session.uploader(GALLERY);

    let handles = uploader
        .select_files(vec![jpeg("A.jpg", 2000, 1000), png("B.png", 800, 800)])
        .await;

    // Before any network call resolves.
    let snapshot = uploader.collection().snapshot();
    assert_eq!(snapshot.len(), 2);
    let names: Vec<&str> = snapshot
        .iter()
        .map(|entry| match entry {
            GalleryEntry::Pending(p) => p.file_name.as_str(),
            GalleryEntry::Durable(_) => panic!("nothing is durable yet"),
        })
        .collect();
    assert_eq!(names, vec!["A.jpg", "B.png"]);
    assert_eq!(snapshot[0].aspect_ratio(), 2.0);
    assert_eq!(snapshot[1].aspect_ratio(), 1.0);
    assert_eq!(session.previews().len(), 2);

    backend.open_gate();
    for handle in handles {
        handle.task.await.unwrap().unwrap();
    }

    // A final read settles whichever chain reconciled first.
    session.refresh(uploader.collection()).await.unwrap();

    let snapshot = uploader.collection().snapshot();
    assert_eq!(snapshot.len(), 2);
    assert!(snapshot
        .iter()
        .all(|entry| matches!(entry, GalleryEntry::Durable(_))));
    let durable = uploader.collection().durable();
    let mut by_name: Vec<(&str, i32, Option<i32>, Option<i32>)> = durable
        .iter()
        .map(|i| (i.original_filename.as_str(), i.position, i.width, i.height))
        .collect();
    by_name.sort_by_key(|(_, position, _, _)| *position);
    assert_eq!(by_name.len(), 2);
    assert!(by_name
        .iter()
        .any(|(name, _, w, h)| *name == "A.jpg" && *w == Some(2000) && *h == Some(1000)));
    assert!(by_name
        .iter()
        .any(|(name, _, w, h)| *name == "B.png" && *w == Some(800) && *h == Some(800)));

    assert!(
        wait_for(|| session.previews().is_empty()).await,
        "superseded previews are released"
    );
}

// ---------------------------------------------------------------------------
// Test: failures stay on their own entry
// ---------------------------------------------------------------------------

#[tokio::test]
async fn one_failing_chain_does_not_affect_siblings() {
    let backend = FakeBackend::new();
    backend.reject_negotiation("rejected.png");
    backend.fail_transfer_once("flaky.png");
    let session = session_with(&backend);
    let uploader = session.uploader(GALLERY);

    let handles = uploader
        .select_files(vec![
            png("rejected.png", 10, 10),
            png("fine.png", 10, 10),
            png("flaky.png", 10, 10),
        ])
        .await;

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.task.await.unwrap());
    }
    assert_matches!(results[0], Err(UploadError::Negotiation(_)));
    assert_matches!(results[1], Ok(()));
    assert_matches!(results[2], Err(UploadError::Transfer(_)));

    let pending = uploader.collection().pending_entries();
    let names: Vec<&str> = pending.iter().map(|p| p.file_name.as_str()).collect();
    assert_eq!(names, vec!["rejected.png", "flaky.png"]);
    assert!(pending.iter().all(|p| p.is_error()));

    let durable = uploader.collection().durable();
    assert_eq!(durable.len(), 1);
    assert_eq!(durable[0].original_filename, "fine.png");
}

// ---------------------------------------------------------------------------
// Test: progress reaches 100 only on success
// ---------------------------------------------------------------------------

#[tokio::test]
async fn progress_reaches_100_only_when_the_transfer_succeeds() {
    let backend = FakeBackend::new();
    backend.hide_stored(true);
    backend.fail_transfer_once("bad.png");
    let session = session_with(&backend);
    let uploader = session.uploader(GALLERY);

    let handles = uploader
        .select_files(vec![png("good.png", 64, 64), png("bad.png", 64, 64)])
        .await;
    for handle in handles {
        let _ = handle.task.await.unwrap();
    }

    let pending = uploader.collection().pending_entries();
    assert_eq!(pending[0].file_name, "good.png");
    assert_eq!(pending[0].progress, 100);
    assert_eq!(pending[0].status, PendingStatus::Finalizing);

    assert_eq!(pending[1].file_name, "bad.png");
    assert!(pending[1].progress < 100);
    assert_matches!(pending[1].status, PendingStatus::Error(_));
}

// ---------------------------------------------------------------------------
// Test: reconciliation is read-driven and never shows duplicates
// ---------------------------------------------------------------------------

#[tokio::test]
async fn entry_stays_finalizing_until_a_read_surfaces_it() {
    let backend = FakeBackend::new();
    backend.hide_stored(true);
    let session = session_with(&backend);
    let uploader = session.uploader(GALLERY);

    let handles = uploader.select_files(vec![png("slow.png", 20, 10)]).await;
    let client_id = handles[0].client_id;
    for handle in handles {
        handle.task.await.unwrap().unwrap();
    }

    let pending = uploader.collection().pending(client_id).unwrap();
    assert_eq!(pending.status, PendingStatus::Finalizing);
    let image_id = pending.image_id.expect("negotiation assigned an id");
    assert!(uploader.collection().durable_image(image_id).is_none());

    backend.hide_stored(false);
    let replaced = session.refresh(uploader.collection()).await.unwrap();
    assert_eq!(replaced, 1);

    let ids: Vec<_> = uploader
        .collection()
        .snapshot()
        .iter()
        .filter_map(GalleryEntry::image_id)
        .collect();
    assert_eq!(ids, vec![image_id], "durable replaces pending, no duplicate");
    assert!(uploader.collection().pending(client_id).is_none());
}

#[tokio::test]
async fn overtaken_read_cannot_remove_a_reconciled_upload() {
    let backend = FakeBackend::new();
    let seeded = backend.seed_image("old.jpg");
    backend.hide_stored(true);
    let session = session_with(&backend);
    let collection = session.open_gallery(GALLERY).await.unwrap();
    let uploader = session.uploader(GALLERY);

    let handles = uploader.select_files(vec![png("new.png", 10, 10)]).await;
    let client_id = handles[0].client_id;
    for handle in handles {
        handle.task.await.unwrap().unwrap();
    }
    let image_id = collection.pending(client_id).unwrap().image_id.unwrap();

    // The first read snapshots the gallery before the upload is visible and
    // answers last; the second sees the upload and answers first.
    backend.stall_next_read(Duration::from_millis(100));
    let older = session.refresh(&collection);
    let newer = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        backend.hide_stored(false);
        session.refresh(&collection).await
    };
    let (older, newer) = tokio::join!(older, newer);

    assert_eq!(newer.unwrap(), 1);
    assert_eq!(older.unwrap(), 0, "the older answer is dropped");
    assert_eq!(collection.durable_order(), vec![seeded, image_id]);
    assert!(collection.pending(client_id).is_none());
}

// ---------------------------------------------------------------------------
// Test: retry and dismiss
// ---------------------------------------------------------------------------

#[tokio::test]
async fn retry_runs_a_fresh_chain_for_an_errored_entry() {
    let backend = FakeBackend::new();
    backend.fail_transfer_once("retry.png");
    let session = session_with(&backend);
    let uploader = session.uploader(GALLERY);

    let handles = uploader.select_files(vec![png("retry.png", 10, 10)]).await;
    let client_id = handles[0].client_id;
    for handle in handles {
        assert!(handle.task.await.unwrap().is_err());
    }
    assert!(uploader.collection().pending(client_id).unwrap().is_error());

    let retried = uploader.retry(client_id).unwrap();
    retried.task.await.unwrap().unwrap();

    assert!(uploader.collection().pending(client_id).is_none());
    assert_eq!(uploader.collection().durable().len(), 1);
    assert_eq!(backend.negotiations(), 2, "retry negotiates again");

    assert_matches!(uploader.retry(client_id), Err(UploadError::NotRetryable(id)) if id == client_id);
}

#[tokio::test]
async fn retry_is_refused_while_uploading() {
    let backend = FakeBackend::gated();
    let session = session_with(&backend);
    let uploader = session.uploader(GALLERY);

    let handles = uploader.select_files(vec![png("busy.png", 10, 10)]).await;
    let client_id = handles[0].client_id;

    assert_matches!(uploader.retry(client_id), Err(UploadError::NotRetryable(_)));

    backend.open_gate();
    for handle in handles {
        handle.task.await.unwrap().unwrap();
    }
}

#[tokio::test]
async fn dismissing_an_in_flight_upload_ignores_its_later_updates() {
    let backend = FakeBackend::gated();
    let session = session_with(&backend);
    let uploader = session.uploader(GALLERY);

    let handles = uploader.select_files(vec![png("gone.png", 10, 10)]).await;
    let client_id = handles[0].client_id;

    assert!(uploader.dismiss(client_id));
    assert!(session.previews().is_empty(), "dismiss releases the preview");
    assert!(!uploader.dismiss(client_id));

    backend.open_gate();
    for handle in handles {
        // The transfer still runs to completion.
        handle.task.await.unwrap().unwrap();
    }
    assert!(uploader.collection().pending_entries().is_empty());

    // The stored object still becomes part of the gallery on the next read.
    session.refresh(uploader.collection()).await.unwrap();
    assert_eq!(uploader.collection().durable().len(), 1);
    assert!(uploader.collection().pending_entries().is_empty());
}

// ---------------------------------------------------------------------------
// Test: undecodable files still upload
// ---------------------------------------------------------------------------

#[tokio::test]
async fn undecodable_file_uploads_with_placeholder_dimensions() {
    let backend = FakeBackend::gated();
    let session = session_with(&backend);
    let uploader = session.uploader(GALLERY);

    let corrupt = lumen_client::preview::SelectedFile::new(
        "corrupt.jpg",
        "image/jpeg",
        bytes::Bytes::from_static(b"not really a jpeg"),
    );
    let handles = uploader.select_files(vec![corrupt]).await;

    let pending = uploader.collection().pending_entries();
    assert_eq!(
        pending[0].dimensions,
        lumen_core::dimensions::Dimensions::PLACEHOLDER
    );

    backend.open_gate();
    for handle in handles {
        handle.task.await.unwrap().unwrap();
    }
    let durable = uploader.collection().durable();
    assert_eq!(durable.len(), 1);
    assert_eq!(durable[0].width, None, "no dimensions were claimed");
}
