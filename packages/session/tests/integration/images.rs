use std::sync::atomic::Ordering;

use common::storage::ImageBucket;

use session::{
    AddPhase, DisplayError, ImageError, ImageFile, SessionError, ValidationError, Validity,
};

use crate::support::{BASE_URL, TestRoom, png};

const MIB: usize = 1024 * 1024;

mod validation {
    use super::*;

    #[tokio::test]
    async fn six_mib_is_rejected_before_any_upload() {
        let room = TestRoom::new();
        let (mut session, _) = room.open().await;
        let big = png("huge.png", 6 * MIB);

        let (engine, _) = room.device();
        match engine.images().validate(&big) {
            Validity::Invalid(err) => {
                assert_eq!(err.reason(), "too large");
                assert_eq!(err.to_string(), "Image must be smaller than 5MB");
            }
            Validity::Valid => panic!("6 MiB image passed validation"),
        }

        let err = session.add_image(&big).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Validation(ValidationError::TooLarge { .. })
        ));
        assert_eq!(room.bucket.put_calls.load(Ordering::SeqCst), 0);
        assert_eq!(room.store.insert_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exactly_five_mib_is_accepted() {
        let room = TestRoom::new();
        let (engine, _) = room.device();
        assert!(engine.images().validate(&png("edge.png", 5 * MIB)).is_valid());
    }

    #[tokio::test]
    async fn non_images_are_rejected_with_reason() {
        let room = TestRoom::new();
        let (mut session, _) = room.open().await;
        let pdf = ImageFile::new("doc.pdf", "application/pdf", vec![1, 2, 3]);

        let err = session.add_image(&pdf).await.unwrap_err();
        assert_eq!(err.user_message(), "File must be an image");
        assert_eq!(room.bucket.put_calls.load(Ordering::SeqCst), 0);
    }
}

mod storage {
    use super::*;

    #[tokio::test]
    async fn upload_then_delete_by_url_hits_the_same_path() {
        let room = TestRoom::new();
        let (engine, _) = room.device();
        let images = engine.images();

        let url = images.upload(&png("shot.PNG", 32), &room.room).await.unwrap();
        assert!(url.starts_with(&format!("{BASE_URL}/storage/v1/object/public/images/4242/")));
        assert!(url.ends_with(".png"));

        let path = images.object_path(&url).unwrap();
        assert!(room.bucket.inner.contains(&path));
        assert_eq!(room.bucket.inner.content_type(&path).as_deref(), Some("image/png"));

        images.delete_by_url(&url).await.unwrap();
        assert!(!room.bucket.inner.contains(&path));
    }

    #[tokio::test]
    async fn foreign_urls_are_invalid_references() {
        let room = TestRoom::new();
        let (engine, _) = room.device();

        let err = engine
            .images()
            .delete_by_url("https://example.com/cat.png")
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::InvalidReference(_)));
    }

    #[tokio::test]
    async fn delete_all_for_room_without_images_is_a_no_op() {
        let room = TestRoom::new();
        let (engine, _) = room.device();
        assert_eq!(engine.images().delete_all_for_room(&room.room).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn upload_failure_is_an_add_error_in_upload_phase() {
        let room = TestRoom::new();
        let (mut session, _) = room.open().await;
        room.bucket.fail_put.set(true);

        let err = session.add_image(&png("a.png", 8)).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Add {
                phase: AddPhase::Upload,
                ..
            }
        ));
        assert_eq!(err.user_message(), "Failed to upload image");
        assert_eq!(room.store.insert_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn store_failure_after_upload_removes_the_blob() {
        let room = TestRoom::new();
        let (mut session, _) = room.open().await;
        room.store.fail_insert.set(true);

        let err = session.add_image(&png("a.png", 8)).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Add {
                phase: AddPhase::Store,
                ..
            }
        ));
        assert_eq!(room.bucket.put_calls.load(Ordering::SeqCst), 1);
        assert!(room.bucket.inner.is_empty());
    }
}

mod display {
    use super::*;

    #[tokio::test]
    async fn image_pastes_resolve_to_their_bytes() {
        let room = TestRoom::new();
        let (mut session, _) = room.open().await;
        let file = ImageFile::new("dot.gif", "image/gif", b"GIF89a".to_vec());

        let paste = session.add_image(&file).await.unwrap();
        assert!(paste.is_image());
        assert_eq!(session.resolve_image(&paste.content).await.unwrap(), b"GIF89a");
    }

    #[tokio::test]
    async fn missing_blob_is_a_display_error() {
        let room = TestRoom::new();
        let (mut session, _) = room.open().await;
        let paste = session.add_image(&png("a.png", 8)).await.unwrap();

        let path = room.bucket.object_path(&paste.content).unwrap();
        room.bucket.inner.remove(&[path]).await.unwrap();
        let err = session.resolve_image(&paste.content).await.unwrap_err();
        assert!(matches!(err, DisplayError::Unavailable { .. }));

        let err = session.resolve_image("not a url").await.unwrap_err();
        assert!(matches!(err, DisplayError::InvalidReference { .. }));
    }
}
