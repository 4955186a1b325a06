use std::time::Duration;

use common::NewPaste;
use common::storage::PasteStore;
use session::{SessionError, SyncUpdate};

use crate::support::TestRoom;

mod opening {
    use super::*;

    #[tokio::test]
    async fn empty_room_opens_without_auto_copy() {
        let room = TestRoom::new();
        let (session, clipboard) = room.open().await;

        assert!(session.pastes().is_empty());
        assert_eq!(clipboard.writes(), 0);
        assert_eq!(clipboard.contents(), None);
    }

    #[tokio::test]
    async fn newest_text_is_copied_exactly_once() {
        let room = TestRoom::new();
        room.seed_text("hello").await;

        let (mut session, clipboard) = room.open().await;
        assert_eq!(session.pastes().len(), 1);
        assert_eq!(clipboard.contents().as_deref(), Some("hello"));
        assert_eq!(clipboard.writes(), 1);

        session.reload().await.unwrap();
        session.reload().await.unwrap();
        assert_eq!(clipboard.writes(), 1);
    }

    #[tokio::test]
    async fn auto_copy_picks_newest_text_over_newer_image() {
        let room = TestRoom::new();
        room.seed_text("older text").await;
        room.store
            .inner
            .insert(NewPaste::image(
                room.room.clone(),
                "http://localhost:8000/storage/v1/object/public/images/4242/a.png",
            ))
            .await
            .unwrap();

        let (session, clipboard) = room.open().await;
        assert!(session.pastes()[0].is_image());
        assert_eq!(clipboard.contents().as_deref(), Some("older text"));
    }

    #[tokio::test]
    async fn failed_initial_fetch_is_a_load_error() {
        let room = TestRoom::new();
        room.store.fail_list.set(true);

        let (engine, clipboard) = room.device();
        let err = engine.open(room.room.clone()).await.unwrap_err();
        assert!(matches!(err, SessionError::Load { .. }));
        assert_eq!(err.user_message(), "Failed to load pastes");
        assert_eq!(clipboard.writes(), 0);
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let room = TestRoom::new();
        let first = room.seed_text("one").await;
        let second = room.seed_text("two").await;
        let third = room.seed_text("three").await;

        let (session, _) = room.open().await;
        assert_eq!(
            crate::support::ids(session.pastes()),
            vec![third.id, second.id, first.id]
        );
    }
}

mod reloading {
    use super::*;

    #[tokio::test]
    async fn failed_reload_leaves_list_untouched() {
        let room = TestRoom::new();
        room.seed_text("kept").await;
        let (mut session, _) = room.open().await;

        room.store.fail_list.set(true);
        let err = session.reload().await.unwrap_err();
        assert!(matches!(err, SessionError::Load { .. }));
        assert_eq!(session.pastes().len(), 1);

        room.store.fail_list.set(false);
        assert_eq!(session.reload().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn view_tracks_every_change() {
        let room = TestRoom::new();
        let (mut session, _) = room.open().await;
        let mut view = session.view();

        session.add_text("watched").await.unwrap();
        view.changed().await.unwrap();
        assert_eq!(view.borrow_and_update()[0].content, "watched");

        session.clear_all().await.unwrap();
        view.changed().await.unwrap();
        assert!(view.borrow().is_empty());
    }
}

mod closing {
    use super::*;

    #[tokio::test]
    async fn close_is_idempotent_and_ends_the_feed() {
        let room = TestRoom::new();
        let (mut session, _) = room.open().await;

        session.close();
        session.close();
        assert!(session.is_closed());
        assert!(session.next_change().await.is_none());
        assert!(matches!(
            session.add_text("late").await,
            Err(SessionError::Closed)
        ));
        assert_eq!(room.store.insert_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn dropping_a_session_unsubscribes() {
        let room = TestRoom::new();
        let (session, _) = room.open().await;
        assert_eq!(room.store.inner.hub().subscriber_count(&room.room), 1);

        drop(session);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(room.store.inner.hub().subscriber_count(&room.room), 0);
    }

    #[tokio::test]
    async fn events_after_close_are_not_applied() {
        let room = TestRoom::new();
        let (mut session, _) = room.open().await;
        session.close();

        room.seed_text("missed").await;
        assert!(session.next_change().await.is_none());
        assert!(session.pastes().is_empty());
    }

    #[tokio::test]
    async fn own_insert_echo_is_deduplicated() {
        let room = TestRoom::new();
        let (mut session, _) = room.open().await;

        let created = session.add_text("mine").await.unwrap();
        let update = tokio::time::timeout(Duration::from_secs(2), session.next_change())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(update, SyncUpdate::Duplicate(created.id));
        assert_eq!(session.pastes().len(), 1);
    }
}
