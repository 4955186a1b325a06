use std::collections::HashSet;

use common::storage::PasteStore;
use session::SyncUpdate;

use crate::support::{TestRoom, ids, png, sync_until};

#[tokio::test]
async fn insert_from_one_client_reaches_the_other_at_the_head() {
    let room = TestRoom::new();
    let (mut a, _) = room.open().await;
    let (mut b, _) = room.open().await;
    b.add_text("b's earlier paste").await.unwrap();

    let created = a.add_text("from a").await.unwrap();
    let updates = sync_until(&mut b, |pastes| pastes.iter().any(|p| p.id == created.id)).await;

    assert!(updates.contains(&SyncUpdate::Inserted(created.id)));
    assert_eq!(b.pastes()[0].id, created.id);
    assert_eq!(b.pastes().len(), 2);
}

#[tokio::test]
async fn insert_seen_by_fetch_and_feed_is_not_duplicated() {
    let room = TestRoom::new();
    let (mut session, _) = room.open().await;

    // Lands in the feed queue and in the next fetch.
    let created = room.seed_text("raced").await;
    session.reload().await.unwrap();

    let update = tokio::time::timeout(std::time::Duration::from_secs(2), session.next_change())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(update, SyncUpdate::Duplicate(created.id));
    assert_eq!(ids(session.pastes()), vec![created.id]);
}

#[tokio::test]
async fn clear_on_one_client_empties_the_other_after_refetch() {
    let room = TestRoom::new();
    let (mut a, _) = room.open().await;
    let (mut b, _) = room.open().await;
    a.add_text("one").await.unwrap();
    a.add_image(&png("two.png", 8)).await.unwrap();
    sync_until(&mut b, |pastes| pastes.len() == 2).await;

    a.clear_all().await.unwrap();
    let updates = sync_until(&mut b, |pastes| pastes.is_empty()).await;

    assert!(updates.contains(&SyncUpdate::Refetched(0)));
    assert!(room.bucket.inner.is_empty());
}

#[tokio::test]
async fn single_delete_propagates_by_refetch() {
    let room = TestRoom::new();
    let (mut a, _) = room.open().await;
    let (mut b, _) = room.open().await;
    let keep = a.add_text("keep").await.unwrap();
    let gone = a.add_text("gone").await.unwrap();
    sync_until(&mut b, |pastes| pastes.len() == 2).await;

    a.delete_one(gone.id).await.unwrap();
    sync_until(&mut b, |pastes| pastes.len() == 1).await;
    assert_eq!(ids(b.pastes()), vec![keep.id]);
}

#[tokio::test]
async fn both_clients_converge_on_the_same_ids() {
    let room = TestRoom::new();
    let (mut a, _) = room.open().await;
    let (mut b, _) = room.open().await;

    for i in 0..3 {
        a.add_text(&format!("a{i}")).await.unwrap();
        b.add_text(&format!("b{i}")).await.unwrap();
    }
    let doomed = a.pastes()[0].id;
    a.delete_one(doomed).await.unwrap();

    let truth: Vec<_> = ids(&room.store.inner.list(&room.room).await.unwrap());
    let expected: HashSet<_> = truth.iter().copied().collect();
    sync_until(&mut a, |p| ids(p).into_iter().collect::<HashSet<_>>() == expected).await;
    sync_until(&mut b, |p| ids(p).into_iter().collect::<HashSet<_>>() == expected).await;

    assert_eq!(ids(a.pastes()), truth);
    assert_eq!(ids(b.pastes()), truth);
}

#[tokio::test]
async fn rooms_are_isolated() {
    let room = TestRoom::new();
    let (mut a, _) = room.open().await;
    let (engine, _) = room.device();
    let mut other = engine
        .open(common::RoomCode::parse("1111", 4).unwrap())
        .await
        .unwrap();

    other.add_text("elsewhere").await.unwrap();
    a.add_text("here").await.unwrap();
    sync_until(&mut a, |pastes| pastes.len() == 1).await;

    assert_eq!(a.pastes()[0].content, "here");
    assert_eq!(other.pastes().len(), 1);
}
