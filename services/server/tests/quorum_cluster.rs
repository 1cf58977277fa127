//! Quorum mode end to end: write quorums, read-quorum merges, failure
//! surfacing, and anti-entropy.

mod common;

use bb_protocol::Message;
use bb_test_utils::{LineClient, wait_until};
use common::{shutdown_all, spawn_cluster};
use server::ConsistencyMode;
use std::time::Duration;

/// NW = N: every replica holds the write, so a single-member read quorum
/// sees it no matter where it lands.
#[tokio::test]
async fn full_write_quorum_is_visible_to_any_read() {
    let cluster = spawn_cluster(ConsistencyMode::Quorum, 3, Some((3, 1, 3))).await;

    let mut client = LineClient::connect(cluster[0].local_addr()).await.unwrap();
    assert_eq!(
        client.post("w1", "body").await.unwrap(),
        Message::PostSuccess { article_id: 1 }
    );
    for handle in &cluster {
        assert!(handle.has_article(1).await);
    }

    for handle in &cluster {
        let mut reader = LineClient::connect(handle.local_addr()).await.unwrap();
        match reader.read_articles().await.unwrap() {
            Message::ArticlesList { articles } => {
                assert!(articles.iter().any(|a| a.id == 1 && a.title == "w1"));
            }
            other => panic!("expected ArticlesList, got {other:?}"),
        }
    }
    shutdown_all(&cluster);
}

/// NR + NW > N: a committed write is observable by the very next read,
/// wherever the two quorums land.
#[tokio::test]
async fn committed_write_intersects_every_read_quorum() {
    let cluster = spawn_cluster(ConsistencyMode::Quorum, 5, Some((5, 3, 3))).await;

    let mut client = LineClient::connect(cluster[0].local_addr()).await.unwrap();
    assert_eq!(
        client.post("w1", "body").await.unwrap(),
        Message::PostSuccess { article_id: 1 }
    );

    // Repeat reads from every server; each draws a fresh random quorum.
    for handle in &cluster {
        let mut reader = LineClient::connect(handle.local_addr()).await.unwrap();
        for _ in 0..5 {
            match reader.read_articles().await.unwrap() {
                Message::ArticlesList { articles } => {
                    assert!(
                        articles.iter().any(|a| a.id == 1),
                        "read quorum on {} missed the committed write",
                        handle.local_addr()
                    );
                }
                other => panic!("expected ArticlesList, got {other:?}"),
            }
        }
    }
    shutdown_all(&cluster);
}

/// Single-article reads probe the read quorum and return the content.
#[tokio::test]
async fn read_article_content_through_quorum() {
    let cluster = spawn_cluster(ConsistencyMode::Quorum, 3, Some((3, 2, 2))).await;

    let mut client = LineClient::connect(cluster[1].local_addr()).await.unwrap();
    client.post("deep", "quorum-fetched body").await.unwrap();

    let mut reader = LineClient::connect(cluster[2].local_addr()).await.unwrap();
    match reader.read_article_content(1).await.unwrap() {
        Message::ArticleContent { article } => {
            assert_eq!(article.title, "deep");
            assert_eq!(article.content, "quorum-fetched body");
        }
        other => panic!("expected ArticleContent, got {other:?}"),
    }
    shutdown_all(&cluster);
}

/// The merged listing is sorted ascending by id.
#[tokio::test]
async fn merged_listing_is_sorted_by_id() {
    let cluster = spawn_cluster(ConsistencyMode::Quorum, 3, Some((3, 2, 2))).await;

    let mut client = LineClient::connect(cluster[0].local_addr()).await.unwrap();
    for i in 1..=4u64 {
        let response = client.post(&format!("t{i}"), "body").await.unwrap();
        assert_eq!(response, Message::PostSuccess { article_id: i });
    }

    let mut reader = LineClient::connect(cluster[1].local_addr()).await.unwrap();
    match reader.read_articles().await.unwrap() {
        Message::ArticlesList { articles } => {
            // NR + NW > N: every committed article intersects the read
            // quorum, so the listing is complete as well as sorted.
            let ids: Vec<u64> = articles.iter().map(|a| a.id).collect();
            assert_eq!(ids, vec![1, 2, 3, 4]);
            assert!(articles.iter().all(|a| a.content.is_none()));
        }
        other => panic!("expected ArticlesList, got {other:?}"),
    }
    shutdown_all(&cluster);
}

/// With too few reachable members, the write reports the frozen quorum
/// failure and the allocated id stays a gap.
#[tokio::test]
async fn write_fails_short_of_quorum() {
    let cluster = spawn_cluster(ConsistencyMode::Quorum, 3, Some((3, 1, 3))).await;
    let downed_config = cluster[2].config().clone();
    cluster[2].shutdown();
    // Give the aborted accept task a moment to release its socket.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut client = LineClient::connect(cluster[0].local_addr()).await.unwrap();
    match client.post("doomed", "body").await.unwrap() {
        Message::Error { message } => {
            assert_eq!(message, bb_protocol::error_messages::FAILED_WRITE_QUORUM);
        }
        other => panic!("expected Error, got {other:?}"),
    }

    // Bring the member back on its old port; the released socket may take
    // a moment to become bindable again.
    let revived = loop {
        match server::Server::bind(downed_config.clone()).await {
            Ok(srv) => break srv.spawn(),
            Err(_) => tokio::time::sleep(Duration::from_millis(25)).await,
        }
    };

    // The id allocated for the failed write is never reused.
    match client.post("survivor", "body").await.unwrap() {
        Message::PostSuccess { article_id } => assert_eq!(article_id, 2),
        other => panic!("expected PostSuccess, got {other:?}"),
    }
    revived.shutdown();
    shutdown_all(&cluster);
}

/// A non-coordinator forwards quorum writes to the coordinator.
#[tokio::test]
async fn peer_forwards_write_to_coordinator() {
    let cluster = spawn_cluster(ConsistencyMode::Quorum, 3, Some((3, 1, 3))).await;

    let mut client = LineClient::connect(cluster[2].local_addr()).await.unwrap();
    assert_eq!(
        client.post("routed", "body").await.unwrap(),
        Message::PostSuccess { article_id: 1 }
    );
    shutdown_all(&cluster);
}

/// Anti-entropy pulls articles a replica missed because it was outside the
/// write quorum.
#[tokio::test]
async fn sync_loop_repairs_missed_writes() {
    let cluster = spawn_cluster(ConsistencyMode::Quorum, 3, Some((3, 2, 2))).await;

    let mut client = LineClient::connect(cluster[0].local_addr()).await.unwrap();
    client.post("w1", "body").await.unwrap();

    // NW = 2 of 3, so one replica may start without the article; the sync
    // round closes the gap within its interval.
    for handle in &cluster {
        let ok = wait_until(Duration::from_secs(2), || handle.has_article(1)).await;
        assert!(ok, "replica {} never synchronized", handle.local_addr());
    }
    shutdown_all(&cluster);
}

/// Second write under the same failure still fails consistently when the
/// write quorum cannot be met (write failures do not poison reads).
#[tokio::test]
async fn reads_still_answer_after_failed_write() {
    let cluster = spawn_cluster(ConsistencyMode::Quorum, 3, Some((3, 1, 3))).await;
    cluster[1].shutdown();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut client = LineClient::connect(cluster[0].local_addr()).await.unwrap();
    let response = client.post("doomed", "body").await.unwrap();
    assert!(matches!(response, Message::Error { .. }));

    match client.read_articles().await.unwrap() {
        Message::ArticlesList { .. } => {}
        other => panic!("expected ArticlesList, got {other:?}"),
    }
    shutdown_all(&cluster);
}
