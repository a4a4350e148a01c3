use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use warmline::notify::{NotificationHub, NotifyEvent, TargetKind};

fn event(position: usize) -> NotifyEvent {
    NotifyEvent::QueuePosition { position }
}

/// Unregistration happens on a spawned task; give it a beat
async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test]
async fn targeted_delivery_reaches_only_the_addressee() {
    let hub = Arc::new(NotificationHub::new());

    let (tx_a, mut rx_a) = mpsc::unbounded_channel();
    let (tx_b, mut rx_b) = mpsc::unbounded_channel();
    let _ga = NotificationHub::register(&hub, TargetKind::Customer, "a@example.com", tx_a).await;
    let _gb = NotificationHub::register(&hub, TargetKind::Customer, "b@example.com", tx_b).await;

    hub.send_to(TargetKind::Customer, "a@example.com", &event(1)).await;

    let payload = rx_a.recv().await.unwrap();
    assert!(payload.contains("queue_position"));
    assert!(rx_b.try_recv().is_err());
}

#[tokio::test]
async fn kinds_do_not_collide() {
    let hub = Arc::new(NotificationHub::new());

    // Same id registered as customer and as agent
    let (tx_c, mut rx_c) = mpsc::unbounded_channel();
    let (tx_a, mut rx_a) = mpsc::unbounded_channel();
    let _gc = NotificationHub::register(&hub, TargetKind::Customer, "x", tx_c).await;
    let _ga = NotificationHub::register(&hub, TargetKind::Agent, "x", tx_a).await;

    hub.send_to(TargetKind::Agent, "x", &event(3)).await;

    assert!(rx_a.recv().await.is_some());
    assert!(rx_c.try_recv().is_err());
}

#[tokio::test]
async fn missing_target_falls_back_to_broadcast() {
    let hub = Arc::new(NotificationHub::new());

    let (tx_a, mut rx_a) = mpsc::unbounded_channel();
    let (tx_b, mut rx_b) = mpsc::unbounded_channel();
    let _ga = NotificationHub::register(&hub, TargetKind::Agent, "a1", tx_a).await;
    let _gb = NotificationHub::register(&hub, TargetKind::Agent, "a2", tx_b).await;

    hub.send_to(TargetKind::Customer, "nobody@example.com", &event(5)).await;

    assert!(rx_a.recv().await.is_some());
    assert!(rx_b.recv().await.is_some());
}

#[tokio::test]
async fn dead_targeted_channel_degrades_to_broadcast_and_is_pruned() {
    let hub = Arc::new(NotificationHub::new());

    let (tx_dead, rx_dead) = mpsc::unbounded_channel();
    let (tx_live, mut rx_live) = mpsc::unbounded_channel();
    let _gd = NotificationHub::register(&hub, TargetKind::Customer, "gone@example.com", tx_dead).await;
    let _gl = NotificationHub::register(&hub, TargetKind::Agent, "a1", tx_live).await;
    drop(rx_dead);

    hub.send_to(TargetKind::Customer, "gone@example.com", &event(2)).await;

    // The live connection got the fallback broadcast
    assert!(rx_live.recv().await.is_some());
    assert_eq!(hub.connection_count().await, 1);
}

#[tokio::test]
async fn broadcast_prunes_failures_without_aborting_delivery() {
    let hub = Arc::new(NotificationHub::new());

    let (tx_dead, rx_dead) = mpsc::unbounded_channel();
    let (tx_live, mut rx_live) = mpsc::unbounded_channel();
    let _gd = NotificationHub::register(&hub, TargetKind::Agent, "dead", tx_dead).await;
    let _gl = NotificationHub::register(&hub, TargetKind::Agent, "live", tx_live).await;
    drop(rx_dead);

    hub.broadcast(&event(7)).await;

    assert!(rx_live.recv().await.is_some());
    assert_eq!(hub.connection_count().await, 1);
}

#[tokio::test]
async fn dropping_the_guard_unregisters_the_connection() {
    let hub = Arc::new(NotificationHub::new());

    let (tx, _rx) = mpsc::unbounded_channel();
    let guard = NotificationHub::register(&hub, TargetKind::Agent, "a1", tx).await;
    assert_eq!(hub.connection_count().await, 1);

    drop(guard);
    settle().await;
    assert_eq!(hub.connection_count().await, 0);
}

#[tokio::test]
async fn reregistering_replaces_the_previous_channel() {
    let hub = Arc::new(NotificationHub::new());

    let (tx_old, mut rx_old) = mpsc::unbounded_channel();
    let (tx_new, mut rx_new) = mpsc::unbounded_channel();
    let _g1 = NotificationHub::register(&hub, TargetKind::Agent, "a1", tx_old).await;
    let _g2 = NotificationHub::register(&hub, TargetKind::Agent, "a1", tx_new).await;

    hub.send_to(TargetKind::Agent, "a1", &event(9)).await;

    assert!(rx_new.recv().await.is_some());
    assert!(rx_old.try_recv().is_err());
}
