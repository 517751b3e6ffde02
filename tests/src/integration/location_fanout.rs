//! # Location Fan-out Scenarios
//!
//! Real producer and subscriber sockets against a running node:
//!
//! 1. A producer's sample reaches every subscriber of that subject, unchanged
//! 2. Point lookup returns the latest sample, 404 before the first one
//! 3. Handshake policy: bad token and unknown action close with 1008
//! 4. Reconnecting producer displaces the old socket ("replaced")
//! 5. Oversized frames close with 1009, malformed frames are dropped
//! 6. Closed subscribers leave the registry
//! 7. Server pings, idle timeout and slow-subscriber eviction

#[cfg(test)]
mod tests {
    use crate::integration::support::{
        count_pings, expect_close, mint_token, next_text, send_text, stays_quiet, TestNode,
    };
    use serde_json::{json, Value};
    use shared_types::{LocationSample, SubjectId};
    use std::time::Duration;

    const NORMAL: u16 = 1000;
    const POLICY: u16 = 1008;
    const TOO_BIG: u16 = 1009;
    const TRY_AGAIN: u16 = 1013;

    fn parse(frame: &str) -> Value {
        serde_json::from_str(frame).unwrap()
    }

    #[tokio::test]
    async fn test_sample_reaches_subscriber_and_point_lookup() {
        let node = TestNode::start().await;
        let client = reqwest::Client::new();

        let before = client.get(node.http("/location/D1")).send().await.unwrap();
        assert_eq!(before.status(), 404);
        let body: Value = before.json().await.unwrap();
        assert_eq!(body["message"], "No location");

        let mut subscriber = node.subscriber("D1").await;
        let mut producer = node.producer("D1").await;

        send_text(&mut producer, r#"{"Latitude":10.0,"Longitude":20.0}"#).await;
        let received = parse(&next_text(&mut subscriber).await);
        assert_eq!(received, json!({ "Latitude": 10.0, "Longitude": 20.0 }));

        let after: Value = client
            .get(node.http("/location/D1"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(after, json!({ "Latitude": 10.0, "Longitude": 20.0 }));

        send_text(&mut producer, r#"{"Latitude":11.5,"Longitude":-20.25}"#).await;
        let newer = parse(&next_text(&mut subscriber).await);
        assert_eq!(newer["Latitude"], 11.5);

        let latest: Value = client
            .get(node.http("/location/D1"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(latest, json!({ "Latitude": 11.5, "Longitude": -20.25 }));
    }

    #[tokio::test]
    async fn test_fan_out_isolated_per_subject() {
        let node = TestNode::start().await;
        let mut first = node.subscriber("D1").await;
        let mut second = node.subscriber("D1").await;
        let mut other = node.subscriber("D2").await;

        let mut producer = node.producer("D1").await;
        send_text(&mut producer, r#"{"Latitude":1.0,"Longitude":2.0}"#).await;

        assert_eq!(parse(&next_text(&mut first).await)["Longitude"], 2.0);
        assert_eq!(parse(&next_text(&mut second).await)["Longitude"], 2.0);
        assert!(stays_quiet(&mut other, Duration::from_millis(200)).await);
    }

    #[tokio::test]
    async fn test_samples_arrive_in_send_order() {
        let node = TestNode::start().await;
        let mut subscriber = node.subscriber("D1").await;
        let mut producer = node.producer("D1").await;

        for i in 0..15 {
            send_text(
                &mut producer,
                &json!({ "Latitude": i as f64, "Longitude": 0.0 }).to_string(),
            )
            .await;
        }
        for i in 0..15 {
            assert_eq!(parse(&next_text(&mut subscriber).await)["Latitude"], i as f64);
        }
    }

    #[tokio::test]
    async fn test_bad_token_closes_with_policy_violation() {
        let node = TestNode::start().await;

        let mut wrong_subject = node
            .connect(&format!("userId=D2&action=send&token={}", mint_token("D1")))
            .await;
        assert_eq!(
            expect_close(&mut wrong_subject).await,
            (POLICY, "unauthorized".to_string())
        );

        let mut no_token = node.connect("userId=D2&action=send").await;
        assert_eq!(expect_close(&mut no_token).await.0, POLICY);

        let mut garbage = node.connect("userId=D2&action=send&token=abc.def.ghi").await;
        assert_eq!(
            expect_close(&mut garbage).await,
            (POLICY, "unauthorized".to_string())
        );
        assert!(!node.has_producer("D2"));
    }

    #[tokio::test]
    async fn test_unknown_action_and_missing_user_close_with_policy_violation() {
        let node = TestNode::start().await;

        let mut unknown = node.connect("userId=D1&action=delete").await;
        assert_eq!(
            expect_close(&mut unknown).await,
            (POLICY, "unknown action".to_string())
        );

        let mut anonymous = node.connect("action=subscribe").await;
        assert_eq!(
            expect_close(&mut anonymous).await,
            (POLICY, "missing userId".to_string())
        );
    }

    #[tokio::test]
    async fn test_reconnecting_producer_replaces_previous() {
        let node = TestNode::start().await;
        let mut subscriber = node.subscriber("D1").await;

        let mut old = node.producer("D1").await;
        node.wait_until(|| node.has_producer("D1")).await;

        let mut new = node.producer("D1").await;
        assert_eq!(
            expect_close(&mut old).await,
            (POLICY, "replaced".to_string())
        );

        send_text(&mut new, r#"{"Latitude":5.0,"Longitude":6.0}"#).await;
        assert_eq!(parse(&next_text(&mut subscriber).await)["Latitude"], 5.0);

        // The displaced session's cleanup must not unregister its successor.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(node.has_producer("D1"));
    }

    #[tokio::test]
    async fn test_oversized_frame_closes_with_1009() {
        let node = TestNode::start_with(|config| {
            config.gateway.websocket.max_message_size = 128;
        })
        .await;
        let mut producer = node.producer("D1").await;

        let padding = "x".repeat(256);
        send_text(
            &mut producer,
            &format!(r#"{{"Latitude":1.0,"Longitude":2.0,"Note":"{padding}"}}"#),
        )
        .await;

        assert_eq!(expect_close(&mut producer).await.0, TOO_BIG);
        node.wait_until(|| !node.has_producer("D1")).await;
    }

    #[tokio::test]
    async fn test_malformed_frames_dropped_connection_stays_open() {
        let node = TestNode::start().await;
        let mut subscriber = node.subscriber("D1").await;
        let mut producer = node.producer("D1").await;

        send_text(&mut producer, "not json at all").await;
        send_text(&mut producer, r#"{"Latitude":91.0,"Longitude":0.0}"#).await;
        send_text(&mut producer, r#"{"Latitude":1.0}"#).await;
        send_text(&mut producer, r#"{"Latitude":3.0,"Longitude":4.0}"#).await;

        let first = parse(&next_text(&mut subscriber).await);
        assert_eq!(first, json!({ "Latitude": 3.0, "Longitude": 4.0 }));
    }

    #[tokio::test]
    async fn test_closed_subscriber_removed_from_registry() {
        let node = TestNode::start().await;
        let mut staying = node.subscriber("D1").await;
        let mut leaving = node.subscriber("D1").await;
        assert_eq!(node.subscriber_count("D1"), 2);

        leaving.close(None).await.unwrap();
        node.wait_until(|| node.subscriber_count("D1") == 1).await;

        let mut producer = node.producer("D1").await;
        send_text(&mut producer, r#"{"Latitude":7.0,"Longitude":8.0}"#).await;
        assert_eq!(parse(&next_text(&mut staying).await)["Latitude"], 7.0);
    }

    #[tokio::test]
    async fn test_replay_cached_sample_on_subscribe() {
        let node = TestNode::start_with(|config| {
            config.gateway.websocket.replay_cached_on_subscribe = true;
        })
        .await;

        let mut producer = node.producer("D1").await;
        send_text(&mut producer, r#"{"Latitude":9.0,"Longitude":9.5}"#).await;
        node.wait_until(|| {
            node.node
                .gateway()
                .broadcaster()
                .cache()
                .get(&shared_types::SubjectId::new("D1").unwrap())
                .is_some()
        })
        .await;

        let mut late = node.subscriber("D1").await;
        assert_eq!(
            parse(&next_text(&mut late).await),
            json!({ "Latitude": 9.0, "Longitude": 9.5 })
        );
    }

    #[tokio::test]
    async fn test_server_pings_keep_responsive_subscriber_open() {
        let node = TestNode::start_with(|config| {
            config.gateway.websocket.ping_interval = Duration::from_millis(100);
            config.gateway.websocket.idle_timeout = Duration::from_millis(400);
        })
        .await;
        let mut subscriber = node.subscriber("D1").await;

        // Pongs sent while reading count as activity, so a full second
        // (well past the idle timeout) passes without a close.
        let pings = count_pings(&mut subscriber, Duration::from_millis(1000)).await;
        assert!(pings >= 3, "expected a ping every 100ms, got {pings}");
        assert_eq!(node.subscriber_count("D1"), 1);
    }

    #[tokio::test]
    async fn test_silent_connections_closed_after_idle_timeout() {
        // The idle check runs on each ping tick; a timeout shorter than the
        // interval closes on the first tick.
        let node = TestNode::start_with(|config| {
            config.gateway.websocket.ping_interval = Duration::from_millis(200);
            config.gateway.websocket.idle_timeout = Duration::from_millis(50);
        })
        .await;

        let mut subscriber = node.subscriber("D1").await;
        let mut producer = node.producer("D2").await;

        assert_eq!(
            expect_close(&mut subscriber).await,
            (NORMAL, "idle timeout".to_string())
        );
        assert_eq!(
            expect_close(&mut producer).await,
            (NORMAL, "idle timeout".to_string())
        );
        node.wait_until(|| node.subscriber_count("D1") == 0 && !node.has_producer("D2"))
            .await;
    }

    #[tokio::test]
    async fn test_slow_subscriber_evicted_and_closed_with_1013() {
        let node = TestNode::start_with(|config| {
            config.gateway.websocket.subscriber_buffer = 1;
        })
        .await;
        let mut slow = node.subscriber("D1").await;

        // Nothing awaits between the two broadcasts, so on this
        // single-threaded runtime the session cannot drain its queue.
        let broadcaster = node.node.gateway().broadcaster();
        let subject = SubjectId::new("D1").unwrap();
        let first = broadcaster.on_sample(&subject, LocationSample::new(1.0, 2.0));
        let second = broadcaster.on_sample(&subject, LocationSample::new(3.0, 4.0));
        assert_eq!(first.delivered, 1);
        assert!(first.evicted.is_empty());
        assert_eq!(second.delivered, 0);
        assert_eq!(second.evicted.len(), 1);
        assert_eq!(node.subscriber_count("D1"), 0);

        // The frame queued before eviction still goes out, then the close.
        assert_eq!(
            parse(&next_text(&mut slow).await),
            json!({ "Latitude": 1.0, "Longitude": 2.0 })
        );
        assert_eq!(
            expect_close(&mut slow).await,
            (TRY_AGAIN, "subscriber too slow".to_string())
        );
    }
}
