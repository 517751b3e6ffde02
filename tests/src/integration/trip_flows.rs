//! # Trip Lifecycle Flows
//!
//! Trip status over the gateway's HTTP surface, with the incident workflow
//! driven through the node's lifecycle service:
//!
//! - Full progression `assigned → picked_up → delivering → completed`
//! - Completion sets `endTime` exactly once and publishes `TripCompleted`
//! - An incident under handling blocks progression until resolved
//! - Suspend to a side-branch status and resume to the prior status

#[cfg(test)]
mod tests {
    use crate::integration::support::TestNode;
    use fl_01_trip_lifecycle::IncidentWorkflow;
    use reqwest::{Client, StatusCode};
    use serde_json::{json, Value};
    use shared_bus::{DispatchEvent, EventFilter};
    use shared_types::{IncidentReport, IncidentStatus, ReportId, StatusId, TripId};

    async fn advance(node: &TestNode, trip: &str, status: &str) -> (StatusCode, Value) {
        let response = Client::new()
            .patch(node.http(&format!("/trips/{trip}/status")))
            .json(&json!({ "statusId": status, "actorId": "dispatcher-7" }))
            .send()
            .await
            .unwrap();
        let code = response.status();
        (code, response.json().await.unwrap())
    }

    async fn history(node: &TestNode, trip: &str) -> Vec<String> {
        let rows: Vec<Value> = Client::new()
            .get(node.http(&format!("/trips/{trip}/history")))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        rows.iter()
            .map(|row| row["statusId"].as_str().unwrap().to_string())
            .collect()
    }

    fn file_report(node: &TestNode, report: &str, trip: &str, status: IncidentStatus) {
        node.node.incidents().file_report(IncidentReport {
            report_id: ReportId::new(report).unwrap(),
            trip_id: TripId::new(trip).unwrap(),
            status,
        });
    }

    #[tokio::test]
    async fn test_full_progression_to_completion() {
        let node = TestNode::start().await;
        let mut events = node.node.bus().subscribe(EventFilter::all());

        let (code, body) = advance(&node, "T1", "picked_up").await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["currentStatusId"], "picked_up");
        assert_eq!(history(&node, "T1").await.len(), 1);

        let (code, body) = advance(&node, "T1", "delivering").await;
        assert_eq!(code, StatusCode::OK);
        assert!(body["endTime"].is_null());
        assert_eq!(history(&node, "T1").await.len(), 2);

        let (code, body) = advance(&node, "T1", "completed").await;
        assert_eq!(code, StatusCode::OK);
        assert!(body["endTime"].is_string());
        let end_time = body["endTime"].clone();

        let (code, body) = advance(&node, "T1", "completed").await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_transition");

        let (_, snapshot) = {
            let response = Client::new()
                .get(node.http("/trips/T1"))
                .send()
                .await
                .unwrap();
            (response.status(), response.json::<Value>().await.unwrap())
        };
        assert_eq!(snapshot["endTime"], end_time);
        assert_eq!(
            history(&node, "T1").await,
            vec!["picked_up", "delivering", "completed"]
        );

        let mut completed = 0;
        while let Ok(Some(event)) = events.try_recv() {
            if matches!(event, DispatchEvent::TripCompleted { .. }) {
                completed += 1;
            }
        }
        assert_eq!(completed, 1);
    }

    #[tokio::test]
    async fn test_skips_and_regressions_rejected() {
        let node = TestNode::start().await;

        let (code, _) = advance(&node, "T1", "delivering").await;
        assert_eq!(code, StatusCode::BAD_REQUEST);

        let (code, _) = advance(&node, "T1", "picked_up").await;
        assert_eq!(code, StatusCode::OK);

        let (code, _) = advance(&node, "T1", "assigned").await;
        assert_eq!(code, StatusCode::BAD_REQUEST);

        let (code, _) = advance(&node, "T404", "picked_up").await;
        assert_eq!(code, StatusCode::NOT_FOUND);
        let (code, _) = advance(&node, "T1", "teleported").await;
        assert_eq!(code, StatusCode::NOT_FOUND);

        // Other trips are unaffected.
        assert!(history(&node, "T2").await.is_empty());
    }

    #[tokio::test]
    async fn test_handling_incident_blocks_until_resolved() {
        let node = TestNode::start().await;
        file_report(&node, "R1", "T1", IncidentStatus::Handling);

        let (code, body) = advance(&node, "T1", "picked_up").await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "blocked");
        assert!(history(&node, "T1").await.is_empty());

        // Incidents on another trip do not matter.
        let (code, _) = advance(&node, "T2", "picked_up").await;
        assert_eq!(code, StatusCode::OK);

        node.node
            .incidents()
            .set_status(&ReportId::new("R1").unwrap(), IncidentStatus::Resolved);
        let (code, _) = advance(&node, "T1", "picked_up").await;
        assert_eq!(code, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_suspend_and_resume_around_incident() {
        let node = TestNode::start().await;
        let lifecycle = node.node.lifecycle();
        let trip = TripId::new("T1").unwrap();
        let report = ReportId::new("R9").unwrap();

        let (code, _) = advance(&node, "T1", "picked_up").await;
        assert_eq!(code, StatusCode::OK);

        file_report(&node, "R9", "T1", IncidentStatus::Handling);
        let suspended = lifecycle
            .suspend_for_incident(&trip, &StatusId::new("delaying").unwrap(), &report)
            .await
            .unwrap();
        assert!(suspended.suspended);
        assert_eq!(suspended.trip.current_status_id.as_str(), "delaying");

        // Resolving the report is not enough; the trip is still parked.
        node.node.incidents().set_status(&report, IncidentStatus::Resolved);
        let (code, _) = advance(&node, "T1", "delivering").await;
        assert_eq!(code, StatusCode::BAD_REQUEST);

        let resumed = lifecycle.resume_after_incident(&trip, &report).await.unwrap();
        assert_eq!(resumed.trip.current_status_id.as_str(), "picked_up");

        let (code, _) = advance(&node, "T1", "delivering").await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(
            history(&node, "T1").await,
            vec!["picked_up", "delaying", "picked_up", "delivering"]
        );
    }
}
