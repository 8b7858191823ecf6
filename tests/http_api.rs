mod common;

use std::sync::Arc;
use std::time::Duration;

use poem::{Route, http::StatusCode, test::TestClient};
use serde_json::json;

use mailing::{
    application::services::transport::MailTransport,
    infrastructure::repositories::Stores,
    presentation::http::{build_app, endpoints::root::ApiState},
};

use common::{ScriptedTransport, fast_config};

fn client_with(transport: ScriptedTransport) -> TestClient<Route> {
    let transport: Arc<dyn MailTransport> = Arc::new(transport);
    let state = ApiState::new(Stores::in_memory(), transport, fast_config());
    TestClient::new(build_app(state, "http://localhost:3000"))
}

fn client() -> TestClient<Route> {
    client_with(ScriptedTransport::new())
}

async fn create_client(cli: &TestClient<Route>, email: &str) -> String {
    let resp = cli
        .post("/api/clients")
        .body_json(&json!({ "email": email, "display_name": "Reader" }))
        .send()
        .await;
    resp.assert_status_is_ok();
    resp.json().await.value().object().get("id").string().to_string()
}

async fn create_campaign(
    cli: &TestClient<Route>,
    recipients: &[String],
    disabled: bool,
) -> String {
    let resp = cli
        .post("/api/messages")
        .body_json(&json!({ "subject": "Weekly digest", "body": "Hello!" }))
        .send()
        .await;
    resp.assert_status_is_ok();
    let message_id = resp.json().await.value().object().get("id").string().to_string();

    let resp = cli
        .post("/api/campaigns")
        .body_json(&json!({
            "message_id": message_id,
            "recipient_ids": recipients,
            "disabled": disabled,
        }))
        .send()
        .await;
    resp.assert_status_is_ok();
    let json = resp.json().await;
    let campaign = json.value().object();
    campaign.get("status").assert_string("created");
    campaign.get("status_label").assert_string("Создана");
    campaign.get("id").string().to_string()
}

async fn wait_for_status(cli: &TestClient<Route>, campaign_id: &str, expected: &str) {
    for _ in 0..100 {
        let resp = cli.get(format!("/api/campaigns/{campaign_id}")).send().await;
        let status = resp
            .json()
            .await
            .value()
            .object()
            .get("status")
            .string()
            .to_string();
        if status == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("campaign {campaign_id} never reached {expected}");
}

#[tokio::test]
async fn health_answers_ok() {
    let resp = client().get("/api/health").send().await;
    resp.assert_status_is_ok();
    resp.assert_text("OK").await;
}

#[tokio::test]
async fn launch_is_accepted_once_and_attempts_become_visible() {
    let cli = client();
    let recipients = vec![
        create_client(&cli, "ann@example.com").await,
        create_client(&cli, "bob@example.com").await,
    ];
    let campaign_id = create_campaign(&cli, &recipients, false).await;

    let resp = cli
        .post(format!("/api/campaigns/{campaign_id}/launch"))
        .send()
        .await;
    resp.assert_status(StatusCode::ACCEPTED);
    let json = resp.json().await;
    let launched = json.value().object();
    launched.get("outcome").assert_string("launched");
    launched.get("message").assert_string("Рассылка запущена");
    launched.get("recipients").assert_i64(2);

    let resp = cli
        .post(format!("/api/campaigns/{campaign_id}/launch"))
        .send()
        .await;
    resp.assert_status(StatusCode::CONFLICT);
    let outcome = resp
        .json()
        .await
        .value()
        .object()
        .get("outcome")
        .string()
        .to_string();
    assert!(
        outcome == "already_launched" || outcome == "already_completed",
        "unexpected outcome {outcome}"
    );

    wait_for_status(&cli, &campaign_id, "completed").await;

    let resp = cli
        .get(format!("/api/campaigns/{campaign_id}/attempts"))
        .send()
        .await;
    resp.assert_status_is_ok();
    let json = resp.json().await;
    let page = json.value().object();
    page.get("attempts").array().assert_len(2);
    page.get("has_more").assert_bool(false);

    let resp = cli
        .get("/api/attempts")
        .query("campaign_id", &campaign_id)
        .query("limit", &1)
        .send()
        .await;
    resp.assert_status_is_ok();
    let json = resp.json().await;
    let page = json.value().object();
    page.get("attempts").array().assert_len(1);
    page.get("has_more").assert_bool(true);
    page.get("next_offset").assert_i64(1);

    let resp = cli.get("/api/summary").send().await;
    resp.assert_status_is_ok();
    let json = resp.json().await;
    let summary = json.value().object();
    summary.get("campaigns_total").assert_i64(1);
    summary.get("campaigns_launched").assert_i64(0);
    summary.get("clients_total").assert_i64(2);
}

#[tokio::test]
async fn disabled_campaign_launch_is_rejected_and_stays_created() {
    let cli = client();
    let recipients = vec![create_client(&cli, "ann@example.com").await];
    let campaign_id = create_campaign(&cli, &recipients, true).await;

    let resp = cli
        .post(format!("/api/campaigns/{campaign_id}/launch"))
        .send()
        .await;
    resp.assert_status(StatusCode::CONFLICT);
    resp.json()
        .await
        .value()
        .object()
        .get("outcome")
        .assert_string("disabled");

    let resp = cli.get(format!("/api/campaigns/{campaign_id}")).send().await;
    resp.json()
        .await
        .value()
        .object()
        .get("status")
        .assert_string("created");

    let resp = cli
        .get(format!("/api/campaigns/{campaign_id}/attempts"))
        .send()
        .await;
    resp.json()
        .await
        .value()
        .object()
        .get("attempts")
        .array()
        .assert_len(0);
}

#[tokio::test]
async fn unknown_campaign_launch_is_not_found() {
    let resp = client()
        .post(format!("/api/campaigns/{}/launch", uuid::Uuid::new_v4()))
        .send()
        .await;
    resp.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unreachable_relay_answers_service_unavailable() {
    let cli = client_with(ScriptedTransport::new().unreachable());
    let recipients = vec![create_client(&cli, "ann@example.com").await];
    let campaign_id = create_campaign(&cli, &recipients, false).await;

    let resp = cli
        .post(format!("/api/campaigns/{campaign_id}/launch"))
        .send()
        .await;
    resp.assert_status(StatusCode::SERVICE_UNAVAILABLE);

    let resp = cli.get(format!("/api/campaigns/{campaign_id}")).send().await;
    resp.json()
        .await
        .value()
        .object()
        .get("status")
        .assert_string("created");
}

#[tokio::test]
async fn duplicate_and_malformed_emails_are_refused() {
    let cli = client();
    create_client(&cli, "ann@example.com").await;

    let resp = cli
        .post("/api/clients")
        .body_json(&json!({ "email": "ANN@example.com" }))
        .send()
        .await;
    resp.assert_status(StatusCode::CONFLICT);

    let resp = cli
        .post("/api/clients")
        .body_json(&json!({ "email": "not-an-address" }))
        .send()
        .await;
    resp.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn launched_campaign_recipients_are_frozen() {
    let cli = client();
    let recipients = vec![create_client(&cli, "ann@example.com").await];
    let campaign_id = create_campaign(&cli, &recipients, false).await;

    cli.post(format!("/api/campaigns/{campaign_id}/launch"))
        .send()
        .await
        .assert_status(StatusCode::ACCEPTED);

    let extra = create_client(&cli, "bob@example.com").await;
    let resp = cli
        .put(format!("/api/campaigns/{campaign_id}/recipients"))
        .body_json(&json!({ "recipient_ids": [extra] }))
        .send()
        .await;
    resp.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn completing_a_campaign_that_never_launched_conflicts() {
    let cli = client();
    let campaign_id = create_campaign(&cli, &[], false).await;

    let resp = cli
        .post(format!("/api/campaigns/{campaign_id}/complete"))
        .send()
        .await;
    resp.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn deleting_a_client_detaches_it_from_campaigns() {
    let cli = client();
    let ann = create_client(&cli, "ann@example.com").await;
    let bob = create_client(&cli, "bob@example.com").await;
    let campaign_id = create_campaign(&cli, &[ann.clone(), bob.clone()], false).await;

    cli.delete(format!("/api/clients/{bob}"))
        .send()
        .await
        .assert_status_is_ok();

    let resp = cli.get(format!("/api/campaigns/{campaign_id}")).send().await;
    let json = resp.json().await;
    let ids = json.value().object().get("recipient_ids").string_array();
    assert_eq!(ids, vec![ann.as_str()]);
}

#[tokio::test]
async fn deleting_a_client_keeps_it_in_sent_campaigns() {
    let cli = client();
    let ann = create_client(&cli, "ann@example.com").await;
    let campaign_id = create_campaign(&cli, &[ann.clone()], false).await;

    cli.post(format!("/api/campaigns/{campaign_id}/launch"))
        .send()
        .await
        .assert_status(StatusCode::ACCEPTED);
    wait_for_status(&cli, &campaign_id, "completed").await;

    cli.delete(format!("/api/clients/{ann}"))
        .send()
        .await
        .assert_status_is_ok();

    let resp = cli.get(format!("/api/campaigns/{campaign_id}")).send().await;
    let json = resp.json().await;
    let ids = json.value().object().get("recipient_ids").string_array();
    assert_eq!(ids, vec![ann.as_str()]);
}

#[tokio::test]
async fn sending_campaign_cannot_be_completed_or_deleted() {
    let cli = client_with(ScriptedTransport::new().with_latency(Duration::from_millis(300)));
    let recipients = vec![create_client(&cli, "ann@example.com").await];
    let campaign_id = create_campaign(&cli, &recipients, false).await;

    cli.post(format!("/api/campaigns/{campaign_id}/launch"))
        .send()
        .await
        .assert_status(StatusCode::ACCEPTED);

    cli.post(format!("/api/campaigns/{campaign_id}/complete"))
        .send()
        .await
        .assert_status(StatusCode::CONFLICT);
    cli.delete(format!("/api/campaigns/{campaign_id}"))
        .send()
        .await
        .assert_status(StatusCode::CONFLICT);

    wait_for_status(&cli, &campaign_id, "completed").await;
    cli.delete(format!("/api/campaigns/{campaign_id}"))
        .send()
        .await
        .assert_status_is_ok();
}
