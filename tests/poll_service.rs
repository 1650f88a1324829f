//! End-to-end poll lifecycle tests
//!
//! Drives the service the way real traffic does: commands enter through the
//! voting engine with a recording reply context, and codes are fetched over
//! the issuer's HTTP router.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use parking_lot::Mutex;
use tower::util::ServiceExt;

use pollbot::channels::{CommandRequest, ReplyContext, TransportResult};
use pollbot::config::PollServiceConfig;
use pollbot::polls::{issuer, PollCommand, PollStore, StoreLimits};

#[derive(Default)]
struct RecordingReply {
    replies: Mutex<Vec<String>>,
}

impl RecordingReply {
    fn last(&self) -> String {
        self.replies.lock().last().cloned().expect("no reply sent")
    }
}

#[async_trait]
impl ReplyContext for RecordingReply {
    async fn reply(&self, text: &str) -> TransportResult<()> {
        self.replies.lock().push(text.to_string());
        Ok(())
    }

    async fn reply_formatted(&self, html: &str) -> TransportResult<()> {
        self.replies.lock().push(html.to_string());
        Ok(())
    }
}

struct Service {
    store: Arc<PollStore>,
    command: PollCommand,
    router: axum::Router,
    config: PollServiceConfig,
}

fn service() -> Service {
    let config = PollServiceConfig::default();
    let store = Arc::new(PollStore::new(StoreLimits {
        max_polls: config.max_polls,
        max_codes_per_poll: config.max_codes_per_poll,
        code_length: config.code_length,
    }));
    Service {
        command: PollCommand::new(store.clone(), &config),
        router: issuer::router(config.normalized_prefix(), store.clone()),
        store,
        config,
    }
}

fn chat(sender: &str, args: &[&str]) -> CommandRequest {
    CommandRequest::new(sender, args.iter().map(|s| s.to_string()).collect())
}

async fn http_get(service: &Service, path_suffix: &str) -> (StatusCode, String) {
    let uri = format!("{}/{}", service.config.normalized_prefix(), path_suffix);
    let response = service
        .router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

fn extract_bold(reply: &str) -> String {
    reply
        .split("<strong>")
        .nth(1)
        .and_then(|rest| rest.split("</strong>").next())
        .expect("no bold token in reply")
        .to_string()
}

fn extract_code(body: &str) -> String {
    body.split("Your answer code is ")
        .nth(1)
        .and_then(|rest| rest.split('.').next())
        .expect("no code in body")
        .to_string()
}

#[tokio::test]
async fn test_full_poll_lifecycle() {
    let service = service();
    let ctx = RecordingReply::default();

    // creator starts a single-option poll; "not yes" is synthesized
    service
        .command
        .handle(&chat("creator", &["start", "yes"]), &ctx)
        .await;
    let id = extract_bold(&ctx.last());
    let (status, body) = http_get(&service, &id).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("not yes"));

    // alice fetches a code out-of-band and votes in chat
    let (status, body) = http_get(&service, &format!("{id}/yes")).await;
    assert_eq!(status, StatusCode::OK);
    let alice_code = extract_code(&body);
    service
        .command
        .handle(&chat("alice", &[&id, &alice_code]), &ctx)
        .await;
    assert!(ctx.last().contains("Voted successfully"));

    // the code is consumed: replaying it fails
    service
        .command
        .handle(&chat("alice", &[&id, &alice_code]), &ctx)
        .await;
    assert_eq!(ctx.last(), "Wrong code.");

    // bob votes the other way
    let (_, body) = http_get(&service, &format!("{id}/not%20yes")).await;
    let bob_code = extract_code(&body);
    service
        .command
        .handle(&chat("bob", &[&id, &bob_code]), &ctx)
        .await;

    // only the creator may end it
    service
        .command
        .handle(&chat("alice", &["end", &id]), &ctx)
        .await;
    assert!(ctx.last().contains("creator of this poll"));

    service
        .command
        .handle(&chat("creator", &["end", &id]), &ctx)
        .await;
    let result = ctx.last();
    assert!(result.contains("yes: <strong>50.00%</strong>"));
    assert!(result.contains("not yes: <strong>50.00%</strong>"));
    assert_eq!(service.store.active_polls(), 0);

    // the poll is gone for everyone afterwards
    let (status, _) = http_get(&service, &id).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    service
        .command
        .handle(&chat("creator", &["end", &id]), &ctx)
        .await;
    assert!(ctx.last().contains("does not exist"));
}

#[tokio::test]
async fn test_code_issuance_is_per_request_not_per_person() {
    // one identity may fetch codes for several options; each code still
    // redeems exactly one vote, and an identity still votes at most once
    let service = service();
    let ctx = RecordingReply::default();

    service
        .command
        .handle(&chat("creator", &["start", "tea", "coffee"]), &ctx)
        .await;
    let id = extract_bold(&ctx.last());

    let (_, body) = http_get(&service, &format!("{id}/tea")).await;
    let tea_code = extract_code(&body);
    let (_, body) = http_get(&service, &format!("{id}/coffee")).await;
    let coffee_code = extract_code(&body);
    assert_ne!(tea_code, coffee_code);

    service
        .command
        .handle(&chat("alice", &[&id, &tea_code]), &ctx)
        .await;
    assert!(ctx.last().contains("Voted successfully"));
    service
        .command
        .handle(&chat("alice", &[&id, &coffee_code]), &ctx)
        .await;
    assert!(ctx.last().contains("not allowed to vote twice"));

    // the spare code is still outstanding for someone else
    service
        .command
        .handle(&chat("bob", &[&id, &coffee_code]), &ctx)
        .await;
    assert!(ctx.last().contains("Voted successfully"));
}

#[tokio::test]
async fn test_poll_capacity_over_http_and_chat() {
    let config = PollServiceConfig::default();
    let store = Arc::new(PollStore::new(StoreLimits {
        max_polls: 2,
        max_codes_per_poll: config.max_codes_per_poll,
        code_length: config.code_length,
    }));
    let command = PollCommand::new(store.clone(), &config);
    let ctx = RecordingReply::default();

    for _ in 0..2 {
        command.handle(&chat("creator", &["start", "yes"]), &ctx).await;
        assert!(ctx.last().contains("has been started"));
    }
    command.handle(&chat("creator", &["start", "yes"]), &ctx).await;
    assert!(ctx.last().contains("maximum amount of started polls"));
    assert_eq!(store.active_polls(), 2);
}
