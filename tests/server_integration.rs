//! HTTP round trips through the skill endpoint

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use kube_voice::cluster::memory::{Fixture, FixtureObject};
use kube_voice::cluster::{ClusterApi, InMemoryCluster};
use kube_voice::dispatch::{Dispatcher, HandlerRegistry};
use kube_voice::platform::{router, AppState, ApplicationGate};

const SKILL_ID: &str = "amzn1.ask.skill.kube-voice-test";

fn app() -> Router {
    let cluster: Arc<dyn ClusterApi> = Arc::new(InMemoryCluster::new(Fixture {
        namespaces: vec![FixtureObject::new("default"), FixtureObject::new("payments")],
        services: vec![
            FixtureObject::new("web"),
            FixtureObject::new("ledger-db").in_namespace("payments"),
        ],
        ..Fixture::default()
    }));
    let dispatcher = Dispatcher::new(HandlerRegistry::standard(), cluster).unwrap();
    router(AppState::new(dispatcher, ApplicationGate::new([SKILL_ID])))
}

fn intent_request(application_id: &str, intent: &str, slots: Value, attributes: Value) -> Value {
    json!({
        "version": "1.0",
        "session": {
            "new": false,
            "sessionId": "amzn1.echo-api.session.test",
            "application": { "applicationId": application_id },
            "attributes": attributes
        },
        "request": {
            "type": "IntentRequest",
            "requestId": "amzn1.echo-api.request.test",
            "locale": "en-US",
            "intent": { "name": intent, "slots": slots }
        }
    })
}

async fn post(app: Router, body: Value) -> (StatusCode, Value) {
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_healthz() {
    let resp = app()
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_switch_namespace_returns_updated_session() {
    let body = intent_request(
        SKILL_ID,
        "SwitchToNamespace",
        json!({ "Namespace": { "name": "Namespace", "value": "payment" } }),
        json!({}),
    );
    let (status, value) = post(app(), body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        value["response"]["outputSpeech"],
        json!({ "type": "PlainText", "text": "Now using namespace payments" })
    );
    assert_eq!(value["sessionAttributes"]["Namespace"], json!("payments"));
    assert_eq!(value["response"]["card"]["content"], json!("Switch To Namespace"));
    assert_eq!(value["response"]["shouldEndSession"], json!(false));
}

#[tokio::test]
async fn test_session_attributes_are_used() {
    let body = intent_request(
        SKILL_ID,
        "GetServices",
        json!({ "Namespace": { "name": "Namespace" } }),
        json!({ "Namespace": "payments" }),
    );
    let (status, value) = post(app(), body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        value["response"]["outputSpeech"]["text"],
        json!("The available services in namespace payments are: ledger-db")
    );
    assert_eq!(value["sessionAttributes"], json!({ "Namespace": "payments" }));
}

#[tokio::test]
async fn test_unknown_intent_ends_session() {
    let body = intent_request(SKILL_ID, "OrderPizza", json!({}), json!({ "Namespace": "payments" }));
    let (status, value) = post(app(), body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        value["response"]["outputSpeech"]["text"],
        json!("I don't know how to do that.")
    );
    assert_eq!(value["response"]["shouldEndSession"], json!(true));
    assert_eq!(value["sessionAttributes"], json!({ "Namespace": "payments" }));
}

#[tokio::test]
async fn test_launch_request_on_new_session() {
    let body = json!({
        "session": {
            "new": true,
            "sessionId": "amzn1.echo-api.session.new",
            "application": { "applicationId": SKILL_ID }
        },
        "request": { "type": "LaunchRequest", "requestId": "amzn1.echo-api.request.launch" }
    });
    let (status, value) = post(app(), body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        value["response"]["reprompt"]["outputSpeech"]["text"],
        json!("Welcome to Kubernetes. You are currently using namespace default.")
    );
    assert_eq!(
        value["response"]["card"],
        json!({ "type": "Simple", "title": "Kubernetes", "content": "Welcome to Kubernetes skill" })
    );
}

#[tokio::test]
async fn test_session_ended_has_no_speech() {
    let body = json!({
        "session": {
            "sessionId": "amzn1.echo-api.session.end",
            "application": { "applicationId": SKILL_ID }
        },
        "request": {
            "type": "SessionEndedRequest",
            "requestId": "amzn1.echo-api.request.end",
            "reason": "USER_INITIATED"
        }
    });
    let (status, value) = post(app(), body).await;

    assert_eq!(status, StatusCode::OK);
    assert!(value["response"].get("outputSpeech").is_none());
}

#[tokio::test]
async fn test_foreign_application_is_rejected() {
    let body = intent_request(
        "amzn1.ask.skill.someone-else",
        "GetNamespaces",
        json!({}),
        json!({}),
    );
    let (status, value) = post(app(), body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        value["error"],
        json!("Application ID not accepted: amzn1.ask.skill.someone-else")
    );
}
