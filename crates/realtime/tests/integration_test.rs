use serde_json::{json, Map, Value};
use shop_orders_realtime::{
    ChildEventKind, DbPath, FirebaseClient, ListenOptions, MemoryStore, RealtimeError,
    RealtimeStore, StreamOptions,
};
use std::time::Duration;
use tokio::time::timeout;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn day_path() -> DbPath {
    DbPath::parse("orderService/18102026").unwrap()
}

fn setup_client(server_uri: &str) -> FirebaseClient {
    let _ = pretty_env_logger::try_init();
    let options = StreamOptions::default().with_auto_reconnect(false);
    FirebaseClient::new_with_options(server_uri, options).unwrap()
}

#[tokio::test]
async fn test_get_returns_snapshot() {
    let server = MockServer::start().await;
    let client = setup_client(&server.uri());

    Mock::given(method("GET"))
        .and(path("/orderService/18102026.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ABC1234": { "placa": "ABC1234", "status": "Aberta" }
        })))
        .mount(&server)
        .await;

    let value = client.get(&day_path()).await.unwrap().unwrap();
    assert_eq!(value["ABC1234"]["status"], "Aberta");
}

#[tokio::test]
async fn test_get_missing_location_is_none() {
    let server = MockServer::start().await;
    let client = setup_client(&server.uri());

    Mock::given(method("GET"))
        .and(path("/orderService/18102026.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Value::Null))
        .mount(&server)
        .await;

    assert!(client.get(&day_path()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_set_puts_full_record() {
    let server = MockServer::start().await;
    let client = setup_client(&server.uri());
    let record = json!({ "placa": "ABC1234", "status": "Aberta" });

    Mock::given(method("PUT"))
        .and(path("/orderService/18102026/ABC1234.json"))
        .and(query_param("print", "silent"))
        .and(body_json(&record))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let target = day_path().child("ABC1234").unwrap();
    client.set(&target, &record).await.unwrap();
}

#[tokio::test]
async fn test_update_patches_fields() {
    let server = MockServer::start().await;
    let client = setup_client(&server.uri());

    Mock::given(method("PATCH"))
        .and(path("/orderService/18102026/ABC1234.json"))
        .and(body_json(json!({ "status": "Finalizada" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut fields = Map::new();
    fields.insert("status".to_string(), json!("Finalizada"));
    let target = day_path().child("ABC1234").unwrap();
    client.update(&target, &fields).await.unwrap();
}

#[tokio::test]
async fn test_write_failure_surfaces_status() {
    let server = MockServer::start().await;
    let client = setup_client(&server.uri());

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Permission denied"))
        .mount(&server)
        .await;

    let target = day_path().child("ABC1234").unwrap();
    match client.set(&target, &json!({})).await {
        Err(RealtimeError::RequestFailed { status, message }) => {
            assert_eq!(status.as_u16(), 401);
            assert_eq!(message, "Permission denied");
        }
        other => panic!("Expected RequestFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_event_stream_yields_child_events() {
    let server = MockServer::start().await;
    let client = setup_client(&server.uri());

    let body = concat!(
        "event: put\n",
        "data: {\"path\":\"/\",\"data\":{\"ABC1234\":{\"status\":\"Aberta\"}}}\n\n",
        "event: keep-alive\n",
        "data: null\n\n",
        "event: put\n",
        "data: {\"path\":\"/ABC1234/status\",\"data\":\"Finalizada\"}\n\n",
        "event: patch\n",
        "data: {\"path\":\"/\",\"data\":{\"XYZ7890\":{\"status\":\"Aberta\"}}}\n\n",
    );
    Mock::given(method("GET"))
        .and(path("/orderService/18102026.json"))
        .and(header("accept", "text/event-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let mut sub = client.listen(ListenOptions::new(day_path())).await.unwrap();

    let mut received = Vec::new();
    while let Ok(Some(event)) = timeout(Duration::from_secs(2), sub.next_event()).await {
        received.push((event.kind, event.key, event.value));
    }

    assert_eq!(received.len(), 3);
    assert_eq!(received[0].0, ChildEventKind::Added);
    assert_eq!(received[1].0, ChildEventKind::Changed);
    assert_eq!(received[1].2, json!({ "status": "Finalizada" }));
    assert_eq!((received[2].0, received[2].1.as_str()), (ChildEventKind::Added, "XYZ7890"));
}

#[tokio::test]
async fn test_event_stream_filters_kinds() {
    let server = MockServer::start().await;
    let client = setup_client(&server.uri());

    let body = concat!(
        "event: put\n",
        "data: {\"path\":\"/\",\"data\":{\"ABC1234\":{\"status\":\"Aberta\"}}}\n\n",
        "event: put\n",
        "data: {\"path\":\"/ABC1234/status\",\"data\":\"Cancelada\"}\n\n",
    );
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let options = ListenOptions::new(day_path()).event(ChildEventKind::Changed);
    let mut sub = client.listen(options).await.unwrap();

    let event = timeout(Duration::from_secs(2), sub.next_event())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.kind, ChildEventKind::Changed);
    assert_eq!(event.value["status"], "Cancelada");
}

#[tokio::test]
async fn test_memory_store_round_trip_notifies_listener() {
    let store = MemoryStore::new();
    let mut sub = store.listen(ListenOptions::new(day_path())).await.unwrap();

    let target = day_path().child("ABC1234").unwrap();
    store
        .set(&target, &json!({ "placa": "ABC1234", "status": "Aberta" }))
        .await
        .unwrap();
    let mut fields = Map::new();
    fields.insert("status".to_string(), json!("Finalizada"));
    store.update(&target, &fields).await.unwrap();

    let added = sub.try_next_event().unwrap();
    let changed = sub.try_next_event().unwrap();
    assert_eq!(added.kind, ChildEventKind::Added);
    assert_eq!(changed.kind, ChildEventKind::Changed);
    assert_eq!(changed.value["status"], "Finalizada");
    assert_eq!(store.get(&target).await.unwrap().unwrap()["status"], "Finalizada");
}

#[test]
fn test_unsubscribe_releases_memory_listener() {
    let store = MemoryStore::new();
    let sub = tokio_test::block_on(store.listen(ListenOptions::new(day_path()))).unwrap();
    assert_eq!(store.listener_count(), 1);
    sub.unsubscribe();
    assert_eq!(store.listener_count(), 0);
}
