use serde_json::json;

mod common;

#[test]
fn e2e_crud_scenario() {
    let server = common::Server::start();

    let created = server.request("POST", "/todos", Some(r#"{"title":"Buy milk"}"#));
    assert_eq!(created.status, 201, "{}", created.body);
    let item = created.json();
    assert_eq!(item["id"], 1);
    assert_eq!(item["title"], "Buy milk");
    assert_eq!(item["description"], serde_json::Value::Null);
    assert_eq!(item["completed"], false);
    assert_eq!(item["created_at"], item["updated_at"]);

    let fetched = server.request("GET", "/todos/1", None);
    assert_eq!(fetched.status, 200);
    assert_eq!(fetched.json(), item);

    let updated = server.request("PUT", "/todos/1", Some(r#"{"completed":true}"#));
    assert_eq!(updated.status, 200);
    let updated = updated.json();
    assert_eq!(updated["completed"], true);
    assert_eq!(updated["title"], "Buy milk");
    assert_eq!(updated["created_at"], item["created_at"]);

    let listed = server.request("GET", "/todos", None);
    assert_eq!(listed.status, 200);
    assert_eq!(listed.json(), json!([updated]));

    let deleted = server.request("DELETE", "/todos/1", None);
    assert_eq!(deleted.status, 204);
    assert!(deleted.body.is_empty());

    let gone = server.request("GET", "/todos/1", None);
    assert_eq!(gone.status, 404);
    assert_eq!(gone.json(), json!({"detail": "ToDo with ID:1 not found"}));
}

#[test]
fn e2e_rejects_empty_title() {
    let server = common::Server::start();

    let rejected = server.request("POST", "/todos", Some(r#"{"title":""}"#));
    assert_eq!(rejected.status, 422);
    assert!(rejected.json()["detail"].is_string());

    let listed = server.request("GET", "/todos", None);
    assert_eq!(listed.json(), json!([]));
}

#[test]
fn e2e_ids_stay_unique_after_delete() {
    let server = common::Server::start();

    let first = server.request("POST", "/todos", Some(r#"{"title":"a"}"#)).json();
    server.request("DELETE", &format!("/todos/{}", first["id"]), None);
    let second = server.request("POST", "/todos", Some(r#"{"title":"b"}"#)).json();

    assert_ne!(first["id"], second["id"]);
}
