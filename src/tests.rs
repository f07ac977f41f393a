use crate::mcp::McpServer;
use crate::proxmox::{ApiMethod, Credentials, Params, ProxmoxClient, ProxmoxError, Secret};
use serde_json::{json, Value};
use axum::routing::post;
use axum::{Json, Router};
use axum_server::tls_rustls::RustlsConfig;
use std::net::{SocketAddr, TcpListener};
use std::time::Duration;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TICKET: &str = "PVE:root@pam:65F0AB12::sig";
const CSRF: &str = "65F0AB12:csrf";

fn client_for(server: &MockServer) -> ProxmoxClient {
    let creds = Credentials::with_password(&server.uri(), "root@pam", "secret");
    ProxmoxClient::new(creds).unwrap()
}

async fn mount_login(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/api2/json/access/ticket"))
        .and(body_string_contains("username=root%40pam"))
        .and(body_string_contains("password=secret"))
        .respond_with(login_response(TICKET, CSRF))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn tool_text(result: &Value) -> &str {
    result["content"][0]["text"].as_str().unwrap()
}

fn login_response(ticket: &str, csrf: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "data": { "ticket": ticket, "CSRFPreventionToken": csrf }
    }))
}

#[tokio::test]
async fn test_each_call_logs_in_and_sends_its_own_ticket() {
    let server = MockServer::start().await;

    // First login hands out T1, every later one T2.
    Mock::given(method("POST"))
        .and(path("/api2/json/access/ticket"))
        .respond_with(login_response("T1", "C1"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api2/json/access/ticket"))
        .respond_with(login_response("T2", "C2"))
        .expect(1)
        .mount(&server)
        .await;

    for (ticket, csrf, node) in [("T1", "C1", "pve1"), ("T2", "C2", "pve2")] {
        Mock::given(method("GET"))
            .and(path("/api2/json/nodes"))
            .and(header("Cookie", format!("PVEAuthCookie={}", ticket).as_str()))
            .and(header("CSRFPreventionToken", csrf))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "node": node }]
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = client_for(&server);
    let first = client.get_nodes().await.unwrap();
    assert_eq!(first[0]["node"], "pve1");
    let second = client.get_nodes().await.unwrap();
    assert_eq!(second[0]["node"], "pve2");
}

#[tokio::test]
async fn test_ticket_cache_reuses_session() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/api2/json/nodes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server).with_ticket_cache(Duration::from_secs(300));
    for _ in 0..3 {
        client.get_nodes().await.unwrap();
    }
}

#[tokio::test]
async fn test_unauthorized_drops_cached_ticket() {
    let server = MockServer::start().await;
    mount_login(&server, 2).await;

    Mock::given(method("GET"))
        .and(path("/api2/json/nodes"))
        .respond_with(ResponseTemplate::new(401).set_body_string(""))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api2/json/nodes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;

    let client = client_for(&server).with_ticket_cache(Duration::from_secs(300));
    let err = client.get_nodes().await.unwrap_err();
    assert_eq!(err.status().map(|s| s.as_u16()), Some(401));
    client.get_nodes().await.unwrap();
}

#[tokio::test]
async fn test_failed_login_never_reaches_target() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api2/json/access/ticket"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "data": null })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api2/json/nodes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(0)
        .mount(&server)
        .await;

    let err = client_for(&server).get_nodes().await.unwrap_err();
    assert!(matches!(err, ProxmoxError::Authentication(_)), "{:?}", err);
}

#[tokio::test]
async fn test_login_200_without_data_is_auth_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api2/json/access/ticket"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": null })))
        .mount(&server)
        .await;

    let err = client_for(&server).acquire_ticket().await.unwrap_err();
    assert!(matches!(err, ProxmoxError::Authentication(_)));
}

#[tokio::test]
async fn test_api_token_skips_login() {
    let server = MockServer::start().await;
    mount_login(&server, 0).await;

    Mock::given(method("GET"))
        .and(path("/api2/json/version"))
        .and(header("Authorization", "PVEAPIToken=root@pam!ci=uuid-1234"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "version": "8.2" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let creds = Credentials {
        secret: Secret::Token {
            name: "ci".to_string(),
            value: "uuid-1234".to_string(),
        },
        ..Credentials::with_password(&server.uri(), "root@pam", "")
    };
    let client = ProxmoxClient::new(creds).unwrap();
    let v = client
        .request_value(ApiMethod::Get, "version", None)
        .await
        .unwrap();
    assert_eq!(v["version"], "8.2");
}

#[tokio::test]
async fn test_error_body_becomes_api_error() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/api2/json/nodes/pve1/qemu"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "data": null,
            "errors": { "vmid": "VM 100 already exists" }
        })))
        .mount(&server)
        .await;

    let params = Params::new().set("vmid", 100u32);
    let err = client_for(&server)
        .request_value(ApiMethod::Post, "nodes/pve1/qemu", Some(&params))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "vmid: VM 100 already exists");
    assert_eq!(err.status().map(|s| s.as_u16()), Some(400));
}

#[tokio::test]
async fn test_delete_sends_query_not_body() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;

    Mock::given(method("DELETE"))
        .and(path("/api2/json/nodes/pve1/qemu/100"))
        .and(query_param("purge", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": "UPID:pve1:0000:qmdestroy"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mcp = McpServer::new(client_for(&server));
    let res = mcp
        .call_tool(
            "delete_vm",
            &json!({ "node": "pve1", "vmid": 100, "purge": true }),
        )
        .await
        .unwrap();
    assert_eq!(
        tool_text(&res),
        "Delete qemu initiated. UPID: UPID:pve1:0000:qmdestroy"
    );
}

#[tokio::test]
async fn test_post_sends_json_body() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/api2/json/nodes/pve1/qemu/100/snapshot"))
        .and(body_json(json!({ "snapname": "before-upgrade", "vmstate": "1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": "UPID:pve1:0001:qmsnapshot"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mcp = McpServer::new(client_for(&server));
    let res = mcp
        .call_tool(
            "snapshot_vm",
            &json!({ "node": "pve1", "vmid": "100", "snapname": "before-upgrade", "vmstate": true }),
        )
        .await
        .unwrap();
    assert!(res.get("isError").is_none());
    assert!(tool_text(&res).contains("UPID:pve1:0001:qmsnapshot"));
}

#[tokio::test]
async fn test_unreachable_host_is_api_error() {
    let creds = Credentials::with_password("http://127.0.0.1:1", "root@pam", "secret");
    let client = ProxmoxClient::new(creds).unwrap();
    let err = client.acquire_ticket().await.unwrap_err();
    assert!(matches!(err, ProxmoxError::Api { status: None, .. }), "{:?}", err);
}

#[tokio::test]
async fn test_reset_vm() {
    let server = MockServer::start().await;
    mount_login(&server, 2).await;

    Mock::given(method("GET"))
        .and(path("/api2/json/cluster/resources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "vmid": 100, "node": "pve1", "type": "qemu", "status": "running" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api2/json/nodes/pve1/qemu/100/status/reset"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": "UPID:pve1:0002:qmreset"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mcp = McpServer::new(client_for(&server));
    let res = mcp
        .call_tool("reset_vm", &json!({ "vm_id": "100" }))
        .await
        .unwrap();
    assert_eq!(tool_text(&res), "Reset initiated. UPID: UPID:pve1:0002:qmreset");
}

#[tokio::test]
async fn test_reset_container_reboots() {
    let server = MockServer::start().await;
    mount_login(&server, 2).await;

    Mock::given(method("GET"))
        .and(path("/api2/json/cluster/resources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "vmid": 200, "node": "pve1", "type": "lxc", "status": "running" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api2/json/nodes/pve1/lxc/200/status/reboot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": "UPID:pve1:0003:vzreboot"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mcp = McpServer::new(client_for(&server));
    let res = mcp
        .call_tool("reset_container", &json!({ "container_id": 200 }))
        .await
        .unwrap();
    assert!(tool_text(&res).starts_with("Reset initiated"));
}

#[tokio::test]
async fn test_reset_unknown_id_is_tool_error() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/api2/json/cluster/resources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;

    let mcp = McpServer::new(client_for(&server));
    let res = mcp
        .call_tool("reset_vm", &json!({ "vm_id": "999" }))
        .await
        .unwrap();
    assert_eq!(res["isError"], true);
    assert!(tool_text(&res).contains("999"));
}

#[tokio::test]
async fn test_reset_wrong_guest_type() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/api2/json/cluster/resources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "vmid": 200, "node": "pve1", "type": "lxc" }]
        })))
        .mount(&server)
        .await;

    let mcp = McpServer::new(client_for(&server));
    let res = mcp
        .call_tool("reset_vm", &json!({ "vmid": 200 }))
        .await
        .unwrap();
    assert_eq!(res["isError"], true);
    assert!(tool_text(&res).contains("ID 200 is not a qemu"));
}

#[tokio::test]
async fn test_remote_failure_is_reported_in_result() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/api2/json/nodes/pve1/qemu/100/status/start"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "errors": ["VM 100 is locked (backup)"]
        })))
        .mount(&server)
        .await;

    let mcp = McpServer::new(client_for(&server));
    let res = mcp
        .call_tool("start_vm", &json!({ "node": "pve1", "vmid": 100 }))
        .await
        .unwrap();
    assert_eq!(res["isError"], true);
    assert_eq!(
        tool_text(&res),
        "Error starting VM: VM 100 is locked (backup)"
    );
}

#[tokio::test]
async fn test_vms_resource_reads_cluster() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/api2/json/cluster/resources"))
        .and(query_param("type", "vm"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "vmid": 100, "name": "web", "node": "pve1", "type": "qemu", "status": "running" },
                { "id": "storage/pve1/local", "type": "storage", "node": "pve1" }
            ]
        })))
        .mount(&server)
        .await;

    let mcp = McpServer::new(client_for(&server));
    let resp = mcp
        .handle_message(
            r#"{"jsonrpc":"2.0","id":3,"method":"resources/read","params":{"uri":"proxmox://vms"}}"#,
        )
        .await
        .unwrap();
    let text = resp.result.unwrap()["contents"][0]["text"]
        .as_str()
        .unwrap()
        .to_string();
    let vms: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(vms.as_array().unwrap().len(), 1);
    assert_eq!(vms[0]["name"], "web");
}

/// Serves `access/ticket` over HTTPS with a freshly generated self-signed
/// certificate.
async fn start_self_signed_pve() -> SocketAddr {
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let config = RustlsConfig::from_pem(
        cert.cert.pem().into_bytes(),
        cert.key_pair.serialize_pem().into_bytes(),
    )
    .await
    .unwrap();

    let app = Router::new().route(
        "/api2/json/access/ticket",
        post(|| async {
            Json(json!({ "data": { "ticket": TICKET, "CSRFPreventionToken": CSRF } }))
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum_server::from_tcp_rustls(listener, config)
            .serve(app.into_make_service())
            .await
            .unwrap();
    });
    addr
}

fn tls_client(addr: SocketAddr, verify_tls: bool) -> ProxmoxClient {
    let creds = Credentials {
        port: addr.port(),
        verify_tls,
        ..Credentials::with_password("127.0.0.1", "root@pam", "secret")
    };
    ProxmoxClient::new(creds).unwrap()
}

#[tokio::test]
async fn test_self_signed_certificate_needs_opt_in() {
    let addr = start_self_signed_pve().await;

    let err = tls_client(addr, true).acquire_ticket().await.unwrap_err();
    assert!(matches!(err, ProxmoxError::Api { status: None, .. }), "{:?}", err);

    let ticket = tls_client(addr, false).acquire_ticket().await.unwrap();
    assert_eq!(ticket.ticket, TICKET);
    assert_eq!(ticket.csrf_token, CSRF);
}
