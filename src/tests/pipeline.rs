use crate::{
    GuestFilter, InventoryResolver, ProxmoxError, ResolveRequest, Template, ValidationConfig,
    core::infrastructure::{api_client::tests::create_authenticated_client, dns::MockHostResolver},
};
use serde_json::{Value, json};
use std::sync::Arc;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

async fn mount_get(mock_server: &MockServer, api_path: &str, data: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/api2/json/{}", api_path)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": data})))
        .mount(mock_server)
        .await;
}

async fn mount_cluster(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api2/json/cluster/resources"))
        .and(query_param("type", "vm"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"type": "qemu", "vmid": 100, "node": "pve1", "id": "qemu/100",
                 "status": "running", "name": "web1"},
                {"type": "lxc", "vmid": 201, "node": "pve1", "id": "lxc/201",
                 "status": "stopped", "name": "old"},
                {"type": "qemu", "vmid": 101, "node": "pve1", "id": "qemu/101",
                 "status": "running", "name": "app1"},
                {"type": "lxc", "vmid": 200, "node": "pve1", "id": "lxc/200",
                 "status": "running", "name": "ct1"},
                {"type": "storage", "node": "pve1", "id": "storage/pve1/local",
                 "status": "available"}
            ]
        })))
        .expect(1)
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api2/json/nodes/pve1/dns"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"search": "lab.example.net", "dns1": "192.0.2.53"}
        })))
        .expect(1)
        .mount(mock_server)
        .await;

    mount_get(
        mock_server,
        "nodes/pve1/qemu/100/config",
        json!({
            "name": "web1",
            "net0": "virtio=AA:BB:CC:DD:EE:00,bridge=vmbr0",
            "ipconfig0": "ip=192.0.2.10/24,gw=192.0.2.1"
        }),
    )
    .await;
    mount_get(
        mock_server,
        "nodes/pve1/qemu/101/config",
        json!({
            "name": "app1",
            "net0": "virtio=AA:BB:CC:DD:EE:01,bridge=vmbr0",
            "ipconfig0": "ip=dhcp"
        }),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/api2/json/nodes/pve1/qemu/101/agent/network-get-interfaces"))
        .respond_with(ResponseTemplate::new(500).set_body_string("QEMU guest agent is not running"))
        .mount(mock_server)
        .await;
    mount_get(
        mock_server,
        "nodes/pve1/lxc/200/config",
        json!({
            "hostname": "ct1",
            "net0": "name=eth0,bridge=vmbr0,hwaddr=BC:24:11:00:00:01,ip=dhcp,type=veth"
        }),
    )
    .await;
    mount_get(
        mock_server,
        "nodes/pve1/lxc/200/interfaces",
        json!([{"name": "eth0", "hwaddr": "bc:24:11:00:00:01", "inet": "192.0.2.30/24"}]),
    )
    .await;
}

fn failing_resolver() -> MockHostResolver {
    let mut resolver = MockHostResolver::new();
    resolver
        .expect_resolve()
        .withf(|host| host.to_string() == "app1.lab.example.net")
        .times(1)
        .returning(|host| Err(ProxmoxError::Resolution(format!("{} not found", host))));
    resolver
}

fn template(value: Value) -> Template {
    match value {
        Value::Object(map) => Template::new(map).unwrap(),
        _ => unreachable!("test templates are objects"),
    }
}

#[tokio::test]
async fn test_resolves_running_addressable_guests() {
    let mock_server = MockServer::start().await;
    mount_cluster(&mock_server).await;
    let client = create_authenticated_client(&mock_server).await;

    let resolver = InventoryResolver::default().with_resolver(Arc::new(failing_resolver()));
    let targets = resolver
        .resolve_with_client(
            &client,
            &template(json!({
                "name": "name",
                "uri": "net.0.ip",
                "facts": {"fqdn": "fqdn", "node": "node", "kind": "type", "pool": "pool"}
            })),
            GuestFilter::All,
        )
        .await
        .unwrap();

    assert_eq!(targets.len(), 2);

    assert_eq!(targets[0].name(), Some(&json!("web1")));
    assert_eq!(targets[0].uri(), Some(&json!("192.0.2.10")));
    let facts = targets[0].facts().unwrap();
    assert_eq!(facts["fqdn"], "web1.lab.example.net");
    assert_eq!(facts["node"], "pve1");
    assert_eq!(facts["kind"], "qemu");
    assert_eq!(facts["pool"], Value::Null);

    assert_eq!(targets[1].name(), Some(&json!("ct1")));
    assert_eq!(targets[1].uri(), Some(&json!("192.0.2.30")));
    assert_eq!(targets[1].facts().unwrap()["fqdn"], "ct1.lab.example.net");
}

#[tokio::test]
async fn test_type_filter_limits_guests() {
    let mock_server = MockServer::start().await;
    mount_cluster(&mock_server).await;
    let client = create_authenticated_client(&mock_server).await;

    let mut resolver = MockHostResolver::new();
    resolver.expect_resolve().never();
    let targets = InventoryResolver::default()
        .with_resolver(Arc::new(resolver))
        .resolve_with_client(&client, &template(json!({"uri": "fqdn"})), GuestFilter::Lxc)
        .await
        .unwrap();

    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].uri(), Some(&json!("ct1.lab.example.net")));
    assert_eq!(targets[0].name(), None);
}

#[tokio::test]
async fn test_template_is_validated_before_connecting() {
    let request: ResolveRequest = serde_json::from_value(json!({
        "host": "127.0.0.1",
        "port": 1,
        "token": "bolt@pve!inventory",
        "secret": "abc",
        "target_mapping": {"facts": {"fqdn": "fqdn"}}
    }))
    .unwrap();

    let err = InventoryResolver::new(ValidationConfig::default())
        .resolve_reference(request)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "bolt-plugin/validation-error");
    assert_eq!(
        err.message(),
        "You must provide a 'name' or 'uri' in 'target_mapping' for the Proxmox plugin"
    );
}

#[tokio::test]
async fn test_task_reports_missing_credentials() {
    let request: ResolveRequest = serde_json::from_value(json!({
        "host": "pve.example.com",
        "username": "bolt",
        "password": "s3cret",
        "target_mapping": {"name": "name"}
    }))
    .unwrap();

    let err = InventoryResolver::default().task(request).await.unwrap_err();
    assert!(matches!(err, ProxmoxError::Validation { .. }));
    assert_eq!(
        err.message(),
        "You must provide either 'username', 'password' and 'realm' or 'token' and 'secret' for the Proxmox plugin"
    );
}
