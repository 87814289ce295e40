//! End-to-end worker scenarios: provision, activate, route, serve.

use std::sync::Arc;

use shopshell_core::{Destination, Method, RequestContext, ShellConfig, StoredResponse, VersionTag};
use shopshell_engine::{
    presets, EngineError, EventOutcome, FetchOutcome, OpaquePolicy, PassthroughAllowlist,
    WorkerEvent, WorkerHost, WorkerState,
};
use shopshell_net::ScriptedGateway;
use shopshell_store::{normalize, CacheStorage, CacheStore, MemoryStorage};
use url::Url;

const SCOPE: &str = "https://shop.example.com/store/";

struct Harness {
    host: WorkerHost,
    storage: Arc<MemoryStorage>,
    gateway: Arc<ScriptedGateway>,
}

fn config() -> ShellConfig {
    ShellConfig::ms360(Url::parse(SCOPE).unwrap())
}

async fn harness() -> Harness {
    harness_with(config(), presets::amazon_images()).await
}

async fn harness_with(config: ShellConfig, allowlist: PassthroughAllowlist) -> Harness {
    let storage = Arc::new(MemoryStorage::new());
    let gateway = Arc::new(ScriptedGateway::new());
    for entry in [
        "",
        "index.html",
        "products.json",
        "manifest.json?v=6",
        "icon-192x192-v6.png",
        "icon-256x256-v6.png",
        "icon-512x512.png",
        "icon-180x180-v6.png",
    ] {
        let url = Url::parse(SCOPE).unwrap().join(entry).unwrap();
        gateway
            .stage_ok(url.as_str(), format!("shell:{entry}"))
            .await;
    }
    let host = WorkerHost::new(config, allowlist, storage.clone(), gateway.clone()).unwrap();
    Harness {
        host,
        storage,
        gateway,
    }
}

async fn install_and_activate(h: &Harness) {
    h.host.dispatch(WorkerEvent::Install).await.unwrap();
    h.host.dispatch(WorkerEvent::Activate).await.unwrap();
    assert_eq!(h.host.state().await, WorkerState::Active);
}

fn get(url: &str) -> RequestContext {
    RequestContext::get(Url::parse(url).unwrap())
}

async fn serve(h: &Harness, req: RequestContext) -> FetchOutcome {
    match h.host.dispatch(WorkerEvent::Fetch(req)).await.unwrap() {
        EventOutcome::Fetch(outcome) => outcome,
        other => panic!("unexpected outcome {other:?}"),
    }
}

fn served_body(outcome: FetchOutcome) -> Vec<u8> {
    match outcome {
        FetchOutcome::Served(served) => served.response.body,
        FetchOutcome::Unmanaged => panic!("expected a served response"),
    }
}

#[tokio::test]
async fn test_catalog_request_serves_network_and_fills_runtime_store() {
    let h = harness().await;
    install_and_activate(&h).await;

    let catalog = "https://shop.example.com/store/products.json?ts=1733";
    h.gateway.stage_ok(catalog, "[1,2,3]").await;

    let body = served_body(serve(&h, get(catalog)).await);
    assert_eq!(body, b"[1,2,3]");

    // Afterwards the runtime store holds the entry under the
    // query-stripped key.
    let runtime = h.storage.open(&config().runtime_tag()).await.unwrap();
    let stripped = normalize(&Url::parse(catalog).unwrap(), true);
    let stored = runtime.get(&stripped, false).await.unwrap().unwrap();
    assert_eq!(stored.body, b"[1,2,3]");
}

#[tokio::test]
async fn test_precached_asset_is_served_without_network() {
    let h = harness().await;
    install_and_activate(&h).await;

    let icon = "https://shop.example.com/store/icon-512x512.png";
    let precache_hits = h.gateway.hits(icon).await;

    let body = served_body(
        serve(&h, get(icon).with_destination(Destination::Image)).await,
    );
    assert_eq!(body, b"shell:icon-512x512.png");
    // Only the provisioning fetch ever reached the origin.
    assert_eq!(h.gateway.hits(icon).await, precache_hits);
}

#[tokio::test]
async fn test_cache_first_is_idempotent_for_runtime_misses() {
    let h = harness().await;
    install_and_activate(&h).await;

    let css = "https://shop.example.com/store/css/site.css";
    h.gateway.stage_ok(css, "body{}").await;

    let first = serve(&h, get(css)).await;
    let second = serve(&h, get(css)).await;
    assert_eq!(served_body(first), b"body{}");
    assert_eq!(served_body(second), b"body{}");
    assert_eq!(h.gateway.hits(css).await, 1);

    match serve(&h, get(css)).await {
        FetchOutcome::Served(served) => assert!(served.is_from_cache()),
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn test_query_busted_precache_entry_matches_stripped_lookup() {
    let h = harness().await;
    install_and_activate(&h).await;

    // Precached as `manifest.json?v=6`; requested without the buster.
    let manifest = "https://shop.example.com/store/manifest.json";
    let body = served_body(serve(&h, get(manifest)).await);
    assert_eq!(body, b"shell:manifest.json?v=6");
    assert_eq!(h.gateway.hits(manifest).await, 0);
}

#[tokio::test]
async fn test_activation_retires_every_foreign_version() {
    let h = harness().await;
    for stale in [
        "ms360-static-v8",
        "ms360-runtime-v8",
        "ms360-static-v7",
        "legacy-shop-static-v1",
    ] {
        let tag: VersionTag = stale.parse().unwrap();
        h.storage.open(&tag).await.unwrap();
    }

    install_and_activate(&h).await;

    let mut left: Vec<String> = h
        .storage
        .list_versions()
        .await
        .unwrap()
        .iter()
        .map(VersionTag::to_string)
        .collect();
    left.sort();
    assert_eq!(left, ["ms360-runtime-v9", "ms360-static-v9"]);
}

#[tokio::test]
async fn test_navigation_offline_serves_precached_shell() {
    let h = harness().await;
    install_and_activate(&h).await;
    h.gateway.set_offline(true).await;

    let nav = get("https://shop.example.com/store/checkout?step=2").navigate();
    let outcome = serve(&h, nav).await;
    match outcome {
        FetchOutcome::Served(served) => {
            assert_eq!(served.response.body, b"shell:index.html");
            assert!(served.is_from_cache());
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn test_allowlisted_remote_image_is_never_stored() {
    let h = harness().await;
    install_and_activate(&h).await;

    let remote = "https://m.media-amazon.com/images/I/81x.jpg";
    h.gateway.stage_ok(remote, "jpeg-bytes").await;

    let body = served_body(
        serve(&h, get(remote).with_destination(Destination::Image)).await,
    );
    assert_eq!(body, b"jpeg-bytes");

    // The fetch succeeded yet no store anywhere holds the URL.
    for tag in h.storage.list_versions().await.unwrap() {
        let store = h.storage.open(&tag).await.unwrap();
        let keys = store.keys().await.unwrap();
        assert!(
            keys.iter().all(|k| !k.as_str().contains("media-amazon")),
            "remote image leaked into {tag}"
        );
    }
}

#[tokio::test]
async fn test_opaque_opt_in_host_is_served_from_cache_on_repeat() {
    let allowlist = presets::amazon_images()
        .allow_host_with("img.partner.example", OpaquePolicy::CacheOpaque);
    let h = harness_with(config(), allowlist).await;
    install_and_activate(&h).await;

    let remote = "https://img.partner.example/banner.png";
    h.gateway
        .stage(remote, StoredResponse::opaque(vec![1, 2, 3]))
        .await;

    let first = served_body(
        serve(&h, get(remote).with_destination(Destination::Image)).await,
    );
    let second = served_body(
        serve(&h, get(remote).with_destination(Destination::Image)).await,
    );
    assert_eq!(first, vec![1, 2, 3]);
    assert_eq!(second, vec![1, 2, 3]);
    assert_eq!(h.gateway.hits(remote).await, 1);
}

#[tokio::test]
async fn test_non_get_and_foreign_requests_are_unmanaged() {
    let h = harness().await;
    install_and_activate(&h).await;
    let before = h.gateway.total_hits().await;

    let post = RequestContext::new(
        Method::Post,
        Url::parse("https://shop.example.com/store/cart").unwrap(),
    );
    assert!(matches!(serve(&h, post).await, FetchOutcome::Unmanaged));

    let foreign = get("https://tracker.elsewhere.net/pixel.gif");
    assert!(matches!(serve(&h, foreign).await, FetchOutcome::Unmanaged));

    // Unmanaged requests trigger no fetch and no store traffic.
    assert_eq!(h.gateway.total_hits().await, before);
}

#[tokio::test]
async fn test_fetch_before_activation_is_rejected() {
    let h = harness().await;
    h.host.dispatch(WorkerEvent::Install).await.unwrap();

    let err = h
        .host
        .dispatch(WorkerEvent::Fetch(get(
            "https://shop.example.com/store/css/site.css",
        )))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotActive));
}

#[tokio::test]
async fn test_skip_waiting_message_short_circuits_the_gate() {
    let h = harness().await;
    h.host.lifecycle().hold_for_previous();
    h.host.dispatch(WorkerEvent::Install).await.unwrap();

    let err = h.host.dispatch(WorkerEvent::Activate).await.unwrap_err();
    assert!(matches!(err, EngineError::ActivationDeferred));

    let msg = serde_json::from_str(r#"{"type":"SKIP_WAITING"}"#).unwrap();
    h.host
        .dispatch(WorkerEvent::Message(msg))
        .await
        .unwrap();
    assert_eq!(h.host.state().await, WorkerState::Active);
}

#[tokio::test]
async fn test_provisioning_failure_keeps_previous_generation_authoritative() {
    // v9 provisions and activates normally.
    let h = harness().await;
    install_and_activate(&h).await;

    // v10 cannot fetch one shell asset.
    let next = ShellConfig::new("ms360", 10, Url::parse(SCOPE).unwrap())
        .with_precache(["index.html", "brand-new.css"]);
    let host10 = WorkerHost::new(
        next,
        presets::amazon_images(),
        h.storage.clone(),
        h.gateway.clone(),
    )
    .unwrap();

    let err = host10.dispatch(WorkerEvent::Install).await.unwrap_err();
    assert!(matches!(err, EngineError::ProvisioningFailed(_)));
    assert_eq!(host10.state().await, WorkerState::Superseded);

    // The failed generation left nothing behind and v9 still serves.
    let mut left: Vec<String> = h
        .storage
        .list_versions()
        .await
        .unwrap()
        .iter()
        .map(VersionTag::to_string)
        .collect();
    left.sort();
    assert_eq!(left, ["ms360-runtime-v9", "ms360-static-v9"]);

    let icon = "https://shop.example.com/store/icon-512x512.png";
    let body = served_body(serve(&h, get(icon).with_destination(Destination::Image)).await);
    assert_eq!(body, b"shell:icon-512x512.png");
}

#[tokio::test]
async fn test_retired_generation_stops_intercepting() {
    let h = harness().await;
    install_and_activate(&h).await;

    h.host.retire().await;
    assert_eq!(h.host.state().await, WorkerState::Superseded);

    let err = h
        .host
        .dispatch(WorkerEvent::Fetch(get(
            "https://shop.example.com/store/css/site.css",
        )))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotActive));
}
