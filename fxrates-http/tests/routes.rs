use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use fxrates_core::config::ImportConfig;
use fxrates_core::{CurrencySeries, DenseRate, RateCache};
use fxrates_engine::{CatalogService, ImportEngine, PlainQueryEngine};
use fxrates_http::{build_router, AppState};
use fxrates_mock::{FakeProviderAdapter, InMemoryStore};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

#[derive(Default)]
struct NoopCache;

#[async_trait]
impl RateCache for NoopCache {
    async fn lookup(&self, _key: &str) -> Option<Vec<DenseRate>> {
        None
    }
    async fn store(&self, _key: &str, _value: Vec<DenseRate>) {}
    async fn evict_all(&self) {}
}

async fn test_state() -> (AppState, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let provider = Arc::new(FakeProviderAdapter::new());
    let catalog = Arc::new(CatalogService::new(store.clone(), provider.clone()));
    let query_engine = Arc::new(PlainQueryEngine::new(store.clone()));
    let import_engine = Arc::new(ImportEngine::new(
        store.clone(),
        provider,
        Arc::new(NoopCache),
        ImportConfig::default(),
    ));
    (AppState::new(catalog, query_engine, import_engine), store)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn create_then_list_currencies_round_trips() {
    let (state, _) = test_state().await;
    let router = build_router(state);

    let create_req = Request::post("/v1/admin/currencies")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"currencyCode": "EUR", "providerSeriesId": "DEXUSEU", "enabled": true})
                .to_string(),
        ))
        .unwrap();
    let create_resp = router.clone().oneshot(create_req).await.unwrap();
    assert_eq!(create_resp.status(), StatusCode::CREATED);
    assert!(create_resp.headers().get("location").is_some());
    let created = body_json(create_resp).await;
    assert_eq!(created["currencyCode"], "EUR");

    let list_req = Request::get("/v1/currencies?enabledOnly=true").body(Body::empty()).unwrap();
    let list_resp = router.oneshot(list_req).await.unwrap();
    assert_eq!(list_resp.status(), StatusCode::OK);
    let body = body_json(list_resp).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_currency_code_returns_422_with_stable_code() {
    let (state, store) = test_state().await;
    let now = chrono::Utc::now();
    store
        .seed_series(CurrencySeries {
            id: 0,
            currency_code: "EUR".to_string(),
            provider_series_id: "DEXUSEU".to_string(),
            enabled: true,
            created_at: now,
            updated_at: now,
        })
        .await;
    let router = build_router(state);

    let req = Request::post("/v1/admin/currencies")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"currencyCode": "EUR", "providerSeriesId": "DEXUSEU2"}).to_string(),
        ))
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(resp).await;
    assert_eq!(body["type"], "APPLICATION_ERROR");
    assert_eq!(body["code"], "DUPLICATE_CURRENCY_CODE");
}

#[tokio::test]
async fn put_toggles_enabled_and_get_reflects_it() {
    let (state, store) = test_state().await;
    let now = chrono::Utc::now();
    let series = store
        .seed_series(CurrencySeries {
            id: 0,
            currency_code: "EUR".to_string(),
            provider_series_id: "DEXUSEU".to_string(),
            enabled: false,
            created_at: now,
            updated_at: now,
        })
        .await;
    let router = build_router(state);

    let put_req = Request::put(format!("/v1/admin/currencies/{}", series.id))
        .header("content-type", "application/json")
        .body(Body::from(json!({"enabled": true}).to_string()))
        .unwrap();
    let put_resp = router.clone().oneshot(put_req).await.unwrap();
    assert_eq!(put_resp.status(), StatusCode::OK);
    let updated = body_json(put_resp).await;
    assert_eq!(updated["enabled"], true);

    let get_req = Request::get(format!("/v1/admin/currencies/{}", series.id))
        .body(Body::empty())
        .unwrap();
    let get_resp = router.oneshot(get_req).await.unwrap();
    let fetched = body_json(get_resp).await;
    assert_eq!(fetched["enabled"], true);
}

#[tokio::test]
async fn unknown_currency_id_returns_404() {
    let (state, _) = test_state().await;
    let router = build_router(state);

    let req = Request::get("/v1/admin/currencies/999").body(Body::empty()).unwrap();
    let resp = router.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn exchange_rates_for_unknown_currency_returns_422() {
    let (state, _) = test_state().await;
    let router = build_router(state);

    let req = Request::get("/v1/exchange-rates?targetCurrency=ZZZ")
        .body(Body::empty())
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(resp).await;
    assert_eq!(body["code"], "CURRENCY_NOT_ENABLED");
}

#[tokio::test]
async fn exchange_rates_with_start_after_end_returns_400() {
    let (state, store) = test_state().await;
    let now = chrono::Utc::now();
    store
        .seed_series(CurrencySeries {
            id: 0,
            currency_code: "EUR".to_string(),
            provider_series_id: "DEXUSEU".to_string(),
            enabled: true,
            created_at: now,
            updated_at: now,
        })
        .await;
    let router = build_router(state);

    let req = Request::get("/v1/exchange-rates?targetCurrency=EUR&startDate=2024-01-05&endDate=2024-01-02")
        .body(Body::empty())
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
