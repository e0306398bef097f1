use access_control::entity::PermissionRecord;
use actix_web::web::Data;
use actix_web::{test, App};
use app_error::ErrorCode;
use bizadmin_cloud::api::metrics::metrics_scope;
use bizadmin_cloud::api::permission::permission_scope;
use bizadmin_cloud::state::AppState;
use shared_entity::dto::permission_dto::{
  CheckPermissionResponse, PermissionSnapshotResponse, PermissionStatusResponse,
  ReloadPermissionResponse,
};
use shared_entity::response::AppResponse;

use crate::util::{session_header, test_state, MemoryPermissionSource};

macro_rules! init_app {
  ($state:expr) => {
    test::init_service(
      App::new()
        .app_data(Data::new($state.metrics.registry.clone()))
        .app_data(Data::new($state.clone()))
        .service(permission_scope())
        .service(metrics_scope()),
    )
    .await
  };
}

fn live_rows() -> Vec<PermissionRecord> {
  vec![
    PermissionRecord::for_role("staff", "ready", false, true, false),
    PermissionRecord::for_role("finance", "payment", true, true, false),
    PermissionRecord::for_user(42, "staff", "payment", true, false, false),
  ]
}

async fn loaded_state() -> AppState {
  let state = test_state(MemoryPermissionSource::new(live_rows()));
  state.permission_resolver.initialize().await;
  state
}

#[actix_web::test]
async fn check_answers_from_live_table() {
  let state = loaded_state().await;
  let app = init_app!(state);

  // live row says no even though the fallback matrix grants it
  let req = test::TestRequest::get()
    .uri("/api/permission/check?page=ready&action=create")
    .insert_header(session_header(1, "staff"))
    .to_request();
  let resp: AppResponse<CheckPermissionResponse> = test::call_and_read_body_json(&app, req).await;
  assert!(resp.is_ok());
  assert!(!resp.into_data().unwrap().allowed);

  let req = test::TestRequest::get()
    .uri("/api/permission/check?page=ready&action=edit")
    .insert_header(session_header(1, "staff"))
    .to_request();
  let resp: AppResponse<CheckPermissionResponse> = test::call_and_read_body_json(&app, req).await;
  assert!(resp.into_data().unwrap().allowed);
}

#[actix_web::test]
async fn check_uses_user_entry_and_fallback() {
  let state = loaded_state().await;
  let app = init_app!(state);

  let req = test::TestRequest::get()
    .uri("/api/permission/check?page=payment&action=create")
    .insert_header(session_header(42, "staff"))
    .to_request();
  let resp: AppResponse<CheckPermissionResponse> = test::call_and_read_body_json(&app, req).await;
  assert!(resp.into_data().unwrap().allowed);

  // no live row for finance/ready, the fallback matrix denies
  let req = test::TestRequest::get()
    .uri("/api/permission/check?page=ready&action=create")
    .insert_header(session_header(3, "finance"))
    .to_request();
  let resp: AppResponse<CheckPermissionResponse> = test::call_and_read_body_json(&app, req).await;
  assert!(!resp.into_data().unwrap().allowed);
}

#[actix_web::test]
async fn check_unknown_action_is_denied() {
  let state = loaded_state().await;
  let app = init_app!(state);

  let req = test::TestRequest::get()
    .uri("/api/permission/check?page=ready&action=approve")
    .insert_header(session_header(1, "manager"))
    .to_request();
  let resp: AppResponse<CheckPermissionResponse> = test::call_and_read_body_json(&app, req).await;
  assert!(resp.is_ok());
  assert!(!resp.into_data().unwrap().allowed);
}

#[actix_web::test]
async fn admin_passes_any_check() {
  let state = test_state(MemoryPermissionSource::new(vec![]));
  let app = init_app!(state);

  let req = test::TestRequest::get()
    .uri("/api/permission/check?page=anything&action=delete")
    .insert_header(session_header(1, "super_admin"))
    .to_request();
  let resp: AppResponse<CheckPermissionResponse> = test::call_and_read_body_json(&app, req).await;
  assert!(resp.into_data().unwrap().allowed);
}

#[actix_web::test]
async fn missing_session_header_is_not_logged_in() {
  let state = loaded_state().await;
  let app = init_app!(state);

  let req = test::TestRequest::get()
    .uri("/api/permission/check?page=ready&action=edit")
    .to_request();
  let resp: AppResponse<CheckPermissionResponse> = test::call_and_read_body_json(&app, req).await;
  assert_eq!(resp.code, ErrorCode::NotLoggedIn);
  assert!(resp.data.is_none());
}

#[actix_web::test]
async fn snapshot_lists_effective_flags() {
  let state = loaded_state().await;
  let app = init_app!(state);

  let req = test::TestRequest::get()
    .uri("/api/permission/snapshot")
    .insert_header(session_header(42, "staff"))
    .to_request();
  let resp: AppResponse<PermissionSnapshotResponse> =
    test::call_and_read_body_json(&app, req).await;
  let snapshot = resp.into_data().unwrap();
  assert_eq!(snapshot.role, "staff");
  assert!(snapshot.loaded);
  assert_eq!(snapshot.entries.get("ready|create"), Some(&false));
  assert_eq!(snapshot.entries.get("ready|edit"), Some(&true));
  assert_eq!(snapshot.entries.get("payment|create"), Some(&true));
  // pages only known to the fallback matrix are listed too
  assert_eq!(snapshot.entries.get("petty_cash|create"), Some(&true));
  assert_eq!(snapshot.entries.get("petty_cash|delete"), Some(&false));
}

#[actix_web::test]
async fn status_reports_unloaded_cache() {
  let state = test_state(MemoryPermissionSource::new(vec![]));
  state.permission_resolver.initialize().await;
  let app = init_app!(state);

  let req = test::TestRequest::get()
    .uri("/api/permission/status")
    .insert_header(session_header(1, "staff"))
    .to_request();
  let resp: AppResponse<PermissionStatusResponse> = test::call_and_read_body_json(&app, req).await;
  let status = resp.into_data().unwrap();
  assert!(!status.loaded);
  assert_eq!(status.entries, 0);
}

#[actix_web::test]
async fn reload_requires_admin_role() {
  let state = loaded_state().await;
  let app = init_app!(state);

  let req = test::TestRequest::post()
    .uri("/api/permission/reload")
    .insert_header(session_header(1, "manager"))
    .to_request();
  let resp: AppResponse<ReloadPermissionResponse> = test::call_and_read_body_json(&app, req).await;
  assert_eq!(resp.code, ErrorCode::NotEnoughPermissions);
}

#[actix_web::test]
async fn admin_reload_picks_up_table_changes() {
  let source = MemoryPermissionSource::new(live_rows());
  let state = test_state(source.clone());
  state.permission_resolver.initialize().await;
  let app = init_app!(state);

  source.set_rows(vec![PermissionRecord::for_role(
    "staff", "ready", true, true, true,
  )]);
  let req = test::TestRequest::post()
    .uri("/api/permission/reload")
    .insert_header(session_header(1, "admin"))
    .to_request();
  let resp: AppResponse<ReloadPermissionResponse> = test::call_and_read_body_json(&app, req).await;
  let reload = resp.into_data().unwrap();
  assert!(reload.applied);
  assert_eq!(reload.entries, 3);

  let req = test::TestRequest::get()
    .uri("/api/permission/check?page=ready&action=delete")
    .insert_header(session_header(1, "staff"))
    .to_request();
  let resp: AppResponse<CheckPermissionResponse> = test::call_and_read_body_json(&app, req).await;
  assert!(resp.into_data().unwrap().allowed);
}

#[actix_web::test]
async fn failed_reload_is_reported_with_code() {
  let source = MemoryPermissionSource::new(live_rows());
  let state = test_state(source.clone());
  state.permission_resolver.initialize().await;
  let app = init_app!(state);

  source.set_fail(true);
  let req = test::TestRequest::post()
    .uri("/api/permission/reload")
    .insert_header(session_header(1, "admin"))
    .to_request();
  let resp: AppResponse<ReloadPermissionResponse> = test::call_and_read_body_json(&app, req).await;
  assert_eq!(resp.code, ErrorCode::PermissionSourceUnavailable);

  // the explicit reload cleared the cache, so checks fall back to the matrix
  let req = test::TestRequest::get()
    .uri("/api/permission/check?page=ready&action=create")
    .insert_header(session_header(1, "staff"))
    .to_request();
  let resp: AppResponse<CheckPermissionResponse> = test::call_and_read_body_json(&app, req).await;
  assert!(resp.into_data().unwrap().allowed);
}

#[actix_web::test]
async fn list_permissions_requires_admin_role() {
  let state = loaded_state().await;
  let app = init_app!(state);

  let req = test::TestRequest::get()
    .uri("/api/permission")
    .insert_header(session_header(1, "finance"))
    .to_request();
  let resp: AppResponse<serde_json::Value> = test::call_and_read_body_json(&app, req).await;
  assert_eq!(resp.code, ErrorCode::NotEnoughPermissions);
}

#[actix_web::test]
async fn metrics_expose_access_control_gauges() {
  let state = loaded_state().await;
  let app = init_app!(state);

  let req = test::TestRequest::get().uri("/metrics").to_request();
  let body = test::call_and_read_body(&app, req).await;
  let body = String::from_utf8(body.to_vec()).unwrap();
  assert!(body.contains("ac_total_check_count"));
  assert!(body.contains("ac_cached_entries"));
}

#[actix_web::test]
async fn write_with_non_positive_user_id_is_rejected() {
  let state = loaded_state().await;
  let app = init_app!(state);

  let req = test::TestRequest::put()
    .uri("/api/permission")
    .insert_header(session_header(1, "admin"))
    .set_json(serde_json::json!({
      "user_id": 0, "role": "staff", "page": "ready", "can_create": true
    }))
    .to_request();
  let resp: AppResponse<serde_json::Value> = test::call_and_read_body_json(&app, req).await;
  assert_eq!(resp.code, ErrorCode::InvalidRequest);

  let req = test::TestRequest::delete()
    .uri("/api/permission")
    .insert_header(session_header(1, "admin"))
    .set_json(serde_json::json!({ "user_id": 0, "role": "staff", "page": "ready" }))
    .to_request();
  let resp: AppResponse<serde_json::Value> = test::call_and_read_body_json(&app, req).await;
  assert_eq!(resp.code, ErrorCode::InvalidRequest);
}
