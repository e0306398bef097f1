use actix_web::web::{self, Data, Json, Query};
use actix_web::{Result, Scope};
use database_entity::dto::{DeletePermissionParams, UpsertPermissionParams};
use database_entity::pg_row::AFPermissionRow;
use serde::Deserialize;
use shared_entity::dto::permission_dto::{
  CheckPermissionQuery, CheckPermissionResponse, DeletePermissionResponse,
  PermissionSnapshotResponse, PermissionStatusResponse, ReloadPermissionResponse,
};
use shared_entity::response::{AppResponse, JsonAppResponse};

use crate::biz::permission::{
  check_permission, delete_permission_and_reload, get_permission_snapshot, get_permission_status,
  list_permissions, reload, require_admin, upsert_permission_and_reload,
};
use crate::biz::session::SessionUser;
use crate::state::AppState;

pub fn permission_scope() -> Scope {
  web::scope("/api/permission")
    .service(
      web::resource("")
        .route(web::get().to(list_permissions_handler))
        .route(web::put().to(upsert_permission_handler))
        .route(web::delete().to(delete_permission_handler)),
    )
    .service(web::resource("/check").route(web::get().to(check_permission_handler)))
    .service(web::resource("/snapshot").route(web::get().to(snapshot_handler)))
    .service(web::resource("/status").route(web::get().to(status_handler)))
    .service(web::resource("/reload").route(web::post().to(reload_handler)))
}

#[derive(Debug, Deserialize)]
struct ListPermissionQuery {
  role: Option<String>,
}

#[tracing::instrument(skip(state), err)]
async fn check_permission_handler(
  user: SessionUser,
  query: Query<CheckPermissionQuery>,
  state: Data<AppState>,
) -> Result<JsonAppResponse<CheckPermissionResponse>> {
  let allowed = check_permission(
    &state.permission_resolver,
    &user,
    &query.page,
    &query.action,
  )
  .await;
  Ok(Json(
    AppResponse::Ok().with_data(CheckPermissionResponse { allowed }),
  ))
}

async fn snapshot_handler(
  user: SessionUser,
  state: Data<AppState>,
) -> Result<JsonAppResponse<PermissionSnapshotResponse>> {
  let snapshot = get_permission_snapshot(&state.permission_resolver, &user);
  Ok(Json(AppResponse::Ok().with_data(snapshot)))
}

async fn status_handler(
  _user: SessionUser,
  state: Data<AppState>,
) -> Result<JsonAppResponse<PermissionStatusResponse>> {
  let status = get_permission_status(&state.permission_resolver);
  Ok(Json(AppResponse::Ok().with_data(status)))
}

#[tracing::instrument(skip(state), err)]
async fn reload_handler(
  user: SessionUser,
  state: Data<AppState>,
) -> Result<JsonAppResponse<ReloadPermissionResponse>> {
  require_admin(&state.permission_resolver, &user)?;
  let resp = reload(&state.permission_resolver).await?;
  Ok(Json(AppResponse::Ok().with_data(resp)))
}

async fn list_permissions_handler(
  user: SessionUser,
  query: Query<ListPermissionQuery>,
  state: Data<AppState>,
) -> Result<JsonAppResponse<Vec<AFPermissionRow>>> {
  require_admin(&state.permission_resolver, &user)?;
  let rows = list_permissions(&state.pg_pool, query.role.as_deref()).await?;
  Ok(Json(AppResponse::Ok().with_data(rows)))
}

#[tracing::instrument(skip(state), err)]
async fn upsert_permission_handler(
  user: SessionUser,
  params: Json<UpsertPermissionParams>,
  state: Data<AppState>,
) -> Result<JsonAppResponse<AFPermissionRow>> {
  require_admin(&state.permission_resolver, &user)?;
  let row =
    upsert_permission_and_reload(&state.pg_pool, &state.permission_resolver, &params).await?;
  Ok(Json(AppResponse::Ok().with_data(row)))
}

#[tracing::instrument(skip(state), err)]
async fn delete_permission_handler(
  user: SessionUser,
  params: Json<DeletePermissionParams>,
  state: Data<AppState>,
) -> Result<JsonAppResponse<DeletePermissionResponse>> {
  require_admin(&state.permission_resolver, &user)?;
  let deleted =
    delete_permission_and_reload(&state.pg_pool, &state.permission_resolver, &params).await?;
  Ok(Json(
    AppResponse::Ok().with_data(DeletePermissionResponse { deleted }),
  ))
}
