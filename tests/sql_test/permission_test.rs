use access_control::adapter::PgPermissionSource;
use access_control::metrics::AccessControlMetrics;
use access_control::{Action, ReloadOutcome};
use database::permission::{
  delete_permission, select_all_permissions, select_permissions_for_role, upsert_permission,
};
use database_entity::dto::{DeletePermissionParams, UpsertPermissionParams};
use prometheus_client::registry::Registry;
use sqlx::PgPool;
use std::sync::Arc;

use crate::util::test_resolver;

async fn setup_db(pool: &PgPool) -> anyhow::Result<()> {
  sqlx::migrate!("./migrations")
    .set_ignore_missing(true)
    .run(pool)
    .await?;
  Ok(())
}

fn upsert_params(
  user_id: Option<i64>,
  role: &str,
  page: &str,
  flags: (bool, bool, bool),
) -> UpsertPermissionParams {
  UpsertPermissionParams {
    user_id,
    role: role.to_string(),
    page: page.to_string(),
    can_create: flags.0,
    can_edit: flags.1,
    can_delete: flags.2,
  }
}

#[sqlx::test(migrations = false)]
#[ignore = "requires a postgres database at DATABASE_URL"]
async fn upsert_permission_updates_existing_scope(pool: PgPool) {
  setup_db(&pool).await.unwrap();

  let first = upsert_permission(&pool, &upsert_params(None, "staff", "ready", (true, true, false)))
    .await
    .unwrap();
  let second = upsert_permission(&pool, &upsert_params(None, "staff", "ready", (false, true, false)))
    .await
    .unwrap();
  assert_eq!(first.id, second.id);
  assert!(!second.can_create);

  // a user scoped row lives next to the role level row
  let user_row = upsert_permission(
    &pool,
    &upsert_params(Some(7), "staff", "ready", (true, true, true)),
  )
  .await
  .unwrap();
  assert_ne!(user_row.id, first.id);

  let rows = select_permissions_for_role(&pool, "staff").await.unwrap();
  assert_eq!(rows.len(), 2);
  assert_eq!(rows[0].user_id, None);
  assert_eq!(rows[1].user_id, Some(7));
}

#[sqlx::test(migrations = false)]
#[ignore = "requires a postgres database at DATABASE_URL"]
async fn delete_user_row_keeps_role_row(pool: PgPool) {
  setup_db(&pool).await.unwrap();
  upsert_permission(&pool, &upsert_params(None, "staff", "ready", (true, true, false)))
    .await
    .unwrap();
  upsert_permission(
    &pool,
    &upsert_params(Some(7), "staff", "ready", (true, true, true)),
  )
  .await
  .unwrap();

  let deleted = delete_permission(
    &pool,
    &DeletePermissionParams {
      user_id: Some(7),
      role: "staff".to_string(),
      page: "ready".to_string(),
    },
  )
  .await
  .unwrap();
  assert_eq!(deleted, 1);

  let rows = select_all_permissions(&pool).await.unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].user_id, None);
}

#[sqlx::test(migrations = false)]
#[ignore = "requires a postgres database at DATABASE_URL"]
async fn resolver_reads_permissions_table(pool: PgPool) {
  setup_db(&pool).await.unwrap();
  upsert_permission(&pool, &upsert_params(None, "staff", "ready", (false, true, false)))
    .await
    .unwrap();

  let mut registry = Registry::default();
  let metrics = Arc::new(AccessControlMetrics::register(&mut registry));
  let resolver = test_resolver(Arc::new(PgPermissionSource::new(pool.clone())), metrics);
  resolver.initialize().await;
  assert!(resolver.are_permissions_loaded());

  // live row beats the fallback matrix, which grants create
  assert!(
    !resolver
      .can_perform_action("staff", "ready", Action::Create, None)
      .await
  );

  upsert_permission(&pool, &upsert_params(None, "staff", "ready", (true, true, false)))
    .await
    .unwrap();
  let outcome = resolver.reload_permissions().await.unwrap();
  assert_eq!(outcome, ReloadOutcome::Applied { entries: 3 });
  assert!(
    resolver
      .can_perform_action("staff", "ready", Action::Create, None)
      .await
  );
}
