use app_error::AppError;
use database_entity::dto::{DeletePermissionParams, UpsertPermissionParams};
use database_entity::pg_row::AFPermissionRow;
use sqlx::{Executor, PgPool, Postgres};

/// Channel the `role_permissions` trigger publishes row changes on.
pub const ROLE_PERMISSION_CHANNEL: &str = "role_permission_channel";

/// Loads the whole `role_permissions` table. No filter is applied; the access control layer
/// keeps the full table in memory.
pub async fn select_all_permissions(pg_pool: &PgPool) -> Result<Vec<AFPermissionRow>, AppError> {
  let rows = sqlx::query_as::<_, AFPermissionRow>(
    r#"
      SELECT id, user_id, role, page, can_create, can_edit, can_delete, updated_at
      FROM public.role_permissions
      ORDER BY role, page, user_id NULLS FIRST
    "#,
  )
  .fetch_all(pg_pool)
  .await?;
  Ok(rows)
}

pub async fn select_permissions_for_role(
  pg_pool: &PgPool,
  role: &str,
) -> Result<Vec<AFPermissionRow>, AppError> {
  let rows = sqlx::query_as::<_, AFPermissionRow>(
    r#"
      SELECT id, user_id, role, page, can_create, can_edit, can_delete, updated_at
      FROM public.role_permissions
      WHERE role = $1
      ORDER BY page, user_id NULLS FIRST
    "#,
  )
  .bind(role)
  .fetch_all(pg_pool)
  .await?;
  Ok(rows)
}

/// Inserts the row, or updates the three flags when a row already exists for the same
/// `(role, page, user_id)`.
pub async fn upsert_permission<'a, E>(
  executor: E,
  params: &UpsertPermissionParams,
) -> Result<AFPermissionRow, AppError>
where
  E: Executor<'a, Database = Postgres>,
{
  let row = sqlx::query_as::<_, AFPermissionRow>(
    r#"
      INSERT INTO public.role_permissions (user_id, role, page, can_create, can_edit, can_delete)
      VALUES ($1, $2, $3, $4, $5, $6)
      ON CONFLICT (role, page, (COALESCE(user_id, 0)))
      DO UPDATE SET
        can_create = EXCLUDED.can_create,
        can_edit = EXCLUDED.can_edit,
        can_delete = EXCLUDED.can_delete,
        updated_at = NOW()
      RETURNING id, user_id, role, page, can_create, can_edit, can_delete, updated_at
    "#,
  )
  .bind(params.user_id)
  .bind(&params.role)
  .bind(&params.page)
  .bind(params.can_create)
  .bind(params.can_edit)
  .bind(params.can_delete)
  .fetch_one(executor)
  .await?;
  Ok(row)
}

/// Returns the number of deleted rows. A user scoped delete never touches the role level row.
pub async fn delete_permission<'a, E>(
  executor: E,
  params: &DeletePermissionParams,
) -> Result<u64, AppError>
where
  E: Executor<'a, Database = Postgres>,
{
  let result = sqlx::query(
    r#"
      DELETE FROM public.role_permissions
      WHERE role = $1
        AND page = $2
        AND COALESCE(user_id, 0) = COALESCE($3::BIGINT, 0)
    "#,
  )
  .bind(&params.role)
  .bind(&params.page)
  .bind(params.user_id)
  .execute(executor)
  .await?;
  Ok(result.rows_affected())
}
