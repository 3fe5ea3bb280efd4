//! Database connection pool, migrations and tenant schema provisioning.
//!
//! The `public` schema holds the tenant registry and platform API keys and is
//! managed by sqlx migrations. Each tenant gets its own schema created from
//! an embedded SQL template when the tenant is provisioned.

use crate::models::tenant::TenantSchema;
use sqlx::{Executor, PgConnection, Pool, Postgres};

/// Type alias for PostgreSQL connection pool.
pub type DbPool = Pool<Postgres>;

/// DDL for one tenant schema; `{schema}` is substituted with the quoted name.
const TENANT_SCHEMA_TEMPLATE: &str = include_str!("../sql/tenant_schema.sql");

/// Create a new PostgreSQL connection pool.
///
/// # Errors
///
/// Returns an error if:
/// - Database connection string is invalid
/// - Cannot connect to PostgreSQL server
/// - Database authentication fails
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Run database migrations from the `migrations/` directory.
///
/// Migrations are tracked in the `_sqlx_migrations` table, so each migration runs only once.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    // The macro reads migrations at compile time from ./migrations directory
    sqlx::migrate!("./migrations").run(pool).await
}

/// Render the tenant schema template for one schema.
pub fn tenant_schema_sql(schema: &TenantSchema) -> String {
    TENANT_SCHEMA_TEMPLATE.replace("{schema}", &schema.quoted())
}

/// Create a tenant schema and its tables.
///
/// Callers pass a connection from an open transaction so the registry row and
/// the schema are created together. The template is idempotent.
///
/// A bare `&str` with no bind arguments goes over the simple query protocol,
/// which accepts the template's multiple statements.
pub async fn provision_tenant_schema(
    conn: &mut PgConnection,
    schema: &TenantSchema,
) -> Result<(), sqlx::Error> {
    let sql = tenant_schema_sql(schema);
    conn.execute(sql.as_str()).await?;

    tracing::info!(schema = schema.as_str(), "tenant schema provisioned");
    Ok(())
}
