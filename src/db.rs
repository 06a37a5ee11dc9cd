use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use sqlx::{Connection, FromRow, PgConnection};
use time::OffsetDateTime;

/// One row of the Atlas schema revisions table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Migration {
	pub version: String,
	pub description: String,
	#[serde(with = "time::serde::rfc3339")]
	pub executed_at: OffsetDateTime,
	pub execution_time: i64,
	#[sqlx(rename = "type")]
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(skip_serializing_if = "String::is_empty")]
	pub error: String,
}

/// Fetches every recorded migration, oldest first, over a single
/// short-lived connection.
pub async fn fetch_migration_history(db_url: &str, table: &str) -> Result<Vec<Migration>> {
	let mut conn = PgConnection::connect(db_url)
		.await
		.context("failed to connect to database")?;

	let result = query_history(&mut conn, table).await;

	// A close failure is attached to the primary error, not dropped.
	match (result, conn.close().await) {
		(Ok(rows), Ok(())) => Ok(rows),
		(Ok(_), Err(close)) => {
			Err(anyhow!(close).context("failed to close database connection"))
		}
		(Err(err), Ok(())) => Err(err),
		(Err(err), Err(close)) => {
			Err(err.context(format!("also failed to close database connection: {close}")))
		}
	}
}

async fn query_history(conn: &mut PgConnection, table: &str) -> Result<Vec<Migration>> {
	// The table name is an identifier and cannot be bound as a
	// parameter; it comes from the CLI or atlas.hcl, not row data.
	let query = format!(
		"SELECT \
			version, \
			COALESCE(description, '') AS description, \
			executed_at, \
			execution_time, \
			type, \
			COALESCE(error, '') AS error \
		FROM {table} \
		ORDER BY executed_at ASC"
	);

	match sqlx::query_as::<_, Migration>(&query).fetch_all(conn).await {
		Ok(rows) => Ok(rows),
		Err(err) if is_undefined_table(&err) => Err(anyhow!(
			"migration history table '{table}' not found. Has 'atlas migrate apply' been run?"
		)),
		Err(err) => Err(err).context("failed to query migration history"),
	}
}

// SQLSTATE 42P01: undefined_table.
fn is_undefined_table(err: &sqlx::Error) -> bool {
	match err {
		sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("42P01"),
		_ => false,
	}
}
