use std::time::Duration;

use anyhow::Context;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::authz::{Policy, Principal};
use crate::errors::AppError;
use crate::models::ScopedResource;

pub mod scope_sql;

pub use scope_sql::{compile, SqlFilter};

const ROW_ALIAS: &str = "t";

pub async fn init() -> anyhow::Result<SqlitePool> {
	let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;

	let pool = SqlitePoolOptions::new()
		.max_connections(10)
		.min_connections(1)
		.acquire_timeout(Duration::from_secs(10))
		.connect(&database_url)
		.await
		.context("failed to connect to database")?;

	sqlx::migrate!()
		.run(&pool)
		.await
		.context("failed to run migrations")?;

	Ok(pool)
}

/// Row filter `principal` is held to for `T`, compiled for the `t` alias.
pub fn visibility<T: ScopedResource>(policy: &Policy, principal: &Principal) -> Result<SqlFilter, AppError> {
	let predicate = policy.scope_for(T::RESOURCE, principal);
	compile(&predicate, ROW_ALIAS)
}

/// Reads every `T` row visible to `principal`.
///
/// This is the only read path for scoped resources: the policy predicate is
/// ANDed onto the query before it reaches the database, so an unconfigured
/// role simply gets an empty list.
pub async fn fetch_visible<T: ScopedResource>(
	pool: &SqlitePool,
	policy: &Policy,
	principal: &Principal,
) -> Result<Vec<T>, AppError> {
	let filter = visibility::<T>(policy, principal)?;
	let columns = T::COLUMNS
		.iter()
		.map(|column| format!("{ROW_ALIAS}.{column}"))
		.collect::<Vec<_>>()
		.join(", ");
	let sql = format!(
		"SELECT {columns} FROM {} AS {ROW_ALIAS} WHERE {} ORDER BY {}",
		T::TABLE,
		filter.sql,
		T::ORDER_BY
	);

	let mut query = sqlx::query_as::<_, T>(&sql);
	for value in filter.binds {
		query = query.bind(value);
	}

	let rows = query.fetch_all(pool).await?;
	tracing::debug!(resource = T::RESOURCE, rows = rows.len(), "scoped read");
	Ok(rows)
}

pub async fn count_visible<T: ScopedResource>(
	pool: &SqlitePool,
	policy: &Policy,
	principal: &Principal,
) -> Result<i64, AppError> {
	let filter = visibility::<T>(policy, principal)?;
	let sql = format!(
		"SELECT COUNT(1) FROM {} AS {ROW_ALIAS} WHERE {}",
		T::TABLE,
		filter.sql
	);

	let mut query = sqlx::query_scalar::<_, i64>(&sql);
	for value in filter.binds {
		query = query.bind(value);
	}

	Ok(query.fetch_one(pool).await?)
}
