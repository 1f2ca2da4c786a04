pub mod school;
pub mod user;

use sqlx::sqlite::SqliteRow;
use sqlx::FromRow;

/// A table whose reads are row-scoped by the authorization policy.
///
/// The resource name is the key looked up in the scope rules; the remaining
/// constants describe how to select the rows. Queries over these types go
/// through [`crate::db::fetch_visible`] so the scope is never skipped.
pub trait ScopedResource: for<'r> FromRow<'r, SqliteRow> + Send + Unpin {
    const RESOURCE: &'static str;
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];
    const ORDER_BY: &'static str;
}
