//! Struct ↔ row operations.
//!
//! Every entry point takes the executor explicitly, enumerates the entity's
//! fields, builds one statement per step and runs the steps in order. Nothing
//! is retained between calls.

use crate::client::{Executor, Row, RowReader};
use crate::entity::{Entity, select_columns, write_columns};
use crate::error::{Error, Result};
use crate::ident::Ident;
use crate::report::Report;
use crate::search::Search;
use crate::sql::Statement;
use crate::trace;
use std::time::Instant;

fn table_ident(table: &str) -> Result<Ident> {
    Ident::parse(table).map_err(|e| Error::invalid_target(format!("table {table:?}: {e}")))
}

async fn run_query<C: Executor>(conn: &C, stmt: &Statement) -> Result<Vec<Row>> {
    trace::statement(conn.dialect(), stmt);
    let start = Instant::now();
    match conn.query(stmt.sql(), stmt.params()).await {
        Ok(rows) => {
            trace::finished(stmt, start.elapsed(), rows.len() as u64);
            Ok(rows)
        }
        Err(e) => {
            trace::failed(stmt, &e);
            Err(e)
        }
    }
}

async fn run_execute<C: Executor>(conn: &C, stmt: &Statement) -> Result<u64> {
    trace::statement(conn.dialect(), stmt);
    let start = Instant::now();
    match conn.execute(stmt.sql(), stmt.params()).await {
        Ok(n) => {
            trace::finished(stmt, start.elapsed(), n);
            Ok(n)
        }
        Err(e) => {
            trace::failed(stmt, &e);
            Err(e)
        }
    }
}

/// Fetch one row into `dest`.
///
/// Returns `Ok(false)` when nothing matches, leaving `dest` untouched. On a
/// match every mapped field is overwritten (NULL makes an optional field
/// absent); unmapped fields keep their values. When several rows match, the
/// first one is used.
pub async fn select<C, T>(conn: &C, dest: &mut T, table: &str, search: &Search) -> Result<bool>
where
    C: Executor,
    T: Entity,
{
    let columns = select_columns::<T>()?;
    let table_name = table_ident(table)?;
    let stmt = Statement::select(conn.dialect(), &table_name, &columns, search, Some(2))?;

    let rows = run_query(conn, &stmt).await?;
    if rows.len() > 1 {
        tracing::warn!(
            target: "restsql.sql",
            table,
            search = %search,
            "single-row fetch matched several rows; using the first"
        );
    }
    let Some(row) = rows.into_iter().next() else {
        return Ok(false);
    };
    dest.read_row(&mut RowReader::new(row))?;
    Ok(true)
}

/// Like [`select`], but a missing row is [`Error::NotFound`].
pub async fn get<C, T>(conn: &C, dest: &mut T, table: &str, search: &Search) -> Result<()>
where
    C: Executor,
    T: Entity,
{
    if select(conn, dest, table, search).await? {
        Ok(())
    } else {
        Err(Error::not_found(format!("no row in {table} matches {search}")))
    }
}

/// Fetch every matching row into `dest`, replacing its contents.
///
/// Elements may be entities or boxed entities. On error `dest` keeps what it
/// held before the call; with zero matches it ends up empty.
pub async fn select_many<C, E>(conn: &C, dest: &mut Vec<E>, table: &str, search: &Search) -> Result<()>
where
    C: Executor,
    E: Entity,
{
    let columns = select_columns::<E>()?;
    let table_name = table_ident(table)?;
    let stmt = Statement::select(conn.dialect(), &table_name, &columns, search, None)?;

    let rows = run_query(conn, &stmt).await?;
    let mut acc = Vec::with_capacity(rows.len());
    for row in rows {
        acc.push(E::from_row(&mut RowReader::new(row))?);
    }
    *dest = acc;
    Ok(())
}

/// Whether any row matches, without reading its fields.
///
/// `Ok(false)` means confirmed absent; an error means the answer is unknown.
pub async fn exists<C: Executor>(conn: &C, table: &str, search: &Search) -> Result<bool> {
    let table_name = table_ident(table)?;
    let stmt = Statement::exists(conn.dialect(), &table_name, search);
    let rows = run_query(conn, &stmt).await?;
    Ok(!rows.is_empty())
}

/// Insert `entity` as a new row. Absent optional fields are left to the
/// column defaults.
pub async fn insert<C, T>(conn: &C, entity: &T, table: &str) -> Result<Report>
where
    C: Executor,
    T: Entity,
{
    let columns = write_columns(entity, &Search::all())?;
    let table_name = table_ident(table)?;
    let stmt = Statement::insert(conn.dialect(), &table_name, columns)?;
    let n = run_execute(conn, &stmt).await?;
    Ok(Report::success(n))
}

/// Update the rows matching `search` from `entity`.
///
/// Columns used by `search` are not rewritten, and absent optional fields
/// leave their columns alone. An empty search is refused.
pub async fn update<C, T>(conn: &C, entity: &T, table: &str, search: &Search) -> Result<Report>
where
    C: Executor,
    T: Entity,
{
    let columns = write_columns(entity, search)?;
    let table_name = table_ident(table)?;
    let stmt = Statement::update(conn.dialect(), &table_name, columns, search)?;
    let n = run_execute(conn, &stmt).await?;
    Ok(Report::success(n))
}

/// Update the matching row if one exists, otherwise insert `entity`.
///
/// This is two statements with no transaction around them. A row deleted
/// between the probe and the update gives `affected == 0` without an error;
/// a row inserted concurrently makes the insert fail with a unique
/// violation if the key is constrained.
///
/// If the probe itself fails, that error is returned and nothing is written.
pub async fn upsert<C, T>(conn: &C, entity: &T, table: &str, search: &Search) -> Result<Report>
where
    C: Executor,
    T: Entity,
{
    if exists(conn, table, search).await? {
        tracing::debug!(target: "restsql.sql", table, search = %search, "upsert: updating");
        update(conn, entity, table, search).await
    } else {
        tracing::debug!(target: "restsql.sql", table, search = %search, "upsert: inserting");
        insert(conn, entity, table).await
    }
}

/// Delete the rows matching `search`. An empty search is refused.
pub async fn delete<C: Executor>(conn: &C, table: &str, search: &Search) -> Result<Report> {
    let table_name = table_ident(table)?;
    let stmt = Statement::delete(conn.dialect(), &table_name, search)?;
    let n = run_execute(conn, &stmt).await?;
    Ok(Report::success(n))
}

/// Upsert each item of a collection, keyed by `key`.
///
/// Failures do not stop the batch: they are counted in `failed` and the last
/// one is kept in the report's error.
pub async fn upsert_each<C, T, F>(conn: &C, items: &[T], table: &str, key: F) -> Report
where
    C: Executor,
    T: Entity,
    F: Fn(&T) -> Result<Search> + Send + Sync,
{
    let mut report = Report::default();
    for (idx, item) in items.iter().enumerate() {
        let result = match key(item) {
            Ok(search) => upsert(conn, item, table, &search).await,
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            tracing::warn!(target: "restsql.sql", table, item = idx, error = %e, "upsert failed");
        }
        report.record(result);
    }
    report
}
