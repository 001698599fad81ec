// wap-core/src/infrastructure/adapters/duckdb.rs
//
// Local lakehouse inside a single DuckDB file, for development and tests.
// Layout (DuckDB identifiers are case-insensitive, so are branch names here):
//   - one schema per branch ("main" is DuckDB's default schema)
//   - table `ns.table` of branch `b` lives in "b"."ns.table"
//   - branch & namespace catalogs live in the reserved `__wap` schema

use async_trait::async_trait;
use duckdb::types::Value;
use duckdb::{Config, Connection, params};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

// Imports Hexagonaux
use crate::domain::error::DomainError;
use crate::error::WapError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::lakehouse::{Lakehouse, MergeReceipt, ScanResult, TableRef};

const ROOT_BRANCH: &str = "main";
const CATALOG_SCHEMA: &str = "__wap";

pub struct DuckDbLakehouse {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbLakehouse {
    pub fn new(db_path: &str) -> Result<Self, InfrastructureError> {
        let config = Config::default();

        let conn = if db_path == ":memory:" {
            Connection::open_in_memory_with_flags(config)?
        } else {
            Connection::open_with_flags(db_path, config)?
        };

        conn.execute_batch(&format!(
            "CREATE SCHEMA IF NOT EXISTS {catalog};
             CREATE TABLE IF NOT EXISTS {catalog}.branches (
                 name VARCHAR PRIMARY KEY,
                 from_ref VARCHAR,
                 created_at TIMESTAMP DEFAULT current_timestamp
             );
             CREATE TABLE IF NOT EXISTS {catalog}.namespaces (
                 branch VARCHAR,
                 name VARCHAR,
                 PRIMARY KEY (branch, name)
             );
             INSERT OR IGNORE INTO {catalog}.branches (name, from_ref) VALUES ('{root}', NULL);",
            catalog = CATALOG_SCHEMA,
            root = ROOT_BRANCH,
        ))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, WapError> {
        self.conn.lock().map_err(|_| {
            WapError::Infrastructure(InfrastructureError::Io(std::io::Error::other(
                "DuckDB Mutex Poisoned",
            )))
        })
    }
}

// --- SQL HELPERS (sync, called with the lock held) ---

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn qualified(branch: &str, table: &TableRef) -> String {
    format!("{}.{}", quote_ident(branch), quote_ident(&table.fq_name()))
}

/// Table function reading the source. A trailing '/' means "every parquet file below".
fn source_reader(search_uri: &str) -> String {
    let uri = if search_uri.ends_with('/') {
        format!("{}*.parquet", search_uri)
    } else {
        search_uri.to_string()
    };
    let lower = uri.to_ascii_lowercase();

    if lower.ends_with(".csv") || lower.ends_with(".csv.gz") || lower.ends_with(".tsv") {
        format!("read_csv_auto({})", quote_literal(&uri))
    } else if lower.ends_with(".json") || lower.ends_with(".ndjson") {
        format!("read_json_auto({})", quote_literal(&uri))
    } else {
        format!("read_parquet({})", quote_literal(&uri))
    }
}

fn branch_exists(conn: &Connection, branch: &str) -> Result<bool, duckdb::Error> {
    let count: i64 = conn.query_row(
        &format!("SELECT count(*) FROM {}.branches WHERE lower(name) = lower(?)", CATALOG_SCHEMA),
        params![branch],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn require_branch(conn: &Connection, branch: &str) -> Result<(), WapError> {
    if branch_exists(conn, branch)? {
        Ok(())
    } else {
        Err(DomainError::BranchNotFound(branch.to_string()).into())
    }
}

fn namespace_exists(conn: &Connection, branch: &str, namespace: &str) -> Result<bool, duckdb::Error> {
    let count: i64 = conn.query_row(
        &format!(
            "SELECT count(*) FROM {}.namespaces WHERE lower(branch) = lower(?) AND name = ?",
            CATALOG_SCHEMA
        ),
        params![branch, namespace],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn table_exists(conn: &Connection, branch: &str, table: &TableRef) -> Result<bool, duckdb::Error> {
    let count: i64 = conn.query_row(
        "SELECT count(*) FROM information_schema.tables
         WHERE table_catalog = current_database()
           AND lower(table_schema) = lower(?) AND lower(table_name) = lower(?)",
        params![branch, table.fq_name()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn branch_tables(conn: &Connection, branch: &str) -> Result<Vec<String>, duckdb::Error> {
    let mut stmt = conn.prepare(
        "SELECT table_name FROM information_schema.tables
         WHERE table_catalog = current_database() AND lower(table_schema) = lower(?)
         ORDER BY table_name",
    )?;
    let rows = stmt.query_map(params![branch], |row| row.get::<_, String>(0))?;
    rows.collect()
}

fn table_columns(conn: &Connection, branch: &str, table: &TableRef) -> Result<Vec<String>, duckdb::Error> {
    let mut stmt = conn.prepare(
        "SELECT column_name FROM information_schema.columns
         WHERE table_catalog = current_database()
           AND lower(table_schema) = lower(?) AND lower(table_name) = lower(?)
         ORDER BY ordinal_position",
    )?;
    let rows = stmt.query_map(params![branch, table.fq_name()], |row| {
        row.get::<_, String>(0)
    })?;
    rows.collect()
}

fn to_json(value: Value) -> serde_json::Value {
    use serde_json::Value as Json;

    match value {
        Value::Null => Json::Null,
        Value::Boolean(b) => Json::Bool(b),
        Value::TinyInt(v) => Json::from(v),
        Value::SmallInt(v) => Json::from(v),
        Value::Int(v) => Json::from(v),
        Value::BigInt(v) => Json::from(v),
        Value::UTinyInt(v) => Json::from(v),
        Value::USmallInt(v) => Json::from(v),
        Value::UInt(v) => Json::from(v),
        Value::UBigInt(v) => Json::from(v),
        Value::Float(v) => Json::from(f64::from(v)),
        Value::Double(v) => Json::from(v),
        Value::Text(s) => Json::String(s),
        other => Json::String(format!("{:?}", other)),
    }
}

#[async_trait]
impl Lakehouse for DuckDbLakehouse {
    async fn has_branch(&self, branch: &str) -> Result<bool, WapError> {
        let conn = self.lock()?;
        Ok(branch_exists(&conn, branch)?)
    }

    async fn create_branch(&self, branch: &str, from_ref: &str) -> Result<(), WapError> {
        if branch.eq_ignore_ascii_case(CATALOG_SCHEMA) {
            return Err(InfrastructureError::Rejected(format!("'{}' is reserved", branch)).into());
        }

        let mut conn = self.lock()?;
        if branch_exists(&conn, branch)? {
            return Err(
                InfrastructureError::Rejected(format!("branch '{}' already exists", branch)).into(),
            );
        }
        require_branch(&conn, from_ref)?;

        let tx = conn.transaction()?;
        tx.execute_batch(&format!("CREATE SCHEMA {}", quote_ident(branch)))?;
        for table in branch_tables(&tx, from_ref)? {
            tx.execute_batch(&format!(
                "CREATE TABLE {dst}.{t} AS SELECT * FROM {src}.{t}",
                dst = quote_ident(branch),
                src = quote_ident(from_ref),
                t = quote_ident(&table),
            ))?;
        }
        tx.execute(
            &format!(
                "INSERT INTO {}.branches (name, from_ref) VALUES (?, ?)",
                CATALOG_SCHEMA
            ),
            params![branch, from_ref],
        )?;
        tx.execute(
            &format!(
                "INSERT INTO {c}.namespaces SELECT CAST(? AS VARCHAR), name FROM {c}.namespaces WHERE lower(branch) = lower(?)",
                c = CATALOG_SCHEMA
            ),
            params![branch, from_ref],
        )?;
        tx.commit()?;

        info!(branch, from_ref, "Branch created");
        Ok(())
    }

    async fn delete_branch(&self, branch: &str) -> Result<bool, WapError> {
        if branch.eq_ignore_ascii_case(ROOT_BRANCH) {
            return Err(DomainError::ProtectedBranch(branch.to_string()).into());
        }

        let mut conn = self.lock()?;
        if !branch_exists(&conn, branch)? {
            return Ok(false);
        }

        let tx = conn.transaction()?;
        tx.execute_batch(&format!("DROP SCHEMA IF EXISTS {} CASCADE", quote_ident(branch)))?;
        tx.execute(
            &format!("DELETE FROM {}.namespaces WHERE lower(branch) = lower(?)", CATALOG_SCHEMA),
            params![branch],
        )?;
        tx.execute(
            &format!("DELETE FROM {}.branches WHERE lower(name) = lower(?)", CATALOG_SCHEMA),
            params![branch],
        )?;
        tx.commit()?;

        info!(branch, "Branch deleted");
        Ok(true)
    }

    async fn merge_branch(
        &self,
        source_ref: &str,
        into_branch: &str,
    ) -> Result<MergeReceipt, WapError> {
        let mut conn = self.lock()?;
        require_branch(&conn, source_ref)?;
        require_branch(&conn, into_branch)?;

        let tx = conn.transaction()?;
        let tables = branch_tables(&tx, source_ref)?;
        for table in &tables {
            tx.execute_batch(&format!(
                "CREATE OR REPLACE TABLE {dst}.{t} AS SELECT * FROM {src}.{t}",
                dst = quote_ident(into_branch),
                src = quote_ident(source_ref),
                t = quote_ident(table),
            ))?;
        }
        tx.execute(
            &format!(
                "INSERT OR IGNORE INTO {c}.namespaces SELECT CAST(? AS VARCHAR), name FROM {c}.namespaces WHERE lower(branch) = lower(?)",
                c = CATALOG_SCHEMA
            ),
            params![into_branch, source_ref],
        )?;
        tx.commit()?;

        let commit = uuid::Uuid::new_v4().simple().to_string();
        info!(source_ref, into_branch, tables = tables.len(), commit = %commit, "Branch merged");

        Ok(MergeReceipt {
            source_ref: source_ref.to_string(),
            into_branch: into_branch.to_string(),
            commit: Some(commit),
        })
    }

    async fn has_namespace(&self, namespace: &str, reference: &str) -> Result<bool, WapError> {
        let conn = self.lock()?;
        Ok(namespace_exists(&conn, reference, namespace)?)
    }

    async fn create_namespace(&self, namespace: &str, branch: &str) -> Result<(), WapError> {
        let conn = self.lock()?;
        require_branch(&conn, branch)?;
        conn.execute(
            &format!(
                "INSERT OR IGNORE INTO {}.namespaces (branch, name) VALUES (?, ?)",
                CATALOG_SCHEMA
            ),
            params![branch, namespace],
        )?;
        Ok(())
    }

    async fn create_table(
        &self,
        table: &TableRef,
        search_uri: &str,
        branch: &str,
        replace: bool,
    ) -> Result<(), WapError> {
        let conn = self.lock()?;
        require_branch(&conn, branch)?;
        if !namespace_exists(&conn, branch, &table.namespace)? {
            return Err(InfrastructureError::Rejected(format!(
                "namespace '{}' does not exist on '{}'",
                table.namespace, branch
            ))
            .into());
        }

        // Schema only: the rows arrive with import_data
        let verb = if replace {
            "CREATE OR REPLACE TABLE"
        } else {
            "CREATE TABLE"
        };
        let sql = format!(
            "{} {} AS SELECT * FROM {} LIMIT 0",
            verb,
            qualified(branch, table),
            source_reader(search_uri)
        );
        debug!(sql = %sql, "Creating table");
        conn.execute_batch(&sql)?;
        Ok(())
    }

    async fn has_table(&self, table: &TableRef, reference: &str) -> Result<bool, WapError> {
        let conn = self.lock()?;
        Ok(table_exists(&conn, reference, table)?)
    }

    async fn import_data(
        &self,
        table: &TableRef,
        search_uri: &str,
        branch: &str,
    ) -> Result<bool, WapError> {
        let conn = self.lock()?;
        if !table_exists(&conn, branch, table)? {
            return Err(DomainError::TableNotFound(table.fq_name()).into());
        }

        let inserted = conn.execute(
            &format!(
                "INSERT INTO {} BY NAME SELECT * FROM {}",
                qualified(branch, table),
                source_reader(search_uri)
            ),
            [],
        )?;
        info!(table = %table.fq_name(), branch, rows = inserted, "Data imported");
        Ok(true)
    }

    async fn scan(
        &self,
        table: &TableRef,
        reference: &str,
        columns: &[String],
    ) -> Result<ScanResult, WapError> {
        let conn = self.lock()?;
        if !table_exists(&conn, reference, table)? {
            return Err(DomainError::TableNotFound(table.fq_name()).into());
        }

        // Unknown columns are left out of the result, the caller decides what that means
        let available = table_columns(&conn, reference, table)?;
        let selected: Vec<String> = columns
            .iter()
            .filter(|c| available.contains(c))
            .cloned()
            .collect();
        if selected.is_empty() {
            return Ok(ScanResult::default());
        }

        let projection: Vec<String> = selected.iter().map(|c| quote_ident(c)).collect();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {}",
            projection.join(", "),
            qualified(reference, table)
        ))?;
        let mut rows = stmt.query([])?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(selected.len());
            for i in 0..selected.len() {
                values.push(to_json(row.get::<_, Value>(i)?));
            }
            out.push(values);
        }

        Ok(ScanResult {
            columns: selected,
            rows: out,
        })
    }

    fn backend_name(&self) -> &str {
        "duckdb"
    }
}
