use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

use super::traits::{Storage, StorageRead, StorageTx, StorageWrite};
use crate::types::{NewTodo, Todo, TodoId};

const DB_SCHEMA_VERSION: i64 = 1;

const TODO_COLUMNS: &str = "id, title, description, completed, created_at, updated_at";

#[derive(Clone, Debug)]
pub struct SqliteStorage {
    path: PathBuf,
}

/// Connection holding an open `BEGIN IMMEDIATE` transaction.
pub struct SqliteTx {
    conn: Connection,
    committed: bool,
}

impl StorageTx for SqliteTx {
    fn commit(mut self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for SqliteTx {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                log::warn!("SQLite rollback failed: {}", e);
            }
        }
    }
}

fn open_conn(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.busy_timeout(std::time::Duration::from_millis(500))?;
    Ok(conn)
}

fn map_todo_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Todo> {
    Ok(Todo {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        completed: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn db_load_todo(conn: &Connection, id: TodoId) -> rusqlite::Result<Option<Todo>> {
    conn.query_row(
        &format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = ?1"),
        params![id],
        map_todo_row,
    )
    .optional()
}

fn db_list_todos(conn: &Connection) -> rusqlite::Result<Vec<Todo>> {
    let mut stmt = conn.prepare(&format!("SELECT {TODO_COLUMNS} FROM todos ORDER BY id"))?;
    let rows = stmt
        .query_map([], map_todo_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn db_insert_todo(conn: &Connection, todo: &NewTodo, now: DateTime<Utc>) -> Result<Todo> {
    conn.execute(
        r#"
        INSERT INTO todos (title, description, completed, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?4)
        "#,
        params![todo.title, todo.description, todo.completed, now],
    )
    .context("inserting todo")?;

    let id = conn.last_insert_rowid();
    db_load_todo(conn, id)?.with_context(|| format!("todo {id} missing right after insert"))
}

fn db_update_todo(conn: &Connection, todo: &Todo) -> rusqlite::Result<usize> {
    conn.execute(
        r#"
        UPDATE todos
        SET title = ?1,
            description = ?2,
            completed = ?3,
            updated_at = ?4
        WHERE id = ?5
        "#,
        params![
            todo.title,
            todo.description,
            todo.completed,
            todo.updated_at,
            todo.id
        ],
    )
}

fn db_delete_todo(conn: &Connection, id: TodoId) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM todos WHERE id = ?1", params![id])
}

impl StorageRead for SqliteTx {
    fn load_todo(&self, id: TodoId) -> Result<Option<Todo>> {
        Ok(db_load_todo(&self.conn, id)?)
    }

    fn list_todos(&self) -> Result<Vec<Todo>> {
        Ok(db_list_todos(&self.conn)?)
    }
}

impl StorageWrite for SqliteTx {
    fn insert_todo(&self, todo: &NewTodo, now: DateTime<Utc>) -> Result<Todo> {
        db_insert_todo(&self.conn, todo, now)
    }

    fn update_todo(&self, todo: &Todo) -> Result<usize> {
        Ok(db_update_todo(&self.conn, todo).context("updating todo")?)
    }

    fn delete_todo(&self, id: TodoId) -> Result<usize> {
        Ok(db_delete_todo(&self.conn, id).context("deleting todo")?)
    }
}

impl Storage for SqliteStorage {
    type Tx = SqliteTx;

    fn begin_tx(&self) -> Result<Self::Tx> {
        let conn = open_conn(&self.path)?;
        conn.execute_batch("BEGIN IMMEDIATE")?;

        Ok(SqliteTx {
            conn,
            committed: false,
        })
    }
}

impl SqliteStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn reset_all(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        std::fs::remove_file(&self.path)?;
        for suffix in ["-wal", "-shm"] {
            let mut sidecar = self.path.clone().into_os_string();
            sidecar.push(suffix);
            let sidecar = PathBuf::from(sidecar);
            if sidecar.exists() {
                std::fs::remove_file(&sidecar)?;
            }
        }
        Ok(())
    }

    /// Create the schema on a fresh database, or verify the version of an
    /// existing one.
    pub fn init(&self) -> Result<()> {
        let conn = open_conn(&self.path)?;
        Self::migrate(&conn)?;
        Ok(())
    }

    fn with_conn<F, T>(&self, f: F) -> rusqlite::Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = open_conn(&self.path)?;
        f(&conn)
    }

    fn migrate(conn: &Connection) -> rusqlite::Result<()> {
        let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

        if version == DB_SCHEMA_VERSION {
            return Ok(());
        }

        if version == 0 {
            log::info!(
                "SQLite schema install: {} -> {}",
                version,
                DB_SCHEMA_VERSION
            );
            conn.execute_batch(
                r#"
            CREATE TABLE IF NOT EXISTS todos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL CHECK (length(title) > 0 AND length(title) <= 255),
                description TEXT CHECK (description IS NULL OR length(description) <= 1024),
                completed INTEGER NOT NULL DEFAULT 0 CHECK (completed IN (0, 1)),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL CHECK (updated_at >= created_at)
            );
            CREATE INDEX IF NOT EXISTS todos_title_idx ON todos(title);
            "#,
            )?;
            conn.pragma_update(None, "user_version", DB_SCHEMA_VERSION)?;
            return Ok(());
        }

        Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::ErrorCode::SchemaChanged as i32),
            Some("database schema version mismatch; please run with --reset option".to_string()),
        ))
    }
}

impl StorageRead for SqliteStorage {
    fn load_todo(&self, id: TodoId) -> Result<Option<Todo>> {
        let row = self.with_conn(|conn| db_load_todo(conn, id))?;
        Ok(row)
    }

    fn list_todos(&self) -> Result<Vec<Todo>> {
        let rows = self.with_conn(db_list_todos)?;
        Ok(rows)
    }
}
