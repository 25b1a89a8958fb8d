//! A SQLite connection that can have extensions installed into it.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use extload_core::{ExtensionHost, HostError};
use rusqlite::fallible_iterator::FallibleIterator;
use rusqlite::types::Value;
use rusqlite::{Batch, Connection, LoadExtensionGuard, OpenFlags};
use tracing::{debug, info};

use crate::error::{Result, engine};
use crate::output::QueryOutput;
use crate::store::{ExtensionStore, LIBRARY_EXTENSION};

/// Database name that opens a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// How to open a [`SqliteSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Database file, or [`IN_MEMORY`].
    pub database: String,
    /// Open the database file read-only. Ignored for in-memory databases.
    pub read_only: bool,
    /// Extension store; [`ExtensionStore::default_dir`] when unset.
    pub extension_dir: Option<PathBuf>,
    /// Extra directories searched, after the store, when loading by name.
    pub search_paths: Vec<PathBuf>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            database: IN_MEMORY.to_string(),
            read_only: false,
            extension_dir: None,
            search_paths: Vec::new(),
        }
    }
}

impl SessionOptions {
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn extension_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.extension_dir = Some(dir.into());
        self
    }

    pub fn search_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_paths.push(dir.into());
        self
    }
}

/// An open SQLite database plus the extension store it installs into.
///
/// Not thread-safe; bootstrap one session at a time.
///
/// # Examples
///
/// ```no_run
/// use extload_core::{ExtensionHost, TemplateContext, run};
/// use extload_sqlite::{SessionOptions, SqliteSession};
///
/// let mut session = SqliteSession::connect(SessionOptions::default()).unwrap();
/// let vars = TemplateContext::from([("name".to_string(), "Sam".to_string())]);
/// let output = run(&mut session, "SELECT '${name}' AS who", &vars).unwrap();
/// assert_eq!(output.json_rows()[0]["who"], "Sam");
/// ```
#[derive(Debug)]
pub struct SqliteSession {
    conn: Connection,
    store: ExtensionStore,
    search_paths: Vec<PathBuf>,
    loaded: BTreeSet<String>,
}

impl SqliteSession {
    /// Opens the database described by `options`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::DatabaseError`](crate::SqliteError::DatabaseError)
    /// if SQLite cannot open the database.
    pub fn connect(options: SessionOptions) -> Result<Self> {
        let conn = if options.database == IN_MEMORY {
            Connection::open_in_memory()?
        } else if options.read_only {
            Connection::open_with_flags(
                &options.database,
                OpenFlags::SQLITE_OPEN_READ_ONLY
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?
        } else {
            Connection::open(&options.database)?
        };

        let store = ExtensionStore::new(
            options
                .extension_dir
                .unwrap_or_else(ExtensionStore::default_dir),
        );
        debug!(database = %options.database, store = %store.dir().display(), "opened session");

        Ok(Self {
            conn,
            store,
            search_paths: options.search_paths,
            loaded: BTreeSet::new(),
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn store(&self) -> &ExtensionStore {
        &self.store
    }

    /// Whether `name` has been loaded into this session.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains(name)
    }

    /// Finds the binary for `name` in the store, then the search paths.
    pub fn locate(&self, name: &str) -> Option<PathBuf> {
        self.store.find(name).or_else(|| {
            let file_name = format!("{name}.{LIBRARY_EXTENSION}");
            self.search_paths
                .iter()
                .map(|dir| dir.join(&file_name))
                .find(|path| path.is_file())
        })
    }

    fn load_path(&self, path: &Path) -> std::result::Result<(), HostError> {
        // SAFETY: loading is enabled only for the lifetime of the guard, and
        // the library comes from the session's own store or search paths.
        // SQLite derives the entry point from the file name.
        unsafe {
            let _guard = LoadExtensionGuard::new(&self.conn).map_err(engine)?;
            self.conn
                .load_extension(path, None::<&str>)
                .map_err(engine)?;
        }
        Ok(())
    }
}

impl ExtensionHost for SqliteSession {
    type Output = QueryOutput;

    fn install_extension(
        &mut self,
        path: &Path,
        force: bool,
    ) -> std::result::Result<PathBuf, HostError> {
        self.store.install(path, force)
    }

    fn load_extension(&mut self, name: &str) -> std::result::Result<(), HostError> {
        if self.loaded.contains(name) {
            debug!(name, "extension already loaded in this session");
            return Ok(());
        }
        let path = self
            .locate(name)
            .ok_or_else(|| HostError::NotFound(name.to_string()))?;
        self.load_path(&path)?;
        info!(name, path = %path.display(), "loaded extension");
        self.loaded.insert(name.to_string());
        Ok(())
    }

    fn execute(&mut self, sql: &str) -> std::result::Result<QueryOutput, HostError> {
        let mut batch = Batch::new(&self.conn, sql);
        let mut output = QueryOutput::default();

        while let Some(mut stmt) = batch.next().map_err(engine)? {
            let columns: Vec<String> = stmt
                .column_names()
                .into_iter()
                .map(str::to_string)
                .collect();
            let mut rows = stmt.query([]).map_err(engine)?;
            let mut collected = Vec::new();
            while let Some(row) = rows.next().map_err(engine)? {
                let values = (0..columns.len())
                    .map(|i| row.get_ref(i).map(Value::from))
                    .collect::<rusqlite::Result<Vec<_>>>()
                    .map_err(engine)?;
                collected.push(values);
            }
            output = QueryOutput {
                columns,
                rows: collected,
            };
        }
        Ok(output)
    }
}
