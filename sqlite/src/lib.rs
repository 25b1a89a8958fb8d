//! SQLite as an extension bootstrap target.
//!
//! [`SqliteSession`] wraps a [`rusqlite::Connection`] together with an
//! [`ExtensionStore`] directory and implements
//! [`ExtensionHost`](extload_core::ExtensionHost), so it can be handed
//! straight to the bootstrap and to the query templater.
//!
//! - **`store`**: installs binaries into a flat directory, atomically and
//!   with optional overwrite
//! - **`session`**: opens databases, loads extensions by name, executes
//!   multi-statement scripts
//! - **`output`**: result rows and their JSON rendering
//!
//! # Quick start
//!
//! ```no_run
//! use extload_core::ExtensionHost;
//! use extload_sqlite::{SessionOptions, SqliteSession};
//!
//! let mut session = SqliteSession::connect(
//!     SessionOptions::default().database("analysis.db"),
//! )
//! .unwrap();
//!
//! session.install_extension("downloads/exondb.so".as_ref(), true).unwrap();
//! session.load_extension("exondb").unwrap();
//!
//! for row in session.execute("SELECT 1 AS one").unwrap().json_rows() {
//!     println!("{row}");
//! }
//! ```

mod error;
mod output;
mod session;
mod store;

pub use error::{Result, SqliteError};
pub use output::QueryOutput;
pub use session::{IN_MEMORY, SessionOptions, SqliteSession};
pub use store::{ExtensionStore, LIBRARY_EXTENSION};
