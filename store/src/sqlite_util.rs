//! SQLite open preamble and error mapping for the movie cache.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;

use reel_types::StoreError;
use rusqlite::{Connection, ErrorCode};

/// Create the parent directory and the database file with owner-only
/// permissions, then open a connection.
pub(crate) fn open_secure_db(path: &Path) -> Result<Connection, StoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        ensure_secure_dir(parent).map_err(|e| {
            StoreError::io(format!("create directory {}: {e}", parent.display()))
        })?;
    }
    ensure_db_file(path)
        .map_err(|e| StoreError::io(format!("create database {}: {e}", path.display())))?;

    Connection::open(path).map_err(|e| map_sqlite_error("open database", &e))
}

fn ensure_secure_dir(path: &Path) -> io::Result<()> {
    std::fs::create_dir_all(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::{MetadataExt, PermissionsExt};

        let metadata = std::fs::metadata(path)?;
        let our_uid = unsafe { libc::getuid() };
        if metadata.uid() != our_uid {
            return Ok(());
        }
        if metadata.permissions().mode() & 0o077 != 0 {
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
        }
    }
    Ok(())
}

fn ensure_db_file(path: &Path) -> io::Result<()> {
    if path.exists() {
        return Ok(());
    }
    let mut options = OpenOptions::new();
    options.create(true).truncate(false).read(true).write(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path).map(drop)
}

/// Classify a rusqlite failure into the store taxonomy.
pub(crate) fn map_sqlite_error(operation: &str, err: &rusqlite::Error) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            StoreError::constraint(format!("{operation}: {err}"))
        }
        _ => StoreError::io(format!("{operation}: {err}")),
    }
}
