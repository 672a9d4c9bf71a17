//! `SQLite` schema for the download history.

/// Downloaded log files, one row per `(name, modified)` pair.
///
/// `modified` is the source file's modification time as RFC 3339 with
/// nanosecond precision so it compares exactly against a fresh listing.
pub const CREATE_DOWNLOADS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS downloads (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    modified TEXT NOT NULL,
    size INTEGER NOT NULL,
    downloaded_at TEXT NOT NULL,
    UNIQUE (name, modified)
)
";

/// Key-value table; holds the schema version.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_DOWNLOADS_TABLE,
    CREATE_METADATA_TABLE,
];
