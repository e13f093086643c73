//! SQL DDL for the account tables.
//! Business records live in each tenant's ERPNext; only users and their
//! ERP connection are stored locally.

/// SQLite schema with:
/// - `users.id` UUID text primary key, `email` UNIQUE
/// - `role` constrained to `admin` / `client`
/// - `erp_connections.user_id` UNIQUE, so each user has at most one connection
/// - timestamps stored as RFC3339 text
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY NOT NULL,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'client' CHECK (role IN ('admin', 'client')),
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS erp_connections (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
    erp_domain TEXT NOT NULL,
    encrypted_api_key TEXT NOT NULL,
    encrypted_api_secret TEXT NOT NULL,
    created_at TEXT NOT NULL
);
"#;
