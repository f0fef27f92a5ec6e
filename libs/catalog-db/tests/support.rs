//! Shared sqlite in-memory bootstrap for repository integration tests.
//! Mirrors `SCHEMA.sql`'s shape with sqlite-compatible column affinities;
//! no migration runner is involved (out of scope per §1).

use sea_orm::{ConnectionTrait, Database, DatabaseConnection};

pub async fn bootstrap() -> DatabaseConnection {
    let conn = Database::connect("sqlite::memory:")
        .await
        .expect("failed to open in-memory sqlite connection");

    let statements = [
        "CREATE TABLE host (
            host TEXT PRIMARY KEY,
            region TEXT NOT NULL,
            last_seen TEXT NOT NULL
        )",
        "CREATE TABLE domain (
            domain TEXT PRIMARY KEY,
            country TEXT,
            region TEXT NOT NULL,
            last_seen TEXT NOT NULL
        )",
        "CREATE TABLE agency (
            host TEXT NOT NULL,
            name TEXT NOT NULL,
            agency_type TEXT,
            created_at TEXT NOT NULL,
            PRIMARY KEY (host, name)
        )",
        "CREATE TABLE dataset (
            host TEXT NOT NULL,
            dataset_id TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            category TEXT,
            tags TEXT NOT NULL DEFAULT '[]',
            publisher TEXT,
            updated_at TEXT,
            row_count INTEGER,
            view_count INTEGER,
            link TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            first_seen TEXT NOT NULL,
            last_seen TEXT NOT NULL,
            PRIMARY KEY (host, dataset_id)
        )",
        "CREATE TABLE resume_state (
            pipeline TEXT PRIMARY KEY,
            resume_token TEXT NOT NULL,
            last_processed_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
    ];

    for statement in statements {
        conn.execute_unprepared(statement)
            .await
            .expect("failed to bootstrap schema");
    }

    conn
}
