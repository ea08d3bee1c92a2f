// Persistence adapter: per-host zoom, navigation history, TLS-exception
// decisions. The only component with shared mutable state (§5); every write
// goes through this single connection, serialized by the manager thread that
// owns it.

use dirs::data_dir;
use rusqlite::{params, Connection, OptionalExtension};

use crate::com::{HistoryEntry, TlsDecision, TlsDecisionKind};
use crate::config::CONFIG;

#[derive(Debug)]
pub struct DBCon(Connection);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS zoom (
    host TEXT PRIMARY KEY,
    factor REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS history (
    id INTEGER PRIMARY KEY,
    url TEXT NOT NULL,
    title TEXT,
    favicon_url TEXT,
    last_visited INTEGER NOT NULL,
    visit_count INTEGER NOT NULL DEFAULT 1
);
CREATE INDEX IF NOT EXISTS history_url ON history(url);
CREATE INDEX IF NOT EXISTS history_last_visited ON history(last_visited);

CREATE TABLE IF NOT EXISTS tls_decisions (
    host TEXT NOT NULL,
    cert_sha256 TEXT NOT NULL,
    decision TEXT NOT NULL,
    expiry INTEGER,
    PRIMARY KEY (host, cert_sha256)
);
";

impl DBCon {
    pub fn connect() -> Self {
        let path = CONFIG
            .database
            .clone()
            .unwrap_or_else(|| data_dir().unwrap().join("dumber").join("history.db"));
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        debug!("Opening database at {path:?}");
        let conn = Connection::open(path).expect("Error opening database");
        conn.execute_batch(SCHEMA).expect("Error initializing database schema");
        Self(conn)
    }

    pub fn get_zoom(&self, host: &str) -> rusqlite::Result<Option<f64>> {
        self.0
            .query_row("SELECT factor FROM zoom WHERE host = ?1", params![host], |r| r.get(0))
            .optional()
    }

    pub fn set_zoom(&self, host: &str, factor: f64) -> rusqlite::Result<()> {
        self.0.execute(
            "INSERT INTO zoom (host, factor) VALUES (?1, ?2)
             ON CONFLICT(host) DO UPDATE SET factor = excluded.factor",
            params![host, factor],
        )?;
        Ok(())
    }

    pub fn update_favicon(&self, page_url: &str, favicon_url: &str) -> rusqlite::Result<()> {
        self.0.execute(
            "UPDATE history SET favicon_url = ?2 WHERE url = ?1",
            params![page_url, favicon_url],
        )?;
        Ok(())
    }

    pub fn record_visit(
        &self,
        url: &str,
        title: Option<&str>,
        favicon: Option<&str>,
    ) -> rusqlite::Result<()> {
        let now = chrono::Utc::now().timestamp();
        let existing: Option<i64> = self
            .0
            .query_row("SELECT id FROM history WHERE url = ?1", params![url], |r| r.get(0))
            .optional()?;

        if let Some(id) = existing {
            self.0.execute(
                "UPDATE history SET title = COALESCE(?2, title), \
                 favicon_url = COALESCE(?3, favicon_url), last_visited = ?4, \
                 visit_count = visit_count + 1 WHERE id = ?1",
                params![id, title, favicon, now],
            )?;
        } else {
            self.0.execute(
                "INSERT INTO history (url, title, favicon_url, last_visited, visit_count) \
                 VALUES (?1, ?2, ?3, ?4, 1)",
                params![url, title, favicon, now],
            )?;
        }
        Ok(())
    }

    pub fn get_recent(&self, limit: u32, offset: u32) -> rusqlite::Result<Vec<HistoryEntry>> {
        let mut stmt = self.0.prepare(
            "SELECT url, title, favicon_url, last_visited, visit_count FROM history \
             ORDER BY last_visited DESC LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt.query_map(params![limit, offset], Self::row_to_entry)?;
        rows.collect()
    }

    pub fn search(&self, query: &str, limit: u32) -> rusqlite::Result<Vec<HistoryEntry>> {
        let pattern = format!("%{query}%");
        let mut stmt = self.0.prepare(
            "SELECT url, title, favicon_url, last_visited, visit_count FROM history \
             WHERE url LIKE ?1 OR title LIKE ?1 ORDER BY last_visited DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![pattern, limit], Self::row_to_entry)?;
        rows.collect()
    }

    pub fn delete(&self, id: i64) -> rusqlite::Result<()> {
        self.0.execute("DELETE FROM history WHERE id = ?1", params![id])?;
        Ok(())
    }

    pub fn get_stats(&self) -> rusqlite::Result<(u64, Option<i64>, Option<i64>)> {
        self.0.query_row(
            "SELECT COUNT(*), MAX(last_visited), MIN(last_visited) FROM history",
            [],
            |r| Ok((r.get::<_, i64>(0)? as u64, r.get(1)?, r.get(2)?)),
        )
    }

    pub fn get_tls_decision(
        &self,
        host: &str,
        cert_sha256: &str,
    ) -> rusqlite::Result<Option<TlsDecision>> {
        self.0
            .query_row(
                "SELECT host, cert_sha256, decision, expiry FROM tls_decisions \
                 WHERE host = ?1 AND cert_sha256 = ?2",
                params![host, cert_sha256],
                |r| {
                    let decision: String = r.get(2)?;
                    Ok(TlsDecision {
                        host: r.get(0)?,
                        cert_sha256: r.get(1)?,
                        decision: if decision == "always" {
                            TlsDecisionKind::Always
                        } else {
                            TlsDecisionKind::Once
                        },
                        expiry: r.get(3)?,
                    })
                },
            )
            .optional()
    }

    pub fn set_tls_decision(&self, decision: &TlsDecision) -> rusqlite::Result<()> {
        let kind = match decision.decision {
            TlsDecisionKind::Once => "once",
            TlsDecisionKind::Always => "always",
        };
        self.0.execute(
            "INSERT INTO tls_decisions (host, cert_sha256, decision, expiry) \
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(host, cert_sha256) DO UPDATE SET decision = excluded.decision, \
             expiry = excluded.expiry",
            params![decision.host, decision.cert_sha256, kind, decision.expiry],
        )?;
        Ok(())
    }

    fn row_to_entry(r: &rusqlite::Row) -> rusqlite::Result<HistoryEntry> {
        Ok(HistoryEntry {
            url: r.get(0)?,
            title: r.get(1)?,
            favicon_url: r.get(2)?,
            last_visited: r.get(3)?,
            visit_count: r.get::<_, i64>(4)? as u64,
        })
    }

    // Destroys the connection cleanly on shutdown, mirroring the teacher's
    // `Gui::connect_shutdown` -> `database.destroy()` call site.
    pub fn destroy(&self) {
        let _ = self.0.execute_batch("PRAGMA optimize;");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memdb() -> DBCon {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        DBCon(conn)
    }

    #[test]
    fn zoom_round_trips_per_host() {
        let db = memdb();
        assert_eq!(db.get_zoom("example.com").unwrap(), None);
        db.set_zoom("example.com", 1.25).unwrap();
        assert_eq!(db.get_zoom("example.com").unwrap(), Some(1.25));
        db.set_zoom("example.com", 1.5).unwrap();
        assert_eq!(db.get_zoom("example.com").unwrap(), Some(1.5));
    }

    #[test]
    fn record_visit_increments_existing_entry() {
        let db = memdb();
        db.record_visit("https://a.example/page1", Some("A"), None).unwrap();
        db.record_visit("https://a.example/page1", Some("A updated"), Some("fav.png")).unwrap();
        let recent = db.get_recent(10, 0).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].visit_count, 2);
        assert_eq!(recent[0].title.as_deref(), Some("A updated"));
    }

    #[test]
    fn search_matches_url_or_title() {
        let db = memdb();
        db.record_visit("https://a.example/page1", Some("Hello"), None).unwrap();
        db.record_visit("https://b.example/other", Some("World"), None).unwrap();
        assert_eq!(db.search("hello", 10).unwrap().len(), 1);
        assert_eq!(db.search("b.example", 10).unwrap().len(), 1);
        assert_eq!(db.search("nonexistent", 10).unwrap().len(), 0);
    }

    #[test]
    fn tls_decision_round_trips() {
        let db = memdb();
        assert_eq!(db.get_tls_decision("x.example", "abcd").unwrap(), None);
        let decision = TlsDecision {
            host: "x.example".into(),
            cert_sha256: "abcd".into(),
            decision: TlsDecisionKind::Always,
            expiry: Some(123),
        };
        db.set_tls_decision(&decision).unwrap();
        assert_eq!(db.get_tls_decision("x.example", "abcd").unwrap(), Some(decision));
    }
}
