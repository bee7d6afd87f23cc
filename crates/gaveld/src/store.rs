//! The persisted moderator/ban store, backed by embedded SQLite.
//!
//! Two tables: `USERS(USERNAME PK, PASSWORD, PERMISSIONS)` and
//! `BANS(ID PK autoincrement, IPID, HDID, TIME, DURATION, REASON, MODERATOR)`.
//! Passwords are bcrypt hashes (cost 12); permission masks are stored as
//! decimal strings. The schema carries a monotonic version in
//! `PRAGMA user_version`.

use std::path::Path;

use anyhow::Context;
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

const BCRYPT_COST: u32 = 12;

// Incremented whenever a change requires existing databases to upgrade.
const SCHEMA_VERSION: i64 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanInfo {
    pub id: i64,
    pub ipid: String,
    pub hdid: String,
    pub time: i64,
    /// Unix seconds of expiry, `-1` for permanent, `0` for revoked.
    pub duration: i64,
    pub reason: String,
    pub moderator: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanLookup {
    Ipid,
    Hdid,
    BanId,
}

#[derive(Debug)]
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database {}", path.display()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> anyhow::Result<Self> {
        let version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
        if version < SCHEMA_VERSION {
            upgrade(&conn, version)?;
        }
        conn.execute(
            "CREATE TABLE IF NOT EXISTS BANS(
                ID INTEGER PRIMARY KEY,
                IPID TEXT,
                HDID TEXT,
                TIME INTEGER,
                DURATION INTEGER,
                REASON TEXT,
                MODERATOR TEXT
            )",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS USERS(
                USERNAME TEXT PRIMARY KEY,
                PASSWORD TEXT,
                PERMISSIONS TEXT
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn user_exists(&self, username: &str) -> bool {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT USERNAME FROM USERS WHERE USERNAME = ?1",
            params![username],
            |_| Ok(()),
        )
        .optional()
        .unwrap_or_else(|e| {
            warn!(err = %e, "user lookup failed");
            None
        })
        .is_some()
    }

    pub fn create_user(&self, username: &str, password: &str, perms: u64) -> anyhow::Result<()> {
        let hashed = bcrypt::hash(password, BCRYPT_COST)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO USERS VALUES(?1, ?2, ?3)",
            params![username, hashed, perms.to_string()],
        )?;
        Ok(())
    }

    pub fn remove_user(&self, username: &str) -> anyhow::Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM USERS WHERE USERNAME = ?1", params![username])?;
        Ok(())
    }

    /// Whether the credentials match a stored user, and that user's
    /// permission mask.
    pub fn authenticate(&self, username: &str, password: &str) -> (bool, u64) {
        let row = {
            let conn = self.conn.lock();
            conn.query_row(
                "SELECT PASSWORD, PERMISSIONS FROM USERS WHERE USERNAME = ?1",
                params![username],
                |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)),
            )
            .optional()
            .unwrap_or_else(|e| {
                warn!(err = %e, "auth lookup failed");
                None
            })
        };
        let Some((hash, perms)) = row else {
            return (false, 0);
        };
        if !bcrypt::verify(password, &hash).unwrap_or(false) {
            return (false, 0);
        }
        match perms.parse::<u64>() {
            Ok(p) => (true, p),
            Err(_) => (false, 0),
        }
    }

    pub fn change_permissions(&self, username: &str, perms: u64) -> anyhow::Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE USERS SET PERMISSIONS = ?1 WHERE USERNAME = ?2",
            params![perms.to_string(), username],
        )?;
        Ok(())
    }

    /// Records a new ban and returns its id.
    pub fn add_ban(
        &self,
        ipid: &str,
        hdid: &str,
        time: i64,
        until: i64,
        reason: &str,
        moderator: &str,
    ) -> anyhow::Result<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO BANS VALUES(NULL, ?1, ?2, ?3, ?4, ?5, ?6)",
            params![ipid, hdid, time, until, reason, moderator],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Nullifies a ban by setting its duration to the revoked sentinel.
    pub fn unban(&self, id: i64) -> anyhow::Result<()> {
        let conn = self.conn.lock();
        conn.execute("UPDATE BANS SET DURATION = 0 WHERE ID = ?1", params![id])?;
        Ok(())
    }

    pub fn update_ban(&self, id: i64, reason: &str) -> anyhow::Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE BANS SET REASON = ?1 WHERE ID = ?2",
            params![reason, id],
        )?;
        Ok(())
    }

    /// Returns every ban record matching the given id or IPID.
    pub fn get_ban(&self, by: BanLookup, value: &str) -> anyhow::Result<Vec<BanInfo>> {
        let sql = match by {
            BanLookup::BanId => "SELECT * FROM BANS WHERE ID = ?1",
            BanLookup::Ipid => "SELECT * FROM BANS WHERE IPID = ?1 ORDER BY TIME DESC",
            BanLookup::Hdid => "SELECT * FROM BANS WHERE HDID = ?1 ORDER BY TIME DESC",
        };
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params![value], |r| {
            Ok(BanInfo {
                id: r.get(0)?,
                ipid: r.get(1)?,
                hdid: r.get(2)?,
                time: r.get(3)?,
                duration: r.get(4)?,
                reason: r.get(5)?,
                moderator: r.get(6)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Whether the given IPID/HDID has a live ban: one whose duration is the
    /// permanent sentinel or whose expiry lies in the future.
    pub fn is_banned(&self, by: BanLookup, value: &str) -> anyhow::Result<Option<BanInfo>> {
        let bans = self.get_ban(by, value)?;
        let now = Utc::now().timestamp();
        Ok(bans
            .into_iter()
            .find(|b| b.duration == -1 || b.duration > now))
    }
}

fn upgrade(conn: &Connection, from: i64) -> anyhow::Result<()> {
    if from == 0 {
        conn.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION}"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_lifecycle() {
        let s = Store::open_in_memory().unwrap();
        assert!(!s.user_exists("admin"));

        s.create_user("admin", "secret", 0xff).unwrap();
        assert!(s.user_exists("admin"));
        // Duplicate usernames violate the primary key.
        assert!(s.create_user("admin", "other", 0).is_err());

        assert_eq!(s.authenticate("admin", "secret"), (true, 0xff));
        assert_eq!(s.authenticate("admin", "wrong"), (false, 0));
        assert_eq!(s.authenticate("nobody", "secret"), (false, 0));

        s.change_permissions("admin", 0x3).unwrap();
        assert_eq!(s.authenticate("admin", "secret"), (true, 0x3));

        s.remove_user("admin").unwrap();
        assert!(!s.user_exists("admin"));
    }

    #[test]
    fn ban_lifecycle() {
        let s = Store::open_in_memory().unwrap();
        let now = Utc::now().timestamp();

        let perma = s.add_ban("ip1", "hd1", now, -1, "spamming", "admin").unwrap();
        let timed = s
            .add_ban("ip2", "hd2", now, now + 3600, "trolling", "admin")
            .unwrap();
        let expired = s
            .add_ban("ip3", "hd3", now - 7200, now - 3600, "old", "admin")
            .unwrap();
        assert!(perma < timed && timed < expired);

        assert!(s.is_banned(BanLookup::Ipid, "ip1").unwrap().is_some());
        assert!(s.is_banned(BanLookup::Hdid, "hd2").unwrap().is_some());
        assert!(s.is_banned(BanLookup::Ipid, "ip3").unwrap().is_none());
        assert!(s.is_banned(BanLookup::Ipid, "unknown").unwrap().is_none());

        // Revocation zeroes the duration.
        s.unban(timed).unwrap();
        assert!(s.is_banned(BanLookup::Ipid, "ip2").unwrap().is_none());
        let rec = &s.get_ban(BanLookup::BanId, &timed.to_string()).unwrap()[0];
        assert_eq!(rec.duration, 0);

        s.update_ban(perma, "ban evasion").unwrap();
        let rec = &s.get_ban(BanLookup::BanId, &perma.to_string()).unwrap()[0];
        assert_eq!(rec.reason, "ban evasion");
        assert_eq!(rec.duration, -1);
    }

    #[test]
    fn schema_version_is_current() {
        let s = Store::open_in_memory().unwrap();
        let conn = s.conn.lock();
        let v: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0)).unwrap();
        assert_eq!(v, SCHEMA_VERSION);
    }
}
