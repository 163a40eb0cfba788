//! SQLite-based backend storage with zstd-compressed MIME bodies

use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rusqlite_migration::{M, Migrations};

use super::BackendStorage;
use crate::models::{
    DownloadState, EmailAddress, Flag, FolderRecord, FolderRole, MessageFlags, StoredMessage,
    SyncedMessage,
};

/// Database migrations
///
/// Each migration is applied in order. The user_version pragma tracks which
/// migrations have been applied.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        // Migration 1: Initial schema
        M::up(
            r#"
            -- Account-level key/value state (folder sync key, policy key)
            CREATE TABLE account_extras (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE folders (
                server_id TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                role TEXT NOT NULL,
                parent_server_id TEXT
            );

            -- Per-folder state (message sync key, window)
            CREATE TABLE folder_extras (
                folder_id TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (folder_id, key),
                FOREIGN KEY (folder_id) REFERENCES folders(server_id) ON DELETE CASCADE
            );

            CREATE TABLE messages (
                folder_id TEXT NOT NULL,
                server_id TEXT NOT NULL,
                subject TEXT,
                from_addrs TEXT NOT NULL,    -- JSON array
                to_addrs TEXT NOT NULL,
                cc_addrs TEXT NOT NULL,
                reply_to_addrs TEXT NOT NULL,
                date_received TEXT,
                message_class TEXT,
                thread_topic TEXT,
                seen INTEGER NOT NULL DEFAULT 0,
                flagged INTEGER NOT NULL DEFAULT 0,
                answered INTEGER NOT NULL DEFAULT 0,
                forwarded INTEGER NOT NULL DEFAULT 0,
                mime BLOB,                   -- zstd compressed
                truncated INTEGER NOT NULL DEFAULT 0,
                download_state TEXT NOT NULL,
                PRIMARY KEY (folder_id, server_id),
                FOREIGN KEY (folder_id) REFERENCES folders(server_id) ON DELETE CASCADE
            );
            "#,
        ),
        // Migration 2: Index for the post-sync partial download sweep
        M::up(
            r#"
            CREATE INDEX idx_messages_download_state
                ON messages(folder_id, download_state);
            "#,
        ),
    ])
}

/// Raw message row before decompression and JSON decoding
struct MessageRow {
    server_id: String,
    subject: Option<String>,
    from: String,
    to: String,
    cc: String,
    reply_to: String,
    date_received: Option<String>,
    message_class: Option<String>,
    thread_topic: Option<String>,
    flags: MessageFlags,
    mime: Option<Vec<u8>>,
    truncated: bool,
    download_state: String,
}

const MESSAGE_COLUMNS: &str = "server_id, subject, from_addrs, to_addrs, cc_addrs, reply_to_addrs,
     date_received, message_class, thread_topic, seen, flagged, answered, forwarded,
     mime, truncated, download_state";

impl MessageRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            server_id: row.get(0)?,
            subject: row.get(1)?,
            from: row.get(2)?,
            to: row.get(3)?,
            cc: row.get(4)?,
            reply_to: row.get(5)?,
            date_received: row.get(6)?,
            message_class: row.get(7)?,
            thread_topic: row.get(8)?,
            flags: MessageFlags {
                seen: row.get(9)?,
                flagged: row.get(10)?,
                answered: row.get(11)?,
                forwarded: row.get(12)?,
            },
            mime: row.get(13)?,
            truncated: row.get(14)?,
            download_state: row.get(15)?,
        })
    }

    fn into_stored(self, folder: &str) -> Result<StoredMessage> {
        let mime = self
            .mime
            .map(|data| zstd::decode_all(data.as_slice()))
            .transpose()
            .context("Failed to decompress MIME body")?;
        let date_received = self
            .date_received
            .map(|raw| {
                DateTime::parse_from_rfc3339(&raw)
                    .map(|d| d.with_timezone(&Utc))
                    .with_context(|| format!("Invalid date_received {:?}", raw))
            })
            .transpose()?;
        let download_state = DownloadState::parse(&self.download_state)
            .ok_or_else(|| anyhow!("Invalid download_state {:?}", self.download_state))?;

        Ok(StoredMessage {
            folder_server_id: folder.to_string(),
            message: SyncedMessage {
                server_id: self.server_id,
                subject: self.subject,
                from: decode_addresses(&self.from)?,
                to: decode_addresses(&self.to)?,
                cc: decode_addresses(&self.cc)?,
                reply_to: decode_addresses(&self.reply_to)?,
                date_received,
                message_class: self.message_class,
                thread_topic: self.thread_topic,
                flags: self.flags,
                mime,
                truncated: self.truncated,
            },
            download_state,
        })
    }
}

fn encode_addresses(addresses: &[EmailAddress]) -> Result<String> {
    serde_json::to_string(addresses).context("Failed to encode addresses")
}

fn decode_addresses(raw: &str) -> Result<Vec<EmailAddress>> {
    serde_json::from_str(raw).context("Failed to decode addresses")
}

fn flag_column(flag: Flag) -> Option<&'static str> {
    match flag {
        Flag::Seen => Some("seen"),
        Flag::Flagged => Some("flagged"),
        Flag::Answered => Some("answered"),
        Flag::Forwarded => Some("forwarded"),
        Flag::Deleted => None,
    }
}

/// SQLite implementation of [`BackendStorage`]
pub struct SqliteBackendStorage {
    conn: Mutex<Connection>,
}

impl SqliteBackendStorage {
    /// Open (or create) the store at `db_path` and bring the schema up to date
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open database at {:?}", db_path.as_ref()))?;

        // WAL lets the UI read while a sync pass writes. foreign_keys is
        // required for the folder cascades.
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -16000;
            PRAGMA temp_store = MEMORY;
            PRAGMA foreign_keys = ON;
            "#,
        )?;

        migrations()
            .to_latest(&mut conn)
            .context("Failed to run database migrations")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn folder_exists(conn: &Connection, server_id: &str) -> Result<bool> {
        let found: Option<i64> = conn
            .query_row("SELECT 1 FROM folders WHERE server_id = ?", [server_id], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }
}

impl BackendStorage for SqliteBackendStorage {
    fn get_extra_string(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let value = conn
            .query_row("SELECT value FROM account_extras WHERE key = ?", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set_extra_string(&self, key: &str, value: Option<&str>) -> Result<()> {
        let conn = self.conn.lock();
        match value {
            Some(value) => conn.execute(
                "INSERT INTO account_extras (key, value) VALUES (?, ?)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?,
            None => conn.execute("DELETE FROM account_extras WHERE key = ?", [key])?,
        };
        Ok(())
    }

    fn create_folders(&self, folders: &[FolderRecord]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            // ON CONFLICT DO UPDATE keeps the row, so extras and messages
            // survive an upsert
            let mut stmt = tx.prepare(
                "INSERT INTO folders (server_id, display_name, role, parent_server_id)
                 VALUES (?, ?, ?, ?)
                 ON CONFLICT(server_id) DO UPDATE SET
                    display_name = excluded.display_name,
                    role = excluded.role,
                    parent_server_id = excluded.parent_server_id",
            )?;
            for folder in folders {
                stmt.execute(params![
                    folder.server_id,
                    folder.display_name,
                    folder.role.as_str(),
                    folder.parent_server_id
                ])?;
            }
        }
        tx.commit().context("Failed to commit folder insert")?;
        Ok(())
    }

    fn delete_folders(&self, server_ids: &[String]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare("DELETE FROM folders WHERE server_id = ?")?;
            for id in server_ids {
                stmt.execute([id])?;
            }
        }
        tx.commit().context("Failed to commit folder delete")?;
        Ok(())
    }

    fn change_folder(&self, server_id: &str, display_name: &str, role: FolderRole) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE folders SET display_name = ?, role = ? WHERE server_id = ?",
            params![display_name, role.as_str(), server_id],
        )?;
        Ok(())
    }

    fn get_folder_server_ids(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT server_id FROM folders ORDER BY server_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn get_folder(&self, server_id: &str) -> Result<Option<FolderRecord>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT display_name, role, parent_server_id FROM folders WHERE server_id = ?1",
                params![server_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(display_name, role, parent)| -> Result<FolderRecord> {
            let role = FolderRole::parse(&role)
                .ok_or_else(|| anyhow!("Invalid role {:?} for folder {}", role, server_id))?;
            Ok(FolderRecord::new(server_id, display_name, role).with_parent(parent))
        })
        .transpose()
    }

    fn get_folders(&self) -> Result<Vec<FolderRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT server_id, display_name, role, parent_server_id FROM folders ORDER BY server_id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(server_id, display_name, role, parent)| -> Result<FolderRecord> {
                let role = FolderRole::parse(&role)
                    .ok_or_else(|| anyhow!("Invalid role {:?} for folder {}", role, server_id))?;
                Ok(FolderRecord::new(server_id, display_name, role).with_parent(parent))
            })
            .collect()
    }

    fn get_folder_extra_string(&self, folder: &str, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let value = conn
            .query_row(
                "SELECT value FROM folder_extras WHERE folder_id = ? AND key = ?",
                params![folder, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_folder_extra_string(&self, folder: &str, key: &str, value: Option<&str>) -> Result<()> {
        let conn = self.conn.lock();
        if !Self::folder_exists(&conn, folder)? {
            bail!("Unknown folder {}", folder);
        }
        match value {
            Some(value) => conn.execute(
                "INSERT INTO folder_extras (folder_id, key, value) VALUES (?, ?, ?)
                 ON CONFLICT(folder_id, key) DO UPDATE SET value = excluded.value",
                params![folder, key, value],
            )?,
            None => conn.execute(
                "DELETE FROM folder_extras WHERE folder_id = ? AND key = ?",
                params![folder, key],
            )?,
        };
        Ok(())
    }

    fn save_message(&self, folder: &str, message: &SyncedMessage, state: DownloadState) -> Result<()> {
        // Level 3 is zstd's default speed/ratio tradeoff
        let mime = message
            .mime
            .as_ref()
            .map(|mime| zstd::encode_all(mime.as_slice(), 3))
            .transpose()
            .context("Failed to compress MIME body")?;

        let conn = self.conn.lock();
        if !Self::folder_exists(&conn, folder)? {
            bail!("Unknown folder {}", folder);
        }
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO messages (folder_id, {}) VALUES ({})",
                MESSAGE_COLUMNS,
                ["?"; 17].join(", ")
            ),
            params![
                folder,
                message.server_id,
                message.subject,
                encode_addresses(&message.from)?,
                encode_addresses(&message.to)?,
                encode_addresses(&message.cc)?,
                encode_addresses(&message.reply_to)?,
                message.date_received.map(|d| d.to_rfc3339()),
                message.message_class,
                message.thread_topic,
                message.flags.seen,
                message.flags.flagged,
                message.flags.answered,
                message.flags.forwarded,
                mime,
                message.truncated,
                state.as_str(),
            ],
        )
        .with_context(|| format!("Failed to save message {} in {}", message.server_id, folder))?;
        Ok(())
    }

    fn get_message(&self, folder: &str, server_id: &str) -> Result<Option<StoredMessage>> {
        let row = {
            let conn = self.conn.lock();
            conn.query_row(
                &format!(
                    "SELECT {} FROM messages WHERE folder_id = ? AND server_id = ?",
                    MESSAGE_COLUMNS
                ),
                params![folder, server_id],
                MessageRow::from_row,
            )
            .optional()?
        };
        row.map(|row| row.into_stored(folder)).transpose()
    }

    fn get_message_server_ids(&self, folder: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT server_id FROM messages WHERE folder_id = ? ORDER BY server_id")?;
        let ids = stmt
            .query_map([folder], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn destroy_messages(&self, folder: &str, server_ids: &[String]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare("DELETE FROM messages WHERE folder_id = ? AND server_id = ?")?;
            for id in server_ids {
                stmt.execute(params![folder, id])?;
            }
        }
        tx.commit().context("Failed to commit message delete")?;
        Ok(())
    }

    fn set_message_flag(&self, folder: &str, server_id: &str, flag: Flag, state: bool) -> Result<bool> {
        let conn = self.conn.lock();
        let changed = match flag_column(flag) {
            Some(column) => conn.execute(
                &format!(
                    "UPDATE messages SET {} = ? WHERE folder_id = ? AND server_id = ?",
                    column
                ),
                params![state, folder, server_id],
            )?,
            None => conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE folder_id = ? AND server_id = ?",
                params![folder, server_id],
                |row| row.get::<_, i64>(0),
            )? as usize,
        };
        Ok(changed > 0)
    }

    fn get_partially_downloaded_messages(&self, folder: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT server_id FROM messages
             WHERE folder_id = ? AND download_state = ?
             ORDER BY server_id",
        )?;
        let ids = stmt
            .query_map(params![folder, DownloadState::Partial.as_str()], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn remove_all_messages(&self, folder: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM messages WHERE folder_id = ?", [folder])?;
        Ok(())
    }

    fn wipe_account(&self) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute_batch(
            "DELETE FROM messages;
             DELETE FROM folder_extras;
             DELETE FROM folders;
             DELETE FROM account_extras;",
        )?;
        tx.commit().context("Failed to wipe account")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::BackendStorageExt;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn create_test_store() -> (SqliteBackendStorage, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        // Use .test.sqlite extension to clearly distinguish from production databases
        let db_path = dir.path().join("easync.test.sqlite");
        let store = SqliteBackendStorage::new(&db_path).unwrap();
        (store, dir)
    }

    fn make_test_message(server_id: &str, truncated: bool) -> SyncedMessage {
        let mut message = SyncedMessage::new(server_id)
            .subject("Quarterly numbers")
            .from(EmailAddress::with_name("Alice", "alice@example.com"))
            .date_received(Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap())
            .mime(b"Subject: Quarterly numbers\r\n\r\nbody".to_vec(), truncated);
        message.to = EmailAddress::parse_list("bob@example.com, carol@example.com");
        message.message_class = Some("IPM.Note".into());
        message
    }

    #[test]
    fn test_folder_crud() {
        let (store, _dir) = create_test_store();

        store
            .create_folders(&[
                FolderRecord::new("2", "Inbox", FolderRole::Inbox),
                FolderRecord::new("7", "Projects", FolderRole::Regular).with_parent(Some("2".into())),
            ])
            .unwrap();
        assert_eq!(store.get_folder_server_ids().unwrap(), vec!["2", "7"]);
        assert_eq!(
            store.get_folder("7").unwrap().unwrap().parent_server_id.as_deref(),
            Some("2")
        );
        assert_eq!(store.get_folder("2").unwrap().unwrap().role, FolderRole::Inbox);
        assert!(store.get_folder("404").unwrap().is_none());

        store.change_folder("7", "Archive", FolderRole::Regular).unwrap();
        assert_eq!(store.get_folder("7").unwrap().unwrap().display_name, "Archive");

        store.delete_folders(&["7".into(), "404".into()]).unwrap();
        assert_eq!(store.get_folder_server_ids().unwrap(), vec!["2"]);
    }

    #[test]
    fn test_upsert_keeps_folder_state() {
        let (store, _dir) = create_test_store();
        store
            .create_folders(&[FolderRecord::new("2", "Inbox", FolderRole::Inbox)])
            .unwrap();
        store.set_folder_sync_key("2", Some("k1")).unwrap();
        store.save_message("2", &make_test_message("m1", false), DownloadState::Complete).unwrap();

        store
            .create_folders(&[FolderRecord::new("2", "Inbox (renamed)", FolderRole::Inbox)])
            .unwrap();
        assert_eq!(store.folder_sync_key("2").unwrap().as_deref(), Some("k1"));
        assert_eq!(store.get_message_server_ids("2").unwrap(), vec!["m1"]);
    }

    #[test]
    fn test_delete_folder_cascades() {
        let (store, _dir) = create_test_store();
        store
            .create_folders(&[FolderRecord::new("2", "Inbox", FolderRole::Inbox)])
            .unwrap();
        store.set_folder_sync_key("2", Some("k1")).unwrap();
        store.save_message("2", &make_test_message("m1", false), DownloadState::Complete).unwrap();

        store.delete_folders(&["2".into()]).unwrap();
        store
            .create_folders(&[FolderRecord::new("2", "Inbox", FolderRole::Inbox)])
            .unwrap();
        assert_eq!(store.folder_sync_key("2").unwrap(), None);
        assert!(store.get_message_server_ids("2").unwrap().is_empty());
    }

    #[test]
    fn test_message_roundtrip() {
        let (store, _dir) = create_test_store();
        store
            .create_folders(&[FolderRecord::new("2", "Inbox", FolderRole::Inbox)])
            .unwrap();

        let message = make_test_message("m1", true);
        store.save_message("2", &message, DownloadState::Partial).unwrap();

        let stored = store.get_message("2", "m1").unwrap().unwrap();
        assert_eq!(stored.message, message);
        assert_eq!(stored.download_state, DownloadState::Partial);
        assert_eq!(store.get_partially_downloaded_messages("2").unwrap(), vec!["m1"]);

        store.save_message("2", &make_test_message("m1", false), DownloadState::Complete).unwrap();
        assert!(store.get_partially_downloaded_messages("2").unwrap().is_empty());
    }

    #[test]
    fn test_message_requires_folder() {
        let (store, _dir) = create_test_store();
        assert!(
            store
                .save_message("9", &make_test_message("m1", false), DownloadState::Complete)
                .is_err()
        );
    }

    #[test]
    fn test_flags() {
        let (store, _dir) = create_test_store();
        store
            .create_folders(&[FolderRecord::new("2", "Inbox", FolderRole::Inbox)])
            .unwrap();
        store.save_message("2", &make_test_message("m1", false), DownloadState::Complete).unwrap();

        assert!(store.set_message_flag("2", "m1", Flag::Flagged, true).unwrap());
        assert!(!store.set_message_flag("2", "m2", Flag::Flagged, true).unwrap());

        let flags = store.get_message("2", "m1").unwrap().unwrap().message.flags;
        assert!(flags.flagged);
        assert!(!flags.seen);
    }

    #[test]
    fn test_extras_and_wipe() {
        let (store, _dir) = create_test_store();
        store.set_folders_sync_key(Some("f1")).unwrap();
        store.set_policy_key(Some("p1")).unwrap();
        assert_eq!(store.folders_sync_key().unwrap().as_deref(), Some("f1"));

        store.set_folders_sync_key(None).unwrap();
        assert_eq!(store.folders_sync_key().unwrap(), None);

        store
            .create_folders(&[FolderRecord::new("2", "Inbox", FolderRole::Inbox)])
            .unwrap();
        store.wipe_account().unwrap();
        assert_eq!(store.policy_key().unwrap(), None);
        assert!(store.get_folders().unwrap().is_empty());
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("easync.test.sqlite");
        {
            let store = SqliteBackendStorage::new(&db_path).unwrap();
            store.set_folders_sync_key(Some("f9")).unwrap();
        }
        let store = SqliteBackendStorage::new(&db_path).unwrap();
        assert_eq!(store.folders_sync_key().unwrap().as_deref(), Some("f9"));
    }
}
