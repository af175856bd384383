use rusqlite::{Connection, OptionalExtension, Row};
use tracing::debug;

use crate::error::{is_foreign_key_violation, is_unique_violation};
use crate::models::{
    CorrespondenceRow, MessageDetailRow, MessageRow, NewUser, ProfileRow, ReadReceiptRow, UserRow,
};
use crate::{Database, Result, StoreError, now_timestamp};

impl Database {
    // -- Users --

    pub fn create_user(&self, user: &NewUser<'_>, password_hash: &str) -> Result<UserRow> {
        let join_at = now_timestamp();

        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (username, password_hash, first_name, last_name, phone, join_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                (
                    user.username,
                    password_hash,
                    user.first_name,
                    user.last_name,
                    user.phone,
                    &join_at,
                ),
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::DuplicateUsername(user.username.to_string())
                } else {
                    e.into()
                }
            })?;
            Ok(())
        })?;

        debug!("Created user {}", user.username);

        Ok(UserRow {
            username: user.username.to_string(),
            first_name: user.first_name.to_string(),
            last_name: user.last_name.to_string(),
            phone: user.phone.to_string(),
            join_at,
            last_login_at: None,
        })
    }

    pub fn get_user(&self, username: &str) -> Result<UserRow> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT username, first_name, last_name, phone, join_at, last_login_at
                 FROM users WHERE username = ?1",
                [username],
                |row| {
                    Ok(UserRow {
                        username: row.get(0)?,
                        first_name: row.get(1)?,
                        last_name: row.get(2)?,
                        phone: row.get(3)?,
                        join_at: row.get(4)?,
                        last_login_at: row.get(5)?,
                    })
                },
            )
            .optional()?
            .ok_or(StoreError::NotFound("user"))
        })
    }

    /// Stored password hash for `username`, if the user exists.
    /// The only query that reads the hash column.
    pub fn get_password_hash(&self, username: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let hash = conn
                .query_row(
                    "SELECT password_hash FROM users WHERE username = ?1",
                    [username],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(hash)
        })
    }

    /// Record a successful login. The stored value never moves backwards, so a
    /// slow request finishing late cannot overwrite a newer login time.
    pub fn touch_login(&self, username: &str) -> Result<()> {
        let now = now_timestamp();

        let changed = self.with_conn_mut(|conn| {
            let n = conn.execute(
                "UPDATE users SET last_login_at = MAX(COALESCE(last_login_at, ?2), ?2)
                 WHERE username = ?1",
                (username, &now),
            )?;
            Ok(n)
        })?;

        if changed == 0 {
            return Err(StoreError::NotFound("user"));
        }
        Ok(())
    }

    pub fn list_users(&self) -> Result<Vec<ProfileRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT username, first_name, last_name, phone FROM users ORDER BY username",
            )?;

            let rows = stmt
                .query_map([], |row| profile_at(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Messages --

    /// Messages sent by `username`, each joined with the recipient's profile.
    pub fn messages_from(&self, username: &str) -> Result<Vec<CorrespondenceRow>> {
        self.with_conn(|conn| {
            query_correspondence(
                conn,
                "SELECT m.id, m.body, m.sent_at, m.read_at,
                        u.username, u.first_name, u.last_name, u.phone
                 FROM messages m
                 JOIN users u ON m.to_username = u.username
                 WHERE m.from_username = ?1
                 ORDER BY m.sent_at, m.id",
                username,
            )
        })
    }

    /// Messages received by `username`, each joined with the sender's profile.
    pub fn messages_to(&self, username: &str) -> Result<Vec<CorrespondenceRow>> {
        self.with_conn(|conn| {
            query_correspondence(
                conn,
                "SELECT m.id, m.body, m.sent_at, m.read_at,
                        u.username, u.first_name, u.last_name, u.phone
                 FROM messages m
                 JOIN users u ON m.from_username = u.username
                 WHERE m.to_username = ?1
                 ORDER BY m.sent_at, m.id",
                username,
            )
        })
    }

    /// Insert a message. Fails with `NotFound` when either party does not exist.
    pub fn create_message(&self, from_username: &str, to_username: &str, body: &str) -> Result<MessageRow> {
        let sent_at = now_timestamp();

        let id = self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages (from_username, to_username, body, sent_at)
                 VALUES (?1, ?2, ?3, ?4)",
                (from_username, to_username, body, &sent_at),
            )
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    StoreError::NotFound("user")
                } else {
                    e.into()
                }
            })?;
            Ok(conn.last_insert_rowid())
        })?;

        debug!("Message {} stored ({} -> {})", id, from_username, to_username);

        Ok(MessageRow {
            id,
            from_username: from_username.to_string(),
            to_username: to_username.to_string(),
            body: body.to_string(),
            sent_at,
            read_at: None,
        })
    }

    pub fn get_message(&self, id: i64) -> Result<MessageDetailRow> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT m.id, m.body, m.sent_at, m.read_at,
                        f.username, f.first_name, f.last_name, f.phone,
                        t.username, t.first_name, t.last_name, t.phone
                 FROM messages m
                 JOIN users f ON m.from_username = f.username
                 JOIN users t ON m.to_username = t.username
                 WHERE m.id = ?1",
                [id],
                |row| {
                    Ok(MessageDetailRow {
                        id: row.get(0)?,
                        body: row.get(1)?,
                        sent_at: row.get(2)?,
                        read_at: row.get(3)?,
                        from_user: profile_at(row, 4)?,
                        to_user: profile_at(row, 8)?,
                    })
                },
            )
            .optional()?
            .ok_or(StoreError::NotFound("message"))
        })
    }

    /// Set `read_at` if it is still unset and return the stored value.
    /// Repeated calls return the first timestamp unchanged.
    pub fn mark_read(&self, id: i64) -> Result<ReadReceiptRow> {
        let now = now_timestamp();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "UPDATE messages SET read_at = ?2 WHERE id = ?1 AND read_at IS NULL",
                (id, &now),
            )?;

            let receipt = tx
                .query_row("SELECT id, read_at FROM messages WHERE id = ?1", [id], |row| {
                    Ok(ReadReceiptRow {
                        id: row.get(0)?,
                        read_at: row.get(1)?,
                    })
                })
                .optional()?
                .ok_or(StoreError::NotFound("message"))?;

            tx.commit()?;
            Ok(receipt)
        })
    }
}

fn profile_at(row: &Row<'_>, start: usize) -> rusqlite::Result<ProfileRow> {
    Ok(ProfileRow {
        username: row.get(start)?,
        first_name: row.get(start + 1)?,
        last_name: row.get(start + 2)?,
        phone: row.get(start + 3)?,
    })
}

fn query_correspondence(conn: &Connection, sql: &str, username: &str) -> Result<Vec<CorrespondenceRow>> {
    let mut stmt = conn.prepare(sql)?;

    let rows = stmt
        .query_map([username], |row| {
            Ok(CorrespondenceRow {
                id: row.get(0)?,
                body: row.get(1)?,
                sent_at: row.get(2)?,
                read_at: row.get(3)?,
                counterpart: profile_at(row, 4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}
