use rusqlite::{Connection, OptionalExtension, params};

use postbox_types::models::{MessageFilter, Role, SortOrder};

use crate::models::{DeliveryRow, MessageRow, MessageViewRow, UserRow};

// -- Users --

pub fn insert_user(
    conn: &Connection,
    id: &str,
    username: &str,
    email: &str,
    password_hash: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO users (id, username, email, password) VALUES (?1, ?2, ?3, ?4)",
        params![id, username, email, password_hash],
    )?;
    Ok(())
}

pub fn user_by_username(conn: &Connection, username: &str) -> rusqlite::Result<Option<UserRow>> {
    conn.prepare(
        "SELECT id, username, email, password, created_at FROM users WHERE username = ?1",
    )?
    .query_row([username], read_user)
    .optional()
}

pub fn user_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<UserRow>> {
    conn.prepare("SELECT id, username, email, password, created_at FROM users WHERE email = ?1")?
        .query_row([email], read_user)
        .optional()
}

fn read_user(row: &rusqlite::Row) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        created_at: row.get(4)?,
    })
}

// -- Messages --

pub fn insert_message(
    conn: &Connection,
    id: &str,
    subject: &str,
    body: &str,
    sender_id: &str,
    created_at: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO messages (id, subject, body, sender_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, subject, body, sender_id, created_at],
    )?;
    Ok(())
}

pub fn message_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<MessageRow>> {
    conn.prepare("SELECT id, subject, body, sender_id, created_at FROM messages WHERE id = ?1")?
        .query_row([id], |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                subject: row.get(1)?,
                body: row.get(2)?,
                sender_id: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()
}

/// Delete a message row; its deliveries cascade away via the foreign key.
/// Deleting an already-gone message is a no-op.
pub fn delete_message(conn: &Connection, id: &str) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM messages WHERE id = ?1", [id])?;
    Ok(())
}

// -- Deliveries --

pub fn insert_delivery(
    conn: &Connection,
    id: &str,
    message_id: &str,
    user_id: &str,
    role: Role,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO deliveries (id, message_id, user_id, role) VALUES (?1, ?2, ?3, ?4)",
        params![id, message_id, user_id, role.as_str()],
    )?;
    Ok(())
}

pub fn delivery_for(
    conn: &Connection,
    message_id: &str,
    user_id: &str,
) -> rusqlite::Result<Option<DeliveryRow>> {
    conn.prepare(
        "SELECT id, message_id, user_id, role, is_read FROM deliveries
         WHERE message_id = ?1 AND user_id = ?2",
    )?
    .query_row(params![message_id, user_id], |row| {
        Ok(DeliveryRow {
            id: row.get(0)?,
            message_id: row.get(1)?,
            user_id: row.get(2)?,
            role: row.get(3)?,
            is_read: row.get(4)?,
        })
    })
    .optional()
}

pub fn update_delivery_role(conn: &Connection, id: &str, role: Role) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE deliveries SET role = ?1 WHERE id = ?2",
        params![role.as_str(), id],
    )?;
    Ok(())
}

pub fn set_delivery_read(conn: &Connection, id: &str, read: bool) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE deliveries SET is_read = ?1 WHERE id = ?2",
        params![read, id],
    )?;
    Ok(())
}

pub fn delete_delivery(conn: &Connection, id: &str) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM deliveries WHERE id = ?1", [id])?;
    Ok(())
}

pub fn delivery_count(conn: &Connection, message_id: &str) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM deliveries WHERE message_id = ?1",
        [message_id],
        |row| row.get(0),
    )
}

// -- Viewer-scoped listing --

pub fn message_for_viewer(
    conn: &Connection,
    message_id: &str,
    viewer_id: &str,
) -> rusqlite::Result<Option<MessageViewRow>> {
    conn.prepare(&format!(
        "{VIEW_SELECT} WHERE d.message_id = ?1 AND d.user_id = ?2"
    ))?
    .query_row(params![message_id, viewer_id], read_view)
    .optional()
}

pub fn list_for_viewer(
    conn: &Connection,
    viewer_id: &str,
    filter: MessageFilter,
    sort: SortOrder,
) -> rusqlite::Result<Vec<MessageViewRow>> {
    let role_clause = match filter {
        MessageFilter::All => "",
        MessageFilter::Sent => " AND d.role IN ('sender', 'both')",
        MessageFilter::Received => " AND d.role IN ('recipient', 'both')",
        MessageFilter::ReceivedUnread => " AND d.role IN ('recipient', 'both') AND d.is_read = 0",
        MessageFilter::ReceivedRead => " AND d.role IN ('recipient', 'both') AND d.is_read = 1",
    };
    let order = match sort {
        SortOrder::NewestFirst => "DESC",
        SortOrder::OldestFirst => "ASC",
    };
    let sql =
        format!("{VIEW_SELECT} WHERE d.user_id = ?1{role_clause} ORDER BY m.created_at {order}");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([viewer_id], read_view)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

// JOIN users to fetch sender_username in a single query (eliminates N+1)
const VIEW_SELECT: &str = "SELECT m.id, m.subject, m.body, m.sender_id, u.username, m.created_at,
            d.role, d.is_read
     FROM deliveries d
     JOIN messages m ON m.id = d.message_id
     LEFT JOIN users u ON u.id = m.sender_id";

fn read_view(row: &rusqlite::Row) -> rusqlite::Result<MessageViewRow> {
    Ok(MessageViewRow {
        id: row.get(0)?,
        subject: row.get(1)?,
        body: row.get(2)?,
        sender_id: row.get(3)?,
        sender_username: row
            .get::<_, Option<String>>(4)?
            .unwrap_or_else(|| "unknown".to_string()),
        created_at: row.get(5)?,
        role: row.get(6)?,
        is_read: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, StoreError};

    fn open_db() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("test.db")).unwrap();
        (db, dir)
    }

    #[test]
    fn delivery_uniqueness_is_enforced() {
        let (db, _dir) = open_db();
        db.with_conn::<_, StoreError, _>(|conn| {
            insert_user(conn, "u1", "alice", "alice@example.com", "hash")?;
            insert_message(conn, "m1", "hi", "body", "u1", "2026-01-01T00:00:00.000000Z")?;
            insert_delivery(conn, "d1", "m1", "u1", Role::Sender)?;
            Ok(())
        })
        .unwrap();

        let dup = db.with_conn::<_, StoreError, _>(|conn| {
            insert_delivery(conn, "d2", "m1", "u1", Role::Recipient)?;
            Ok(())
        });
        assert!(dup.is_err());
    }

    #[test]
    fn deleting_a_message_cascades_its_deliveries() {
        let (db, _dir) = open_db();
        db.with_conn::<_, StoreError, _>(|conn| {
            insert_user(conn, "u1", "alice", "alice@example.com", "hash")?;
            insert_user(conn, "u2", "bob", "bob@example.com", "hash")?;
            insert_message(conn, "m1", "hi", "body", "u1", "2026-01-01T00:00:00.000000Z")?;
            insert_delivery(conn, "d1", "m1", "u1", Role::Sender)?;
            insert_delivery(conn, "d2", "m1", "u2", Role::Recipient)?;

            delete_message(conn, "m1")?;
            assert_eq!(delivery_count(conn, "m1")?, 0);
            assert!(message_by_id(conn, "m1")?.is_none());

            // and again: already gone is a no-op
            delete_message(conn, "m1")?;
            Ok(())
        })
        .unwrap();
    }
}
