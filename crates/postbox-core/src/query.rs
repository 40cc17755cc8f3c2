//! Viewer-scoped message listings: the filter/sort algebra over a user's own
//! delivery records.

use tracing::warn;
use uuid::Uuid;

use postbox_db::models::MessageViewRow;
use postbox_db::{Database, queries};
use postbox_types::models::{MessageFilter, MessageView, Role, SortOrder};

use crate::error::{Error, Result};

/// List messages visible to `viewer` under the given filter and sort order.
/// An empty result is a valid outcome, not an error.
pub fn list_for(
    db: &Database,
    viewer: Uuid,
    filter: MessageFilter,
    sort: SortOrder,
) -> Result<Vec<MessageView>> {
    let rows = db.with_conn(|conn| {
        Ok::<_, Error>(queries::list_for_viewer(
            conn,
            &viewer.to_string(),
            filter,
            sort,
        )?)
    })?;

    // Rows that fail to decode are skipped with a warning rather than
    // failing the whole listing.
    Ok(rows.into_iter().filter_map(decode_row).collect())
}

/// The viewer's view of a single message. `RecordNotFound` doubles as the
/// does-not-exist and not-a-participant answer; callers cannot distinguish
/// the two.
pub fn fetch(db: &Database, viewer: Uuid, message_id: Uuid) -> Result<MessageView> {
    let row = db.with_conn(|conn| {
        queries::message_for_viewer(conn, &message_id.to_string(), &viewer.to_string())?
            .ok_or(Error::RecordNotFound)
    })?;

    decode_row(row).ok_or_else(|| Error::StoreUnavailable("corrupt message row".into()))
}

fn decode_row(row: MessageViewRow) -> Option<MessageView> {
    let id = match row.id.parse::<Uuid>() {
        Ok(id) => id,
        Err(e) => {
            warn!("Corrupt message id '{}': {}", row.id, e);
            return None;
        }
    };
    let sender_id = match row.sender_id.parse::<Uuid>() {
        Ok(id) => id,
        Err(e) => {
            warn!("Corrupt sender_id '{}' on message '{}': {}", row.sender_id, row.id, e);
            return None;
        }
    };
    let Some(role) = Role::parse(&row.role) else {
        warn!("Corrupt role '{}' on message '{}'", row.role, row.id);
        return None;
    };
    let created_at = row
        .created_at
        .parse::<chrono::DateTime<chrono::Utc>>()
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on message '{}': {}", row.created_at, row.id, e);
            chrono::DateTime::default()
        });

    Some(MessageView {
        id,
        subject: row.subject,
        body: row.body,
        sender_id,
        sender_username: row.sender_username,
        created_at,
        role,
        is_read: row.is_read,
    })
}
