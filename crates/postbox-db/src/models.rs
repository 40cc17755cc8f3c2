/// Database row types — these map directly to SQLite rows.
/// Distinct from postbox-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub subject: String,
    pub body: String,
    pub sender_id: String,
    pub created_at: String,
}

pub struct DeliveryRow {
    pub id: String,
    pub message_id: String,
    pub user_id: String,
    pub role: String,
    pub is_read: bool,
}

/// One row of the viewer-scoped listing: message columns joined with the
/// viewer's own delivery record.
pub struct MessageViewRow {
    pub id: String,
    pub subject: String,
    pub body: String,
    pub sender_id: String,
    pub sender_username: String,
    pub created_at: String,
    pub role: String,
    pub is_read: bool,
}
