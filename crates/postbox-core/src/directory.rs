//! Account directory: email-to-identity resolution and account creation.
//! Passwords arrive pre-hashed; this layer never sees plaintext credentials.

use uuid::Uuid;

use postbox_db::models::UserRow;
use postbox_db::{Database, queries};

use crate::error::{Error, Result};

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 32;

pub fn create_account(
    db: &Database,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<Uuid> {
    let username = username.trim();
    let email = email.trim();

    if username.len() < USERNAME_MIN || username.len() > USERNAME_MAX {
        return Err(Error::InvalidInput("username must be 3-32 characters"));
    }
    if email.is_empty() || !email.contains('@') {
        return Err(Error::InvalidInput("email address is not valid"));
    }

    let id = Uuid::new_v4();
    db.with_conn_mut(|conn| {
        let tx = conn.transaction()?;
        if queries::user_by_username(&tx, username)?.is_some() {
            return Err(Error::DuplicateUsername);
        }
        if queries::user_by_email(&tx, email)?.is_some() {
            return Err(Error::DuplicateEmail);
        }
        queries::insert_user(&tx, &id.to_string(), username, email, password_hash)?;
        tx.commit()?;
        Ok(())
    })?;

    Ok(id)
}

/// Map an email address to its account id. Exact match on the address as
/// given; no normalization.
pub fn resolve(db: &Database, email: &str) -> Result<Uuid> {
    db.with_conn(|conn| {
        let row = queries::user_by_email(conn, email)?.ok_or(Error::NotFound)?;
        row.id
            .parse()
            .map_err(|_| Error::StoreUnavailable(format!("corrupt account id '{}'", row.id)))
    })
}

/// Login lookup; the row carries the password hash for verification.
pub fn find_by_username(db: &Database, username: &str) -> Result<Option<UserRow>> {
    db.with_conn(|conn| Ok(queries::user_by_username(conn, username)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::open_db;

    #[test]
    fn create_then_resolve_roundtrip() {
        let (db, _dir) = open_db();
        let id = create_account(&db, "alice", "alice@example.com", "hash").unwrap();
        assert_eq!(resolve(&db, "alice@example.com").unwrap(), id);
    }

    #[test]
    fn resolve_unknown_email_is_not_found() {
        let (db, _dir) = open_db();
        assert!(matches!(
            resolve(&db, "ghost@example.com"),
            Err(Error::NotFound)
        ));
    }

    #[test]
    fn duplicate_email_rejected() {
        let (db, _dir) = open_db();
        create_account(&db, "alice", "alice@example.com", "hash").unwrap();
        assert!(matches!(
            create_account(&db, "alice2", "alice@example.com", "hash"),
            Err(Error::DuplicateEmail)
        ));
    }

    #[test]
    fn duplicate_username_rejected() {
        let (db, _dir) = open_db();
        create_account(&db, "alice", "alice@example.com", "hash").unwrap();
        assert!(matches!(
            create_account(&db, "alice", "other@example.com", "hash"),
            Err(Error::DuplicateUsername)
        ));
    }

    #[test]
    fn invalid_input_rejected() {
        let (db, _dir) = open_db();
        assert!(matches!(
            create_account(&db, "al", "al@example.com", "hash"),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            create_account(&db, "alice", "not-an-email", "hash"),
            Err(Error::InvalidInput(_))
        ));
    }
}
