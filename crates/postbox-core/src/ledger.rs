//! Per-user delivery state: read flags and record deletion, including the
//! cascade that removes a message once its last record is gone.

use uuid::Uuid;

use postbox_db::{Database, queries};
use postbox_types::models::{DeleteOutcome, Role};

use crate::error::{Error, Result};

/// Mark the caller's copy of a message read. Only a recipient-side record
/// qualifies; a sender-only record reports `RecordNotFound`, same as no
/// record at all. Re-marking an already-read record is a no-op.
pub fn mark_read(db: &Database, owner: Uuid, message_id: Uuid) -> Result<()> {
    set_read(db, owner, message_id, true)
}

pub fn mark_unread(db: &Database, owner: Uuid, message_id: Uuid) -> Result<()> {
    set_read(db, owner, message_id, false)
}

fn set_read(db: &Database, owner: Uuid, message_id: Uuid, read: bool) -> Result<()> {
    db.with_conn_mut(|conn| {
        let tx = conn.transaction()?;
        let record = queries::delivery_for(&tx, &message_id.to_string(), &owner.to_string())?
            .ok_or(Error::RecordNotFound)?;
        let role = Role::parse(&record.role).ok_or_else(|| {
            Error::StoreUnavailable(format!(
                "corrupt role '{}' on delivery '{}'",
                record.role, record.id
            ))
        })?;
        if !role.is_recipient() {
            return Err(Error::RecordNotFound);
        }
        if record.is_read != read {
            queries::set_delivery_read(&tx, &record.id, read)?;
        }
        tx.commit()?;
        Ok(())
    })
}

/// Remove the caller's own delivery record. When it was the last one, the
/// message goes with it in the same transaction, so a record-less message is
/// never visible.
pub fn delete_record(db: &Database, owner: Uuid, message_id: Uuid) -> Result<DeleteOutcome> {
    db.with_conn_mut(|conn| {
        let tx = conn.transaction()?;
        let record = queries::delivery_for(&tx, &message_id.to_string(), &owner.to_string())?
            .ok_or(Error::RecordNotFound)?;
        queries::delete_delivery(&tx, &record.id)?;

        // Recount rather than trusting a stored counter; the transaction
        // makes the check-and-cascade atomic.
        let remaining = queries::delivery_count(&tx, &message_id.to_string())?;
        let outcome = if remaining == 0 {
            queries::delete_message(&tx, &message_id.to_string())?;
            DeleteOutcome::MessageFullyDeleted
        } else {
            DeleteOutcome::RecordRemoved
        };
        tx.commit()?;
        Ok(outcome)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{add_user, open_db};
    use crate::{fanout, query};

    fn send_to_bob(db: &Database, alice: Uuid) -> Uuid {
        fanout::send(db, alice, "subj", "body", &["bob@example.com".into()])
            .unwrap()
            .message_id
    }

    #[test]
    fn mark_read_is_idempotent() {
        let (db, _dir) = open_db();
        let alice = add_user(&db, "alice", "alice@example.com");
        let bob = add_user(&db, "bob", "bob@example.com");
        let message = send_to_bob(&db, alice);

        mark_read(&db, bob, message).unwrap();
        assert!(query::fetch(&db, bob, message).unwrap().is_read);

        // second call succeeds and changes nothing
        mark_read(&db, bob, message).unwrap();
        assert!(query::fetch(&db, bob, message).unwrap().is_read);
    }

    #[test]
    fn mark_unread_roundtrip() {
        let (db, _dir) = open_db();
        let alice = add_user(&db, "alice", "alice@example.com");
        let bob = add_user(&db, "bob", "bob@example.com");
        let message = send_to_bob(&db, alice);

        mark_read(&db, bob, message).unwrap();
        mark_unread(&db, bob, message).unwrap();
        assert!(!query::fetch(&db, bob, message).unwrap().is_read);
    }

    #[test]
    fn sender_only_record_cannot_be_marked_read() {
        let (db, _dir) = open_db();
        let alice = add_user(&db, "alice", "alice@example.com");
        add_user(&db, "bob", "bob@example.com");
        let message = send_to_bob(&db, alice);

        assert!(matches!(
            mark_read(&db, alice, message),
            Err(Error::RecordNotFound)
        ));
    }

    #[test]
    fn self_sender_holds_a_readable_record() {
        let (db, _dir) = open_db();
        let alice = add_user(&db, "alice", "alice@example.com");
        let message = fanout::send(&db, alice, "subj", "body", &["alice@example.com".into()])
            .unwrap()
            .message_id;

        mark_read(&db, alice, message).unwrap();
        assert!(query::fetch(&db, alice, message).unwrap().is_read);
    }

    #[test]
    fn mark_read_without_a_record_fails() {
        let (db, _dir) = open_db();
        let alice = add_user(&db, "alice", "alice@example.com");
        let bob = add_user(&db, "bob", "bob@example.com");
        let carol = add_user(&db, "carol", "carol@example.com");
        let message = send_to_bob(&db, alice);

        assert!(matches!(
            mark_read(&db, carol, message),
            Err(Error::RecordNotFound)
        ));
        assert!(matches!(
            mark_read(&db, bob, Uuid::new_v4()),
            Err(Error::RecordNotFound)
        ));
    }

    #[test]
    fn delete_keeps_the_message_for_other_participants() {
        let (db, _dir) = open_db();
        let alice = add_user(&db, "alice", "alice@example.com");
        let bob = add_user(&db, "bob", "bob@example.com");
        let message = send_to_bob(&db, alice);

        let outcome = delete_record(&db, alice, message).unwrap();
        assert_eq!(outcome, DeleteOutcome::RecordRemoved);

        // alice's view is gone, bob's survives
        assert!(matches!(
            query::fetch(&db, alice, message),
            Err(Error::RecordNotFound)
        ));
        assert!(query::fetch(&db, bob, message).is_ok());
    }

    #[test]
    fn last_delete_cascades_the_message_away() {
        let (db, _dir) = open_db();
        let alice = add_user(&db, "alice", "alice@example.com");
        let bob = add_user(&db, "bob", "bob@example.com");
        let message = send_to_bob(&db, alice);

        delete_record(&db, alice, message).unwrap();
        let outcome = delete_record(&db, bob, message).unwrap();
        assert_eq!(outcome, DeleteOutcome::MessageFullyDeleted);

        // gone for everyone, and the row itself is gone
        assert!(matches!(
            query::fetch(&db, bob, message),
            Err(Error::RecordNotFound)
        ));
        let row = db
            .with_conn::<_, Error, _>(|conn| {
                Ok(queries::message_by_id(conn, &message.to_string())?)
            })
            .unwrap();
        assert!(row.is_none());
    }

    #[test]
    fn users_cannot_delete_each_others_records() {
        let (db, _dir) = open_db();
        let alice = add_user(&db, "alice", "alice@example.com");
        let bob = add_user(&db, "bob", "bob@example.com");
        let carol = add_user(&db, "carol", "carol@example.com");
        let message = send_to_bob(&db, alice);

        assert!(matches!(
            delete_record(&db, carol, message),
            Err(Error::RecordNotFound)
        ));
        // bob's record is untouched
        assert!(query::fetch(&db, bob, message).is_ok());
    }
}
