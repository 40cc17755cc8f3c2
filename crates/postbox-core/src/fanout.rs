//! Message fanout: expands one send request into an immutable message row
//! plus one delivery record per resolved participant.

use std::collections::HashSet;

use chrono::{SecondsFormat, Utc};
use tracing::warn;
use uuid::Uuid;

use postbox_db::{Database, queries};
use postbox_types::models::{Role, SendReceipt, SendStatus};

use crate::error::{Error, Result};

/// Subject length cap, counted in code points.
pub const MAX_SUBJECT_LEN: usize = 100;

/// Send a message to a list of recipient emails.
///
/// The message row is created optimistically, before any recipient resolves;
/// if every recipient fails, the row is deleted again inside the same
/// transaction. `NoValidRecipients` is therefore authoritative cleanup
/// confirmation, not a retryable transient.
///
/// Recipients are deduplicated twice: exact string match on the email as
/// given, then again at the identity level once resolved (two spellings
/// reaching the same account attach it once, silently). A sender who
/// addresses themselves has their existing record promoted to `both` rather
/// than getting a second one.
pub fn send(
    db: &Database,
    sender_id: Uuid,
    subject: &str,
    body: &str,
    recipients: &[String],
) -> Result<SendReceipt> {
    if subject.chars().count() > MAX_SUBJECT_LEN {
        return Err(Error::InvalidInput("subject must be at most 100 characters"));
    }

    // String-level dedup, first occurrence wins.
    let mut seen = HashSet::new();
    let unique: Vec<&str> = recipients
        .iter()
        .map(String::as_str)
        .filter(|e| seen.insert(*e))
        .collect();

    // Nothing to resolve: fail before touching the store.
    if unique.is_empty() {
        return Err(Error::NoValidRecipients { failed: vec![] });
    }

    let message_id = Uuid::new_v4();
    let created_at = Utc::now();
    // Fixed-width RFC 3339 so lexicographic order is chronological.
    let timestamp = created_at.to_rfc3339_opts(SecondsFormat::Micros, true);

    db.with_conn_mut(|conn| {
        let tx = conn.transaction()?;

        queries::insert_message(
            &tx,
            &message_id.to_string(),
            subject,
            body,
            &sender_id.to_string(),
            &timestamp,
        )?;

        let sender_delivery = Uuid::new_v4().to_string();
        queries::insert_delivery(
            &tx,
            &sender_delivery,
            &message_id.to_string(),
            &sender_id.to_string(),
            Role::Sender,
        )?;

        let mut failed: Vec<String> = Vec::new();
        let mut attached: HashSet<Uuid> = HashSet::new();
        let mut sender_promoted = false;

        for email in &unique {
            let Some(user) = queries::user_by_email(&tx, email)? else {
                failed.push((*email).to_string());
                continue;
            };
            let Ok(user_id) = user.id.parse::<Uuid>() else {
                warn!("Corrupt account id '{}' for email '{}'", user.id, email);
                failed.push((*email).to_string());
                continue;
            };

            if user_id == sender_id {
                // Self-send merge: promote the sender's record instead of
                // creating a second one.
                if !sender_promoted {
                    queries::update_delivery_role(&tx, &sender_delivery, Role::Both)?;
                    sender_promoted = true;
                }
                attached.insert(user_id);
            } else if attached.insert(user_id) {
                queries::insert_delivery(
                    &tx,
                    &Uuid::new_v4().to_string(),
                    &message_id.to_string(),
                    &user_id.to_string(),
                    Role::Recipient,
                )?;
            }
        }

        if attached.is_empty() {
            // Total failure: take the transient message back. The foreign
            // key cascades the sender's record away with it.
            queries::delete_message(&tx, &message_id.to_string())?;
            tx.commit()?;
            return Err(Error::NoValidRecipients { failed });
        }

        let status = if failed.is_empty() {
            SendStatus::Sent
        } else {
            SendStatus::Partial
        };
        let receipt = SendReceipt {
            message_id,
            created_at,
            status,
            recipient_count: attached.len(),
            failed_recipients: failed,
        };
        tx.commit()?;
        Ok(receipt)
    })
}
