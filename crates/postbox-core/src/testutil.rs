use tempfile::TempDir;
use uuid::Uuid;

use postbox_db::Database;

use crate::directory;

pub fn open_db() -> (Database, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&dir.path().join("test.db")).unwrap();
    (db, dir)
}

pub fn add_user(db: &Database, username: &str, email: &str) -> Uuid {
    directory::create_account(db, username, email, "hash").unwrap()
}
