use std::cell::Cell;
use vaultlog_core::db::open_db_in_memory;
use vaultlog_core::{
    AppendOutcome, LockRetryPolicy, RecordId, RecordKind, RecordRef, RecordStore, RecordUpdater,
    SqliteRecordStore, StoreError, StoreResult,
};

/// Delegating store that counts lock probes and can fail staged writes.
struct ProbeCountingStore<S> {
    inner: S,
    probes: Cell<u32>,
    fail_writes: bool,
}

impl<S: RecordStore> ProbeCountingStore<S> {
    fn new(inner: S) -> Self {
        Self {
            inner,
            probes: Cell::new(0),
            fail_writes: false,
        }
    }
}

impl<S: RecordStore> RecordStore for ProbeCountingStore<S> {
    fn is_structure_present(&self, kind: RecordKind) -> StoreResult<bool> {
        self.inner.is_structure_present(kind)
    }

    fn search_records(&self, kind: RecordKind, prefix: &str) -> StoreResult<Vec<RecordRef>> {
        self.inner.search_records(kind, prefix)
    }

    fn read_content(&self, record: &RecordRef) -> StoreResult<String> {
        self.inner.read_content(record)
    }

    fn is_locked(&self, id: RecordId) -> StoreResult<bool> {
        self.probes.set(self.probes.get() + 1);
        self.inner.is_locked(id)
    }

    fn check_out(&self, id: RecordId) -> StoreResult<bool> {
        self.inner.check_out(id)
    }

    fn write_content(&self, record: &RecordRef, content: &str) -> StoreResult<()> {
        if self.fail_writes {
            return Err(StoreError::InvalidData("write rejected".to_string()));
        }
        self.inner.write_content(record, content)
    }

    fn check_in(&self, id: RecordId) -> StoreResult<()> {
        self.inner.check_in(id)
    }

    fn undo_check_out(&self, id: RecordId) -> StoreResult<()> {
        self.inner.undo_check_out(id)
    }

    fn create_record(
        &self,
        kind: RecordKind,
        title: &str,
        content: &str,
    ) -> StoreResult<RecordRef> {
        self.inner.create_record(kind, title, content)
    }
}

fn provisioned(conn: &rusqlite::Connection) -> SqliteRecordStore<'_> {
    let store = SqliteRecordStore::with_writer_id(conn, "writer-a");
    store.provision_structure(RecordKind::Property).unwrap();
    store
}

#[test]
fn append_commits_new_content_and_releases_lock() {
    let conn = open_db_in_memory().unwrap();
    let store = provisioned(&conn);
    let record = store
        .create_record(RecordKind::Property, "Log-2021-05-12", "a\r\n")
        .unwrap();
    let retry = LockRetryPolicy::immediate(5);

    let outcome = RecordUpdater::new(&store, &retry).try_append(&record, "a\r\nb\r\n");

    assert_eq!(outcome, AppendOutcome::Appended);
    assert_eq!(store.read_content(&record).unwrap(), "a\r\nb\r\n");
    assert!(!store.is_locked(record.id).unwrap());
}

#[test]
fn append_gives_up_after_bounded_lock_probes() {
    let conn = open_db_in_memory().unwrap();
    let store = ProbeCountingStore::new(provisioned(&conn));
    let other = SqliteRecordStore::with_writer_id(&conn, "writer-b");
    let record = store
        .create_record(RecordKind::Property, "Log-2021-05-12", "a\r\n")
        .unwrap();
    assert!(other.check_out(record.id).unwrap());
    let retry = LockRetryPolicy::immediate(5);

    let outcome = RecordUpdater::new(&store, &retry).try_append(&record, "a\r\nb\r\n");

    assert_eq!(outcome, AppendOutcome::Locked);
    assert_eq!(store.probes.get(), 5);
    assert_eq!(store.read_content(&record).unwrap(), "a\r\n");
    assert!(store.is_locked(record.id).unwrap());
}

#[test]
fn failed_write_undoes_checkout() {
    let conn = open_db_in_memory().unwrap();
    let mut store = ProbeCountingStore::new(provisioned(&conn));
    store.fail_writes = true;
    let record = store
        .create_record(RecordKind::Property, "Log-2021-05-12", "a\r\n")
        .unwrap();
    let retry = LockRetryPolicy::immediate(5);

    let outcome = RecordUpdater::new(&store, &retry).try_append(&record, "a\r\nb\r\n");

    assert_eq!(outcome, AppendOutcome::Failed);
    assert_eq!(store.probes.get(), 1);
    assert!(!store.is_locked(record.id).unwrap());
    assert_eq!(store.read_content(&record).unwrap(), "a\r\n");
}

#[test]
fn stale_record_reports_conflict_and_undoes_checkout() {
    let conn = open_db_in_memory().unwrap();
    let store = provisioned(&conn);
    let other = SqliteRecordStore::with_writer_id(&conn, "writer-b");
    let stale = store
        .create_record(RecordKind::Property, "Log-2021-05-12", "a\r\n")
        .unwrap();
    let retry = LockRetryPolicy::immediate(5);
    assert_eq!(
        RecordUpdater::new(&other, &retry).try_append(&stale, "a\r\nother\r\n"),
        AppendOutcome::Appended
    );

    let outcome = RecordUpdater::new(&store, &retry).try_append(&stale, "a\r\nours\r\n");

    assert_eq!(outcome, AppendOutcome::Conflicted);
    assert!(!store.is_locked(stale.id).unwrap());
    assert_eq!(store.read_content(&stale).unwrap(), "a\r\nother\r\n");
}

#[test]
fn create_reports_rejection_as_none() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::new(&conn);
    let retry = LockRetryPolicy::default();
    let updater = RecordUpdater::new(&store, &retry);

    assert!(updater
        .try_create(RecordKind::File, "Log-2021-05-12", "x\r\n")
        .is_none());

    store.provision_structure(RecordKind::File).unwrap();
    let created = updater
        .try_create(RecordKind::File, "Log-2021-05-12", "x\r\n")
        .expect("create should succeed once structure exists");
    assert_eq!(created.title, "Log-2021-05-12");
    assert_eq!(store.read_content(&created).unwrap(), "x\r\n");
}
