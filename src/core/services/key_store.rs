use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

use crate::core::errors::{Result, SealroomError};
use crate::core::models::fingerprint::Fingerprint;
use crate::core::models::key_record::{FingerprintEntry, KeyRecord};
use crate::core::traits::key_value::{KeyValueStore, slots};

/// Schema version written into every persisted list.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Serialize)]
struct Versioned<'a, T: Serialize> {
    version: u32,
    data: &'a T,
}

/// Registry of trusted recipient keys plus the hidden-key set.
///
/// Keys and fingerprints are persisted as two parallel lists
/// (`recipient-public-keys`, `public-key-fingerprints`) that always have
/// the same length. Every read-modify-write holds `write_lock`.
pub struct KeyStore<S: KeyValueStore> {
    backend: S,
    write_lock: Mutex<()>,
}

impl<S: KeyValueStore> KeyStore<S> {
    pub fn new(backend: S) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
        }
    }

    /// The persistence backend, for slots the key store does not own.
    pub fn backend(&self) -> &S {
        &self.backend
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ─── Reads ───────────────────────────────────────────────────

    /// All stored records in insertion order.
    pub fn records(&self) -> Result<Vec<KeyRecord>> {
        let keys: Vec<String> = load_list(&self.backend, slots::RECIPIENT_KEYS)?;
        let entries: Vec<FingerprintEntry> = load_list(&self.backend, slots::FINGERPRINTS)?;

        if keys.len() != entries.len() {
            tracing::warn!(
                keys = keys.len(),
                fingerprints = entries.len(),
                "key and fingerprint lists out of step, keeping the common prefix"
            );
        }

        Ok(entries
            .into_iter()
            .zip(keys)
            .map(|(entry, armored)| entry.into_record(armored))
            .collect())
    }

    /// `(label, fingerprint)` pairs in insertion order.
    pub fn list_fingerprints(&self) -> Result<Vec<(String, Fingerprint)>> {
        Ok(self
            .records()?
            .into_iter()
            .map(|r| (r.label, r.fingerprint))
            .collect())
    }

    /// Armored blocks of every trusted recipient.
    pub fn recipient_keys(&self) -> Result<Vec<String>> {
        Ok(self.records()?.into_iter().map(|r| r.armored).collect())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.records()?.len())
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> Result<bool> {
        Ok(self
            .records()?
            .iter()
            .any(|r| &r.fingerprint == fingerprint))
    }

    /// Fingerprints the user already decided on, in the order they were hidden.
    pub fn hidden_keys(&self) -> Result<Vec<Fingerprint>> {
        load_list(&self.backend, slots::HIDDEN_KEYS)
    }

    pub fn is_hidden(&self, fingerprint: &Fingerprint) -> Result<bool> {
        Ok(self.hidden_keys()?.contains(fingerprint))
    }

    /// SHA-256 over the stored fingerprints, one per line.
    pub fn state_hash(&self) -> Result<String> {
        let mut hasher = Sha256::new();
        for record in self.records()? {
            hasher.update(record.fingerprint.as_str().as_bytes());
            hasher.update(b"\n");
        }
        Ok(format!("{:x}", hasher.finalize()))
    }

    // ─── Mutations ───────────────────────────────────────────────

    /// Append `record` unless its fingerprint is already stored.
    /// Returns `false` when it was a duplicate.
    pub fn insert(&self, record: KeyRecord) -> Result<bool> {
        let _guard = self.lock();
        let mut records = self.records()?;

        if records.iter().any(|r| r.fingerprint == record.fingerprint) {
            return Ok(false);
        }

        records.push(record);
        self.save(&records)?;
        Ok(true)
    }

    /// Remove the record with `fingerprint`. Returns `false` if absent.
    pub fn remove_fingerprint(&self, fingerprint: &Fingerprint) -> Result<bool> {
        let _guard = self.lock();
        let mut records = self.records()?;

        let Some(index) = records.iter().position(|r| &r.fingerprint == fingerprint) else {
            return Ok(false);
        };

        records.remove(index);
        self.save(&records)?;
        Ok(true)
    }

    /// Remove the record at `index`, keeping the order of the rest.
    pub fn remove_at(&self, index: usize) -> Result<KeyRecord> {
        let _guard = self.lock();
        let mut records = self.records()?;

        if index >= records.len() {
            return Err(SealroomError::IndexOutOfRange {
                index,
                len: records.len(),
            });
        }

        let removed = records.remove(index);
        self.save(&records)?;
        Ok(removed)
    }

    /// Change the display label of the record at `index`.
    pub fn relabel(&self, index: usize, label: &str) -> Result<()> {
        let _guard = self.lock();
        let mut records = self.records()?;

        let len = records.len();
        let record = records
            .get_mut(index)
            .ok_or(SealroomError::IndexOutOfRange { index, len })?;
        record.label = label.trim().to_string();

        self.save(&records)
    }

    /// Drop every stored key. The hidden-key set is left alone.
    pub fn clear_all(&self) -> Result<()> {
        let _guard = self.lock();
        self.backend.remove(slots::FINGERPRINTS)?;
        self.backend.remove(slots::RECIPIENT_KEYS)
    }

    /// Add `fingerprint` to the hidden-key set (idempotent).
    pub fn hide(&self, fingerprint: &Fingerprint) -> Result<()> {
        let _guard = self.lock();
        let mut hidden = self.hidden_keys()?;

        if hidden.contains(fingerprint) {
            return Ok(());
        }

        hidden.push(fingerprint.clone());
        store_list(&self.backend, slots::HIDDEN_KEYS, &hidden)
    }

    /// Write both lists. If the second write fails the first is rolled back.
    fn save(&self, records: &[KeyRecord]) -> Result<()> {
        let previous_keys = self.backend.get(slots::RECIPIENT_KEYS)?;

        let keys: Vec<&str> = records.iter().map(|r| r.armored.as_str()).collect();
        let entries: Vec<FingerprintEntry> =
            records.iter().map(FingerprintEntry::from_record).collect();

        store_list(&self.backend, slots::RECIPIENT_KEYS, &keys)?;

        if let Err(e) = store_list(&self.backend, slots::FINGERPRINTS, &entries) {
            let rollback = match &previous_keys {
                Some(raw) => self.backend.put(slots::RECIPIENT_KEYS, raw),
                None => self.backend.remove(slots::RECIPIENT_KEYS),
            };
            if let Err(rb) = rollback {
                tracing::error!(error = %rb, "rollback of recipient keys failed");
            }
            return Err(e);
        }

        Ok(())
    }
}

/// Read a versioned (or legacy unversioned) JSON list.
///
/// Absent or unparsable data reads as empty. Data written by a newer
/// schema is refused so it is never overwritten.
pub fn load_list<T: DeserializeOwned>(backend: &impl KeyValueStore, name: &str) -> Result<Vec<T>> {
    let Some(raw) = backend.get(name)? else {
        return Ok(Vec::new());
    };

    let value: serde_json::Value = match serde_json::from_str(&raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(slot = name, error = %e, "unparsable stored data, treating as empty");
            return Ok(Vec::new());
        }
    };

    let (version, data) = match value {
        serde_json::Value::Object(mut map) => {
            let version = map
                .get("version")
                .and_then(serde_json::Value::as_u64)
                .map_or(0, |v| u32::try_from(v).unwrap_or(u32::MAX));
            (version, map.remove("data").unwrap_or(serde_json::Value::Null))
        }
        legacy => (0, legacy),
    };

    if version > SCHEMA_VERSION {
        return Err(SealroomError::FormatVersionTooNew {
            found: version,
            supported: SCHEMA_VERSION,
        });
    }

    match serde_json::from_value(data) {
        Ok(list) => Ok(list),
        Err(e) => {
            tracing::warn!(slot = name, error = %e, "invalid stored records, treating as empty");
            Ok(Vec::new())
        }
    }
}

/// Write `items` under `name` wrapped in the current schema version.
pub fn store_list<T: Serialize>(
    backend: &impl KeyValueStore,
    name: &str,
    items: &[T],
) -> Result<()> {
    let json = serde_json::to_string(&Versioned {
        version: SCHEMA_VERSION,
        data: &items,
    })
    .map_err(|e| SealroomError::PersistenceUnavailable {
        detail: format!("Failed to serialize {name}: {e}"),
    })?;
    backend.put(name, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::key_record::KeyOrigin;
    use crate::core::test_support::{MemoryStore, fake_fingerprint, fake_public};

    fn record(name: &str) -> KeyRecord {
        KeyRecord {
            fingerprint: fake_fingerprint(name),
            armored: fake_public(name),
            label: name.to_string(),
            origin: KeyOrigin::ImportedFromChat,
            added_at: None,
        }
    }

    fn store_with(names: &[&str]) -> KeyStore<MemoryStore> {
        let store = KeyStore::new(MemoryStore::new());
        for name in names {
            store.insert(record(name)).unwrap();
        }
        store
    }

    fn assert_lock_step(store: &KeyStore<MemoryStore>) {
        let keys: Vec<String> = load_list(store.backend(), slots::RECIPIENT_KEYS).unwrap();
        let entries: Vec<FingerprintEntry> =
            load_list(store.backend(), slots::FINGERPRINTS).unwrap();
        assert_eq!(keys.len(), entries.len());
    }

    #[test]
    fn empty_store_lists_nothing() {
        let store = KeyStore::new(MemoryStore::new());
        assert!(store.list_fingerprints().unwrap().is_empty());
        assert!(store.hidden_keys().unwrap().is_empty());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn insert_and_list_in_order() {
        let store = store_with(&["alice", "bob"]);
        let listed = store.list_fingerprints().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0], ("alice".to_string(), fake_fingerprint("alice")));
        assert_eq!(listed[1], ("bob".to_string(), fake_fingerprint("bob")));
    }

    #[test]
    fn insert_duplicate_fingerprint_is_ignored() {
        let store = store_with(&["alice"]);
        assert!(!store.insert(record("alice")).unwrap());
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn remove_at_preserves_order_of_rest() {
        let store = store_with(&["alice", "bob", "carol"]);
        let removed = store.remove_at(1).unwrap();
        assert_eq!(removed.label, "bob");

        let labels: Vec<String> = store
            .list_fingerprints()
            .unwrap()
            .into_iter()
            .map(|(l, _)| l)
            .collect();
        assert_eq!(labels, vec!["alice", "carol"]);
        assert_lock_step(&store);
    }

    #[test]
    fn remove_at_out_of_range_leaves_store_unchanged() {
        let store = store_with(&["alice", "bob"]);
        let before = store.backend().raw(slots::FINGERPRINTS);

        let err = store.remove_at(2).unwrap_err();
        assert!(matches!(
            err,
            SealroomError::IndexOutOfRange { index: 2, len: 2 }
        ));
        assert_eq!(store.backend().raw(slots::FINGERPRINTS), before);
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn clear_all_empties_both_lists_but_keeps_hidden() {
        let store = store_with(&["alice", "bob"]);
        store.hide(&fake_fingerprint("mallory")).unwrap();

        store.clear_all().unwrap();

        assert!(store.is_empty().unwrap());
        assert_lock_step(&store);
        assert_eq!(store.hidden_keys().unwrap().len(), 1);
    }

    #[test]
    fn relabel_changes_only_label() {
        let store = store_with(&["alice"]);
        store.relabel(0, "  Alice (work) ").unwrap();

        let records = store.records().unwrap();
        assert_eq!(records[0].label, "Alice (work)");
        assert_eq!(records[0].fingerprint, fake_fingerprint("alice"));
    }

    #[test]
    fn relabel_out_of_range_fails() {
        let store = store_with(&[]);
        assert!(store.relabel(0, "x").is_err());
    }

    #[test]
    fn hide_is_idempotent() {
        let store = KeyStore::new(MemoryStore::new());
        let fp = fake_fingerprint("alice");
        store.hide(&fp).unwrap();
        store.hide(&fp).unwrap();
        assert_eq!(store.hidden_keys().unwrap(), vec![fp]);
    }

    #[test]
    fn lock_step_holds_after_mixed_operations() {
        let store = store_with(&["a", "b", "c", "d"]);
        store.remove_at(0).unwrap();
        assert_lock_step(&store);
        store.remove_fingerprint(&fake_fingerprint("c")).unwrap();
        assert_lock_step(&store);
        store.insert(record("e")).unwrap();
        assert_lock_step(&store);
        let _ = store.remove_at(99);
        assert_lock_step(&store);
        store.clear_all().unwrap();
        assert_lock_step(&store);
        store.insert(record("f")).unwrap();
        assert_lock_step(&store);
    }

    #[test]
    fn failed_write_reports_persistence_error() {
        let store = store_with(&["alice"]);
        store.backend().fail_writes(true);

        let err = store.insert(record("bob")).unwrap_err();
        assert!(matches!(err, SealroomError::PersistenceUnavailable { .. }));

        store.backend().fail_writes(false);
        assert_eq!(store.len().unwrap(), 1);
        assert_lock_step(&store);
    }

    #[test]
    fn unparsable_data_reads_as_empty() {
        let backend = MemoryStore::new();
        backend.set_raw(slots::HIDDEN_KEYS, "{not json");
        backend.set_raw(slots::RECIPIENT_KEYS, "[1, 2, 3]");
        let store = KeyStore::new(backend);

        assert!(store.hidden_keys().unwrap().is_empty());
        assert!(store.records().unwrap().is_empty());
    }

    #[test]
    fn legacy_unversioned_lists_are_read() {
        let backend = MemoryStore::new();
        let fp = fake_fingerprint("alice");
        backend.set_raw(
            slots::RECIPIENT_KEYS,
            &serde_json::to_string(&vec![fake_public("alice")]).unwrap(),
        );
        backend.set_raw(
            slots::FINGERPRINTS,
            &format!(r#"[{{"keyBlock":"...","fingerprint":"{fp}"}}]"#),
        );
        let store = KeyStore::new(backend);

        let records = store.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].fingerprint, fp);
        assert_eq!(records[0].label, "(imported from chat)");
    }

    #[test]
    fn newer_schema_is_refused() {
        let backend = MemoryStore::new();
        backend.set_raw(slots::HIDDEN_KEYS, r#"{"version":99,"data":[]}"#);
        let store = KeyStore::new(backend);

        let err = store.hidden_keys().unwrap_err();
        assert!(matches!(
            err,
            SealroomError::FormatVersionTooNew { found: 99, .. }
        ));
    }

    #[test]
    fn mismatched_lists_keep_common_prefix() {
        let backend = MemoryStore::new();
        store_list(&backend, slots::RECIPIENT_KEYS, &[fake_public("a"), fake_public("b")]).unwrap();
        let entries = vec![FingerprintEntry::from_record(&record("a"))];
        store_list(&backend, slots::FINGERPRINTS, &entries).unwrap();

        let store = KeyStore::new(backend);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn state_hash_tracks_contents() {
        let store = store_with(&["alice"]);
        let before = store.state_hash().unwrap();
        store.insert(record("bob")).unwrap();
        assert_ne!(before, store.state_hash().unwrap());
        assert_eq!(before.len(), 64);
    }
}
