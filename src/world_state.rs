//! Transaction contexts over a key-value world state
//!
//! The ledger layer that orders and replicates transactions lives outside
//! this crate. What the core needs from it is captured by
//! [`TransactionContext`]: read-your-writes access to namespaced keys, a
//! namespace scan and the identity of the caller. Two backends are provided,
//! an in-memory map and a [`sled`] database. In both, writes are buffered in
//! the transaction and only become visible on `commit`; dropping the
//! transaction aborts it.
use super::config::StorageConfig;
use super::error::LedgerError;
use super::record::{CompositeKey, KEY_DELIMITER};
use bech32::Bech32m;
use sled::Batch;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid7::uuid7;

pub type StateIter<'a> = Box<dyn Iterator<Item = Result<Vec<u8>, LedgerError>> + 'a>;

pub trait TransactionContext {
    fn tx_id(&self) -> &str;
    fn caller(&self) -> &str;
    fn get_state(&self, namespace: &str, key: &CompositeKey)
    -> Result<Option<Vec<u8>>, LedgerError>;
    fn put_state(
        &mut self,
        namespace: &str,
        key: &CompositeKey,
        value: Vec<u8>,
    ) -> Result<(), LedgerError>;
    /// Every value stored under `namespace`, pending writes included.
    fn scan(&self, namespace: &str) -> Result<StateIter<'_>, LedgerError>;
}

// construct a unique transaction id then encode using bech32
pub fn new_tx_id() -> Result<String, LedgerError> {
    let hrp = bech32::Hrp::parse("tx_").map_err(|e| LedgerError::InvalidArgument(e.to_string()))?;
    bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())
        .map_err(|e| LedgerError::InvalidArgument(e.to_string()))
}

fn namespace_prefix(namespace: &str) -> String {
    format!("{namespace}{KEY_DELIMITER}")
}

fn namespaced_key(namespace: &str, key: &CompositeKey) -> String {
    format!("{namespace}{KEY_DELIMITER}{}", key.as_str())
}

/// World state held in a plain ordered map, mostly for tests and tooling.
#[derive(Debug, Default, Clone)]
pub struct MemoryWorldState {
    entries: BTreeMap<String, Vec<u8>>,
}

pub struct MemoryTransaction<'a> {
    entries: &'a mut BTreeMap<String, Vec<u8>>,
    writes: BTreeMap<String, Vec<u8>>,
    tx_id: String,
    caller: String,
}

impl MemoryWorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, caller: &str) -> Result<MemoryTransaction<'_>, LedgerError> {
        Ok(MemoryTransaction {
            entries: &mut self.entries,
            writes: BTreeMap::new(),
            tx_id: new_tx_id()?,
            caller: caller.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MemoryTransaction<'_> {
    pub fn commit(self) {
        tracing::debug!(tx_id = %self.tx_id, writes = self.writes.len(), "commit");
        self.entries.extend(self.writes);
    }
}

impl TransactionContext for MemoryTransaction<'_> {
    fn tx_id(&self) -> &str {
        &self.tx_id
    }

    fn caller(&self) -> &str {
        &self.caller
    }

    fn get_state(
        &self,
        namespace: &str,
        key: &CompositeKey,
    ) -> Result<Option<Vec<u8>>, LedgerError> {
        let key = namespaced_key(namespace, key);
        Ok(self
            .writes
            .get(&key)
            .or_else(|| self.entries.get(&key))
            .cloned())
    }

    fn put_state(
        &mut self,
        namespace: &str,
        key: &CompositeKey,
        value: Vec<u8>,
    ) -> Result<(), LedgerError> {
        self.writes.insert(namespaced_key(namespace, key), value);
        Ok(())
    }

    fn scan(&self, namespace: &str) -> Result<StateIter<'_>, LedgerError> {
        let prefix = namespace_prefix(namespace);
        let entries: &BTreeMap<String, Vec<u8>> = self.entries;
        let writes = &self.writes;

        let committed = entries
            .range(prefix.clone()..)
            .take_while({
                let prefix = prefix.clone();
                move |(key, _)| key.starts_with(&prefix)
            })
            .map(move |(key, value)| Ok::<_, LedgerError>(writes.get(key).unwrap_or(value).clone()));
        let pending = writes
            .range(prefix.clone()..)
            .take_while(move |(key, _)| key.starts_with(&prefix))
            .filter(move |(key, _)| !entries.contains_key(*key))
            .map(|(_, value)| Ok::<_, LedgerError>(value.clone()));

        Ok(Box::new(committed.chain(pending)))
    }
}

/// World state persisted in a single sled tree, keys prefixed by namespace.
pub struct SledWorldState {
    instance: Arc<sled::Db>,
}

pub struct SledTransaction {
    instance: Arc<sled::Db>,
    writes: BTreeMap<Vec<u8>, Vec<u8>>,
    tx_id: String,
    caller: String,
}

impl SledWorldState {
    pub fn new(instance: Arc<sled::Db>) -> Self {
        Self { instance }
    }

    pub fn open(config: &StorageConfig) -> Result<Self, LedgerError> {
        let db = sled::Config::new()
            .path(&config.path)
            .temporary(config.temporary)
            .cache_capacity(config.cache_capacity)
            .flush_every_ms(config.flush_every_ms)
            .open()?;
        tracing::info!(path = %config.path.display(), temporary = config.temporary, "opened world state");

        Ok(Self::new(Arc::new(db)))
    }

    pub fn begin(&self, caller: &str) -> Result<SledTransaction, LedgerError> {
        Ok(SledTransaction {
            instance: Arc::clone(&self.instance),
            writes: BTreeMap::new(),
            tx_id: new_tx_id()?,
            caller: caller.to_string(),
        })
    }

    pub fn flush(&self) -> Result<(), LedgerError> {
        self.instance.flush()?;
        Ok(())
    }
}

impl SledTransaction {
    /// Apply every buffered write as one atomic batch.
    pub fn commit(self) -> Result<(), LedgerError> {
        let count = self.writes.len();
        let mut batch = Batch::default();
        for (key, value) in self.writes {
            batch.insert(key, value);
        }
        self.instance.apply_batch(batch)?;
        tracing::info!(tx_id = %self.tx_id, writes = count, "commit");
        Ok(())
    }
}

impl TransactionContext for SledTransaction {
    fn tx_id(&self) -> &str {
        &self.tx_id
    }

    fn caller(&self) -> &str {
        &self.caller
    }

    fn get_state(
        &self,
        namespace: &str,
        key: &CompositeKey,
    ) -> Result<Option<Vec<u8>>, LedgerError> {
        let key = namespaced_key(namespace, key).into_bytes();
        if let Some(pending) = self.writes.get(&key) {
            return Ok(Some(pending.clone()));
        }
        Ok(self.instance.get(&key)?.map(|value| value.to_vec()))
    }

    fn put_state(
        &mut self,
        namespace: &str,
        key: &CompositeKey,
        value: Vec<u8>,
    ) -> Result<(), LedgerError> {
        self.writes
            .insert(namespaced_key(namespace, key).into_bytes(), value);
        Ok(())
    }

    fn scan(&self, namespace: &str) -> Result<StateIter<'_>, LedgerError> {
        let prefix = namespace_prefix(namespace).into_bytes();
        let instance = &self.instance;
        let writes = &self.writes;

        let committed = instance
            .scan_prefix(&prefix)
            .map(move |entry| -> Result<Vec<u8>, LedgerError> {
                let (key, value) = entry?;
                Ok(match writes.get(&*key) {
                    Some(pending) => pending.clone(),
                    None => value.to_vec(),
                })
            });
        let pending = writes
            .iter()
            .filter(move |(key, _)| key.starts_with(&prefix))
            .filter_map(move |(key, value)| match instance.contains_key(key) {
                Ok(true) => None,
                Ok(false) => Some(Ok(value.clone())),
                Err(e) => Some(Err(LedgerError::from(e))),
            });

        Ok(Box::new(committed.chain(pending)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(number: &str) -> CompositeKey {
        CompositeKey::from_identity(&["BankA", number]).unwrap()
    }

    #[test]
    fn tx_ids_are_unique_bech32() {
        let a = new_tx_id().unwrap();
        let b = new_tx_id().unwrap();

        assert!(a.starts_with("tx_1"));
        assert_ne!(a, b);
    }

    #[test]
    fn memory_reads_its_own_writes() {
        let mut state = MemoryWorldState::new();
        let mut tx = state.begin("BankA").unwrap();

        tx.put_state("ns", &key("1"), b"one".to_vec()).unwrap();

        assert_eq!(tx.get_state("ns", &key("1")).unwrap(), Some(b"one".to_vec()));
        assert_eq!(tx.get_state("other", &key("1")).unwrap(), None);
    }

    #[test]
    fn memory_drop_discards_writes() {
        let mut state = MemoryWorldState::new();
        {
            let mut tx = state.begin("BankA").unwrap();
            tx.put_state("ns", &key("1"), b"one".to_vec()).unwrap();
        }
        assert!(state.is_empty());

        let mut tx = state.begin("BankA").unwrap();
        tx.put_state("ns", &key("1"), b"one".to_vec()).unwrap();
        tx.commit();
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn memory_scan_overlays_pending_writes() {
        let mut state = MemoryWorldState::new();
        let mut tx = state.begin("BankA").unwrap();
        tx.put_state("ns", &key("1"), b"old".to_vec()).unwrap();
        tx.put_state("nsx", &key("1"), b"elsewhere".to_vec()).unwrap();
        tx.commit();

        let mut tx = state.begin("BankA").unwrap();
        tx.put_state("ns", &key("1"), b"new".to_vec()).unwrap();
        tx.put_state("ns", &key("2"), b"two".to_vec()).unwrap();

        let mut values: Vec<Vec<u8>> = tx.scan("ns").unwrap().map(Result::unwrap).collect();
        values.sort();
        assert_eq!(values, vec![b"new".to_vec(), b"two".to_vec()]);
    }

    #[test]
    fn sled_commit_is_visible_to_later_transactions() {
        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path().join("world_state.db")).unwrap();
        let state = SledWorldState::new(Arc::new(db));

        let mut tx = state.begin("BankA").unwrap();
        tx.put_state("ns", &key("1"), b"one".to_vec()).unwrap();
        assert_eq!(tx.scan("ns").unwrap().count(), 1);
        drop(tx);

        let tx = state.begin("BankA").unwrap();
        assert_eq!(tx.get_state("ns", &key("1")).unwrap(), None);

        let mut tx = state.begin("BankA").unwrap();
        tx.put_state("ns", &key("1"), b"one".to_vec()).unwrap();
        tx.commit().unwrap();

        let tx = state.begin("BankB").unwrap();
        assert_eq!(tx.get_state("ns", &key("1")).unwrap(), Some(b"one".to_vec()));
        assert_eq!(tx.caller(), "BankB");
        assert_eq!(tx.scan("ns").unwrap().count(), 1);
    }
}
