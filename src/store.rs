//! Keyed record store over a transaction context
//!
//! One store covers one `kind` namespace. It never retries and never caches:
//! every call goes straight to the context, which is responsible for
//! read-your-writes and for atomic commit.
use super::error::LedgerError;
use super::record::{CompositeKey, Record};
use super::world_state::TransactionContext;

pub struct RecordStore<'a, C: TransactionContext + ?Sized> {
    ctx: &'a mut C,
    kind: &'a str,
}

impl<'a, C: TransactionContext + ?Sized> RecordStore<'a, C> {
    pub fn new(ctx: &'a mut C, kind: &'a str) -> Self {
        Self { ctx, kind }
    }

    pub fn kind(&self) -> &str {
        self.kind
    }

    fn check_kind(&self, record: &Record) -> Result<(), LedgerError> {
        if record.kind() != self.kind {
            return Err(LedgerError::InvalidArgument(format!(
                "{} record cannot be stored in the {} namespace",
                record.kind(),
                self.kind
            )));
        }
        Ok(())
    }

    /// Persist a new record, refusing to overwrite an existing key.
    pub fn add(&mut self, record: &Record) -> Result<(), LedgerError> {
        self.check_kind(record)?;
        let key = record.key()?;

        if self.ctx.get_state(self.kind, &key)?.is_some() {
            return Err(LedgerError::AlreadyExists {
                kind: self.kind.to_string(),
                key: key.to_string(),
            });
        }

        self.ctx.put_state(self.kind, &key, record.serialize()?)
    }

    pub fn get(&self, key: &CompositeKey) -> Result<Record, LedgerError> {
        match self.ctx.get_state(self.kind, key)? {
            Some(bytes) => Record::deserialize(&bytes, self.kind),
            None => Err(LedgerError::NotFound {
                kind: self.kind.to_string(),
                key: key.to_string(),
            }),
        }
    }

    /// Overwrite a record fetched earlier in the same operation.
    pub fn update(&mut self, record: &Record) -> Result<(), LedgerError> {
        self.check_kind(record)?;
        let key = record.key()?;
        self.ctx.put_state(self.kind, &key, record.serialize()?)
    }

    /// Lazily decode every record in the namespace, in store order.
    pub fn list(&self) -> Result<impl Iterator<Item = Result<Record, LedgerError>> + '_, LedgerError> {
        let kind = self.kind;
        Ok(self
            .ctx
            .scan(kind)?
            .map(move |value| value.and_then(|bytes| Record::deserialize(&bytes, kind))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world_state::MemoryWorldState;
    use std::collections::BTreeMap;

    const KIND: &str = "org.papernet.letterofcredit";

    fn record(number: &str) -> Record {
        Record::create(
            KIND,
            vec!["BankA".to_string(), number.to_string()],
            BTreeMap::new(),
        )
        .unwrap()
    }

    #[test]
    fn add_then_get() {
        let mut state = MemoryWorldState::new();
        let mut tx = state.begin("BankA").unwrap();
        let mut store = RecordStore::new(&mut tx, KIND);

        let original = record("00001");
        store.add(&original).unwrap();

        assert_eq!(store.get(&original.key().unwrap()).unwrap(), original);
    }

    #[test]
    fn add_twice_is_rejected() {
        let mut state = MemoryWorldState::new();
        let mut tx = state.begin("BankA").unwrap();
        let mut store = RecordStore::new(&mut tx, KIND);

        store.add(&record("00001")).unwrap();
        let err = store.add(&record("00001")).unwrap_err();

        assert!(matches!(err, LedgerError::AlreadyExists { .. }));
    }

    #[test]
    fn get_missing_is_not_found() {
        let mut state = MemoryWorldState::new();
        let mut tx = state.begin("BankA").unwrap();
        let store = RecordStore::new(&mut tx, KIND);

        let key = CompositeKey::from_identity(&["BankA", "404"]).unwrap();
        let err = store.get(&key).unwrap_err();

        assert_eq!(
            err,
            LedgerError::NotFound {
                kind: KIND.to_string(),
                key: "BankA:404".to_string()
            }
        );
    }

    #[test]
    fn foreign_kind_is_rejected() {
        let mut state = MemoryWorldState::new();
        let mut tx = state.begin("BankA").unwrap();
        let mut store = RecordStore::new(&mut tx, "org.papernet.commercialpaper");

        let err = store.update(&record("00001")).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidArgument(_)));
    }

    #[test]
    fn list_is_restartable() {
        let mut state = MemoryWorldState::new();
        let mut tx = state.begin("BankA").unwrap();
        let mut store = RecordStore::new(&mut tx, KIND);

        for number in ["1", "2", "3"] {
            store.add(&record(number)).unwrap();
        }

        assert_eq!(store.list().unwrap().count(), 3);
        assert_eq!(store.list().unwrap().count(), 3);
    }
}
