//! In-memory manager over `MemoryConnector`.

use super::{records, Manager, ManagerError, ManagerResult};
use crate::connector::{Connector, MemoryConnector};
use crate::model::record::{FieldMap, FieldValue, Record};
use crate::stream::Document;
use std::marker::PhantomData;

/// Keeps one mapping per manager; `save()` hands it to the connector.
pub struct MemoryManager<'c, R> {
    connector: &'c MemoryConnector,
    partition: String,
    records: Document,
    _kind: PhantomData<R>,
}

impl<'c, R: Record> MemoryManager<'c, R> {
    /// Loads the partition's last dumped mapping from `connector`.
    ///
    /// # Errors
    /// - `ManagerError::NotConnected` when the connector is closed.
    pub fn new(partition: impl Into<String>, connector: &'c MemoryConnector) -> ManagerResult<Self> {
        if !connector.is_connected() {
            return Err(ManagerError::NotConnected);
        }
        let partition = partition.into();
        let records = connector.load(&partition);
        Ok(Self {
            connector,
            partition,
            records,
            _kind: PhantomData,
        })
    }
}

impl<R: Record> Manager<R> for MemoryManager<'_, R> {
    fn partition(&self) -> &str {
        &self.partition
    }

    fn fetch_by_field(&self, field: &str, value: &FieldValue) -> ManagerResult<Option<FieldMap>> {
        records::fetch_by_field(&self.records, R::KEY_FIELD, field, value)
    }

    fn fetch_all(&self) -> ManagerResult<Vec<FieldMap>> {
        records::fetch_all(&self.records)
    }

    fn upsert(&mut self, record: &R) -> ManagerResult<String> {
        records::upsert(&mut self.records, record)
    }

    fn delete(&mut self, keyid: &str) -> ManagerResult<()> {
        records::delete(&mut self.records, &self.partition, keyid)
    }

    fn save(&mut self) -> ManagerResult<()> {
        if !self.connector.is_connected() {
            return Err(ManagerError::NotConnected);
        }
        self.connector.dump(&self.partition, self.records.clone());
        Ok(())
    }
}
