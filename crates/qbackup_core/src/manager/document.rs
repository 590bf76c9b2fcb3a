//! Document-store manager: one branch of a locked JSON document.
//!
//! # Invariants
//! - The whole tree is loaded once at construction and written back whole.
//! - Reads and writes require the directory lock to be held.
//! - The partition branch is created as an empty object on first write.

use super::{records, Manager, ManagerError, ManagerResult};
use crate::connector::{Connector, DirLockConnector};
use crate::model::record::{value_kind, FieldMap, FieldValue, Record};
use crate::stream::{Document, DocumentStream, JsonFileStream};
use log::info;
use std::marker::PhantomData;

/// Default document file inside a locked directory.
pub const DOCUMENT_FILE_NAME: &str = "config.json";

/// Buffered manager over a document tree; changes land on `save()`.
pub struct DocumentManager<'c, R, S = JsonFileStream> {
    connector: &'c DirLockConnector,
    stream: S,
    partition: String,
    tree: Document,
    _kind: PhantomData<R>,
}

impl<'c, R: Record> DocumentManager<'c, R> {
    /// Opens `partition` in `DOCUMENT_FILE_NAME` under the locked directory.
    pub fn open(partition: impl Into<String>, connector: &'c DirLockConnector) -> ManagerResult<Self> {
        let stream = JsonFileStream::new(connector.document_path(DOCUMENT_FILE_NAME));
        Self::new(stream, partition, connector)
    }
}

impl<'c, R: Record, S: DocumentStream> DocumentManager<'c, R, S> {
    /// Loads the document tree from `stream`.
    ///
    /// # Errors
    /// - `ManagerError::NotConnected` when the directory lock is not held.
    /// - `ManagerError::Malformed` when the root or the partition branch is
    ///   not an object.
    /// - `ManagerError::Stream` when the document cannot be read.
    pub fn new(
        stream: S,
        partition: impl Into<String>,
        connector: &'c DirLockConnector,
    ) -> ManagerResult<Self> {
        if !connector.is_connected() {
            return Err(ManagerError::NotConnected);
        }

        let partition = partition.into();
        let tree = match stream.load()? {
            FieldValue::Object(tree) => tree,
            other => {
                return Err(ManagerError::Malformed(format!(
                    "document root must be an object, found {}",
                    value_kind(&other)
                )));
            }
        };
        if let Some(branch) = tree.get(&partition) {
            if !branch.is_object() {
                return Err(ManagerError::Malformed(format!(
                    "partition `{partition}` must be an object, found {}",
                    value_kind(branch)
                )));
            }
        }

        Ok(Self {
            connector,
            stream,
            partition,
            tree,
            _kind: PhantomData,
        })
    }

    fn branch(&self) -> Option<&Document> {
        self.tree.get(&self.partition).and_then(FieldValue::as_object)
    }

    fn branch_mut(&mut self) -> ManagerResult<&mut Document> {
        let branch = self
            .tree
            .entry(self.partition.clone())
            .or_insert_with(|| FieldValue::Object(Document::new()));
        branch.as_object_mut().ok_or_else(|| {
            ManagerError::Malformed(format!("partition `{}` is not an object", self.partition))
        })
    }
}

impl<R: Record, S: DocumentStream> Manager<R> for DocumentManager<'_, R, S> {
    fn partition(&self) -> &str {
        &self.partition
    }

    fn fetch_by_field(&self, field: &str, value: &FieldValue) -> ManagerResult<Option<FieldMap>> {
        match self.branch() {
            Some(branch) => records::fetch_by_field(branch, R::KEY_FIELD, field, value),
            None => Ok(None),
        }
    }

    fn fetch_all(&self) -> ManagerResult<Vec<FieldMap>> {
        match self.branch() {
            Some(branch) => records::fetch_all(branch),
            None => Ok(Vec::new()),
        }
    }

    fn upsert(&mut self, record: &R) -> ManagerResult<String> {
        records::upsert(self.branch_mut()?, record)
    }

    fn delete(&mut self, keyid: &str) -> ManagerResult<()> {
        let partition = &self.partition;
        match self.tree.get_mut(partition).and_then(FieldValue::as_object_mut) {
            Some(branch) => records::delete(branch, partition, keyid),
            None => Err(ManagerError::NotFound {
                partition: partition.clone(),
                key: keyid.to_string(),
            }),
        }
    }

    /// Writes the entire tree, including other partitions, through the stream.
    fn save(&mut self) -> ManagerResult<()> {
        if !self.connector.is_connected() {
            return Err(ManagerError::NotConnected);
        }
        self.stream.dump(&FieldValue::Object(self.tree.clone()))?;
        info!(
            "event=document_save module=manager status=ok partition={} partitions={}",
            self.partition,
            self.tree.len()
        );
        Ok(())
    }
}
