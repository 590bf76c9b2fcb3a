//! In-memory stub connector.

use super::{Connector, ConnectorResult};
use crate::stream::Document;
use std::cell::RefCell;
use std::collections::HashMap;

/// Process-local connector holding one record mapping per partition.
///
/// Contents live as long as the connector value; nothing reaches disk.
#[derive(Debug, Default)]
pub struct MemoryConnector {
    connected: bool,
    partitions: RefCell<HashMap<String, Document>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the mapping last dumped for `partition`.
    pub fn load(&self, partition: &str) -> Document {
        self.partitions
            .borrow()
            .get(partition)
            .cloned()
            .unwrap_or_default()
    }

    /// Replaces the stored mapping for `partition`.
    pub fn dump(&self, partition: &str, records: Document) {
        self.partitions
            .borrow_mut()
            .insert(partition.to_string(), records);
    }
}

impl Connector for MemoryConnector {
    fn connect(&mut self) -> ConnectorResult<()> {
        self.connected = true;
        Ok(())
    }

    fn close(&mut self) -> ConnectorResult<()> {
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
