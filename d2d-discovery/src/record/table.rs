use std::fmt;

use super::Record;
use crate::message::DnsType;
use crate::transport::Transport;

/// Opaque handle a plugin attaches to each discovered service instance.
pub type InstanceHandle = u64;

/// A record produced from plugin input, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedRecord {
    pub record: Record,
    pub transport: Transport,
    pub instance: InstanceHandle,
}

impl fmt::Display for SynthesizedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} via {} (instance {})",
            self.record, self.transport, self.instance
        )
    }
}

/// Result of offering a record to the [`ExternalRecordTable`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// The record is new and must be registered with the cache.
    Added,
    /// An identical record is already present; the delivery was absorbed.
    DuplicateSuppressed,
}

/// Records injected into the shared cache on behalf of external plugins.
///
/// Identity is [`Record::same_record`]: two different key/value encodings
/// that decode to the same record are one entry.
#[derive(Default, Debug)]
pub struct ExternalRecordTable {
    records: Vec<SynthesizedRecord>,
}

impl ExternalRecordTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_or_skip(
        &mut self,
        record: Record,
        transport: Transport,
        instance: InstanceHandle,
    ) -> AddOutcome {
        if self.contains(&record) {
            log::trace!("duplicate external record suppressed: {record}");
            return AddOutcome::DuplicateSuppressed;
        }
        log::debug!("adding external record {record} via {transport}");
        self.records.push(SynthesizedRecord {
            record,
            transport,
            instance,
        });
        AddOutcome::Added
    }

    /// Removes the entry matching `record`, if any.
    pub fn remove_if_present(&mut self, record: &Record) -> Option<SynthesizedRecord> {
        let index = self
            .records
            .iter()
            .position(|r| r.record.same_record(record))?;
        Some(self.records.remove(index))
    }

    /// Removes every entry with the given owner name and type.
    pub fn remove_matching(&mut self, name: &str, rr_type: DnsType) -> Vec<SynthesizedRecord> {
        let (removed, kept): (Vec<_>, Vec<_>) = self.records.drain(..).partition(|r| {
            r.record.rr_type == rr_type && r.record.name.eq_ignore_ascii_case(name)
        });
        self.records = kept;
        removed
    }

    pub fn contains(&self, record: &Record) -> bool {
        self.records.iter().any(|r| r.record.same_record(record))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SynthesizedRecord> {
        self.records.iter()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
