use bytes::Bytes;
use chrono::{DateTime, Utc};
use rmb_types::{Metadata, ObjectLocator};

/// One mutation staged on a [`WriteOperation`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// Write `data` starting at byte `offset`, extending the object if needed.
    Write { offset: u64, data: Bytes },
    /// Set (or overwrite) one attribute.
    SetXattr { key: String, value: Vec<u8> },
    /// Set the object's modification time.
    Mtime(DateTime<Utc>),
    /// Replace content and attributes with those of `source`, provided the
    /// source is still at `version`.
    CopyFrom { source: ObjectLocator, version: u64 },
}

/// A batch of mutations applied by the store as one atomic unit.
///
/// Instructions are applied in the order they were staged. Nothing is sent
/// until the operation is submitted through an
/// [`ObjectBackend`](crate::ObjectBackend).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteOperation {
    instructions: Vec<Instruction>,
}

impl WriteOperation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, offset: u64, data: Bytes) -> &mut Self {
        self.instructions.push(Instruction::Write { offset, data });
        self
    }

    pub fn setxattr(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.instructions.push(Instruction::SetXattr {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Stage one set-attribute instruction per entry, in order.
    pub fn set_metadata<'a, I>(&mut self, attributes: I) -> &mut Self
    where
        I: IntoIterator<Item = &'a Metadata>,
    {
        for attr in attributes {
            self.setxattr(attr.key.clone(), attr.value.clone());
        }
        self
    }

    pub fn mtime(&mut self, mtime: DateTime<Utc>) -> &mut Self {
        self.instructions.push(Instruction::Mtime(mtime));
        self
    }

    pub fn copy_from(&mut self, source: ObjectLocator, version: u64) -> &mut Self {
        self.instructions
            .push(Instruction::CopyFrom { source, version });
        self
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Total payload bytes carried by write instructions.
    pub fn write_bytes(&self) -> u64 {
        self.instructions
            .iter()
            .map(|i| match i {
                Instruction::Write { data, .. } => data.len() as u64,
                _ => 0,
            })
            .sum()
    }
}
