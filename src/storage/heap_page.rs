use std::{fmt, io::Cursor};

use bit_vec::BitVec;
use log::debug;

use crate::{
    error::SmallError,
    io::SmallWriter,
    storage::{
        buffer_pool::BufferPool,
        schema::Schema,
        tuple::{RecordID, Tuple},
    },
    transaction::Transaction,
    types::SmallResult,
    utils::ceil_div,
};

#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub struct HeapPageID {
    pub table_id: u32,
    pub page_index: usize,
}

impl HeapPageID {
    pub fn new(table_id: u32, page_index: usize) -> Self {
        Self {
            table_id,
            page_index,
        }
    }
}

impl fmt::Display for HeapPageID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "table_{}_page_{}", self.table_id, self.page_index)
    }
}

/// A slotted heap page.
///
/// # Byte layout
///
/// - header: `ceil(slot_count / 8)` bytes, bit `i % 8` of byte `i / 8`
///   (least significant bit first) marks slot `i` used
/// - `slot_count` fixed-size tuple slots
/// - zero padding up to the page size
///
/// The raw bytes of every slot are retained, so unused-slot garbage
/// survives a deserialize/serialize round trip untouched.
pub struct HeapPage {
    pid: HeapPageID,
    schema: Schema,

    header: BitVec,
    slots: Vec<Vec<u8>>,
    tuples: Vec<Option<Tuple>>,
    slot_count: usize,

    dirty: Option<Transaction>,
}

impl HeapPage {
    pub fn new(pid: HeapPageID, bytes: &[u8], schema: &Schema) -> Result<Self, SmallError> {
        let page_size = BufferPool::get_page_size();
        if bytes.len() != page_size {
            return Err(SmallError::CorruptPage(format!(
                "page {} has {} bytes, expect {}",
                pid,
                bytes.len(),
                page_size
            )));
        }

        let slot_count = Self::max_slots(schema);
        let header_size = Self::header_size(slot_count);
        debug!(
            "page {}, header: {}",
            pid,
            hex::encode(&bytes[..header_size.min(16)])
        );

        let header = Self::read_header(&bytes[..header_size], slot_count);

        let tuple_size = schema.get_size();
        let mut slots: Vec<Vec<u8>> = Vec::with_capacity(slot_count);
        let mut tuples: Vec<Option<Tuple>> = Vec::with_capacity(slot_count);
        let mut start = header_size;
        for i in 0..slot_count {
            let slot = bytes[start..start + tuple_size].to_vec();

            if header[i] {
                let mut tuple = Tuple::read_from(&mut Cursor::new(&slot), schema)?;
                tuple.set_record_id(Some(RecordID::new(pid, i)));
                tuples.push(Some(tuple));
            } else {
                tuples.push(None);
            }

            slots.push(slot);
            start += tuple_size;
        }

        Ok(HeapPage {
            pid,
            schema: schema.clone(),
            header,
            slots,
            tuples,
            slot_count,
            dirty: None,
        })
    }

    pub fn empty_page_data() -> Vec<u8> {
        vec![0; BufferPool::get_page_size()]
    }

    /// The number of slots a page holds for the given schema.
    pub fn max_slots(schema: &Schema) -> usize {
        let bits_per_slot = schema.get_size() * 8 + 1;
        BufferPool::get_page_size() * 8 / bits_per_slot
    }

    fn header_size(slot_count: usize) -> usize {
        ceil_div(slot_count, 8)
    }

    // The bit order is least-significant-first within each byte, which is
    // the opposite of BitVec's own byte codec, hence the manual loops.
    fn read_header(bytes: &[u8], slot_count: usize) -> BitVec {
        let mut header = BitVec::from_elem(slot_count, false);
        for i in 0..slot_count {
            let bit = (bytes[i / 8] >> (i % 8)) & 1;
            header.set(i, bit == 1);
        }
        header
    }

    fn write_header(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; Self::header_size(self.slot_count)];
        for i in 0..self.slot_count {
            if self.header[i] {
                bytes[i / 8] |= 1 << (i % 8);
            }
        }
        bytes
    }

    pub fn get_page_data(&self) -> Vec<u8> {
        let mut writer = SmallWriter::new();
        writer.write_bytes(&self.write_header());
        for slot in &self.slots {
            writer.write_bytes(slot);
        }
        writer.to_padded_bytes(BufferPool::get_page_size())
    }

    pub fn get_pid(&self) -> HeapPageID {
        self.pid
    }

    pub fn get_schema(&self) -> &Schema {
        &self.schema
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn is_slot_used(&self, i: usize) -> bool {
        self.header[i]
    }

    fn mark_slot_used(&mut self, i: usize, used: bool) {
        self.header.set(i, used);
    }

    pub fn empty_slots_count(&self) -> usize {
        self.header.iter().filter(|used| !used).count()
    }

    /// Put the tuple into the lowest-index empty slot and assign its
    /// record id.
    pub fn insert_tuple(&mut self, tuple: &mut Tuple) -> SmallResult {
        if tuple.get_cells().len() != self.schema.field_count()
            || !tuple
                .get_cells()
                .iter()
                .zip(&self.schema.fields)
                .all(|(cell, field)| cell.matches_type(&field.field_type))
        {
            return Err(SmallError::SchemaMismatch(format!(
                "tuple {} does not match schema {}",
                tuple, self.schema
            )));
        }

        let slot = match (0..self.slot_count).find(|&i| !self.is_slot_used(i)) {
            Some(i) => i,
            None => {
                return Err(SmallError::PageFull(format!("{}", self.pid)));
            }
        };

        let mut writer = SmallWriter::new();
        tuple.write_to(&mut writer, &self.schema)?;

        tuple.set_record_id(Some(RecordID::new(self.pid, slot)));
        self.slots[slot] = writer.to_bytes();
        self.tuples[slot] = Some(tuple.clone());
        self.mark_slot_used(slot, true);
        Ok(())
    }

    /// Clear the slot holding the tuple. The slot bytes are left in
    /// place, only the header bit changes.
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> SmallResult {
        let record_id = tuple.get_record_id().ok_or_else(|| {
            SmallError::TupleNotOnPage(format!("tuple {} has no record id", tuple))
        })?;

        if record_id.pid != self.pid {
            return Err(SmallError::TupleNotOnPage(format!(
                "tuple {} belongs to {}, not {}",
                tuple, record_id.pid, self.pid
            )));
        }

        let slot = record_id.slot;
        if slot >= self.slot_count || !self.is_slot_used(slot) {
            return Err(SmallError::TupleNotOnPage(format!(
                "slot {} of {} is not in use",
                slot, self.pid
            )));
        }

        if self.tuples[slot].as_ref() != Some(tuple) {
            return Err(SmallError::TupleNotOnPage(format!(
                "slot {} of {} holds a different tuple",
                slot, self.pid
            )));
        }

        self.tuples[slot] = None;
        self.mark_slot_used(slot, false);
        Ok(())
    }

    /// One-shot iterator over the used slots, in slot order.
    pub fn iterator(&self) -> HeapPageIterator<'_> {
        HeapPageIterator {
            page: self,
            cursor: 0,
        }
    }

    pub fn mark_dirty(&mut self, tx: Option<Transaction>) {
        self.dirty = tx;
    }

    pub fn is_dirty(&self) -> Option<Transaction> {
        self.dirty
    }
}

pub struct HeapPageIterator<'a> {
    page: &'a HeapPage,
    cursor: usize,
}

impl<'a> Iterator for HeapPageIterator<'a> {
    type Item = Tuple;

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor < self.page.slot_count {
            let i = self.cursor;
            self.cursor += 1;

            if self.page.is_slot_used(i) {
                return self.page.tuples[i].clone();
            }
        }
        None
    }
}
