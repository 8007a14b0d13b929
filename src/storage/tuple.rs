use std::fmt;

use crate::{
    error::SmallError,
    io::{read_exact, Decodeable, SmallWriter},
    storage::{
        heap_page::HeapPageID,
        schema::{Schema, Type},
    },
    types::SmallResult,
};

/// A typed scalar value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Cell {
    Int32(i32),
    String(String),
}

impl Cell {
    pub fn new_string(s: &str) -> Self {
        Cell::String(s.to_string())
    }

    pub fn matches_type(&self, t: &Type) -> bool {
        match (self, t) {
            (Cell::Int32(_), Type::Int32) => true,
            (Cell::String(_), Type::Char(_)) => true,
            _ => false,
        }
    }

    pub fn get_int32(&self) -> Result<i32, SmallError> {
        match self {
            Cell::Int32(v) => Ok(*v),
            _ => Err(SmallError::TypeMismatch(format!(
                "expect an int cell, got {:?}",
                self
            ))),
        }
    }

    pub fn get_string(&self) -> Result<&str, SmallError> {
        match self {
            Cell::String(s) => Ok(s),
            _ => Err(SmallError::TypeMismatch(format!(
                "expect a string cell, got {:?}",
                self
            ))),
        }
    }

    /// Write the stable byte form of the cell, sized by the field type.
    pub fn encode_to(&self, writer: &mut SmallWriter, t: &Type) -> SmallResult {
        match (self, t) {
            (Cell::Int32(v), Type::Int32) => {
                writer.write(v);
                Ok(())
            }
            (Cell::String(s), Type::Char(max)) => {
                if s.len() > *max as usize {
                    return Err(SmallError::TypeMismatch(format!(
                        "string of {} bytes exceeds char({})",
                        s.len(),
                        max
                    )));
                }

                writer.write(&(s.len() as u32));
                writer.write_bytes(s.as_bytes());
                // pad the payload up to the declared max
                writer.write_bytes(&vec![0; *max as usize - s.len()]);
                Ok(())
            }
            _ => Err(SmallError::TypeMismatch(format!(
                "cell {:?} does not fit type {:?}",
                self, t
            ))),
        }
    }

    pub fn read_from<R: std::io::Read>(reader: &mut R, t: &Type) -> Result<Self, SmallError> {
        match t {
            Type::Int32 => Ok(Cell::Int32(i32::decode_from(reader))),
            Type::Char(max) => {
                let len = u32::decode_from(reader) as usize;
                let payload = read_exact(reader, *max as usize);

                if len > *max as usize {
                    return Err(SmallError::CorruptPage(format!(
                        "string length {} exceeds char({})",
                        len, max
                    )));
                }

                let s = String::from_utf8(payload[..len].to_vec())
                    .map_err(|e| SmallError::CorruptPage(e.to_string()))?;
                Ok(Cell::String(s))
            }
        }
    }
}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Cell::Int32(a), Cell::Int32(b)) => a.partial_cmp(b),
            (Cell::String(a), Cell::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.partial_cmp(other).unwrap()
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Cell::Int32(v) => write!(f, "{}", v),
            Cell::String(s) => write!(f, "{:?}", s),
        }
    }
}

/// Address of a stored tuple: the page plus the slot index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordID {
    pub pid: HeapPageID,
    pub slot: usize,
}

impl RecordID {
    pub fn new(pid: HeapPageID, slot: usize) -> Self {
        Self { pid, slot }
    }
}

pub struct Tuple {
    cells: Vec<Cell>,

    // Set once the tuple is stored on a page.
    record_id: Option<RecordID>,
}

// constructors
impl Tuple {
    pub fn new_from_cells(cells: &[Cell]) -> Self {
        Self {
            cells: cells.to_vec(),
            record_id: None,
        }
    }

    pub fn read_from<R: std::io::Read>(
        reader: &mut R,
        schema: &Schema,
    ) -> Result<Self, SmallError> {
        let mut cells: Vec<Cell> = Vec::new();
        for field in &schema.fields {
            cells.push(Cell::read_from(reader, &field.field_type)?);
        }

        Ok(Tuple {
            cells,
            record_id: None,
        })
    }

    pub fn new_int_tuples(value: i32, width: usize) -> Self {
        let cells = vec![Cell::Int32(value); width];
        Tuple {
            cells,
            record_id: None,
        }
    }
}

impl Tuple {
    pub fn get_cell(&self, i: usize) -> Cell {
        self.cells[i].clone()
    }

    pub fn get_cells(&self) -> Vec<Cell> {
        self.cells.clone()
    }

    pub fn get_record_id(&self) -> Option<RecordID> {
        self.record_id
    }

    pub fn set_record_id(&mut self, record_id: Option<RecordID>) {
        self.record_id = record_id;
    }

    pub fn write_to(&self, writer: &mut SmallWriter, schema: &Schema) -> SmallResult {
        if self.cells.len() != schema.field_count() {
            return Err(SmallError::SchemaMismatch(format!(
                "tuple has {} cells, schema has {} fields",
                self.cells.len(),
                schema.field_count()
            )));
        }

        for (cell, field) in self.cells.iter().zip(&schema.fields) {
            cell.encode_to(writer, &field.field_type)?;
        }
        Ok(())
    }

    pub fn equal_cells(&self, cells: &[i32]) -> bool {
        self.cells
            .iter()
            .zip(cells)
            .all(|(cell, v)| cell == &Cell::Int32(*v))
            && self.cells.len() == cells.len()
    }
}

impl Clone for Tuple {
    fn clone(&self) -> Tuple {
        Tuple {
            cells: self.cells.clone(),
            record_id: self.record_id,
        }
    }
}

// The record id is a storage address, not part of the value, so equality
// compares cells only.
impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.cells == other.cells
    }
}

impl Eq for Tuple {}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut content: String = "{".to_owned();
        for cell in &self.cells {
            content.push_str(&format!("{}, ", cell));
        }
        if !self.cells.is_empty() {
            content.truncate(content.len() - 2);
        }
        content.push('}');
        write!(f, "{}", content)
    }
}

impl fmt::Debug for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}
