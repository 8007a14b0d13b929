use std::{
    convert::TryInto,
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    mem::size_of,
    path::Path,
    sync::{Mutex, MutexGuard},
};

use crate::{error::SmallError, types::SmallResult};

/// A positioned page file. All access goes through the internal mutex, so
/// a seek and the read/write that follows it are atomic with respect to
/// other callers.
pub struct SmallFile {
    file: Mutex<File>,
}

impl SmallFile {
    pub fn new<P: AsRef<Path>>(file_path: P) -> Result<Self, SmallError> {
        let file = OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .open(file_path)
            .map_err(SmallError::io)?;

        Ok(Self {
            file: Mutex::new(file),
        })
    }

    pub fn get_file(&self) -> MutexGuard<'_, File> {
        self.file.lock().unwrap()
    }

    pub fn get_size(&self) -> Result<u64, SmallError> {
        let metadata = self.get_file().metadata().map_err(SmallError::io)?;
        Ok(metadata.len())
    }

    pub fn read_exact_at(&self, offset: u64, size: usize) -> Result<Vec<u8>, SmallError> {
        let mut file = self.get_file();
        file.seek(SeekFrom::Start(offset)).map_err(SmallError::io)?;

        let mut buf = vec![0; size];
        file.read_exact(&mut buf).map_err(SmallError::io)?;
        Ok(buf)
    }

    pub fn write_all_at(&self, offset: u64, buf: &[u8]) -> SmallResult {
        let mut file = self.get_file();
        file.seek(SeekFrom::Start(offset)).map_err(SmallError::io)?;
        file.write_all(buf).map_err(SmallError::io)?;
        file.flush().map_err(SmallError::io)?;
        Ok(())
    }
}

pub fn read_into<T: Decodeable, R: std::io::Read>(reader: &mut R) -> T {
    T::decode_from(reader)
}

pub fn read_exact<R: std::io::Read>(reader: &mut R, bytes_count: usize) -> Vec<u8> {
    let mut buffer = vec![0u8; bytes_count];
    reader
        .read_exact(&mut buffer)
        .expect(&format!("io error, expect {}", bytes_count));
    buffer
}

/// An in-memory byte sink with fixed-size padding support, used to build
/// page and tuple images.
pub struct SmallWriter {
    buf: Vec<u8>,
}

impl SmallWriter {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn write<T: Encodeable>(&mut self, obj: &T) {
        self.buf.extend_from_slice(obj.encode().as_slice());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn size(&self) -> usize {
        self.buf.len()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.buf.clone()
    }

    /// Zero-pad the buffer up to `size` bytes. Panics if the buffer has
    /// already outgrown the target, since that means a layout bug.
    pub fn to_padded_bytes(&self, size: usize) -> Vec<u8> {
        let mut buf = self.buf.clone();

        if buf.len() > size {
            panic!(
                "buffer size is larger than the given size: {} > {}",
                buf.len(),
                size
            );
        }

        buf.resize(size, 0);
        buf
    }
}

pub trait Encodeable {
    fn encode(&self) -> Vec<u8>;
}

pub trait Decodeable {
    fn decode_from<R: std::io::Read>(reader: &mut R) -> Self;
}

macro_rules! impl_serialization {
    (for $($t:ty),+) => {
        $(
            impl Encodeable for $t {
                fn encode(&self) -> Vec<u8> {
                    self.to_le_bytes().to_vec()
                }
            }

            impl Decodeable for $t {
                fn decode_from<R: std::io::Read>(reader: &mut R) -> Self {
                    let bytes = read_exact(reader, size_of::<Self>());
                    Self::from_le_bytes(bytes.try_into().unwrap())
                }
            }
        )*
    }
}

impl_serialization!(for u8, u16, u32, u64, i8, i16, i32, i64, usize, f64);
