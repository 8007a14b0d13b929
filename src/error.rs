use std::{error::Error, fmt};

/// Crate-wide error type. Every failure carries its kind and a free-form
/// detail message; storage errors bubble through the operator layer
/// unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum SmallError {
    /// Read past the end of a heap file, or a short read.
    InvalidPage(String),
    /// Page bytes are ill-formed.
    CorruptPage(String),
    /// No empty slot on the page.
    PageFull(String),
    /// Delete target is not on the page it claims to be on.
    TupleNotOnPage(String),
    /// Tuple schema differs from the table schema.
    SchemaMismatch(String),
    /// A cell's type differs from the declared field type.
    TypeMismatch(String),
    /// The aggregate operator cannot be applied to the field type.
    UnsupportedOp(String),
    /// Lock acquisition timed out or a deadlock was detected. The caller
    /// is expected to abort the transaction.
    TransactionAborted(String),
    Io(String),
}

impl SmallError {
    pub fn io(e: std::io::Error) -> Self {
        SmallError::Io(e.to_string())
    }

    pub fn show_backtrace(&self) {
        let bt = backtrace::Backtrace::new();
        eprintln!("{}\n{:?}", self, bt);
    }
}

impl fmt::Display for SmallError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SmallError::InvalidPage(s) => write!(f, "invalid page: {}", s),
            SmallError::CorruptPage(s) => write!(f, "corrupt page: {}", s),
            SmallError::PageFull(s) => write!(f, "page full: {}", s),
            SmallError::TupleNotOnPage(s) => write!(f, "tuple not on page: {}", s),
            SmallError::SchemaMismatch(s) => write!(f, "schema mismatch: {}", s),
            SmallError::TypeMismatch(s) => write!(f, "type mismatch: {}", s),
            SmallError::UnsupportedOp(s) => write!(f, "unsupported op: {}", s),
            SmallError::TransactionAborted(s) => {
                write!(f, "transaction aborted: {}", s)
            }
            SmallError::Io(s) => write!(f, "io error: {}", s),
        }
    }
}

impl Error for SmallError {}
