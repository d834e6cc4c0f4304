use std::collections::TryReserveError;
use std::error::Error as StdError;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    InvalidHandle,
    InvalidArgument,
    BufferTooSmall,
    KernelFailure,
    OutOfMemory,
    NotSupported,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    handle: Option<u64>,
    required: Option<u64>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            handle: None,
            required: None,
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn handle(&self) -> Option<u64> {
        self.handle
    }

    pub fn required(&self) -> Option<u64> {
        self.required
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_handle(mut self, handle: u64) -> Self {
        self.handle = Some(handle);
        self
    }

    pub fn with_required(mut self, required: u64) -> Self {
        self.required = Some(required);
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(handle) = self.handle {
            write!(f, " (handle: {handle})")?;
        }
        if let Some(required) = self.required {
            write!(f, " (required bytes: {required})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<TryReserveError> for Error {
    fn from(err: TryReserveError) -> Self {
        Error::new(ErrorKind::OutOfMemory)
            .with_message("allocation failed")
            .with_source(err)
    }
}

/// Allocates an empty vector able to hold `len` items without aborting on exhaustion.
pub fn try_vec<T>(len: usize) -> Result<Vec<T>, Error> {
    let mut out = Vec::new();
    out.try_reserve_exact(len)?;
    Ok(out)
}

/// Copies a slice into a fresh vector, reporting allocation failure as `OutOfMemory`.
pub fn try_to_vec<T: Clone>(items: &[T]) -> Result<Vec<T>, Error> {
    let mut out = try_vec(items.len())?;
    out.extend_from_slice(items);
    Ok(out)
}

/// Status code 0 is success; every kind maps to a stable non-zero code.
pub fn to_status_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::InvalidHandle => 1,
        ErrorKind::InvalidArgument => 2,
        ErrorKind::BufferTooSmall => 3,
        ErrorKind::KernelFailure => 4,
        ErrorKind::OutOfMemory => 5,
        ErrorKind::NotSupported => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind, to_status_code, try_to_vec};

    #[test]
    fn status_code_mapping_is_stable() {
        let cases = [
            (ErrorKind::InvalidHandle, 1),
            (ErrorKind::InvalidArgument, 2),
            (ErrorKind::BufferTooSmall, 3),
            (ErrorKind::KernelFailure, 4),
            (ErrorKind::OutOfMemory, 5),
            (ErrorKind::NotSupported, 6),
        ];

        for (kind, code) in cases {
            assert_eq!(to_status_code(kind), code);
        }
    }

    #[test]
    fn display_includes_context_fields() {
        let err = Error::new(ErrorKind::BufferTooSmall)
            .with_message("destination too small")
            .with_handle(7)
            .with_required(96);
        assert_eq!(
            err.to_string(),
            "BufferTooSmall: destination too small (handle: 7) (required bytes: 96)"
        );
    }

    #[test]
    fn failed_reservation_maps_to_out_of_memory() {
        let mut v: Vec<u64> = Vec::new();
        let err: Error = v.try_reserve(usize::MAX).expect_err("overflow").into();
        assert_eq!(err.kind(), ErrorKind::OutOfMemory);
    }

    #[test]
    fn try_to_vec_copies_items() {
        let out = try_to_vec(&[1u32, 2, 3]).expect("copy");
        assert_eq!(out, vec![1, 2, 3]);
    }
}
