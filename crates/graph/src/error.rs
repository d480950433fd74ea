use thiserror::Error;

use crate::dtype::DType;

/// Failures while decoding a serialized tensor or graph program.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    #[error("Payload is {got} bytes, expected {expected} for shape {shape:?} of {dtype}")]
    WrongPayloadSize {
        expected: usize,
        got: usize,
        shape: Vec<usize>,
        dtype: DType,
    },

    #[error("Bad magic bytes")]
    BadMagic,

    #[error("Unsupported format version {0}")]
    UnsupportedVersion(u8),

    #[error("Truncated payload: {0}")]
    TruncatedPayload(String),

    #[error("Unknown dtype: {0}")]
    UnknownDType(String),

    #[error("Cycle detected at node {0}")]
    CycleDetected(usize),

    #[error("Buffer references placeholder index {index} outside manifest of {count}")]
    PlaceholderMismatch { index: usize, count: usize },

    #[error("Checksum mismatch: stored {stored:08x}, computed {computed:08x}")]
    ChecksumMismatch { stored: u32, computed: u32 },
}

/// Failures while validating or compiling a graph program.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Unknown placeholder detected: {0}")]
    UnknownPlaceholder(String),

    #[error("Duplicate placeholder name: {0}")]
    DuplicatePlaceholder(String),

    #[error("Invalid placeholder: {0}")]
    InvalidPlaceholder(String),
}

/// Failures while substituting placeholder leaves with bound tensors.
#[derive(Error, Debug)]
pub enum SubstError {
    #[error("Missing binding for placeholder {0}")]
    MissingBinding(String),

    #[error("Binding for {name} has shape {got_shape:?} {got_dtype}, expected {expected_shape:?} {expected_dtype}")]
    BindingTypeMismatch {
        name: String,
        expected_shape: Vec<u64>,
        expected_dtype: DType,
        got_shape: Vec<u64>,
        got_dtype: DType,
    },

    #[error("Bound placeholder {0} is not declared by the program")]
    UnknownPlaceholder(String),
}

/// Failures inside an accelerator kernel.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("Buffer {0} has no bound data")]
    UnboundBuffer(u64),

    #[error("Operand shapes differ: {0:?} vs {1:?}")]
    ShapeMismatch(Vec<usize>, Vec<usize>),

    #[error("Operand dtypes differ: {0} vs {1}")]
    DTypeMismatch(DType, DType),

    #[error("Operation {op} expects {expected} operands, got {got}")]
    BadArity {
        op: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Kernel error: {0}")]
    Kernel(String),
}

/// Failures while loading a weight bundle.
#[derive(Error, Debug)]
pub enum WeightsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Safetensors error: {0}")]
    Format(String),

    #[error("Unsupported weight dtype: {0}")]
    UnsupportedDType(String),
}
