use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Scalar element types recognized by the graph and tensor codecs.
///
/// The set is closed per program: a serialized graph only ever references
/// these four, and every wire format names them by their canonical string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    Float16,
    Float32,
    Int32,
    Uint8,
}

impl DType {
    /// Width of one element in bytes.
    pub fn bytes(&self) -> usize {
        match self {
            DType::Float16 => 2,
            DType::Float32 => 4,
            DType::Int32 => 4,
            DType::Uint8 => 1,
        }
    }

    /// Canonical name used in wire formats.
    pub fn name(&self) -> &'static str {
        match self {
            DType::Float16 => "float16",
            DType::Float32 => "float32",
            DType::Int32 => "int32",
            DType::Uint8 => "uint8",
        }
    }

    /// Stable code used by the binary graph codec.
    pub fn code(&self) -> u8 {
        match self {
            DType::Float16 => 0,
            DType::Float32 => 1,
            DType::Int32 => 2,
            DType::Uint8 => 3,
        }
    }

    pub fn from_name(name: &str) -> Result<Self, DecodeError> {
        match name {
            "float16" => Ok(DType::Float16),
            "float32" => Ok(DType::Float32),
            "int32" => Ok(DType::Int32),
            "uint8" => Ok(DType::Uint8),
            other => Err(DecodeError::UnknownDType(other.to_string())),
        }
    }

    pub fn from_code(code: u8) -> Result<Self, DecodeError> {
        match code {
            0 => Ok(DType::Float16),
            1 => Ok(DType::Float32),
            2 => Ok(DType::Int32),
            3 => Ok(DType::Uint8),
            other => Err(DecodeError::UnknownDType(format!("code {}", other))),
        }
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widths() {
        assert_eq!(DType::Float16.bytes(), 2);
        assert_eq!(DType::Float32.bytes(), 4);
        assert_eq!(DType::Int32.bytes(), 4);
        assert_eq!(DType::Uint8.bytes(), 1);
    }

    #[test]
    fn test_name_roundtrip() {
        for dt in [DType::Float16, DType::Float32, DType::Int32, DType::Uint8] {
            assert_eq!(DType::from_name(dt.name()).unwrap(), dt);
            assert_eq!(DType::from_code(dt.code()).unwrap(), dt);
        }
    }

    #[test]
    fn test_unknown_name() {
        assert!(matches!(
            DType::from_name("bfloat16"),
            Err(DecodeError::UnknownDType(_))
        ));
        assert!(matches!(
            DType::from_code(9),
            Err(DecodeError::UnknownDType(_))
        ));
    }
}
