//! Realized tensors and their wire codec.
//!
//! A realized tensor is a flat little-endian buffer in row-major order plus
//! its shape and dtype. The wire format is self-describing:
//! `"<s0,s1,…>\n<dtype_name>\n<raw bytes>"`.

use half::f16;

use crate::dtype::DType;
use crate::error::DecodeError;

/// A realized, in-memory tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    dtype: DType,
    data: Vec<u8>,
}

impl Tensor {
    /// Wrap raw element bytes. The buffer length must match the shape.
    pub fn from_bytes(shape: Vec<usize>, dtype: DType, data: Vec<u8>) -> Result<Self, DecodeError> {
        let expected = shape.iter().product::<usize>() * dtype.bytes();
        if data.len() != expected {
            return Err(DecodeError::WrongPayloadSize {
                expected,
                got: data.len(),
                shape,
                dtype,
            });
        }
        Ok(Self { shape, dtype, data })
    }

    pub fn from_f32s(shape: Vec<usize>, values: &[f32]) -> Self {
        let mut data = Vec::with_capacity(values.len() * 4);
        for v in values {
            data.extend_from_slice(&v.to_le_bytes());
        }
        Self {
            shape,
            dtype: DType::Float32,
            data,
        }
    }

    pub fn from_f16s(shape: Vec<usize>, values: &[f16]) -> Self {
        let mut data = Vec::with_capacity(values.len() * 2);
        for v in values {
            data.extend_from_slice(&v.to_le_bytes());
        }
        Self {
            shape,
            dtype: DType::Float16,
            data,
        }
    }

    pub fn from_i32s(shape: Vec<usize>, values: &[i32]) -> Self {
        let mut data = Vec::with_capacity(values.len() * 4);
        for v in values {
            data.extend_from_slice(&v.to_le_bytes());
        }
        Self {
            shape,
            dtype: DType::Int32,
            data,
        }
    }

    pub fn from_u8s(shape: Vec<usize>, values: &[u8]) -> Self {
        Self {
            shape,
            dtype: DType::Uint8,
            data: values.to_vec(),
        }
    }

    pub fn zeros(shape: Vec<usize>, dtype: DType) -> Self {
        let len = shape.iter().product::<usize>() * dtype.bytes();
        Self {
            shape,
            dtype,
            data: vec![0u8; len],
        }
    }

    pub fn ones(shape: Vec<usize>, dtype: DType) -> Self {
        let numel = shape.iter().product::<usize>();
        Self::from_scalars(shape, dtype, &vec![1.0; numel])
    }

    /// Build a tensor of the given dtype from f64 element values.
    pub fn from_scalars(shape: Vec<usize>, dtype: DType, values: &[f64]) -> Self {
        let mut data = Vec::with_capacity(values.len() * dtype.bytes());
        for &v in values {
            match dtype {
                DType::Float16 => data.extend_from_slice(&f16::from_f64(v).to_le_bytes()),
                DType::Float32 => data.extend_from_slice(&(v as f32).to_le_bytes()),
                DType::Int32 => data.extend_from_slice(&(v as i32).to_le_bytes()),
                DType::Uint8 => data.push(v as u8),
            }
        }
        Self { shape, dtype, data }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    /// Read every element back as f64, in row-major order.
    pub fn to_scalars(&self) -> Vec<f64> {
        let width = self.dtype.bytes();
        self.data
            .chunks_exact(width)
            .map(|chunk| match self.dtype {
                DType::Float16 => f16::from_le_bytes([chunk[0], chunk[1]]).to_f64(),
                DType::Float32 => {
                    f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as f64
                }
                DType::Int32 => {
                    i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as f64
                }
                DType::Uint8 => chunk[0] as f64,
            })
            .collect()
    }

    pub fn to_f32s(&self) -> Vec<f32> {
        self.to_scalars().into_iter().map(|v| v as f32).collect()
    }

    /// Encode into the self-describing wire format.
    pub fn to_wire_bytes(&self) -> Vec<u8> {
        let shape_line = self
            .shape
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let mut out = format!("{}\n{}\n", shape_line, self.dtype.name()).into_bytes();
        out.extend_from_slice(&self.data);
        out
    }

    /// Decode from the wire format.
    pub fn from_wire_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        let first = data
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| DecodeError::MalformedHeader("missing shape line".into()))?;
        let second = data[first + 1..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|p| first + 1 + p)
            .ok_or_else(|| DecodeError::MalformedHeader("missing dtype line".into()))?;

        let shape_line = std::str::from_utf8(&data[..first])
            .map_err(|_| DecodeError::MalformedHeader("shape line is not UTF-8".into()))?;
        let dtype_line = std::str::from_utf8(&data[first + 1..second])
            .map_err(|_| DecodeError::MalformedHeader("dtype line is not UTF-8".into()))?;

        let shape = if shape_line.is_empty() {
            Vec::new()
        } else {
            shape_line
                .split(',')
                .map(|part| {
                    part.parse::<usize>().map_err(|_| {
                        DecodeError::MalformedHeader(format!("non-numeric dimension {:?}", part))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        let dtype = DType::from_name(dtype_line)
            .map_err(|_| DecodeError::MalformedHeader(format!("unknown dtype {:?}", dtype_line)))?;

        Self::from_bytes(shape, dtype, data[second + 1..].to_vec())
    }
}
