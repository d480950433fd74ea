//! Weight bundles.
//!
//! Model weights travel as safetensors files; each named entry becomes a
//! realized tensor keyed by its parameter name, ready to bind against the
//! program's placeholders.

use std::path::Path;

use safetensors::tensor::Dtype as StDtype;
use safetensors::SafeTensors;
use tracing::debug;

use crate::dtype::DType;
use crate::error::WeightsError;
use crate::program::ActualTensors;
use crate::tensor::Tensor;

fn map_dtype(dtype: StDtype) -> Result<DType, WeightsError> {
    match dtype {
        StDtype::F16 => Ok(DType::Float16),
        StDtype::F32 => Ok(DType::Float32),
        StDtype::I32 => Ok(DType::Int32),
        StDtype::U8 => Ok(DType::Uint8),
        other => Err(WeightsError::UnsupportedDType(format!("{:?}", other))),
    }
}

/// Load every tensor of a safetensors file into memory.
pub fn load_safetensors(path: &Path) -> Result<ActualTensors, WeightsError> {
    let raw = std::fs::read(path)?;
    let parsed =
        SafeTensors::deserialize(&raw).map_err(|e| WeightsError::Format(e.to_string()))?;

    let mut weights = ActualTensors::new();
    for (name, view) in parsed.tensors() {
        let dtype = map_dtype(view.dtype())?;
        let tensor = Tensor::from_bytes(view.shape().to_vec(), dtype, view.data().to_vec())
            .map_err(|e| WeightsError::Format(format!("tensor {}: {}", name, e)))?;
        weights.insert(name, tensor);
    }

    debug!("Loaded {} weight tensors from {:?}", weights.len(), path);
    Ok(weights)
}
