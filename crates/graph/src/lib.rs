//! SplitUp placeholder-aware computation graphs.
//!
//! A worker receives a serialized graph program whose leaf buffers may be
//! symbolic (named placeholders with a declared shape and dtype), binds
//! those placeholders to realized tensors, and materializes the result on
//! an accelerator:
//!
//! ```text
//! blob ─decode→ GraphProgram ─substitute(bindings)→ concrete DAG ─execute→ Tensor
//! ```
//!
//! The crate covers the whole lazy-graph side of that pipeline: the tensor
//! and graph wire codecs, the DAG representation with structural sharing,
//! the placeholder collection and substitution passes, safetensors weight
//! loading, and a CPU reference implementation of the accelerator
//! contract.

pub mod codec;
pub mod dtype;
pub mod error;
pub mod exec;
pub mod node;
pub mod program;
pub mod rewrite;
pub mod shape;
pub mod tensor;
pub mod weights;

pub use codec::{decode_program, encode_program};
pub use dtype::DType;
pub use error::{DecodeError, ExecError, GraphError, SubstError, WeightsError};
pub use exec::{execute_graph, Accelerator, CpuAccelerator, ExecuteError};
pub use node::{GraphNode, OpKind, PlaceholderInfo};
pub use program::{ActualTensors, GraphProgram, TensorContext};
pub use rewrite::{find_all_placeholders, substitute, Substitution};
pub use shape::{ShapeTracker, ViewLayout};
pub use tensor::Tensor;
pub use weights::load_safetensors;
