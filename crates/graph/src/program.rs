//! Graph programs: a root node plus the manifest of symbolic inputs.

use std::collections::HashMap;
use std::sync::Arc;

use crate::dtype::DType;
use crate::error::GraphError;
use crate::node::{GraphNode, OpKind, PlaceholderInfo};
use crate::rewrite::find_all_placeholders;
use crate::shape::ShapeTracker;
use crate::tensor::Tensor;

/// Mapping from placeholder name to a realized tensor.
pub type ActualTensors = HashMap<String, Tensor>;

/// The unit of serialization and execution: the output node of a tensor
/// computation plus the declared symbolic inputs.
///
/// `constants` carries realized data for non-placeholder buffers authored
/// in-memory; it is not part of the wire format. In the production flow
/// every data leaf arrives through a placeholder binding.
#[derive(Debug)]
pub struct GraphProgram {
    pub root: Arc<GraphNode>,
    pub placeholders: Vec<PlaceholderInfo>,
    pub constants: HashMap<u64, Tensor>,
}

impl GraphProgram {
    /// The inputs a caller must bind before execution.
    pub fn inputs(&self) -> &[PlaceholderInfo] {
        &self.placeholders
    }
}

/// Authoring helper: allocates node ids, tracks declared placeholders and
/// constant leaf data, and compiles a root into a validated program.
pub struct TensorContext {
    next_id: u64,
    device: String,
    placeholders: Vec<PlaceholderInfo>,
    constants: HashMap<u64, Tensor>,
}

impl TensorContext {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            device: "CPU".to_string(),
            placeholders: Vec::new(),
            constants: HashMap::new(),
        }
    }

    fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Declare a symbolic input and return its graph leaf.
    pub fn add_graph_input(
        &mut self,
        name: &str,
        shape: Vec<u64>,
        dtype: DType,
    ) -> Result<Arc<GraphNode>, GraphError> {
        let info = PlaceholderInfo::new(name, shape.clone(), dtype)?;
        if self.placeholders.iter().any(|p| p.name == info.name) {
            return Err(GraphError::DuplicatePlaceholder(info.name));
        }
        self.placeholders.push(info.clone());

        let size: u64 = shape.iter().product();
        let buffer = Arc::new(GraphNode::Buffer {
            id: self.alloc_id(),
            device: self.device.clone(),
            size,
            dtype,
            placeholder: Some(info),
        });
        Ok(Arc::new(GraphNode::View {
            id: self.alloc_id(),
            source: buffer,
            tracker: ShapeTracker::from_shape(&shape),
            dtype,
        }))
    }

    /// Embed a realized tensor as a constant leaf.
    pub fn constant(&mut self, tensor: Tensor) -> Arc<GraphNode> {
        let shape: Vec<u64> = tensor.shape().iter().map(|&d| d as u64).collect();
        let dtype = tensor.dtype();
        let buffer_id = self.alloc_id();
        let buffer = Arc::new(GraphNode::Buffer {
            id: buffer_id,
            device: self.device.clone(),
            size: tensor.numel() as u64,
            dtype,
            placeholder: None,
        });
        self.constants.insert(buffer_id, tensor);
        Arc::new(GraphNode::View {
            id: self.alloc_id(),
            source: buffer,
            tracker: ShapeTracker::from_shape(&shape),
            dtype,
        })
    }

    /// Combine nodes under an operation; the dtype follows the first source.
    pub fn op(&mut self, kind: OpKind, sources: Vec<Arc<GraphNode>>) -> Arc<GraphNode> {
        let dtype = sources
            .first()
            .map(|s| s.dtype())
            .unwrap_or(DType::Float32);
        Arc::new(GraphNode::Op {
            id: self.alloc_id(),
            kind,
            sources,
            dtype,
        })
    }

    /// Compile a root into a program, validating the placeholder manifest.
    ///
    /// A placeholder reachable from the root but never declared is an
    /// error; declarations the graph never reached are dropped so that
    /// every manifest entry is reachable.
    pub fn compile(self, root: Arc<GraphNode>) -> Result<GraphProgram, GraphError> {
        let found = find_all_placeholders(&root);

        for name in &found {
            if !self.placeholders.iter().any(|p| &p.name == name) {
                return Err(GraphError::UnknownPlaceholder(name.clone()));
            }
        }

        let placeholders: Vec<PlaceholderInfo> = self
            .placeholders
            .into_iter()
            .filter(|p| found.contains(&p.name))
            .collect();

        Ok(GraphProgram {
            root,
            placeholders,
            constants: self.constants,
        })
    }
}

impl Default for TensorContext {
    fn default() -> Self {
        Self::new()
    }
}
