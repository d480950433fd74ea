//! Placeholder passes over the computation DAG.
//!
//! Both passes match the whole `View(Buffer{placeholder})` pattern and
//! memoize on node id, so a subtree shared by several parents is visited
//! exactly once.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::SubstError;
use crate::node::{GraphNode, PlaceholderInfo};
use crate::program::ActualTensors;
use crate::shape::ShapeTracker;
use crate::tensor::Tensor;

/// Names of every placeholder reachable from `root`.
pub fn find_all_placeholders(root: &Arc<GraphNode>) -> HashSet<String> {
    let mut found = HashSet::new();
    let mut visited = HashSet::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if !visited.insert(node.id()) {
            continue;
        }
        if let Some(info) = node.as_placeholder_view() {
            found.insert(info.name.clone());
        }
        for source in node.sources() {
            stack.push(source);
        }
    }

    found
}

/// Result of a substitution pass: the rewritten root plus the realized
/// bytes for every buffer the rewrite introduced. The accelerator takes
/// both.
#[derive(Debug)]
pub struct Substitution {
    pub root: Arc<GraphNode>,
    pub buffers: HashMap<u64, Tensor>,
}

/// Replace every `View(Buffer{placeholder})` with a data-backed leaf for
/// the tensor bound under the placeholder's name.
///
/// Bindings are validated up front; on any error nothing is rewritten.
/// Extra binding keys are ignored. Unmatched nodes keep their identity so
/// shared subtrees stay shared, and the pass is O(|nodes|).
pub fn substitute(
    root: &Arc<GraphNode>,
    bindings: &ActualTensors,
) -> Result<Substitution, SubstError> {
    let mut max_id = 0u64;
    let mut reachable: Vec<PlaceholderInfo> = Vec::new();
    let mut seen_names = HashSet::new();
    {
        let mut visited = HashSet::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if !visited.insert(node.id()) {
                continue;
            }
            max_id = max_id.max(node.id());
            if let Some(info) = node.as_placeholder_view() {
                if seen_names.insert(info.name.clone()) {
                    reachable.push(info.clone());
                }
            }
            for source in node.sources() {
                stack.push(source);
            }
        }
    }

    for info in &reachable {
        let tensor = bindings
            .get(&info.name)
            .ok_or_else(|| SubstError::MissingBinding(info.name.clone()))?;
        let got_shape: Vec<u64> = tensor.shape().iter().map(|&d| d as u64).collect();
        if got_shape != info.shape || tensor.dtype() != info.dtype {
            return Err(SubstError::BindingTypeMismatch {
                name: info.name.clone(),
                expected_shape: info.shape.clone(),
                expected_dtype: info.dtype,
                got_shape,
                got_dtype: tensor.dtype(),
            });
        }
    }

    let mut rewriter = Rewriter {
        bindings,
        next_id: max_id + 1,
        buffers: HashMap::new(),
        replacements: HashMap::new(),
        memo: HashMap::new(),
    };
    let root = rewriter.rewrite(root);

    Ok(Substitution {
        root,
        buffers: rewriter.buffers,
    })
}

struct Rewriter<'a> {
    bindings: &'a ActualTensors,
    next_id: u64,
    buffers: HashMap<u64, Tensor>,
    /// One replacement leaf per placeholder name, so a placeholder bound
    /// once stays a single buffer no matter how many views reference it.
    replacements: HashMap<String, Arc<GraphNode>>,
    memo: HashMap<u64, Arc<GraphNode>>,
}

impl Rewriter<'_> {
    fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn leaf_for(&mut self, info: &PlaceholderInfo, device: &str) -> Arc<GraphNode> {
        if let Some(existing) = self.replacements.get(&info.name) {
            return Arc::clone(existing);
        }
        let tensor = self.bindings[&info.name].clone();
        let buffer_id = self.alloc_id();
        let buffer = Arc::new(GraphNode::Buffer {
            id: buffer_id,
            device: device.to_string(),
            size: tensor.numel() as u64,
            dtype: tensor.dtype(),
            placeholder: None,
        });
        self.buffers.insert(buffer_id, tensor);
        let view = Arc::new(GraphNode::View {
            id: self.alloc_id(),
            source: buffer,
            tracker: ShapeTracker::from_shape(&info.shape),
            dtype: info.dtype,
        });
        self.replacements.insert(info.name.clone(), Arc::clone(&view));
        view
    }

    fn rewrite(&mut self, node: &Arc<GraphNode>) -> Arc<GraphNode> {
        if let Some(done) = self.memo.get(&node.id()) {
            return Arc::clone(done);
        }

        let rewritten = match node.as_ref() {
            GraphNode::View { id, source, tracker, dtype } => {
                if let GraphNode::Buffer {
                    placeholder: Some(info),
                    device,
                    ..
                } = source.as_ref()
                {
                    let info = info.clone();
                    let device = device.clone();
                    self.leaf_for(&info, &device)
                } else {
                    let new_source = self.rewrite(source);
                    if Arc::ptr_eq(&new_source, source) {
                        Arc::clone(node)
                    } else {
                        Arc::new(GraphNode::View {
                            id: *id,
                            source: new_source,
                            tracker: tracker.clone(),
                            dtype: *dtype,
                        })
                    }
                }
            }
            GraphNode::Op { id, kind, sources, dtype } => {
                let new_sources: Vec<Arc<GraphNode>> =
                    sources.iter().map(|s| self.rewrite(s)).collect();
                if new_sources
                    .iter()
                    .zip(sources)
                    .all(|(new, old)| Arc::ptr_eq(new, old))
                {
                    Arc::clone(node)
                } else {
                    Arc::new(GraphNode::Op {
                        id: *id,
                        kind: *kind,
                        sources: new_sources,
                        dtype: *dtype,
                    })
                }
            }
            GraphNode::Buffer { .. } => Arc::clone(node),
        };

        self.memo.insert(node.id(), Arc::clone(&rewritten));
        rewritten
    }
}
