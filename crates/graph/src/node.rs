//! The computation DAG.
//!
//! Nodes are shared by reference count; a node appearing under two parents
//! is the same allocation, and every traversal memoizes on the stable id.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dtype::DType;
use crate::error::GraphError;
use crate::shape::ShapeTracker;

/// Descriptor of one symbolic input: a named, typed, shaped leaf with no
/// data. Immutable once embedded in a program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderInfo {
    pub name: String,
    pub shape: Vec<u64>,
    pub dtype: DType,
}

impl PlaceholderInfo {
    pub fn new(name: impl Into<String>, shape: Vec<u64>, dtype: DType) -> Result<Self, GraphError> {
        let name = name.into();
        if name.is_empty() {
            return Err(GraphError::InvalidPlaceholder("empty name".into()));
        }
        if name.bytes().any(|b| b.is_ascii_control()) {
            return Err(GraphError::InvalidPlaceholder(format!(
                "name {:?} contains control characters",
                name
            )));
        }
        Ok(Self { name, shape, dtype })
    }
}

/// Arithmetic and reduction operations. Reductions collapse every axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpKind {
    Add,
    Sub,
    Mul,
    Neg,
    Recip,
    Sum,
    Max,
}

impl OpKind {
    pub fn code(&self) -> u8 {
        match self {
            OpKind::Add => 0,
            OpKind::Sub => 1,
            OpKind::Mul => 2,
            OpKind::Neg => 3,
            OpKind::Recip => 4,
            OpKind::Sum => 5,
            OpKind::Max => 6,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => OpKind::Add,
            1 => OpKind::Sub,
            2 => OpKind::Mul,
            3 => OpKind::Neg,
            4 => OpKind::Recip,
            5 => OpKind::Sum,
            6 => OpKind::Max,
            _ => return None,
        })
    }

    pub fn arity(&self) -> usize {
        match self {
            OpKind::Add | OpKind::Sub | OpKind::Mul => 2,
            OpKind::Neg | OpKind::Recip | OpKind::Sum | OpKind::Max => 1,
        }
    }
}

/// A node in the computation DAG.
#[derive(Debug)]
pub enum GraphNode {
    /// A leaf storage node. Symbolic when `placeholder` is present.
    Buffer {
        id: u64,
        device: String,
        size: u64,
        dtype: DType,
        placeholder: Option<PlaceholderInfo>,
    },
    /// A reshape/broadcast view over another node.
    View {
        id: u64,
        source: Arc<GraphNode>,
        tracker: ShapeTracker,
        dtype: DType,
    },
    /// An arithmetic or reduction operation.
    Op {
        id: u64,
        kind: OpKind,
        sources: Vec<Arc<GraphNode>>,
        dtype: DType,
    },
}

impl GraphNode {
    pub fn id(&self) -> u64 {
        match self {
            GraphNode::Buffer { id, .. } => *id,
            GraphNode::View { id, .. } => *id,
            GraphNode::Op { id, .. } => *id,
        }
    }

    pub fn dtype(&self) -> DType {
        match self {
            GraphNode::Buffer { dtype, .. } => *dtype,
            GraphNode::View { dtype, .. } => *dtype,
            GraphNode::Op { dtype, .. } => *dtype,
        }
    }

    /// Child nodes, in source order.
    pub fn sources(&self) -> Vec<&Arc<GraphNode>> {
        match self {
            GraphNode::Buffer { .. } => Vec::new(),
            GraphNode::View { source, .. } => vec![source],
            GraphNode::Op { sources, .. } => sources.iter().collect(),
        }
    }

    /// Whether this node is the substitution target shape: a view directly
    /// over a placeholder buffer. A bare placeholder buffer never matches
    /// on its own.
    pub fn as_placeholder_view(&self) -> Option<&PlaceholderInfo> {
        if let GraphNode::View { source, .. } = self {
            if let GraphNode::Buffer {
                placeholder: Some(info),
                ..
            } = source.as_ref()
            {
                return Some(info);
            }
        }
        None
    }
}
