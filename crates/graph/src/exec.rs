//! Graph execution.
//!
//! The accelerator is an external contract: it receives a fully
//! substituted graph plus the realized bytes for every data leaf. The CPU
//! implementation here is the reference kernel set; device backends plug in
//! behind the same trait.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::error::{ExecError, SubstError};
use crate::node::{GraphNode, OpKind};
use crate::program::{ActualTensors, GraphProgram};
use crate::rewrite::{find_all_placeholders, substitute};
use crate::shape::row_major_indices;
use crate::tensor::Tensor;

/// The accelerator kernel contract.
pub trait Accelerator: Send + Sync {
    /// Materialize `root` given the data for every buffer it references.
    fn execute(
        &self,
        root: &GraphNode,
        buffers: &HashMap<u64, Tensor>,
    ) -> Result<Tensor, ExecError>;
}

/// Reference implementation: evaluates the DAG element by element on the
/// host. Correctness baseline, not a performance target.
pub struct CpuAccelerator;

#[derive(Clone)]
struct Evaluated {
    shape: Vec<usize>,
    values: Vec<f64>,
}

impl Accelerator for CpuAccelerator {
    fn execute(
        &self,
        root: &GraphNode,
        buffers: &HashMap<u64, Tensor>,
    ) -> Result<Tensor, ExecError> {
        let mut memo: HashMap<u64, Evaluated> = HashMap::new();
        let out = eval(root, buffers, &mut memo)?;
        Ok(Tensor::from_scalars(out.shape, root.dtype(), &out.values))
    }
}

fn eval(
    node: &GraphNode,
    buffers: &HashMap<u64, Tensor>,
    memo: &mut HashMap<u64, Evaluated>,
) -> Result<Evaluated, ExecError> {
    if let Some(done) = memo.get(&node.id()) {
        return Ok(done.clone());
    }

    let out = match node {
        GraphNode::Buffer { id, .. } => {
            let tensor = buffers.get(id).ok_or(ExecError::UnboundBuffer(*id))?;
            Evaluated {
                shape: tensor.shape().to_vec(),
                values: tensor.to_scalars(),
            }
        }
        GraphNode::View { source, tracker, .. } => {
            let mut current = eval(source, buffers, memo)?.values;
            for layout in &tracker.views {
                let mut next = Vec::with_capacity(layout.size() as usize);
                for index in row_major_indices(&layout.shape) {
                    match layout.locate(&index) {
                        Some(pos) => {
                            let v = current.get(pos as usize).copied().ok_or_else(|| {
                                ExecError::Kernel(format!(
                                    "view index {} outside source of {} elements",
                                    pos,
                                    current.len()
                                ))
                            })?;
                            next.push(v);
                        }
                        None => next.push(0.0),
                    }
                }
                current = next;
            }
            Evaluated {
                shape: tracker.shape().iter().map(|&d| d as usize).collect(),
                values: current,
            }
        }
        GraphNode::Op { kind, sources, .. } => {
            if sources.len() != kind.arity() {
                return Err(ExecError::BadArity {
                    op: op_name(*kind),
                    expected: kind.arity(),
                    got: sources.len(),
                });
            }
            let operands: Vec<Evaluated> = sources
                .iter()
                .map(|s| eval(s, buffers, memo))
                .collect::<Result<_, _>>()?;
            apply_op(*kind, sources, &operands)?
        }
    };

    memo.insert(node.id(), out.clone());
    Ok(out)
}

fn op_name(kind: OpKind) -> &'static str {
    match kind {
        OpKind::Add => "add",
        OpKind::Sub => "sub",
        OpKind::Mul => "mul",
        OpKind::Neg => "neg",
        OpKind::Recip => "recip",
        OpKind::Sum => "sum",
        OpKind::Max => "max",
    }
}

fn apply_op(
    kind: OpKind,
    sources: &[Arc<GraphNode>],
    operands: &[Evaluated],
) -> Result<Evaluated, ExecError> {
    match kind {
        OpKind::Add | OpKind::Sub | OpKind::Mul => {
            let (a, b) = (&operands[0], &operands[1]);
            if a.shape != b.shape {
                return Err(ExecError::ShapeMismatch(a.shape.clone(), b.shape.clone()));
            }
            if sources[0].dtype() != sources[1].dtype() {
                return Err(ExecError::DTypeMismatch(
                    sources[0].dtype(),
                    sources[1].dtype(),
                ));
            }
            let values = a
                .values
                .iter()
                .zip(&b.values)
                .map(|(x, y)| match kind {
                    OpKind::Add => x + y,
                    OpKind::Sub => x - y,
                    _ => x * y,
                })
                .collect();
            Ok(Evaluated {
                shape: a.shape.clone(),
                values,
            })
        }
        OpKind::Neg => Ok(Evaluated {
            shape: operands[0].shape.clone(),
            values: operands[0].values.iter().map(|v| -v).collect(),
        }),
        OpKind::Recip => Ok(Evaluated {
            shape: operands[0].shape.clone(),
            values: operands[0].values.iter().map(|v| 1.0 / v).collect(),
        }),
        OpKind::Sum => Ok(Evaluated {
            shape: Vec::new(),
            values: vec![operands[0].values.iter().sum()],
        }),
        OpKind::Max => {
            if operands[0].values.is_empty() {
                return Err(ExecError::Kernel("max over an empty tensor".into()));
            }
            let max = operands[0]
                .values
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max);
            Ok(Evaluated {
                shape: Vec::new(),
                values: vec![max],
            })
        }
    }
}

/// Errors from the full binding-merge + substitute + materialize pipeline.
#[derive(Error, Debug)]
pub enum ExecuteError {
    #[error(transparent)]
    Subst(#[from] SubstError),

    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// Run a program: cover every declared placeholder from
/// `user_inputs ∪ weights` (user inputs win), substitute, and materialize
/// on the accelerator. Fails before any kernel runs when a binding is
/// missing.
pub fn execute_graph(
    program: &GraphProgram,
    user_inputs: &ActualTensors,
    weights: Option<&ActualTensors>,
    accelerator: &dyn Accelerator,
) -> Result<Tensor, ExecuteError> {
    let declared: Vec<&str> = program.placeholders.iter().map(|p| p.name.as_str()).collect();

    for name in find_all_placeholders(&program.root) {
        if !declared.contains(&name.as_str()) {
            return Err(SubstError::UnknownPlaceholder(name).into());
        }
    }

    let mut bindings = ActualTensors::new();
    for info in &program.placeholders {
        if let Some(tensor) = user_inputs.get(&info.name) {
            bindings.insert(info.name.clone(), tensor.clone());
        } else if let Some(tensor) = weights.and_then(|w| w.get(&info.name)) {
            bindings.insert(info.name.clone(), tensor.clone());
        } else {
            return Err(SubstError::MissingBinding(info.name.clone()).into());
        }
    }

    let substitution = substitute(&program.root, &bindings)?;

    let mut buffers = substitution.buffers;
    for (id, tensor) in &program.constants {
        buffers.insert(*id, tensor.clone());
    }

    Ok(accelerator.execute(&substitution.root, &buffers)?)
}
