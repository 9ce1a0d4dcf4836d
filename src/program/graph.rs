//! Program graph: named tensors plus an ordered list of operations.

use std::collections::HashSet;

use crate::cost::{Direction, OperatorSignature};
use crate::error::{CostModelError, CostResult};
use crate::program::{Op, TensorDesc, TensorId};

#[derive(Debug, Clone)]
pub struct Node {
    pub op: Op,
    pub inputs: Vec<TensorId>,
    pub outputs: Vec<TensorId>,
    pub direction: Direction,
}

/// Read-only input to the profiler
///
/// Nodes run in insertion order.
#[derive(Debug, Default, Clone)]
pub struct ProgramGraph {
    pub tensors: Vec<TensorDesc>,
    pub nodes: Vec<Node>,
}

impl ProgramGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tensor(&mut self, mut desc: TensorDesc) -> TensorId {
        let id = TensorId(self.tensors.len());
        desc.id = id;
        self.tensors.push(desc);
        id
    }

    pub fn add_node(&mut self, op: Op, inputs: Vec<TensorId>, outputs: Vec<TensorId>) {
        self.nodes.push(Node {
            op,
            inputs,
            outputs,
            direction: Direction::Forward,
        });
    }

    /// Add a node that belongs to the gradient computation
    pub fn add_backward_node(&mut self, op: Op, inputs: Vec<TensorId>, outputs: Vec<TensorId>) {
        self.nodes.push(Node {
            op,
            inputs,
            outputs,
            direction: Direction::Backward,
        });
    }

    pub fn tensor(&self, id: TensorId) -> Option<&TensorDesc> {
        self.tensors.get(id.0)
    }

    pub fn find_tensor(&self, name: &str) -> Option<&TensorDesc> {
        self.tensors.iter().find(|t| t.name == name)
    }

    pub fn num_ops(&self) -> usize {
        self.nodes.len()
    }

    /// A graph with no operations. Declared tensors do not count.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check tensor names are unique and every node references declared
    /// tensors with the arity its op expects.
    pub fn validate(&self) -> CostResult<()> {
        let mut names = HashSet::new();
        for desc in &self.tensors {
            if !names.insert(desc.name.as_str()) {
                return Err(CostModelError::InvalidGraph(format!(
                    "duplicate tensor name '{}'",
                    desc.name
                )));
            }
        }

        for (index, node) in self.nodes.iter().enumerate() {
            let (n_in, n_out) = node.op.arity();
            if node.inputs.len() != n_in || node.outputs.len() != n_out {
                return Err(CostModelError::InvalidGraph(format!(
                    "node {} ({}) expects {} inputs and {} outputs, got {} and {}",
                    index,
                    node.op.name(),
                    n_in,
                    n_out,
                    node.inputs.len(),
                    node.outputs.len()
                )));
            }
            for id in node.inputs.iter().chain(node.outputs.iter()) {
                if self.tensor(*id).is_none() {
                    return Err(CostModelError::InvalidGraph(format!(
                        "node {} ({}) references undeclared tensor {:?}",
                        index,
                        node.op.name(),
                        id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Signature identifying `node` in cost records
    ///
    /// dtype comes from the first output (or first input for ops without
    /// outputs); shapes are the input shapes in order.
    pub fn signature_of(&self, node: &Node) -> OperatorSignature {
        let dtype = node
            .outputs
            .first()
            .or_else(|| node.inputs.first())
            .and_then(|id| self.tensor(*id))
            .map(|t| t.dtype.name())
            .unwrap_or(crate::cost::DEFAULT_DTYPE);

        let shapes = node
            .inputs
            .iter()
            .filter_map(|id| self.tensor(*id))
            .map(|t| t.shape.clone())
            .collect();

        OperatorSignature::new(node.op.name())
            .with_direction(node.direction)
            .with_dtype(dtype)
            .with_shapes(shapes)
    }
}
