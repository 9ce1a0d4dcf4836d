//! Operator identity used as the key of every cost record.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// dtype assumed when the caller does not name one.
pub const DEFAULT_DTYPE: &str = "float32";

/// Literal callers may pass to request the database's default dtype.
pub const DEFAULT_DTYPE_ALIAS: &str = "default";

/// Whether a cost belongs to the forward or the backward (gradient) kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl Direction {
    /// Map the façade's boolean `forward` flag onto a direction.
    pub fn from_forward_flag(forward: bool) -> Self {
        if forward {
            Direction::Forward
        } else {
            Direction::Backward
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "forward" | "fwd" => Ok(Direction::Forward),
            "backward" | "bwd" | "grad" => Ok(Direction::Backward),
            other => Err(format!("unknown direction: {}", other)),
        }
    }
}

fn default_dtype() -> String {
    DEFAULT_DTYPE.to_string()
}

/// Structural identity of an operator configuration
///
/// Two signatures are equal only if name, direction, dtype and every
/// dimension of every shape tuple match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperatorSignature {
    /// Operator name, e.g. `conv2d`
    pub name: String,
    /// Forward or backward kernel
    #[serde(default)]
    pub direction: Direction,
    /// Element type name, e.g. `float32`
    #[serde(default = "default_dtype")]
    pub dtype: String,
    /// Ordered input shapes
    #[serde(default)]
    pub shape_config: Vec<Vec<usize>>,
}

impl OperatorSignature {
    /// Create a forward, default-dtype signature with no shape information
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: Direction::Forward,
            dtype: default_dtype(),
            shape_config: Vec::new(),
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_dtype(mut self, dtype: impl Into<String>) -> Self {
        self.dtype = dtype.into();
        self
    }

    pub fn with_shapes(mut self, shape_config: Vec<Vec<usize>>) -> Self {
        self.shape_config = shape_config;
        self
    }

    /// True if name, direction and dtype match, ignoring shapes.
    pub fn matches(&self, name: &str, direction: Direction, dtype: &str) -> bool {
        self.name == name && self.direction == direction && self.dtype == dtype
    }
}

impl fmt::Display for OperatorSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}, {}", self.name, self.direction, self.dtype)?;
        for shape in &self.shape_config {
            let dims: Vec<String> = shape.iter().map(|d| d.to_string()).collect();
            write!(f, ", ({})", dims.join("x"))?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_signature_defaults() {
        let sig = OperatorSignature::new("abs");
        assert_eq!(sig.direction, Direction::Forward);
        assert_eq!(sig.dtype, "float32");
        assert!(sig.shape_config.is_empty());
    }

    #[test]
    fn test_structural_identity() {
        let a = OperatorSignature::new("conv2d").with_shapes(vec![vec![1, 3, 8, 8]]);
        let b = OperatorSignature::new("conv2d").with_shapes(vec![vec![1, 3, 8, 8]]);
        let c = OperatorSignature::new("conv2d").with_shapes(vec![vec![1, 3, 8, 9]]);
        let d = b.clone().with_direction(Direction::Backward);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, d);

        let set: HashSet<_> = [a, b, c, d].into_iter().collect();
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!("forward".parse::<Direction>(), Ok(Direction::Forward));
        assert_eq!("BACKWARD".parse::<Direction>(), Ok(Direction::Backward));
        assert!("sideways".parse::<Direction>().is_err());
        assert_eq!(Direction::from_forward_flag(false), Direction::Backward);
    }

    #[test]
    fn test_signature_display() {
        let sig = OperatorSignature::new("matmul")
            .with_dtype("float16")
            .with_shapes(vec![vec![2, 3], vec![3, 4]]);
        assert_eq!(sig.to_string(), "matmul[forward, float16, (2x3), (3x4)]");
    }

    #[test]
    fn test_signature_deserialize_defaults() {
        let sig: OperatorSignature = serde_json::from_str(r#"{"name": "relu"}"#).unwrap();
        assert_eq!(sig, OperatorSignature::new("relu"));
    }
}
