//! Tensor descriptors for program graphs.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TensorId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    F32,
    F16,
    I32,
}

impl DType {
    /// Framework name used in signatures and benchmark data
    pub fn name(&self) -> &'static str {
        match self {
            DType::F32 => "float32",
            DType::F16 => "float16",
            DType::I32 => "int32",
        }
    }

    pub fn element_size(&self) -> usize {
        match self {
            DType::F16 => 2,
            DType::F32 | DType::I32 => 4,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "float32" | "f32" => Ok(DType::F32),
            "float16" | "f16" => Ok(DType::F16),
            "int32" | "i32" => Ok(DType::I32),
            other => Err(format!("unknown dtype: {}", other)),
        }
    }
}

/// A named tensor
///
/// Names are the link between an init graph and the graph it prepares: a
/// tensor filled by the init graph is visible to the main graph under the
/// same name.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorDesc {
    pub id: TensorId,
    pub name: String,
    pub shape: Vec<usize>,
    pub dtype: DType,
}

impl TensorDesc {
    pub fn new(name: impl Into<String>, shape: Vec<usize>, dtype: DType) -> Self {
        Self {
            id: TensorId(0),
            name: name.into(),
            shape,
            dtype,
        }
    }

    pub fn f32(name: impl Into<String>, shape: Vec<usize>) -> Self {
        Self::new(name, shape, DType::F32)
    }

    /// Same name, shape and dtype, ignoring the graph-local id.
    pub fn same_layout(&self, other: &TensorDesc) -> bool {
        self.name == other.name && self.shape == other.shape && self.dtype == other.dtype
    }

    pub fn element_count(&self) -> usize {
        element_count(&self.shape)
    }

    pub fn byte_size(&self) -> usize {
        self.element_count().saturating_mul(self.dtype.element_size())
    }
}

pub fn element_count(shape: &[usize]) -> usize {
    shape.iter().copied().product()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_size() {
        assert_eq!(TensorDesc::f32("x", vec![2, 3]).byte_size(), 24);
        assert_eq!(TensorDesc::new("h", vec![4, 4], DType::F16).byte_size(), 32);
        assert_eq!(TensorDesc::f32("s", vec![]).element_count(), 1);
    }

    #[test]
    fn test_dtype_names_round_trip() {
        for dtype in [DType::F32, DType::F16, DType::I32] {
            assert_eq!(dtype.name().parse::<DType>(), Ok(dtype));
        }
        assert!("bfloat16".parse::<DType>().is_err());
    }
}
