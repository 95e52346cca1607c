use crate::error::{TensorError, TensorResult};
use serde::{Deserialize, Serialize};

/// Dimensions of a tensor, outermost first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    pub fn new(dims: Vec<usize>) -> Self {
        Shape { dims }
    }

    pub fn scalar() -> Self {
        Shape { dims: vec![] }
    }

    /// Number of dimensions (rank).
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Size along a specific axis.
    pub fn dim(&self, axis: usize) -> TensorResult<usize> {
        self.dims.get(axis).copied().ok_or(TensorError::InvalidAxis {
            axis,
            ndim: self.ndim(),
        })
    }

    /// Total number of elements. A scalar holds one.
    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn to_vec(&self) -> Vec<usize> {
        self.dims.clone()
    }

    /// Product of every dimension except the last; 1 for rank 0 and 1.
    ///
    /// This is the fan-in used by the weight initializer.
    pub fn leading_numel(&self) -> usize {
        match self.dims.split_last() {
            Some((_, rest)) => rest.iter().product(),
            None => 1,
        }
    }

    /// Split a rank-4 shape into `[batch, channels, height, width]`.
    pub fn nchw(&self) -> TensorResult<[usize; 4]> {
        match self.dims.as_slice() {
            &[b, c, h, w] => Ok([b, c, h, w]),
            _ => Err(TensorError::RankMismatch {
                expected: 4,
                got: self.to_vec(),
            }),
        }
    }

    /// Row-major (C-order) strides.
    pub fn strides(&self) -> Vec<usize> {
        let mut strides = vec![1usize; self.dims.len()];
        for i in (0..self.dims.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * self.dims[i + 1];
        }
        strides
    }

    /// Output shape of a NumPy-style broadcast of `a` and `b`.
    pub fn broadcast_shape(a: &Shape, b: &Shape) -> TensorResult<Shape> {
        let ndim = a.ndim().max(b.ndim());
        let mut out = vec![0usize; ndim];

        for i in 0..ndim {
            let da = a.dims.len().checked_sub(i + 1).map_or(1, |j| a.dims[j]);
            let db = b.dims.len().checked_sub(i + 1).map_or(1, |j| b.dims[j]);
            out[ndim - 1 - i] = match (da, db) {
                _ if da == db => da,
                (1, _) => db,
                (_, 1) => da,
                _ => {
                    return Err(TensorError::BroadcastError {
                        a: a.to_vec(),
                        b: b.to_vec(),
                    })
                }
            };
        }

        Ok(Shape::new(out))
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, ")")
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape::new(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape::new(dims.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_basics() {
        let s = Shape::new(vec![3, 4, 5]);
        assert_eq!(s.ndim(), 3);
        assert_eq!(s.numel(), 60);
        assert_eq!(s.dim(2).unwrap(), 5);
        assert!(s.dim(3).is_err());
        assert_eq!(s.strides(), vec![20, 5, 1]);
    }

    #[test]
    fn test_leading_numel() {
        assert_eq!(Shape::new(vec![8, 3, 3, 3]).leading_numel(), 72);
        assert_eq!(Shape::new(vec![16]).leading_numel(), 1);
        assert_eq!(Shape::scalar().leading_numel(), 1);
        assert_eq!(Shape::scalar().numel(), 1);
    }

    #[test]
    fn test_nchw() {
        assert_eq!(Shape::new(vec![2, 3, 8, 8]).nchw().unwrap(), [2, 3, 8, 8]);
        assert!(matches!(
            Shape::new(vec![3, 8, 8]).nchw(),
            Err(TensorError::RankMismatch { expected: 4, .. })
        ));
    }

    #[test]
    fn test_broadcast() {
        let c = Shape::broadcast_shape(&Shape::new(vec![2, 3, 4, 4]), &Shape::new(vec![1, 3, 1, 1])).unwrap();
        assert_eq!(c.dims(), &[2, 3, 4, 4]);

        let c = Shape::broadcast_shape(&Shape::new(vec![5, 3, 1]), &Shape::new(vec![4])).unwrap();
        assert_eq!(c.dims(), &[5, 3, 4]);

        assert!(Shape::broadcast_shape(&Shape::new(vec![3, 4]), &Shape::new(vec![3, 5])).is_err());
    }
}
