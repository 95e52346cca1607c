use crate::dtype::Float;
use crate::error::{TensorError, TensorResult};
use crate::shape::Shape;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;

/// N-dimensional tensor, the value flowing between layers.
///
/// Stores data in a flat contiguous `Vec<T>` with row-major (C-order) layout.
/// Images are laid out as `[batch, channels, height, width]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
pub struct Tensor<T: Float> {
    data: Vec<T>,
    shape: Shape,
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

// ─── Construction ───────────────────────────────────────────────────────────

impl<T: Float> Tensor<T> {
    /// Create a tensor from raw data and shape.
    pub fn new(data: Vec<T>, shape: Vec<usize>) -> TensorResult<Self> {
        let s = Shape::new(shape);
        if data.len() != s.numel() {
            return Err(TensorError::ShapeMismatch {
                expected: s.to_vec(),
                got: vec![data.len()],
            });
        }
        Ok(Tensor { data, shape: s })
    }

    /// Create a tensor filled with zeros.
    pub fn zeros(shape: Vec<usize>) -> Self {
        Self::full(shape, T::ZERO)
    }

    /// Create a tensor filled with ones.
    pub fn ones(shape: Vec<usize>) -> Self {
        Self::full(shape, T::ONE)
    }

    /// Create a tensor filled with a constant value.
    pub fn full(shape: Vec<usize>, value: T) -> Self {
        let s = Shape::new(shape);
        Tensor {
            data: vec![value; s.numel()],
            shape: s,
        }
    }

    /// Create a scalar tensor (0-d).
    pub fn scalar(value: T) -> Self {
        Tensor {
            data: vec![value],
            shape: Shape::scalar(),
        }
    }

    /// Create a 1-D tensor from a slice.
    pub fn from_slice(data: &[T]) -> Self {
        Tensor {
            data: data.to_vec(),
            shape: Shape::new(vec![data.len()]),
        }
    }

    /// Uniform samples in [0, 1), seeded or from entropy.
    pub fn rand(shape: Vec<usize>, seed: Option<u64>) -> Self {
        Self::rand_with(shape, &mut seeded_rng(seed))
    }

    /// Uniform samples in [0, 1) drawn from a caller-owned generator.
    pub fn rand_with<R: Rng + ?Sized>(shape: Vec<usize>, rng: &mut R) -> Self {
        let s = Shape::new(shape);
        let data = (0..s.numel()).map(|_| T::from_f64(rng.gen::<f64>())).collect();
        Tensor { data, shape: s }
    }

    /// Uniform samples in [low, high) drawn from a caller-owned generator.
    pub fn uniform_with<R: Rng + ?Sized>(shape: Vec<usize>, low: f64, high: f64, rng: &mut R) -> Self {
        let s = Shape::new(shape);
        let data = (0..s.numel())
            .map(|_| T::from_f64(low + (high - low) * rng.gen::<f64>()))
            .collect();
        Tensor { data, shape: s }
    }

    /// Standard normal samples, seeded or from entropy.
    pub fn randn(shape: Vec<usize>, seed: Option<u64>) -> Self {
        Self::randn_with(shape, &mut seeded_rng(seed))
    }

    /// Standard normal samples via Box-Muller from a caller-owned generator.
    pub fn randn_with<R: Rng + ?Sized>(shape: Vec<usize>, rng: &mut R) -> Self {
        let s = Shape::new(shape);
        let n = s.numel();
        let mut data = Vec::with_capacity(n + 1);

        while data.len() < n {
            let u1: f64 = rng.gen::<f64>().max(1e-300);
            let u2: f64 = rng.gen::<f64>();
            let r = (-2.0 * u1.ln()).sqrt();
            let theta = 2.0 * std::f64::consts::PI * u2;
            data.push(T::from_f64(r * theta.cos()));
            data.push(T::from_f64(r * theta.sin()));
        }
        data.truncate(n);
        Tensor { data, shape: s }
    }

    // ─── Accessors ──────────────────────────────────────────────────────────

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn shape_vec(&self) -> Vec<usize> {
        self.shape.to_vec()
    }

    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    /// `[batch, channels, height, width]` of a rank-4 tensor.
    pub fn nchw(&self) -> TensorResult<[usize; 4]> {
        self.shape.nchw()
    }

    /// The single value of a one-element tensor.
    pub fn item(&self) -> TensorResult<T> {
        if self.data.len() != 1 {
            return Err(TensorError::InvalidOperation(format!(
                "item() requires a single element, tensor has {}",
                self.data.len()
            )));
        }
        Ok(self.data[0])
    }

    fn offset(&self, indices: &[usize]) -> TensorResult<usize> {
        let dims = self.shape.dims();
        if indices.len() != dims.len() {
            return Err(TensorError::DimensionMismatch(format!(
                "expected {} indices, got {}",
                dims.len(),
                indices.len()
            )));
        }
        let mut offset = 0;
        for (axis, ((&i, &size), stride)) in indices
            .iter()
            .zip(dims.iter())
            .zip(self.shape.strides())
            .enumerate()
        {
            if i >= size {
                return Err(TensorError::IndexOutOfBounds { index: i, axis, size });
            }
            offset += i * stride;
        }
        Ok(offset)
    }

    /// Element at a multi-dimensional index.
    pub fn get(&self, indices: &[usize]) -> TensorResult<T> {
        Ok(self.data[self.offset(indices)?])
    }

    /// Overwrite the element at a multi-dimensional index.
    pub fn set(&mut self, indices: &[usize], value: T) -> TensorResult<()> {
        let off = self.offset(indices)?;
        self.data[off] = value;
        Ok(())
    }

    /// Overwrite every element with `value`.
    pub fn fill(&mut self, value: T) {
        self.data.iter_mut().for_each(|x| *x = value);
    }

    // ─── Shape Manipulation ─────────────────────────────────────────────────

    pub fn reshape(&self, new_shape: Vec<usize>) -> TensorResult<Tensor<T>> {
        let s = Shape::new(new_shape);
        if s.numel() != self.numel() {
            return Err(TensorError::ShapeMismatch {
                expected: s.to_vec(),
                got: self.shape_vec(),
            });
        }
        Ok(Tensor {
            data: self.data.clone(),
            shape: s,
        })
    }

    /// Collapse every axis after the first: `[b, ...] -> [b, prod(...)]`.
    pub fn flatten_batch(&self) -> TensorResult<Tensor<T>> {
        let batch = self.shape.dim(0)?;
        let features = if batch == 0 { 0 } else { self.numel() / batch };
        self.reshape(vec![batch, features])
    }

    /// Transpose of a 2-D tensor.
    pub fn t(&self) -> TensorResult<Tensor<T>> {
        let (rows, cols) = match self.shape.dims() {
            &[r, c] => (r, c),
            _ => {
                return Err(TensorError::RankMismatch {
                    expected: 2,
                    got: self.shape_vec(),
                })
            }
        };
        let mut data = vec![T::ZERO; rows * cols];
        for i in 0..rows {
            for j in 0..cols {
                data[j * rows + i] = self.data[i * cols + j];
            }
        }
        Tensor::new(data, vec![cols, rows])
    }

    // ─── Element-wise Operations ────────────────────────────────────────────

    pub fn apply<F: Fn(T) -> T>(&self, f: F) -> Tensor<T> {
        Tensor {
            data: self.data.iter().map(|&x| f(x)).collect(),
            shape: self.shape.clone(),
        }
    }

    pub fn apply_mut<F: Fn(T) -> T>(&mut self, f: F) {
        self.data.iter_mut().for_each(|x| *x = f(*x));
    }

    pub fn exp(&self) -> Tensor<T> { self.apply(T::exp) }
    pub fn ln(&self) -> Tensor<T> { self.apply(T::ln) }
    pub fn sqrt(&self) -> Tensor<T> { self.apply(T::sqrt) }
    pub fn abs(&self) -> Tensor<T> { self.apply(T::abs) }

    pub fn relu(&self) -> Tensor<T> {
        self.apply(|x| if x > T::ZERO { x } else { T::ZERO })
    }

    /// Logistic sigmoid, evaluated without overflowing `exp`.
    pub fn sigmoid(&self) -> Tensor<T> {
        self.apply(|x| {
            if x >= T::ZERO {
                T::ONE / (T::ONE + (-x).exp())
            } else {
                let e = x.exp();
                e / (T::ONE + e)
            }
        })
    }

    // ─── Scalar Operations ──────────────────────────────────────────────────

    pub fn add_scalar(&self, s: T) -> Tensor<T> { self.apply(|x| x + s) }
    pub fn sub_scalar(&self, s: T) -> Tensor<T> { self.apply(|x| x - s) }
    pub fn mul_scalar(&self, s: T) -> Tensor<T> { self.apply(|x| x * s) }
    pub fn div_scalar(&self, s: T) -> Tensor<T> { self.apply(|x| x / s) }

    // ─── Element-wise Binary Operations (with broadcasting) ─────────────────

    fn broadcast_binary_op<F: Fn(T, T) -> T>(
        &self,
        other: &Tensor<T>,
        op: F,
    ) -> TensorResult<Tensor<T>> {
        // Fast path: same shape
        if self.shape == other.shape {
            let data = self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(&a, &b)| op(a, b))
                .collect();
            return Ok(Tensor {
                data,
                shape: self.shape.clone(),
            });
        }

        let out_shape = Shape::broadcast_shape(&self.shape, &other.shape)?;
        let out_dims = out_shape.dims();
        let out_strides = out_shape.strides();
        let ndim = out_dims.len();

        // Per-output-axis stride into each operand; 0 where the operand broadcasts.
        let operand_strides = |t: &Tensor<T>| -> Vec<usize> {
            let dims = t.shape.dims();
            let strides = t.shape.strides();
            let pad = ndim - dims.len();
            (0..ndim)
                .map(|d| {
                    if d < pad || dims[d - pad] == 1 {
                        0
                    } else {
                        strides[d - pad]
                    }
                })
                .collect()
        };
        let a_strides = operand_strides(self);
        let b_strides = operand_strides(other);

        let mut data = Vec::with_capacity(out_shape.numel());
        for flat in 0..out_shape.numel() {
            let mut remaining = flat;
            let (mut a_off, mut b_off) = (0, 0);
            for d in 0..ndim {
                let idx = remaining / out_strides[d];
                remaining %= out_strides[d];
                a_off += idx * a_strides[d];
                b_off += idx * b_strides[d];
            }
            data.push(op(self.data[a_off], other.data[b_off]));
        }

        Ok(Tensor {
            data,
            shape: out_shape,
        })
    }

    pub fn add(&self, other: &Tensor<T>) -> TensorResult<Tensor<T>> {
        self.broadcast_binary_op(other, |a, b| a + b)
    }

    pub fn sub(&self, other: &Tensor<T>) -> TensorResult<Tensor<T>> {
        self.broadcast_binary_op(other, |a, b| a - b)
    }

    pub fn mul(&self, other: &Tensor<T>) -> TensorResult<Tensor<T>> {
        self.broadcast_binary_op(other, |a, b| a * b)
    }

    pub fn div(&self, other: &Tensor<T>) -> TensorResult<Tensor<T>> {
        self.broadcast_binary_op(other, |a, b| a / b)
    }

    // ─── Reduction Operations ───────────────────────────────────────────────

    /// Sum of all elements.
    pub fn sum_all(&self) -> T {
        self.data.iter().copied().sum()
    }

    /// Mean of all elements.
    pub fn mean_all(&self) -> TensorResult<T> {
        if self.data.is_empty() {
            return Err(TensorError::EmptyTensor);
        }
        Ok(self.sum_all() / T::from_usize(self.numel()))
    }

    /// Population standard deviation of all elements.
    pub fn std_all(&self) -> TensorResult<T> {
        let mean = self.mean_all()?;
        let var = self
            .data
            .iter()
            .map(|&x| (x - mean) * (x - mean))
            .sum::<T>()
            / T::from_usize(self.numel());
        Ok(var.sqrt())
    }

    pub fn max_all(&self) -> TensorResult<T> {
        self.data.iter().copied().reduce(T::max).ok_or(TensorError::EmptyTensor)
    }

    pub fn min_all(&self) -> TensorResult<T> {
        self.data.iter().copied().reduce(T::min).ok_or(TensorError::EmptyTensor)
    }

    /// Euclidean (Frobenius) norm.
    pub fn norm(&self) -> T {
        self.data.iter().map(|&x| x * x).sum::<T>().sqrt()
    }

    /// Sum along a specific axis, collapsing that dimension.
    pub fn sum_axis(&self, axis: usize) -> TensorResult<Tensor<T>> {
        let dims = self.shape.dims();
        if axis >= dims.len() {
            return Err(TensorError::InvalidAxis {
                axis,
                ndim: self.ndim(),
            });
        }

        let outer: usize = dims[..axis].iter().product();
        let axis_size = dims[axis];
        let inner: usize = dims[axis + 1..].iter().product();

        let mut new_dims = dims.to_vec();
        new_dims.remove(axis);

        let mut result = vec![T::ZERO; outer * inner];
        for o in 0..outer {
            for a in 0..axis_size {
                for i in 0..inner {
                    result[o * inner + i] += self.data[o * axis_size * inner + a * inner + i];
                }
            }
        }

        Tensor::new(result, new_dims)
    }

    /// Mean along a specific axis.
    pub fn mean_axis(&self, axis: usize) -> TensorResult<Tensor<T>> {
        let axis_size = self.shape.dim(axis)?;
        if axis_size == 0 {
            return Err(TensorError::EmptyTensor);
        }
        let s = self.sum_axis(axis)?;
        Ok(s.div_scalar(T::from_usize(axis_size)))
    }

    // ─── Linear Algebra ─────────────────────────────────────────────────────

    /// Matrix-vector or matrix-matrix product of 2-D operands.
    pub fn matmul(&self, other: &Tensor<T>) -> TensorResult<Tensor<T>> {
        let (m, k) = match self.shape.dims() {
            &[m, k] => (m, k),
            _ => return Err(TensorError::RankMismatch { expected: 2, got: self.shape_vec() }),
        };
        let (k2, n) = match other.shape.dims() {
            &[k2, n] => (k2, n),
            _ => return Err(TensorError::RankMismatch { expected: 2, got: other.shape_vec() }),
        };
        if k != k2 {
            return Err(TensorError::DimensionMismatch(format!(
                "matmul: inner dimensions must match, got {} and {}",
                k, k2
            )));
        }

        let mut data = vec![T::ZERO; m * n];
        for i in 0..m {
            for p in 0..k {
                let a = self.data[i * k + p];
                let row = &other.data[p * n..(p + 1) * n];
                for (out, &b) in data[i * n..(i + 1) * n].iter_mut().zip(row) {
                    *out += a * b;
                }
            }
        }
        Tensor::new(data, vec![m, n])
    }

    // ─── Softmax ────────────────────────────────────────────────────────────

    fn for_each_last_axis_row<F: Fn(&mut [T])>(&self, f: F) -> TensorResult<Tensor<T>> {
        let axis_size = *self
            .shape
            .dims()
            .last()
            .ok_or_else(|| TensorError::InvalidOperation("softmax of a scalar".to_string()))?;
        let mut data = self.data.clone();
        if axis_size > 0 {
            data.chunks_mut(axis_size).for_each(f);
        }
        Ok(Tensor {
            data,
            shape: self.shape.clone(),
        })
    }

    /// Softmax along the last axis.
    pub fn softmax(&self) -> TensorResult<Tensor<T>> {
        self.for_each_last_axis_row(|row| {
            let max_val = row.iter().copied().fold(T::NEG_INFINITY, T::max);
            let mut sum = T::ZERO;
            for x in row.iter_mut() {
                *x = (*x - max_val).exp();
                sum += *x;
            }
            for x in row.iter_mut() {
                *x = *x / sum;
            }
        })
    }

    /// Log-softmax along the last axis, computed as `x - max - ln(sum(exp(x - max)))`.
    pub fn log_softmax(&self) -> TensorResult<Tensor<T>> {
        self.for_each_last_axis_row(|row| {
            let max_val = row.iter().copied().fold(T::NEG_INFINITY, T::max);
            let log_sum = row.iter().map(|&x| (x - max_val).exp()).sum::<T>().ln();
            for x in row.iter_mut() {
                *x = *x - max_val - log_sum;
            }
        })
    }
}

impl<T: Float> PartialEq for Tensor<T> {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && self.data == other.data
    }
}

impl<T: Float> fmt::Display for Tensor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ndim() == 0 {
            return write!(f, "tensor({})", self.data[0]);
        }
        write!(f, "tensor([")?;
        for (i, v) in self.data.iter().take(8).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:.4}", v)?;
        }
        if self.numel() > 8 {
            write!(f, ", ...")?;
        }
        write!(f, "], shape={})", self.shape)
    }
}
