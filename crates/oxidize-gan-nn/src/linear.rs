use oxidize_gan_core::{Tensor, TensorError, TensorResult};
use rand::Rng;

use crate::layer::{Layer, Trainable};

/// Fully connected (dense) layer: y = xW + b.
pub struct Linear {
    pub weight: Tensor<f64>, // [in_features, out_features]
    pub bias: Tensor<f64>,   // [out_features]
    pub in_features: usize,
    pub out_features: usize,
}

impl Linear {
    /// Create a new linear layer with weight and bias drawn from U(-1/√in, 1/√in).
    pub fn new<R: Rng + ?Sized>(in_features: usize, out_features: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (in_features.max(1) as f64).sqrt();
        Linear {
            weight: Tensor::uniform_with(vec![in_features, out_features], -bound, bound, rng),
            bias: Tensor::uniform_with(vec![out_features], -bound, bound, rng),
            in_features,
            out_features,
        }
    }
}

impl Layer for Linear {
    fn name(&self) -> String {
        format!("Linear({}→{})", self.in_features, self.out_features)
    }

    fn forward(&self, input: &Tensor<f64>) -> TensorResult<Tensor<f64>> {
        let xw = input.matmul(&self.weight)?;
        xw.add(&self.bias)
    }

    fn output_shape(&self, input: &[usize]) -> TensorResult<Vec<usize>> {
        match input {
            &[batch, features] if features == self.in_features => Ok(vec![batch, self.out_features]),
            _ => Err(TensorError::ShapeMismatch {
                expected: vec![input.first().copied().unwrap_or(0), self.in_features],
                got: input.to_vec(),
            }),
        }
    }

    fn parameters(&self) -> Vec<&Tensor<f64>> {
        vec![&self.weight, &self.bias]
    }

    fn trainable(&mut self) -> Option<Trainable<'_>> {
        Some(Trainable {
            weight: &mut self.weight,
            bias: Some(&mut self.bias),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_linear_forward() {
        let mut fc = Linear::new(3, 2, &mut StdRng::seed_from_u64(0));
        fc.weight = Tensor::new(vec![1.0, 0.0, 0.0, 1.0, 1.0, 1.0], vec![3, 2]).unwrap();
        fc.bias = Tensor::from_slice(&[0.5, -0.5]);
        let x = Tensor::new(vec![1.0, 2.0, 3.0], vec![1, 3]).unwrap();
        let y = fc.forward(&x).unwrap();
        assert_eq!(y.shape_vec(), vec![1, 2]);
        assert_eq!(y.data(), &[4.5, 4.5]);
    }

    #[test]
    fn test_linear_rejects_wrong_width() {
        let fc = Linear::new(4, 2, &mut StdRng::seed_from_u64(0));
        assert!(fc.forward(&Tensor::ones(vec![2, 3])).is_err());
        assert!(fc.output_shape(&[2, 3]).is_err());
        assert_eq!(fc.output_shape(&[2, 4]).unwrap(), vec![2, 2]);
    }
}
