use oxidize_gan_core::{Shape, Tensor, TensorError, TensorResult};
use serde::{Deserialize, Serialize};

use crate::layer::{Layer, Trainable};

/// Normalization inserted after hidden convolutions when a stack enables it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Norm {
    Instance { affine: bool },
}

impl Norm {
    pub fn build(&self, channels: usize) -> Box<dyn Layer> {
        match *self {
            Norm::Instance { affine } => Box::new(InstanceNorm2D::new(channels, affine)),
        }
    }
}

impl Default for Norm {
    fn default() -> Self {
        Norm::Instance { affine: true }
    }
}

/// Instance Normalization over each (sample, channel) plane.
///
/// y = (x - μ) / √(σ² + ε) * γ + β, with biased variance.
pub struct InstanceNorm2D {
    pub num_features: usize,
    pub eps: f64,
    pub affine: bool,
    pub gamma: Tensor<f64>, // [num_features]
    pub beta: Tensor<f64>,  // [num_features]
}

impl InstanceNorm2D {
    pub fn new(num_features: usize, affine: bool) -> Self {
        InstanceNorm2D {
            num_features,
            eps: 1e-5,
            affine,
            gamma: Tensor::ones(vec![num_features]),
            beta: Tensor::zeros(vec![num_features]),
        }
    }
}

impl Layer for InstanceNorm2D {
    fn name(&self) -> String {
        format!("InstanceNorm2D({})", self.num_features)
    }

    fn forward(&self, input: &Tensor<f64>) -> TensorResult<Tensor<f64>> {
        let [_, c, h, w] = input.nchw()?;
        if c != self.num_features {
            return Err(TensorError::ChannelMismatch {
                layer: self.name(),
                expected: self.num_features,
                got: c,
            });
        }
        let plane = h * w;
        let mut out = input.clone();
        if plane == 0 {
            return Ok(out);
        }

        for (idx, chunk) in out.data_mut().chunks_mut(plane).enumerate() {
            let ch = idx % c;
            let mean = chunk.iter().sum::<f64>() / plane as f64;
            let var = chunk.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / plane as f64;
            let inv_std = 1.0 / (var + self.eps).sqrt();
            let (g, b) = if self.affine {
                (self.gamma.data()[ch], self.beta.data()[ch])
            } else {
                (1.0, 0.0)
            };
            chunk.iter_mut().for_each(|x| *x = (*x - mean) * inv_std * g + b);
        }
        Ok(out)
    }

    fn output_shape(&self, input: &[usize]) -> TensorResult<Vec<usize>> {
        let [_, c, _, _] = Shape::from(input).nchw()?;
        if c != self.num_features {
            return Err(TensorError::ChannelMismatch {
                layer: self.name(),
                expected: self.num_features,
                got: c,
            });
        }
        Ok(input.to_vec())
    }

    fn parameters(&self) -> Vec<&Tensor<f64>> {
        if self.affine {
            vec![&self.gamma, &self.beta]
        } else {
            vec![]
        }
    }

    fn trainable(&mut self) -> Option<Trainable<'_>> {
        if !self.affine {
            return None;
        }
        Some(Trainable {
            weight: &mut self.gamma,
            bias: Some(&mut self.beta),
        })
    }
}
