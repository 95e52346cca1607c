use oxidize_gan_core::{Tensor, TensorResult};
use serde::{Deserialize, Serialize};

use crate::layer::Layer;

/// Activation inserted after every hidden convolution of a stack.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Activation {
    LeakyRelu { slope: f64 },
    Relu,
}

impl Activation {
    /// Negative slope of the default leaky activation.
    pub const DEFAULT_LEAKY_SLOPE: f64 = 0.01;

    pub fn build(&self) -> Box<dyn Layer> {
        match *self {
            Activation::LeakyRelu { slope } => Box::new(LeakyReLULayer::new(slope)),
            Activation::Relu => Box::new(ReLULayer),
        }
    }
}

impl Default for Activation {
    fn default() -> Self {
        Activation::LeakyRelu {
            slope: Self::DEFAULT_LEAKY_SLOPE,
        }
    }
}

/// ReLU activation layer.
pub struct ReLULayer;

impl Layer for ReLULayer {
    fn name(&self) -> String { "ReLU".to_string() }
    fn forward(&self, input: &Tensor<f64>) -> TensorResult<Tensor<f64>> { Ok(input.relu()) }
    fn output_shape(&self, input: &[usize]) -> TensorResult<Vec<usize>> { Ok(input.to_vec()) }
    fn parameters(&self) -> Vec<&Tensor<f64>> { vec![] }
}

/// LeakyReLU activation: f(x) = x for x > 0, slope * x otherwise.
pub struct LeakyReLULayer {
    pub slope: f64,
}

impl LeakyReLULayer {
    pub fn new(slope: f64) -> Self {
        LeakyReLULayer { slope }
    }
}

impl Default for LeakyReLULayer {
    fn default() -> Self {
        Self::new(Activation::DEFAULT_LEAKY_SLOPE)
    }
}

impl Layer for LeakyReLULayer {
    fn name(&self) -> String {
        format!("LeakyReLU({})", self.slope)
    }

    fn forward(&self, input: &Tensor<f64>) -> TensorResult<Tensor<f64>> {
        let slope = self.slope;
        Ok(input.apply(|x| if x > 0.0 { x } else { slope * x }))
    }

    fn output_shape(&self, input: &[usize]) -> TensorResult<Vec<usize>> {
        Ok(input.to_vec())
    }

    fn parameters(&self) -> Vec<&Tensor<f64>> { vec![] }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaky_relu() {
        let x = Tensor::from_slice(&[-2.0, 0.0, 3.0]);
        let y = LeakyReLULayer::new(0.2).forward(&x).unwrap();
        assert_eq!(y.data(), &[-0.4, 0.0, 3.0]);
    }

    #[test]
    fn test_activation_factory() {
        let act = Activation::default();
        assert_eq!(act, Activation::LeakyRelu { slope: 0.01 });
        assert_eq!(act.build().name(), "LeakyReLU(0.01)");

        let relu = Activation::Relu.build();
        let y = relu.forward(&Tensor::from_slice(&[-1.0, 1.0])).unwrap();
        assert_eq!(y.data(), &[0.0, 1.0]);
    }
}
