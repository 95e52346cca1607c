use oxidize_gan_core::{Tensor, TensorResult};

/// Mutable view of a layer's learnable weight and optional bias.
///
/// Only layers that hand one out through [`Layer::trainable`] are touched
/// by [`initialize`](crate::initialize).
pub struct Trainable<'a> {
    pub weight: &'a mut Tensor<f64>,
    pub bias: Option<&'a mut Tensor<f64>>,
}

/// Trait for a neural network layer.
pub trait Layer {
    /// Short human-readable description, e.g. `Conv2D(3→16, k=3, p=1)`.
    fn name(&self) -> String;

    /// Forward pass.
    fn forward(&self, input: &Tensor<f64>) -> TensorResult<Tensor<f64>>;

    /// Shape produced for an input of shape `input`, without running the layer.
    fn output_shape(&self, input: &[usize]) -> TensorResult<Vec<usize>>;

    /// Return all trainable parameters.
    fn parameters(&self) -> Vec<&Tensor<f64>>;

    /// Weight/bias capability. Non-parametric layers keep the default `None`.
    fn trainable(&mut self) -> Option<Trainable<'_>> {
        None
    }

    /// Switch between training and evaluation behaviour.
    fn set_training(&mut self, _training: bool) {}
}
