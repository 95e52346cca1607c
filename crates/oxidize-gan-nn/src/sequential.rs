use std::fmt;

use oxidize_gan_core::{Tensor, TensorResult};

use crate::layer::Layer;

/// Sequential model: chains layers in order.
pub struct Sequential {
    layers: Vec<Box<dyn Layer>>,
}

impl Sequential {
    pub fn new() -> Self {
        Sequential { layers: Vec::new() }
    }

    /// Add a layer to the model.
    pub fn add(mut self, layer: Box<dyn Layer>) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn push(&mut self, layer: Box<dyn Layer>) {
        self.layers.push(layer);
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[Box<dyn Layer>] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [Box<dyn Layer>] {
        &mut self.layers
    }

    /// Forward pass through all layers.
    pub fn forward(&self, input: &Tensor<f64>) -> TensorResult<Tensor<f64>> {
        let mut x = input.clone();
        for layer in &self.layers {
            x = layer.forward(&x)?;
        }
        Ok(x)
    }

    /// Shape after every layer, without evaluating anything.
    pub fn output_shape(&self, input: &[usize]) -> TensorResult<Vec<usize>> {
        self.layers
            .iter()
            .try_fold(input.to_vec(), |shape, layer| layer.output_shape(&shape))
    }

    /// Collect all trainable parameters from all layers.
    pub fn parameters(&self) -> Vec<&Tensor<f64>> {
        self.layers.iter().flat_map(|l| l.parameters()).collect()
    }

    /// Total number of scalar parameters.
    pub fn parameter_count(&self) -> usize {
        self.parameters().iter().map(|p| p.numel()).sum()
    }

    pub fn set_training(&mut self, training: bool) {
        self.layers.iter_mut().for_each(|l| l.set_training(training));
    }

    /// One line per layer with the shape it produces for `input`.
    pub fn summary(&self, input: &[usize]) -> TensorResult<String> {
        let mut out = String::new();
        let mut shape = input.to_vec();
        for (i, layer) in self.layers.iter().enumerate() {
            shape = layer.output_shape(&shape)?;
            out.push_str(&format!("{:>3}  {:<40} {:?}\n", i, layer.name(), shape));
        }
        Ok(out)
    }
}

impl Default for Sequential {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Sequential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.layers.iter().map(|l| l.name()))
            .finish()
    }
}
