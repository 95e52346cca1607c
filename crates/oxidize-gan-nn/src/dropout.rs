use std::cell::RefCell;

use oxidize_gan_core::{Tensor, TensorResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::layer::Layer;

/// Channel-wise dropout: zeros whole feature maps during training.
/// Kept channels are scaled by 1 / (1 - p). During inference (default), acts as identity.
pub struct Dropout2D {
    pub p: f64,
    pub training: bool,
    rng: RefCell<StdRng>,
}

impl Dropout2D {
    pub fn new(p: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Dropout2D {
            p,
            training: false,
            rng: RefCell::new(rng),
        }
    }

    pub fn train(&mut self) { self.training = true; }
    pub fn eval(&mut self) { self.training = false; }
}

impl Layer for Dropout2D {
    fn name(&self) -> String {
        format!("Dropout2D({})", self.p)
    }

    fn forward(&self, input: &Tensor<f64>) -> TensorResult<Tensor<f64>> {
        let [_, _, h, w] = input.nchw()?;
        if !self.training || self.p <= 0.0 {
            return Ok(input.clone());
        }
        let plane = (h * w).max(1);
        let scale = if self.p < 1.0 { 1.0 / (1.0 - self.p) } else { 0.0 };

        let mut out = input.clone();
        let mut rng = self.rng.borrow_mut();
        for chunk in out.data_mut().chunks_mut(plane) {
            let keep = rng.gen::<f64>() >= self.p;
            let factor = if keep { scale } else { 0.0 };
            chunk.iter_mut().for_each(|x| *x *= factor);
        }
        Ok(out)
    }

    fn output_shape(&self, input: &[usize]) -> TensorResult<Vec<usize>> {
        Ok(input.to_vec())
    }

    fn parameters(&self) -> Vec<&Tensor<f64>> { vec![] }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }
}
