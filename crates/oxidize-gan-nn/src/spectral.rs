use std::cell::RefCell;

use oxidize_gan_core::{Tensor, TensorResult};
use rand::Rng;

use crate::conv::Conv2D;
use crate::layer::Layer;

/// Power-iteration steps run once when the wrapper is built.
const WARMUP_ITERATIONS: usize = 15;
const EPS: f64 = 1e-12;

/// Left/right singular vector estimates of the reshaped weight.
struct PowerState {
    u: Vec<f64>, // [out_channels]
    v: Vec<f64>, // [in_channels * k * k]
}

/// Spectral normalization around a convolution.
///
/// The weight, viewed as an `[out, in·k·k]` matrix, is divided by an estimate
/// of its largest singular value before every forward pass. In training mode
/// each forward refines the estimate with one power-iteration step.
///
/// The wrapper does not expose the inner weight through
/// [`Layer::trainable`]; the wrapped convolution keeps its own init.
pub struct SpectralNorm {
    inner: Conv2D,
    state: RefCell<PowerState>,
    pub training: bool,
}

fn normalize(v: &mut [f64]) {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt().max(EPS);
    v.iter_mut().for_each(|x| *x /= norm);
}

impl SpectralNorm {
    pub fn new<R: Rng + ?Sized>(inner: Conv2D, rng: &mut R) -> Self {
        let rows = inner.out_channels;
        let mut u = Tensor::<f64>::randn_with(vec![rows], rng).into_data();
        normalize(&mut u);
        let cols = inner.weight.numel() / rows.max(1);
        let sn = SpectralNorm {
            inner,
            state: RefCell::new(PowerState { u, v: vec![0.0; cols] }),
            training: false,
        };
        for _ in 0..WARMUP_ITERATIONS {
            sn.power_iteration();
        }
        sn
    }

    pub fn inner(&self) -> &Conv2D {
        &self.inner
    }

    /// Mutable access to the wrapped convolution.
    pub fn inner_mut(&mut self) -> &mut Conv2D {
        &mut self.inner
    }

    fn matrix(&self) -> (&[f64], usize, usize) {
        let w = self.inner.weight.data();
        let rows = self.inner.out_channels;
        (w, rows, if rows == 0 { 0 } else { w.len() / rows })
    }

    /// One step: v ← normalize(Wᵀu), u ← normalize(Wv).
    fn power_iteration(&self) {
        let (w, rows, cols) = self.matrix();
        let mut state = self.state.borrow_mut();

        let mut v = vec![0.0; cols];
        for (r, &ur) in state.u.iter().enumerate() {
            for (c, vc) in v.iter_mut().enumerate() {
                *vc += w[r * cols + c] * ur;
            }
        }
        normalize(&mut v);

        let mut u: Vec<f64> = (0..rows)
            .map(|r| w[r * cols..(r + 1) * cols].iter().zip(&v).map(|(a, b)| a * b).sum())
            .collect();
        normalize(&mut u);

        state.u = u;
        state.v = v;
    }

    /// Current estimate σ = uᵀ W v of the largest singular value.
    pub fn sigma(&self) -> f64 {
        let (w, _, cols) = self.matrix();
        let state = self.state.borrow();
        state
            .u
            .iter()
            .enumerate()
            .map(|(r, &ur)| {
                ur * w[r * cols..(r + 1) * cols]
                    .iter()
                    .zip(&state.v)
                    .map(|(a, b)| a * b)
                    .sum::<f64>()
            })
            .sum()
    }

    /// The weight actually applied: W / σ.
    pub fn normalized_weight(&self) -> Tensor<f64> {
        let sigma = self.sigma().abs().max(EPS);
        self.inner.weight.div_scalar(sigma)
    }
}

impl Layer for SpectralNorm {
    fn name(&self) -> String {
        format!("SpectralNorm({})", self.inner.name())
    }

    fn forward(&self, input: &Tensor<f64>) -> TensorResult<Tensor<f64>> {
        if self.training {
            self.power_iteration();
        }
        self.inner.forward_with(input, &self.normalized_weight())
    }

    fn output_shape(&self, input: &[usize]) -> TensorResult<Vec<usize>> {
        self.inner.output_shape(input)
    }

    fn parameters(&self) -> Vec<&Tensor<f64>> {
        self.inner.parameters()
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(5)
    }

    #[test]
    fn test_rank_one_sigma_is_exact() {
        // W = 6 · [0.6, 0.8]ᵀ is rank one with σ = 6.
        let mut sn = SpectralNorm::new(Conv2D::new(1, 2, 1, 1, 0, &mut rng()), &mut rng());
        sn.inner_mut().weight = Tensor::new(vec![3.6, 4.8], vec![2, 1, 1, 1]).unwrap();
        sn.set_training(true);
        sn.forward(&Tensor::ones(vec![1, 1, 2, 2])).unwrap();
        assert_abs_diff_eq!(sn.sigma().abs(), 6.0, epsilon = 1e-9);

        let w = sn.normalized_weight();
        assert_abs_diff_eq!(w.norm(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_normalized_weight_has_unit_spectral_norm() {
        let sn = SpectralNorm::new(Conv2D::same3x3(4, 8, &mut rng()), &mut rng());
        let w = sn.normalized_weight();
        let check = SpectralNorm::new(
            Conv2D { weight: w.clone(), ..Conv2D::same3x3(4, 8, &mut rng()) },
            &mut rng(),
        );
        let sigma = check.sigma();
        assert_abs_diff_eq!(sigma, 1.0, epsilon = 1e-9);
        // Frobenius norm bounds the largest singular value from above.
        assert!(w.norm() >= sigma - 1e-9);
    }

    #[test]
    fn test_eval_mode_keeps_estimate() {
        let sn = SpectralNorm::new(Conv2D::same3x3(2, 3, &mut rng()), &mut rng());
        let before = sn.sigma();
        let x = Tensor::randn(vec![1, 2, 4, 4], Some(3));
        let out = sn.forward(&x).unwrap();
        assert_eq!(out.shape_vec(), vec![1, 3, 4, 4]);
        assert_eq!(sn.sigma(), before);
        assert!(sn.parameters().len() == 2);
    }
}
