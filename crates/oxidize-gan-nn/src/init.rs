//! Fan-in scaled normal initialization.
//!
//! Every layer exposing a [`Trainable`](crate::Trainable) gets its weight
//! redrawn from N(0, std²) with
//! `std = 1 / √((1 + slope²) · prod(weight.shape[..last]))`
//! and its bias zeroed. Other layers are left alone.

use oxidize_gan_core::{Shape, Tensor};
use rand::Rng;
use tracing::{debug, trace};

use crate::layer::Layer;

/// Leak slope assumed by the initializer.
pub const DEFAULT_SLOPE: f64 = 0.2;

/// Standard deviation used for a weight of the given shape.
pub fn fan_in_std(weight_shape: &Shape, slope: f64) -> f64 {
    let fan_in = weight_shape.leading_numel() as f64;
    1.0 / ((1.0 + slope * slope) * fan_in).sqrt()
}

/// Re-initialize every trainable layer in `layers` in place.
pub fn initialize<R: Rng + ?Sized>(layers: &mut [Box<dyn Layer>], slope: f64, rng: &mut R) {
    let mut touched = 0;
    for layer in layers.iter_mut() {
        let name = layer.name();
        let Some(params) = layer.trainable() else {
            continue;
        };
        let std_dev = fan_in_std(params.weight.shape(), slope);
        let sample = Tensor::randn_with(params.weight.shape_vec(), rng).mul_scalar(std_dev);
        *params.weight = sample;
        if let Some(bias) = params.bias {
            bias.fill(0.0);
        }
        trace!(layer = %name, std_dev, "initialized");
        touched += 1;
    }
    debug!(layers = layers.len(), initialized = touched, slope, "weight init done");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Conv2D, Dropout2D, InstanceNorm2D, LeakyReLULayer, SpectralNorm};
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_fan_in_std() {
        // Conv weight [16, 8, 3, 3]: fan-in 16 * 8 * 3.
        let std = fan_in_std(&Shape::new(vec![16, 8, 3, 3]), 0.2);
        assert_abs_diff_eq!(std, 1.0 / (1.04f64 * 384.0).sqrt(), epsilon = 1e-15);
        // 1-D weights have an empty prefix.
        assert_abs_diff_eq!(fan_in_std(&Shape::new(vec![8]), 0.2), 1.0 / 1.04f64.sqrt());
    }

    #[test]
    fn test_weights_follow_formula_and_biases_are_zero() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut layers: Vec<Box<dyn Layer>> = vec![
            Box::new(Conv2D::same3x3(32, 64, &mut rng)),
            Box::new(InstanceNorm2D::new(64, true)),
            Box::new(LeakyReLULayer::default()),
        ];
        initialize(&mut layers, DEFAULT_SLOPE, &mut rng);

        let conv = layers[0].parameters();
        let expected = 1.0 / (1.04f64 * (64 * 32 * 3) as f64).sqrt();
        assert_abs_diff_eq!(conv[0].mean_all().unwrap(), 0.0, epsilon = 3e-3);
        let rel = conv[0].std_all().unwrap() / expected;
        assert!((rel - 1.0).abs() < 0.03, "std ratio {}", rel);
        assert!(conv[1].data().iter().all(|&b| b == 0.0));

        let norm = layers[1].parameters();
        assert!(norm[1].data().iter().all(|&b| b == 0.0));
        assert!(norm[0].data().iter().any(|&g| g != 1.0));
    }

    #[test]
    fn test_layers_without_capability_are_untouched() {
        let mut rng = StdRng::seed_from_u64(2);
        let conv = Conv2D::same3x3(2, 2, &mut rng);
        let before = conv.weight.clone();
        let mut layers: Vec<Box<dyn Layer>> = vec![
            Box::new(SpectralNorm::new(conv, &mut rng)),
            Box::new(Dropout2D::new(0.1, Some(0))),
            Box::new(InstanceNorm2D::new(2, false)),
        ];
        initialize(&mut layers, DEFAULT_SLOPE, &mut rng);
        assert_eq!(layers[0].parameters()[0], &before);
    }

    #[test]
    fn test_each_call_resamples() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut layers: Vec<Box<dyn Layer>> = vec![Box::new(Conv2D::same3x3(2, 2, &mut rng))];
        initialize(&mut layers, DEFAULT_SLOPE, &mut rng);
        let first = layers[0].parameters()[0].clone();
        initialize(&mut layers, DEFAULT_SLOPE, &mut rng);
        assert_ne!(layers[0].parameters()[0], &first);
    }
}
