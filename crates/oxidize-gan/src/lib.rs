//! # OxidizeGAN
//!
//! Network architectures for an image-to-image generative model, evaluated
//! on a small CPU tensor engine.
//!
//! ## Modules
//!
//! - **core**: `Tensor<T>` with broadcasting, reductions, matmul and softmax
//! - **nn**: `Layer` trait, Conv2D, InstanceNorm2D, SpectralNorm, pooling, dropout, `Sequential`, weight init
//! - **arch**: encoder/decoder builders, `EncoderDecoder`, `Discriminator`, `DiscriminatorSoftmax`

/// Core tensor engine.
pub use oxidize_gan_core as core;

/// Neural network layers.
pub use oxidize_gan_nn as nn;

/// Composite architectures.
pub use oxidize_gan_arch as arch;

/// The types most callers need.
pub mod prelude {
    pub use oxidize_gan_arch::{
        build_decoder, build_encoder, ArchConfig, ArchError, ArchResult, DecoderConfig,
        Discriminator, DiscriminatorSoftmax, EncoderConfig, EncoderDecoder,
    };
    pub use oxidize_gan_core::{Tensor, TensorError};
    pub use oxidize_gan_nn::{Activation, Layer, Norm, Sequential};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_reference_configuration_end_to_end() {
        let cfg = ArchConfig::new(32, 4, 3, 4, 8).with_seed(11);
        let x = Tensor::randn(vec![2, 3, 32, 32], Some(12));

        let ae = EncoderDecoder::new(&cfg).unwrap();
        let z = ae.encode(&x).unwrap();
        assert_eq!(z.shape_vec(), vec![2, 8, 4, 4]);
        assert_eq!(ae.decode(&z).unwrap().shape_vec(), vec![2, 3, 32, 32]);

        let d = Discriminator::new(&cfg).unwrap();
        let scores = d.forward(&x).unwrap();
        assert_eq!(scores.shape_vec(), vec![2]);
        assert!(scores.data().iter().all(|&s| s > 0.0 && s < 1.0));

        let ds = DiscriminatorSoftmax::from_config(&cfg).unwrap();
        let logp = ds.forward(&x).unwrap();
        assert_eq!(logp.shape_vec(), vec![2, 2]);
        for row in logp.data().chunks(2) {
            assert_abs_diff_eq!(row.iter().map(|v| v.exp()).sum::<f64>(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_reference_autoencoder_round_trip() {
        let cfg = ArchConfig::new(64, 8, 3, 16, 32).with_seed(0);
        let ae = EncoderDecoder::new(&cfg).unwrap();
        assert_eq!(ae.scales(), 3);
        let x = Tensor::randn(vec![1, 3, 64, 64], Some(1));
        assert_eq!(ae.encode(&x).unwrap().shape_vec(), vec![1, 32, 8, 8]);
        assert_eq!(ae.forward(&x).unwrap().shape_vec(), vec![1, 3, 64, 64]);
    }

    #[test]
    fn test_custom_stack_through_prelude() {
        let mut rng = StdRng::seed_from_u64(3);
        let cfg = EncoderConfig::new(1, 4, 2, 1)
            .with_activation(Activation::Relu)
            .with_instance_norm(true);
        let enc = build_encoder(&cfg, &mut rng).unwrap();
        let dec = build_decoder(&DecoderConfig::new(1, 4, 2, 1), &mut rng).unwrap();
        assert_eq!(enc.layers()[3].name(), "ReLU");
        let y = dec.forward(&enc.forward(&Tensor::ones(vec![1, 1, 8, 8])).unwrap()).unwrap();
        assert_eq!(y.shape_vec(), vec![1, 1, 8, 8]);
    }
}
