use oxidize_gan_core::Tensor;
use oxidize_gan_nn::Sequential;
use rand::Rng;
use tracing::info;

use crate::builder::{build_decoder, build_encoder};
use crate::config::ArchConfig;
use crate::error::ArchResult;

/// Convolutional autoencoder: an instance-normalized encoder followed by
/// the mirrored decoder.
pub struct EncoderDecoder {
    encoder: Sequential,
    decoder: Sequential,
    scales: usize,
    latent_width: usize,
    latent_dim: usize,
}

impl EncoderDecoder {
    /// Build from `cfg`, seeding initialization from `cfg.seed`.
    pub fn new(cfg: &ArchConfig) -> ArchResult<Self> {
        Self::with_rng(cfg, &mut cfg.rng())
    }

    pub fn with_rng<R: Rng + ?Sized>(cfg: &ArchConfig, rng: &mut R) -> ArchResult<Self> {
        let scales = cfg.validate()?;
        let encoder = build_encoder(&cfg.encoder(scales).with_instance_norm(true), rng)?;
        let decoder = build_decoder(&cfg.decoder(scales).with_instance_norm(true), rng)?;

        let model = EncoderDecoder {
            encoder,
            decoder,
            scales,
            latent_width: cfg.latent_width,
            latent_dim: cfg.latent_dim,
        };
        info!(
            width = cfg.width,
            latent_width = cfg.latent_width,
            scales,
            parameters = model.parameter_count(),
            "autoencoder ready"
        );
        Ok(model)
    }

    /// Image `[b, C, H, W]` → latent `[b, latent_dim, H / 2^s, W / 2^s]`.
    pub fn encode(&self, x: &Tensor<f64>) -> ArchResult<Tensor<f64>> {
        Ok(self.encoder.forward(x)?)
    }

    /// Latent map → image.
    pub fn decode(&self, z: &Tensor<f64>) -> ArchResult<Tensor<f64>> {
        Ok(self.decoder.forward(z)?)
    }

    /// Reconstruction: `decode(encode(x))`.
    pub fn forward(&self, x: &Tensor<f64>) -> ArchResult<Tensor<f64>> {
        self.decode(&self.encode(x)?)
    }

    /// Latent shape for a batch of `height × width` images.
    pub fn latent_shape(&self, batch: usize, channels: usize, height: usize, width: usize) -> ArchResult<Vec<usize>> {
        Ok(self.encoder.output_shape(&[batch, channels, height, width])?)
    }

    pub fn scales(&self) -> usize {
        self.scales
    }

    pub fn latent_width(&self) -> usize {
        self.latent_width
    }

    pub fn latent_dim(&self) -> usize {
        self.latent_dim
    }

    pub fn encoder(&self) -> &Sequential {
        &self.encoder
    }

    pub fn decoder(&self) -> &Sequential {
        &self.decoder
    }

    pub fn parameter_count(&self) -> usize {
        self.encoder.parameter_count() + self.decoder.parameter_count()
    }

    pub fn train(&mut self) {
        self.encoder.set_training(true);
        self.decoder.set_training(true);
    }

    pub fn eval(&mut self) {
        self.encoder.set_training(false);
        self.decoder.set_training(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ArchError;

    #[test]
    fn test_reference_configuration_shapes() {
        let cfg = ArchConfig::new(64, 8, 3, 16, 32).with_seed(0);
        let model = EncoderDecoder::new(&cfg).unwrap();
        assert_eq!(model.scales(), 3);
        assert_eq!(model.latent_shape(1, 3, 64, 64).unwrap(), vec![1, 32, 8, 8]);
        assert_eq!(model.decoder().output_shape(&[1, 32, 8, 8]).unwrap(), vec![1, 3, 64, 64]);
    }

    #[test]
    fn test_forward_preserves_shape() {
        let cfg = ArchConfig::new(16, 4, 3, 4, 8).with_seed(1);
        let model = EncoderDecoder::new(&cfg).unwrap();
        let x = Tensor::randn(vec![2, 3, 16, 16], Some(2));

        let z = model.encode(&x).unwrap();
        assert_eq!(z.shape_vec(), vec![2, 8, 4, 4]);
        let y = model.forward(&x).unwrap();
        assert_eq!(y.shape_vec(), x.shape_vec());
        assert!(y.data().iter().all(|v| v.is_finite()));
        assert_eq!(model.decode(&z).unwrap(), y);
    }

    #[test]
    fn test_same_seed_same_weights() {
        let cfg = ArchConfig::new(8, 4, 1, 2, 2).with_seed(9);
        let a = EncoderDecoder::new(&cfg).unwrap();
        let b = EncoderDecoder::new(&cfg).unwrap();
        let x = Tensor::randn(vec![1, 1, 8, 8], Some(0));
        assert_eq!(a.forward(&x).unwrap(), b.forward(&x).unwrap());
    }

    #[test]
    fn test_rejects_non_power_of_two_ratio() {
        let err = EncoderDecoder::new(&ArchConfig::new(96, 8, 3, 16, 32)).err().unwrap();
        assert!(matches!(err, ArchError::NotPowerOfTwo { width: 96, latent_width: 8 }));
    }

    #[test]
    fn test_wrong_channel_count_is_a_runtime_error() {
        let model = EncoderDecoder::new(&ArchConfig::new(8, 4, 3, 2, 2).with_seed(3)).unwrap();
        let err = model.forward(&Tensor::ones(vec![1, 1, 8, 8])).unwrap_err();
        assert!(matches!(err, ArchError::Tensor(_)));
    }
}
