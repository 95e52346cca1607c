use oxidize_gan_core::Tensor;
use oxidize_gan_nn::{Layer, Linear, Sequential};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::builder::build_encoder;
use crate::config::{require_positive, ArchConfig, EncoderConfig};
use crate::error::ArchResult;

/// Real/fake critic: spectral-normalized encoder, mean over the latent map,
/// logistic squashing. Produces one score in (0, 1) per sample.
pub struct Discriminator {
    encoder: Sequential,
}

impl Discriminator {
    pub fn new(cfg: &ArchConfig) -> ArchResult<Self> {
        Self::with_rng(cfg, &mut cfg.rng())
    }

    pub fn with_rng<R: Rng + ?Sized>(cfg: &ArchConfig, rng: &mut R) -> ArchResult<Self> {
        let scales = cfg.validate()?;
        let encoder = build_encoder(&cfg.encoder(scales).with_spec_norm(true), rng)?;
        info!(width = cfg.width, scales, "discriminator ready");
        Ok(Discriminator { encoder })
    }

    /// Scores of shape `[batch]`.
    pub fn forward(&self, x: &Tensor<f64>) -> ArchResult<Tensor<f64>> {
        let z = self.encoder.forward(x)?;
        let mean = z.flatten_batch()?.mean_axis(1)?;
        Ok(mean.sigmoid())
    }

    pub fn encoder(&self) -> &Sequential {
        &self.encoder
    }

    pub fn train(&mut self) {
        self.encoder.set_training(true);
    }

    pub fn eval(&mut self) {
        self.encoder.set_training(false);
    }
}

/// Two-class critic: spectral-normalized encoder followed by a linear
/// projection of the flattened latent map and a log-softmax.
pub struct DiscriminatorSoftmax {
    encoder: Sequential,
    fc: Linear,
}

impl DiscriminatorSoftmax {
    pub fn new(
        scales: usize,
        depth: usize,
        latent_dim: usize,
        latent_width: usize,
        channels: usize,
    ) -> ArchResult<Self> {
        Self::with_rng(scales, depth, latent_dim, latent_width, channels, &mut StdRng::from_entropy())
    }

    pub fn with_rng<R: Rng + ?Sized>(
        scales: usize,
        depth: usize,
        latent_dim: usize,
        latent_width: usize,
        channels: usize,
        rng: &mut R,
    ) -> ArchResult<Self> {
        require_positive(latent_width, "latent_width")?;
        let cfg = EncoderConfig::new(scales, depth, latent_dim, channels).with_spec_norm(true);
        let encoder = build_encoder(&cfg, rng)?;
        let features = latent_dim * latent_width * latent_width;
        let fc = Linear::new(features, 2, rng);
        info!(scales, features, "softmax discriminator ready");
        Ok(DiscriminatorSoftmax { encoder, fc })
    }

    /// Same as [`with_rng`](Self::with_rng) with the scale count derived from `cfg`.
    pub fn from_config(cfg: &ArchConfig) -> ArchResult<Self> {
        let scales = cfg.validate()?;
        Self::with_rng(
            scales,
            cfg.depth,
            cfg.latent_dim,
            cfg.latent_width,
            cfg.channels,
            &mut cfg.rng(),
        )
    }

    /// Log-probabilities of shape `[batch, 2]`.
    pub fn forward(&self, x: &Tensor<f64>) -> ArchResult<Tensor<f64>> {
        let z = self.encoder.forward(x)?.flatten_batch()?;
        let logits = self.fc.forward(&z)?;
        Ok(logits.log_softmax()?)
    }

    pub fn encoder(&self) -> &Sequential {
        &self.encoder
    }

    pub fn head(&self) -> &Linear {
        &self.fc
    }

    pub fn train(&mut self) {
        self.encoder.set_training(true);
    }

    pub fn eval(&mut self) {
        self.encoder.set_training(false);
    }
}
