use std::fs;
use std::path::Path;

use oxidize_gan_nn::{Activation, Norm, DEFAULT_SLOPE};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{ArchError, ArchResult};

/// Stem padding reproducing the historical 1×1-conv-with-padding-1 stem,
/// which grows each spatial side by 2 before the first pooling.
pub const LEGACY_STEM_PADDING: usize = 1;

pub(crate) fn require_positive(value: usize, name: &'static str) -> ArchResult<()> {
    if value == 0 {
        return Err(ArchError::ZeroParameter { name });
    }
    Ok(())
}

/// Number of 2× resolution steps between `width` and `latent_width`.
///
/// `width` must be `latent_width` times a power of two.
pub fn scale_count(width: usize, latent_width: usize) -> ArchResult<usize> {
    require_positive(width, "width")?;
    require_positive(latent_width, "latent_width")?;
    if width % latent_width != 0 {
        return Err(ArchError::NotDivisible { width, latent_width });
    }
    let ratio = width / latent_width;
    if !ratio.is_power_of_two() {
        return Err(ArchError::NotPowerOfTwo { width, latent_width });
    }
    Ok(ratio.trailing_zeros() as usize)
}

/// Channel width `depth · 2^scale` of a pyramid level.
pub(crate) fn channels_at(depth: usize, scale: usize) -> ArchResult<usize> {
    u32::try_from(scale)
        .ok()
        .and_then(|s| 1usize.checked_shl(s))
        .and_then(|factor| depth.checked_mul(factor))
        .ok_or(ArchError::ChannelOverflow { depth, scale })
}

/// Hyperparameters shared by the composite networks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchConfig {
    /// Input image side length.
    pub width: usize,
    /// Side length of the latent map.
    pub latent_width: usize,
    /// Image channels (3 for RGB).
    pub channels: usize,
    /// Channel width of the first pyramid level.
    pub depth: usize,
    /// Channels of the latent map.
    pub latent_dim: usize,
    /// Seed for weight initialization; `None` draws from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl ArchConfig {
    pub fn new(width: usize, latent_width: usize, channels: usize, depth: usize, latent_dim: usize) -> Self {
        ArchConfig {
            width,
            latent_width,
            channels,
            depth,
            latent_dim,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check every field and return the derived scale count.
    pub fn validate(&self) -> ArchResult<usize> {
        require_positive(self.channels, "channels")?;
        require_positive(self.depth, "depth")?;
        require_positive(self.latent_dim, "latent_dim")?;
        let scales = scale_count(self.width, self.latent_width)?;
        channels_at(self.depth, scales)?;
        Ok(scales)
    }

    pub fn scales(&self) -> ArchResult<usize> {
        self.validate()
    }

    /// Generator seeded from `seed`, or from entropy.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        }
    }

    pub fn from_json_str(json: &str) -> ArchResult<Self> {
        let cfg: ArchConfig = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ArchResult<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub(crate) fn encoder(&self, scales: usize) -> EncoderConfig {
        EncoderConfig::new(scales, self.depth, self.latent_dim, self.channels)
    }

    pub(crate) fn decoder(&self, scales: usize) -> DecoderConfig {
        DecoderConfig::new(scales, self.depth, self.latent_dim, self.channels)
    }
}

/// Inputs of [`build_encoder`](crate::build_encoder).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderConfig {
    pub scales: usize,
    pub depth: usize,
    pub latent_dim: usize,
    /// Channels of the input image.
    pub channels: usize,
    pub instance_norm: bool,
    pub spec_norm: bool,
    /// Channel-wise dropout probability applied to the latent map.
    pub dropout: Option<f64>,
    /// Padding of the 1×1 stem convolution.
    pub stem_padding: usize,
    pub activation: Activation,
    pub norm: Norm,
    /// Slope passed to the weight initializer.
    pub init_slope: f64,
}

impl EncoderConfig {
    pub fn new(scales: usize, depth: usize, latent_dim: usize, channels: usize) -> Self {
        EncoderConfig {
            scales,
            depth,
            latent_dim,
            channels,
            instance_norm: false,
            spec_norm: false,
            dropout: None,
            stem_padding: 0,
            activation: Activation::default(),
            norm: Norm::default(),
            init_slope: DEFAULT_SLOPE,
        }
    }

    pub fn with_instance_norm(mut self, on: bool) -> Self {
        self.instance_norm = on;
        self
    }

    pub fn with_spec_norm(mut self, on: bool) -> Self {
        self.spec_norm = on;
        self
    }

    pub fn with_dropout(mut self, p: Option<f64>) -> Self {
        self.dropout = p;
        self
    }

    pub fn with_stem_padding(mut self, padding: usize) -> Self {
        self.stem_padding = padding;
        self
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    pub fn with_norm(mut self, norm: Norm) -> Self {
        self.norm = norm;
        self
    }

    pub fn validate(&self) -> ArchResult<()> {
        require_positive(self.depth, "depth")?;
        require_positive(self.latent_dim, "latent_dim")?;
        require_positive(self.channels, "channels")?;
        if let Some(p) = self.dropout {
            if !(0.0..1.0).contains(&p) {
                return Err(ArchError::InvalidDropout(p));
            }
        }
        channels_at(self.depth, self.scales)?;
        Ok(())
    }
}

/// Inputs of [`build_decoder`](crate::build_decoder).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoderConfig {
    pub scales: usize,
    pub depth: usize,
    pub latent_dim: usize,
    /// Channels of the reconstructed image.
    pub channels: usize,
    pub instance_norm: bool,
    pub activation: Activation,
    pub norm: Norm,
    pub init_slope: f64,
}

impl DecoderConfig {
    pub fn new(scales: usize, depth: usize, latent_dim: usize, channels: usize) -> Self {
        DecoderConfig {
            scales,
            depth,
            latent_dim,
            channels,
            instance_norm: false,
            activation: Activation::default(),
            norm: Norm::default(),
            init_slope: DEFAULT_SLOPE,
        }
    }

    pub fn with_instance_norm(mut self, on: bool) -> Self {
        self.instance_norm = on;
        self
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    pub fn with_norm(mut self, norm: Norm) -> Self {
        self.norm = norm;
        self
    }

    pub fn validate(&self) -> ArchResult<()> {
        require_positive(self.depth, "depth")?;
        require_positive(self.latent_dim, "latent_dim")?;
        require_positive(self.channels, "channels")?;
        if self.scales > 0 {
            channels_at(self.depth, self.scales - 1)?;
        }
        Ok(())
    }
}
