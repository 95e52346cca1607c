use oxidize_gan_core::TensorError;
use thiserror::Error;

/// Errors raised while configuring, building or running an architecture.
#[derive(Debug, Error)]
pub enum ArchError {
    #[error("{name} must be greater than zero")]
    ZeroParameter { name: &'static str },

    #[error("width {width} is not a multiple of latent width {latent_width}")]
    NotDivisible { width: usize, latent_width: usize },

    #[error("width / latent width = {width} / {latent_width} is not a power of two")]
    NotPowerOfTwo { width: usize, latent_width: usize },

    #[error("dropout probability {0} is outside [0, 1)")]
    InvalidDropout(f64),

    #[error("channel width {depth} << {scale} does not fit in usize")]
    ChannelOverflow { depth: usize, scale: usize },

    #[error(transparent)]
    Tensor(#[from] TensorError),

    #[error("could not read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ArchResult<T> = Result<T, ArchError>;
