//! Encoder/decoder stacks and the composite networks built from them.
//!
//! - [`build_encoder`] / [`build_decoder`] assemble multi-resolution conv stacks
//! - [`EncoderDecoder`] pairs them into an autoencoder
//! - [`Discriminator`] scores images with a sigmoid over the mean latent
//! - [`DiscriminatorSoftmax`] projects the latent map to two log-probabilities

pub mod error;
pub mod config;
pub mod builder;
pub mod autoencoder;
pub mod discriminator;

pub use error::{ArchError, ArchResult};
pub use config::{scale_count, ArchConfig, DecoderConfig, EncoderConfig, LEGACY_STEM_PADDING};
pub use builder::{build_decoder, build_encoder};
pub use autoencoder::EncoderDecoder;
pub use discriminator::{Discriminator, DiscriminatorSoftmax};
