pub mod layer;
pub mod activation;
pub mod conv;
pub mod norm;
pub mod pool;
pub mod dropout;
pub mod spectral;
pub mod linear;
pub mod sequential;
pub mod init;

pub use layer::*;
pub use activation::*;
pub use conv::Conv2D;
pub use norm::*;
pub use pool::*;
pub use dropout::Dropout2D;
pub use spectral::SpectralNorm;
pub use linear::Linear;
pub use sequential::Sequential;
pub use init::{initialize, fan_in_std, DEFAULT_SLOPE};
