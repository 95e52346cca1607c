use oxidize_gan_core::{Tensor, TensorError, TensorResult};
use rand::Rng;
use rayon::prelude::*;

use crate::layer::{Layer, Trainable};

/// 2D Convolution layer with square kernels and zero padding.
///
/// Input shape:  [batch, in_channels, height, width]
/// Output shape: [batch, out_channels, out_h, out_w]
/// where out_h = (height + 2 * padding - kernel_size) / stride + 1
pub struct Conv2D {
    pub in_channels: usize,
    pub out_channels: usize,
    pub kernel_size: usize,
    pub stride: usize,
    pub padding: usize,
    pub weight: Tensor<f64>, // [out_channels, in_channels, kH, kW]
    pub bias: Tensor<f64>,   // [out_channels]
}

impl Conv2D {
    /// Create a convolution with weight and bias drawn from U(-1/√fan_in, 1/√fan_in).
    pub fn new<R: Rng + ?Sized>(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        stride: usize,
        padding: usize,
        rng: &mut R,
    ) -> Self {
        let fan_in = (in_channels * kernel_size * kernel_size).max(1);
        let bound = 1.0 / (fan_in as f64).sqrt();
        let weight = Tensor::uniform_with(
            vec![out_channels, in_channels, kernel_size, kernel_size],
            -bound,
            bound,
            rng,
        );
        let bias = Tensor::uniform_with(vec![out_channels], -bound, bound, rng);

        Conv2D {
            in_channels,
            out_channels,
            kernel_size,
            stride: stride.max(1),
            padding,
            weight,
            bias,
        }
    }

    /// 3×3 convolution that keeps the spatial size.
    pub fn same3x3<R: Rng + ?Sized>(in_channels: usize, out_channels: usize, rng: &mut R) -> Self {
        Self::new(in_channels, out_channels, 3, 1, 1, rng)
    }

    fn out_dim(&self, input_dim: usize) -> TensorResult<usize> {
        let padded = input_dim + 2 * self.padding;
        if padded < self.kernel_size {
            return Err(TensorError::InvalidOperation(format!(
                "{}: padded input size {} is smaller than the kernel",
                self.name(),
                padded
            )));
        }
        Ok((padded - self.kernel_size) / self.stride + 1)
    }

    /// Convolve `input` with an explicit weight of this layer's shape.
    ///
    /// Used by wrappers that rescale the weight before applying it.
    pub fn forward_with(&self, input: &Tensor<f64>, weight: &Tensor<f64>) -> TensorResult<Tensor<f64>> {
        let [batch, ic, h, w] = input.nchw()?;
        if ic != self.in_channels {
            return Err(TensorError::ChannelMismatch {
                layer: self.name(),
                expected: self.in_channels,
                got: ic,
            });
        }
        if weight.shape() != self.weight.shape() {
            return Err(TensorError::ShapeMismatch {
                expected: self.weight.shape_vec(),
                got: weight.shape_vec(),
            });
        }
        let out_h = self.out_dim(h)?;
        let out_w = self.out_dim(w)?;
        let plane = out_h * out_w;

        let (k, s, p) = (self.kernel_size, self.stride, self.padding);
        let x = input.data();
        let wt = weight.data();
        let bias = self.bias.data();
        let mut output = vec![0.0f64; batch * self.out_channels * plane];

        // One output plane per (sample, output channel).
        output
            .par_chunks_mut(plane.max(1))
            .enumerate()
            .for_each(|(idx, out)| {
                let (b, oc) = (idx / self.out_channels, idx % self.out_channels);
                out.iter_mut().for_each(|v| *v = bias[oc]);
                for c in 0..ic {
                    let x_plane = &x[(b * ic + c) * h * w..(b * ic + c + 1) * h * w];
                    let w_kernel = &wt[(oc * ic + c) * k * k..(oc * ic + c + 1) * k * k];
                    for kh in 0..k {
                        for kw in 0..k {
                            let wv = w_kernel[kh * k + kw];
                            for oh in 0..out_h {
                                let ih = (oh * s + kh) as isize - p as isize;
                                if ih < 0 || ih >= h as isize {
                                    continue;
                                }
                                let row = &x_plane[ih as usize * w..(ih as usize + 1) * w];
                                for ow in 0..out_w {
                                    let iw = (ow * s + kw) as isize - p as isize;
                                    if iw >= 0 && iw < w as isize {
                                        out[oh * out_w + ow] += wv * row[iw as usize];
                                    }
                                }
                            }
                        }
                    }
                }
            });

        Tensor::new(output, vec![batch, self.out_channels, out_h, out_w])
    }
}

impl Layer for Conv2D {
    fn name(&self) -> String {
        format!(
            "Conv2D({}→{}, k={}, p={})",
            self.in_channels, self.out_channels, self.kernel_size, self.padding
        )
    }

    fn forward(&self, input: &Tensor<f64>) -> TensorResult<Tensor<f64>> {
        self.forward_with(input, &self.weight)
    }

    fn output_shape(&self, input: &[usize]) -> TensorResult<Vec<usize>> {
        let [b, c, h, w] = oxidize_gan_core::Shape::from(input).nchw()?;
        if c != self.in_channels {
            return Err(TensorError::ChannelMismatch {
                layer: self.name(),
                expected: self.in_channels,
                got: c,
            });
        }
        Ok(vec![b, self.out_channels, self.out_dim(h)?, self.out_dim(w)?])
    }

    fn parameters(&self) -> Vec<&Tensor<f64>> {
        vec![&self.weight, &self.bias]
    }

    fn trainable(&mut self) -> Option<Trainable<'_>> {
        Some(Trainable {
            weight: &mut self.weight,
            bias: Some(&mut self.bias),
        })
    }
}
