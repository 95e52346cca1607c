use oxidize_gan_core::{Shape, Tensor, TensorError, TensorResult};

use crate::layer::Layer;

/// Average Pooling 2D with stride equal to the window; trailing rows/cols are dropped.
pub struct AvgPool2D {
    pub kernel_size: usize,
}

impl AvgPool2D {
    pub fn new(kernel_size: usize) -> Self {
        AvgPool2D { kernel_size: kernel_size.max(1) }
    }

    fn out_dims(&self, h: usize, w: usize) -> TensorResult<(usize, usize)> {
        let k = self.kernel_size;
        if h < k || w < k {
            return Err(TensorError::InvalidOperation(format!(
                "AvgPool2D({}): input {}x{} is smaller than the window",
                k, h, w
            )));
        }
        Ok((h / k, w / k))
    }
}

impl Layer for AvgPool2D {
    fn name(&self) -> String {
        format!("AvgPool2D({})", self.kernel_size)
    }

    fn forward(&self, input: &Tensor<f64>) -> TensorResult<Tensor<f64>> {
        let [batch, channels, h, w] = input.nchw()?;
        let (out_h, out_w) = self.out_dims(h, w)?;
        let k = self.kernel_size;
        let area = (k * k) as f64;
        let x = input.data();

        let mut output = vec![0.0f64; batch * channels * out_h * out_w];
        for (p, out) in output.chunks_mut(out_h * out_w).enumerate() {
            let src = &x[p * h * w..(p + 1) * h * w];
            for oh in 0..out_h {
                for ow in 0..out_w {
                    let mut sum = 0.0;
                    for kh in 0..k {
                        for kw in 0..k {
                            sum += src[(oh * k + kh) * w + ow * k + kw];
                        }
                    }
                    out[oh * out_w + ow] = sum / area;
                }
            }
        }

        Tensor::new(output, vec![batch, channels, out_h, out_w])
    }

    fn output_shape(&self, input: &[usize]) -> TensorResult<Vec<usize>> {
        let [b, c, h, w] = Shape::from(input).nchw()?;
        let (out_h, out_w) = self.out_dims(h, w)?;
        Ok(vec![b, c, out_h, out_w])
    }

    fn parameters(&self) -> Vec<&Tensor<f64>> { vec![] }
}

/// Nearest-neighbour upsampling by an integer factor.
pub struct Upsample2D {
    pub scale_factor: usize,
}

impl Upsample2D {
    pub fn new(scale_factor: usize) -> Self {
        Upsample2D { scale_factor: scale_factor.max(1) }
    }
}

impl Layer for Upsample2D {
    fn name(&self) -> String {
        format!("Upsample2D(x{})", self.scale_factor)
    }

    fn forward(&self, input: &Tensor<f64>) -> TensorResult<Tensor<f64>> {
        let [batch, channels, h, w] = input.nchw()?;
        let f = self.scale_factor;
        let (out_h, out_w) = (h * f, w * f);
        let x = input.data();

        let mut output = vec![0.0f64; batch * channels * out_h * out_w];
        for (p, out) in output.chunks_mut(out_h * out_w).enumerate() {
            let src = &x[p * h * w..(p + 1) * h * w];
            for oh in 0..out_h {
                for ow in 0..out_w {
                    out[oh * out_w + ow] = src[(oh / f) * w + ow / f];
                }
            }
        }

        Tensor::new(output, vec![batch, channels, out_h, out_w])
    }

    fn output_shape(&self, input: &[usize]) -> TensorResult<Vec<usize>> {
        let [b, c, h, w] = Shape::from(input).nchw()?;
        Ok(vec![b, c, h * self.scale_factor, w * self.scale_factor])
    }

    fn parameters(&self) -> Vec<&Tensor<f64>> { vec![] }
}
