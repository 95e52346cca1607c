use oxidize_gan_nn::{
    initialize, Activation, AvgPool2D, Conv2D, Dropout2D, Layer, Norm, Sequential, SpectralNorm,
    Upsample2D,
};
use rand::Rng;
use tracing::{debug, warn};

use crate::config::{channels_at, DecoderConfig, EncoderConfig};
use crate::error::ArchResult;

/// Hidden block: 3×3 conv (optionally spectral-normalized), optional norm, activation.
fn push_block<R: Rng + ?Sized>(
    layers: &mut Sequential,
    in_ch: usize,
    out_ch: usize,
    spec_norm: bool,
    norm: Option<Norm>,
    activation: Activation,
    rng: &mut R,
) {
    push_conv3x3(layers, in_ch, out_ch, spec_norm, rng);
    if let Some(norm) = norm {
        layers.push(norm.build(out_ch));
    }
    layers.push(activation.build());
}

fn push_conv3x3<R: Rng + ?Sized>(
    layers: &mut Sequential,
    in_ch: usize,
    out_ch: usize,
    spec_norm: bool,
    rng: &mut R,
) {
    let conv = Conv2D::same3x3(in_ch, out_ch, rng);
    let layer: Box<dyn Layer> = if spec_norm {
        Box::new(SpectralNorm::new(conv, rng))
    } else {
        Box::new(conv)
    };
    layers.push(layer);
}

/// Assemble the downsampling half of the pyramid.
///
/// Maps `[b, channels, H, W]` to `[b, latent_dim, H / 2^scales, W / 2^scales]`
/// (with the default unpadded stem). Weights are initialized before returning.
pub fn build_encoder<R: Rng + ?Sized>(cfg: &EncoderConfig, rng: &mut R) -> ArchResult<Sequential> {
    cfg.validate()?;
    if cfg.stem_padding != 0 {
        warn!(
            padding = cfg.stem_padding,
            "padded 1x1 stem grows the input by {} pixels per side",
            cfg.stem_padding
        );
    }
    let norm = cfg.instance_norm.then_some(cfg.norm);

    let mut layers = Sequential::new();
    layers.push(Box::new(Conv2D::new(cfg.channels, cfg.depth, 1, 1, cfg.stem_padding, rng)));

    let mut kp = cfg.depth;
    let mut widths = Vec::with_capacity(cfg.scales + 1);
    for scale in 0..cfg.scales {
        let k = channels_at(cfg.depth, scale)?;
        push_block(&mut layers, kp, k, cfg.spec_norm, norm, cfg.activation, rng);
        push_block(&mut layers, k, k, cfg.spec_norm, norm, cfg.activation, rng);
        layers.push(Box::new(AvgPool2D::new(2)));
        widths.push(k);
        kp = k;
    }
    let k = channels_at(cfg.depth, cfg.scales)?;
    push_block(&mut layers, kp, k, cfg.spec_norm, norm, cfg.activation, rng);
    push_conv3x3(&mut layers, k, cfg.latent_dim, cfg.spec_norm, rng);
    widths.push(k);

    if let Some(p) = cfg.dropout {
        layers.push(Box::new(Dropout2D::new(p, Some(rng.gen()))));
    }

    initialize(layers.layers_mut(), cfg.init_slope, rng);
    debug!(
        scales = cfg.scales,
        layers = layers.len(),
        widths = ?widths,
        latent_dim = cfg.latent_dim,
        spec_norm = cfg.spec_norm,
        instance_norm = cfg.instance_norm,
        "built encoder"
    );
    Ok(layers)
}

/// Assemble the upsampling half of the pyramid, the spatial inverse of
/// [`build_encoder`]. Weights are initialized before returning.
pub fn build_decoder<R: Rng + ?Sized>(cfg: &DecoderConfig, rng: &mut R) -> ArchResult<Sequential> {
    cfg.validate()?;
    let norm = cfg.instance_norm.then_some(cfg.norm);

    let mut layers = Sequential::new();
    let mut kp = cfg.latent_dim;
    let mut widths = Vec::with_capacity(cfg.scales + 1);
    for scale in (0..cfg.scales).rev() {
        let k = channels_at(cfg.depth, scale)?;
        push_block(&mut layers, kp, k, false, norm, cfg.activation, rng);
        push_block(&mut layers, k, k, false, norm, cfg.activation, rng);
        layers.push(Box::new(Upsample2D::new(2)));
        widths.push(k);
        kp = k;
    }
    push_block(&mut layers, kp, cfg.depth, false, norm, cfg.activation, rng);
    push_conv3x3(&mut layers, cfg.depth, cfg.channels, false, rng);
    widths.push(cfg.depth);

    initialize(layers.layers_mut(), cfg.init_slope, rng);
    debug!(
        scales = cfg.scales,
        layers = layers.len(),
        widths = ?widths,
        channels = cfg.channels,
        instance_norm = cfg.instance_norm,
        "built decoder"
    );
    Ok(layers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LEGACY_STEM_PADDING;
    use crate::error::ArchError;
    use oxidize_gan_core::Tensor;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(17)
    }

    fn names(seq: &Sequential) -> Vec<String> {
        seq.layers().iter().map(|l| l.name()).collect()
    }

    #[test]
    fn test_encoder_layout_plain() {
        let enc = build_encoder(&EncoderConfig::new(2, 4, 6, 3), &mut rng()).unwrap();
        assert_eq!(
            names(&enc),
            vec![
                "Conv2D(3→4, k=1, p=0)",
                "Conv2D(4→4, k=3, p=1)",
                "LeakyReLU(0.01)",
                "Conv2D(4→4, k=3, p=1)",
                "LeakyReLU(0.01)",
                "AvgPool2D(2)",
                "Conv2D(4→8, k=3, p=1)",
                "LeakyReLU(0.01)",
                "Conv2D(8→8, k=3, p=1)",
                "LeakyReLU(0.01)",
                "AvgPool2D(2)",
                "Conv2D(8→16, k=3, p=1)",
                "LeakyReLU(0.01)",
                "Conv2D(16→6, k=3, p=1)",
            ]
        );
    }

    #[test]
    fn test_encoder_layout_with_norms_and_dropout() {
        let cfg = EncoderConfig::new(1, 4, 2, 1)
            .with_instance_norm(true)
            .with_spec_norm(true)
            .with_dropout(Some(0.25));
        let enc = build_encoder(&cfg, &mut rng()).unwrap();
        let names = names(&enc);
        assert_eq!(names.len(), 1 + 7 + 3 + 1 + 1);
        assert_eq!(names[0], "Conv2D(1→4, k=1, p=0)");
        assert_eq!(names[1], "SpectralNorm(Conv2D(4→4, k=3, p=1))");
        assert_eq!(names[2], "InstanceNorm2D(4)");
        assert_eq!(names[7], "AvgPool2D(2)");
        assert_eq!(names[8], "SpectralNorm(Conv2D(4→8, k=3, p=1))");
        assert_eq!(names[11], "SpectralNorm(Conv2D(8→2, k=3, p=1))");
        assert_eq!(names[12], "Dropout2D(0.25)");
    }

    #[test]
    fn test_decoder_layout() {
        let dec = build_decoder(&DecoderConfig::new(2, 4, 6, 3).with_instance_norm(true), &mut rng()).unwrap();
        let names = names(&dec);
        assert_eq!(names[0], "Conv2D(6→8, k=3, p=1)");
        assert_eq!(names[1], "InstanceNorm2D(8)");
        assert_eq!(names[6], "Upsample2D(x2)");
        assert_eq!(names[7], "Conv2D(8→4, k=3, p=1)");
        assert_eq!(names[13], "Upsample2D(x2)");
        assert_eq!(names[14], "Conv2D(4→4, k=3, p=1)");
        assert_eq!(names.last().unwrap(), "Conv2D(4→3, k=3, p=1)");
        assert_eq!(names.len(), 2 * 7 + 3 + 1);
    }

    #[test]
    fn test_encoder_decoder_shapes_invert() {
        for (width, scales) in [(8, 0), (8, 1), (16, 2), (32, 3)] {
            let enc = build_encoder(&EncoderConfig::new(scales, 2, 5, 3), &mut rng()).unwrap();
            let dec = build_decoder(&DecoderConfig::new(scales, 2, 5, 3), &mut rng()).unwrap();
            let latent = enc.output_shape(&[1, 3, width, width]).unwrap();
            assert_eq!(latent, vec![1, 5, width >> scales, width >> scales]);
            assert_eq!(dec.output_shape(&latent).unwrap(), vec![1, 3, width, width]);
        }
    }

    #[test]
    fn test_encoder_forward_shape() {
        let enc = build_encoder(&EncoderConfig::new(2, 2, 3, 1).with_instance_norm(true), &mut rng()).unwrap();
        let x = Tensor::randn(vec![2, 1, 12, 8], Some(4));
        let z = enc.forward(&x).unwrap();
        assert_eq!(z.shape_vec(), vec![2, 3, 3, 2]);
    }

    #[test]
    fn test_legacy_stem_widens_input() {
        let cfg = EncoderConfig::new(3, 2, 4, 3).with_stem_padding(LEGACY_STEM_PADDING);
        let enc = build_encoder(&cfg, &mut rng()).unwrap();
        // 64 → 66 → 33 → 16 → 8
        assert_eq!(enc.output_shape(&[1, 3, 64, 64]).unwrap(), vec![1, 4, 8, 8]);
        // A single scale no longer halves cleanly: 8 → 10 → 5.
        let one = build_encoder(&EncoderConfig::new(1, 2, 4, 3).with_stem_padding(LEGACY_STEM_PADDING), &mut rng()).unwrap();
        assert_eq!(one.output_shape(&[1, 3, 8, 8]).unwrap(), vec![1, 4, 5, 5]);
    }

    #[test]
    fn test_builders_initialize_biases() {
        let enc = build_encoder(&EncoderConfig::new(1, 4, 2, 3).with_instance_norm(true), &mut rng()).unwrap();
        // Every layer here is plain conv or affine norm, so every bias is zeroed.
        for params in enc.layers().iter().map(|l| l.parameters()) {
            if let Some(bias) = params.get(1) {
                assert!(bias.data().iter().all(|&b| b == 0.0));
            }
        }
    }

    #[test]
    fn test_invalid_configs() {
        assert!(matches!(
            build_encoder(&EncoderConfig::new(2, 0, 4, 3), &mut rng()),
            Err(ArchError::ZeroParameter { name: "depth" })
        ));
        assert!(matches!(
            build_encoder(&EncoderConfig::new(2, 4, 0, 3), &mut rng()),
            Err(ArchError::ZeroParameter { name: "latent_dim" })
        ));
        assert!(matches!(
            build_decoder(&DecoderConfig::new(2, 4, 4, 0), &mut rng()),
            Err(ArchError::ZeroParameter { name: "channels" })
        ));
        assert!(matches!(
            build_encoder(&EncoderConfig::new(80, 4, 4, 3), &mut rng()),
            Err(ArchError::ChannelOverflow { .. })
        ));
    }
}
