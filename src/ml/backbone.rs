// ============================================================
// Layer 5 — Frame-wise 2D ResNet Backbone
// ============================================================
// A residual CNN applied to every frame of a clip independently.
//
//   video  [b, c, t, h, w]
//     │  transpose time/channel, fold time into batch
//     ▼
//   frames [b*t, c, h, w]
//     │  stem: 7x7/2 conv → BN → ReLU → 3x3/2 max-pool
//     │  stages of basic residual blocks (width doubles, stride 2
//     │  at the start of every stage after the first)
//     ▼
//   feats  [b*t, f, h', w']
//     │  unfold time, move it back behind the channels
//     ▼
//   output [b, f, t, h', w']
//
// The optional classification head (global average pool →
// dropout → linear) turns the same features into per-frame
// logits. The MIL model never uses it and may delete it.
//
// Reference: He et al. (2016) Deep Residual Learning
//            Burn Book §3 (Building Blocks)

use anyhow::{ensure, Context, Result};
use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig,
        Dropout, DropoutConfig,
        Linear, LinearConfig,
        PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::relu,
};

#[derive(Config, Debug)]
pub struct ResNet2dConfig {
    /// Channels of the first stage; stage `i` has `base_width * 2^i`
    #[config(default = 64)]
    pub base_width:  usize,
    /// Residual blocks per stage, ResNet-18 layout by default
    #[config(default = "vec![2, 2, 2, 2]")]
    pub blocks:      Vec<usize>,
    /// Classes of the per-frame classification head
    #[config(default = 2)]
    pub num_classes: usize,
    #[config(default = 0.5)]
    pub dropout:     f64,
}

impl ResNet2dConfig {
    pub fn init<B: Backend>(
        &self,
        in_channels: usize,
        with_logits: bool,
        device:      &B::Device,
    ) -> Result<ResNet2d<B>> {
        ensure!(in_channels > 0, "Backbone needs at least one input channel");
        ensure!(self.base_width > 0, "Backbone base_width must be positive");
        ensure!(!self.blocks.is_empty(), "Backbone needs at least one stage");
        ensure!(
            self.blocks.iter().all(|&n| n > 0),
            "Every backbone stage needs at least one block, got {:?}",
            self.blocks
        );

        let stem_conv = Conv2dConfig::new([in_channels, self.base_width], [7, 7])
            .with_stride([2, 2])
            .with_padding(PaddingConfig2d::Explicit(3, 3))
            .with_bias(false)
            .init(device);
        let stem_bn   = BatchNormConfig::new(self.base_width).init(device);
        let stem_pool = MaxPool2dConfig::new([3, 3])
            .with_strides([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init();

        let mut blocks   = Vec::new();
        let mut channels = self.base_width;
        for (stage, &count) in self.blocks.iter().enumerate() {
            let width  = self.base_width << stage;
            let stride = if stage == 0 { 1 } else { 2 };
            for i in 0..count {
                let s = if i == 0 { stride } else { 1 };
                blocks.push(BasicBlock::new(channels, width, s, device));
                channels = width;
            }
        }

        let head = with_logits.then(|| FrameHead::new(channels, self.num_classes, self.dropout, device));

        Ok(ResNet2d {
            stem_conv,
            stem_bn,
            stem_pool,
            blocks,
            head,
            feature_channels: channels,
        })
    }

    /// Channels produced by the last stage.
    pub fn feature_channels(&self) -> usize {
        self.base_width << self.blocks.len().saturating_sub(1)
    }

    /// Spatial size of the feature map for an `h x w` frame.
    ///
    /// Fails when the frame is too small to survive the stem and the
    /// strided stages.
    pub fn output_spatial(&self, height: usize, width: usize) -> Result<(usize, usize)> {
        let strided_stages = self.blocks.len().saturating_sub(1);
        let side = |n: usize, axis: &str| -> Result<usize> {
            let mut n = conv_out(n, 7, 2, 3).with_context(|| too_small(axis, n))?;
            n = conv_out(n, 3, 2, 1).with_context(|| too_small(axis, n))?;
            for _ in 0..strided_stages {
                n = conv_out(n, 3, 2, 1).with_context(|| too_small(axis, n))?;
            }
            Ok(n)
        };
        Ok((side(height, "height")?, side(width, "width")?))
    }
}

fn conv_out(n: usize, kernel: usize, stride: usize, padding: usize) -> Option<usize> {
    let padded = n + 2 * padding;
    (n > 0 && padded >= kernel).then(|| (padded - kernel) / stride + 1)
}

fn too_small(axis: &str, n: usize) -> String {
    format!("Frame {axis} is too small for the backbone (reached {n} pixels)")
}

// ─── Residual block ───────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct BasicBlock<B: Backend> {
    conv1:      Conv2d<B>,
    bn1:        BatchNorm<B, 2>,
    conv2:      Conv2d<B>,
    bn2:        BatchNorm<B, 2>,
    downsample: Option<Downsample<B>>,
}

#[derive(Module, Debug)]
pub struct Downsample<B: Backend> {
    conv: Conv2d<B>,
    bn:   BatchNorm<B, 2>,
}

impl<B: Backend> BasicBlock<B> {
    fn new(in_channels: usize, out_channels: usize, stride: usize, device: &B::Device) -> Self {
        let conv1 = Conv2dConfig::new([in_channels, out_channels], [3, 3])
            .with_stride([stride, stride])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .with_bias(false)
            .init(device);
        let conv2 = Conv2dConfig::new([out_channels, out_channels], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .with_bias(false)
            .init(device);

        let downsample = (stride != 1 || in_channels != out_channels).then(|| Downsample {
            conv: Conv2dConfig::new([in_channels, out_channels], [1, 1])
                .with_stride([stride, stride])
                .with_bias(false)
                .init(device),
            bn:   BatchNormConfig::new(out_channels).init(device),
        });

        Self {
            conv1,
            bn1: BatchNormConfig::new(out_channels).init(device),
            conv2,
            bn2: BatchNormConfig::new(out_channels).init(device),
            downsample,
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let identity = match &self.downsample {
            Some(ds) => ds.bn.forward(ds.conv.forward(x.clone())),
            None     => x.clone(),
        };
        let out = relu(self.bn1.forward(self.conv1.forward(x)));
        let out = self.bn2.forward(self.conv2.forward(out));
        relu(out + identity)
    }
}

// ─── Per-frame classification head ────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct FrameHead<B: Backend> {
    pool:    AdaptiveAvgPool2d,
    dropout: Dropout,
    fc:      Linear<B>,
}

impl<B: Backend> FrameHead<B> {
    fn new(in_features: usize, num_classes: usize, dropout: f64, device: &B::Device) -> Self {
        Self {
            pool:    AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            dropout: DropoutConfig::new(dropout).init(),
            fc:      LinearConfig::new(in_features, num_classes).init(device),
        }
    }

    /// feats: [n, f, h, w] → logits: [n, num_classes]
    pub fn forward(&self, feats: Tensor<B, 4>) -> Tensor<B, 2> {
        let [n, f, _, _] = feats.dims();
        let pooled = self.pool.forward(feats).reshape([n, f]);
        self.fc.forward(self.dropout.forward(pooled))
    }
}

// ─── Backbone ─────────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct ResNet2d<B: Backend> {
    stem_conv:        Conv2d<B>,
    stem_bn:          BatchNorm<B, 2>,
    stem_pool:        MaxPool2d,
    blocks:           Vec<BasicBlock<B>>,
    head:             Option<FrameHead<B>>,
    feature_channels: usize,
}

impl<B: Backend> ResNet2d<B> {
    /// frames: [n, c, h, w] → features: [n, f, h', w']
    pub fn forward_frames(&self, frames: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = relu(self.stem_bn.forward(self.stem_conv.forward(frames)));
        let mut x = self.stem_pool.forward(x);
        for block in &self.blocks {
            x = block.forward(x);
        }
        x
    }

    /// video: [b, c, t, h, w] → features: [b, f, t, h', w']
    pub fn forward_features(&self, video: Tensor<B, 5>) -> Tensor<B, 5> {
        let [b, c, t, h, w] = video.dims();
        let frames = video.swap_dims(1, 2).reshape([b * t, c, h, w]);

        let feats = self.forward_frames(frames);
        let [_, f, fh, fw] = feats.dims();
        feats.reshape([b, t, f, fh, fw]).swap_dims(1, 2)
    }

    /// video: [b, c, t, h, w] → per-frame logits: [b, t, num_classes]
    pub fn forward(&self, video: Tensor<B, 5>) -> Result<Tensor<B, 3>> {
        let head = self
            .head
            .as_ref()
            .context("Backbone classification head has been deleted")?;

        let [b, c, t, h, w] = video.dims();
        let frames = video.swap_dims(1, 2).reshape([b * t, c, h, w]);
        let logits = head.forward(self.forward_frames(frames));
        let [_, k] = logits.dims();
        Ok(logits.reshape([b, t, k]))
    }

    /// Swap the classification head for one with `num_classes` outputs.
    /// Does nothing when the head has been deleted.
    pub fn replace_logits(mut self, num_classes: usize, device: &B::Device) -> Self {
        if let Some(head) = self.head.take() {
            let dropout = head.dropout.prob;
            self.head = Some(FrameHead::new(self.feature_channels, num_classes, dropout, device));
        }
        self
    }

    pub fn delete_logits(mut self) -> Self {
        self.head = None;
        self
    }

    pub fn has_logits(&self) -> bool {
        self.head.is_some()
    }

    pub fn feature_channels(&self) -> usize {
        self.feature_channels
    }
}
