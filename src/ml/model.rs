use anyhow::{ensure, Result};
use burn::{
    nn::{
        conv::{Conv1d, Conv1dConfig},
        Dropout, DropoutConfig,
        Lstm, LstmConfig,
    },
    prelude::*,
};

use crate::domain::{clip::ClipShape, trace::ShapeTrace};
use crate::ml::backbone::{ResNet2d, ResNet2dConfig};

// #[derive(Config)] provides new(), the with_* builders, Clone and serde.
#[derive(Config, Debug)]
pub struct MilConfig {
    /// Clip shape used to size the network: `[batch, channel, time, height, width]`.
    /// The batch entry is ignored; the dummy pass always uses a batch of one.
    pub input_size:      Vec<usize>,
    #[config(default = 2)]
    pub num_classes:     usize,
    #[config(default = 3)]
    pub in_channels:     usize,
    /// Drop probability applied to the LSTM output before the logits head
    #[config(default = 0.5)]
    pub dropout:         f64,
    #[config(default = 128)]
    pub lstm_hidden:     usize,
    #[config(default = 1)]
    pub lstm_layers:     usize,
    /// Keep the backbone's own per-frame classification head
    #[config(default = false)]
    pub backbone_logits: bool,
    #[config(default = "ResNet2dConfig::new()")]
    pub backbone:        ResNet2dConfig,
}

impl MilConfig {
    /// Check every hyperparameter that can be checked without tensors.
    pub fn validate(&self) -> Result<ClipShape> {
        let shape = ClipShape::from_dims(&self.input_size)?;
        ensure!(
            shape.channels == self.in_channels,
            "Input size has {} channels but in_channels is {}",
            shape.channels,
            self.in_channels
        );
        ensure!(self.num_classes >= 1, "num_classes must be at least 1");
        ensure!(self.lstm_hidden >= 1, "lstm_hidden must be at least 1");
        ensure!(self.lstm_layers >= 1, "lstm_layers must be at least 1");
        ensure!(
            (0.0..1.0).contains(&self.dropout),
            "dropout must be in [0, 1), got {}",
            self.dropout
        );
        Ok(shape)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<MilModel<B>> {
        self.init_with_trace(device).map(|(model, _)| model)
    }

    /// Build the model, sizing the LSTM and logits head from a dummy
    /// forward pass of zeros, and return the shapes seen on the way.
    pub fn init_with_trace<B: Backend>(
        &self,
        device: &B::Device,
    ) -> Result<(MilModel<B>, ShapeTrace)> {
        tracing::info!("Initialize 2D ResNet + Multiple Instance Learning...");

        let single = self.validate()?.single();
        let (feat_h, feat_w) = self.backbone.output_spatial(single.height, single.width)?;
        let backbone = self.backbone.init::<B>(self.in_channels, self.backbone_logits, device)?;

        // ── Backbone ──────────────────────────────────────────────────────────
        let dummy = Tensor::<B, 5>::zeros(single.dims(), device);
        let feats = backbone.forward_features(dummy);
        let [b, f, t, h, w] = feats.dims();
        let expected = [1, self.backbone.feature_channels(), single.frames, feat_h, feat_w];
        ensure!(
            [b, f, t, h, w] == expected,
            "Backbone produced {:?}, expected {:?}",
            [b, f, t, h, w],
            expected
        );

        // ── Sequence model + logits head ──────────────────────────────────────
        let lstm_input = f * h * w;
        let lstm = (0..self.lstm_layers)
            .map(|i| {
                let d_input = if i == 0 { lstm_input } else { self.lstm_hidden };
                LstmConfig::new(d_input, self.lstm_hidden, true).init(device)
            })
            .collect();
        let dropout = DropoutConfig::new(self.dropout).init();
        let logits  = Conv1dConfig::new(self.lstm_hidden, self.num_classes, 1).init(device);

        let model = MilModel {
            backbone,
            lstm,
            dropout,
            logits,
            logits_in_channels: self.lstm_hidden,
            num_classes:        self.num_classes,
            in_channels:        self.in_channels,
            frame_height:       single.height,
            frame_width:        single.width,
        };

        let seq  = model.to_sequence(feats.clone());
        let temp = model.temporal(seq.clone());
        let out  = model.classify(temp.clone());
        ensure!(
            out.dims() == [1, self.num_classes, single.frames],
            "Logits head produced {:?}, expected {:?}",
            out.dims(),
            [1, self.num_classes, single.frames]
        );

        let trace = ShapeTrace {
            input:       single.dims().to_vec(),
            frames:      vec![single.frame_batch(), single.channels, single.height, single.width],
            backbone:    feats.dims().to_vec(),
            lstm_input:  seq.dims().to_vec(),
            lstm_output: temp.dims().to_vec(),
            logits:      out.dims().to_vec(),
        };
        trace.log();

        Ok((model, trace))
    }
}

/// 2D ResNet features per frame → LSTM over time → per-timestep logits.
#[derive(Module, Debug)]
pub struct MilModel<B: Backend> {
    backbone:           ResNet2d<B>,
    lstm:               Vec<Lstm<B>>,
    dropout:            Dropout,
    logits:             Conv1d<B>,
    logits_in_channels: usize,
    num_classes:        usize,
    in_channels:        usize,
    frame_height:       usize,
    frame_width:        usize,
}

impl<B: Backend> MilModel<B> {
    /// video: [batch, channel, time, height, width] → logits: [batch, num_classes, time]
    pub fn forward(&self, video: Tensor<B, 5>) -> Tensor<B, 3> {
        let feats = self.backbone.forward_features(video);
        let seq   = self.to_sequence(feats);
        self.classify(self.temporal(seq))
    }

    /// Like [`forward`](Self::forward) but rejects clips whose channel or
    /// frame size differs from the one the model was sized for.
    pub fn try_forward(&self, video: Tensor<B, 5>) -> Result<Tensor<B, 3>> {
        self.check_input(video.dims())?;
        Ok(self.forward(video))
    }

    /// Batch and number of frames may vary between calls; channels and
    /// frame size are fixed by the LSTM input width.
    pub fn check_input(&self, dims: [usize; 5]) -> Result<()> {
        let [b, c, t, h, w] = dims;
        ensure!(b > 0 && t > 0, "Clip must have at least one sample and one frame, got {dims:?}");
        ensure!(
            c == self.in_channels,
            "Clip has {c} channels, model expects {}",
            self.in_channels
        );
        ensure!(
            (h, w) == (self.frame_height, self.frame_width),
            "Clip frames are {h}x{w}, model was sized for {}x{}",
            self.frame_height,
            self.frame_width
        );
        Ok(())
    }

    /// [b, f, t, h, w] → [b, t, f*h*w]
    fn to_sequence(&self, feats: Tensor<B, 5>) -> Tensor<B, 3> {
        let [b, f, t, h, w] = feats.dims();
        feats.swap_dims(1, 2).reshape([b, t, f * h * w])
    }

    /// [b, t, d] → [b, hidden, t]
    fn temporal(&self, seq: Tensor<B, 3>) -> Tensor<B, 3> {
        let mut x = seq;
        for layer in &self.lstm {
            let (out, _state) = layer.forward(x, None);
            x = out;
        }
        x.swap_dims(1, 2)
    }

    /// [b, hidden, t] → [b, num_classes, t]
    fn classify(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        self.logits.forward(self.dropout.forward(x))
    }

    /// Swap the logits head (and the backbone's own head, if it still
    /// has one) for freshly initialised ones with `num_classes` outputs.
    pub fn replace_logits(mut self, num_classes: usize, device: &B::Device) -> Self {
        tracing::info!("Replace logits: {} → {} classes", self.num_classes, num_classes);
        self.backbone    = self.backbone.replace_logits(num_classes, device);
        self.logits      = Conv1dConfig::new(self.logits_in_channels, num_classes, 1).init(device);
        self.num_classes = num_classes;
        self
    }

    pub fn delete_backbone_logits(mut self) -> Self {
        tracing::info!("Delete logits in the backbone model...");
        self.backbone = self.backbone.delete_logits();
        self
    }

    pub fn backbone(&self) -> &ResNet2d<B> {
        &self.backbone
    }

    pub fn logits_in_channels(&self) -> usize {
        self.logits_in_channels
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    fn tiny(input_size: Vec<usize>) -> MilConfig {
        MilConfig::new(input_size)
            .with_lstm_hidden(16)
            .with_backbone(ResNet2dConfig::new().with_base_width(4).with_blocks(vec![1, 1]))
    }

    #[test]
    fn test_shape_trace() {
        let device = Default::default();
        let (_, trace) = tiny(vec![1, 3, 4, 32, 32])
            .init_with_trace::<TestBackend>(&device)
            .unwrap();

        assert_eq!(trace.input,       vec![1, 3, 4, 32, 32]);
        assert_eq!(trace.frames,      vec![4, 3, 32, 32]);
        assert_eq!(trace.backbone,    vec![1, 8, 4, 4, 4]);
        assert_eq!(trace.lstm_input,  vec![1, 4, 128]);
        assert_eq!(trace.lstm_output, vec![1, 16, 4]);
        assert_eq!(trace.logits,      vec![1, 2, 4]);
    }

    #[test]
    fn test_dummy_pass_uses_batch_of_one() {
        let device = Default::default();
        let (_, trace) = tiny(vec![16, 3, 2, 32, 32])
            .init_with_trace::<TestBackend>(&device)
            .unwrap();
        assert_eq!(trace.input[0], 1);
        assert_eq!(trace.logits, vec![1, 2, 2]);
    }

    #[test]
    fn test_forward_batch_and_length_may_vary() {
        let device = Default::default();
        let model = tiny(vec![1, 3, 4, 32, 32]).init::<TestBackend>(&device).unwrap();
        let video = Tensor::<TestBackend, 5>::zeros([2, 3, 6, 32, 32], &device);
        assert_eq!(model.forward(video).dims(), [2, 2, 6]);
    }

    #[test]
    fn test_channel_mismatch_rejected() {
        let device = Default::default();
        let cfg = tiny(vec![1, 1, 4, 32, 32]);
        assert!(cfg.init::<TestBackend>(&device).is_err());
        assert!(cfg.with_in_channels(1).init::<TestBackend>(&device).is_ok());
    }

    #[test]
    fn test_invalid_hyperparameters_rejected() {
        let device = Default::default();
        let base = tiny(vec![1, 3, 4, 32, 32]);
        assert!(base.clone().with_dropout(1.0).init::<TestBackend>(&device).is_err());
        assert!(base.clone().with_dropout(-0.1).init::<TestBackend>(&device).is_err());
        assert!(base.clone().with_num_classes(0).init::<TestBackend>(&device).is_err());
        assert!(base.clone().with_lstm_layers(0).init::<TestBackend>(&device).is_err());
        let rank4 = MilConfig { input_size: vec![3, 4, 32, 32], ..base };
        assert!(rank4.init::<TestBackend>(&device).is_err());
    }

    #[test]
    fn test_try_forward_checks_frame_size() {
        let device = Default::default();
        let model = tiny(vec![1, 3, 4, 32, 32]).init::<TestBackend>(&device).unwrap();
        let wrong = Tensor::<TestBackend, 5>::zeros([1, 3, 4, 48, 32], &device);
        assert!(model.try_forward(wrong).is_err());
        let right = Tensor::<TestBackend, 5>::zeros([1, 3, 4, 32, 32], &device);
        assert_eq!(model.try_forward(right).unwrap().dims(), [1, 2, 4]);
    }

    #[test]
    fn test_try_forward_checks_channels() {
        let device = Default::default();
        let model = tiny(vec![1, 3, 4, 32, 32]).init::<TestBackend>(&device).unwrap();
        let grey = Tensor::<TestBackend, 5>::zeros([1, 1, 4, 32, 32], &device);
        let err = model.try_forward(grey).unwrap_err();
        assert!(err.to_string().contains("channels"));
    }

    #[test]
    fn test_try_forward_checks_width_alone() {
        let device = Default::default();
        let model = tiny(vec![1, 3, 4, 32, 32]).init::<TestBackend>(&device).unwrap();
        let wide = Tensor::<TestBackend, 5>::zeros([1, 3, 4, 32, 48], &device);
        let err = model.try_forward(wide).unwrap_err();
        assert!(err.to_string().contains("32x48"));
    }

    #[test]
    fn test_stacked_lstm() {
        let device = Default::default();
        let (_, trace) = tiny(vec![1, 3, 3, 32, 32])
            .with_lstm_layers(2)
            .init_with_trace::<TestBackend>(&device)
            .unwrap();
        assert_eq!(trace.lstm_output, vec![1, 16, 3]);
    }

    #[test]
    fn test_later_frames_do_not_change_earlier_logits() {
        // The LSTM runs forward in time, so perturbing the last frame may
        // only move the logits of the last timestep.
        let device = Default::default();
        let model = tiny(vec![1, 3, 4, 32, 32]).init::<TestBackend>(&device).unwrap();

        let blank = Tensor::<TestBackend, 5>::zeros([1, 3, 4, 32, 32], &device);
        let flash = Tensor::<TestBackend, 5>::ones([1, 3, 1, 32, 32], &device);
        let video = blank.clone().slice_assign([0..1, 0..3, 3..4, 0..32, 0..32], flash);

        let diff = (model.forward(video) - model.forward(blank)).abs();
        let early: f32 = diff.clone().slice([0..1, 0..2, 0..3]).sum().into_scalar().elem();
        let last:  f32 = diff.slice([0..1, 0..2, 3..4]).sum().into_scalar().elem();
        assert!(early < 1e-6);
        assert!(last > 0.0);
    }

    #[test]
    fn test_replace_logits() {
        let device = Default::default();
        let model = tiny(vec![1, 3, 2, 32, 32])
            .with_backbone_logits(true)
            .init::<TestBackend>(&device)
            .unwrap();
        let model = model.replace_logits(5, &device);
        assert_eq!(model.num_classes(), 5);
        assert_eq!(model.logits_in_channels(), 16);

        let video = Tensor::<TestBackend, 5>::zeros([1, 3, 2, 32, 32], &device);
        assert_eq!(model.forward(video.clone()).dims(), [1, 5, 2]);
        assert_eq!(model.backbone().forward(video).unwrap().dims(), [1, 2, 5]);
    }

    #[test]
    fn test_delete_backbone_logits_keeps_mil_head() {
        let device = Default::default();
        let model = tiny(vec![1, 3, 2, 32, 32])
            .with_backbone_logits(true)
            .init::<TestBackend>(&device)
            .unwrap()
            .delete_backbone_logits();
        assert!(!model.backbone().has_logits());

        let video = Tensor::<TestBackend, 5>::zeros([1, 3, 2, 32, 32], &device);
        assert_eq!(model.forward(video).dims(), [1, 2, 2]);
    }
}
