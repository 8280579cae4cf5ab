// ============================================================
// Layer 5 — BERT Encoder + Emotion Classification Head
// ============================================================
// Module tree (field names matter: pretrained weights are
// remapped onto them, and the fine-tuning policy freezes by
// sub-module):
//
//   EmotionClassifier
//     ├── encoder: TextEncoder
//     │     ├── embeddings      word + position + token-type, LayerNorm
//     │     ├── layers[0..N]    post-norm transformer blocks
//     │     └── pooler          Linear + tanh over [CLS]
//     ├── dropout
//     └── classifier            Linear hidden → num_labels
//
// Reference: Burn Book §3 (Building Blocks)
//            Devlin et al. (2019) BERT

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        loss::CrossEntropyLossConfig,
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::{gelu, tanh},
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct TextEncoderConfig {
    pub vocab_size:              usize,
    pub max_position_embeddings: usize,
    pub type_vocab_size:         usize,
    pub hidden_size:             usize,
    pub num_heads:               usize,
    pub num_layers:              usize,
    pub intermediate_size:       usize,
    #[config(default = 0.1)]
    pub dropout:                 f64,
    #[config(default = 1e-12)]
    pub layer_norm_eps:          f64,
}

impl TextEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TextEncoder<B> {
        let embeddings = Embeddings {
            word_embeddings:       EmbeddingConfig::new(self.vocab_size, self.hidden_size).init(device),
            position_embeddings:   EmbeddingConfig::new(self.max_position_embeddings, self.hidden_size).init(device),
            token_type_embeddings: EmbeddingConfig::new(self.type_vocab_size, self.hidden_size).init(device),
            layer_norm:            self.layer_norm(device),
            dropout:               DropoutConfig::new(self.dropout).init(),
        };
        let layers: Vec<EncoderBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        let pooler = LinearConfig::new(self.hidden_size, self.hidden_size).init(device);
        TextEncoder { embeddings, layers, pooler }
    }

    fn layer_norm<B: Backend>(&self, device: &B::Device) -> LayerNorm<B> {
        LayerNormConfig::new(self.hidden_size)
            .with_epsilon(self.layer_norm_eps)
            .init(device)
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        let self_attn   = MultiHeadAttentionConfig::new(self.hidden_size, self.num_heads)
            .with_dropout(self.dropout)
            .init(device);
        let ffn_linear1 = LinearConfig::new(self.hidden_size, self.intermediate_size).init(device);
        let ffn_linear2 = LinearConfig::new(self.intermediate_size, self.hidden_size).init(device);
        let norm1   = self.layer_norm(device);
        let norm2   = self.layer_norm(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        EncoderBlock { self_attn, ffn_linear1, ffn_linear2, norm1, norm2, dropout }
    }
}

#[derive(Module, Debug)]
pub struct Embeddings<B: Backend> {
    pub word_embeddings:       Embedding<B>,
    pub position_embeddings:   Embedding<B>,
    pub token_type_embeddings: Embedding<B>,
    pub layer_norm:            LayerNorm<B>,
    pub dropout:               Dropout,
}

impl<B: Backend> Embeddings<B> {
    /// input_ids: [batch, seq_len] → [batch, seq_len, hidden]
    pub fn forward(&self, input_ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = input_ids.dims();
        let device = input_ids.device();

        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device)
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        // single-sentence input: every token is segment 0
        let token_types = Tensor::<B, 2, Int>::zeros([batch_size, seq_len], &device);

        let x = self.word_embeddings.forward(input_ids)
            + self.position_embeddings.forward(positions)
            + self.token_type_embeddings.forward(token_types);
        self.dropout.forward(self.layer_norm.forward(x))
    }
}

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    /// pad_mask: [batch, seq_len], true where the token is padding
    pub fn forward(&self, x: Tensor<B, 3>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let input = MhaInput::self_attn(x.clone()).mask_pad(pad_mask);
        let attn_output = self.self_attn.forward(input).context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_linear2.forward(gelu(self.ffn_linear1.forward(x.clone())));
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

#[derive(Module, Debug)]
pub struct TextEncoder<B: Backend> {
    pub embeddings: Embeddings<B>,
    pub layers:     Vec<EncoderBlock<B>>,
    pub pooler:     Linear<B>,
}

impl<B: Backend> TextEncoder<B> {
    /// → pooled [CLS] representation, [batch, hidden]
    pub fn forward(&self, input_ids: Tensor<B, 2, Int>, attention_mask: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let pad_mask = attention_mask.equal_elem(0);

        let mut x = self.embeddings.forward(input_ids);
        for layer in &self.layers {
            x = layer.forward(x, pad_mask.clone());
        }

        let [batch_size, _, hidden] = x.dims();
        let cls = x.slice([0..batch_size, 0..1, 0..hidden]).reshape([batch_size, hidden]);
        tanh(self.pooler.forward(cls))
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }
}

#[derive(Config, Debug)]
pub struct EmotionClassifierConfig {
    pub encoder:    TextEncoderConfig,
    pub num_labels: usize,
    #[config(default = 0.1)]
    pub dropout:    f64,
}

impl EmotionClassifierConfig {
    /// Fresh weights everywhere (tests, and the shape used when loading a checkpoint).
    pub fn init<B: Backend>(&self, device: &B::Device) -> EmotionClassifier<B> {
        self.init_with_encoder(self.encoder.init(device), device)
    }

    /// Pretrained encoder + freshly initialised classification head.
    pub fn init_with_encoder<B: Backend>(&self, encoder: TextEncoder<B>, device: &B::Device) -> EmotionClassifier<B> {
        EmotionClassifier {
            encoder,
            dropout:    DropoutConfig::new(self.dropout).init(),
            classifier: LinearConfig::new(self.encoder.hidden_size, self.num_labels).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct EmotionClassifier<B: Backend> {
    pub encoder:    TextEncoder<B>,
    pub dropout:    Dropout,
    pub classifier: Linear<B>,
}

impl<B: Backend> EmotionClassifier<B> {
    /// → logits [batch, num_labels]
    pub fn forward(&self, input_ids: Tensor<B, 2, Int>, attention_mask: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let pooled = self.encoder.forward(input_ids, attention_mask);
        self.classifier.forward(self.dropout.forward(pooled))
    }

    /// Mean cross-entropy over the batch, plus the logits for metrics.
    pub fn forward_loss(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
        labels:         Tensor<B, 1, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(input_ids, attention_mask);
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), labels);
        (loss, logits)
    }
}

/// Number of argmax predictions that match `labels`.
pub fn count_correct<B: Backend>(logits: Tensor<B, 2>, labels: Tensor<B, 1, Int>) -> usize {
    // argmax(1) is [batch, 1]; flatten to [batch] before comparing
    let predicted = logits.argmax(1).flatten::<1>(0, 1);
    predicted
        .equal(labels)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>() as usize
}
