//! Full seq2seq model scenarios: masking interplay and evaluation-mode
//! determinism.

use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use seqcast_transformer::{StackConfig, Transformer, TransformerConfig};

fn small_config() -> TransformerConfig {
    TransformerConfig {
        src_vocab_size: 20,
        tgt_vocab_size: 17,
        max_seq_len: 12,
        stack: StackConfig {
            d_model: 16,
            num_heads: 4,
            num_layers: 2,
            d_ff: 64,
            dropout: 0.1,
            ln_eps: 1e-5,
        },
    }
}

fn build_model(device: &Device) -> (VarMap, Transformer) {
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
    let model = Transformer::new(small_config(), vb).expect("model construction");
    (varmap, model)
}

fn ids(batch: usize, seq: usize, modulus: u32, device: &Device) -> Tensor {
    let data: Vec<u32> = (0..batch * seq).map(|i| (i * 3 + 1) as u32 % modulus).collect();
    Tensor::from_vec(data, (batch, seq), device).expect("id tensor")
}

#[test]
fn forward_with_padding_masks() {
    let device = Device::Cpu;
    let (_map, model) = build_model(&device);

    let src = ids(2, 7, 20, &device);
    let tgt = ids(2, 5, 17, &device);

    // Last source position and last target position padded out.
    let src_mask = Tensor::from_vec(
        vec![1f32, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0],
        (1, 1, 1, 7),
        &device,
    )
    .expect("src mask");
    let tgt_mask = Tensor::from_vec(vec![1f32, 1.0, 1.0, 1.0, 0.0], (1, 1, 1, 5), &device)
        .expect("tgt mask");

    let logprobs = model
        .forward(&src, &tgt, Some(&src_mask), Some(&tgt_mask), false)
        .expect("forward");
    assert_eq!(logprobs.dims(), &[2, 5, 17]);

    for v in logprobs
        .flatten_all()
        .expect("flatten")
        .to_vec1::<f32>()
        .expect("extract")
    {
        assert!(v.is_finite(), "non-finite log-probability {}", v);
    }
}

#[test]
fn evaluation_mode_is_deterministic_despite_dropout_config() {
    let device = Device::Cpu;
    let (_map, model) = build_model(&device);

    let src = ids(2, 6, 20, &device);
    let tgt = ids(2, 4, 17, &device);

    // dropout = 0.1 in the config, but train = false must bypass it.
    let a = model
        .forward(&src, &tgt, None, None, false)
        .expect("first run");
    let b = model
        .forward(&src, &tgt, None, None, false)
        .expect("second run");

    let a = a.flatten_all().expect("flatten").to_vec1::<f32>().expect("a");
    let b = b.flatten_all().expect("flatten").to_vec1::<f32>().expect("b");
    assert_eq!(a, b, "evaluation runs must be bit-identical");
}

#[test]
fn encode_once_decode_incrementally() {
    let device = Device::Cpu;
    let (_map, model) = build_model(&device);

    let src = ids(1, 6, 20, &device);
    let memory = model.encode(&src, None, false).expect("encode");
    assert_eq!(memory.dims(), &[1, 6, 16]);

    for tgt_len in 1..=4 {
        let tgt = ids(1, tgt_len, 17, &device);
        let hidden = model
            .decode(&tgt, &memory, None, None, false)
            .expect("decode");
        assert_eq!(hidden.dims(), &[1, tgt_len, 16]);
    }
}
