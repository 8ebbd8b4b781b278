use candle_core::Device;
use ruleseer_embed::tokenize_batch_on_device;
use tokenizers::Tokenizer;

const PAD: u32 = 0;
const CLS: u32 = 1;
const SEP: u32 = 2;

/// Word-level tokenizer with BERT-style `[CLS] ... [SEP]` framing, built without model files.
fn word_tokenizer() -> Tokenizer {
    let json = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": { "type": "BertProcessing", "sep": ["[SEP]", 2], "cls": ["[CLS]", 1] },
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": {
                "[PAD]": 0, "[CLS]": 1, "[SEP]": 2, "[UNK]": 3,
                "deep": 4, "strike": 5, "units": 6, "reserves": 7, "avatar": 8, "khaine": 9
            },
            "unk_token": "[UNK]"
        }
    }"#;
    Tokenizer::from_bytes(json.as_bytes()).expect("tokenizer")
}

fn rows(tokenizer: &Tokenizer, texts: &[&str], max_len: usize) -> (Vec<Vec<u32>>, Vec<Vec<u32>>) {
    let texts: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
    let (ids, mask) = tokenize_batch_on_device(tokenizer, &texts, max_len, PAD, &Device::Cpu).expect("tokenize");
    (ids.to_vec2().expect("ids"), mask.to_vec2().expect("mask"))
}

#[test]
fn every_row_is_padded_to_max_len() {
    let tokenizer = word_tokenizer();
    let (ids, mask) = rows(&tokenizer, &["deep strike", "avatar"], 8);
    assert_eq!(ids.len(), 2);
    assert!(ids.iter().chain(&mask).all(|row| row.len() == 8));
    assert_eq!(ids[0], vec![CLS, 4, 5, SEP, PAD, PAD, PAD, PAD]);
    assert_eq!(mask[0], vec![1, 1, 1, 1, 0, 0, 0, 0]);
    assert_eq!(ids[1], vec![CLS, 8, SEP, PAD, PAD, PAD, PAD, PAD]);
}

#[test]
fn a_row_does_not_depend_on_its_neighbours() {
    let tokenizer = word_tokenizer();
    let short = "deep strike";
    let long = "units with deep strike arrive from reserves avatar khaine";
    let (alone_ids, alone_mask) = rows(&tokenizer, &[short], 16);
    let (mixed_ids, mixed_mask) = rows(&tokenizer, &[long, short], 16);
    assert_eq!(alone_ids[0], mixed_ids[1]);
    assert_eq!(alone_mask[0], mixed_mask[1]);
}

#[test]
fn truncation_keeps_the_final_sep() {
    let tokenizer = word_tokenizer();
    let (ids, mask) = rows(&tokenizer, &["deep strike units reserves avatar khaine deep strike units"], 6);
    assert_eq!(ids[0].len(), 6);
    assert_eq!(ids[0][0], CLS);
    assert_eq!(ids[0][5], SEP);
    assert_eq!(&ids[0][1..5], &[4, 5, 6, 7]);
    assert!(mask[0].iter().all(|&m| m == 1));
}
