#[path = "../common/mod.rs"]
mod common;

use common::{write_config, write_corpus, write_tone};
use samplernn::audio::io::WavIo;
use samplernn::weights::load_checkpoint;
use std::path::Path;
use std::process::{Command, Output};

fn samplernn(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_samplernn"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("run samplernn")
}

fn path(p: &Path) -> &str {
    p.to_str().expect("utf-8 path")
}

#[test]
fn split_writes_a_json_listing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let data = dir.path().join("data");
    write_corpus(&data, 6);
    let listing = dir.path().join("split.json");

    let output = samplernn(&[
        "split",
        path(&data),
        "--validation-fraction",
        "0.5",
        "--rng-seed",
        "1",
        "--output",
        path(&listing),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let parsed: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&listing).expect("listing")).expect("json");
    assert_eq!(parsed["train"].as_array().map(Vec::len), Some(3));
    assert_eq!(parsed["validation"].as_array().map(Vec::len), Some(3));
}

#[test]
fn fit_prior_then_generate() {
    let dir = tempfile::tempdir().expect("tempdir");
    let data = dir.path().join("data");
    write_corpus(&data, 4);
    let config = write_config(dir.path());
    let logdir = dir.path().join("logs");

    let output = samplernn(&[
        "fit-prior",
        path(&data),
        "--config-file",
        path(&config),
        "--num-epochs",
        "2",
        "--output-dir",
        path(&logdir),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let checkpoint = logdir.join("model.ckpt-2.safetensors");
    let loaded = load_checkpoint(&checkpoint, &["prior.logits"], false).expect("checkpoint");
    assert_eq!(loaded.get("prior.logits").expect("logits").shape, vec![256]);

    let out = dir.path().join("gen").join("sample.wav");
    let output = samplernn(&[
        "generate",
        "--output_path",
        path(&out),
        "--checkpoint_path",
        path(&checkpoint),
        "--config_file",
        path(&config),
        "--dur",
        "1",
        "--sample-rate",
        "64",
        "--num-seqs",
        "2",
        "--temperature",
        "0.9",
        "([0, 1], [1.0, 0.5])",
        "--rng-seed",
        "7",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    for name in ["sample_e=2(0)_t=0.9.wav", "sample_e=2(1)_t=0.5.wav"] {
        let (audio, rate) = WavIo::read_mono(dir.path().join("gen").join(name), None)
            .expect("generated file");
        assert_eq!(rate, 64);
        assert_eq!(audio.len(), 64);
    }
}

#[test]
fn generate_rejects_non_positive_duration() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_config(dir.path());
    let output = samplernn(&[
        "generate",
        "--output-path",
        path(&dir.path().join("out.wav")),
        "--checkpoint-path",
        path(&dir.path().join("model.ckpt-1.safetensors")),
        "--config-file",
        path(&config),
        "--dur",
        "0",
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not positive"));
}

#[test]
fn generate_reports_short_seed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_config(dir.path());
    let seed = dir.path().join("seed.wav");
    write_tone(&seed, 4, 8000);
    let checkpoint = dir.path().join("model.ckpt-1.safetensors");
    samplernn::model::save_symbol_prior(&checkpoint, &[0.0; 256]).expect("checkpoint");

    let output = samplernn(&[
        "generate",
        "--output-path",
        path(&dir.path().join("out.wav")),
        "--checkpoint-path",
        path(&checkpoint),
        "--config-file",
        path(&config),
        "--seed",
        path(&seed),
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("exceeds seed audio length"));
}
