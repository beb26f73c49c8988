//! End-to-end runs of the `apply` and `chain` commands against files on disk.

use std::path::Path;

use clap::Parser;
use glitchlab_cli::args::Cli;
use glitchlab_cli::run::run;
use glitchlab_core::buffer::{Channel, PixelBuffer};
use glitchlab_core::effects::EffectType;
use glitchlab_core::pipeline::EffectRegistry;
use glitchlab_media::load_image;
use glitchlab_test_harness::assertions::{assert_at_most_distinct, assert_channel_eq};
use glitchlab_test_harness::builders::{EffectRecordBuilder, PixelBufferBuilder};
use glitchlab_test_harness::fixtures;

fn run_args(args: &[&str]) -> anyhow::Result<()> {
    let argv = std::iter::once("glitchlab").chain(args.iter().copied());
    run(Cli::try_parse_from(argv)?)
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn source(dir: &Path) -> (PixelBuffer, std::path::PathBuf) {
    let buffer = PixelBufferBuilder::new(32, 20).noise(77).build();
    let path = fixtures::write_test_png(dir, "source", &buffer);
    (buffer, path)
}

#[test]
fn test_apply_matches_library_result() {
    let dir = fixtures::fixture_dir();
    let (buffer, input) = source(dir.path());
    let output = dir.path().join("out.png");

    run_args(&[
        "apply", "-i", path_str(&input), "-o", path_str(&output),
        "--effect", "channel_shift", "-p", "shift_r=5", "-p", "axis_r=vertical",
    ])
    .unwrap();

    let expected = EffectRegistry::with_builtins()
        .apply_record(
            &buffer,
            &EffectRecordBuilder::new(EffectType::ChannelShift)
                .param("shift_r", 5)
                .param("axis_r", "vertical")
                .build(),
        )
        .unwrap();
    assert_eq!(load_image(&output).unwrap(), expected);
}

#[test]
fn test_apply_with_selection_only_touches_that_channel() {
    let dir = fixtures::fixture_dir();
    let (buffer, input) = source(dir.path());
    let output = dir.path().join("out.bmp");

    run_args(&[
        "apply", "-i", path_str(&input), "-o", path_str(&output),
        "-e", "delay", "--select", "0:32:g",
    ])
    .unwrap();

    let out = load_image(&output).unwrap();
    assert_channel_eq(&out, &buffer, Channel::Red);
    assert_channel_eq(&out, &buffer, Channel::Blue);
    assert_ne!(out, buffer);
}

#[test]
fn test_apply_rejects_invalid_parameter() {
    let dir = fixtures::fixture_dir();
    let (_, input) = source(dir.path());
    let output = dir.path().join("never.png");

    let err = run_args(&[
        "apply", "-i", path_str(&input), "-o", path_str(&output),
        "-e", "color_quantization", "-p", "num_colors=64",
    ])
    .unwrap_err();
    assert!(format!("{err:#}").contains("num_colors"), "{err:#}");
    assert!(!output.exists());
}

#[test]
fn test_apply_missing_input() {
    let dir = fixtures::fixture_dir();
    let err = run_args(&[
        "apply", "-i", path_str(&dir.path().join("nope.png")),
        "-o", path_str(&dir.path().join("out.png")), "-e", "delay",
    ])
    .unwrap_err();
    assert!(format!("{err:#}").contains("nope.png"), "{err:#}");
}

#[test]
fn test_chain_applies_recipe() {
    let dir = fixtures::fixture_dir();
    let (_, input) = source(dir.path());
    let recipe = dir.path().join("recipe.json");
    std::fs::write(
        &recipe,
        r#"{
            "seed": 42,
            "effects": [
                { "effect": "dynamic_tremolo", "parameters": { "wet": 70 } },
                {
                    "effect": "pixel_sort",
                    "parameters": { "threshold": 100, "direction": "vertical" }
                },
                {
                    "effect": "color_quantization",
                    "parameters": { "num_colors": 4, "dither_mode": "random" }
                }
            ]
        }"#,
    )
    .unwrap();

    let first = dir.path().join("first.png");
    let second = dir.path().join("second.png");
    for output in [&first, &second] {
        run_args(&[
            "chain", "-i", path_str(&input), "-o", path_str(output), "-r", path_str(&recipe),
        ])
        .unwrap();
    }

    let a = load_image(&first).unwrap();
    let b = load_image(&second).unwrap();
    // Seeded recipes are reproducible.
    assert_eq!(a, b);
    for channel in Channel::ALL {
        assert_at_most_distinct(&a, channel, 4);
    }
}

#[test]
fn test_chain_reports_bad_step() {
    let dir = fixtures::fixture_dir();
    let (_, input) = source(dir.path());
    let recipe = dir.path().join("bad.json");
    std::fs::write(
        &recipe,
        r#"{ "effects": [
            { "effect": "wave_distortion", "parameters": { "waveform": "noise" } }
        ] }"#,
    )
    .unwrap();

    let err = run_args(&[
        "chain", "-i", path_str(&input), "-o", path_str(&dir.path().join("o.png")),
        "-r", path_str(&recipe),
    ])
    .unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("recipe step 1"), "{message}");
    assert!(message.contains("noise"), "{message}");
}

#[test]
fn test_jpeg_output_by_extension() {
    let dir = fixtures::fixture_dir();
    let (buffer, input) = source(dir.path());
    let output = dir.path().join("out.jpg");

    run_args(&[
        "apply", "-i", path_str(&input), "-o", path_str(&output),
        "-e", "wave_distortion", "-q", "80",
    ])
    .unwrap();

    let bytes = std::fs::read(&output).unwrap();
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    assert!(load_image(&output).unwrap().same_shape(&buffer));
}
