use std::io::Write;

use anyhow::Context as _;
use glitchlab_core::editor::{Editor, EditorSettings};
use glitchlab_core::effects::{EffectType, ParameterType};
use glitchlab_media::{load_image, save_current};

use crate::args::{ApplyArgs, ChainArgs, Cli, Commands, ImageIo};
use crate::recipe::Recipe;

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Effects { json } => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            if json {
                write_schema_json(&mut out)
            } else {
                write_effect_list(&mut out)
            }
        }
        Commands::Apply(args) => cmd_apply(args),
        Commands::Chain(args) => cmd_chain(args),
    }
}

/// Human-readable list of every effect and its parameters.
pub fn write_effect_list(out: &mut impl Write) -> anyhow::Result<()> {
    for effect in EffectType::all_builtin() {
        writeln!(out, "{} ({})", effect.id(), effect.display_name())?;
        for def in effect.parameter_definitions() {
            let detail = match &def.param_type {
                ParameterType::Int { default, min, max } => {
                    format!("int [{min}, {max}] = {default}")
                }
                ParameterType::Float { default, min, max } => {
                    format!("float [{min}, {max}] = {default}")
                }
                ParameterType::Choice { default, choices } => {
                    format!("{{{}}} = {default}", choices.join(", "))
                }
                ParameterType::Bool { default } => format!("bool = {default}"),
            };
            writeln!(out, "    {:<24}{detail}", def.name)?;
        }
    }
    Ok(())
}

pub fn write_schema_json(out: &mut impl Write) -> anyhow::Result<()> {
    let schema: serde_json::Map<String, serde_json::Value> = EffectType::all_builtin()
        .into_iter()
        .map(|effect| -> serde_json::Result<(String, serde_json::Value)> {
            let defs = serde_json::to_value(effect.parameter_definitions())?;
            Ok((effect.id().to_string(), defs))
        })
        .collect::<serde_json::Result<_>>()?;
    serde_json::to_writer_pretty(&mut *out, &schema)?;
    writeln!(out)?;
    Ok(())
}

fn open_editor(io: &ImageIo, seed: Option<u64>) -> anyhow::Result<Editor> {
    let buffer = load_image(&io.input)
        .with_context(|| format!("load image '{}'", io.input.display()))?;
    let mut editor = Editor::new(EditorSettings {
        seed,
        ..Default::default()
    });
    editor.load(buffer);
    Ok(editor)
}

fn save(editor: &Editor, io: &ImageIo) -> anyhow::Result<()> {
    let format = io.save_format();
    save_current(editor, &io.output, format)
        .with_context(|| format!("save '{}' as {format}", io.output.display()))
}

fn cmd_apply(args: ApplyArgs) -> anyhow::Result<()> {
    let mut parameters = args.effect.default_parameters();
    for (name, raw) in &args.params {
        let value = args
            .effect
            .parse_parameter(name, raw)
            .with_context(|| format!("--param {name}={raw}"))?;
        parameters.set(name, value);
    }

    let mut editor = open_editor(&args.io, args.seed)?;
    editor
        .apply(args.effect, parameters, args.selections)
        .with_context(|| format!("apply {}", args.effect))?;
    save(&editor, &args.io)
}

fn cmd_chain(args: ChainArgs) -> anyhow::Result<()> {
    let recipe = Recipe::from_path(&args.recipe)?;
    let records = recipe.records()?;

    let mut editor = open_editor(&args.io, recipe.seed)?;
    for (i, record) in records.into_iter().enumerate() {
        let effect = record.effect_type;
        editor
            .apply_record(record)
            .with_context(|| format!("recipe step {} ({effect})", i + 1))?;
    }
    tracing::info!(steps = editor.history().len(), "recipe applied");
    save(&editor, &args.io)
}
