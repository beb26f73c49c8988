use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context as _;
use glitchlab_core::buffer::Selection;
use glitchlab_core::effects::{EffectRecord, EffectType, Parameters};
use serde::{Deserialize, Serialize};

/// An effect chain read from JSON.
///
/// ```json
/// { "seed": 7, "effects": [ { "effect": "pixel_sort", "parameters": { "threshold": 90 } } ] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    /// Seeds every stochastic step that doesn't carry its own seed.
    #[serde(default)]
    pub seed: Option<u64>,
    pub effects: Vec<RecipeStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeStep {
    pub effect: EffectType,
    /// Overrides on top of the effect's defaults.
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default)]
    pub selections: Vec<Selection>,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Recipe {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let f = File::open(path).with_context(|| format!("open recipe '{}'", path.display()))?;
        serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("parse recipe '{}'", path.display()))
    }

    /// Build one record per step, parameters merged over defaults and checked
    /// against the effect schema.
    pub fn records(&self) -> anyhow::Result<Vec<EffectRecord>> {
        self.effects
            .iter()
            .enumerate()
            .map(|(i, step)| {
                let parameters = step.effect.default_parameters().merged(&step.parameters);
                step.effect
                    .validate(&parameters)
                    .with_context(|| format!("recipe step {} ({})", i + 1, step.effect))?;
                let record = EffectRecord::with_parameters(step.effect, parameters)
                    .selections(step.selections.clone());
                Ok(match step.seed {
                    Some(seed) => record.seed(seed),
                    None => record,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glitchlab_core::buffer::Channel;
    use glitchlab_core::effects::ParameterValue;

    #[test]
    fn test_parse_minimal_recipe() {
        let recipe: Recipe =
            serde_json::from_str(r#"{ "effects": [ { "effect": "delay" } ] }"#).unwrap();
        assert_eq!(recipe.seed, None);
        let records = recipe.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].parameters, EffectType::Delay.default_parameters());
        assert!(records[0].selections.is_empty());
    }

    #[test]
    fn test_overrides_merge_over_defaults() {
        let recipe: Recipe = serde_json::from_str(
            r#"{
                "seed": 3,
                "effects": [
                    {
                        "effect": "color_quantization",
                        "parameters": { "num_colors": 4, "dither_amount": 1 },
                        "selections": [ { "start": 0, "end": 5, "channel": 2 } ],
                        "seed": 11
                    }
                ]
            }"#,
        )
        .unwrap();
        let record = &recipe.records().unwrap()[0];
        assert_eq!(record.parameters.get("num_colors"), Some(&ParameterValue::Int(4)));
        // Integers widen for float parameters.
        assert_eq!(record.parameters.float("dither_amount").unwrap(), 1.0);
        assert_eq!(record.parameters.choice("dither_mode").unwrap(), "none");
        assert_eq!(record.selections, vec![Selection::new(0, 5, Channel::Blue)]);
        assert_eq!(record.seed, Some(11));
    }

    #[test]
    fn test_invalid_step_names_its_position() {
        let recipe: Recipe = serde_json::from_str(
            r#"{ "effects": [
                { "effect": "delay" },
                { "effect": "reverb", "parameters": { "bogus": 1 } }
            ] }"#,
        )
        .unwrap();
        let err = recipe.records().unwrap_err();
        assert!(format!("{err:#}").contains("recipe step 2"), "{err:#}");
    }

    #[test]
    fn test_unknown_effect_is_rejected() {
        let result = serde_json::from_str::<Recipe>(r#"{ "effects": [ { "effect": "blur" } ] }"#);
        assert!(result.is_err());
    }
}
