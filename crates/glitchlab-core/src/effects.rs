use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::buffer::{Axis, Channel, Selection};
use crate::error::{CoreError, Result};

/// The glitch effects the editor knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectType {
    ChannelShift,
    Delay,
    PixelSort,
    TremoloLegacy,
    DynamicTremolo,
    Reverb,
    WaveDistortion,
    ColorQuantization,
}

impl EffectType {
    /// Stable identifier used in records, recipes and on the command line.
    pub fn id(&self) -> &'static str {
        match self {
            Self::ChannelShift => "channel_shift",
            Self::Delay => "delay",
            Self::PixelSort => "pixel_sort",
            Self::TremoloLegacy => "tremolo_legacy",
            Self::DynamicTremolo => "dynamic_tremolo",
            Self::Reverb => "reverb",
            Self::WaveDistortion => "wave_distortion",
            Self::ColorQuantization => "color_quantization",
        }
    }

    /// Human-readable display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ChannelShift => "Channel Shift",
            Self::Delay => "Delay",
            Self::PixelSort => "Pixel Sort",
            Self::TremoloLegacy => "Tremolo (Legacy)",
            Self::DynamicTremolo => "Dynamic Tremolo",
            Self::Reverb => "Reverb",
            Self::WaveDistortion => "Wave Distortion",
            Self::ColorQuantization => "Color Quantization",
        }
    }

    /// All built-in effect types.
    pub fn all_builtin() -> Vec<EffectType> {
        vec![
            EffectType::ChannelShift,
            EffectType::Delay,
            EffectType::PixelSort,
            EffectType::TremoloLegacy,
            EffectType::DynamicTremolo,
            EffectType::Reverb,
            EffectType::WaveDistortion,
            EffectType::ColorQuantization,
        ]
    }

    /// Parameter definitions for this effect type.
    pub fn parameter_definitions(&self) -> Vec<ParameterDefinition> {
        match self {
            Self::ChannelShift => {
                let mut defs = Vec::with_capacity(6);
                for channel in Channel::ALL {
                    let s = channel.suffix();
                    defs.push(ParameterDefinition::int(
                        &format!("shift_{s}"),
                        &format!("Shift {}", s.to_uppercase()),
                        0,
                        -1000,
                        1000,
                    ));
                }
                for channel in Channel::ALL {
                    let s = channel.suffix();
                    defs.push(ParameterDefinition::choice(
                        &format!("axis_{s}"),
                        &format!("Axis {}", s.to_uppercase()),
                        "horizontal",
                        &Axis::NAMES,
                    ));
                }
                defs
            }
            Self::Delay => vec![
                ParameterDefinition::int("delay_time", "Delay Time", 10, 0, 1000),
                ParameterDefinition::int("num_echoes", "Echoes", 3, 0, 50),
                ParameterDefinition::float("decay_factor", "Decay", 0.5, 0.0, 1.0),
            ],
            Self::PixelSort => vec![
                ParameterDefinition::int("threshold", "Threshold", 128, 0, 255),
                ParameterDefinition::choice(
                    "sorting_function",
                    "Sorting Function",
                    "intensity",
                    &["intensity", "hue", "saturation"],
                ),
                ParameterDefinition::choice("direction", "Direction", "horizontal", &Axis::NAMES),
            ],
            Self::TremoloLegacy => tremolo_definitions(),
            Self::DynamicTremolo => {
                let mut defs = tremolo_definitions();
                defs.push(ParameterDefinition::float(
                    "displacement_strength",
                    "Displacement Strength",
                    50.0,
                    0.0,
                    100.0,
                ));
                defs
            }
            Self::Reverb => vec![
                ParameterDefinition::float("room_size", "Room Size", 75.0, 0.0, 100.0),
                ParameterDefinition::float("pre_delay", "Pre-delay", 10.0, 0.0, 200.0),
                ParameterDefinition::float("reverberance", "Reverberance", 50.0, 0.0, 100.0),
                ParameterDefinition::float("hf_damping", "HF Damping", 50.0, 0.0, 100.0),
                ParameterDefinition::float("tone_low", "Tone Low", 100.0, 0.0, 100.0),
                ParameterDefinition::float("tone_high", "Tone High", 100.0, 0.0, 100.0),
                ParameterDefinition::float("wet_gain", "Wet Gain (dB)", -1.0, -20.0, 10.0),
                ParameterDefinition::float("dry_gain", "Dry Gain (dB)", -1.0, -20.0, 10.0),
                ParameterDefinition::flag("wet_only", "Wet Only", false),
            ],
            Self::WaveDistortion => vec![
                ParameterDefinition::choice(
                    "waveform",
                    "Waveform",
                    "sine",
                    &["sine", "triangle", "square", "sawtooth", "pulse"],
                ),
                ParameterDefinition::float("amplitude", "Amplitude", 10.0, 0.0, 100.0),
                ParameterDefinition::float("frequency", "Frequency", 5.0, 1.0, 20.0),
                ParameterDefinition::float("phase", "Phase", 0.0, 0.0, 360.0),
                ParameterDefinition::choice("direction", "Direction", "horizontal", &Axis::NAMES),
            ],
            Self::ColorQuantization => vec![
                ParameterDefinition::int("num_colors", "Number of Colors", 8, 2, 32),
                ParameterDefinition::float("dither_amount", "Dither Amount", 0.5, 0.0, 1.0),
                ParameterDefinition::choice(
                    "dither_mode",
                    "Dither Mode",
                    "none",
                    &[
                        "none",
                        "random",
                        "ordered_5x3",
                        "ordered_4x1",
                        "ordered_3x3",
                        "ordered_8x8",
                    ],
                ),
                ParameterDefinition::int("bit_reduction", "Bit Reduction", 8, 1, 8),
            ],
        }
    }

    /// A parameter set holding every declared default.
    pub fn default_parameters(&self) -> Parameters {
        self.parameter_definitions()
            .into_iter()
            .map(|def| {
                let value = def.param_type.default_value();
                (def.name, value)
            })
            .collect()
    }

    /// Check that `params` holds exactly the declared parameters, each with
    /// the right type and within range.
    pub fn validate(&self, params: &Parameters) -> Result<()> {
        let defs = self.parameter_definitions();
        for def in &defs {
            let value = params.get(&def.name).ok_or_else(|| {
                CoreError::invalid_parameter(self.id(), &def.name, "missing")
            })?;
            def.verify(self.id(), value)?;
        }
        if let Some(unknown) = params.names().find(|n| !defs.iter().any(|d| d.name == *n)) {
            return Err(CoreError::invalid_parameter(
                self.id(),
                unknown,
                "not a parameter of this effect",
            ));
        }
        Ok(())
    }

    /// Parse a textual value (`--param key=value`) against the declared type.
    pub fn parse_parameter(&self, name: &str, raw: &str) -> Result<ParameterValue> {
        let def = self
            .parameter_definitions()
            .into_iter()
            .find(|d| d.name == name)
            .ok_or_else(|| {
                CoreError::invalid_parameter(self.id(), name, "not a parameter of this effect")
            })?;
        let value = def
            .param_type
            .parse(raw)
            .map_err(|reason| CoreError::invalid_parameter(self.id(), name, reason))?;
        def.verify(self.id(), &value)?;
        Ok(value)
    }

    /// Axis the selection ranges of this effect index, given its parameters.
    pub fn selection_axis(&self, params: &Parameters) -> Axis {
        match self {
            Self::PixelSort | Self::WaveDistortion => params
                .choice("direction")
                .ok()
                .and_then(|d| d.parse().ok())
                .unwrap_or_default(),
            _ => Axis::Horizontal,
        }
    }
}

fn tremolo_definitions() -> Vec<ParameterDefinition> {
    vec![
        ParameterDefinition::choice(
            "wave_type",
            "Wave Type",
            "sine",
            &["sine", "triangle", "sawtooth", "inverse_sawtooth", "square"],
        ),
        ParameterDefinition::float("phase", "Phase", 0.0, 0.0, 360.0),
        ParameterDefinition::float("wet", "Wet (%)", 50.0, 0.0, 100.0),
        ParameterDefinition::float("lfo", "LFO", 50.0, 0.0, 100.0),
    ]
}

impl fmt::Display for EffectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for EffectType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        EffectType::all_builtin()
            .into_iter()
            .find(|e| e.id() == s)
            .ok_or_else(|| CoreError::unsupported("effect", s))
    }
}

// =============================================================================
// Parameter schema
// =============================================================================

/// The type of a parameter value, with its default and valid range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParameterType {
    Int { default: i64, min: i64, max: i64 },
    Float { default: f64, min: f64, max: f64 },
    Choice { default: String, choices: Vec<String> },
    Bool { default: bool },
}

impl ParameterType {
    pub fn default_value(&self) -> ParameterValue {
        match self {
            ParameterType::Int { default, .. } => ParameterValue::Int(*default),
            ParameterType::Float { default, .. } => ParameterValue::Float(*default),
            ParameterType::Choice { default, .. } => ParameterValue::Text(default.clone()),
            ParameterType::Bool { default } => ParameterValue::Bool(*default),
        }
    }

    fn check(&self, value: &ParameterValue) -> std::result::Result<(), String> {
        match (self, value) {
            (ParameterType::Int { min, max, .. }, ParameterValue::Int(v)) => {
                if v < min || v > max {
                    return Err(format!("{v} is outside [{min}, {max}]"));
                }
                Ok(())
            }
            (
                ParameterType::Float { min, max, .. },
                value @ (ParameterValue::Float(_) | ParameterValue::Int(_)),
            ) => {
                let v = value.as_f64().unwrap_or(f64::NAN);
                if !v.is_finite() {
                    return Err(format!("{v} is not a finite number"));
                }
                if v < *min || v > *max {
                    return Err(format!("{v} is outside [{min}, {max}]"));
                }
                Ok(())
            }
            (ParameterType::Choice { choices, .. }, ParameterValue::Text(v)) => {
                if !choices.iter().any(|c| c == v) {
                    return Err(format!("`{v}` is not one of {}", choices.join(", ")));
                }
                Ok(())
            }
            (ParameterType::Bool { .. }, ParameterValue::Bool(_)) => Ok(()),
            (expected, got) => Err(format!(
                "expected {}, got {}",
                expected.type_name(),
                got.type_name()
            )),
        }
    }

    fn parse(&self, raw: &str) -> std::result::Result<ParameterValue, String> {
        let raw = raw.trim();
        let value = match self {
            ParameterType::Int { .. } => raw
                .parse::<i64>()
                .map(ParameterValue::Int)
                .map_err(|_| format!("`{raw}` is not an integer"))?,
            ParameterType::Float { .. } => raw
                .parse::<f64>()
                .map(ParameterValue::Float)
                .map_err(|_| format!("`{raw}` is not a number"))?,
            ParameterType::Choice { .. } => ParameterValue::Text(raw.to_string()),
            ParameterType::Bool { .. } => match raw {
                "true" | "1" | "yes" | "on" => ParameterValue::Bool(true),
                "false" | "0" | "no" | "off" => ParameterValue::Bool(false),
                _ => return Err(format!("`{raw}` is not a boolean")),
            },
        };
        Ok(value)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ParameterType::Int { .. } => "integer",
            ParameterType::Float { .. } => "float",
            ParameterType::Choice { .. } => "choice",
            ParameterType::Bool { .. } => "boolean",
        }
    }
}

/// Definition of a parameter on an effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub name: String,
    pub label: String,
    pub param_type: ParameterType,
}

impl ParameterDefinition {
    fn int(name: &str, label: &str, default: i64, min: i64, max: i64) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            param_type: ParameterType::Int { default, min, max },
        }
    }

    fn float(name: &str, label: &str, default: f64, min: f64, max: f64) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            param_type: ParameterType::Float { default, min, max },
        }
    }

    fn choice(name: &str, label: &str, default: &str, choices: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            param_type: ParameterType::Choice {
                default: default.to_string(),
                choices: choices.iter().map(|c| c.to_string()).collect(),
            },
        }
    }

    /// Check a value against this definition. A string outside a choice
    /// list names a variant the effect doesn't have.
    fn verify(&self, effect: &str, value: &ParameterValue) -> Result<()> {
        if let (ParameterType::Choice { choices, .. }, ParameterValue::Text(v)) =
            (&self.param_type, value)
        {
            if !choices.iter().any(|c| c == v) {
                return Err(CoreError::unsupported(choice_kind(&self.name), v.as_str()));
            }
        }
        self.param_type
            .check(value)
            .map_err(|reason| CoreError::invalid_parameter(effect, &self.name, reason))
    }

    fn flag(name: &str, label: &str, default: bool) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            param_type: ParameterType::Bool { default },
        }
    }
}

fn choice_kind(name: &str) -> &'static str {
    match name {
        "waveform" => "waveform",
        "wave_type" => "wave type",
        "sorting_function" => "sorting function",
        "dither_mode" => "dither mode",
        "direction" | "axis_r" | "axis_g" | "axis_b" => "direction",
        _ => "choice",
    }
}

/// A concrete parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

// Manual Eq impl: f64 doesn't impl Eq, but records derive it.
// Validated parameter values are always finite.
impl Eq for ParameterValue {}

impl ParameterValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterValue::Int(v) => Some(*v as f64),
            ParameterValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            ParameterValue::Bool(_) => "boolean",
            ParameterValue::Int(_) => "integer",
            ParameterValue::Float(_) => "float",
            ParameterValue::Text(_) => "string",
        }
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        ParameterValue::Int(v)
    }
}

impl From<i32> for ParameterValue {
    fn from(v: i32) -> Self {
        ParameterValue::Int(v as i64)
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        ParameterValue::Float(v)
    }
}

impl From<bool> for ParameterValue {
    fn from(v: bool) -> Self {
        ParameterValue::Bool(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        ParameterValue::Text(v.to_string())
    }
}

/// Named parameter values for one effect invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(BTreeMap<String, ParameterValue>);

impl Parameters {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, value: impl Into<ParameterValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<ParameterValue>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.0.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overlay `overrides` onto these values.
    pub fn merged(mut self, overrides: &Parameters) -> Self {
        for (k, v) in &overrides.0 {
            self.0.insert(k.clone(), v.clone());
        }
        self
    }

    /// Get an integer parameter value by name.
    pub fn int(&self, name: &str) -> Result<i64> {
        match self.get(name) {
            Some(ParameterValue::Int(v)) => Ok(*v),
            _ => Err(CoreError::invalid_parameter("parameters", name, "expected integer")),
        }
    }

    /// Get a float parameter value by name. Integers widen.
    pub fn float(&self, name: &str) -> Result<f64> {
        self.get(name)
            .and_then(ParameterValue::as_f64)
            .ok_or_else(|| CoreError::invalid_parameter("parameters", name, "expected float"))
    }

    pub fn choice(&self, name: &str) -> Result<&str> {
        match self.get(name) {
            Some(ParameterValue::Text(v)) => Ok(v),
            _ => Err(CoreError::invalid_parameter("parameters", name, "expected choice")),
        }
    }

    pub fn flag(&self, name: &str) -> Result<bool> {
        match self.get(name) {
            Some(ParameterValue::Bool(v)) => Ok(*v),
            _ => Err(CoreError::invalid_parameter("parameters", name, "expected boolean")),
        }
    }
}

impl FromIterator<(String, ParameterValue)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (String, ParameterValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// =============================================================================
// EffectRecord
// =============================================================================

/// One applied effect: the unit of undo and replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectRecord {
    pub id: Uuid,
    pub effect_type: EffectType,
    pub parameters: Parameters,
    #[serde(default)]
    pub selections: Vec<Selection>,
    /// Seed for effects that draw random numbers. `None` means fresh entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl EffectRecord {
    /// Create a record with default parameter values over the whole buffer.
    pub fn new(effect_type: EffectType) -> Self {
        Self::with_parameters(effect_type, effect_type.default_parameters())
    }

    pub fn with_parameters(effect_type: EffectType, parameters: Parameters) -> Self {
        Self {
            id: Uuid::new_v4(),
            effect_type,
            parameters,
            selections: Vec::new(),
            seed: None,
        }
    }

    pub fn selections(mut self, selections: Vec<Selection>) -> Self {
        self.selections = selections;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn description(&self) -> &'static str {
        self.effect_type.display_name()
    }
}
