use std::fmt;

use serde::Deserialize;

/// Linear RGBA with every component in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba(pub [f32; 4]);

impl Rgba {
    /// Parses `#RRGGBB` or `#RRGGBBAA` (the `#` is optional).
    pub fn from_hex(text: &str) -> Result<Self, String> {
        let digits = text.trim_start_matches('#');
        if !matches!(digits.len(), 6 | 8) || !digits.is_ascii() {
            return Err(format!("invalid hex color \"{text}\""));
        }
        let mut rgba = [1.0f32; 4];
        for (slot, index) in (0..digits.len()).step_by(2).enumerate() {
            let byte = u8::from_str_radix(&digits[index..index + 2], 16)
                .map_err(|_| format!("invalid hex color \"{text}\""))?;
            rgba[slot] = f32::from(byte) / 255.0;
        }
        Ok(Self(rgba))
    }

    /// Accepts 3 or 4 components. A component above 1 is read as 0-255.
    pub fn from_components(components: &[f64]) -> Result<Self, String> {
        if !matches!(components.len(), 3 | 4) {
            return Err(format!(
                "color must have 3 or 4 components, got {}",
                components.len()
            ));
        }
        let mut rgba = [1.0f32; 4];
        for (slot, &value) in components.iter().enumerate() {
            let value = if value > 1.0 { value / 255.0 } else { value };
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("color component {value} outside range [0, 1]"));
            }
            rgba[slot] = value as f32;
        }
        Ok(Self(rgba))
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0;
        write!(f, "rgba({r:.3}, {g:.3}, {b:.3}, {a:.3})")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    Int {
        min: i64,
        max: i64,
        default: i64,
    },
    Float {
        min: f64,
        max: f64,
        logarithmic: bool,
        default: f64,
    },
    Color {
        default: Rgba,
    },
}

impl ParamKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int { .. } => "int",
            Self::Float { .. } => "float",
            Self::Color { .. } => "color",
        }
    }

    pub fn default_value(&self) -> ParamValue {
        match self {
            Self::Int { default, .. } => ParamValue::Int(*default),
            Self::Float { default, .. } => ParamValue::Float(*default),
            Self::Color { default } => ParamValue::Color(*default),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Color(Rgba),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Color(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionParam {
    pub name: String,
    pub display_name: String,
    pub kind: ParamKind,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawParam {
    pub name: String,
    pub display_name: String,
    #[serde(flatten)]
    pub kind: RawKind,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "param_type", rename_all = "lowercase")]
pub(crate) enum RawKind {
    Int {
        min: i64,
        max: i64,
        default: i64,
    },
    Float {
        min: f64,
        max: f64,
        #[serde(default)]
        logarithmic: bool,
        default: f64,
    },
    Color {
        default: ColorSpec,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ColorSpec {
    Hex(String),
    Components(Vec<f64>),
}

impl RawParam {
    /// Checks ranges and converts the default; the error is the reason only.
    pub(crate) fn into_param(self) -> Result<FunctionParam, String> {
        let kind = match self.kind {
            RawKind::Int { min, max, default } => {
                if min > max {
                    return Err(format!("min {min} is greater than max {max}"));
                }
                if !(min..=max).contains(&default) {
                    return Err(format!("default {default} outside range [{min}, {max}]"));
                }
                ParamKind::Int { min, max, default }
            }
            RawKind::Float {
                min,
                max,
                logarithmic,
                default,
            } => {
                if !(min.is_finite() && max.is_finite() && default.is_finite()) {
                    return Err("range and default must be finite".to_string());
                }
                if min > max {
                    return Err(format!("min {min} is greater than max {max}"));
                }
                if !(min..=max).contains(&default) {
                    return Err(format!("default {default} outside range [{min}, {max}]"));
                }
                if logarithmic && min <= 0.0 {
                    return Err(format!("logarithmic range must be positive, min is {min}"));
                }
                ParamKind::Float {
                    min,
                    max,
                    logarithmic,
                    default,
                }
            }
            RawKind::Color { default } => {
                let default = match default {
                    ColorSpec::Hex(text) => Rgba::from_hex(&text)?,
                    ColorSpec::Components(components) => Rgba::from_components(&components)?,
                };
                ParamKind::Color { default }
            }
        };
        Ok(FunctionParam {
            name: self.name,
            display_name: self.display_name,
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_colors() {
        assert_eq!(Rgba::from_hex("#ff0000").unwrap(), Rgba([1.0, 0.0, 0.0, 1.0]));
        assert_eq!(Rgba::from_hex("000000ff").unwrap(), Rgba([0.0, 0.0, 0.0, 1.0]));
        assert!(Rgba::from_hex("#fff").is_err());
        assert!(Rgba::from_hex("#gg0000").is_err());
    }

    #[test]
    fn scales_byte_components() {
        let color = Rgba::from_components(&[255.0, 0.0, 0.5]).unwrap();
        assert_eq!(color, Rgba([1.0, 0.0, 0.5, 1.0]));
        assert!(Rgba::from_components(&[0.5, 0.5]).is_err());
        assert!(Rgba::from_components(&[-0.5, 0.0, 0.0]).is_err());
    }

    #[test]
    fn rejects_default_outside_range() {
        let raw: RawParam = serde_json::from_str(
            r#"{"name": "scale", "display_name": "Scale", "param_type": "float", "min": 0.0, "max": 1.0, "default": 2.0}"#,
        )
        .unwrap();
        assert!(raw.into_param().unwrap_err().contains("outside range"));
    }

    #[test]
    fn integer_json_is_accepted_for_float_ranges() {
        let raw: RawParam = serde_json::from_str(
            r#"{"name": "freq", "display_name": "Frequency", "param_type": "float", "min": 1, "max": 100, "logarithmic": true, "default": 10}"#,
        )
        .unwrap();
        let param = raw.into_param().unwrap();
        assert_eq!(param.kind.default_value(), ParamValue::Float(10.0));
    }
}
