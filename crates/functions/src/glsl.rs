//! GLSL snippets derived from function metadata. Every parameter becomes a
//! uniform named `u_[prefix_]category_param`.
use crate::param::{FunctionParam, ParamKind};
use crate::registry::FunctionInfo;

pub fn glsl_type(kind: &ParamKind) -> &'static str {
    match kind {
        ParamKind::Int { .. } => "int",
        ParamKind::Float { .. } => "float",
        ParamKind::Color { .. } => "vec4",
    }
}

pub fn uniform_name(param: &str, category: &str, prefix: Option<&str>) -> String {
    match prefix {
        Some(prefix) => format!("u_{prefix}_{category}_{param}"),
        None => format!("u_{category}_{param}"),
    }
}

pub fn uniform_names(function: &FunctionInfo, prefix: Option<&str>) -> Vec<String> {
    function
        .params
        .iter()
        .map(|param| uniform_name(&param.name, &function.category, prefix))
        .collect()
}

pub fn uniform_declaration(param: &FunctionParam, function: &FunctionInfo, prefix: Option<&str>) -> String {
    format!(
        "uniform {} {};",
        glsl_type(&param.kind),
        uniform_name(&param.name, &function.category, prefix)
    )
}

/// One declaration per parameter, newline separated.
pub fn uniform_declarations(function: &FunctionInfo, prefix: Option<&str>) -> String {
    function
        .params
        .iter()
        .map(|param| uniform_declaration(param, function, prefix))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Uniform names as a call argument list. With `leading_comma` a non-empty
/// list starts with `, ` so it can follow fixed arguments.
pub fn call_arguments(function: &FunctionInfo, leading_comma: bool, prefix: Option<&str>) -> String {
    let args = uniform_names(function, prefix).join(", ");
    if leading_comma && !args.is_empty() {
        format!(", {args}")
    } else {
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::Rgba;

    fn blend() -> FunctionInfo {
        FunctionInfo {
            name: "mix".into(),
            display_name: "Mix".into(),
            category: "blend".into(),
            params: vec![
                FunctionParam {
                    name: "ratio".into(),
                    display_name: "Ratio".into(),
                    kind: ParamKind::Float {
                        min: 0.0,
                        max: 1.0,
                        logarithmic: false,
                        default: 0.5,
                    },
                },
                FunctionParam {
                    name: "color".into(),
                    display_name: "Color".into(),
                    kind: ParamKind::Color {
                        default: Rgba([0.0, 0.0, 0.0, 1.0]),
                    },
                },
            ],
            groups: Vec::new(),
        }
    }

    #[test]
    fn names_uniforms_with_optional_prefix() {
        assert_eq!(uniform_name("speed", "warp", None), "u_warp_speed");
        assert_eq!(uniform_name("speed", "warp", Some("fb")), "u_fb_warp_speed");
    }

    #[test]
    fn declares_one_uniform_per_line() {
        assert_eq!(
            uniform_declarations(&blend(), None),
            "uniform float u_blend_ratio;\nuniform vec4 u_blend_color;"
        );
    }

    #[test]
    fn joins_call_arguments() {
        let function = blend();
        assert_eq!(call_arguments(&function, false, None), "u_blend_ratio, u_blend_color");
        assert_eq!(call_arguments(&function, true, Some("fb")), ", u_fb_blend_ratio, u_fb_blend_color");

        let empty = FunctionInfo {
            params: Vec::new(),
            ..function
        };
        assert_eq!(call_arguments(&empty, true, None), "");
    }
}
