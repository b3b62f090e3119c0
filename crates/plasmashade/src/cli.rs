use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "plasmashade",
    author,
    version,
    about = "Assemble and check templated plasma fractal shaders"
)]
pub struct Cli {
    /// Configuration file; defaults to `plasmashade.toml` in the config directory.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Shader template directory, overriding `shaders.root`.
    #[arg(long, global = true, value_name = "DIR")]
    pub shaders: Option<PathBuf>,

    /// Log at debug level (also turns on resolver debug markers unless configured).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the resolved source of one template.
    Resolve(ResolveArgs),
    /// Compile configured variants and report mapped diagnostics.
    Check(CheckArgs),
    /// List the functions of a registry with their generated uniforms.
    Functions(FunctionsArgs),
}

#[derive(Parser, Debug)]
pub struct ResolveArgs {
    /// Template name relative to the shader root (e.g. `fragment_shader.glsl`).
    #[arg(value_name = "TEMPLATE")]
    pub template: String,

    /// Template argument; repeat for several.
    #[arg(short = 'a', long = "arg", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub args: Vec<(String, String)>,

    /// Prefix every line with its originating `file:line`.
    #[arg(long)]
    pub provenance: bool,

    /// Bracket inlined files with marker comments.
    #[arg(long)]
    pub debug_markers: bool,
}

#[derive(Parser, Debug, Default)]
pub struct CheckArgs {
    /// Only check the named variant; repeat for several.
    #[arg(long = "variant", value_name = "NAME")]
    pub variants: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct FunctionsArgs {
    /// Registry category from the config, or a path to a registry JSON file.
    #[arg(value_name = "REGISTRY")]
    pub registry: String,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_key_value(value: &str) -> Result<(String, String), String> {
    let (key, val) = value
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{value}'"))?;
    let key = key.trim();
    if key.is_empty() || !key.chars().all(|ch| ch.is_alphanumeric() || ch == '_') {
        return Err(format!(
            "invalid argument key '{key}'; use letters, digits or '_'"
        ));
    }
    Ok((key.to_string(), val.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_value_pairs() {
        assert_eq!(
            parse_key_value("NOISE_FUNC=perlin").unwrap(),
            ("NOISE_FUNC".to_string(), "perlin".to_string())
        );
        assert_eq!(
            parse_key_value("EXPR=a=b").unwrap(),
            ("EXPR".to_string(), "a=b".to_string())
        );
        assert!(parse_key_value("missing").is_err());
        assert!(parse_key_value("bad key=1").is_err());
    }

    #[test]
    fn parses_resolve_command() {
        let cli = Cli::try_parse_from([
            "plasmashade",
            "--verbose",
            "resolve",
            "fragment_shader.glsl",
            "-a",
            "OCTAVES=4",
            "--provenance",
        ])
        .unwrap();
        assert!(cli.verbose);
        let Command::Resolve(args) = cli.command else {
            panic!("expected resolve");
        };
        assert_eq!(args.args, vec![("OCTAVES".to_string(), "4".to_string())]);
        assert!(args.provenance);
    }
}
