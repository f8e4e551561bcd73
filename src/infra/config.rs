use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{AppContext, InitArgs};

/// Config files probed in the working directory, first hit wins
pub const CONFIG_FILES: [&str; 4] =
    ["gitvision.toml", ".gitvision.toml", "gitvision.yaml", "gitvision.json"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Handler scan and candidate selection
    pub resolver: ResolverConfig,

    /// Buffer editing and persistence
    pub editing: EditingConfig,

    /// External programs and workspace root
    pub executor: ExecutorConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig
{
    pub min_confidence: f64,
    pub disabled_handlers: Vec<String>,
    pub short_circuit: bool,
    pub strict_ties: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditingConfig
{
    pub strip_ansi: bool,
    pub preserve_line_endings: bool,
    pub diff_context: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig
{
    pub git_program: String,
    pub host_program: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,
}

impl Default for ResolverConfig
{
    fn default() -> Self
    {
        Self {
            min_confidence: 0.7,
            disabled_handlers: Vec::new(),
            short_circuit: true,
            strict_ties: false,
        }
    }
}

impl Default for EditingConfig
{
    fn default() -> Self
    {
        Self { strip_ansi: true, preserve_line_endings: true, diff_context: 3 }
    }
}

impl Default for ExecutorConfig
{
    fn default() -> Self
    {
        Self { git_program: "git".to_string(), host_program: "gh".to_string(), workspace_root: None }
    }
}

/// Load defaults, then the first config file found (or `explicit`), then
/// `GITVISION_*` environment overrides
pub fn load_config(explicit: Option<&Path>) -> Result<Config>
{
    load_config_from(explicit, Path::new("."))
}

pub fn load_config_from(
    explicit: Option<&Path>,
    dir: &Path,
) -> Result<Config>
{
    let defaults =
        config::Config::try_from(&Config::default()).context("Failed to seed default configuration")?;
    let mut builder = config::Config::builder().add_source(defaults);

    match explicit
    {
        Some(path) =>
        {
            if !path.exists()
            {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            builder = builder.add_source(config::File::from(path));
        }
        None =>
        {
            for name in &CONFIG_FILES
            {
                let path = dir.join(name);
                if path.exists()
                {
                    builder = builder.add_source(config::File::from(path.as_path()));
                    break;
                }
            }
        }
    }

    // GITVISION_RESOLVER__MIN_CONFIDENCE=0.8
    builder = builder.add_source(
        config::Environment::with_prefix("GITVISION")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("resolver.disabled_handlers"),
    );

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join(CONFIG_FILES[0]);

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let config = Config::default();
    let toml_string =
        toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_defaults_serialize_to_toml()
    {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(text.contains("[resolver]"));
        assert!(text.contains("min_confidence = 0.7"));
        assert!(text.contains("git_program = \"git\""));
        assert!(!text.contains("workspace_root"));

        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back, Config::default());
    }

    #[test]
    fn test_file_overrides_defaults()
    {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".gitvision.toml"),
            "[resolver]\nstrict_ties = true\ndisabled_handlers = [\"host\"]\n",
        )
        .unwrap();

        let cfg = load_config_from(None, dir.path()).unwrap();
        assert!(cfg.resolver.strict_ties);
        assert_eq!(cfg.resolver.disabled_handlers, vec!["host".to_string()]);
        // Untouched keys keep their defaults
        assert!(cfg.resolver.short_circuit);
        assert_eq!(cfg.editing.diff_context, 3);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error()
    {
        let err = load_config(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
