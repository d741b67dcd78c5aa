use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use config::{Config, Environment, File, FileFormat};
use miette::{Context, IntoDiagnostic, Result};
use serde::Deserialize;

/// Prefix of the environment variables overriding the settings file
pub const ENV_PREFIX: &str = "TUBEFETCH";

/// Settings that can be overridden by a `TUBEFETCH_<KEY>` variable.
/// Other `TUBEFETCH_*` variables belong to the command line.
const SETTING_KEYS: [&str; 7] = [
    "output_dir",
    "downloader",
    "search_ttl_secs",
    "default_count",
    "more_count",
    "editor",
    "log_level",
];

/// Settings file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "tubefetch.toml";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Where downloaded files are written
    pub output_dir: PathBuf,

    /// Downloader program to use. Auto-detected when absent
    pub downloader: Option<String>,

    /// How long a search stays memoized
    pub search_ttl_secs: u64,

    /// Number of results of a new search
    pub default_count: usize,

    /// Number of results added by "more"
    pub more_count: usize,

    /// Program started by the "open vs code" command
    pub editor: String,

    /// Log level used when no `-v` flag is given
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("downloads"),
            downloader: None,
            search_ttl_secs: 300,
            default_count: 3,
            more_count: 2,
            editor: "code".to_owned(),
            log_level: "warn".to_owned(),
        }
    }
}

impl Settings {
    /// Merge the defaults, the settings file and the environment, in that order.
    ///
    /// A missing settings file is fine unless it was explicitly asked for.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).format(FileFormat::Toml).required(true),
            None => File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false),
        };

        let env =
            Environment::with_prefix(ENV_PREFIX).source(Some(settings_env(std::env::vars())));
        Self::from_sources(file, env)
    }

    fn from_sources<F, E>(file: F, env: E) -> Result<Self>
    where
        F: config::Source + Send + Sync + 'static,
        E: config::Source + Send + Sync + 'static,
    {
        Config::builder()
            .add_source(file)
            .add_source(env)
            .build()
            .into_diagnostic()
            .wrap_err("Could not read the settings")?
            .try_deserialize()
            .into_diagnostic()
            .wrap_err("Invalid settings")
    }
}

/// Keep the `TUBEFETCH_*` variables naming a setting
fn settings_env(vars: impl Iterator<Item = (String, String)>) -> HashMap<String, String> {
    let prefix = format!("{ENV_PREFIX}_");
    vars.filter(|(name, _)| {
        name.strip_prefix(&prefix)
            .is_some_and(|key| SETTING_KEYS.contains(&key.to_lowercase().as_str()))
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    fn no_env() -> Environment {
        Environment::with_prefix(ENV_PREFIX).source(Some(HashMap::new()))
    }

    #[test]
    fn defaults_without_any_source() {
        let settings = Settings::from_sources(
            File::from_str("", FileFormat::Toml),
            no_env(),
        )
        .unwrap();

        assert_eq!(settings, Settings::default());
        assert_eq!(settings.search_ttl_secs, 300);
    }

    #[test]
    fn file_overrides_defaults() {
        let toml = indoc! {r#"
            output_dir = "/tmp/media"
            downloader = "youtube-dl"
            default_count = 5
        "#};

        let settings =
            Settings::from_sources(File::from_str(toml, FileFormat::Toml), no_env()).unwrap();

        assert_eq!(settings.output_dir, PathBuf::from("/tmp/media"));
        assert_eq!(settings.downloader.as_deref(), Some("youtube-dl"));
        assert_eq!(settings.default_count, 5);
        assert_eq!(settings.more_count, 2);
    }

    #[test]
    fn environment_overrides_file() {
        let env = Environment::with_prefix(ENV_PREFIX).source(Some(HashMap::from([(
            "TUBEFETCH_EDITOR".to_owned(),
            "nvim".to_owned(),
        )])));

        let settings = Settings::from_sources(
            File::from_str(r#"editor = "cursor""#, FileFormat::Toml),
            env,
        )
        .unwrap();

        assert_eq!(settings.editor, "nvim");
    }

    #[test]
    fn command_line_variables_are_not_settings() {
        let vars = [
            ("TUBEFETCH_OUTPUT_DIR", "/srv/media"),
            ("TUBEFETCH_QUALITY", "720p"),
            ("TUBEFETCH_FORMAT", "video"),
            ("TUBEFETCH_CONFIG", "other.toml"),
            ("HOME", "/root"),
        ]
        .map(|(name, value)| (name.to_owned(), value.to_owned()));

        let kept = settings_env(vars.into_iter());
        assert_eq!(
            kept,
            HashMap::from([("TUBEFETCH_OUTPUT_DIR".to_owned(), "/srv/media".to_owned())])
        );

        let env = Environment::with_prefix(ENV_PREFIX).source(Some(kept));
        let settings = Settings::from_sources(File::from_str("", FileFormat::Toml), env).unwrap();
        assert_eq!(settings.output_dir, PathBuf::from("/srv/media"));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        assert!(Settings::load(Some(Path::new("/definitely/not/here.toml"))).is_err());
    }
}
