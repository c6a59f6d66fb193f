//! Settings resolution for a sample directory.
//!
//! Precedence, highest first: command line flags (and their `SST_*`
//! environment fallbacks), the TOML config file, built-in defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::debug;

use readme::EnvLookup;
use readme::compiler::{expand_env, unset_placeholders};
use readme::parser::DEFAULT_TAG;

/// Config file looked up in the sample directory when `--config` is absent.
pub const CONFIG_FILE: &str = "sst.toml";

pub const DEFAULT_README: &str = "README.md";

/// Registry prefix used to build the default image reference.
pub const DEFAULT_REGISTRY: &str = "gcr.io/${GOOGLE_CLOUD_PROJECT}";

/// Contents of `sst.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// README path, relative to the sample directory.
    pub readme: Option<PathBuf>,
    pub service: Option<String>,
    pub image: Option<String>,
    /// Registry prefix for the generated image reference; `${NAME}` is expanded.
    pub registry: Option<String>,
    /// Code tag payload.
    pub tag: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config '{}'", path.display()))?;
        toml::from_str(&text).with_context(|| format!("invalid config '{}'", path.display()))
    }
}

/// Values given on the command line.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub service: Option<String>,
    pub image: Option<String>,
    pub config: Option<PathBuf>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub sample_dir: PathBuf,
    pub readme: PathBuf,
    pub service: String,
    pub image: String,
    pub tag: String,
}

impl Settings {
    /// `target` is either the sample directory or a README inside it.
    pub fn resolve(target: &Path, overrides: &Overrides, env: &dyn EnvLookup) -> Result<Self> {
        let target = std::path::absolute(target)
            .with_context(|| format!("cannot resolve '{}'", target.display()))?;
        let (sample_dir, readme_arg) = if target.is_dir() {
            (target, None)
        } else {
            let dir = target
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            (dir, Some(target))
        };

        let FileConfig {
            readme,
            service,
            image,
            registry,
            tag,
        } = match &overrides.config {
            Some(path) => FileConfig::load(path)?,
            None => {
                let path = sample_dir.join(CONFIG_FILE);
                if path.is_file() {
                    debug!(path = %path.display(), "loading config");
                    FileConfig::load(&path)?
                } else {
                    FileConfig::default()
                }
            }
        };

        let readme = readme_arg
            .or_else(|| readme.map(|r| sample_dir.join(r)))
            .unwrap_or_else(|| sample_dir.join(DEFAULT_README));

        let service = overrides
            .service
            .clone()
            .or(service)
            .unwrap_or_else(|| generate_service_name(&sample_dir));

        let image = match overrides.image.clone().or(image) {
            Some(image) => image,
            None => {
                let template = registry.as_deref().unwrap_or(DEFAULT_REGISTRY);
                let unset = unset_placeholders(template, env);
                if !unset.is_empty() {
                    bail!(
                        "registry '{}' needs {} to be set (or pass --image)",
                        template,
                        unset.join(", ")
                    );
                }
                let registry = expand_env(template, env);
                format!("{}/{}", registry.trim_end_matches('/'), service)
            }
        };

        Ok(Settings {
            sample_dir,
            readme,
            service,
            image,
            tag: tag.unwrap_or_else(|| DEFAULT_TAG.to_string()),
        })
    }
}

/// `<sanitized directory name>-<8 random hex digits>`.
pub fn generate_service_name(sample_dir: &Path) -> String {
    let base: String = sample_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let mut base = base.trim_matches('-').to_string();
    base.truncate(50);
    let base = base.trim_end_matches('-');

    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let suffix = &suffix[..8];

    if base.starts_with(|c: char| c.is_ascii_lowercase()) {
        format!("{}-{}", base, suffix)
    } else if base.is_empty() {
        format!("sst-{}", suffix)
    } else {
        format!("sst-{}-{}", base, suffix)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_for_directory() {
        let dir = tempfile::tempdir().unwrap();
        let sample = dir.path().join("Hello_World");
        std::fs::create_dir(&sample).unwrap();

        let env = env(&[("GOOGLE_CLOUD_PROJECT", "my-project")]);
        let settings = Settings::resolve(&sample, &Overrides::default(), &env).unwrap();

        assert_eq!(settings.sample_dir, sample);
        assert_eq!(settings.readme, sample.join("README.md"));
        assert!(settings.service.starts_with("hello-world-"), "{}", settings.service);
        assert_eq!(settings.service.len(), "hello-world-".len() + 8);
        assert_eq!(settings.image, format!("gcr.io/my-project/{}", settings.service));
        assert_eq!(settings.tag, "sst-run-unix");
    }

    #[test]
    fn readme_path_selects_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let readme = dir.path().join("DEPLOY.md");
        std::fs::write(&readme, "").unwrap();

        let overrides = Overrides {
            service: Some("svc".into()),
            image: Some("gcr.io/p/img".into()),
            config: None,
        };
        let settings = Settings::resolve(&readme, &overrides, &env(&[])).unwrap();

        assert_eq!(settings.sample_dir, dir.path());
        assert_eq!(settings.readme, readme);
        assert_eq!(settings.service, "svc");
        assert_eq!(settings.image, "gcr.io/p/img");
    }

    #[test]
    fn config_file_in_sample_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "readme = \"docs/RUN.md\"\nservice = \"from-config\"\nregistry = \"us.gcr.io/${PROJECT}\"\ntag = \"sst-run-custom\"\n",
        )
        .unwrap();

        let env = env(&[("PROJECT", "p1")]);
        let settings = Settings::resolve(dir.path(), &Overrides::default(), &env).unwrap();

        assert_eq!(settings.readme, dir.path().join("docs/RUN.md"));
        assert_eq!(settings.service, "from-config");
        assert_eq!(settings.image, "us.gcr.io/p1/from-config");
        assert_eq!(settings.tag, "sst-run-custom");
    }

    #[test]
    fn flags_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("other.toml");
        std::fs::write(&config, "service = \"from-config\"\nimage = \"gcr.io/a/b\"\n").unwrap();

        let overrides = Overrides {
            service: Some("from-flag".into()),
            image: None,
            config: Some(config),
        };
        let settings = Settings::resolve(dir.path(), &overrides, &env(&[])).unwrap();

        assert_eq!(settings.service, "from-flag");
        assert_eq!(settings.image, "gcr.io/a/b");
    }

    #[test]
    fn unset_registry_variable_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let overrides = Overrides {
            service: Some("svc".into()),
            ..Overrides::default()
        };

        let err = Settings::resolve(dir.path(), &overrides, &env(&[])).unwrap_err();
        assert!(format!("{:#}", err).contains("GOOGLE_CLOUD_PROJECT"), "{:#}", err);

        let empty = env(&[("GOOGLE_CLOUD_PROJECT", "")]);
        assert!(Settings::resolve(dir.path(), &overrides, &empty).is_err());

        // An explicit image needs no registry.
        let overrides = Overrides {
            image: Some("gcr.io/p/img".into()),
            ..overrides
        };
        let settings = Settings::resolve(dir.path(), &overrides, &env(&[])).unwrap();
        assert_eq!(settings.image, "gcr.io/p/img");
    }

    #[test]
    fn unknown_config_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "servce = \"typo\"\n").unwrap();

        let err = Settings::resolve(dir.path(), &Overrides::default(), &env(&[])).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid config"));
    }

    #[test]
    fn service_names_are_sanitized() {
        let name = generate_service_name(Path::new("/samples/123 Go App/"));
        assert!(name.starts_with("sst-123-go-app-"), "{}", name);

        let name = generate_service_name(Path::new("/"));
        assert!(name.starts_with("sst-"), "{}", name);
        assert_eq!(name.len(), "sst-".len() + 8);
    }
}
