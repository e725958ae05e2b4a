//! Credentials and settings, from `~/.tfdr/config.yaml` and the environment.

use std::{
    fs,
    io::{BufRead, Write},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tfdr_cloud::{TfeSettings, DEFAULT_HOSTNAME};

const CONFIG_DIR: &str = ".tfdr";
const CONFIG_FILE: &str = "config.yaml";

const ENV_TOKEN: &str = "TF_TEAM_TOKEN";
const ENV_ORGANIZATION: &str = "TF_ORG_NAME";
const ENV_HOSTNAME: &str = "TF_HOSTNAME";
const ENV_LOG_LEVEL: &str = "TF_STATE_COPY_LOG_LEVEL";

const REDACTED: &str = "<redacted>";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Configuration {
    pub tf_team_token: String,
    pub tf_org_name: String,
    pub tf_hostname: String,
    #[serde(rename = "tf_state_copy_log_level")]
    pub log_level: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            tf_team_token: String::new(),
            tf_org_name: String::new(),
            tf_hostname: DEFAULT_HOSTNAME.to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Configuration {
    /// Defaults, overridden by the config file, overridden by the environment.
    ///
    /// An explicitly given file must exist. Otherwise `~/.tfdr/config.yaml`
    /// and `./config.yaml` are tried, and having neither is fine.
    pub fn load(explicit: Option<&Path>) -> Result<Configuration> {
        let file = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => candidate_paths().into_iter().find(|p| p.is_file()),
        };
        let mut config = match file {
            Some(path) => {
                tracing::debug!(path = %path.display(), "reading configuration");
                Self::from_file(&path)?
            }
            None => Configuration::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Configuration> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        if contents.trim().is_empty() {
            return Ok(Configuration::default());
        }
        serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing config file {}", path.display()))
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let fields = [
            (ENV_TOKEN, &mut self.tf_team_token),
            (ENV_ORGANIZATION, &mut self.tf_org_name),
            (ENV_HOSTNAME, &mut self.tf_hostname),
            (ENV_LOG_LEVEL, &mut self.log_level),
        ];
        for (key, field) in fields {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *field = value;
            }
        }
    }

    /// Check that the credentials needed for any remote operation are present.
    pub fn validate(&self) -> Result<()> {
        if self.tf_team_token.trim().is_empty() {
            bail!(
                "Terraform team token is required; set {} or run `tfdr config new`",
                ENV_TOKEN
            );
        }
        if self.tf_org_name.trim().is_empty() {
            bail!(
                "Terraform organization name is required; set {} or run `tfdr config new`",
                ENV_ORGANIZATION
            );
        }
        Ok(())
    }

    /// A copy that is safe to print.
    pub fn redacted(&self) -> Configuration {
        let mut c = self.clone();
        if !c.tf_team_token.is_empty() {
            c.tf_team_token = REDACTED.to_string();
        }
        c
    }

    /// The configured log level, using logrus-style names. Unknown names
    /// mean `info`.
    pub fn log_level(&self) -> tracing::Level {
        match self.log_level.trim().to_ascii_lowercase().as_str() {
            "trace" => tracing::Level::TRACE,
            "debug" => tracing::Level::DEBUG,
            "warn" | "warning" => tracing::Level::WARN,
            "error" | "fatal" | "panic" => tracing::Level::ERROR,
            _ => tracing::Level::INFO,
        }
    }

    pub fn tfe_settings(&self) -> TfeSettings {
        TfeSettings {
            address: self.tf_hostname.clone(),
            token: self.tf_team_token.clone(),
            organization: self.tf_org_name.clone(),
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("serializing configuration")
    }

    /// Write the configuration, creating the parent directory. The file holds
    /// a token, so on Unix it is only readable by the owner.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {}", parent.display()))?;
        }
        fs::write(path, self.to_yaml()?)
            .with_context(|| format!("writing config file {}", path.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt as _;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))
                .with_context(|| format!("restricting permissions of {}", path.display()))?;
        }
        Ok(())
    }
}

/// `~/.tfdr/config.yaml`
pub(crate) fn default_config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("unable to determine home directory")?;
    Ok(home.join(CONFIG_DIR).join(CONFIG_FILE))
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::with_capacity(2);
    if let Ok(path) = default_config_path() {
        paths.push(path);
    }
    paths.push(PathBuf::from(CONFIG_FILE));
    paths
}

/// Ask for the credentials. Settings other than the credentials keep their
/// defaults.
pub(crate) fn prompt_new(input: &mut impl BufRead, output: &mut impl Write) -> Result<Configuration> {
    let tf_team_token = prompt(input, output, "Enter Terraform team token: ")?;
    let tf_org_name = prompt(input, output, "Enter Terraform org name: ")?;
    Ok(Configuration {
        tf_team_token,
        tf_org_name,
        ..Configuration::default()
    })
}

/// Ask whether to overwrite an existing file. An empty answer means yes.
pub(crate) fn confirm_overwrite(
    input: &mut impl BufRead,
    output: &mut impl Write,
    path: &Path,
) -> Result<bool> {
    let answer = prompt(
        input,
        output,
        &format!("Config file ({}) found, overwrite? [Y/n] ", path.display()),
    )?;
    Ok(matches!(answer.to_ascii_lowercase().as_str(), "" | "y" | "yes"))
}

fn prompt(input: &mut impl BufRead, output: &mut impl Write, question: &str) -> Result<String> {
    output.write_all(question.as_bytes())?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line).context("reading answer")?;
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_defaults() {
        let c = Configuration::default();
        assert_eq!(c.tf_hostname, "app.terraform.io");
        assert_eq!(c.log_level(), tracing::Level::INFO);
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "tf_team_token: abc\ntf_org_name: acme\ntf_state_copy_log_level: debug\n",
        )
        .unwrap();
        let c = Configuration::from_file(&path).unwrap();
        assert_eq!(c.tf_team_token, "abc");
        assert_eq!(c.tf_org_name, "acme");
        assert_eq!(c.tf_hostname, "app.terraform.io");
        assert_eq!(c.log_level(), tracing::Level::DEBUG);
        c.validate().unwrap();
    }

    #[test]
    fn test_empty_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "\n").unwrap();
        assert_eq!(
            Configuration::from_file(&path).unwrap(),
            Configuration::default()
        );
    }

    #[test]
    fn test_explicit_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Configuration::load(Some(&dir.path().join("missing.yaml"))).is_err());
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "tf_team_token: [unclosed\n").unwrap();
        assert!(Configuration::from_file(&path).is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut c = Configuration {
            tf_team_token: "from-file".to_string(),
            tf_org_name: "file-org".to_string(),
            ..Configuration::default()
        };
        let env: BTreeMap<&str, &str> = [
            ("TF_TEAM_TOKEN", "from-env"),
            ("TF_HOSTNAME", "tfe.example.com"),
            ("TF_ORG_NAME", ""),
        ]
        .into_iter()
        .collect();
        c.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(c.tf_team_token, "from-env");
        // empty variables do not override
        assert_eq!(c.tf_org_name, "file-org");
        assert_eq!(c.tf_hostname, "tfe.example.com");
        assert_eq!(c.log_level, "info");
    }

    #[test]
    fn test_validate() {
        let c = Configuration {
            tf_team_token: "abc".to_string(),
            ..Configuration::default()
        };
        let err = c.validate().unwrap_err();
        assert!(err.to_string().contains("organization"));

        let c = Configuration {
            tf_org_name: "acme".to_string(),
            ..Configuration::default()
        };
        let err = c.validate().unwrap_err();
        assert!(err.to_string().contains("token"));
    }

    #[test]
    fn test_log_level_names() {
        let level = |name: &str| {
            Configuration {
                log_level: name.to_string(),
                ..Configuration::default()
            }
            .log_level()
        };
        assert_eq!(level("TRACE"), tracing::Level::TRACE);
        assert_eq!(level("warning"), tracing::Level::WARN);
        assert_eq!(level("fatal"), tracing::Level::ERROR);
        assert_eq!(level("nonsense"), tracing::Level::INFO);
    }

    #[test]
    fn test_redacted() {
        let c = Configuration {
            tf_team_token: "secret".to_string(),
            tf_org_name: "acme".to_string(),
            ..Configuration::default()
        };
        let yaml = c.redacted().to_yaml().unwrap();
        assert!(!yaml.contains("secret"));
        assert!(yaml.contains("acme"));
        assert_eq!(Configuration::default().redacted().tf_team_token, "");
    }

    #[test]
    fn test_prompt_new_and_save() {
        let mut input = "  tok-123 \nacme\n".as_bytes();
        let mut output = Vec::new();
        let c = prompt_new(&mut input, &mut output).unwrap();
        assert_eq!(c.tf_team_token, "tok-123");
        assert_eq!(c.tf_org_name, "acme");
        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("team token"));
        assert!(shown.contains("org name"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".tfdr").join("config.yaml");
        c.save(&path).unwrap();
        assert_eq!(Configuration::from_file(&path).unwrap(), c);
    }

    #[test]
    fn test_confirm_overwrite() {
        let path = Path::new("/tmp/config.yaml");
        let answer = |s: &str| confirm_overwrite(&mut s.as_bytes(), &mut Vec::new(), path).unwrap();
        assert!(answer("\n"));
        assert!(answer("Y\n"));
        assert!(answer("yes\n"));
        assert!(!answer("n\n"));
        assert!(!answer("nope\n"));
    }
}
