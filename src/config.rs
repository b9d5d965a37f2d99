use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{glog_debug, Error, Result};

/// Default config file looked up in the working directory.
pub const CONFIG_FILE: &str = "gantry.toml";

/// Build environment.
///
/// Controls whether dependency directories are installed fresh (`production`)
/// or symlinked from the scope's source tree (`development`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Environment {
    Production,
    Development,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Development => "development",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "production" => Ok(Environment::Production),
            "development" => Ok(Environment::Development),
            other => Err(Error::Config(format!(
                "Unknown environment '{}'... choose either 'production' or 'development'.",
                other
            ))),
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Environment> for String {
    fn from(env: Environment) -> Self {
        env.as_str().to_string()
    }
}

/// Where a scope's dependency directory comes from and where it should appear.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeModules {
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StylesheetSettings {
    pub files_to_clean: Vec<String>,
    #[serde(default)]
    pub enable_minification: bool,
    pub sass_dir: PathBuf,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BundleSettings {
    #[serde(default)]
    pub enabled: bool,
    pub entry_file: PathBuf,
    pub bundle_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientJavascript {
    pub files_to_clean: Vec<String>,
    pub tsconfig: PathBuf,
    pub output_dir: PathBuf,
    #[serde(default)]
    pub enable_minification: bool,
    #[serde(default)]
    pub enable_uglification: bool,
    pub webpack: BundleSettings,
    pub node_modules: NodeModules,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientSettings {
    pub source_dir: PathBuf,
    pub dist_dir: PathBuf,
    pub stylesheets: StylesheetSettings,
    pub javascript: ClientJavascript,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerJavascript {
    pub files_to_clean: Vec<String>,
    pub tsconfig: PathBuf,
    pub output_dir: PathBuf,
    pub node_modules: NodeModules,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSettings {
    pub source_dir: PathBuf,
    pub dist_dir: PathBuf,
    pub javascript: ServerJavascript,
    /// Source file → destination file, copied on every build.
    #[serde(default)]
    pub copy: BTreeMap<String, String>,
}

/// An external command template. Arguments may contain `{placeholder}` tokens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolCommand {
    fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolSettings {
    pub sass: ToolCommand,
    pub css_minifier: ToolCommand,
    pub typescript: ToolCommand,
    pub bundler: ToolCommand,
    pub minifier: ToolCommand,
    pub npm: ToolCommand,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            sass: ToolCommand::new("sass", &["--source-map", "{input}:{output}"]),
            css_minifier: ToolCommand::new("cleancss", &["--batch", "--batch-suffix", "", "{input}"]),
            typescript: ToolCommand::new("tsc", &["--project", "{tsconfig}", "--outDir", "{output}"]),
            bundler: ToolCommand::new(
                "webpack",
                &["--mode", "{mode}", "--entry", "{entry}", "--output-path", "{output}", "--output-filename", "{bundle}"],
            ),
            minifier: ToolCommand::new("terser", &["{input}", "{compress}", "{mangle}", "--output", "{input}"]),
            npm: ToolCommand::new("npm", &["install", "--prefix", "{prefix}"]),
        }
    }
}

fn default_tool_timeout_secs() -> u64 {
    600
}

/// Full build settings, usually read from `gantry.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    pub environment: Environment,
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    pub client: ClientSettings,
    pub server: ServerSettings,
    #[serde(default)]
    pub tools: ToolSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            tool_timeout_secs: default_tool_timeout_secs(),
            client: ClientSettings {
                source_dir: "client/".into(),
                dist_dir: "dist/serve/".into(),
                stylesheets: StylesheetSettings {
                    files_to_clean: vec![
                        "dist/serve/css/**/*.css".into(),
                        "dist/serve/css/**/*.css.map".into(),
                        "dist/serve/css/".into(),
                    ],
                    enable_minification: true,
                    sass_dir: "client/styles".into(),
                    output_dir: "dist/serve/css".into(),
                },
                javascript: ClientJavascript {
                    files_to_clean: vec![
                        "dist/serve/js/**/*.js".into(),
                        "dist/serve/js/**/*.js.map".into(),
                        "dist/serve/js/".into(),
                        "dist/serve/node_modules/".into(),
                    ],
                    tsconfig: "client/ts/tsconfig.json".into(),
                    output_dir: "dist/serve/js/".into(),
                    enable_minification: false,
                    enable_uglification: false,
                    webpack: BundleSettings {
                        enabled: true,
                        entry_file: "dist/serve/js/main.js".into(),
                        bundle_file: "dist/serve/js/bundle.js".into(),
                    },
                    node_modules: NodeModules {
                        source_dir: "client/node_modules/".into(),
                        output_dir: "dist/serve/node_modules/".into(),
                    },
                },
            },
            server: ServerSettings {
                source_dir: "server/".into(),
                dist_dir: "dist/".into(),
                javascript: ServerJavascript {
                    files_to_clean: vec![
                        "dist/**/*.js".into(),
                        "dist/**/*.js.map".into(),
                        "dist/node_modules/".into(),
                        "!dist/serve/**".into(),
                    ],
                    tsconfig: "server/tsconfig.json".into(),
                    output_dir: "dist/".into(),
                    node_modules: NodeModules {
                        source_dir: "server/node_modules/".into(),
                        output_dir: "dist/node_modules/".into(),
                    },
                },
                copy: BTreeMap::from([
                    ("server/settings.json".to_string(), "dist/settings.json".to_string()),
                    ("server/credentials.json".to_string(), "dist/credentials.json".to_string()),
                ]),
            },
            tools: ToolSettings::default(),
        }
    }
}

impl Settings {
    /// Parse and validate settings from TOML text.
    ///
    /// Any parse failure, including an unknown `environment`, is a
    /// [`Error::Config`].
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: Self = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from `path`, or from `gantry.toml` in `root` when no path
    /// is given. A missing default file yields [`Settings::default`]; a missing
    /// explicit file is an error.
    pub fn load(root: &Path, path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (root.join(p), true),
            None => (root.join(CONFIG_FILE), false),
        };
        glog_debug!("Settings::load path={}", path.display());
        if !path.exists() {
            if explicit {
                return Err(Error::Config(format!(
                    "config file '{}' does not exist",
                    path.display()
                )));
            }
            glog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let text = fs::read_to_string(&path).map_err(|source| Error::Read {
            path: path.clone(),
            source,
        })?;
        let settings = Self::from_toml_str(&text)?;
        glog_debug!(
            "Settings loaded: environment={}, copy entries={}",
            settings.environment,
            settings.server.copy.len()
        );
        Ok(settings)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Reject values that would only fail once tasks are already running.
    pub fn validate(&self) -> Result<()> {
        let tools = [
            ("sass", &self.tools.sass),
            ("css_minifier", &self.tools.css_minifier),
            ("typescript", &self.tools.typescript),
            ("bundler", &self.tools.bundler),
            ("minifier", &self.tools.minifier),
            ("npm", &self.tools.npm),
        ];
        for (name, tool) in tools {
            if tool.program.trim().is_empty() {
                return Err(Error::Config(format!("tools.{}.program cannot be empty", name)));
            }
        }
        for (source, destination) in &self.server.copy {
            if source.is_empty() || destination.is_empty() {
                return Err(Error::Config(format!(
                    "server.copy entry '{}' -> '{}' has an empty path",
                    source, destination
                )));
            }
        }
        if self.tool_timeout_secs == 0 {
            return Err(Error::Config("tool_timeout_secs must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}
