use crate::config::AppConfig;
use crate::render::{BuildPolicy, ShaderError};
use clap::Parser;
use std::path::PathBuf;

/// Draw a triangle with shaders loaded from disk.
#[derive(Debug, Parser)]
#[command(name = "gltriangle", version, about)]
pub struct Cli {
    /// Config file to use instead of the one in the platform config directory.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Vertex shader source.
    #[arg(long, value_name = "PATH")]
    pub vertex: Option<PathBuf>,

    /// Fragment shader source.
    #[arg(long, value_name = "PATH")]
    pub fragment: Option<PathBuf>,

    /// Keep running with a broken shader program instead of exiting.
    #[arg(long)]
    pub lenient: bool,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl Cli {
    /// Command-line values win over whatever the config file says.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(vertex) = &self.vertex {
            config.render.vertex_shader = vertex.clone();
        }
        if let Some(fragment) = &self.fragment {
            config.render.fragment_shader = fragment.clone();
        }
        if self.lenient {
            config.render.build_policy = BuildPolicy::LogAndContinue;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
    }
}

/// One-line report for an error that ended startup. Shader failures were
/// already logged with their info log and source where they happened, so only
/// the outer context is kept for them.
pub fn startup_failure_message(err: &anyhow::Error) -> String {
    if err.downcast_ref::<ShaderError>().is_some() {
        err.to_string()
    } else {
        format!("{err:#}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_no_flags_leave_config_alone() {
        let cli = Cli::try_parse_from(["gltriangle"]).unwrap();
        let mut config = AppConfig::default();
        cli.apply(&mut config);
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "gltriangle",
            "--vertex",
            "shader1.vert",
            "--fragment",
            "shader1.frag",
            "--lenient",
            "--log-level",
            "debug",
        ])
        .unwrap();
        let mut config = AppConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.render.vertex_shader, PathBuf::from("shader1.vert"));
        assert_eq!(config.render.fragment_shader, PathBuf::from("shader1.frag"));
        assert_eq!(config.render.build_policy, BuildPolicy::LogAndContinue);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_rejects_unknown_flag() {
        assert!(Cli::try_parse_from(["gltriangle", "--fullscreen"]).is_err());
    }

    #[test]
    fn test_shader_failure_summary_skips_logged_details() {
        let err = Err::<(), _>(ShaderError::Linking {
            log: "ERROR: type mismatch for 'color'".to_string(),
        })
        .context("Failed to build shader program")
        .unwrap_err();

        assert_eq!(startup_failure_message(&err), "Failed to build shader program");
    }

    #[test]
    fn test_other_failures_keep_their_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = Err::<(), _>(io)
            .context("Failed to read config file")
            .unwrap_err();

        assert_eq!(
            startup_failure_message(&err),
            "Failed to read config file: no such file"
        );
    }
}
