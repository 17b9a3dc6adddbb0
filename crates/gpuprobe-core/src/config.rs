//! Telemetry configuration.
//!
//! Tool names, presence-probe strategy and per-invocation timeouts are
//! carried in an explicit [`TelemetryConfig`] that is injected into the
//! detector and every adapter. Nothing here reads global state except
//! [`TelemetryConfig::from_env`].

use std::time::Duration;

use crate::error::ConfigError;

/// Default bound on every child tool invocation.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound accepted by [`TelemetryConfig::validate`].
pub const MAX_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Environment variable overriding the NVIDIA query tool.
pub const ENV_NVIDIA_SMI: &str = "GPUPROBE_NVIDIA_SMI";

/// Environment variable overriding the AMD management tool.
pub const ENV_AMD_SMI: &str = "GPUPROBE_AMD_SMI";

/// Environment variable overriding the per-invocation timeout (milliseconds).
pub const ENV_TIMEOUT_MS: &str = "GPUPROBE_TIMEOUT_MS";

/// How tool presence is checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceProbe {
    /// Resolve the program on `PATH` with a locator command (`which`).
    Locate { locator: String },
    /// Run the program itself with its lightweight metadata arguments.
    Invoke,
}

impl PresenceProbe {
    /// Locate with the given locator command.
    pub fn locate(locator: impl Into<String>) -> Self {
        Self::Locate {
            locator: locator.into(),
        }
    }

    /// The probe used on the current platform.
    ///
    /// POSIX systems locate the tool on `PATH`; Windows has no reliable
    /// `which`, so the tool is invoked directly.
    pub fn platform_default() -> Self {
        if cfg!(windows) {
            Self::Invoke
        } else {
            Self::locate("which")
        }
    }
}

impl Default for PresenceProbe {
    fn default() -> Self {
        Self::platform_default()
    }
}

/// A single vendor command-line tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    /// Program name or absolute path.
    pub program: String,
    /// Arguments for a cheap metadata query, used by [`PresenceProbe::Invoke`].
    pub probe_args: Vec<String>,
}

impl ToolConfig {
    pub fn new(program: impl Into<String>, probe_args: &[&str]) -> Self {
        Self {
            program: program.into(),
            probe_args: probe_args.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// NVIDIA's `nvidia-smi`, probed with `-L` (list GPUs).
    pub fn nvidia_smi() -> Self {
        Self::new("nvidia-smi", &["-L"])
    }

    /// AMD's `amd-smi`, probed with `version`.
    pub fn amd_smi() -> Self {
        Self::new("amd-smi", &["version"])
    }
}

/// Configuration shared by the detector and the adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// NVIDIA tool.
    pub nvidia: ToolConfig,
    /// AMD tool.
    pub amd: ToolConfig,
    /// Presence check strategy.
    pub presence_probe: PresenceProbe,
    /// Bound applied to every child invocation, probes included.
    pub command_timeout: Duration,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            nvidia: ToolConfig::nvidia_smi(),
            amd: ToolConfig::amd_smi(),
            presence_probe: PresenceProbe::platform_default(),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

impl TelemetryConfig {
    /// Build from the process environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config = Self::default();
        if let Some(program) = get(ENV_NVIDIA_SMI) {
            config.nvidia.program = program.trim().to_string();
        }
        if let Some(program) = get(ENV_AMD_SMI) {
            config.amd.program = program.trim().to_string();
        }
        if let Some(raw) = get(ENV_TIMEOUT_MS) {
            let millis: u64 = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    key: ENV_TIMEOUT_MS,
                    value: raw.clone(),
                })?;
            config.command_timeout = Duration::from_millis(millis);
        }

        config.validate()?;
        Ok(config)
    }

    /// Override the NVIDIA tool program.
    #[must_use]
    pub fn with_nvidia_program(mut self, program: impl Into<String>) -> Self {
        self.nvidia.program = program.into();
        self
    }

    /// Override the AMD tool program.
    #[must_use]
    pub fn with_amd_program(mut self, program: impl Into<String>) -> Self {
        self.amd.program = program.into();
        self
    }

    /// Override the presence probe strategy.
    #[must_use]
    pub fn with_presence_probe(mut self, probe: PresenceProbe) -> Self {
        self.presence_probe = probe;
        self
    }

    /// Override the per-invocation timeout.
    #[must_use]
    pub const fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.command_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "command timeout must be greater than zero".to_string(),
            ));
        }
        if self.command_timeout > MAX_COMMAND_TIMEOUT {
            return Err(ConfigError::Invalid(format!(
                "command timeout must not exceed {}s",
                MAX_COMMAND_TIMEOUT.as_secs()
            )));
        }
        for tool in [&self.nvidia, &self.amd] {
            if tool.program.trim().is_empty() {
                return Err(ConfigError::Invalid("tool program must not be empty".to_string()));
            }
        }
        if let PresenceProbe::Locate { locator } = &self.presence_probe {
            if locator.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "presence locator must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = TelemetryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.nvidia.program, "nvidia-smi");
        assert_eq!(config.amd.program, "amd-smi");
        assert_eq!(config.command_timeout, DEFAULT_COMMAND_TIMEOUT);
    }

    #[test]
    fn test_platform_default_probe() {
        #[cfg(windows)]
        assert_eq!(PresenceProbe::platform_default(), PresenceProbe::Invoke);
        #[cfg(not(windows))]
        assert_eq!(
            PresenceProbe::platform_default(),
            PresenceProbe::locate("which")
        );
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = TelemetryConfig::from_lookup(lookup_from(&[
            (ENV_NVIDIA_SMI, "/opt/nvidia/bin/nvidia-smi"),
            (ENV_AMD_SMI, " /opt/rocm/bin/amd-smi "),
            (ENV_TIMEOUT_MS, "2500"),
        ]))
        .unwrap();

        assert_eq!(config.nvidia.program, "/opt/nvidia/bin/nvidia-smi");
        assert_eq!(config.amd.program, "/opt/rocm/bin/amd-smi");
        assert_eq!(config.command_timeout, Duration::from_millis(2500));
    }

    #[test]
    fn test_from_lookup_ignores_empty_values() {
        let config =
            TelemetryConfig::from_lookup(lookup_from(&[(ENV_NVIDIA_SMI, "  ")])).unwrap();
        assert_eq!(config.nvidia.program, "nvidia-smi");
    }

    #[test]
    fn test_from_lookup_rejects_bad_timeout() {
        let err = TelemetryConfig::from_lookup(lookup_from(&[(ENV_TIMEOUT_MS, "soon")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: ENV_TIMEOUT_MS,
                ..
            }
        ));
    }

    #[test]
    fn test_validate_rejects_zero_and_huge_timeouts() {
        let zero = TelemetryConfig::default().with_command_timeout(Duration::ZERO);
        assert!(zero.validate().is_err());

        let huge = TelemetryConfig::default().with_command_timeout(Duration::from_secs(600));
        assert!(huge.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_program() {
        let config = TelemetryConfig::default().with_amd_program("");
        assert!(config.validate().is_err());
    }
}
