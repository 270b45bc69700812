use super::types::{
    LabtraceConfig, RawLabtraceConfig, RawProficiencyConfig, RawScoringConfig, RawThresholds,
    ScoringConfig,
};
use anyhow::{Context, Result};
use labtrace_core::{DEFAULT_PRESET, PresetFile};
use labtrace_skills::ProficiencyConfig;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user presets file, user, project, then an explicit file)
    ///
    /// The result is validated before it is returned, so bad thresholds or an
    /// unknown default preset fail here rather than mid-scoring.
    pub fn load(explicit: Option<&Path>) -> Result<LabtraceConfig> {
        let mut raw = RawLabtraceConfig::default();

        // Layer 1: User config
        let user_path = Self::user_config_path();
        if user_path.exists() {
            raw = Self::merge_raw(raw, Self::read_raw(&user_path)?);
        }

        // Layer 2: Project config
        let project_path = Self::project_config_path();
        if project_path.exists() {
            raw = Self::merge_raw(raw, Self::read_raw(&project_path)?);
        }

        // Layer 3: --config
        if let Some(path) = explicit {
            raw = Self::merge_raw(raw, Self::read_raw(path)?);
        }

        let mut config = Self::finalize(raw);

        // Shared presets load first so config layers can replace them by id
        let presets_path = Self::user_presets_path();
        if presets_path.exists() {
            debug!(path = %presets_path.display(), "Reading preset file");
            let file = PresetFile::load(&presets_path)
                .with_context(|| format!("Failed to load presets {}", presets_path.display()))?;
            config.scoring.presets.splice(0..0, file.presets);
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Get user config path (`$XDG_CONFIG_HOME/labtrace/config.toml`)
    pub fn user_config_path() -> PathBuf {
        labtrace_paths::user_config_file()
    }

    /// Get user preset file path (`$XDG_CONFIG_HOME/labtrace/presets.toml`)
    pub fn user_presets_path() -> PathBuf {
        labtrace_paths::config_dir().join("presets.toml")
    }

    /// Get project config path
    /// Can be overridden with LABTRACE_PROJECT_CONFIG_DIR env var (useful for isolated e2e tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("LABTRACE_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".labtrace/config.toml")
        }
    }

    fn read_raw(path: &Path) -> Result<RawLabtraceConfig> {
        debug!(path = %path.display(), "Reading config layer");
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse config {}", path.display()))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    ///
    /// Presets accumulate; a later layer's preset with the same id wins when
    /// the registry is built.
    fn merge_raw(base: RawLabtraceConfig, overlay: RawLabtraceConfig) -> RawLabtraceConfig {
        let mut presets = base.scoring.presets;
        presets.extend(overlay.scoring.presets);

        RawLabtraceConfig {
            scoring: RawScoringConfig {
                default_preset: overlay
                    .scoring
                    .default_preset
                    .or(base.scoring.default_preset),
                presets,
            },
            proficiency: RawProficiencyConfig {
                half_life_days: overlay
                    .proficiency
                    .half_life_days
                    .or(base.proficiency.half_life_days),
                thresholds: RawThresholds {
                    knows: overlay
                        .proficiency
                        .thresholds
                        .knows
                        .or(base.proficiency.thresholds.knows),
                    understands: overlay
                        .proficiency
                        .thresholds
                        .understands
                        .or(base.proficiency.thresholds.understands),
                    applies: overlay
                        .proficiency
                        .thresholds
                        .applies
                        .or(base.proficiency.thresholds.applies),
                },
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawLabtraceConfig) -> LabtraceConfig {
        LabtraceConfig {
            scoring: ScoringConfig {
                default_preset: raw
                    .scoring
                    .default_preset
                    .unwrap_or_else(|| DEFAULT_PRESET.to_string()),
                presets: raw.scoring.presets,
            },
            proficiency: ProficiencyConfig {
                half_life_days: raw
                    .proficiency
                    .half_life_days
                    .unwrap_or(ProficiencyConfig::default().half_life_days),
                thresholds: raw.proficiency.thresholds.finalize(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labtrace_core::ScoringPolicy;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::TempDir;

    struct IsolatedEnv {
        _config_home: TempDir,
        project: TempDir,
    }

    /// Point both the user and project layers at empty temp dirs.
    fn isolate() -> IsolatedEnv {
        let config_home = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        unsafe {
            std::env::set_var("XDG_CONFIG_HOME", config_home.path());
            std::env::set_var("LABTRACE_PROJECT_CONFIG_DIR", project.path());
        }
        IsolatedEnv {
            _config_home: config_home,
            project,
        }
    }

    fn restore() {
        unsafe {
            std::env::remove_var("XDG_CONFIG_HOME");
            std::env::remove_var("LABTRACE_PROJECT_CONFIG_DIR");
        }
    }

    fn write(path: &Path, contents: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let mut file = std::fs::File::create(path).unwrap();
        writeln!(file, "{contents}").unwrap();
    }

    // ==================== Load Tests ====================

    #[test]
    #[serial]
    fn test_load_without_files_returns_defaults() {
        let _env = isolate();

        let config = ConfigLoader::load(None).unwrap();

        assert_eq!(config.scoring.default_preset, "standard");
        assert_eq!(config.proficiency.half_life_days, 60.0);
        restore();
    }

    #[test]
    #[serial]
    fn test_project_layer_overrides_user_layer() {
        let _env = isolate();
        write(
            &ConfigLoader::user_config_path(),
            "[scoring]\ndefault_preset = \"strict\"\n[proficiency]\nhalf_life_days = 30.0",
        );
        write(
            &ConfigLoader::project_config_path(),
            "[scoring]\ndefault_preset = \"lenient\"",
        );

        let config = ConfigLoader::load(None).unwrap();

        assert_eq!(config.scoring.default_preset, "lenient");
        // Not set in the project layer, so the user value survives
        assert_eq!(config.proficiency.half_life_days, 30.0);
        restore();
    }

    #[test]
    #[serial]
    fn test_explicit_file_is_last_layer() {
        let env = isolate();
        write(
            &ConfigLoader::project_config_path(),
            "[proficiency.thresholds]\nknows = 0.2",
        );
        let explicit = env.project.path().join("override.toml");
        write(&explicit, "[proficiency.thresholds]\napplies = 0.9");

        let config = ConfigLoader::load(Some(&explicit)).unwrap();

        assert_eq!(config.proficiency.thresholds.knows, 0.2);
        assert_eq!(config.proficiency.thresholds.understands, 0.5);
        assert_eq!(config.proficiency.thresholds.applies, 0.9);
        restore();
    }

    #[test]
    #[serial]
    fn test_unordered_thresholds_rejected_at_load() {
        let env = isolate();
        let explicit = env.project.path().join("bad.toml");
        write(&explicit, "[proficiency.thresholds]\nknows = 0.6");

        let err = ConfigLoader::load(Some(&explicit)).unwrap_err();

        assert!(format!("{err:#}").contains("strictly increasing"));
        restore();
    }

    #[test]
    #[serial]
    fn test_custom_preset_from_config() {
        let env = isolate();
        let explicit = env.project.path().join("presets.toml");
        write(
            &explicit,
            r#"
[scoring]
default_preset = "exam"

[[scoring.presets]]
id = "exam"
pass_threshold = 0.9
hint_penalty = { kind = "flat", per_hint = 0.2 }
solution_penalty = { penalty = 0.8, cap = 0.1 }
retry_penalty = { per_retry = 0.1 }
"#,
        );

        let config = ConfigLoader::load(Some(&explicit)).unwrap();
        let registry = config.registry().unwrap();

        let exam = registry.get("exam").unwrap();
        assert_eq!(exam.pass_threshold, 0.9);
        assert_eq!(exam.first_try_bonus, 0.0);
        assert_eq!(exam.retry_penalty.max_total, None);
        restore();
    }

    #[test]
    #[serial]
    fn test_user_preset_file_registers_presets() {
        let _env = isolate();
        write(
            &ConfigLoader::user_presets_path(),
            r#"
[[presets]]
id = "drill"
pass_threshold = 0.4
hint_penalty = { kind = "diminishing", first = 0.05, factor = 0.5 }
solution_penalty = { penalty = 0.2 }
retry_penalty = { per_retry = 0.0 }

[[presets]]
id = "exam"
pass_threshold = 0.7
hint_penalty = { kind = "flat", per_hint = 0.2 }
solution_penalty = { penalty = 0.8 }
retry_penalty = { per_retry = 0.1 }
"#,
        );
        write(
            &ConfigLoader::project_config_path(),
            r#"
[scoring]
default_preset = "drill"

[[scoring.presets]]
id = "exam"
pass_threshold = 0.9
hint_penalty = { kind = "flat", per_hint = 0.2 }
solution_penalty = { penalty = 0.8 }
retry_penalty = { per_retry = 0.1 }
"#,
        );

        let config = ConfigLoader::load(None).unwrap();
        let registry = config.registry().unwrap();

        assert_eq!(registry.len(), 5);
        assert_eq!(registry.get("drill").unwrap().pass_threshold, 0.4);
        // Config layers win over the shared preset file
        assert_eq!(registry.get("exam").unwrap().pass_threshold, 0.9);
        restore();
    }

    #[test]
    #[serial]
    fn test_invalid_preset_file_returns_error() {
        let _env = isolate();
        write(&ConfigLoader::user_presets_path(), "[[presets]]
id = 3");

        let err = ConfigLoader::load(None).unwrap_err();

        assert!(format!("{err:#}").contains("Failed to load presets"));
        restore();
    }

    #[test]
    #[serial]
    fn test_invalid_toml_returns_error() {
        let env = isolate();
        let explicit = env.project.path().join("invalid.toml");
        write(&explicit, "this is not valid toml {{{{");

        let result = ConfigLoader::load(Some(&explicit));

        assert!(result.is_err());
        restore();
    }

    #[test]
    fn test_merge_raw_none_preserves_base() {
        let base = RawLabtraceConfig {
            scoring: RawScoringConfig {
                default_preset: Some("strict".to_string()),
                presets: vec![ScoringPolicy::standard()],
            },
            proficiency: RawProficiencyConfig {
                half_life_days: Some(45.0),
                thresholds: RawThresholds::default(),
            },
        };

        let merged = ConfigLoader::merge_raw(base, RawLabtraceConfig::default());

        assert_eq!(merged.scoring.default_preset, Some("strict".to_string()));
        assert_eq!(merged.scoring.presets.len(), 1);
        assert_eq!(merged.proficiency.half_life_days, Some(45.0));
    }

    #[test]
    #[serial]
    fn test_project_config_path_default() {
        restore();
        let path = ConfigLoader::project_config_path();
        assert_eq!(path, PathBuf::from(".labtrace/config.toml"));
    }
}
