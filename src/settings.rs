use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::font::FontOptions;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub font_dirs: Vec<PathBuf>,
    pub default_family: Option<String>,
    pub fallback_families: Vec<String>,
    pub font_cache_capacity: usize,
    pub workers: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            font_dirs: Vec::new(),
            default_family: None,
            fallback_families: vec!["sans-serif".to_string()],
            font_cache_capacity: 64,
            workers: 0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    fonts: Option<FontSettings>,
    system: Option<SystemSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct FontSettings {
    dirs: Option<Vec<String>>,
    default_family: Option<String>,
    fallback_families: Option<Vec<String>>,
    cache_capacity: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct SystemSettings {
    workers: Option<usize>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    ensure_home_settings_file()?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(fonts) = incoming.fonts {
            if let Some(dirs) = fonts.dirs {
                self.font_dirs = dirs
                    .into_iter()
                    .filter(|dir| !dir.trim().is_empty())
                    .map(|dir| expand_home(dir.trim()))
                    .collect();
            }
            if let Some(family) = fonts.default_family {
                let family = family.trim();
                self.default_family = if family.is_empty() {
                    None
                } else {
                    Some(family.to_string())
                };
            }
            if let Some(families) = fonts.fallback_families {
                self.fallback_families = families
                    .into_iter()
                    .map(|family| family.trim().to_string())
                    .filter(|family| !family.is_empty())
                    .collect();
            }
            if let Some(capacity) = fonts.cache_capacity {
                if capacity > 0 {
                    self.font_cache_capacity = capacity;
                }
            }
        }
        if let Some(system) = incoming.system {
            if let Some(workers) = system.workers {
                self.workers = workers;
            }
        }
    }

    pub fn font_options(&self) -> FontOptions {
        FontOptions {
            dirs: self.font_dirs.clone(),
            default_family: self.default_family.clone(),
            fallback_families: self.fallback_families.clone(),
            cache_capacity: self.font_cache_capacity,
            ..FontOptions::default()
        }
    }

    /// Worker threads for batch rendering; `0` in settings means one per CPU.
    pub fn worker_count(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get().max(1)
        } else {
            self.workers
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return Path::new(&home).join(rest);
        }
    }
    PathBuf::from(path)
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".manhwa-textfx"))
        }
    })
}
