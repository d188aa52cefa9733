use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

pub const DEFAULT_FOCUS_MINUTES: u32 = 25;
pub const DEFAULT_SHORT_BREAK_MINUTES: u32 = 5;
pub const DEFAULT_LONG_BREAK_MINUTES: u32 = 15;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct TimerConfig {
    pub focus_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            focus_minutes: DEFAULT_FOCUS_MINUTES,
            short_break_minutes: DEFAULT_SHORT_BREAK_MINUTES,
            long_break_minutes: DEFAULT_LONG_BREAK_MINUTES,
        }
    }
}

impl TimerConfig {
    /// All three durations must be positive; a zero falls back to that
    /// field's default so the countdown never arms with an empty interval.
    pub fn sanitized(&self) -> TimerConfig {
        let mut cfg = *self;
        if cfg.focus_minutes == 0 {
            warn!("focusMinutes must be positive; falling back to {DEFAULT_FOCUS_MINUTES}");
            cfg.focus_minutes = DEFAULT_FOCUS_MINUTES;
        }
        if cfg.short_break_minutes == 0 {
            warn!("shortBreakMinutes must be positive; falling back to {DEFAULT_SHORT_BREAK_MINUTES}");
            cfg.short_break_minutes = DEFAULT_SHORT_BREAK_MINUTES;
        }
        if cfg.long_break_minutes == 0 {
            warn!("longBreakMinutes must be positive; falling back to {DEFAULT_LONG_BREAK_MINUTES}");
            cfg.long_break_minutes = DEFAULT_LONG_BREAK_MINUTES;
        }
        cfg
    }
}

pub struct ConfigStore {
    path: PathBuf,
    data: RwLock<TimerConfig>,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            TimerConfig::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn read(&self) -> TimerConfig {
        *self.data.read().unwrap()
    }

    pub fn write(&self, config: TimerConfig) -> Result<()> {
        {
            let mut guard = self.data.write().unwrap();
            *guard = config;
            self.persist(&guard)?;
        }
        Ok(())
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        let data: TimerConfig = serde_json::from_str(&contents)?;
        let mut guard = self.data.write().unwrap();
        *guard = data;
        Ok(())
    }

    fn persist(&self, data: &TimerConfig) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write config to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_settings() {
        let cfg = TimerConfig::default();
        assert_eq!(cfg.focus_minutes, 25);
        assert_eq!(cfg.short_break_minutes, 5);
        assert_eq!(cfg.long_break_minutes, 15);
    }

    #[test]
    fn sanitized_clamps_zero_durations() {
        let cfg = TimerConfig {
            focus_minutes: 0,
            short_break_minutes: 0,
            long_break_minutes: 0,
        };
        assert_eq!(cfg.sanitized(), TimerConfig::default());

        let cfg = TimerConfig {
            focus_minutes: 50,
            short_break_minutes: 0,
            long_break_minutes: 20,
        };
        let clean = cfg.sanitized();
        assert_eq!(clean.focus_minutes, 50);
        assert_eq!(clean.short_break_minutes, DEFAULT_SHORT_BREAK_MINUTES);
        assert_eq!(clean.long_break_minutes, 20);
    }

    #[test]
    fn store_round_trips_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let store = ConfigStore::new(path.clone()).unwrap();
        assert_eq!(store.read(), TimerConfig::default());

        let custom = TimerConfig {
            focus_minutes: 45,
            short_break_minutes: 10,
            long_break_minutes: 30,
        };
        store.write(custom).unwrap();

        let reopened = ConfigStore::new(path.clone()).unwrap();
        assert_eq!(reopened.read(), custom);

        // External edit picked up by reload.
        std::fs::write(&path, r#"{"focusMinutes":30,"shortBreakMinutes":5,"longBreakMinutes":15}"#)
            .unwrap();
        reopened.reload().unwrap();
        assert_eq!(reopened.read().focus_minutes, 30);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json at all").unwrap();

        let store = ConfigStore::new(path).unwrap();
        assert_eq!(store.read(), TimerConfig::default());
    }
}
