//! Connection profiles: load/save a JSON mapping of profile name -> { url, tls_ca, env, interval }
//! Stored under XDG config dir: $XDG_CONFIG_HOME/fleettop/profiles.json (fallback ~/.config/fleettop/profiles.json)

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ProfileEntry {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_ca: Option<String>,
    /// Environment to preselect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
    /// Seconds to prefill the interval field with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProfilesFile {
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileEntry>,
    #[serde(default)]
    pub version: u32,
}

pub fn config_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg).join("fleettop")
    } else {
        dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fleettop")
    }
}

pub fn profiles_path() -> PathBuf {
    config_dir().join("profiles.json")
}

pub fn load_profiles() -> ProfilesFile {
    let path = profiles_path();
    match fs::read_to_string(&path) {
        Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable profiles file");
            ProfilesFile::default()
        }),
        Err(_) => ProfilesFile::default(),
    }
}

pub fn save_profiles(p: &ProfilesFile) -> std::io::Result<()> {
    let path = profiles_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_vec_pretty(p).map_err(std::io::Error::other)?;
    fs::write(path, data)
}

pub enum ResolveProfile {
    /// Use the provided runtime inputs (not persisted yet).
    Direct(ProfileEntry),
    /// Loaded from an existing profile entry, with runtime overrides applied.
    Loaded(ProfileEntry),
    /// Should prompt user to select among profile names
    PromptSelect(Vec<String>),
    /// Should prompt user to create a new profile (name)
    PromptCreate(String),
    /// No profile could be resolved (e.g., missing arguments)
    None,
}

pub struct ProfileRequest {
    pub profile_name: Option<String>,
    pub url: Option<String>,
    pub tls_ca: Option<String>,
    pub env: Option<String>,
    pub interval: Option<u64>,
}

impl ProfileRequest {
    pub fn resolve(self, pf: &ProfilesFile) -> ResolveProfile {
        // Case: only profile name given -> try load
        if self.url.is_none() {
            if let Some(name) = self.profile_name {
                return match pf.profiles.get(&name) {
                    Some(entry) => ResolveProfile::Loaded(ProfileEntry {
                        url: entry.url.clone(),
                        tls_ca: self.tls_ca.or_else(|| entry.tls_ca.clone()),
                        env: self.env.or_else(|| entry.env.clone()),
                        interval: self.interval.or(entry.interval),
                    }),
                    None => ResolveProfile::PromptCreate(name),
                };
            }
        }
        // URL provided -> direct (maybe later saved by caller)
        if let Some(url) = self.url {
            return ResolveProfile::Direct(ProfileEntry {
                url,
                tls_ca: self.tls_ca,
                env: self.env,
                interval: self.interval,
            });
        }
        // Nothing provided -> maybe prompt select if profiles exist
        if pf.profiles.is_empty() {
            ResolveProfile::None
        } else {
            ResolveProfile::PromptSelect(pf.profiles.keys().cloned().collect())
        }
    }
}
