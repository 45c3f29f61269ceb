//! Which deployment environment (fleet scope) the dashboard queries.

use crate::types::EnvironmentConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentContext {
    selected: Option<String>,
    available: Vec<String>,
    badge: Option<String>,
}

impl EnvironmentContext {
    /// `initial` preselects a scope before the environment list is known.
    pub fn new(initial: Option<String>) -> Self {
        let mut ctx = Self::default();
        ctx.select(initial);
        ctx
    }

    /// The scope to send with the next request, read live at fetch time.
    pub fn scope(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn available(&self) -> &[String] {
        &self.available
    }

    pub fn badge(&self) -> Option<&str> {
        self.badge.as_deref()
    }

    /// An empty name means "no scope". Returns whether the selection changed.
    pub fn select(&mut self, name: Option<String>) -> bool {
        let name = name.filter(|n| !n.is_empty());
        if let Some(n) = &name {
            self.badge = Some(n.clone());
        }
        let changed = self.selected != name;
        self.selected = name;
        changed
    }

    /// Applies a config response and returns the refresh interval to offer.
    ///
    /// The environment list is populated only once, from the first non-empty
    /// list; later responses never rebuild it. On that first population the
    /// selection follows the service's current environment when listed, else
    /// the first entry.
    pub fn apply_config(&mut self, cfg: &EnvironmentConfig) -> u64 {
        if let Some(env) = cfg.environment.as_deref().filter(|e| !e.is_empty()) {
            self.badge = Some(env.to_string());
        }
        if self.available.is_empty() && !cfg.environments.is_empty() {
            self.available = cfg.environments.clone();
            let current = cfg
                .environment
                .as_ref()
                .filter(|e| self.available.contains(e))
                .unwrap_or(&self.available[0])
                .clone();
            tracing::debug!(environments = self.available.len(), selected = %current, "environment list populated");
            self.selected = Some(current);
        }
        cfg.refresh_interval_secs()
    }

    /// Steps through the populated list with wrap-around and returns the new
    /// name. `None` while no list has been loaded.
    pub fn next(&self, step: isize) -> Option<String> {
        if self.available.is_empty() {
            return None;
        }
        let len = self.available.len() as isize;
        let pos = self
            .selected
            .as_ref()
            .and_then(|s| self.available.iter().position(|a| a == s))
            .map(|p| p as isize)
            .unwrap_or(if step >= 0 { -1 } else { 0 });
        let idx = (pos + step).rem_euclid(len) as usize;
        Some(self.available[idx].clone())
    }
}
