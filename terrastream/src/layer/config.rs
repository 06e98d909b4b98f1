//! Layer configuration.

use crate::cache::{DEFAULT_CACHE_CAPACITY, DEFAULT_EVICTION_FRACTION};
use crate::coord::MAX_ZOOM;
use crate::decode::{ResourceKind, DEFAULT_ELEVATION_RESOLUTION, DEFAULT_IMAGERY_RESOLUTION};
use crate::loader::SchedulerConfig;
use std::fmt;

/// Default coarsest level a layer fetches.
pub const DEFAULT_LAYER_MIN_LEVEL: u8 = 0;

/// Default finest level a layer fetches.
pub const DEFAULT_LAYER_MAX_LEVEL: u8 = 18;

/// What happens to a cached tile once nothing references it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReleasePolicy {
    /// Keep it until the cache evicts it
    #[default]
    Retain,
    /// Drop it as soon as its reference count returns to zero
    Immediate,
}

impl ReleasePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleasePolicy::Retain => "retain",
            ReleasePolicy::Immediate => "immediate",
        }
    }
}

impl fmt::Display for ReleasePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReleasePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "retain" => Ok(ReleasePolicy::Retain),
            "immediate" => Ok(ReleasePolicy::Immediate),
            other => Err(format!("unknown release policy '{}'", other)),
        }
    }
}

/// Settings for one streamed layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerConfig {
    pub name: String,
    pub kind: ResourceKind,
    /// URL template, e.g. `https://tiles.example.com/{z}/{x}/{y}.png`
    pub url_template: String,
    pub min_level: u8,
    pub max_level: u8,
    /// Value substituted for `{resolution}` and used by the decoder
    pub resolution: u32,
    pub release_policy: ReleasePolicy,
    pub cache_capacity: usize,
    pub eviction_fraction: f64,
    pub scheduler: SchedulerConfig,
}

impl LayerConfig {
    pub fn new(name: impl Into<String>, kind: ResourceKind, url_template: impl Into<String>) -> Self {
        let resolution = match kind {
            ResourceKind::Imagery => DEFAULT_IMAGERY_RESOLUTION,
            ResourceKind::Elevation => DEFAULT_ELEVATION_RESOLUTION,
        };
        Self {
            name: name.into(),
            kind,
            url_template: url_template.into(),
            min_level: DEFAULT_LAYER_MIN_LEVEL,
            max_level: DEFAULT_LAYER_MAX_LEVEL,
            resolution,
            release_policy: ReleasePolicy::default(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            eviction_fraction: DEFAULT_EVICTION_FRACTION,
            scheduler: SchedulerConfig::default(),
        }
    }

    pub fn imagery(name: impl Into<String>, url_template: impl Into<String>) -> Self {
        Self::new(name, ResourceKind::Imagery, url_template)
    }

    pub fn elevation(name: impl Into<String>, url_template: impl Into<String>) -> Self {
        Self::new(name, ResourceKind::Elevation, url_template)
    }

    pub fn with_levels(mut self, min_level: u8, max_level: u8) -> Self {
        self.min_level = min_level;
        self.max_level = max_level;
        self
    }

    pub fn with_resolution(mut self, resolution: u32) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_release_policy(mut self, policy: ReleasePolicy) -> Self {
        self.release_policy = policy;
        self
    }

    pub fn with_cache(mut self, capacity: usize, eviction_fraction: f64) -> Self {
        self.cache_capacity = capacity;
        self.eviction_fraction = eviction_fraction;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.scheduler = self.scheduler.with_max_concurrent(max_concurrent);
        self
    }

    /// True when `min_level ≤ max_level ≤ MAX_ZOOM`.
    pub fn levels_valid(&self) -> bool {
        self.min_level <= self.max_level && self.max_level <= MAX_ZOOM
    }
}
