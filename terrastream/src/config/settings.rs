//! Configuration settings structs.
//!
//! Every section of `config.ini` maps to one struct here. Defaults come from
//! the `DEFAULT_*` constants of the module each setting configures.

use crate::cache::{DEFAULT_CACHE_CAPACITY, DEFAULT_EVICTION_FRACTION};
use crate::coord::MAX_ZOOM;
use crate::decode::{ResourceKind, DEFAULT_ELEVATION_RESOLUTION, DEFAULT_IMAGERY_RESOLUTION};
use crate::geodesy::TilingScheme;
use crate::layer::{
    LayerConfig, ReleasePolicy, DEFAULT_LAYER_MAX_LEVEL, DEFAULT_LAYER_MIN_LEVEL,
};
use crate::loader::{SchedulerConfig, DEFAULT_MAX_CONCURRENT};
use crate::lod::{
    LodConfig, DEFAULT_ERROR_THRESHOLD, DEFAULT_MAX_HEIGHT, DEFAULT_MAX_LEVEL, DEFAULT_MIN_HEIGHT,
    DEFAULT_MIN_LEVEL,
};
use crate::provider::{TemplateError, UrlTemplate, DEFAULT_TIMEOUT_SECS};
use std::collections::HashSet;
use thiserror::Error;

/// A configuration that parsed but does not make sense.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("cache.capacity must be at least 1")]
    CacheCapacity,

    #[error("cache.eviction_fraction must be in (0, 1], got {0}")]
    EvictionFraction(f64),

    #[error("scheduler.max_concurrent must be at least 1")]
    MaxConcurrent,

    #[error("lod levels must satisfy min_level <= max_level <= {max_zoom}, got {min}..={max}")]
    LodLevels { min: u8, max: u8, max_zoom: u8 },

    #[error("lod.error_threshold must be positive, got {0}")]
    ErrorThreshold(f64),

    #[error("lod.min_height must be below lod.max_height")]
    HeightRange,

    #[error("layer '{layer}' levels must satisfy min_level <= max_level <= {max_zoom}, got {min}..={max}")]
    LayerLevels {
        layer: String,
        min: u8,
        max: u8,
        max_zoom: u8,
    },

    #[error("layer '{layer}' has an invalid url template: {source}")]
    LayerTemplate {
        layer: String,
        #[source]
        source: TemplateError,
    },

    #[error("layer '{0}' resolution must be at least 1")]
    LayerResolution(String),

    #[error("layer '{0}' is defined more than once")]
    DuplicateLayer(String),
}

/// Complete streaming configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StreamingConfig {
    pub cache: CacheSettings,
    pub scheduler: SchedulerSettings,
    pub lod: LodSettings,
    pub layers: Vec<LayerSettings>,
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    /// Tiles kept per layer
    pub capacity: usize,
    /// Share of capacity kept after a preemption pass
    pub eviction_fraction: f64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            eviction_fraction: DEFAULT_EVICTION_FRACTION,
        }
    }
}

/// `[scheduler]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerSettings {
    pub max_concurrent: usize,
    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// `[lod]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LodSettings {
    pub min_level: u8,
    pub max_level: u8,
    pub error_threshold: f64,
    pub scheme: TilingScheme,
    pub min_height: f64,
    pub max_height: f64,
}

impl Default for LodSettings {
    fn default() -> Self {
        Self {
            min_level: DEFAULT_MIN_LEVEL,
            max_level: DEFAULT_MAX_LEVEL,
            error_threshold: DEFAULT_ERROR_THRESHOLD,
            scheme: TilingScheme::default(),
            min_height: DEFAULT_MIN_HEIGHT,
            max_height: DEFAULT_MAX_HEIGHT,
        }
    }
}

/// One `[layer.<name>]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSettings {
    pub name: String,
    pub kind: ResourceKind,
    pub url_template: String,
    pub min_level: u8,
    pub max_level: u8,
    pub resolution: u32,
    pub release_policy: ReleasePolicy,
}

impl LayerSettings {
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
        }
    }
}

impl StreamingConfig {
    /// Checks cross-field constraints the parser cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.capacity < 1 {
            return Err(ConfigError::CacheCapacity);
        }
        let fraction = self.cache.eviction_fraction;
        if !fraction.is_finite() || fraction <= 0.0 || fraction > 1.0 {
            return Err(ConfigError::EvictionFraction(fraction));
        }
        if self.scheduler.max_concurrent < 1 {
            return Err(ConfigError::MaxConcurrent);
        }
        if self.lod.min_level > self.lod.max_level || self.lod.max_level > MAX_ZOOM {
            return Err(ConfigError::LodLevels {
                min: self.lod.min_level,
                max: self.lod.max_level,
                max_zoom: MAX_ZOOM,
            });
        }
        if !self.lod.error_threshold.is_finite() || self.lod.error_threshold <= 0.0 {
            return Err(ConfigError::ErrorThreshold(self.lod.error_threshold));
        }
        if self.lod.min_height >= self.lod.max_height {
            return Err(ConfigError::HeightRange);
        }

        let mut seen = HashSet::new();
        for layer in &self.layers {
            if !seen.insert(layer.name.as_str()) {
                return Err(ConfigError::DuplicateLayer(layer.name.clone()));
            }
            if layer.min_level > layer.max_level || layer.max_level > MAX_ZOOM {
                return Err(ConfigError::LayerLevels {
                    layer: layer.name.clone(),
                    min: layer.min_level,
                    max: layer.max_level,
                    max_zoom: MAX_ZOOM,
                });
            }
            if layer.resolution < 1 {
                return Err(ConfigError::LayerResolution(layer.name.clone()));
            }
            UrlTemplate::parse(&layer.url_template).map_err(|source| {
                ConfigError::LayerTemplate {
                    layer: layer.name.clone(),
                    source,
                }
            })?;
        }
        Ok(())
    }

    /// Selector configuration for the `[lod]` section.
    pub fn lod_config(&self) -> LodConfig {
        LodConfig::default()
            .with_levels(self.lod.min_level, self.lod.max_level)
            .with_error_threshold(self.lod.error_threshold)
            .with_scheme(self.lod.scheme)
            .with_height_range(self.lod.min_height, self.lod.max_height)
    }

    /// Full layer configuration, combining the layer section with the shared
    /// cache and scheduler sections.
    pub fn layer_config(&self, layer: &LayerSettings) -> LayerConfig {
        LayerConfig {
            name: layer.name.clone(),
            kind: layer.kind,
            url_template: layer.url_template.clone(),
            min_level: layer.min_level,
            max_level: layer.max_level,
            resolution: layer.resolution,
            release_policy: layer.release_policy,
            cache_capacity: self.cache.capacity,
            eviction_fraction: self.cache.eviction_fraction,
            scheduler: SchedulerConfig::default().with_max_concurrent(self.scheduler.max_concurrent),
        }
    }

    pub fn layer(&self, name: &str) -> Option<&LayerSettings> {
        self.layers.iter().find(|l| l.name == name)
    }
}
