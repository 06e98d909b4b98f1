//! INI serialization logic for converting `StreamingConfig` → INI string.

use super::parser::LAYER_SECTION_PREFIX;
use super::settings::StreamingConfig;

/// Convert a `StreamingConfig` to a commented INI string for saving.
pub(super) fn to_config_string(config: &StreamingConfig) -> String {
    let mut out = format!(
        r#"[cache]
; Decoded tiles kept per layer
capacity = {}
; Share of capacity kept when a full cache is preempted, in (0, 1]
;   0.75 - evict a quarter of the cache at once (default)
;   1.0  - evict a single tile at a time
eviction_fraction = {}

[scheduler]
; Simultaneous downloads per layer
max_concurrent = {}
; HTTP request timeout in seconds
timeout = {}

[lod]
; Coarsest and finest levels the selector emits (0-30)
min_level = {}
max_level = {}
; Largest acceptable projected tile size before refining
error_threshold = {}
; Tiling scheme: webmercator or geographic
scheme = {}
; Terrain height range used for tile bounding volumes (meters)
min_height = {}
max_height = {}
"#,
        config.cache.capacity,
        config.cache.eviction_fraction,
        config.scheduler.max_concurrent,
        config.scheduler.timeout_secs,
        config.lod.min_level,
        config.lod.max_level,
        config.lod.error_threshold,
        config.lod.scheme.name(),
        config.lod.min_height,
        config.lod.max_height,
    );

    for layer in &config.layers {
        out.push_str(&format!(
            r#"
[{}{}]
; imagery or elevation
kind = {}
url = {}
min_level = {}
max_level = {}
resolution = {}
; retain or immediate
release = {}
"#,
            LAYER_SECTION_PREFIX,
            layer.name,
            layer.kind,
            layer.url_template,
            layer.min_level,
            layer.max_level,
            layer.resolution,
            layer.release_policy,
        ));
    }
    out
}
