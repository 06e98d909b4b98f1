//! INI parsing logic for converting `Ini` → `StreamingConfig`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use ini::{Ini, Properties};
use std::str::FromStr;

use super::file::ConfigFileError;
use super::settings::{LayerSettings, StreamingConfig};
use crate::decode::ResourceKind;

/// Prefix of per-layer section names, e.g. `[layer.osm]`.
pub(super) const LAYER_SECTION_PREFIX: &str = "layer.";

/// Parse an `Ini` object into a `StreamingConfig`.
///
/// Starts from `StreamingConfig::default()` and overlays any values found in
/// the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<StreamingConfig, ConfigFileError> {
    let mut config = StreamingConfig::default();

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("capacity") {
            config.cache.capacity = parse_value("cache", "capacity", v, "must be a positive integer")?;
        }
        if let Some(v) = section.get("eviction_fraction") {
            config.cache.eviction_fraction = parse_value(
                "cache",
                "eviction_fraction",
                v,
                "must be a number in (0, 1]",
            )?;
        }
    }

    // [scheduler] section
    if let Some(section) = ini.section(Some("scheduler")) {
        if let Some(v) = section.get("max_concurrent") {
            config.scheduler.max_concurrent =
                parse_value("scheduler", "max_concurrent", v, "must be a positive integer")?;
        }
        if let Some(v) = section.get("timeout") {
            config.scheduler.timeout_secs =
                parse_value("scheduler", "timeout", v, "must be a positive integer (seconds)")?;
        }
    }

    // [lod] section
    if let Some(section) = ini.section(Some("lod")) {
        if let Some(v) = section.get("min_level") {
            config.lod.min_level = parse_value("lod", "min_level", v, "must be an integer 0-30")?;
        }
        if let Some(v) = section.get("max_level") {
            config.lod.max_level = parse_value("lod", "max_level", v, "must be an integer 0-30")?;
        }
        if let Some(v) = section.get("error_threshold") {
            config.lod.error_threshold =
                parse_value("lod", "error_threshold", v, "must be a positive number")?;
        }
        if let Some(v) = section.get("scheme") {
            config.lod.scheme =
                parse_value("lod", "scheme", v, "must be 'webmercator' or 'geographic'")?;
        }
        if let Some(v) = section.get("min_height") {
            config.lod.min_height = parse_value("lod", "min_height", v, "must be a number (meters)")?;
        }
        if let Some(v) = section.get("max_height") {
            config.lod.max_height = parse_value("lod", "max_height", v, "must be a number (meters)")?;
        }
    }

    // [layer.<name>] sections
    for (name, section) in ini.iter() {
        let Some(layer_name) = name.and_then(|n| n.strip_prefix(LAYER_SECTION_PREFIX)) else {
            continue;
        };
        config.layers.push(parse_layer(layer_name, section)?);
    }

    Ok(config)
}

fn parse_layer(name: &str, section: &Properties) -> Result<LayerSettings, ConfigFileError> {
    let section_name = format!("{}{}", LAYER_SECTION_PREFIX, name);

    let kind: ResourceKind = match section.get("kind") {
        Some(v) => parse_value(&section_name, "kind", v, "must be 'imagery' or 'elevation'")?,
        None => ResourceKind::Imagery,
    };
    let url_template = section
        .get("url")
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigFileError::InvalidValue {
            section: section_name.clone(),
            key: "url".to_string(),
            value: String::new(),
            reason: "a url template is required".to_string(),
        })?;

    let mut layer = LayerSettings::new(name, kind, url_template);

    if let Some(v) = section.get("min_level") {
        layer.min_level = parse_value(&section_name, "min_level", v, "must be an integer 0-30")?;
    }
    if let Some(v) = section.get("max_level") {
        layer.max_level = parse_value(&section_name, "max_level", v, "must be an integer 0-30")?;
    }
    if let Some(v) = section.get("resolution") {
        layer.resolution = parse_value(&section_name, "resolution", v, "must be a positive integer")?;
    }
    if let Some(v) = section.get("release") {
        layer.release_policy =
            parse_value(&section_name, "release", v, "must be 'retain' or 'immediate'")?;
    }
    Ok(layer)
}

fn parse_value<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigFileError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        })
}
