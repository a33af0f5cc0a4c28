//! Distance settings: metric, minimum overlap, ambiguity handling and cache limits.

use std::fmt;
use std::str::FromStr;

use log::warn;

use crate::error::TaxonError;

/// Default number of informative positions two sequences must share.
pub const DEFAULT_MINIMUM_OVERLAP: usize = 300;

/// Fraction of available memory above which the distance cache is flushed.
pub const DEFAULT_MEMORY_LIMIT: f64 = 0.9;

pub const DEFAULT_PRESSURE_CHECK_INTERVAL: u64 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DistanceMetric {
    /// Proportion of mismatching positions.
    #[default]
    Uncorrected,
    /// Kimura two-parameter.
    K2P,
    /// Proportion of transversions.
    TransversionOnly,
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DistanceMetric::Uncorrected => "uncorrected",
            DistanceMetric::K2P => "k2p",
            DistanceMetric::TransversionOnly => "transversion",
        };
        f.write_str(name)
    }
}

impl FromStr for DistanceMetric {
    type Err = TaxonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "uncorrected" | "p" | "pairwise" => Ok(DistanceMetric::Uncorrected),
            "k2p" | "kimura" => Ok(DistanceMetric::K2P),
            "transversion" | "transversions" | "tv" => Ok(DistanceMetric::TransversionOnly),
            _ => Err(TaxonError::InvalidConfig {
                key: "metric".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheSettings {
    /// Flush when `used / max` exceeds this.
    pub memory_limit: f64,
    /// Sample memory usage once every this many cache requests.
    pub pressure_check_interval: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            memory_limit: DEFAULT_MEMORY_LIMIT,
            pressure_check_interval: DEFAULT_PRESSURE_CHECK_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceConfig {
    pub minimum_overlap: usize,
    pub metric: DistanceMetric,
    pub ambiguous_bases_allowed: bool,
    pub cache: CacheSettings,
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self {
            minimum_overlap: DEFAULT_MINIMUM_OVERLAP,
            metric: DistanceMetric::default(),
            ambiguous_bases_allowed: true,
            cache: CacheSettings::default(),
        }
    }
}

impl DistanceConfig {
    /// Defaults overridden by `TAXONDIST_*` environment variables.
    ///
    /// Unparseable values are reported and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("TAXONDIST_MIN_OVERLAP") {
            match value.trim().parse::<usize>() {
                Ok(n) => config.minimum_overlap = n,
                Err(_) => warn!("Ignoring TAXONDIST_MIN_OVERLAP='{value}', keeping {}", config.minimum_overlap),
            }
        }

        if let Some(value) = lookup("TAXONDIST_METRIC") {
            match value.parse::<DistanceMetric>() {
                Ok(metric) => config.metric = metric,
                Err(e) => warn!("{e}, keeping {}", config.metric),
            }
        }

        if let Some(value) = lookup("TAXONDIST_AMBIGUOUS") {
            match value.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" => config.ambiguous_bases_allowed = true,
                "false" | "0" | "no" => config.ambiguous_bases_allowed = false,
                _ => warn!("Ignoring TAXONDIST_AMBIGUOUS='{value}'"),
            }
        }

        if let Some(value) = lookup("TAXONDIST_CACHE_LIMIT") {
            match value.trim().parse::<f64>() {
                Ok(limit) if limit > 0.0 && limit <= 1.0 => config.cache.memory_limit = limit,
                _ => warn!("Ignoring TAXONDIST_CACHE_LIMIT='{value}', expected a fraction in (0, 1]"),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = DistanceConfig::default();
        assert_eq!(config.minimum_overlap, 300);
        assert_eq!(config.metric, DistanceMetric::Uncorrected);
        assert!(config.ambiguous_bases_allowed);
        assert!((config.cache.memory_limit - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_metric_parsing() {
        assert_eq!("K2P".parse::<DistanceMetric>().unwrap(), DistanceMetric::K2P);
        assert_eq!(" transversion ".parse::<DistanceMetric>().unwrap(), DistanceMetric::TransversionOnly);
        assert!("jukes".parse::<DistanceMetric>().is_err());
        assert_eq!(DistanceMetric::K2P.to_string().parse::<DistanceMetric>().unwrap(), DistanceMetric::K2P);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = DistanceConfig::from_lookup(lookup_from(&[
            ("TAXONDIST_MIN_OVERLAP", "50"),
            ("TAXONDIST_METRIC", "k2p"),
            ("TAXONDIST_AMBIGUOUS", "false"),
            ("TAXONDIST_CACHE_LIMIT", "0.5"),
        ]));
        assert_eq!(config.minimum_overlap, 50);
        assert_eq!(config.metric, DistanceMetric::K2P);
        assert!(!config.ambiguous_bases_allowed);
        assert!((config.cache.memory_limit - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_from_lookup_ignores_garbage() {
        let config = DistanceConfig::from_lookup(lookup_from(&[
            ("TAXONDIST_MIN_OVERLAP", "-4"),
            ("TAXONDIST_METRIC", "jc69"),
            ("TAXONDIST_CACHE_LIMIT", "1.5"),
        ]));
        assert_eq!(config, DistanceConfig::default());
    }
}
