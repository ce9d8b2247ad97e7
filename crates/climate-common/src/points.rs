//! Representative-point registry.

use serde::{Deserialize, Serialize};

use crate::error::{ClimateError, ClimateResult};

/// A named target location used to drive filtered ingestion and to report
/// query results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepresentativePoint {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub region: String,
}

impl RepresentativePoint {
    pub fn new(name: &str, lat: f64, lon: f64, region: &str) -> Self {
        Self {
            name: name.to_string(),
            lat,
            lon,
            region: region.to_string(),
        }
    }
}

/// Static list of representative points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRegistry {
    pub points: Vec<RepresentativePoint>,
}

impl Default for PointRegistry {
    fn default() -> Self {
        Self {
            points: vec![
                RepresentativePoint::new("Chartres", 48.45, 1.49, "beauce"),
                RepresentativePoint::new("Orléans", 47.90, 1.90, "beauce"),
                RepresentativePoint::new("Châteaudun", 48.07, 1.33, "beauce"),
                RepresentativePoint::new("Rennes", 48.11, -1.68, "bretagne"),
                RepresentativePoint::new("Brest", 48.39, -4.49, "bretagne"),
                RepresentativePoint::new("Vannes", 47.66, -2.76, "bretagne"),
            ],
        }
    }
}

impl PointRegistry {
    /// Parse a registry from YAML (`points: [{name, lat, lon, region}]`).
    pub fn from_yaml(yaml: &str) -> ClimateResult<Self> {
        let registry: PointRegistry = serde_yaml::from_str(yaml)?;
        for point in &registry.points {
            if point.name.trim().is_empty() {
                return Err(ClimateError::Config("point with empty name".to_string()));
            }
            if !(-90.0..=90.0).contains(&point.lat) || !point.lon.is_finite() {
                return Err(ClimateError::Config(format!(
                    "point '{}' has invalid coordinates ({}, {})",
                    point.name, point.lat, point.lon
                )));
            }
        }
        Ok(registry)
    }

    /// Load a registry from a YAML file.
    pub fn load(path: &std::path::Path) -> ClimateResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClimateError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    pub fn all(&self) -> &[RepresentativePoint] {
        &self.points
    }

    /// Look up a point by name, case-insensitively.
    pub fn find(&self, name: &str) -> Option<&RepresentativePoint> {
        let name = name.to_lowercase();
        self.points.iter().find(|p| p.name.to_lowercase() == name)
    }

    pub fn region(&self, region: &str) -> Vec<RepresentativePoint> {
        self.points
            .iter()
            .filter(|p| p.region.eq_ignore_ascii_case(region))
            .cloned()
            .collect()
    }

    pub fn regions(&self) -> Vec<String> {
        let mut regions: Vec<String> = self.points.iter().map(|p| p.region.clone()).collect();
        regions.sort();
        regions.dedup();
        regions
    }

    /// Resolve a selector: `all`, a region tag, or a comma-separated list of
    /// point names. Returns `None` if any name is unknown.
    pub fn select(&self, selector: &str) -> Option<Vec<RepresentativePoint>> {
        let selector = selector.trim();
        if selector.eq_ignore_ascii_case("all") {
            return Some(self.points.clone());
        }
        let by_region = self.region(selector);
        if !by_region.is_empty() {
            return Some(by_region);
        }
        selector
            .split(',')
            .map(|name| self.find(name.trim()).cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry() {
        let registry = PointRegistry::default();
        assert_eq!(registry.all().len(), 6);
        assert_eq!(registry.regions(), vec!["beauce", "bretagne"]);
        assert_eq!(registry.region("Bretagne").len(), 3);
    }

    #[test]
    fn test_find_is_optional() {
        let registry = PointRegistry::default();
        assert_eq!(registry.find("rennes").map(|p| p.lat), Some(48.11));
        assert_eq!(registry.find("CHÂTEAUDUN").map(|p| p.lon), Some(1.33));
        assert!(registry.find("Lyon").is_none());
    }

    #[test]
    fn test_select() {
        let registry = PointRegistry::default();
        assert_eq!(registry.select("all").unwrap().len(), 6);
        assert_eq!(registry.select("beauce").unwrap().len(), 3);
        assert_eq!(registry.select("Brest, Vannes").unwrap().len(), 2);
        assert!(registry.select("Brest,Lyon").is_none());
    }

    #[test]
    fn test_from_yaml() {
        let yaml = "points:\n  - name: Dijon\n    lat: 47.32\n    lon: 5.04\n    region: bourgogne\n";
        let registry = PointRegistry::from_yaml(yaml).unwrap();
        assert_eq!(registry.all()[0].name, "Dijon");

        let bad = "points:\n  - name: Nowhere\n    lat: 123.0\n    lon: 0.0\n    region: x\n";
        assert!(matches!(PointRegistry::from_yaml(bad), Err(ClimateError::Config(_))));
    }
}
