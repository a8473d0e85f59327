use std::fmt;

use serde::Serialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum County {
    Utah,
    SaltLake,
}

impl County {
    pub fn name(self) -> &'static str {
        match self {
            County::Utah => "Utah County",
            County::SaltLake => "Salt Lake County",
        }
    }

    pub fn slugs(self) -> &'static [&'static str] {
        match self {
            County::Utah => UTAH_COUNTY,
            County::SaltLake => SALT_LAKE_COUNTY,
        }
    }
}

const UTAH_COUNTY: &[&str] = &[
    "alpine",
    "american-fork",
    "eagle-mountain",
    "highland",
    "lindon",
    "lehi",
    "orem",
    "provo",
    "saratoga-springs",
    "spanish-fork",
];

const SALT_LAKE_COUNTY: &[&str] = &[
    "draper",
    "holladay",
    "midvale",
    "millcreek",
    "cottonwood-heights",
    "murray",
    "salt-lake-city",
    "sandy",
    "south-jordan",
    "south-salt-lake",
    "sugarhouse",
    "west-jordan",
    "west-valley",
];

const COUNTIES: [County; 2] = [County::Utah, County::SaltLake];

/// One supported municipality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CityTarget {
    pub slug: &'static str,
    pub county: County,
}

impl CityTarget {
    pub fn lookup(slug: &str) -> Option<CityTarget> {
        let slug = slug.trim();
        COUNTIES.iter().find_map(|&county| {
            county
                .slugs()
                .iter()
                .find(|&&s| s.eq_ignore_ascii_case(slug))
                .map(|&slug| CityTarget { slug, county })
        })
    }

    /// Every supported city, Utah County first, in registry order.
    pub fn all() -> Vec<CityTarget> {
        COUNTIES
            .iter()
            .flat_map(|&county| {
                county
                    .slugs()
                    .iter()
                    .map(move |&slug| CityTarget { slug, county })
            })
            .collect()
    }

    /// Path of the city's search results, relative to the site root.
    pub fn search_path(&self) -> String {
        format!("{}-homes", self.slug)
    }
}

impl fmt::Display for CityTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.slug, self.county.name())
    }
}

/// Resolves configured identifiers in order. The first unknown one fails the lot.
pub fn resolve_cities<S: AsRef<str>>(slugs: &[S]) -> Result<Vec<CityTarget>, ConfigError> {
    if slugs.is_empty() {
        return Err(ConfigError::NoCities);
    }
    slugs
        .iter()
        .map(|slug| {
            CityTarget::lookup(slug.as_ref())
                .ok_or_else(|| ConfigError::UnknownCity(slug.as_ref().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_registered_slug_resolves_to_its_county() {
        for county in COUNTIES {
            for slug in county.slugs() {
                let target = CityTarget::lookup(slug).unwrap();
                assert_eq!(target.county, county);
                assert_eq!(target.slug, *slug);
            }
        }
        assert_eq!(CityTarget::all().len(), 23);
    }

    #[test]
    fn lookup_ignores_case_and_surrounding_space() {
        let target = CityTarget::lookup(" Salt-Lake-City ").unwrap();
        assert_eq!(target.slug, "salt-lake-city");
        assert_eq!(target.county, County::SaltLake);
    }

    #[test]
    fn unknown_slug_is_a_configuration_error() {
        let err = resolve_cities(&["provo", "not-a-real-city"]).unwrap_err();
        assert_eq!(err, ConfigError::UnknownCity("not-a-real-city".into()));
    }

    #[test]
    fn empty_city_list_is_rejected() {
        let empty: [&str; 0] = [];
        assert_eq!(resolve_cities(&empty).unwrap_err(), ConfigError::NoCities);
    }

    #[test]
    fn resolution_keeps_configured_order() {
        let targets = resolve_cities(&["sandy", "provo"]).unwrap();
        let slugs: Vec<_> = targets.iter().map(|t| t.slug).collect();
        assert_eq!(slugs, vec!["sandy", "provo"]);
        assert_eq!(targets[0].search_path(), "sandy-homes");
    }
}
