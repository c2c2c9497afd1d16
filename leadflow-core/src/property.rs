//! Property answers of the quick estimation form and the price model

use serde::{Deserialize, Serialize};

use crate::validation::FieldErrors;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Appartement,
    Maison,
    Terrain,
    Immeuble,
}

impl PropertyType {
    /// Multiplier applied to the local apartment price per m²
    fn coefficient(&self) -> f64 {
        match self {
            PropertyType::Appartement => 1.0,
            PropertyType::Maison => 0.94,
            PropertyType::Immeuble => 0.82,
            PropertyType::Terrain => 0.11,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    Vente,
    Achat,
    Investissement,
    Curiosite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timeline {
    #[serde(rename = "immediat")]
    Immediate,
    #[serde(rename = "3-mois")]
    ThreeMonths,
    #[serde(rename = "6-mois")]
    SixMonths,
    #[serde(rename = "plus-tard")]
    Later,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnershipStatus {
    Proprietaire,
    Coproprietaire,
    Heritier,
    Locataire,
}

const MIN_SURFACE: f64 = 9.0;
const MAX_SURFACE: f64 = 10_000.0;

/// Property step of the quick estimation form, as the visitor filled it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimationForm {
    pub property_type: Option<PropertyType>,
    pub surface: Option<f64>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub postal_code: String,
    pub project_type: Option<ProjectType>,
    pub timeline: Option<Timeline>,
    pub ownership_status: Option<OwnershipStatus>,
    #[serde(default)]
    pub wants_expert_contact: bool,
}

/// Property answers that passed validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDetails {
    pub property_type: PropertyType,
    pub surface: f64,
    pub city: String,
    pub address: String,
    pub postal_code: String,
    pub project_type: ProjectType,
    pub timeline: Timeline,
    pub ownership_status: OwnershipStatus,
    pub wants_expert_contact: bool,
}

impl EstimationForm {
    pub fn validate(&self) -> Result<PropertyDetails, FieldErrors> {
        let mut errors = FieldErrors::new();

        if self.property_type.is_none() {
            errors.add("propertyType", "Choisissez un type de bien");
        }
        match self.surface {
            None => errors.add("surface", "La surface est requise"),
            Some(s) if !s.is_finite() || !(MIN_SURFACE..=MAX_SURFACE).contains(&s) => {
                errors.add("surface", "La surface doit être comprise entre 9 et 10 000 m²")
            }
            Some(_) => {}
        }
        if self.city.trim().is_empty() {
            errors.add("city", "La ville est requise");
        }
        let postal_code = self.postal_code.trim();
        if postal_code.len() != 5 || !postal_code.chars().all(|c| c.is_ascii_digit()) {
            errors.add("postalCode", "Code postal invalide");
        } else if !postal_code.starts_with("33") {
            errors.add("postalCode", "Nous estimons uniquement les biens situés en Gironde (33)");
        }
        if self.project_type.is_none() {
            errors.add("projectType", "Précisez votre projet");
        }
        if self.timeline.is_none() {
            errors.add("timeline", "Précisez votre délai");
        }
        if self.ownership_status.is_none() {
            errors.add("ownershipStatus", "Précisez votre situation");
        }

        match (
            self.property_type,
            self.surface,
            self.project_type,
            self.timeline,
            self.ownership_status,
        ) {
            (Some(property_type), Some(surface), Some(project_type), Some(timeline), Some(ownership))
                if errors.is_empty() =>
            {
                Ok(PropertyDetails {
                    property_type,
                    surface,
                    city: self.city.trim().to_string(),
                    address: self.address.trim().to_string(),
                    postal_code: postal_code.to_string(),
                    project_type,
                    timeline,
                    ownership_status: ownership,
                    wants_expert_contact: self.wants_expert_contact,
                })
            }
            _ => Err(errors),
        }
    }
}

/// Apartment price per m² for the communes the agency covers
const CITY_PRICES: &[(&str, f64)] = &[
    ("bordeaux", 4600.0),
    ("arcachon", 6900.0),
    ("le bouscat", 4500.0),
    ("bruges", 4100.0),
    ("talence", 4000.0),
    ("merignac", 3900.0),
    ("pessac", 3700.0),
    ("begles", 3600.0),
    ("villenave-d'ornon", 3400.0),
    ("cenon", 3000.0),
    ("lormont", 2800.0),
    ("libourne", 2500.0),
];

/// Fallback for the rest of the department
const GIRONDE_DEFAULT_PRICE: f64 = 2900.0;

const RANGE_SPREAD: f64 = 0.08;

/// Price range returned to the visitor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimationRange {
    pub low: u64,
    pub median: u64,
    pub high: u64,
    pub price_per_sqm: u64,
}

fn normalize_city(city: &str) -> String {
    city.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'à' | 'â' => 'a',
            'î' | 'ï' => 'i',
            'ô' => 'o',
            'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            '’' => '\'',
            _ => c,
        })
        .collect()
}

pub fn city_price_per_sqm(city: &str) -> f64 {
    let city = normalize_city(city);
    CITY_PRICES
        .iter()
        .find(|(name, _)| *name == city)
        .map(|(_, price)| *price)
        .unwrap_or(GIRONDE_DEFAULT_PRICE)
}

fn round_to_thousand(value: f64) -> u64 {
    ((value / 1000.0).round() * 1000.0).max(0.0) as u64
}

/// Compute the quick estimate for validated property answers
pub fn estimate(details: &PropertyDetails) -> EstimationRange {
    let price_per_sqm = city_price_per_sqm(&details.city) * details.property_type.coefficient();
    let median = price_per_sqm * details.surface;

    EstimationRange {
        low: round_to_thousand(median * (1.0 - RANGE_SPREAD)),
        median: round_to_thousand(median),
        high: round_to_thousand(median * (1.0 + RANGE_SPREAD)),
        price_per_sqm: price_per_sqm.round() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> EstimationForm {
        EstimationForm {
            property_type: Some(PropertyType::Appartement),
            surface: Some(50.0),
            city: "Bordeaux".into(),
            address: "12 rue Sainte-Catherine".into(),
            postal_code: "33000".into(),
            project_type: Some(ProjectType::Vente),
            timeline: Some(Timeline::ThreeMonths),
            ownership_status: Some(OwnershipStatus::Proprietaire),
            wants_expert_contact: true,
        }
    }

    #[test]
    fn test_valid_form() {
        let details = form().validate().unwrap();
        assert_eq!(details.postal_code, "33000");
        assert!(details.wants_expert_contact);
    }

    #[test]
    fn test_postal_code_outside_gironde() {
        let mut f = form();
        f.postal_code = "75011".into();
        let errors = f.validate().unwrap_err();
        assert!(errors.get("postalCode").unwrap().contains("Gironde"));
    }

    #[test]
    fn test_surface_bounds() {
        let mut f = form();
        f.surface = Some(3.0);
        assert!(f.validate().unwrap_err().contains("surface"));

        f.surface = Some(f64::NAN);
        assert!(f.validate().unwrap_err().contains("surface"));
    }

    #[test]
    fn test_bordeaux_estimate() {
        let range = estimate(&form().validate().unwrap());
        assert_eq!(range.price_per_sqm, 4600);
        assert_eq!(range.median, 230_000);
        assert_eq!(range.low, 212_000);
        assert_eq!(range.high, 248_000);
    }

    #[test]
    fn test_city_lookup_ignores_accents() {
        assert_eq!(city_price_per_sqm("Mérignac"), 3900.0);
        assert_eq!(city_price_per_sqm("  BÈGLES "), 3600.0);
        assert_eq!(city_price_per_sqm("Saint-Émilion"), GIRONDE_DEFAULT_PRICE);
    }

    #[test]
    fn test_timeline_wire_names() {
        let json = serde_json::to_string(&Timeline::ThreeMonths).unwrap();
        assert_eq!(json, "\"3-mois\"");
    }
}
