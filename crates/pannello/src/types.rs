use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the user sells surplus energy: a fixed tariff or the day-ahead market
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "UPPERCASE")]
pub enum FeeScheme {
    Fixed,
    Market,
}

impl FeeScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeeScheme::Fixed => "FIXED",
            FeeScheme::Market => "MARKET",
        }
    }
}

impl fmt::Display for FeeScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeeScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FIXED" => Ok(FeeScheme::Fixed),
            "MARKET" => Ok(FeeScheme::Market),
            other => Err(format!("unknown fee scheme: {other:?}")),
        }
    }
}

/// The installation profile entered through the user form.
///
/// Numeric inputs are optional: a blank form field is stored as absent rather
/// than as zero, so validation can tell "not entered" from "entered as 0".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    /// Bidding zone name as understood by the backend (e.g. "Italy North")
    pub country: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Metres above sea level
    pub altitude: Option<f64>,
    /// IANA timezone name, e.g. "Europe/Rome"
    pub timezone: String,
    /// Panel surface in m²
    pub surface_area: Option<f64>,
    /// Panel efficiency as a fraction or percentage, forwarded untouched
    pub panel_efficiency: Option<f64>,
    pub fee_scheme: Option<FeeScheme>,
    /// €/kWh, only meaningful with [`FeeScheme::Fixed`]
    pub fixed_price: Option<f64>,
    pub account_email: String,
}

/// A single field of [`UserProfile`], used to declare what each panel needs
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ProfileField {
    Country,
    Latitude,
    Longitude,
    Altitude,
    Timezone,
    SurfaceArea,
    PanelEfficiency,
    FeeScheme,
    FixedPrice,
    AccountEmail,
}

impl ProfileField {
    /// Field name as it appears in the persisted JSON record
    pub fn name(&self) -> &'static str {
        match self {
            ProfileField::Country => "country",
            ProfileField::Latitude => "latitude",
            ProfileField::Longitude => "longitude",
            ProfileField::Altitude => "altitude",
            ProfileField::Timezone => "timezone",
            ProfileField::SurfaceArea => "surfaceArea",
            ProfileField::PanelEfficiency => "panelEfficiency",
            ProfileField::FeeScheme => "feeScheme",
            ProfileField::FixedPrice => "fixedPrice",
            ProfileField::AccountEmail => "accountEmail",
        }
    }

    /// Whether this field is blank, absent or out of range in `profile`
    pub fn is_missing(&self, profile: &UserProfile) -> bool {
        fn blank(s: &str) -> bool {
            s.trim().is_empty()
        }
        fn absent(v: Option<f64>) -> bool {
            !v.is_some_and(f64::is_finite)
        }
        fn non_positive(v: Option<f64>) -> bool {
            !v.is_some_and(|x| x.is_finite() && x > 0.0)
        }

        match self {
            ProfileField::Country => blank(&profile.country),
            ProfileField::Latitude => absent(profile.latitude),
            ProfileField::Longitude => absent(profile.longitude),
            ProfileField::Altitude => absent(profile.altitude),
            ProfileField::Timezone => blank(&profile.timezone),
            ProfileField::SurfaceArea => non_positive(profile.surface_area),
            ProfileField::PanelEfficiency => non_positive(profile.panel_efficiency),
            ProfileField::FeeScheme => profile.fee_scheme.is_none(),
            ProfileField::FixedPrice => absent(profile.fixed_price),
            ProfileField::AccountEmail => blank(&profile.account_email),
        }
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl UserProfile {
    /// Return the fields of `required` that are not usable in this profile
    pub fn missing_fields(&self, required: &[ProfileField]) -> Vec<ProfileField> {
        required
            .iter()
            .copied()
            .filter(|field| field.is_missing(self))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_profile() -> UserProfile {
        UserProfile {
            country: "Italy North".to_string(),
            latitude: Some(45.07),
            longitude: Some(7.69),
            altitude: Some(240.0),
            timezone: "Europe/Rome".to_string(),
            surface_area: Some(12.5),
            panel_efficiency: Some(0.21),
            fee_scheme: Some(FeeScheme::Market),
            fixed_price: Some(0.12),
            account_email: "user@example.com".to_string(),
        }
    }

    const ALL_FIELDS: &[ProfileField] = &[
        ProfileField::Country,
        ProfileField::Latitude,
        ProfileField::Longitude,
        ProfileField::Altitude,
        ProfileField::Timezone,
        ProfileField::SurfaceArea,
        ProfileField::PanelEfficiency,
        ProfileField::FeeScheme,
        ProfileField::FixedPrice,
        ProfileField::AccountEmail,
    ];

    #[test]
    fn test_full_profile_has_no_missing_fields() {
        assert!(full_profile().missing_fields(ALL_FIELDS).is_empty());
    }

    #[test]
    fn test_default_profile_misses_everything() {
        let missing = UserProfile::default().missing_fields(ALL_FIELDS);
        assert_eq!(missing, ALL_FIELDS);
    }

    #[test]
    fn test_zero_coordinates_are_present() {
        let mut profile = full_profile();
        profile.latitude = Some(0.0);
        profile.longitude = Some(0.0);

        assert!(profile
            .missing_fields(&[ProfileField::Latitude, ProfileField::Longitude])
            .is_empty());
    }

    #[test]
    fn test_non_positive_surface_and_efficiency_are_missing() {
        let mut profile = full_profile();
        profile.surface_area = Some(0.0);
        profile.panel_efficiency = Some(-0.2);

        let missing = profile.missing_fields(ALL_FIELDS);
        assert_eq!(
            missing,
            vec![ProfileField::SurfaceArea, ProfileField::PanelEfficiency]
        );
    }

    #[test]
    fn test_nan_counts_as_missing() {
        let mut profile = full_profile();
        profile.altitude = Some(f64::NAN);

        assert_eq!(
            profile.missing_fields(&[ProfileField::Altitude]),
            vec![ProfileField::Altitude]
        );
    }

    #[test]
    fn test_whitespace_strings_are_missing() {
        let mut profile = full_profile();
        profile.timezone = "   ".to_string();
        profile.account_email = "\t".to_string();

        assert_eq!(
            profile.missing_fields(ALL_FIELDS),
            vec![ProfileField::Timezone, ProfileField::AccountEmail]
        );
    }

    #[test]
    fn test_profile_serializes_camel_case() {
        let json = serde_json::to_string(&full_profile()).unwrap();

        assert!(json.contains("\"surfaceArea\":12.5"));
        assert!(json.contains("\"panelEfficiency\":0.21"));
        assert!(json.contains("\"feeScheme\":\"MARKET\""));
        assert!(json.contains("\"accountEmail\":\"user@example.com\""));
    }

    #[test]
    fn test_profile_deserializes_partial_record() {
        let json = r#"{"latitude":45.0,"longitude":7.0}"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();

        assert_eq!(profile.latitude, Some(45.0));
        assert_eq!(profile.surface_area, None);
        assert!(profile.country.is_empty());
    }

    #[test]
    fn test_fee_scheme_from_str() {
        assert_eq!("fixed".parse::<FeeScheme>().unwrap(), FeeScheme::Fixed);
        assert_eq!(" MARKET ".parse::<FeeScheme>().unwrap(), FeeScheme::Market);
        assert!("auction".parse::<FeeScheme>().is_err());
    }

    #[test]
    fn test_field_names_match_serialized_keys() {
        let value = serde_json::to_value(full_profile()).unwrap();
        for field in ALL_FIELDS {
            assert!(value.get(field.name()).is_some(), "{} not serialized", field);
        }
    }
}
