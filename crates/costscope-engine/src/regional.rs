//! Location parsing and regional multiplier resolution.

use std::collections::BTreeMap;

use costscope_models::building::{RegionalFactor, RegionalTable};
use once_cell::sync::Lazy;

/// US state and territory names keyed by lower-case name, valued by code.
static STATES: Lazy<BTreeMap<&'static str, &'static str>> = Lazy::new(|| {
    BTreeMap::from([
        ("alabama", "AL"),
        ("alaska", "AK"),
        ("arizona", "AZ"),
        ("arkansas", "AR"),
        ("california", "CA"),
        ("colorado", "CO"),
        ("connecticut", "CT"),
        ("delaware", "DE"),
        ("district of columbia", "DC"),
        ("florida", "FL"),
        ("georgia", "GA"),
        ("hawaii", "HI"),
        ("idaho", "ID"),
        ("illinois", "IL"),
        ("indiana", "IN"),
        ("iowa", "IA"),
        ("kansas", "KS"),
        ("kentucky", "KY"),
        ("louisiana", "LA"),
        ("maine", "ME"),
        ("maryland", "MD"),
        ("massachusetts", "MA"),
        ("michigan", "MI"),
        ("minnesota", "MN"),
        ("mississippi", "MS"),
        ("missouri", "MO"),
        ("montana", "MT"),
        ("nebraska", "NE"),
        ("nevada", "NV"),
        ("new hampshire", "NH"),
        ("new jersey", "NJ"),
        ("new mexico", "NM"),
        ("new york", "NY"),
        ("north carolina", "NC"),
        ("north dakota", "ND"),
        ("ohio", "OH"),
        ("oklahoma", "OK"),
        ("oregon", "OR"),
        ("pennsylvania", "PA"),
        ("puerto rico", "PR"),
        ("rhode island", "RI"),
        ("south carolina", "SC"),
        ("south dakota", "SD"),
        ("tennessee", "TN"),
        ("texas", "TX"),
        ("utah", "UT"),
        ("vermont", "VT"),
        ("virginia", "VA"),
        ("washington", "WA"),
        ("west virginia", "WV"),
        ("wisconsin", "WI"),
        ("wyoming", "WY"),
    ])
});

/// Resolve a state code from a code or a full name, case-insensitively.
pub fn state_code(input: &str) -> Option<&'static str> {
    let normalized = input.trim().trim_end_matches('.').to_ascii_lowercase();
    if let Some(code) = STATES.get(normalized.as_str()) {
        return Some(*code);
    }
    if normalized.len() == 2 {
        let upper = normalized.to_ascii_uppercase();
        return STATES.values().find(|code| **code == upper).copied();
    }
    None
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedLocation {
    pub city: Option<String>,
    /// Two-letter code, upper case.
    pub state: Option<String>,
}

/// Parse `"City, ST"`, `"City, State Name"`, `"ST"`, `"State Name"` or `"City"`.
/// Trailing ZIP codes are ignored.
pub fn parse_location(location: &str) -> ParsedLocation {
    let cleaned: String = location
        .split_whitespace()
        .filter(|token| !token.chars().all(|c| c.is_ascii_digit() || c == '-'))
        .collect::<Vec<_>>()
        .join(" ");
    let cleaned = cleaned.trim().trim_end_matches(',').trim();
    if cleaned.is_empty() {
        return ParsedLocation::default();
    }

    if let Some((city, state)) = cleaned.rsplit_once(',') {
        let city = non_empty(city);
        return ParsedLocation {
            state: state_code(state).map(str::to_string),
            city,
        };
    }

    if let Some(code) = state_code(cleaned) {
        return ParsedLocation {
            city: None,
            state: Some(code.to_string()),
        };
    }

    // "Austin TX" without a comma.
    if let Some((city, last)) = cleaned.rsplit_once(' ') {
        if last.len() == 2 {
            if let Some(code) = state_code(last) {
                return ParsedLocation {
                    city: non_empty(city),
                    state: Some(code.to_string()),
                };
            }
        }
    }

    ParsedLocation {
        city: Some(cleaned.to_string()),
        state: None,
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Which table entry produced the multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionalSource {
    City,
    State,
    CityOnlyOverride,
    Default,
}

impl RegionalSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegionalSource::City => "city",
            RegionalSource::State => "state",
            RegionalSource::CityOnlyOverride => "city_only_override",
            RegionalSource::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionalIssue {
    StateUndetermined,
    StateNotConfigured,
}

impl RegionalIssue {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegionalIssue::StateUndetermined => "state_undetermined",
            RegionalIssue::StateNotConfigured => "state_not_configured",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionalWarning {
    pub location: String,
    pub reason: RegionalIssue,
    pub fallback: RegionalSource,
    pub factor: RegionalFactor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionalResolution {
    pub location: ParsedLocation,
    pub factor: RegionalFactor,
    pub source: RegionalSource,
    pub warning: Option<RegionalWarning>,
}

/// Resolve cost and revenue multipliers. The building type's table is
/// consulted before the registry-wide defaults at every level.
pub fn resolve(
    location: &str,
    building: &RegionalTable,
    defaults: &RegionalTable,
) -> RegionalResolution {
    let parsed = parse_location(location);
    let tables = [building, defaults];

    if let Some(state) = parsed.state.as_deref() {
        if let Some(city) = parsed.city.as_deref() {
            let key = format!("{}, {}", city.to_ascii_lowercase(), state.to_ascii_lowercase());
            if let Some(factor) = tables.iter().find_map(|t| t.cities.get(&key)) {
                return resolution(parsed, *factor, RegionalSource::City, None);
            }
        }
        if let Some(factor) = tables.iter().find_map(|t| t.states.get(state)) {
            return resolution(parsed, *factor, RegionalSource::State, None);
        }
        let warning = RegionalWarning {
            location: location.to_string(),
            reason: RegionalIssue::StateNotConfigured,
            fallback: RegionalSource::Default,
            factor: RegionalFactor::NEUTRAL,
        };
        return resolution(parsed, RegionalFactor::NEUTRAL, RegionalSource::Default, Some(warning));
    }

    let city_override = parsed.city.as_deref().and_then(|city| {
        let key = city.to_ascii_lowercase();
        tables.iter().find_map(|t| t.city_only_overrides.get(&key))
    });
    let (factor, source) = match city_override {
        Some(factor) => (*factor, RegionalSource::CityOnlyOverride),
        None => (RegionalFactor::NEUTRAL, RegionalSource::Default),
    };
    let warning = RegionalWarning {
        location: location.to_string(),
        reason: RegionalIssue::StateUndetermined,
        fallback: source,
        factor,
    };
    resolution(parsed, factor, source, Some(warning))
}

fn resolution(
    location: ParsedLocation,
    factor: RegionalFactor,
    source: RegionalSource,
    warning: Option<RegionalWarning>,
) -> RegionalResolution {
    RegionalResolution {
        location,
        factor,
        source,
        warning,
    }
}
