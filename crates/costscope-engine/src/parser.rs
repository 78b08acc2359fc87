//! Mixed-use hints in free-text project descriptions.
//!
//! This is the description-parser collaborator: it only reports what it
//! finds. Whether a hint is applied, and how it is validated against the
//! subtype's components, is decided by [`crate::mixed_use`].

use costscope_models::mixed_use::{Component, MixPatternKind};
use costscope_registry::QualitativeMix;
use rust_decimal::Decimal;

/// A split suggested by a project description.
#[derive(Debug, Clone, PartialEq)]
pub struct MixHint {
    pub pattern: MixPatternKind,
    /// Named shares, in percent, in the order they appear. Empty for `balanced`.
    pub shares: Vec<(String, Decimal)>,
}

/// Scan `description` for a mixed-use split. Explicit numbers win over
/// qualitative wording: percent pair, ratio pair, "mostly X", "X-heavy",
/// then "balanced".
pub fn detect_mix(description: &str, qualitative: &QualitativeMix) -> Option<MixHint> {
    let tokens = tokenize(description);
    if tokens.is_empty() {
        return None;
    }

    percent_pair(&tokens)
        .or_else(|| ratio_pair(&tokens))
        .or_else(|| mostly(&tokens, qualitative.mostly))
        .or_else(|| heavy(&tokens, qualitative.heavy))
        .or_else(|| balanced(&tokens))
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_ascii_lowercase()
        .split(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '%' | '/' | ':' | '.' | '-')))
        .map(|t| t.trim_matches(|c| c == '.' || c == '-').to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Component words inside a token, e.g. `office/residential` or `retail-heavy`.
fn components_in(token: &str) -> Vec<String> {
    token
        .split(['/', '-'])
        .filter(|part| Component::parse(part).is_some())
        .map(str::to_string)
        .collect()
}

fn parse_number(s: &str) -> Option<Decimal> {
    s.parse::<Decimal>().ok().filter(|d| *d >= Decimal::ZERO)
}

/// `70% residential 30% retail`, `70% of the space residential`.
fn percent_pair(tokens: &[String]) -> Option<MixHint> {
    let mut shares = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        let Some(number) = token.strip_suffix('%').and_then(parse_number) else {
            continue;
        };
        let name = tokens[i + 1..]
            .iter()
            .take(4)
            .take_while(|t| !t.ends_with('%'))
            .find_map(|t| components_in(t).into_iter().next());
        if let Some(name) = name {
            shares.push((name, number));
        }
    }
    (shares.len() >= 2).then_some(MixHint {
        pattern: MixPatternKind::PercentPair,
        shares,
    })
}

/// `60/40 office/residential`, `residential over retail, 80:20`.
fn ratio_pair(tokens: &[String]) -> Option<MixHint> {
    let (left, right) = tokens.iter().find_map(|t| {
        let (a, b) = t.split_once(['/', ':'])?;
        Some((parse_number(a)?, parse_number(b)?))
    })?;

    let names: Vec<String> = tokens.iter().flat_map(|t| components_in(t)).collect();
    let mut distinct: Vec<String> = Vec::new();
    for name in names {
        let component = Component::parse(&name);
        if !distinct.iter().any(|d| Component::parse(d) == component) {
            distinct.push(name);
        }
    }
    if distinct.len() < 2 {
        return None;
    }
    Some(MixHint {
        pattern: MixPatternKind::RatioPair,
        shares: vec![(distinct[0].clone(), left), (distinct[1].clone(), right)],
    })
}

/// `mostly residential`, `primarily office`.
fn mostly(tokens: &[String], share: Decimal) -> Option<MixHint> {
    tokens.windows(2).find_map(|pair| {
        if !matches!(pair[0].as_str(), "mostly" | "primarily" | "predominantly" | "largely") {
            return None;
        }
        let name = components_in(&pair[1]).into_iter().next()?;
        Some(MixHint {
            pattern: MixPatternKind::Mostly,
            shares: vec![(name, share)],
        })
    })
}

/// `office-heavy`, `residential heavy`.
fn heavy(tokens: &[String], share: Decimal) -> Option<MixHint> {
    for (i, token) in tokens.iter().enumerate() {
        let name = if let Some(prefix) = token.strip_suffix("-heavy") {
            Component::parse(prefix).map(|_| prefix.to_string())
        } else if token == "heavy" && i > 0 {
            components_in(&tokens[i - 1]).into_iter().last()
        } else {
            None
        };
        if let Some(name) = name {
            return Some(MixHint {
                pattern: MixPatternKind::Heavy,
                shares: vec![(name, share)],
            });
        }
    }
    None
}

fn balanced(tokens: &[String]) -> Option<MixHint> {
    let found = tokens.iter().any(|t| t == "balanced")
        || tokens.windows(2).any(|w| w[0] == "even" && w[1] == "split");
    found.then(|| MixHint {
        pattern: MixPatternKind::Balanced,
        shares: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn qualitative() -> QualitativeMix {
        QualitativeMix {
            mostly: dec!(70),
            heavy: dec!(65),
        }
    }

    fn detect(text: &str) -> Option<MixHint> {
        detect_mix(text, &qualitative())
    }

    #[test]
    fn percent_pair() {
        let hint = detect("Tower with 70% residential and 30% retail on the podium").unwrap();
        assert_eq!(hint.pattern, MixPatternKind::PercentPair);
        assert_eq!(
            hint.shares,
            vec![
                ("residential".to_string(), dec!(70)),
                ("retail".to_string(), dec!(30))
            ]
        );
    }

    #[test]
    fn ratio_pair_with_slash_names() {
        let hint = detect("A 60/40 office/residential building").unwrap();
        assert_eq!(hint.pattern, MixPatternKind::RatioPair);
        assert_eq!(hint.shares[0], ("office".to_string(), dec!(60)));
        assert_eq!(hint.shares[1], ("residential".to_string(), dec!(40)));
    }

    #[test]
    fn ratio_pair_with_colon_and_names_first() {
        let hint = detect("Apartments over shops, 80:20").unwrap();
        assert_eq!(hint.pattern, MixPatternKind::RatioPair);
        assert_eq!(hint.shares[0], ("apartments".to_string(), dec!(80)));
        assert_eq!(hint.shares[1], ("shops".to_string(), dec!(20)));
    }

    #[test]
    fn ratio_needs_two_components() {
        assert_eq!(detect("60/40 office"), None);
    }

    #[test]
    fn qualitative_hints() {
        let hint = detect("Mostly residential with some office").unwrap();
        assert_eq!(hint.pattern, MixPatternKind::Mostly);
        assert_eq!(hint.shares, vec![("residential".to_string(), dec!(70))]);

        let hint = detect("an office-heavy mixed-use project").unwrap();
        assert_eq!(hint.pattern, MixPatternKind::Heavy);
        assert_eq!(hint.shares, vec![("office".to_string(), dec!(65))]);

        let hint = detect("Balanced live/work program").unwrap();
        assert_eq!(hint.pattern, MixPatternKind::Balanced);
        assert!(hint.shares.is_empty());
    }

    #[test]
    fn numbers_win_over_words() {
        let hint = detect("mostly residential, 55% residential 45% retail").unwrap();
        assert_eq!(hint.pattern, MixPatternKind::PercentPair);
    }

    #[test]
    fn nothing_to_find() {
        assert_eq!(detect("Three-story medical office building"), None);
        assert_eq!(detect(""), None);
    }
}
