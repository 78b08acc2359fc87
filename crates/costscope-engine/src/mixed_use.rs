//! Mixed-use split resolution.
//!
//! Precedence is caller override, then a detected description hint, then the
//! subtype's default split. Any invalid input fails closed to the default
//! split with an [`InvalidMix`] diagnostic; a partially applied mix is never
//! returned.

use std::collections::BTreeMap;

use costscope_models::building::MixedUseProfile;
use costscope_models::mixed_use::{
    Component, InvalidMix, InvalidMixReason, MixPatternKind, MixSource, MixedUseSplit,
};
use rust_decimal::Decimal;

use crate::money::{round_to, split_by_shares};
use crate::parser::MixHint;

/// A validated split and the blended factors it implies.
#[derive(Debug, Clone, PartialEq)]
pub struct MixResolution {
    pub split: MixedUseSplit,
    /// Share-weighted component cost factor.
    pub cost_factor: Decimal,
    /// Share-weighted component revenue factor.
    pub revenue_factor: Decimal,
}

pub fn resolve_split(
    profile: &MixedUseProfile,
    overrides: Option<&BTreeMap<String, Decimal>>,
    hint: Option<&MixHint>,
) -> MixResolution {
    let split = match (overrides, hint) {
        (Some(values), _) => {
            let named: Vec<(String, Decimal)> =
                values.iter().map(|(k, v)| (k.clone(), *v)).collect();
            apply_named(profile, &named, MixSource::Override, None)
        }
        (None, Some(hint)) if hint.pattern == MixPatternKind::Balanced => MixedUseSplit {
            source: MixSource::Detected,
            pattern: Some(MixPatternKind::Balanced),
            value: even_split(profile),
            normalization_applied: false,
            inference_applied: false,
            invalid_mix: None,
        },
        (None, Some(hint)) => {
            apply_named(profile, &hint.shares, MixSource::Detected, Some(hint.pattern))
        }
        (None, None) => default_split(profile, None),
    };

    let cost_factor = blended(profile, &split, |c| {
        profile.component(c).map(|p| p.cost_factor)
    });
    let revenue_factor = blended(profile, &split, |c| {
        profile.component(c).map(|p| p.revenue_factor)
    });

    MixResolution {
        split,
        cost_factor,
        revenue_factor,
    }
}

fn blended(
    profile: &MixedUseProfile,
    split: &MixedUseSplit,
    factor: impl Fn(Component) -> Option<Decimal>,
) -> Decimal {
    let total: Decimal = profile
        .components
        .iter()
        .filter_map(|c| factor(c.component).map(|f| f * split.share_of(c.component)))
        .sum();
    round_to(total / Decimal::ONE_HUNDRED, 4)
}

/// Component order used for residual allocation: as declared by the subtype.
fn component_order(profile: &MixedUseProfile) -> Vec<Component> {
    profile.components.iter().map(|c| c.component).collect()
}

fn to_value(order: &[Component], shares: &[Decimal]) -> BTreeMap<String, Decimal> {
    order
        .iter()
        .zip(shares)
        .map(|(c, s)| (c.as_str().to_string(), *s))
        .collect()
}

/// Scale `weights` so they sum to exactly 100, residual to the last entry.
fn to_percent(weights: &[Decimal]) -> Vec<Decimal> {
    let total: Decimal = weights.iter().copied().sum();
    if total.is_zero() {
        return vec![Decimal::ZERO; weights.len()];
    }
    let fractions: Vec<Decimal> = weights.iter().map(|w| *w / total).collect();
    split_by_shares(Decimal::ONE_HUNDRED, &fractions)
}

fn even_split(profile: &MixedUseProfile) -> BTreeMap<String, Decimal> {
    let order = component_order(profile);
    let weights = vec![Decimal::ONE; order.len()];
    to_value(&order, &to_percent(&weights))
}

fn default_split(profile: &MixedUseProfile, invalid_mix: Option<InvalidMix>) -> MixedUseSplit {
    let order = component_order(profile);
    let declared: Option<Vec<Decimal>> =
        profile.components.iter().map(|c| c.default_share).collect();
    let value = match declared {
        Some(shares) if !shares.is_empty() => to_value(&order, &to_percent(&shares)),
        _ => even_split(profile),
    };
    MixedUseSplit {
        source: MixSource::Default,
        pattern: None,
        value,
        normalization_applied: false,
        inference_applied: false,
        invalid_mix,
    }
}

fn reject(profile: &MixedUseProfile, reason: InvalidMixReason, detail: Vec<String>) -> MixedUseSplit {
    default_split(profile, Some(InvalidMix { reason, detail }))
}

fn apply_named(
    profile: &MixedUseProfile,
    named: &[(String, Decimal)],
    source: MixSource,
    pattern: Option<MixPatternKind>,
) -> MixedUseSplit {
    let unsupported: Vec<String> = named
        .iter()
        .filter(|(name, _)| !Component::parse(name).is_some_and(|c| profile.supports(c)))
        .map(|(name, _)| name.clone())
        .collect();
    if !unsupported.is_empty() {
        return reject(profile, InvalidMixReason::UnsupportedComponent, unsupported);
    }

    let negative: Vec<String> = named
        .iter()
        .filter(|(_, share)| *share < Decimal::ZERO)
        .map(|(name, share)| format!("{name}={share}"))
        .collect();
    if !negative.is_empty() {
        return reject(profile, InvalidMixReason::NegativeShare, negative);
    }

    // Synonyms may name the same component twice; their shares add up.
    let order = component_order(profile);
    let mut given: BTreeMap<Component, Decimal> = BTreeMap::new();
    let mut total = Decimal::ZERO;
    for (name, share) in named {
        let Some(component) = Component::parse(name) else {
            continue;
        };
        let entry = given.entry(component).or_insert(Decimal::ZERO);
        match (entry.checked_add(*share), total.checked_add(*share)) {
            (Some(sum), Some(running)) => {
                *entry = sum;
                total = running;
            }
            _ => {
                return reject(
                    profile,
                    InvalidMixReason::InvalidTotal,
                    vec!["shares overflow".to_string()],
                )
            }
        }
    }

    if total <= Decimal::ZERO {
        return reject(
            profile,
            InvalidMixReason::InvalidTotal,
            vec![format!("shares sum to {total}")],
        );
    }

    // Fractions (0.6 / 0.4) are read as percentages.
    let mut normalization_applied = false;
    let scale = if total <= Decimal::ONE {
        normalization_applied = true;
        Decimal::ONE_HUNDRED
    } else {
        Decimal::ONE
    };
    let given: BTreeMap<Component, Decimal> =
        given.into_iter().map(|(c, s)| (c, s * scale)).collect();
    let total = total * scale;

    let missing: Vec<Component> = order
        .iter()
        .copied()
        .filter(|c| !given.contains_key(c))
        .collect();

    if !missing.is_empty() && total > Decimal::ONE_HUNDRED {
        return reject(
            profile,
            InvalidMixReason::InvalidTotal,
            vec![format!("partial shares sum to {total}")],
        );
    }

    let mut inference_applied = false;
    let weights: Vec<Decimal> = if !missing.is_empty() && total < Decimal::ONE_HUNDRED {
        inference_applied = true;
        let remainder = (Decimal::ONE_HUNDRED - total) / Decimal::from(missing.len() as u64);
        order
            .iter()
            .map(|c| given.get(c).copied().unwrap_or(remainder))
            .collect()
    } else {
        if total != Decimal::ONE_HUNDRED {
            normalization_applied = true;
        }
        order
            .iter()
            .map(|c| given.get(c).copied().unwrap_or(Decimal::ZERO))
            .collect()
    };

    MixedUseSplit {
        source,
        pattern,
        value: to_value(&order, &to_percent(&weights)),
        normalization_applied,
        inference_applied,
        invalid_mix: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use costscope_models::building::ComponentProfile;
    use rust_decimal_macros::dec;

    fn profile(components: &[(Component, Option<Decimal>)]) -> MixedUseProfile {
        MixedUseProfile {
            components: components
                .iter()
                .map(|(component, default_share)| ComponentProfile {
                    component: *component,
                    cost_factor: dec!(1.0),
                    revenue_factor: dec!(1.0),
                    default_share: *default_share,
                })
                .collect(),
        }
    }

    fn office_residential() -> MixedUseProfile {
        profile(&[(Component::Office, None), (Component::Residential, None)])
    }

    fn overrides(pairs: &[(&str, Decimal)]) -> BTreeMap<String, Decimal> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn default_is_even_for_two_components() {
        let r = resolve_split(&office_residential(), None, None);
        assert_eq!(r.split.source, MixSource::Default);
        assert_eq!(r.split.share_of(Component::Office), dec!(50));
        assert_eq!(r.split.share_of(Component::Residential), dec!(50));
        assert!(r.split.invalid_mix.is_none());
    }

    #[test]
    fn declared_defaults_are_used() {
        let p = profile(&[
            (Component::Transit, Some(dec!(20))),
            (Component::Residential, Some(dec!(60))),
            (Component::Retail, Some(dec!(20))),
        ]);
        let r = resolve_split(&p, None, None);
        assert_eq!(r.split.share_of(Component::Residential), dec!(60));
        assert_eq!(r.split.total(), dec!(100));
    }

    #[test]
    fn unsupported_component_fails_closed() {
        let o = overrides(&[("unknownComponent", dec!(100))]);
        let r = resolve_split(&office_residential(), Some(&o), None);
        assert_eq!(r.split.source, MixSource::Default);
        let invalid = r.split.invalid_mix.as_ref().unwrap();
        assert_eq!(invalid.reason, InvalidMixReason::UnsupportedComponent);
        assert_eq!(invalid.detail, vec!["unknownComponent".to_string()]);
        assert_eq!(r.split.share_of(Component::Office), dec!(50));
        assert_eq!(r.split.share_of(Component::Residential), dec!(50));
    }

    #[test]
    fn partially_valid_override_is_not_applied() {
        let o = overrides(&[("office", dec!(70)), ("hotel", dec!(30))]);
        let r = resolve_split(&office_residential(), Some(&o), None);
        assert_eq!(r.split.source, MixSource::Default);
        assert_eq!(r.split.share_of(Component::Office), dec!(50));
    }

    #[test]
    fn non_positive_total_is_invalid() {
        let o = overrides(&[("office", dec!(0)), ("residential", dec!(0))]);
        let r = resolve_split(&office_residential(), Some(&o), None);
        assert_eq!(
            r.split.invalid_mix.unwrap().reason,
            InvalidMixReason::InvalidTotal
        );
    }

    #[test]
    fn overflowing_shares_are_invalid() {
        let o = overrides(&[("office", Decimal::MAX), ("residential", Decimal::MAX)]);
        let r = resolve_split(&office_residential(), Some(&o), None);
        assert_eq!(r.split.source, MixSource::Default);
        assert_eq!(
            r.split.invalid_mix.as_ref().unwrap().reason,
            InvalidMixReason::InvalidTotal
        );
        assert_eq!(r.split.share_of(Component::Office), dec!(50));
    }

    #[test]
    fn negative_share_is_invalid() {
        let o = overrides(&[("office", dec!(120)), ("residential", dec!(-20))]);
        let r = resolve_split(&office_residential(), Some(&o), None);
        assert_eq!(
            r.split.invalid_mix.unwrap().reason,
            InvalidMixReason::NegativeShare
        );
    }

    #[test]
    fn fractions_are_normalized() {
        let o = overrides(&[("office", dec!(0.6)), ("residential", dec!(0.4))]);
        let r = resolve_split(&office_residential(), Some(&o), None);
        assert_eq!(r.split.source, MixSource::Override);
        assert!(r.split.normalization_applied);
        assert_eq!(r.split.share_of(Component::Office), dec!(60));
        assert_eq!(r.split.share_of(Component::Residential), dec!(40));
    }

    #[test]
    fn totals_other_than_100_are_normalized() {
        let o = overrides(&[("office", dec!(3)), ("residential", dec!(1))]);
        let r = resolve_split(&office_residential(), Some(&o), None);
        assert!(r.split.normalization_applied);
        assert_eq!(r.split.share_of(Component::Office), dec!(75));
        assert_eq!(r.split.share_of(Component::Residential), dec!(25));
    }

    #[test]
    fn single_component_infers_complement() {
        let o = overrides(&[("apartments", dec!(70))]);
        let r = resolve_split(&office_residential(), Some(&o), None);
        assert!(r.split.inference_applied);
        assert!(!r.split.normalization_applied);
        assert_eq!(r.split.share_of(Component::Residential), dec!(70));
        assert_eq!(r.split.share_of(Component::Office), dec!(30));
    }

    #[test]
    fn partial_split_over_100_is_invalid() {
        let o = overrides(&[("office", dec!(140))]);
        let r = resolve_split(&office_residential(), Some(&o), None);
        assert_eq!(r.split.source, MixSource::Default);
        assert_eq!(
            r.split.invalid_mix.unwrap().reason,
            InvalidMixReason::InvalidTotal
        );
    }

    #[test]
    fn override_beats_hint() {
        let o = overrides(&[("office", dec!(80)), ("residential", dec!(20))]);
        let hint = MixHint {
            pattern: MixPatternKind::RatioPair,
            shares: vec![("office".into(), dec!(40)), ("residential".into(), dec!(60))],
        };
        let r = resolve_split(&office_residential(), Some(&o), Some(&hint));
        assert_eq!(r.split.source, MixSource::Override);
        assert_eq!(r.split.pattern, None);
        assert_eq!(r.split.share_of(Component::Office), dec!(80));
    }

    #[test]
    fn hint_is_applied_with_pattern() {
        let hint = MixHint {
            pattern: MixPatternKind::Mostly,
            shares: vec![("residential".into(), dec!(70))],
        };
        let r = resolve_split(&office_residential(), None, Some(&hint));
        assert_eq!(r.split.source, MixSource::Detected);
        assert_eq!(r.split.pattern, Some(MixPatternKind::Mostly));
        assert!(r.split.inference_applied);
        assert_eq!(r.split.share_of(Component::Office), dec!(30));
    }

    #[test]
    fn balanced_hint_ignores_declared_defaults() {
        let p = profile(&[
            (Component::Retail, Some(dec!(25))),
            (Component::Residential, Some(dec!(75))),
        ]);
        let hint = MixHint {
            pattern: MixPatternKind::Balanced,
            shares: vec![],
        };
        let r = resolve_split(&p, None, Some(&hint));
        assert_eq!(r.split.source, MixSource::Detected);
        assert_eq!(r.split.share_of(Component::Retail), dec!(50));
    }

    #[test]
    fn blended_factors_follow_shares() {
        let p = MixedUseProfile {
            components: vec![
                ComponentProfile {
                    component: Component::Office,
                    cost_factor: dec!(1.10),
                    revenue_factor: dec!(1.20),
                    default_share: None,
                },
                ComponentProfile {
                    component: Component::Residential,
                    cost_factor: dec!(0.90),
                    revenue_factor: dec!(0.80),
                    default_share: None,
                },
            ],
        };
        let o = overrides(&[("office", dec!(75)), ("residential", dec!(25))]);
        let r = resolve_split(&p, Some(&o), None);
        assert_eq!(r.cost_factor, dec!(1.05));
        assert_eq!(r.revenue_factor, dec!(1.10));
    }
}
