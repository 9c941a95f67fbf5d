//! Pass 2: Filter effect application -- validate each applied filter value
//! against its schema, resolve effects per dimension with a deterministic
//! tie-break, and append the winning effect fragments after the blocks.

use std::collections::BTreeMap;

use crate::error::CompileError;
use crate::model::{Filter, FilterSchema, FilterValue, Fragment, EFFECT_WILDCARD};
use crate::seed::SeedStream;

/// Filter value that asks for a seed-derived choice among the options.
pub const RANDOM_VALUE: &str = "random";

/// Pass 2 output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterApplication {
    pub fragments: Vec<Fragment>,
    pub warnings: Vec<String>,
    /// Accepted filters and the value each resolved to.
    pub applied: BTreeMap<String, String>,
}

/// One effect a filter wants to write to a dimension.
struct EffectClaim {
    filter_key: String,
    dimension: String,
    text: String,
}

/// Apply `applied` filters (key → chosen value) on top of `fragments`.
///
/// Filters are visited in lexicographic key order, which `BTreeMap` gives
/// for free. A filter key absent from `defs` is fatal; an invalid value only
/// skips that filter. When two filters write different text to the same
/// dimension, the last key wins and each superseded filter gets a warning
/// naming that final winner.
pub fn apply_filters(
    fragments: Vec<Fragment>,
    applied: &BTreeMap<String, FilterValue>,
    defs: &BTreeMap<String, Filter>,
    seed: &str,
) -> Result<FilterApplication, CompileError> {
    let mut warnings = Vec::new();
    let mut accepted = BTreeMap::new();
    let mut claims: Vec<EffectClaim> = Vec::new();

    for (key, value) in applied {
        let def = defs
            .get(key)
            .ok_or_else(|| CompileError::FilterNotFound { key: key.clone() })?;

        let chosen = match validate_value(key, &def.schema, value, seed) {
            Ok(v) => v,
            Err(warning) => {
                warnings.push(warning);
                continue;
            }
        };

        for (dimension, table) in &def.effect {
            let entry = table
                .get(chosen.as_str())
                .or_else(|| table.get(EFFECT_WILDCARD));
            if let Some(text) = entry {
                claims.push(EffectClaim {
                    filter_key: key.clone(),
                    dimension: dimension.clone(),
                    text: text.replace("{value}", &chosen),
                });
            }
        }
        accepted.insert(key.clone(), chosen);
    }

    // dimension -> index of the claim that finally holds it
    let mut holders: BTreeMap<&str, usize> = BTreeMap::new();
    for (i, claim) in claims.iter().enumerate() {
        holders.insert(&claim.dimension, i);
    }
    for (i, claim) in claims.iter().enumerate() {
        let winner = &claims[holders[claim.dimension.as_str()]];
        if holders[claim.dimension.as_str()] != i
            && winner.text != claim.text
            && winner.filter_key != claim.filter_key
        {
            warnings.push(format!(
                "filter conflict on dimension '{}': '{}' and '{}' disagree; '{}' wins",
                claim.dimension, claim.filter_key, winner.filter_key, winner.filter_key
            ));
        }
    }

    let mut out = fragments;
    for (i, claim) in claims.iter().enumerate() {
        if holders.get(claim.dimension.as_str()) == Some(&i) {
            out.push(Fragment::filter(
                &claim.filter_key,
                &claim.dimension,
                claim.text.as_str(),
            ));
        }
    }

    tracing::debug!(
        applied = accepted.len(),
        skipped = applied.len() - accepted.len(),
        "filters applied"
    );

    Ok(FilterApplication {
        fragments: out,
        warnings,
        applied: accepted,
    })
}

/// Check `value` against `schema`, returning the resolved value or the
/// warning explaining why the filter is skipped.
fn validate_value(
    key: &str,
    schema: &FilterSchema,
    value: &FilterValue,
    seed: &str,
) -> Result<String, String> {
    match schema {
        FilterSchema::Options { options } => {
            let text = value.as_text();
            if options.iter().any(|o| *o == text) {
                return Ok(text);
            }
            if text == RANDOM_VALUE {
                let mut stream = SeedStream::new(seed, &format!("filter:{}", key));
                if let Some(i) = stream.pick_index(options.len()) {
                    return Ok(options[i].clone());
                }
            }
            Err(format!(
                "filter '{}': value '{}' is not one of [{}]; filter skipped",
                key,
                text,
                options.join(", ")
            ))
        }
        FilterSchema::Range { min, max } => match value.as_number() {
            Some(n) if n >= *min && n <= *max => Ok(n.to_string()),
            Some(n) => Err(format!(
                "filter '{}': value {} is outside [{}, {}]; filter skipped",
                key, n, min, max
            )),
            None => Err(format!(
                "filter '{}': value '{}' is not a number; filter skipped",
                key,
                value.as_text()
            )),
        },
        FilterSchema::Text => {
            let text = value.as_text();
            if text.trim().is_empty() {
                Err(format!("filter '{}': empty value; filter skipped", key))
            } else {
                Ok(text)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockType, FragmentOrigin};

    fn options_filter(key: &str, options: &[&str], effect: &[(&str, &[(&str, &str)])]) -> Filter {
        Filter {
            key: key.to_owned(),
            schema: FilterSchema::Options {
                options: options.iter().map(|s| s.to_string()).collect(),
            },
            effect: effect
                .iter()
                .map(|(dim, table)| {
                    (
                        dim.to_string(),
                        table
                            .iter()
                            .map(|(v, t)| (v.to_string(), t.to_string()))
                            .collect(),
                    )
                })
                .collect(),
            is_premium: false,
        }
    }

    fn defs(filters: Vec<Filter>) -> BTreeMap<String, Filter> {
        filters.into_iter().map(|f| (f.key.clone(), f)).collect()
    }

    fn applied(pairs: &[(&str, FilterValue)]) -> BTreeMap<String, FilterValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn texts(app: &FilterApplication) -> Vec<&str> {
        app.fragments.iter().map(|f| f.text.as_str()).collect()
    }

    fn angle_filters() -> BTreeMap<String, Filter> {
        defs(vec![
            options_filter(
                "camera_angle_a",
                &["low", "high"],
                &[("camera_angle", &[("low", "low angle shot"), ("high", "high angle shot")])],
            ),
            options_filter(
                "camera_angle_b",
                &["low", "high"],
                &[("camera_angle", &[("low", "worm's-eye view"), ("high", "bird's-eye view")])],
            ),
        ])
    }

    #[test]
    fn effects_follow_blocks_in_key_order() {
        let d = defs(vec![
            options_filter("lighting", &["soft"], &[("light", &[("soft", "soft light")])]),
            options_filter("grain", &["fine"], &[("texture", &[("fine", "fine grain")])]),
        ]);
        let blocks = vec![Fragment::block("s", BlockType::Subject, "A cat")];
        let app = apply_filters(
            blocks,
            &applied(&[("lighting", "soft".into()), ("grain", "fine".into())]),
            &d,
            "seed",
        )
        .unwrap();
        assert_eq!(texts(&app), vec!["A cat", "fine grain", "soft light"]);
        assert!(app.warnings.is_empty());
        assert_eq!(app.applied.len(), 2);
    }

    #[test]
    fn later_key_wins_conflict() {
        let app = apply_filters(
            vec![],
            &applied(&[
                ("camera_angle_b", "high".into()),
                ("camera_angle_a", "low".into()),
            ]),
            &angle_filters(),
            "seed",
        )
        .unwrap();
        assert_eq!(texts(&app), vec!["bird's-eye view"]);
        assert_eq!(app.warnings.len(), 1);
        assert!(app.warnings[0].contains("'camera_angle_a'"));
        assert!(app.warnings[0].contains("'camera_angle_b' wins"));
        assert_eq!(
            app.fragments[0].origin,
            FragmentOrigin::Filter {
                key: "camera_angle_b".into(),
                dimension: "camera_angle".into()
            }
        );
    }

    #[test]
    fn identical_effects_are_not_a_conflict() {
        let d = defs(vec![
            options_filter("a_mood", &["calm"], &[("mood", &[("calm", "calm mood")])]),
            options_filter("b_mood", &["calm"], &[("mood", &[("calm", "calm mood")])]),
        ]);
        let app = apply_filters(
            vec![],
            &applied(&[("a_mood", "calm".into()), ("b_mood", "calm".into())]),
            &d,
            "seed",
        )
        .unwrap();
        assert_eq!(texts(&app), vec!["calm mood"]);
        assert!(app.warnings.is_empty());
    }

    #[test]
    fn three_way_conflict_warns_per_superseded_filter() {
        let d = defs(vec![
            options_filter("a", &["x"], &[("dim", &[("x", "one")])]),
            options_filter("b", &["x"], &[("dim", &[("x", "two")])]),
            options_filter("c", &["x"], &[("dim", &[("x", "three")])]),
        ]);
        let app = apply_filters(
            vec![],
            &applied(&[("a", "x".into()), ("b", "x".into()), ("c", "x".into())]),
            &d,
            "seed",
        )
        .unwrap();
        assert_eq!(texts(&app), vec!["three"]);
        assert_eq!(
            app.warnings,
            vec![
                "filter conflict on dimension 'dim': 'a' and 'c' disagree; 'c' wins",
                "filter conflict on dimension 'dim': 'b' and 'c' disagree; 'c' wins",
            ]
        );
        assert!(app.warnings.iter().all(|w| !w.contains("'b' wins")));
    }

    #[test]
    fn superseded_claim_matching_the_winner_is_quiet() {
        let d = defs(vec![
            options_filter("a", &["x"], &[("dim", &[("x", "same")])]),
            options_filter("b", &["x"], &[("dim", &[("x", "other")])]),
            options_filter("c", &["x"], &[("dim", &[("x", "same")])]),
        ]);
        let app = apply_filters(
            vec![],
            &applied(&[("a", "x".into()), ("b", "x".into()), ("c", "x".into())]),
            &d,
            "seed",
        )
        .unwrap();
        assert_eq!(texts(&app), vec!["same"]);
        assert_eq!(
            app.warnings,
            vec!["filter conflict on dimension 'dim': 'b' and 'c' disagree; 'c' wins"]
        );
    }

    #[test]
    fn invalid_option_skips_filter() {
        let app = apply_filters(
            vec![],
            &applied(&[("camera_angle_a", "sideways".into())]),
            &angle_filters(),
            "seed",
        )
        .unwrap();
        assert!(app.fragments.is_empty());
        assert!(app.applied.is_empty());
        assert_eq!(
            app.warnings,
            vec!["filter 'camera_angle_a': value 'sideways' is not one of [low, high]; filter skipped"]
        );
    }

    #[test]
    fn unknown_filter_is_fatal() {
        let err = apply_filters(
            vec![],
            &applied(&[("nope", "x".into())]),
            &angle_filters(),
            "seed",
        )
        .unwrap_err();
        assert_eq!(err, CompileError::FilterNotFound { key: "nope".into() });
    }

    #[test]
    fn range_filter_with_wildcard_effect() {
        let d = defs(vec![Filter {
            key: "focal_length".into(),
            schema: FilterSchema::Range {
                min: 10.0,
                max: 200.0,
            },
            effect: [(
                "lens".to_string(),
                [("*".to_string(), "{value}mm lens".to_string())]
                    .into_iter()
                    .collect(),
            )]
            .into_iter()
            .collect(),
            is_premium: false,
        }]);

        let ok = apply_filters(vec![], &applied(&[("focal_length", 35.0.into())]), &d, "s").unwrap();
        assert_eq!(texts(&ok), vec!["35mm lens"]);
        assert_eq!(ok.applied["focal_length"], "35");

        let text = apply_filters(vec![], &applied(&[("focal_length", "85".into())]), &d, "s")
            .unwrap();
        assert_eq!(texts(&text), vec!["85mm lens"]);

        let out = apply_filters(vec![], &applied(&[("focal_length", 500.0.into())]), &d, "s")
            .unwrap();
        assert!(out.fragments.is_empty());
        assert_eq!(
            out.warnings,
            vec!["filter 'focal_length': value 500 is outside [10, 200]; filter skipped"]
        );

        let nan = apply_filters(vec![], &applied(&[("focal_length", "wide".into())]), &d, "s")
            .unwrap();
        assert_eq!(
            nan.warnings,
            vec!["filter 'focal_length': value 'wide' is not a number; filter skipped"]
        );
    }

    #[test]
    fn random_value_is_seed_derived() {
        let d = defs(vec![options_filter(
            "palette",
            &["warm", "cool", "mono"],
            &[("palette", &[("warm", "warm palette"), ("cool", "cool palette"), ("mono", "monochrome")])],
        )]);
        let req = applied(&[("palette", "random".into())]);

        let first = apply_filters(vec![], &req, &d, "seed0001").unwrap();
        let again = apply_filters(vec![], &req, &d, "seed0001").unwrap();
        assert_eq!(first, again);
        assert!(first.warnings.is_empty());
        assert!(["warm", "cool", "mono"].contains(&first.applied["palette"].as_str()));

        let mut stream = SeedStream::new("seed0001", "filter:palette");
        let expected = ["warm", "cool", "mono"][stream.pick_index(3).unwrap()];
        assert_eq!(first.applied["palette"], expected);
    }

    #[test]
    fn value_without_effect_entry_adds_nothing() {
        let d = defs(vec![options_filter(
            "hdr",
            &["on", "off"],
            &[("dynamic_range", &[("on", "HDR")])],
        )]);
        let app = apply_filters(vec![], &applied(&[("hdr", "off".into())]), &d, "s").unwrap();
        assert!(app.fragments.is_empty());
        assert!(app.warnings.is_empty());
        assert_eq!(app.applied["hdr"], "off");
    }

    #[test]
    fn text_filter_rejects_empty() {
        let d = defs(vec![Filter {
            key: "note".into(),
            schema: FilterSchema::Text,
            effect: [(
                "note".to_string(),
                [("*".to_string(), "note: {value}".to_string())]
                    .into_iter()
                    .collect(),
            )]
            .into_iter()
            .collect(),
            is_premium: false,
        }]);
        let ok = apply_filters(vec![], &applied(&[("note", "dusk".into())]), &d, "s").unwrap();
        assert_eq!(texts(&ok), vec!["note: dusk"]);
        let empty = apply_filters(vec![], &applied(&[("note", " ".into())]), &d, "s").unwrap();
        assert_eq!(empty.warnings, vec!["filter 'note': empty value; filter skipped"]);
    }
}
