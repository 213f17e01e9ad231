//! Accessibility score derivation. Scores are always recomputed from the raw
//! attributes on read and never persisted, so they cannot drift from their
//! source columns.

use serde::Serialize;

/// Raw accessibility attributes of a center. Absent columns map to `false`
/// or `None`; missing data is never an error.
#[derive(Debug, Clone, Default)]
pub struct AccessibilityAttributes {
    pub has_ramp: bool,
    pub has_elevator: bool,
    pub door_width_cm: Option<i32>,
    pub has_braille_signage: bool,
    pub has_audio_guidance: bool,
    pub has_quiet_zone: bool,
    pub staff_trained: bool,
    pub website_accessible: bool,
}

/// The three derived sub-scores, each in [0, 5] rounded to one decimal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AccessibilityScore {
    pub physical: f64,
    pub digital: f64,
    pub reception: f64,
}

const WIDE_DOOR_CM: i32 = 80;

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Fixed-weight deterministic scoring. Every input combination yields
/// sub-scores in [0, 5].
pub fn score(attrs: &AccessibilityAttributes) -> AccessibilityScore {
    let physical_signals = [
        attrs.has_ramp,
        attrs.has_elevator,
        attrs.door_width_cm.map_or(false, |w| w >= WIDE_DOOR_CM),
        attrs.has_braille_signage,
    ]
    .iter()
    .filter(|&&b| b)
    .count();
    let physical = (physical_signals as f64 / 4.0 * 5.0).min(5.0);

    // The only digital signal contributes 2.5, so this component caps at
    // 2.5 under the current formula.
    let digital: f64 = if attrs.website_accessible { 2.5 } else { 0.0 };
    let digital = digital.min(5.0);

    let mut reception: f64 = 0.0;
    if attrs.staff_trained {
        reception += 2.5;
    }
    if attrs.has_quiet_zone {
        reception += 1.25;
    }
    if attrs.has_audio_guidance {
        reception += 1.25;
    }
    let reception = reception.min(5.0);

    AccessibilityScore {
        physical: round1(physical),
        digital: round1(digital),
        reception: round1(reception),
    }
}

/// Combines the sub-scores with the community rating average into the single
/// displayed score. A center with no reviews contributes 0 as its rating, so
/// its global score is half its average accessibility score.
pub fn global_score(score: &AccessibilityScore, avg_rating: Option<f64>) -> f64 {
    let avg_accessibility = (score.physical + score.digital + score.reception) / 3.0;
    let rating_score = avg_rating.unwrap_or(0.0);
    round1((avg_accessibility + rating_score) / 2.0)
}

/// French display labels for the services a center offers, derived from the
/// same raw attributes as the scores.
pub fn services(attrs: &AccessibilityAttributes) -> Vec<String> {
    let mut out = Vec::new();
    if attrs.has_ramp {
        out.push("Rampe d'accès".to_string());
    }
    if attrs.has_elevator {
        out.push("Ascenseur".to_string());
    }
    if attrs.door_width_cm.map_or(false, |w| w >= WIDE_DOOR_CM) {
        out.push("Portes larges".to_string());
    }
    if attrs.has_braille_signage {
        out.push("Signalétique braille".to_string());
    }
    if attrs.has_audio_guidance {
        out.push("Guidage audio".to_string());
    }
    if attrs.has_quiet_zone {
        out.push("Zone calme".to_string());
    }
    if attrs.staff_trained {
        out.push("Personnel formé".to_string());
    }
    if attrs.website_accessible {
        out.push("Site accessible".to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_true() -> AccessibilityAttributes {
        AccessibilityAttributes {
            has_ramp: true,
            has_elevator: true,
            door_width_cm: Some(90),
            has_braille_signage: true,
            has_audio_guidance: true,
            has_quiet_zone: true,
            staff_trained: true,
            website_accessible: true,
        }
    }

    fn in_bounds(v: f64) -> bool {
        (0.0..=5.0).contains(&v) && (v * 10.0 - (v * 10.0).round()).abs() < 1e-9
    }

    #[test]
    fn sub_scores_stay_in_bounds_for_all_boolean_combinations() {
        for mask in 0u32..256 {
            let attrs = AccessibilityAttributes {
                has_ramp: mask & 1 != 0,
                has_elevator: mask & 2 != 0,
                door_width_cm: if mask & 4 != 0 { Some(120) } else { None },
                has_braille_signage: mask & 8 != 0,
                has_audio_guidance: mask & 16 != 0,
                has_quiet_zone: mask & 32 != 0,
                staff_trained: mask & 64 != 0,
                website_accessible: mask & 128 != 0,
            };
            let s = score(&attrs);
            assert!(in_bounds(s.physical), "physical out of bounds: {:?}", s);
            assert!(in_bounds(s.digital), "digital out of bounds: {:?}", s);
            assert!(in_bounds(s.reception), "reception out of bounds: {:?}", s);
        }
    }

    #[test]
    fn physical_counts_three_of_four_signals() {
        let attrs = AccessibilityAttributes {
            has_ramp: true,
            has_elevator: true,
            door_width_cm: Some(90),
            has_braille_signage: false,
            ..Default::default()
        };
        assert_eq!(score(&attrs).physical, 3.8);
    }

    #[test]
    fn narrow_door_does_not_count() {
        let attrs = AccessibilityAttributes {
            door_width_cm: Some(79),
            ..Default::default()
        };
        assert_eq!(score(&attrs).physical, 0.0);

        let attrs = AccessibilityAttributes {
            door_width_cm: Some(80),
            ..Default::default()
        };
        assert_eq!(score(&attrs).physical, 1.3);
    }

    #[test]
    fn digital_caps_at_two_and_a_half() {
        let s = score(&all_true());
        assert_eq!(s.digital, 2.5);

        let only_website = AccessibilityAttributes {
            website_accessible: true,
            ..Default::default()
        };
        assert_eq!(score(&only_website).digital, 2.5);
    }

    #[test]
    fn reception_weights_staff_and_quiet_zone() {
        let attrs = AccessibilityAttributes {
            staff_trained: true,
            has_quiet_zone: true,
            has_audio_guidance: false,
            ..Default::default()
        };
        // 2.5 + 1.25 = 3.75 rounds to 3.8
        assert_eq!(score(&attrs).reception, 3.8);
    }

    #[test]
    fn reception_full_house_hits_five() {
        assert_eq!(score(&all_true()).reception, 5.0);
    }

    #[test]
    fn global_score_halves_without_reviews() {
        let s = AccessibilityScore {
            physical: 5.0,
            digital: 5.0,
            reception: 5.0,
        };
        assert_eq!(global_score(&s, None), 2.5);
    }

    #[test]
    fn global_score_averages_with_rating() {
        let s = AccessibilityScore {
            physical: 4.0,
            digital: 4.0,
            reception: 4.0,
        };
        assert_eq!(global_score(&s, Some(5.0)), 4.5);
    }

    #[test]
    fn empty_attributes_score_zero_everywhere() {
        let s = score(&AccessibilityAttributes::default());
        assert_eq!(s.physical, 0.0);
        assert_eq!(s.digital, 0.0);
        assert_eq!(s.reception, 0.0);
        assert_eq!(global_score(&s, None), 0.0);
    }

    #[test]
    fn services_follow_attributes() {
        let labels = services(&all_true());
        assert_eq!(labels.len(), 8);
        assert!(labels.contains(&"Rampe d'accès".to_string()));

        assert!(services(&AccessibilityAttributes::default()).is_empty());
    }
}
