//! Advisory rule engine.
//!
//! Resolves a three-question profile into recommendation bundles. Stateless:
//! the same answers always produce the same bundles.

use crate::model::{
    Activity, Advisory, LocationType, QuestionnaireAnswer, RecommendationBundle, Sensitivity,
};

const PERSONAL_PROTECTION: &str = "Personal Protection";
const ACTIVITY_MODIFICATIONS: &str = "Activity Modifications";
const INDOOR_AIR_QUALITY: &str = "Indoor Air Quality";
const SPECIAL_CONSIDERATIONS: &str = "Special Considerations";

const MASK_STRICT: &str = "Always carry an N95 mask";
const MASK_DEFAULT: &str = "Keep a mask handy for high pollution days";

const TRAINING_STRICT: &str =
    "Schedule outdoor training during low pollution hours (early morning or evening)";
const TRAINING_DEFAULT: &str = "Plan outdoor activities when air quality is best";

/// A fully answered questionnaire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Profile {
    activity: Activity,
    sensitivity: Sensitivity,
    location_type: LocationType,
}

impl Profile {
    fn from_answers(answers: &QuestionnaireAnswer) -> Option<Self> {
        Some(Self {
            activity: answers.activity?,
            sensitivity: answers.sensitivity?,
            location_type: answers.location_type?,
        })
    }
}

/// Resolve answers into bundles, or report how far the questionnaire got.
///
/// Always three base bundles in fixed order; a fourth, "Special
/// Considerations", is appended only for `Industrial Zone`.
pub fn resolve(answers: &QuestionnaireAnswer) -> Advisory {
    let Some(profile) = Profile::from_answers(answers) else {
        let answered = answers.answered();
        return Advisory::Incomplete {
            answered,
            progress: answered as f64 / QuestionnaireAnswer::QUESTION_COUNT as f64,
        };
    };

    let mut bundles = vec![
        bundle(
            PERSONAL_PROTECTION,
            [
                if profile.sensitivity == Sensitivity::Severe {
                    MASK_STRICT
                } else {
                    MASK_DEFAULT
                },
                "Consider using air quality tracking apps",
                "Stay updated with local air quality alerts",
            ],
        ),
        bundle(
            ACTIVITY_MODIFICATIONS,
            [
                if profile.activity == Activity::AthleticTraining {
                    TRAINING_STRICT
                } else {
                    TRAINING_DEFAULT
                },
                "Have indoor alternatives ready",
                "Monitor breathing patterns during activities",
            ],
        ),
        bundle(
            INDOOR_AIR_QUALITY,
            [
                "Use HEPA air purifiers",
                "Regular ventilation during good air quality periods",
                "Keep indoor plants known for air purification",
            ],
        ),
    ];

    if profile.location_type == LocationType::IndustrialZone {
        bundles.push(bundle(
            SPECIAL_CONSIDERATIONS,
            [
                "Use route planning to avoid high pollution areas",
                "Consider additional air quality monitors",
                "Create a clean air shelter at home",
            ],
        ));
    }

    for (index, b) in bundles.iter_mut().enumerate() {
        b.priority = index as u8 + 1;
    }

    Advisory::Ready { bundles }
}

fn bundle<const N: usize>(title: &str, tips: [&str; N]) -> RecommendationBundle {
    RecommendationBundle {
        title: title.to_string(),
        tips: tips.iter().map(|t| t.to_string()).collect(),
        priority: 0,
    }
}
