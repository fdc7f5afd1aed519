//! Element selection shared by the path and street quests
//!
//! A way qualifies when pedestrians can use it: either the way itself is a
//! pedestrian way, or it has a sidewalk on a known side that is not mapped
//! separately. For streets the asked key is tracked per sidewalk side
//! (`sidewalk:left:<key>`, `sidewalk:right:<key>`, `sidewalk:both:<key>`).

use std::sync::Arc;

use super::answer::Answer;
use super::quest_type::{ApplyAnswerFn, Selection};
use crate::changes::StringMapChangesBuilder;
use crate::element::{Element, ElementKey, ElementType};
use crate::error::{QuestError, Result};
use crate::filter::ElementFilterExpression;
use crate::map_data::MapData;

const PEDESTRIAN_HIGHWAYS: &str = "footway|pedestrian|cycleway|living_street|track|bridleway|service";
const PEDESTRIAN_HIGHWAYS_IF_NO_SIDEWALK: &str = "residential|road|unclassified";
const RESURVEY: &str = "older today -8 years";

pub(super) struct PedestrianWaySelection {
    base: ElementFilterExpression,
    by_sidewalk_side: bool,
    accessible: ElementFilterExpression,
    no_sidewalk: ElementFilterExpression,
    key_missing: ElementFilterExpression,
    left_missing: ElementFilterExpression,
    right_missing: ElementFilterExpression,
    both_missing: ElementFilterExpression,
}

fn missing_or_old(key: &str) -> String {
    format!("(!'{k}' or '{k}' {RESURVEY})", k = key)
}

impl PedestrianWaySelection {
    pub(super) fn new(base: &str, key: &str, by_sidewalk_side: bool) -> Result<Self> {
        let left = format!("sidewalk:left:{}", key);
        let right = format!("sidewalk:right:{}", key);
        let both = format!("sidewalk:both:{}", key);
        Ok(Self {
            base: base.parse()?,
            by_sidewalk_side,
            accessible: format!(
                "ways with (
                    sidewalk ~ left|right|both
                    or highway ~ {PEDESTRIAN_HIGHWAYS}
                    or highway ~ {PEDESTRIAN_HIGHWAYS_IF_NO_SIDEWALK} and sidewalk ~ no|none
                )
                and access !~ private|no
                and foot !~ private|no|use_sidepath
                and sidewalk !~ separate|use_sidepath|yes"
            )
            .parse()?,
            no_sidewalk: "ways with sidewalk !~ left|right|both|yes".parse()?,
            key_missing: format!("ways with {}", missing_or_old(key)).parse()?,
            left_missing: format!("ways with {}", missing_or_old(&left)).parse()?,
            right_missing: format!("ways with {}", missing_or_old(&right)).parse()?,
            both_missing: format!(
                "ways with {} and ({} or {})",
                missing_or_old(&both),
                missing_or_old(&left),
                missing_or_old(&right)
            )
            .parse()?,
        })
    }

    fn is_candidate(&self, way: &Element) -> bool {
        way.element_type() == ElementType::Way
            && self.base.matches(way)
            && self.accessible.matches(way)
    }

    fn asks_about(&self, way: &Element) -> bool {
        if !self.by_sidewalk_side {
            return self.no_sidewalk.matches(way) && self.key_missing.matches(way);
        }
        match way.tag("sidewalk") {
            Some("left") => self.left_missing.matches(way),
            Some("right") => self.right_missing.matches(way),
            Some("both") => self.both_missing.matches(way),
            _ => self.key_missing.matches(way),
        }
    }

    pub(super) fn into_selection(self) -> Selection {
        let selection = Arc::new(self);
        let for_map = Arc::clone(&selection);
        Selection::Custom {
            applicable_elements: Arc::new(move |map_data: &MapData| -> Vec<ElementKey> {
                map_data
                    .ways()
                    .filter(|w| for_map.is_candidate(w) && for_map.asks_about(w))
                    .map(Element::key)
                    .collect()
            }),
            is_applicable_to: Arc::new(move |element: &Element| -> Option<bool> {
                Some(selection.is_candidate(element) && selection.asks_about(element))
            }),
        }
    }
}

/// Answer handling for a single key that may be tagged per sidewalk side
pub(super) fn sidewalk_side_answer(key: &'static str) -> ApplyAnswerFn {
    Arc::new(move |answer: &Answer, changes: &mut StringMapChangesBuilder<'_>| -> Result<()> {
        match answer {
            Answer::SidewalkSeparate => {
                changes.update_with_check_date("sidewalk", "separate")?;
                changes.delete_if_exists("source:sidewalk")
            }
            Answer::Sidewalks { left, right } => {
                if left.is_none() && right.is_none() {
                    return Err(QuestError::invalid_value("sidewalk answer", "no side given"));
                }
                for (side, value) in [("left", left), ("right", right)] {
                    if let Some(value) = value {
                        let side_key = format!("sidewalk:{}:{}", side, key);
                        changes.update_with_check_date(&side_key, value)?;
                        changes.delete_if_exists(&format!("source:{}", side_key))?;
                    }
                }
                let both_key = format!("sidewalk:both:{}", key);
                changes.delete_if_exists(&both_key)?;
                changes.delete_if_exists(&format!("source:{}", both_key))
            }
            Answer::ValueWithNote { value, note } => {
                changes.update_with_check_date(key, value)?;
                changes.add_or_modify(&format!("{}:note", key), note)?;
                changes.delete_if_exists(&format!("source:{}", key))
            }
            other => {
                let value = other
                    .as_value()
                    .ok_or_else(|| QuestError::invalid_value(key, format!("{:?}", other)))?;
                changes.update_with_check_date(key, value)?;
                changes.delete_if_exists(&format!("{}:note", key))?;
                changes.delete_if_exists(&format!("source:{}", key))
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Tags;

    fn way(id: i64, pairs: &[(&str, &str)]) -> Element {
        let tags: Tags = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Element::way(id, vec![1, 2], tags)
    }

    fn street_selection() -> PedestrianWaySelection {
        PedestrianWaySelection::new("ways with highway ~ residential|living_street", "surface", true).unwrap()
    }

    #[test]
    fn test_street_needs_known_sidewalk_side() {
        let selection = street_selection();
        let left = way(1, &[("highway", "residential"), ("sidewalk", "left")]);
        let unknown = way(2, &[("highway", "residential"), ("sidewalk", "yes")]);
        let separate = way(3, &[("highway", "residential"), ("sidewalk", "separate")]);
        let without = way(4, &[("highway", "residential"), ("sidewalk", "no")]);
        assert!(selection.is_candidate(&left) && selection.asks_about(&left));
        assert!(!selection.is_candidate(&unknown));
        assert!(!selection.is_candidate(&separate));
        assert!(selection.is_candidate(&without) && selection.asks_about(&without));
    }

    #[test]
    fn test_side_key_already_tagged() {
        let selection = street_selection();
        let tagged = way(
            1,
            &[
                ("highway", "residential"),
                ("sidewalk", "left"),
                ("sidewalk:left:surface", "asphalt"),
            ],
        );
        assert!(!selection.asks_about(&tagged));
        let both_partial = way(
            2,
            &[
                ("highway", "residential"),
                ("sidewalk", "both"),
                ("sidewalk:left:surface", "asphalt"),
            ],
        );
        assert!(selection.asks_about(&both_partial));
    }

    #[test]
    fn test_sidewalk_answer_changes() {
        let tags: Tags = [("sidewalk:both:width", "2"), ("source:sidewalk:both:width", "survey")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let apply = sidewalk_side_answer("width");
        let mut builder = StringMapChangesBuilder::new(&tags);
        apply(
            &Answer::Sidewalks {
                left: Some("1.5".into()),
                right: None,
            },
            &mut builder,
        )
        .unwrap();
        let mut result = tags.clone();
        builder.create().apply_to(&mut result).unwrap();
        assert_eq!(result.get("sidewalk:left:width").map(String::as_str), Some("1.5"));
        assert!(!result.contains_key("sidewalk:both:width"));
        assert!(!result.contains_key("source:sidewalk:both:width"));
    }
}
