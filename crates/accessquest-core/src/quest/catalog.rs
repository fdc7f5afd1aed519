//! Built-in accessibility quest types
//!
//! The order of [`default_quest_types`] is the evaluation and display order.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::answer::Answer;
use super::pedestrian_way::{sidewalk_side_answer, PedestrianWaySelection};
use super::quest_type::{ApplyAnswerFn, QuestType, Selection};
use crate::changes::StringMapChangesBuilder;
use crate::countries::CountrySet;
use crate::element::{Element, ElementKey, ElementType};
use crate::error::{QuestError, Result};
use crate::filter::ElementFilterExpression;
use crate::map_data::MapData;

const PATH_SURFACE_BASE: &str = "ways with (highway = footway or (highway ~ path|cycleway|bridleway and foot != no)) \
    and segregated != yes and footway != crossing and !level \
    and (!conveying or conveying = no) and (!indoor or indoor = no) and (!area or area = no)";

const PATH_SMOOTHNESS_BASE: &str = "ways with highway ~ path|footway and segregated != yes \
    and access !~ private|no and (!conveying or conveying = no) and (!indoor or indoor = no)";

const PATH_WIDTH_BASE: &str = "ways with highway ~ path|footway \
    and access !~ private|no and (!conveying or conveying = no) and (!indoor or indoor = no)";

const STREET_BASE: &str = "ways with highway ~ primary|primary_link|secondary|secondary_link|tertiary|tertiary_link\
    |unclassified|residential|living_street|pedestrian|track|road";

const STREET_WIDTH_BASE: &str = "ways with highway ~ primary|primary_link|secondary|secondary_link|tertiary|tertiary_link\
    |unclassified|residential|living_street|track|road and (!area or area = no)";

const PATH_INCLINE: &str = "ways with ( highway = footway or (highway ~ path|cycleway|bridleway and foot != no) ) \
    and access !~ private|no and foot !~ private|no|use_sidepath and footway != crossing and !level \
    and (!conveying or conveying = no) and (!indoor or indoor = no) and (!area or area = no) \
    and (!incline or incline older today -8 years)";

const STREET_INCLINE: &str = "ways with ((highway ~ primary|primary_link|secondary|secondary_link|tertiary|tertiary_link\
    |unclassified|residential|track and sidewalk ~ left|right|both) \
    or highway ~ pedestrian|living_street \
    or (highway ~ residential|road|unclassified and sidewalk ~ no|none)) \
    and sidewalk !~ separate|use_sidepath and access !~ private|no and foot !~ private|no|use_sidepath \
    and (!area or area = no) and (!incline or incline older today -8 years)";

const KERB_CROSSING_WAYS: &str = "ways with highway = footway and footway = crossing and access !~ private|no \
    and (barrier != kerb or (barrier = kerb and (!kerb or !'kerb:left' or !'kerb:right')))";

const KERB_NODES: &str =
    "nodes with !kerb or kerb ~ yes|unknown or (kerb ~ raised|rolled and older today -8 years)";

const TACTILE_PAVING_CROSSINGS: &str = "nodes with \
    (highway = traffic_signals and crossing = traffic_signals and foot != no or highway = crossing and foot != no) \
    and (!tactile_paving or tactile_paving = no and tactile_paving older today -4 years or older today -8 years)";

const TACTILE_PAVING_EXCLUDED_WAYS: &str =
    "ways with highway = cycleway and foot !~ yes|designated or highway and access ~ private|no";

const TACTILE_PAVING_COUNTRIES: [&str; 28] = [
    "NO", "SE", "GB", "IE", "NL", "BE", "FR", "ES", "DE", "PL", "CZ", "SK", "HU", "AT", "CH", "LV",
    "LT", "EE", "RU", "US", "CA", "AR", "HK", "SG", "KR", "JP", "AU", "NZ",
];

const TRAFFIC_SIGNALS_SOUND: &str = "nodes with crossing = traffic_signals and highway ~ crossing|traffic_signals \
    and (!'traffic_signals:sound' or 'traffic_signals:sound' = no and 'traffic_signals:sound' older today -4 years \
    or 'traffic_signals:sound' older today -8 years)";

const WHEELCHAIR_TOILETS: &str = "nodes, ways with amenity = toilets and access !~ private|customers \
    and (!wheelchair or wheelchair != yes and wheelchair older today -4 years or wheelchair older today -8 years)";

/// All built-in quest types in registry order
pub fn default_quest_types() -> Result<Vec<QuestType>> {
    Ok(vec![
        kerb_type()?,
        pedestrian_way_quest("AddPathSurface", "Add surface info", PATH_SURFACE_BASE, "surface", false)?,
        pedestrian_way_quest(
            "AddPedestrianAccessibleStreetSurface",
            "Add surface info",
            STREET_BASE,
            "surface",
            true,
        )?,
        pedestrian_way_quest(
            "AddPathSmoothness",
            "Add smoothness info",
            PATH_SMOOTHNESS_BASE,
            "smoothness",
            false,
        )?,
        pedestrian_way_quest(
            "AddPedestrianAccessibleStreetSmoothness",
            "Add smoothness info",
            STREET_BASE,
            "smoothness",
            true,
        )?,
        pedestrian_way_quest("AddPathWidth", "Add width info", PATH_WIDTH_BASE, "width", false)?,
        pedestrian_way_quest(
            "AddPedestrianAccessibleStreetWidth",
            "Add width info",
            STREET_WIDTH_BASE,
            "width",
            true,
        )?,
        filter_quest("AddPathIncline", "Add incline info", PATH_INCLINE, value_answer("incline"))?,
        street_incline()?,
        tactile_paving_crosswalk()?,
        filter_quest(
            "AddTrafficSignalsSound",
            "Add whether traffic signals have a sound signal",
            TRAFFIC_SIGNALS_SOUND,
            yes_no_answer("traffic_signals:sound"),
        )?,
        filter_quest(
            "AddWheelchairAccessToilets",
            "Add wheelchair access to toilets",
            WHEELCHAIR_TOILETS,
            value_answer("wheelchair"),
        )?,
    ])
}

/// A quest type asking for the value of `key` on every element matching `filter`.
///
/// Used for quest types defined in configuration rather than code.
pub fn custom_value_quest(
    name: &str,
    filter: &str,
    key: &str,
    countries: CountrySet,
) -> Result<QuestType> {
    let commit_message = format!("Add {}", key);
    Ok(filter_quest(name, &commit_message, filter, value_answer(key))?.with_countries(countries))
}

fn filter_quest(name: &str, commit_message: &str, filter: &str, apply: ApplyAnswerFn) -> Result<QuestType> {
    let filter: ElementFilterExpression = filter.parse()?;
    Ok(QuestType::new(name, commit_message, Selection::Filter(filter), apply))
}

fn pedestrian_way_quest(
    name: &str,
    commit_message: &str,
    base: &str,
    key: &'static str,
    by_sidewalk_side: bool,
) -> Result<QuestType> {
    let selection = PedestrianWaySelection::new(base, key, by_sidewalk_side)?.into_selection();
    Ok(QuestType::new(name, commit_message, selection, sidewalk_side_answer(key)))
}

/// Street incline uses the plain filter, but is listed per element like the other street quests
fn street_incline() -> Result<QuestType> {
    let filter: ElementFilterExpression = STREET_INCLINE.parse()?;
    let for_map = filter.clone();
    let selection = Selection::Custom {
        applicable_elements: Arc::new(move |map_data: &MapData| -> Vec<ElementKey> {
            map_data
                .ways()
                .filter(|w| for_map.matches(w))
                .map(Element::key)
                .collect()
        }),
        is_applicable_to: Arc::new(move |element: &Element| Some(filter.matches(element))),
    };
    Ok(QuestType::new(
        "AddPedestrianAccessibleStreetIncline",
        "Add incline info",
        selection,
        value_answer("incline"),
    ))
}

fn value_answer(key: &str) -> ApplyAnswerFn {
    let key = key.to_string();
    Arc::new(move |answer: &Answer, changes: &mut StringMapChangesBuilder<'_>| -> Result<()> {
        let value = answer
            .as_value()
            .ok_or_else(|| QuestError::invalid_value(&key, format!("{:?}", answer)))?;
        changes.update_with_check_date(&key, value)
    })
}

fn yes_no_answer(key: &str) -> ApplyAnswerFn {
    let key = key.to_string();
    Arc::new(move |answer: &Answer, changes: &mut StringMapChangesBuilder<'_>| -> Result<()> {
        let yes = answer
            .as_yes_no()
            .ok_or_else(|| QuestError::invalid_value(&key, format!("{:?}", answer)))?;
        changes.update_with_check_date(&key, if yes { "yes" } else { "no" })
    })
}

fn is_crossing_node(node: &Element) -> bool {
    node.tag("highway") == Some("crossing") || node.tag("crossing").is_some_and(|v| !v.is_empty())
}

fn is_island(node: &Element) -> bool {
    node.tag("traffic_calming") == Some("island") || node.tag("crossing:island") == Some("yes")
}

/// Nodes of a crossing way where it meets the kerb: next to a crossing node, or islands
fn kerb_candidates(way: &Element, map_data: &MapData) -> Vec<i64> {
    let node_ids = way.way_nodes();
    if node_ids.len() < 3 {
        return Vec::new();
    }
    let mut found = Vec::new();
    let mut previous: Option<&Element> = None;
    for id in node_ids {
        let Some(node) = map_data.node(*id) else {
            previous = None;
            continue;
        };
        if is_crossing_node(node) {
            if is_island(node) {
                found.push(node.id);
            }
            if let Some(prev) = previous.filter(|p| !is_crossing_node(p)) {
                found.push(prev.id);
            }
        } else if previous.is_some_and(is_crossing_node) {
            found.push(node.id);
        }
        previous = Some(node);
    }
    found
}

fn kerb_type() -> Result<QuestType> {
    let crossing_ways: ElementFilterExpression = KERB_CROSSING_WAYS.parse()?;
    let kerb_nodes: ElementFilterExpression = KERB_NODES.parse()?;
    let selection = Selection::Custom {
        applicable_elements: Arc::new(move |map_data: &MapData| -> Vec<ElementKey> {
            let mut ids = BTreeSet::new();
            for way in map_data.ways().filter(|w| crossing_ways.matches(w)) {
                ids.extend(kerb_candidates(way, map_data));
            }
            ids.into_iter()
                .filter_map(|id| map_data.node(id))
                .filter(|node| kerb_nodes.matches(node))
                .map(Element::key)
                .collect()
        }),
        is_applicable_to: Arc::new(|_: &Element| -> Option<bool> { None }),
    };
    Ok(QuestType::new("AddKerbType", "Add kerb to crossing", selection, Arc::new(apply_kerb_answer)))
}

fn apply_kerb_answer(answer: &Answer, changes: &mut StringMapChangesBuilder<'_>) -> Result<()> {
    let kerb = answer
        .as_value()
        .ok_or_else(|| QuestError::invalid_value("kerb", format!("{:?}", answer)))?;
    if kerb == "no" {
        if changes.previous_value("barrier") == Some("kerb") {
            changes.delete("barrier")?;
            changes.delete_if_exists("source:barrier")?;
        }
    } else {
        changes.update_with_check_date("barrier", "kerb")?;
        changes.delete_if_exists("source:barrier")?;
    }
    changes.update_with_check_date("kerb", kerb)?;
    for key in ["kerb:left", "kerb:right", "source:kerb", "source:kerb:left", "source:kerb:right"] {
        changes.delete_if_exists(key)?;
    }
    Ok(())
}

fn tactile_paving_crosswalk() -> Result<QuestType> {
    let crossings: ElementFilterExpression = TACTILE_PAVING_CROSSINGS.parse()?;
    let excluded_ways: ElementFilterExpression = TACTILE_PAVING_EXCLUDED_WAYS.parse()?;
    let selection = Selection::Custom {
        applicable_elements: Arc::new(move |map_data: &MapData| -> Vec<ElementKey> {
            let excluded: BTreeSet<i64> = map_data
                .ways()
                .filter(|w| excluded_ways.matches(w))
                .flat_map(|w| w.way_nodes().iter().copied())
                .collect();
            map_data
                .iter()
                .filter(|e| e.element_type() == ElementType::Node && !excluded.contains(&e.id))
                .filter(|e| crossings.matches(e))
                .map(Element::key)
                .collect()
        }),
        is_applicable_to: Arc::new(|_: &Element| -> Option<bool> { None }),
    };
    Ok(QuestType::new(
        "AddTactilePavingCrosswalk",
        "Add tactile pavings on crosswalks",
        selection,
        yes_no_answer("tactile_paving"),
    )
    .with_countries(CountrySet::none_except(&TACTILE_PAVING_COUNTRIES)))
}
