//! Strategy document schema: what we ask the provider for, and the checks a
//! response must pass before it becomes a `CampaignStrategy`.

use serde_json::{json, Value};
use thiserror::Error;

use crate::models::CampaignStrategy;

pub const SCENE_COUNT: usize = 5;
pub const SCENE_SECONDS: u32 = 3;
pub const TIP_COUNT: usize = 3;
pub const CHECKLIST_MIN: usize = 3;
pub const CHECKLIST_MAX: usize = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("the strategy response was empty")]
    Empty,
    #[error("the strategy response is not a valid strategy document: {0}")]
    Malformed(String),
    #[error("the strategy response has a blank `{0}`")]
    BlankField(String),
    #[error("expected {expected} {field}, got {actual}")]
    Count { field: &'static str, expected: String, actual: usize },
}

/// Provider-side response schema for the strategy document.
pub fn response_schema() -> Value {
    let string = json!({ "type": "STRING" });
    let strings = json!({ "type": "ARRAY", "items": { "type": "STRING" } });
    json!({
        "type": "OBJECT",
        "properties": {
            "purpose": {
                "type": "OBJECT",
                "properties": {
                    "core": string,
                    "goal": string,
                    "tone": string,
                    "creatorPersona": string
                },
                "required": ["core", "goal", "tone", "creatorPersona"]
            },
            "ugcStyle": string,
            "authenticityChecklist": strings,
            "storyboard": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "timing": string,
                        "visual": string,
                        "cameraAngle": string,
                        "moodLighting": string,
                        "text": string,
                        "audio": string,
                        "creatorInstruction": string
                    },
                    "required": ["timing", "visual", "cameraAngle", "moodLighting", "text", "audio", "creatorInstruction"]
                }
            },
            "imagePrompt": string,
            "cta": {
                "type": "OBJECT",
                "properties": {
                    "copy": string,
                    "linkPlacement": string,
                    "exampleLink": string
                },
                "required": ["copy", "linkPlacement", "exampleLink"]
            },
            "tips": strings
        },
        "required": ["purpose", "authenticityChecklist", "storyboard", "imagePrompt", "cta", "tips"]
    })
}

/// The five cumulative ranges a 15 second storyboard is cut into.
pub fn canonical_timings() -> Vec<String> {
    (0..SCENE_COUNT as u32)
        .map(|i| format_range(i * SCENE_SECONDS, (i + 1) * SCENE_SECONDS))
        .collect()
}

fn format_range(start: u32, end: u32) -> String {
    format!("{:02}:{:02} - {:02}:{:02}", start / 60, start % 60, end / 60, end % 60)
}

fn parse_clock(s: &str) -> Option<u32> {
    let (m, s) = s.trim().split_once(':')?;
    let (m, s): (u32, u32) = (m.trim().parse().ok()?, s.trim().parse().ok()?);
    if s >= 60 {
        return None;
    }
    m.checked_mul(60)?.checked_add(s)
}

/// Rewrites `0:00-0:03` style ranges as `00:00 - 00:03`. Anything that does
/// not parse as a range is returned unchanged.
pub fn normalize_timing(timing: &str) -> String {
    let trimmed = timing.trim();
    let parsed = trimmed
        .split_once(|c| matches!(c, '-' | '–' | '—'))
        .and_then(|(a, b)| Some((parse_clock(a)?, parse_clock(b)?)));
    match parsed {
        Some((start, end)) if end > start => format_range(start, end),
        _ => trimmed.to_string(),
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn non_blank(value: &str, field: impl Into<String>) -> Result<(), SchemaError> {
    if value.trim().is_empty() {
        return Err(SchemaError::BlankField(field.into()));
    }
    Ok(())
}

/// Parses and validates a raw strategy response. Nothing is partially
/// accepted: any missing field, blank required text or wrong count fails.
pub fn parse_strategy(raw: &str) -> Result<CampaignStrategy, SchemaError> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Err(SchemaError::Empty);
    }

    let mut strategy: CampaignStrategy =
        serde_json::from_str(body).map_err(|e| SchemaError::Malformed(e.to_string()))?;

    let checklist = strategy.authenticity_checklist.len();
    if !(CHECKLIST_MIN..=CHECKLIST_MAX).contains(&checklist) {
        return Err(SchemaError::Count {
            field: "authenticity checklist items",
            expected: format!("{CHECKLIST_MIN}-{CHECKLIST_MAX}"),
            actual: checklist,
        });
    }
    if strategy.storyboard.len() != SCENE_COUNT {
        return Err(SchemaError::Count {
            field: "storyboard scenes",
            expected: SCENE_COUNT.to_string(),
            actual: strategy.storyboard.len(),
        });
    }
    if strategy.tips.len() != TIP_COUNT {
        return Err(SchemaError::Count {
            field: "tips",
            expected: TIP_COUNT.to_string(),
            actual: strategy.tips.len(),
        });
    }

    non_blank(&strategy.purpose.core, "purpose.core")?;
    non_blank(&strategy.purpose.goal, "purpose.goal")?;
    non_blank(&strategy.purpose.tone, "purpose.tone")?;
    non_blank(&strategy.image_prompt, "imagePrompt")?;
    non_blank(&strategy.cta.copy, "cta.copy")?;
    for (i, item) in strategy.authenticity_checklist.iter().enumerate() {
        non_blank(item, format!("authenticityChecklist[{i}]"))?;
    }
    for (i, tip) in strategy.tips.iter().enumerate() {
        non_blank(tip, format!("tips[{i}]"))?;
    }
    for (i, scene) in strategy.storyboard.iter_mut().enumerate() {
        non_blank(&scene.timing, format!("storyboard[{i}].timing"))?;
        non_blank(&scene.visual, format!("storyboard[{i}].visual"))?;
        non_blank(&scene.audio, format!("storyboard[{i}].audio"))?;
        scene.timing = normalize_timing(&scene.timing);
    }

    Ok(strategy)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) fn sample_document() -> Value {
        let storyboard: Vec<Value> = ["00:00-00:03", "00:03-00:06", "00:06-00:09", "00:09-00:12", "00:12-00:15"]
            .iter()
            .enumerate()
            .map(|(i, timing)| {
                json!({
                    "timing": timing,
                    "visual": format!("Scene {} visual", i + 1),
                    "cameraAngle": "Handheld close-up",
                    "moodLighting": "Bathroom daylight",
                    "text": format!("Caption {}", i + 1),
                    "audio": format!("Line {}", i + 1),
                    "creatorInstruction": "Keep it loose"
                })
            })
            .collect();
        json!({
            "purpose": {
                "core": "Three days to clear skin",
                "goal": "Drive trial purchases",
                "tone": "Honest and excited",
                "creatorPersona": "The Honest Skincare Enthusiast"
            },
            "ugcStyle": "Problem / Solution",
            "authenticityChecklist": ["Film in natural light", "Leave the sink messy", "No makeup"],
            "storyboard": storyboard,
            "imagePrompt": "Woman holding a serum bottle in a sunlit bathroom",
            "cta": {
                "copy": "Try it for 3 days",
                "linkPlacement": "Pinned comment",
                "exampleLink": "https://x.com/p"
            },
            "tips": ["Test three hooks", "Whitelist the creator", "Cut a 6s version"]
        })
    }

    #[test]
    fn accepts_a_complete_document() {
        let doc = sample_document();
        let strategy = parse_strategy(&doc.to_string()).unwrap();
        assert_eq!(strategy.storyboard.len(), 5);
        assert_eq!(strategy.purpose.creator_persona.as_deref(), Some("The Honest Skincare Enthusiast"));
        let timings: Vec<_> = strategy.storyboard.iter().map(|s| s.timing.clone()).collect();
        assert_eq!(timings, canonical_timings());
    }

    #[test]
    fn accepts_fenced_json() {
        let fenced = format!("```json\n{}\n```", sample_document());
        assert!(parse_strategy(&fenced).is_ok());
    }

    #[test]
    fn rejects_empty_and_non_json() {
        assert_eq!(parse_strategy("  ").unwrap_err(), SchemaError::Empty);
        assert_eq!(parse_strategy("```json\n```").unwrap_err(), SchemaError::Empty);
        assert!(matches!(parse_strategy("{}"), Err(SchemaError::Malformed(_))));
        assert!(matches!(parse_strategy("sorry, I can't"), Err(SchemaError::Malformed(_))));
    }

    #[test]
    fn rejects_missing_storyboard() {
        let mut doc = sample_document();
        doc.as_object_mut().unwrap().remove("storyboard");
        assert!(matches!(parse_strategy(&doc.to_string()), Err(SchemaError::Malformed(_))));
    }

    #[test]
    fn rejects_wrong_scene_counts() {
        for keep in [4usize, 6] {
            let mut doc = sample_document();
            let scenes = doc["storyboard"].as_array_mut().unwrap();
            if keep < scenes.len() {
                scenes.truncate(keep);
            } else {
                let extra = scenes[0].clone();
                scenes.push(extra);
            }
            let err = parse_strategy(&doc.to_string()).unwrap_err();
            assert!(matches!(err, SchemaError::Count { actual, .. } if actual == keep));
        }
    }

    #[test]
    fn rejects_checklist_and_tip_counts() {
        let mut doc = sample_document();
        doc["authenticityChecklist"] = json!(["only", "two"]);
        assert!(matches!(parse_strategy(&doc.to_string()), Err(SchemaError::Count { actual: 2, .. })));

        let mut doc = sample_document();
        doc["tips"] = json!(["a", "b", "c", "d"]);
        assert!(matches!(parse_strategy(&doc.to_string()), Err(SchemaError::Count { actual: 4, .. })));
    }

    #[test]
    fn rejects_blank_required_text() {
        let mut doc = sample_document();
        doc["imagePrompt"] = json!("   ");
        assert_eq!(
            parse_strategy(&doc.to_string()).unwrap_err(),
            SchemaError::BlankField("imagePrompt".into())
        );

        let mut doc = sample_document();
        doc["storyboard"][2]["audio"] = json!("");
        assert_eq!(
            parse_strategy(&doc.to_string()).unwrap_err(),
            SchemaError::BlankField("storyboard[2].audio".into())
        );
    }

    #[test]
    fn creator_instruction_is_optional() {
        let mut doc = sample_document();
        doc["storyboard"][0].as_object_mut().unwrap().remove("creatorInstruction");
        let strategy = parse_strategy(&doc.to_string()).unwrap();
        assert_eq!(strategy.storyboard[0].creator_instruction, None);
    }

    #[test]
    fn timing_normalization() {
        assert_eq!(normalize_timing("0:00-0:03"), "00:00 - 00:03");
        assert_eq!(normalize_timing(" 00:12 – 00:15 "), "00:12 - 00:15");
        assert_eq!(normalize_timing("1:05 - 1:08"), "01:05 - 01:08");
        assert_eq!(normalize_timing("first three seconds"), "first three seconds");
        assert_eq!(normalize_timing("00:06 - 00:03"), "00:06 - 00:03");
    }

    #[test]
    fn oversized_clock_values_are_left_verbatim() {
        assert_eq!(normalize_timing("99999999:00 - 99999999:03"), "99999999:00 - 99999999:03");
        assert_eq!(normalize_timing("0:00 - 4294967295:00"), "0:00 - 4294967295:00");

        let mut doc = sample_document();
        doc["storyboard"][0]["timing"] = json!("99999999:00 - 99999999:03");
        let strategy = parse_strategy(&doc.to_string()).unwrap();
        assert_eq!(strategy.storyboard[0].timing, "99999999:00 - 99999999:03");
    }

    #[test]
    fn schema_requires_top_level_fields() {
        let schema = response_schema();
        let required: Vec<&str> = schema["required"].as_array().unwrap().iter().filter_map(Value::as_str).collect();
        assert_eq!(required, ["purpose", "authenticityChecklist", "storyboard", "imagePrompt", "cta", "tips"]);
    }
}
