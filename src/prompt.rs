use crate::models::{AdType, UserInput};
use crate::schema::{canonical_timings, CHECKLIST_MAX, CHECKLIST_MIN, SCENE_COUNT, SCENE_SECONDS, TIP_COUNT};

/// Builds the creative-director prompt for one attempt. Deterministic in `input`.
pub fn build_strategy_prompt(input: &UserInput) -> String {
    let is_ugc = input.ad_type == AdType::Ugc;
    let mut p = String::new();

    p.push_str("Act as a senior advertising agency creative director and strategist.\n");
    p.push_str("Convert the following product experience into an agency-quality advertising system.\n\n");

    p.push_str("USER INPUTS:\n");
    p.push_str(&format!("- Experience: {}\n", input.experience));
    p.push_str(&format!("- Category: {}\n", input.category));
    p.push_str(&format!("- Ad Type: {}\n", input.ad_type.label()));
    if let (true, Some(style)) = (is_ugc, input.ugc_style) {
        p.push_str(&format!("- UGC STYLE: {}\n", style.label()));
    }
    p.push_str(&format!("- Product Link: {}\n\n", input.product_link));

    let total = SCENE_COUNT as u32 * SCENE_SECONDS;
    p.push_str(&format!("STRICT STORYBOARD REQUIREMENTS ({total} SECONDS TOTAL):\n"));
    p.push_str(&format!("1. Exactly {SCENE_COUNT} scenes, each exactly {SCENE_SECONDS} seconds long.\n"));
    p.push_str(&format!(
        "2. TIMING FORMAT: You MUST use cumulative ranges, in order: {}.\n\n",
        canonical_timings().join(", ")
    ));

    if is_ugc {
        p.push_str("UGC AUTHENTICITY & RAW ENERGY REQUIREMENTS:\n");
        p.push_str("- CREATOR PERSONA: Define a relatable character (e.g., \"The Tired Tech Founder\", \"The Honest Skincare Enthusiast\").\n");
        p.push_str(&format!(
            "- AUTHENTICITY CHECKLIST: Provide {CHECKLIST_MIN}-{CHECKLIST_MAX} \"raw\" production tips (e.g., \"Film in a car for natural reverb\", \"Keep the background slightly messy\").\n"
        ));
        if let Some(directive) = input.ugc_style.and_then(|s| s.directive()) {
            p.push_str(&format!("- STYLE ADAPTATION: {directive}\n"));
        }
        p.push_str("- AUDIO: Use conversational language, slang where appropriate, and a high-energy \"thumb-stopping\" hook.\n\n");
    }

    p.push_str("OUTPUT STRUCTURE:\n");
    p.push_str("- purpose: core hook, strategic goal, tone, creatorPersona.\n");
    if is_ugc {
        p.push_str("- ugcStyle: the UGC style used.\n");
    }
    p.push_str(&format!("- authenticityChecklist: array of {CHECKLIST_MIN}-{CHECKLIST_MAX} raw production tips.\n"));
    p.push_str(&format!(
        "- storyboard: {SCENE_COUNT} scenes with timing, visual, cameraAngle, moodLighting, text, audio, and creatorInstruction.\n"
    ));
    p.push_str("- imagePrompt: a 9:16 reference image prompt.\n");
    p.push_str("- cta: copy, linkPlacement, exampleLink.\n");
    p.push_str(&format!("- tips: {TIP_COUNT} scaling suggestions.\n\n"));
    p.push_str("OUTPUT FORMAT: JSON only.");
    p
}

/// Wraps the strategy's image prompt in the fixed visual qualifiers.
pub fn build_image_prompt(image_prompt: &str) -> String {
    format!(
        "Generate a high-quality vertical 9:16 advertising lifestyle image. Prompt: {}. \
         Cinematic lighting, premium aesthetic, realistic textures, no text, no watermarks.",
        image_prompt.trim()
    )
}
