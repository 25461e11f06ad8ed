//! Prompt compilation: `ContextPack` + task -> provider-ready prompts.
//!
//! Text prompts are an ordered concatenation of fixed instructional lines
//! and conditional lines gated on pack fields; empty fields emit nothing.
//! Image prompts merge a global positive/negative base, the per-industry
//! hero lock, a deterministic creative variation, and an unconditional
//! brand-safety suffix. The compiler always takes the industry from the
//! pack and never re-derives it.
use crate::context::pack::{ContextPack, Industry};

#[derive(Debug, Clone)]
pub struct TextPrompt {
    pub system_prompt: String,
    pub user_prompt: String,
}

#[derive(Debug, Clone)]
pub struct ImagePrompt {
    pub positive_prompt: String,
    pub negative_prompt: String,
}

const POSITIVE_BASE: &str =
    "professional advertising photograph, studio quality, single cohesive scene, \
     single subject in focus, no text, no lettering, no typography";

const NEGATIVE_BASE: &str =
    "collage, multi-panel, split frame, grid of images, side-by-side comparison, \
     watermark, stock photo overlay, ui screenshot, app interface, caption text";

const SAFETY_POSITIVE: &str = "safe for work, family friendly";
const SAFETY_NEGATIVE: &str = "nsfw, nudity, suggestive content, gore, violence";

/// Creative variations cycled deterministically by variation key. Same key,
/// same variation, so a regeneration request reproduces the original look.
const VARIATIONS: &[&str] = &[
    "golden hour lighting, warm tones",
    "soft diffused daylight, airy atmosphere",
    "dramatic rim lighting, high contrast",
    "clean minimalist backdrop, negative space",
    "shallow depth of field, cinematic bokeh",
    "wide editorial composition, balanced framing",
];

struct HeroLock {
    subject: &'static str,
    avoid: &'static str,
}

/// Per-industry required hero subject and off-topic negatives, keeping
/// generated imagery from drifting to another vertical.
fn hero_lock(industry: Industry) -> Option<HeroLock> {
    match industry {
        Industry::Automotive => Some(HeroLock {
            subject: "a single modern car as the hero subject, showroom or open road setting",
            avoid: "clothing racks, food plates, office desks, building sites",
        }),
        Industry::Fashion => Some(HeroLock {
            subject: "a model wearing contemporary clothing as the hero subject, editorial styling",
            avoid: "cars, machinery, construction equipment, food plates",
        }),
        Industry::Construction => Some(HeroLock {
            subject: "a construction site or finished building work as the hero subject",
            avoid: "fashion models, restaurant interiors, cars as the main subject",
        }),
        Industry::RealEstate => Some(HeroLock {
            subject: "an attractive property exterior or bright interior as the hero subject",
            avoid: "cars as the main subject, food, gym equipment",
        }),
        Industry::Restaurant => Some(HeroLock {
            subject: "an appetizing plated dish or inviting restaurant interior as the hero subject",
            avoid: "cars, construction machinery, office software screens",
        }),
        Industry::Fitness => Some(HeroLock {
            subject: "an athletic person training or modern gym space as the hero subject",
            avoid: "food close-ups, cars, office desks",
        }),
        Industry::Saas => Some(HeroLock {
            subject: "a clean abstract tech composition or person at a laptop as the hero subject",
            avoid: "cars, food, construction sites, gym equipment",
        }),
        Industry::General => None,
    }
}

/// FNV-1a over the variation key. Stable across runs and platforms, which
/// is what makes regeneration with the same key reproducible.
pub fn variation_seed(key: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in key.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

fn join_present(lines: Vec<String>, sep: &str) -> String {
    lines
        .into_iter()
        .filter(|l| !l.trim().is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

/// Build the system/user pair for a text provider.
pub fn compile_text(pack: &ContextPack, task: &str) -> TextPrompt {
    let industry = pack.resolved_industry.as_str();
    let lines = vec![
        "You are a senior marketing copywriter producing ready-to-publish client copy."
            .to_string(),
        "Write naturally and concretely; avoid generic filler phrases.".to_string(),
        format!(
            "Stay strictly within the {} industry and do not drift to any other topic.",
            industry
        ),
        if pack.topic_keywords.is_empty() {
            String::new()
        } else {
            format!(
                "Work these themes in where they fit naturally: {}.",
                pack.topic_keywords.join(", ")
            )
        },
        if pack.brief.is_empty() {
            String::new()
        } else {
            format!("The client brief: \"{}\"", pack.brief)
        },
        pack.client_profile
            .as_ref()
            .and_then(|p| p.brand_name.as_deref())
            .map(|b| format!("Write in the name of the brand \"{}\".", b))
            .unwrap_or_default(),
        pack.offer_summary
            .as_deref()
            .map(|o| format!("The current offer to promote: {}.", o))
            .unwrap_or_default(),
        pack.audience
            .as_deref()
            .map(|a| format!("Target audience: {}.", a))
            .unwrap_or_default(),
        pack.style
            .tone
            .as_deref()
            .map(|t| format!("Tone of voice: {}.", t))
            .unwrap_or_default(),
        pack.style
            .length
            .as_deref()
            .map(|l| format!("Target length: {}.", l))
            .unwrap_or_default(),
        if pack.style.format_hints.is_empty() {
            String::new()
        } else {
            format!("Format the copy as: {}.", pack.style.format_hints.join(", "))
        },
        if pack.constraints.must_include.is_empty() {
            String::new()
        } else {
            format!(
                "The copy must mention: {}.",
                pack.constraints.must_include.join(", ")
            )
        },
        if pack.constraints.forbidden.is_empty() {
            String::new()
        } else {
            format!(
                "Never mention: {}.",
                pack.constraints.forbidden.join(", ")
            )
        },
        format!(
            "Before returning, verify the copy matches the brief and the {} industry; \
             if it does not, rewrite it until it does.",
            industry
        ),
    ];

    let user_lines = vec![
        task.to_string(),
        if pack.brief.is_empty() {
            String::new()
        } else {
            format!("Brief: {}", pack.brief)
        },
        if pack.constraints.hard_rules.is_empty() {
            String::new()
        } else {
            format!("Hard rules: {}", pack.constraints.hard_rules.join("; "))
        },
    ];

    TextPrompt {
        system_prompt: join_present(lines, "\n"),
        user_prompt: join_present(user_lines, "\n"),
    }
}

/// Build the positive/negative pair for an image provider.
pub fn compile_image(pack: &ContextPack, task: &str, variation_key: &str) -> ImagePrompt {
    let lock = hero_lock(pack.resolved_industry);
    let variation = VARIATIONS[(variation_seed(variation_key) % VARIATIONS.len() as u64) as usize];

    let brand_colors = pack
        .client_profile
        .as_ref()
        .filter(|p| !p.colors.is_empty())
        .map(|p| format!("brand color palette: {}", p.colors.join(", ")))
        .unwrap_or_default();

    let positive = join_present(
        vec![
            task.to_string(),
            pack.brief.clone(),
            lock.as_ref().map(|l| l.subject.to_string()).unwrap_or_default(),
            brand_colors,
            POSITIVE_BASE.to_string(),
            variation.to_string(),
            SAFETY_POSITIVE.to_string(),
        ],
        ", ",
    );

    let negative = join_present(
        vec![
            NEGATIVE_BASE.to_string(),
            lock.as_ref().map(|l| l.avoid.to_string()).unwrap_or_default(),
            pack.constraints.forbidden.join(", "),
            SAFETY_NEGATIVE.to_string(),
        ],
        ", ",
    );

    ImagePrompt {
        positive_prompt: positive,
        negative_prompt: negative,
    }
}

/// Whether the pack's industry contributed a hero lock; recorded in debug
/// traces.
pub fn has_hero_lock(industry: Industry) -> bool {
    hero_lock(industry).is_some()
}
