//! Context resolution: raw request body -> immutable `ContextPack`.
//!
//! Industry precedence is strict and checked in order: force rules over the
//! brief, then the caller's requested industry, then the stored profile
//! industry, then the `general` default. `resolve_industry` is a pure
//! function of its three inputs so the decision is reproducible and
//! unit-testable in isolation.
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use uuid::Uuid;

use crate::context::pack::{
    ClientProfile, Constraints, ContextPack, Industry, IndustrySource, Sources, Style,
};

/// Validated inbound request shape. Unknown fields are ignored at the
/// boundary; everything the pipeline consumes is an explicit option here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRequest {
    // Brief candidates, in precedence order (see `extract_brief`).
    pub prompt: Option<String>,
    pub user_prompt: Option<String>,
    pub brief: Option<String>,
    pub campaign_prompt: Option<String>,
    pub text: Option<String>,
    pub instructions: Option<String>,

    pub industry: Option<String>,
    pub audience: Option<String>,
    pub offer_summary: Option<String>,
    pub tone: Option<String>,
    pub length: Option<String>,
    #[serde(default)]
    pub format_hints: Vec<String>,
    pub style_preset: Option<String>,
    #[serde(default)]
    pub constraints: Constraints,
    pub client_profile: Option<ClientProfile>,
    pub trace_id: Option<String>,

    // Per-call generation parameters, passed through to the orchestrator.
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub format: Option<String>,
    pub variation_key: Option<String>,
    pub source_image: Option<String>,
    #[serde(default)]
    pub debug: bool,
}

struct ForceRule {
    pattern: Regex,
    industry: Industry,
}

/// Ordered force rules: regex unions of domain keywords matched against the
/// lowercased brief. First match wins and overrides any requested or profile
/// industry. Czech terms are included because briefs arrive in Czech.
static FORCE_RULES: Lazy<Vec<ForceRule>> = Lazy::new(|| {
    let rule = |pattern: &str, industry: Industry| ForceRule {
        pattern: Regex::new(pattern).expect("force rule regex"),
        industry,
    };
    vec![
        rule(
            r"autobazar|autoservis|autosalon|ojet[áéý]|vozov[ýé]|vozidl|pneuservis|car dealer|test drive|dealership",
            Industry::Automotive,
        ),
        rule(
            r"realit|nemovitost|developersk|novostavb|pozemk|byt[y]? na prodej|real estate|property listing",
            Industry::RealEstate,
        ),
        rule(
            r"restaurac|bistro|kav[áa]rn|pizzeri|denn[íi] menu|degustac|restaurant|tasting menu",
            Industry::Restaurant,
        ),
        rule(
            r"fitko|posilovn|fitness|osobn[íi] tr[ée]n[ée]r|cvi[čc]en[íi]|gym membership|workout",
            Industry::Fitness,
        ),
        rule(
            r"m[óo]dn[íi]|butik|kolekce oble[čc]en|fashion|streetwear|boutique",
            Industry::Fashion,
        ),
        rule(
            r"stavebn|zednick|rekonstrukc|fas[áa]d|construction|renovation crew",
            Industry::Construction,
        ),
        rule(
            r"\bsaas\b|\bcrm\b|software jako slu[žz]b|online platform|subscription software",
            Industry::Saas,
        ),
    ]
});

/// Static per-industry topic keywords. `general` carries none.
pub fn topic_keywords(industry: Industry) -> &'static [&'static str] {
    match industry {
        Industry::Automotive => &[
            "prověřené vozy",
            "financování na míru",
            "servisní historie",
            "výkup aut",
        ],
        Industry::Fashion => &["nová kolekce", "limitovaná edice", "styl", "trendy"],
        Industry::Construction => &[
            "stavba na klíč",
            "rekonstrukce",
            "řemeslná kvalita",
            "termíny dodání",
        ],
        Industry::RealEstate => &[
            "prohlídka nemovitosti",
            "lokalita",
            "hypotéka",
            "výnos z pronájmu",
        ],
        Industry::Restaurant => &["denní menu", "čerstvé suroviny", "rezervace", "degustace"],
        Industry::Fitness => &[
            "osobní trénink",
            "členství",
            "výsledky",
            "skupinové lekce",
        ],
        Industry::Saas => &[
            "automatizace",
            "zkušební verze zdarma",
            "integrace",
            "úspora času",
        ],
        Industry::General => &[],
    }
}

/// Extra automotive keywords appended only when the brief is non-empty,
/// biasing copy toward concrete dealership offers.
const AUTOMOTIVE_BRIEF_KEYWORDS: &[&str] = &["akční nabídka vozů", "předváděcí jízda"];

/// First non-empty candidate wins; the ordering is a contract.
pub fn extract_brief(raw: &RawRequest) -> String {
    [
        &raw.prompt,
        &raw.user_prompt,
        &raw.brief,
        &raw.campaign_prompt,
        &raw.text,
        &raw.instructions,
    ]
    .into_iter()
    .flatten()
    .map(|s| s.trim())
    .find(|s| !s.is_empty())
    .unwrap_or("")
    .to_string()
}

/// Pure industry resolution. Each step runs only if the previous one did
/// not decide.
pub fn resolve_industry(
    brief: &str,
    requested: Option<&str>,
    profile: Option<&str>,
) -> (Industry, IndustrySource) {
    let lowered = brief.to_lowercase();
    if !lowered.is_empty() {
        for rule in FORCE_RULES.iter() {
            if rule.pattern.is_match(&lowered) {
                return (rule.industry, IndustrySource::Force);
            }
        }
    }
    if let Some(ind) = requested.and_then(Industry::parse_normalized) {
        return (ind, IndustrySource::Requested);
    }
    if let Some(ind) = profile.and_then(Industry::parse_normalized) {
        return (ind, IndustrySource::Profile);
    }
    (Industry::General, IndustrySource::Detected)
}

/// Assemble the pack. Generates a trace id when the caller did not send one;
/// everything else is a deterministic function of the request.
pub fn resolve(raw: &RawRequest) -> ContextPack {
    let brief = extract_brief(raw);
    let profile_industry = raw
        .client_profile
        .as_ref()
        .and_then(|p| p.industry.clone());
    let (industry, source) = resolve_industry(
        &brief,
        raw.industry.as_deref(),
        profile_industry.as_deref(),
    );

    let mut keywords: Vec<String> = topic_keywords(industry)
        .iter()
        .map(|k| k.to_string())
        .collect();
    if industry == Industry::Automotive && !brief.is_empty() {
        keywords.extend(AUTOMOTIVE_BRIEF_KEYWORDS.iter().map(|k| k.to_string()));
    }

    let trace_id = raw
        .trace_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    ContextPack {
        trace_id,
        brief,
        resolved_industry: industry,
        topic_keywords: keywords,
        audience: raw.audience.clone(),
        offer_summary: raw.offer_summary.clone(),
        style: Style {
            tone: raw.tone.clone(),
            length: raw.length.clone(),
            format_hints: raw.format_hints.clone(),
            preset: raw.style_preset.clone(),
        },
        constraints: raw.constraints.clone(),
        sources: Sources {
            requested_industry: raw.industry.clone(),
            detected_industry: Some(industry),
            profile_industry,
            industry_source: source,
        },
        client_profile: raw.client_profile.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brief_candidate_ordering_is_fixed() {
        let raw = RawRequest {
            brief: Some("from brief".to_string()),
            text: Some("from text".to_string()),
            user_prompt: Some("  from userPrompt  ".to_string()),
            ..Default::default()
        };
        assert_eq!(extract_brief(&raw), "from userPrompt");
    }

    #[test]
    fn empty_candidates_are_skipped() {
        let raw = RawRequest {
            prompt: Some("   ".to_string()),
            instructions: Some("last resort".to_string()),
            ..Default::default()
        };
        assert_eq!(extract_brief(&raw), "last resort");
    }

    #[test]
    fn no_candidates_yield_empty_brief() {
        assert_eq!(extract_brief(&RawRequest::default()), "");
    }

    #[test]
    fn force_rule_overrides_requested_and_profile() {
        let (ind, src) = resolve_industry(
            "Potřebuji propagovat autobazar v Brně",
            Some("fashion"),
            Some("restaurant"),
        );
        assert_eq!(ind, Industry::Automotive);
        assert_eq!(src, IndustrySource::Force);
    }

    #[test]
    fn requested_wins_over_profile_when_no_force_match() {
        let (ind, src) = resolve_industry("letní kampaň", Some("fitness"), Some("saas"));
        assert_eq!(ind, Industry::Fitness);
        assert_eq!(src, IndustrySource::Requested);
    }

    #[test]
    fn requested_industry_is_normalized() {
        let (ind, src) = resolve_industry("", Some("real-estate"), None);
        assert_eq!(ind, Industry::RealEstate);
        assert_eq!(src, IndustrySource::Requested);

        let (ind, _) = resolve_industry("", Some("RealEstate"), None);
        assert_eq!(ind, Industry::RealEstate);
    }

    #[test]
    fn invalid_requested_falls_through_to_profile() {
        let (ind, src) = resolve_industry("", Some("underwater-basket"), Some("restaurant"));
        assert_eq!(ind, Industry::Restaurant);
        assert_eq!(src, IndustrySource::Profile);
    }

    #[test]
    fn default_is_general_detected() {
        let (ind, src) = resolve_industry("", None, None);
        assert_eq!(ind, Industry::General);
        assert_eq!(src, IndustrySource::Detected);
    }

    #[test]
    fn resolution_is_deterministic() {
        let a = resolve_industry("nová kolekce pro butik", None, Some("saas"));
        let b = resolve_industry("nová kolekce pro butik", None, Some("saas"));
        assert_eq!(a, b);
        assert_eq!(a.0, Industry::Fashion);
        assert_eq!(a.1, IndustrySource::Force);
    }

    #[test]
    fn general_has_no_topic_keywords() {
        assert!(topic_keywords(Industry::General).is_empty());
    }

    #[test]
    fn automotive_brief_appends_extra_keywords() {
        let raw = RawRequest {
            brief: Some("prodej ojetých vozů".to_string()),
            ..Default::default()
        };
        let pack = resolve(&raw);
        assert_eq!(pack.resolved_industry, Industry::Automotive);
        assert!(pack
            .topic_keywords
            .iter()
            .any(|k| k == "předváděcí jízda"));

        let no_brief = resolve(&RawRequest {
            industry: Some("automotive".to_string()),
            ..Default::default()
        });
        assert!(!no_brief
            .topic_keywords
            .iter()
            .any(|k| k == "předváděcí jízda"));
    }

    #[test]
    fn trace_id_is_generated_when_absent() {
        let pack = resolve(&RawRequest::default());
        assert!(!pack.trace_id.is_empty());
        assert!(pack.validate().is_ok());
    }

    #[test]
    fn caller_trace_id_is_kept() {
        let raw = RawRequest {
            trace_id: Some("trace-123".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve(&raw).trace_id, "trace-123");
    }

    #[test]
    fn sources_record_full_provenance() {
        let raw = RawRequest {
            brief: Some("autoservis Plzeň".to_string()),
            industry: Some("fashion".to_string()),
            ..Default::default()
        };
        let pack = resolve(&raw);
        assert_eq!(pack.sources.industry_source, IndustrySource::Force);
        assert_eq!(pack.sources.requested_industry.as_deref(), Some("fashion"));
        assert_eq!(pack.sources.detected_industry, Some(Industry::Automotive));
    }
}
