//! The immutable `ContextPack` and its building blocks.
//!
//! A pack is assembled once per inbound request by the resolver and is
//! read-only afterwards: the orchestrator and providers merge it into
//! per-call parameters but never mutate it.
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Fixed industry vocabulary. Everything the resolver cannot place lands
/// on `General`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Industry {
    Automotive,
    Fashion,
    Construction,
    RealEstate,
    Restaurant,
    Fitness,
    Saas,
    General,
}

impl Industry {
    pub fn as_str(&self) -> &'static str {
        match self {
            Industry::Automotive => "automotive",
            Industry::Fashion => "fashion",
            Industry::Construction => "construction",
            Industry::RealEstate => "real_estate",
            Industry::Restaurant => "restaurant",
            Industry::Fitness => "fitness",
            Industry::Saas => "saas",
            Industry::General => "general",
        }
    }

    /// Normalize a caller- or profile-supplied industry string and accept it
    /// only if it lands on a known value. Lowercases, maps hyphens to
    /// underscores, and folds the common `realestate` spelling.
    pub fn parse_normalized(raw: &str) -> Option<Industry> {
        let mut s = raw.trim().to_lowercase().replace('-', "_");
        if s == "realestate" {
            s = "real_estate".to_string();
        }
        match s.as_str() {
            "automotive" => Some(Industry::Automotive),
            "fashion" => Some(Industry::Fashion),
            "construction" => Some(Industry::Construction),
            "real_estate" => Some(Industry::RealEstate),
            "restaurant" => Some(Industry::Restaurant),
            "fitness" => Some(Industry::Fitness),
            "saas" => Some(Industry::Saas),
            "general" => Some(Industry::General),
            _ => None,
        }
    }
}

/// How the resolved industry was decided, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndustrySource {
    /// A force rule matched the brief; overrides everything else.
    Force,
    /// Caller explicitly passed a valid industry.
    Requested,
    /// Taken from the stored client profile.
    Profile,
    /// Nothing matched; defaulted to `general`.
    Detected,
}

impl IndustrySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndustrySource::Force => "force",
            IndustrySource::Requested => "requested",
            IndustrySource::Profile => "profile",
            IndustrySource::Detected => "detected",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    pub tone: Option<String>,
    pub length: Option<String>,
    #[serde(default)]
    pub format_hints: Vec<String>,
    pub preset: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    #[serde(default)]
    pub must_include: Vec<String>,
    #[serde(default)]
    pub forbidden: Vec<String>,
    #[serde(default)]
    pub hard_rules: Vec<String>,
}

/// Full provenance of the industry decision, kept for audit/debugging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sources {
    pub requested_industry: Option<String>,
    pub detected_industry: Option<Industry>,
    pub profile_industry: Option<String>,
    pub industry_source: IndustrySource,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientProfile {
    pub brand_name: Option<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    pub industry: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextPack {
    pub trace_id: String,
    /// Free-text client intent. May be empty, never absent.
    pub brief: String,
    pub resolved_industry: Industry,
    pub topic_keywords: Vec<String>,
    pub audience: Option<String>,
    pub offer_summary: Option<String>,
    pub style: Style,
    pub constraints: Constraints,
    pub sources: Sources,
    pub client_profile: Option<ClientProfile>,
}

impl ContextPack {
    /// The validity invariant: a non-empty trace id and a brief that exists
    /// as a string (empty is fine). The orchestrator treats a failure here
    /// as fatal and never retries it.
    pub fn validate(&self) -> AppResult<()> {
        if self.trace_id.trim().is_empty() {
            return Err(AppError::InvalidContext(
                "ContextPack is missing a trace id".to_string(),
            ));
        }
        Ok(())
    }
}
