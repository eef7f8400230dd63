//! Provider capability tables, selection heuristic, and cost model.
//!
//! Everything here is a static table plus pure functions so pricing is
//! deterministic and testable without network access. Orchestration code
//! selects a provider through [`select_provider`] and never branches on
//! provider identity itself; the actual clients live in the providers crate
//! behind a trait keyed by [`VideoProviderId`].

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// The single image generation backend.
pub const IMAGE_PROVIDER: &str = "prism";

/// Video generation backends, ordered cheap/fast to expensive/cinematic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoProviderId {
    /// Fast drafts, short clips only.
    Swift,
    /// Balanced default.
    Nova,
    /// Cinematic long-form renders with audio support.
    Aurora,
}

impl VideoProviderId {
    /// Stable string form stored on `jobs.provider_id` and used in URLs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Swift => "swift",
            Self::Nova => "nova",
            Self::Aurora => "aurora",
        }
    }

    /// Strict parse for API input. Unknown names are rejected at the
    /// boundary rather than silently defaulted.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "swift" => Some(Self::Swift),
            "nova" => Some(Self::Nova),
            "aurora" => Some(Self::Aurora),
            _ => None,
        }
    }
}

impl std::fmt::Display for VideoProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider used when no heuristic rule applies.
pub const DEFAULT_VIDEO_PROVIDER: VideoProviderId = VideoProviderId::Nova;

// ---------------------------------------------------------------------------
// Resolutions
// ---------------------------------------------------------------------------

/// Documented output resolution tiers, ordered ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Sd480,
    Hd720,
    Hd1080,
}

impl Resolution {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sd480 => "480p",
            Self::Hd720 => "720p",
            Self::Hd1080 => "1080p",
        }
    }

    /// Vertical pixel count of the tier.
    pub fn height(self) -> u32 {
        match self {
            Self::Sd480 => 480,
            Self::Hd720 => 720,
            Self::Hd1080 => 1080,
        }
    }

    /// Strict parse of a documented tier label.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "480p" => Some(Self::Sd480),
            "720p" => Some(Self::Hd720),
            "1080p" => Some(Self::Hd1080),
            _ => None,
        }
    }

    /// Lenient parse used inside the cost model: snaps `"<height>p"` labels
    /// to the nearest documented tier and falls back to 720p for anything
    /// unparseable. The API boundary uses [`Resolution::parse`] instead, so
    /// this path only sees values that were stored before validation rules
    /// tightened.
    pub fn from_label(s: &str) -> Self {
        if let Some(exact) = Self::parse(s) {
            return exact;
        }
        let height: Option<u32> = s.strip_suffix('p').and_then(|h| h.parse().ok());
        match height {
            Some(h) => [Self::Sd480, Self::Hd720, Self::Hd1080]
                .into_iter()
                .min_by_key(|tier| tier.height().abs_diff(h))
                .unwrap_or(Self::Hd720),
            None => Self::Hd720,
        }
    }
}

// ---------------------------------------------------------------------------
// Motion intensities
// ---------------------------------------------------------------------------

/// How much camera/subject motion a provider can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionIntensity {
    Subtle,
    Medium,
    Dynamic,
}

impl MotionIntensity {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "subtle" => Some(Self::Subtle),
            "medium" => Some(Self::Medium),
            "dynamic" => Some(Self::Dynamic),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Capability table
// ---------------------------------------------------------------------------

/// Static capabilities and pricing for one video provider.
#[derive(Debug, Clone)]
pub struct VideoCaps {
    pub id: VideoProviderId,
    /// Typical wall-clock render time, used for progress hints.
    pub avg_render_secs: i32,
    /// Cents per output second at each tier: (480p, 720p, 1080p).
    pub cost_per_second_cents: (i32, i32, i32),
    /// Relative output quality, 1..=10.
    pub quality_score: u8,
    /// Longest clip the provider will render.
    pub max_duration_secs: i32,
    /// Highest tier the provider can output.
    pub max_resolution: Resolution,
    pub motion_intensities: &'static [MotionIntensity],
    pub supports_audio: bool,
}

impl VideoCaps {
    /// Cents per second at `resolution`, snapped down to the provider's
    /// maximum tier.
    pub fn rate_cents(&self, resolution: Resolution) -> i32 {
        let effective = resolution.min(self.max_resolution);
        match effective {
            Resolution::Sd480 => self.cost_per_second_cents.0,
            Resolution::Hd720 => self.cost_per_second_cents.1,
            Resolution::Hd1080 => self.cost_per_second_cents.2,
        }
    }

    pub fn supports_motion(&self, motion: MotionIntensity) -> bool {
        self.motion_intensities.contains(&motion)
    }
}

/// The fleet, in ascending duration-bracket order.
static VIDEO_CAPS: [VideoCaps; 3] = [
    VideoCaps {
        id: VideoProviderId::Swift,
        avg_render_secs: 20,
        cost_per_second_cents: (2, 3, 3),
        quality_score: 5,
        max_duration_secs: 10,
        max_resolution: Resolution::Hd720,
        motion_intensities: &[MotionIntensity::Subtle, MotionIntensity::Medium],
        supports_audio: false,
    },
    VideoCaps {
        id: VideoProviderId::Nova,
        avg_render_secs: 90,
        cost_per_second_cents: (4, 6, 9),
        quality_score: 7,
        max_duration_secs: 45,
        max_resolution: Resolution::Hd1080,
        motion_intensities: &[
            MotionIntensity::Subtle,
            MotionIntensity::Medium,
            MotionIntensity::Dynamic,
        ],
        supports_audio: false,
    },
    VideoCaps {
        id: VideoProviderId::Aurora,
        avg_render_secs: 240,
        cost_per_second_cents: (7, 10, 15),
        quality_score: 9,
        max_duration_secs: 120,
        max_resolution: Resolution::Hd1080,
        motion_intensities: &[
            MotionIntensity::Subtle,
            MotionIntensity::Medium,
            MotionIntensity::Dynamic,
        ],
        supports_audio: true,
    },
];

/// Capability row for a provider.
pub fn video_caps(id: VideoProviderId) -> &'static VideoCaps {
    match id {
        VideoProviderId::Swift => &VIDEO_CAPS[0],
        VideoProviderId::Nova => &VIDEO_CAPS[1],
        VideoProviderId::Aurora => &VIDEO_CAPS[2],
    }
}

/// The whole fleet table.
pub fn all_video_caps() -> &'static [VideoCaps] {
    &VIDEO_CAPS
}

/// Longest duration any provider supports. API-side upper bound.
pub fn fleet_max_duration_secs() -> i32 {
    VIDEO_CAPS.iter().map(|c| c.max_duration_secs).max().unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Selection heuristic
// ---------------------------------------------------------------------------

/// Duration bracket boundaries (seconds). Above the last bracket the
/// long-form provider is required.
const SHORT_BRACKET_MAX_SECS: i32 = 10;
const MEDIUM_BRACKET_MAX_SECS: i32 = 45;

fn quality_keywords() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(professional|cinematic|premium|commercial|showcase|film|4k|high[ -]quality|product demo)\b",
        )
        .expect("static pattern compiles")
    })
}

/// Whether the prompt signals that output quality matters more than cost.
pub fn prompt_signals_quality(prompt: &str) -> bool {
    quality_keywords().is_match(prompt)
}

/// Pick the video provider for a job.
///
/// An explicit, known choice always wins. Otherwise, in order: a quality
/// keyword in the prompt prefers the highest-quality provider whose maximum
/// duration covers the request; the duration bracket decides next; and
/// anything left over (non-positive durations) lands on the default.
pub fn select_provider(
    prompt: &str,
    requested_duration_secs: i32,
    explicit: Option<VideoProviderId>,
) -> VideoProviderId {
    if let Some(choice) = explicit {
        return choice;
    }

    if prompt_signals_quality(prompt) {
        let best = VIDEO_CAPS
            .iter()
            .filter(|c| c.max_duration_secs >= requested_duration_secs)
            .max_by_key(|c| c.quality_score)
            // Nothing covers the request: take the longest-form provider and
            // let the cost model clamp the duration.
            .or_else(|| VIDEO_CAPS.iter().max_by_key(|c| c.max_duration_secs));
        if let Some(caps) = best {
            return caps.id;
        }
    }

    match requested_duration_secs {
        d if d > MEDIUM_BRACKET_MAX_SECS => VideoProviderId::Aurora,
        d if d > SHORT_BRACKET_MAX_SECS => VideoProviderId::Nova,
        d if d > 0 => VideoProviderId::Swift,
        _ => DEFAULT_VIDEO_PROVIDER,
    }
}

// ---------------------------------------------------------------------------
// Cost model
// ---------------------------------------------------------------------------

/// Flat price of the image stage, charged once per job.
pub const IMAGE_GENERATION_COST_CENTS: i32 = 5;

/// Audio surcharge numerator/denominator: `ceil(base / 5)` = 20 % of base.
const AUDIO_SURCHARGE_DIVISOR: i32 = 5;

/// Duration clamped to what the provider will actually render.
pub fn clamp_duration(id: VideoProviderId, requested_secs: i32) -> i32 {
    requested_secs.clamp(1, video_caps(id).max_duration_secs)
}

/// Price the video stage in cents.
///
/// Deterministic table lookup: clamped duration times the per-second rate at
/// the (snapped) resolution tier, plus `ceil(base * 0.2)` when audio is
/// requested and the provider can render it. Out-of-range inputs clamp to
/// the nearest documented value instead of raising; unknown provider names
/// never reach this function (the id is an enum, the API rejects unknown
/// strings).
pub fn calculate_video_cost(
    id: VideoProviderId,
    requested_duration_secs: i32,
    resolution: Resolution,
    with_audio: bool,
) -> i32 {
    let caps = video_caps(id);
    let duration = clamp_duration(id, requested_duration_secs);
    let base = caps.rate_cents(resolution) * duration;
    if with_audio && caps.supports_audio {
        base + (base as u32).div_ceil(AUDIO_SURCHARGE_DIVISOR as u32) as i32
    } else {
        base
    }
}

/// Total cost reserved at job creation: image stage plus video stage.
pub fn job_cost_cents(
    id: VideoProviderId,
    requested_duration_secs: i32,
    resolution: Resolution,
    with_audio: bool,
) -> i32 {
    IMAGE_GENERATION_COST_CENTS
        + calculate_video_cost(id, requested_duration_secs, resolution, with_audio)
}

// ---------------------------------------------------------------------------
// Request validation
// ---------------------------------------------------------------------------

/// Validate the pricing-relevant parts of a generation request.
///
/// Called at the API boundary before any cost is reserved, so failures here
/// never need a refund.
pub fn validate_request(
    prompt: &str,
    requested_duration_secs: i32,
    resolution_label: &str,
    motion: Option<&str>,
    provider_label: Option<&str>,
) -> Result<(), CoreError> {
    if prompt.trim().is_empty() {
        return Err(CoreError::Validation("prompt must not be empty".into()));
    }
    if requested_duration_secs <= 0 {
        return Err(CoreError::Validation(
            "duration_secs must be positive".into(),
        ));
    }
    if requested_duration_secs > fleet_max_duration_secs() {
        return Err(CoreError::Validation(format!(
            "duration_secs must be at most {}",
            fleet_max_duration_secs()
        )));
    }
    if Resolution::parse(resolution_label).is_none() {
        return Err(CoreError::Validation(format!(
            "unknown resolution '{resolution_label}'; expected one of 480p, 720p, 1080p"
        )));
    }
    if let Some(m) = motion {
        if MotionIntensity::parse(m).is_none() {
            return Err(CoreError::Validation(format!(
                "unknown motion intensity '{m}'; expected subtle, medium, or dynamic"
            )));
        }
    }
    if let Some(p) = provider_label {
        if VideoProviderId::parse(p).is_none() {
            return Err(CoreError::Validation(format!("unknown provider '{p}'")));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
