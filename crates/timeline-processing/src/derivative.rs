//! Derivative file naming
//!
//! A derivative's name is a pure function of its input's name, so the whole
//! chain can be recovered from whichever link is currently served.

use serde::Serialize;
use timeline_core::constants::{
    DERIVATIVE_EXTENSION, FIXED_SUFFIX, TRANSCODED_FIXED_SUFFIX, TRANSCODED_SUFFIX,
};

/// Links ordered upstream to downstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainLink {
    Original,
    Transcoded,
    OrientationFixed,
}

/// Which files exist for one logical upload.
///
/// The servable file is always the most downstream link present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivativeChain {
    pub base: String,
    pub original: Option<String>,
    pub transcoded: Option<String>,
    pub orientation_fixed: Option<String>,
}

impl DerivativeChain {
    pub fn from_original(name: &str) -> Self {
        Self {
            base: file_stem(name).to_string(),
            original: Some(name.to_string()),
            transcoded: None,
            orientation_fixed: None,
        }
    }

    pub fn servable(&self) -> Option<(ChainLink, &str)> {
        self.orientation_fixed
            .as_deref()
            .map(|n| (ChainLink::OrientationFixed, n))
            .or_else(|| self.transcoded.as_deref().map(|n| (ChainLink::Transcoded, n)))
            .or_else(|| self.original.as_deref().map(|n| (ChainLink::Original, n)))
    }

    pub fn servable_link(&self) -> Option<ChainLink> {
        self.servable().map(|(link, _)| link)
    }

    /// Names of every present link, upstream first.
    pub fn files(&self) -> Vec<&str> {
        [&self.original, &self.transcoded, &self.orientation_fixed]
            .into_iter()
            .filter_map(|n| n.as_deref())
            .collect()
    }
}

/// Name without its final extension. Dotfiles keep their name.
pub fn file_stem(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

/// `clip.mov` -> `clip_web.mp4`
pub fn transcoded_name(input: &str) -> String {
    format!("{}{}.{}", file_stem(input), TRANSCODED_SUFFIX, DERIVATIVE_EXTENSION)
}

/// `clip_web.mp4` -> `clip_web_fixed.mp4`
pub fn fixed_name(input: &str) -> String {
    format!("{}{}.{}", file_stem(input), FIXED_SUFFIX, DERIVATIVE_EXTENSION)
}

/// Name of the transcoded-then-fixed derivative for a base name.
pub fn transcoded_fixed_name(base: &str) -> String {
    format!("{}{}.{}", base, TRANSCODED_FIXED_SUFFIX, DERIVATIVE_EXTENSION)
}

/// Which link a file name is, judged by its suffix.
pub fn link_of(name: &str) -> ChainLink {
    let stem = file_stem(name);
    if stem.ends_with(TRANSCODED_FIXED_SUFFIX) && stem != TRANSCODED_FIXED_SUFFIX {
        ChainLink::OrientationFixed
    } else if stem.ends_with(TRANSCODED_SUFFIX) && stem != TRANSCODED_SUFFIX {
        ChainLink::Transcoded
    } else {
        ChainLink::Original
    }
}

/// Strip the extension, then one known derivative suffix.
pub fn base_name(served: &str) -> &str {
    let stem = file_stem(served);
    stem.strip_suffix(TRANSCODED_FIXED_SUFFIX)
        .or_else(|| stem.strip_suffix(TRANSCODED_SUFFIX))
        .filter(|base| !base.is_empty())
        .unwrap_or(stem)
}
