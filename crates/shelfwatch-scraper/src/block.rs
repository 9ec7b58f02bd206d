//! Anti-bot block page detection.

use shelfwatch_core::SelectorProfile;

/// Case-insensitive substring matcher over known block-page phrases.
///
/// Detection is deliberately conservative: any marker anywhere in the page
/// counts, including inside scripts and attributes.
#[derive(Debug, Clone)]
pub struct BlockDetector {
    /// Stored lower-cased.
    markers: Vec<String>,
}

impl BlockDetector {
    #[must_use]
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let markers = markers
            .into_iter()
            .map(|m| m.as_ref().trim().to_lowercase())
            .filter(|m| !m.is_empty())
            .collect();
        Self { markers }
    }

    #[must_use]
    pub fn from_profile(profile: &SelectorProfile) -> Self {
        Self::new(&profile.block_markers)
    }

    #[must_use]
    pub fn is_blocked(&self, page_text: &str) -> bool {
        self.matched_marker(page_text).is_some()
    }

    /// Returns the first configured marker found in `page_text`.
    #[must_use]
    pub fn matched_marker(&self, page_text: &str) -> Option<&str> {
        let lowered = page_text.to_lowercase();
        self.markers
            .iter()
            .find(|m| lowered.contains(m.as_str()))
            .map(String::as_str)
    }
}

impl Default for BlockDetector {
    fn default() -> Self {
        Self::from_profile(&SelectorProfile::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_robot_check_title() {
        let detector = BlockDetector::default();
        let html = "<html><head><title>Robot Check</title></head><body></body></html>";
        assert!(detector.is_blocked(html));
        assert_eq!(detector.matched_marker(html), Some("robot check"));
    }

    #[test]
    fn detects_captcha_case_insensitively() {
        let detector = BlockDetector::default();
        assert!(detector.is_blocked("Please solve this CAPTCHA to continue"));
    }

    #[test]
    fn detects_automated_access_notice() {
        let detector = BlockDetector::default();
        let body = "To discuss automated access to Amazon data please contact \
                    api-services-support@amazon.com.";
        assert!(detector.is_blocked(body));
    }

    #[test]
    fn normal_product_page_is_not_blocked() {
        let detector = BlockDetector::default();
        let html = r#"<span id="productTitle">Pedigree Adult Dry Dog Food 3kg</span>"#;
        assert!(!detector.is_blocked(html));
    }

    #[test]
    fn adding_a_marker_never_clears_detection() {
        let detector = BlockDetector::default();
        let mut text = String::from("Enter the characters you see below");
        assert!(detector.is_blocked(&text));
        for extra in ["Robot Check", "captcha", "plain words"] {
            text.push(' ');
            text.push_str(extra);
            assert!(detector.is_blocked(&text));
        }
    }

    #[test]
    fn custom_markers_are_trimmed_and_lowered() {
        let detector = BlockDetector::new(["  Access Denied ", ""]);
        assert!(detector.is_blocked("<h1>ACCESS DENIED</h1>"));
        assert!(!detector.is_blocked(""));
    }
}
