use crate::config::ScoringConfig;
use crate::parsers::{ContentQuality, PageContent};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_count_buckets() {
        let config = ScoringConfig::default();
        assert_eq!(ContentQuality::from_word_count(0, &config), ContentQuality::Thin);
        assert_eq!(ContentQuality::from_word_count(299, &config), ContentQuality::Thin);
        assert_eq!(ContentQuality::from_word_count(300, &config), ContentQuality::Medium);
        assert_eq!(ContentQuality::from_word_count(799, &config), ContentQuality::Medium);
        assert_eq!(ContentQuality::from_word_count(800, &config), ContentQuality::High);
    }

    #[test]
    fn test_promotion_needs_headings_and_paragraphs() {
        let medium = ContentQuality::Medium;
        assert_eq!(medium.adjust_for_structure(3, 4), ContentQuality::High);
        assert_eq!(medium.adjust_for_structure(2, 4), ContentQuality::Medium);
        assert_eq!(medium.adjust_for_structure(3, 3), ContentQuality::Medium);
        // Thin content is never promoted
        assert_eq!(ContentQuality::Thin.adjust_for_structure(10, 10), ContentQuality::Thin);
    }

    #[test]
    fn test_demotion_without_headings() {
        let high = ContentQuality::High;
        assert_eq!(high.adjust_for_structure(1, 20), ContentQuality::Medium);
        assert_eq!(high.adjust_for_structure(0, 0), ContentQuality::Medium);
        assert_eq!(high.adjust_for_structure(2, 0), ContentQuality::High);
    }

    #[test]
    fn test_quality_is_monotonic_in_word_count() {
        let config = ScoringConfig::default();
        let structures = [(0, 0), (1, 5), (2, 2), (3, 4), (5, 10)];
        let counts = [0, 10, 50, 299, 300, 301, 500, 799, 800, 801, 5000];

        for (headings, paragraphs) in structures {
            for pair in counts.windows(2) {
                let lower = ContentQuality::classify(pair[0], headings, paragraphs, &config);
                let upper = ContentQuality::classify(pair[1], headings, paragraphs, &config);
                assert!(
                    lower <= upper,
                    "{} words -> {:?} but {} words -> {:?} (h={}, p={})",
                    pair[0],
                    lower,
                    pair[1],
                    upper,
                    headings,
                    paragraphs
                );
            }
        }
    }

    #[test]
    fn test_page_content_from_text() {
        let config = ScoringConfig::default();
        let content = PageContent::from_text("  some   plain text here  ", &config);
        assert_eq!(content.clean_text, "some plain text here");
        assert_eq!(content.word_count, 4);
        assert_eq!(content.quality, ContentQuality::Thin);
    }
}
