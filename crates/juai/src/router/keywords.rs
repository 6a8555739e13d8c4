//! Keyword tables for intent scoring.

use std::collections::BTreeMap;

use super::IntentCategory;

struct IntentPattern {
    intent: IntentCategory,
    keywords: &'static [&'static str],
}

/// Korean and English keywords per intent. Matching is a case-insensitive
/// substring test, so short English words also hit inside longer ones.
const PATTERNS: &[IntentPattern] = &[
    IntentPattern {
        intent: IntentCategory::RealismAction,
        keywords: &[
            "자동차", "car", "racing", "레이싱", "스포츠", "sports", "추격", "chase", "액션",
            "action", "드론", "drone", "fpv", "물리", "physics", "폭발", "explosion", "속도",
            "speed", "질주",
        ],
    },
    IntentPattern {
        intent: IntentCategory::CharacterProduct,
        keywords: &[
            "인물",
            "character",
            "person",
            "모델",
            "model",
            "룩북",
            "lookbook",
            "쇼핑몰",
            "shopping",
            "제품",
            "product",
            "패션",
            "fashion",
            "일관성",
            "consistent",
            "동일",
            "same",
            "캐릭터",
            "얼굴",
            "face",
        ],
    },
    IntentPattern {
        intent: IntentCategory::Informational,
        keywords: &[
            "리포터",
            "reporter",
            "뉴스",
            "news",
            "강의",
            "lecture",
            "설명",
            "explanation",
            "아바타",
            "avatar",
            "대변인",
            "spokesperson",
            "발표",
            "presentation",
            "안내",
            "guide",
            "정보",
            "information",
        ],
    },
    IntentPattern {
        intent: IntentCategory::Cinematic,
        keywords: &[
            "영화", "movie", "film", "시네마틱", "cinematic", "인트로", "intro", "배경",
            "background", "풍경", "landscape", "4k", "8k", "epic", "dramatic", "스토리", "story",
            "장면", "scene",
        ],
    },
    IntentPattern {
        intent: IntentCategory::MusicAudio,
        keywords: &[
            "음악",
            "music",
            "bgm",
            "배경음악",
            "효과음",
            "sound",
            "audio",
            "멜로디",
            "melody",
            "비트",
            "beat",
            "instrumental",
        ],
    },
];

/// Result of keyword scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordScores {
    /// Normalized so the values sum to 1.
    pub scores: BTreeMap<IntentCategory, f64>,
    /// Matched keywords, deduplicated, in table order.
    pub keywords: Vec<String>,
}

pub fn score(text: &str) -> KeywordScores {
    let text = text.to_lowercase();
    let mut scores: BTreeMap<IntentCategory, f64> =
        IntentCategory::ALL.iter().map(|c| (*c, 0.0)).collect();
    let mut keywords: Vec<String> = Vec::new();

    for pattern in PATTERNS {
        for keyword in pattern.keywords {
            if text.contains(&keyword.to_lowercase()) {
                *scores.entry(pattern.intent).or_insert(0.0) += 1.0;
                if !keywords.iter().any(|k| k == keyword) {
                    keywords.push(keyword.to_string());
                }
            }
        }
    }

    let total: f64 = scores.values().sum();
    if total > 0.0 {
        for value in scores.values_mut() {
            *value /= total;
        }
    } else {
        scores.insert(IntentCategory::Cinematic, 1.0);
    }

    KeywordScores { scores, keywords }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_korean_car_chase() {
        let result = score("자동차 추격 장면");
        let realism = result.scores[&IntentCategory::RealismAction];
        let cinematic = result.scores[&IntentCategory::Cinematic];
        assert!((realism - 2.0 / 3.0).abs() < 1e-9);
        assert!((cinematic - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(result.keywords, vec!["자동차", "추격", "장면"]);
    }

    #[test]
    fn test_no_match_defaults_to_cinematic() {
        let result = score("qwerty");
        assert_eq!(result.scores[&IntentCategory::Cinematic], 1.0);
        assert!(result.keywords.is_empty());
        assert_eq!(result.scores.len(), IntentCategory::ALL.len());
    }

    #[test]
    fn test_case_insensitive() {
        let result = score("Breaking NEWS reporter");
        assert_eq!(result.scores[&IntentCategory::Informational], 1.0);
    }

    #[test]
    fn test_scores_sum_to_one() {
        for text in ["BGM for a fashion lookbook", "epic drone chase", "강의 아바타 음악"] {
            let total: f64 = score(text).scores.values().sum();
            assert!((total - 1.0).abs() < 1e-9, "{}", text);
        }
    }

    #[test]
    fn test_every_keyword_scores_its_category() {
        for pattern in PATTERNS {
            for keyword in pattern.keywords {
                let result = score(keyword);
                assert!(
                    result.scores[&pattern.intent] > 0.0,
                    "'{}' gave {:?} no weight",
                    keyword,
                    pattern.intent
                );
                assert!(result.keywords.iter().any(|k| k == keyword));
            }
        }
    }

    #[test]
    fn test_uppercase_keyword_still_matches() {
        for pattern in PATTERNS {
            let keyword = pattern.keywords[0].to_uppercase();
            assert!(score(&keyword).scores[&pattern.intent] > 0.0, "{}", keyword);
        }
    }
}
