//! Y-BOCS questionnaire definition and scoring.
//!
//! Ten items, each scored 0 to 4 against five anchor descriptions. Items 1-5
//! rate obsessions and items 6-10 rate compulsions.

use crate::constants::{YBOCS_ITEM_COUNT, YBOCS_MAX_ITEM_SCORE};
use crate::{YbocsError, YbocsResult};
use serde::Serialize;

/// One questionnaire item with its anchors for scores 0..=4.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct YbocsItem {
    pub title: &'static str,
    pub anchors: [&'static str; 5],
}

const TIME_ANCHORS: [&str; 5] = [
    "Brak",
    "Mniej niż 1 godz./dobę lub sporadycznie",
    "1–3 godz./dobę lub często",
    "Ponad 3 do 8 godz./dobę lub bardzo często",
    "Ponad 8 godz./dobę lub prawie stale",
];

pub static YBOCS_ITEMS: [YbocsItem; YBOCS_ITEM_COUNT] = [
    YbocsItem {
        title: "Czas zajmowany przez myśli natrętne",
        anchors: TIME_ANCHORS,
    },
    YbocsItem {
        title: "Interferencja z powodu myśli natrętnych",
        anchors: [
            "Brak",
            "Niewielka – funkcjonowanie zasadniczo nieupośledzone",
            "Wyraźna – ale da się funkcjonować",
            "Znaczne upośledzenie funkcjonowania",
            "Uniemożliwia funkcjonowanie",
        ],
    },
    YbocsItem {
        title: "Distress związany z myślami natrętnymi",
        anchors: [
            "Brak",
            "Niewielki – mało dokuczliwy",
            "Dokuczliwy, ale do opanowania",
            "Bardzo dokuczliwy",
            "Prawie stały i obezwładniający",
        ],
    },
    YbocsItem {
        title: "Opór wobec obsesji (wysiłek, by się im oprzeć)",
        anchors: [
            "Zawsze stara się opierać",
            "Najczęściej stara się opierać",
            "Czasem podejmuje wysiłek",
            "Ulega wszystkim obsesjom, z pewną niechęcią",
            "Całkowicie i chętnie ulega obsesjom",
        ],
    },
    YbocsItem {
        title: "Kontrola nad myślami natrętnymi",
        anchors: [
            "Pełna kontrola",
            "Zwykle potrafi zatrzymać/przełączyć myśli",
            "Czasem potrafi zatrzymać/przełączyć",
            "Rzadko skuteczny, z trudem",
            "Brak kontroli, myśli całkowicie mimowolne",
        ],
    },
    YbocsItem {
        title: "Czas poświęcony kompulsjom",
        anchors: TIME_ANCHORS,
    },
    YbocsItem {
        title: "Interferencja z powodu kompulsji",
        anchors: [
            "Brak",
            "Niewielka – funkcjonowanie zasadniczo nieupośledzone",
            "Wyraźna – ale do opanowania",
            "Znaczne upośledzenie funkcjonowania",
            "Uniemożliwia funkcjonowanie",
        ],
    },
    YbocsItem {
        title: "Distress przy przerwaniu kompulsji",
        anchors: [
            "Brak",
            "Niewielki – przy lekkim ograniczeniu",
            "Narasta, ale do opanowania",
            "Znaczny i bardzo dokuczliwy",
            "Obezwładniający lęk",
        ],
    },
    YbocsItem {
        title: "Opór wobec kompulsji",
        anchors: [
            "Zawsze próbuje się opierać",
            "Najczęściej próbuje się opierać",
            "Czasem podejmuje wysiłek",
            "Ulega prawie wszystkim kompulsjom z niechęcią",
            "Całkowicie i chętnie ulega kompulsjom",
        ],
    },
    YbocsItem {
        title: "Kontrola nad kompulsjami",
        anchors: [
            "Pełna kontrola",
            "Presja, ale zwykle potrafi kontrolować",
            "Silna presja, kontrola z trudnością",
            "Bardzo silny przymus, musi dokończyć; potrafi jedynie odwlec",
            "Brak kontroli, przymus całkowicie mimowolny",
        ],
    },
];

/// A complete, validated set of item scores (q1..q10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YbocsScores([u8; YBOCS_ITEM_COUNT]);

impl YbocsScores {
    /// Validates raw item scores.
    ///
    /// # Errors
    ///
    /// Returns [`YbocsError::Validation`] if there are not exactly ten scores or
    /// any score lies outside 0..=4.
    pub fn new(scores: &[u8]) -> YbocsResult<Self> {
        let items: [u8; YBOCS_ITEM_COUNT] = scores.try_into().map_err(|_| {
            YbocsError::Validation(format!(
                "expected {YBOCS_ITEM_COUNT} item scores, got {}",
                scores.len()
            ))
        })?;

        if let Some((idx, score)) = items
            .iter()
            .enumerate()
            .find(|(_, s)| **s > YBOCS_MAX_ITEM_SCORE)
        {
            return Err(YbocsError::Validation(format!(
                "q{} must be between 0 and {YBOCS_MAX_ITEM_SCORE}, got {score}",
                idx + 1
            )));
        }

        Ok(Self(items))
    }

    pub fn items(&self) -> &[u8; YBOCS_ITEM_COUNT] {
        &self.0
    }

    /// Sum of all items, 0..=40.
    pub fn total(&self) -> u8 {
        self.0.iter().sum()
    }

    pub fn obsessions_subtotal(&self) -> u8 {
        self.0[..5].iter().sum()
    }

    pub fn compulsions_subtotal(&self) -> u8 {
        self.0[5..].iter().sum()
    }
}

/// Conventional Y-BOCS severity bands for a total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityBand {
    Subclinical,
    Mild,
    Moderate,
    Severe,
    Extreme,
}

impl SeverityBand {
    pub fn from_total(total: u8) -> Self {
        match total {
            0..=7 => SeverityBand::Subclinical,
            8..=15 => SeverityBand::Mild,
            16..=23 => SeverityBand::Moderate,
            24..=31 => SeverityBand::Severe,
            _ => SeverityBand::Extreme,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityBand::Subclinical => "subclinical",
            SeverityBand::Mild => "mild",
            SeverityBand::Moderate => "moderate",
            SeverityBand::Severe => "severe",
            SeverityBand::Extreme => "extreme",
        }
    }
}

impl std::fmt::Display for SeverityBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_items_have_non_empty_anchors() {
        for item in &YBOCS_ITEMS {
            assert!(!item.title.is_empty());
            assert!(item.anchors.iter().all(|a| !a.is_empty()));
        }
        assert_eq!(YBOCS_ITEMS[0].anchors, YBOCS_ITEMS[5].anchors);
    }

    #[test]
    fn test_scores_total_and_subtotals() {
        let scores = YbocsScores::new(&[2, 3, 1, 0, 4, 2, 3, 1, 0, 2]).unwrap();
        assert_eq!(scores.total(), 18);
        assert_eq!(scores.obsessions_subtotal(), 10);
        assert_eq!(scores.compulsions_subtotal(), 8);
    }

    #[test]
    fn test_total_is_order_independent() {
        let a = YbocsScores::new(&[4, 0, 0, 0, 0, 0, 0, 0, 0, 1]).unwrap();
        let b = YbocsScores::new(&[0, 1, 0, 0, 0, 0, 0, 0, 4, 0]).unwrap();
        assert_eq!(a.total(), b.total());
    }

    #[test]
    fn test_scores_reject_wrong_count() {
        assert!(matches!(
            YbocsScores::new(&[1; 9]),
            Err(YbocsError::Validation(_))
        ));
        assert!(matches!(
            YbocsScores::new(&[1; 11]),
            Err(YbocsError::Validation(_))
        ));
    }

    #[test]
    fn test_scores_reject_out_of_range() {
        let err = YbocsScores::new(&[0, 0, 5, 0, 0, 0, 0, 0, 0, 0]).unwrap_err();
        assert!(err.to_string().contains("q3"));
    }

    #[test]
    fn test_severity_band_boundaries() {
        assert_eq!(SeverityBand::from_total(0), SeverityBand::Subclinical);
        assert_eq!(SeverityBand::from_total(7), SeverityBand::Subclinical);
        assert_eq!(SeverityBand::from_total(8), SeverityBand::Mild);
        assert_eq!(SeverityBand::from_total(18), SeverityBand::Moderate);
        assert_eq!(SeverityBand::from_total(24), SeverityBand::Severe);
        assert_eq!(SeverityBand::from_total(32), SeverityBand::Extreme);
        assert_eq!(SeverityBand::from_total(40), SeverityBand::Extreme);
    }
}
