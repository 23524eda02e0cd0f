//! Per-set difficulty ratings and their aggregation.
//!
//! Sets are rated on a three-point scale. The workout editor records the
//! ratings as emoji; everything else uses the words.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Qualitative difficulty of a set
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Neutral,
    Hard,
}

impl Difficulty {
    /// Position on the 1..=3 scale
    pub fn score(self) -> u32 {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Neutral => 2,
            Difficulty::Hard => 3,
        }
    }

    /// Map an average score back onto the scale
    ///
    /// Boundaries are inclusive on the easier side: 1.5 is easy, 2.5 is neutral.
    pub fn from_average(average: f64) -> Self {
        if average <= 1.5 {
            Difficulty::Easy
        } else if average <= 2.5 {
            Difficulty::Neutral
        } else {
            Difficulty::Hard
        }
    }

    /// Fold a run of per-set ratings into one representative rating
    ///
    /// Unrated sets are skipped. With nothing rated the result is neutral.
    pub fn aggregate<I>(ratings: I) -> Self
    where
        I: IntoIterator<Item = Option<Difficulty>>,
    {
        let (total, count) = ratings
            .into_iter()
            .flatten()
            .fold((0u32, 0u32), |(total, count), d| (total + d.score(), count + 1));

        if count == 0 {
            return Difficulty::Neutral;
        }

        Difficulty::from_average(f64::from(total) / f64::from(count))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Neutral => "neutral",
            Difficulty::Hard => "hard",
        }
    }

    /// Emoji used by the workout editor
    pub fn emoji(self) -> &'static str {
        match self {
            Difficulty::Easy => "😊",
            Difficulty::Neutral => "😐",
            Difficulty::Hard => "☹️",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" | "😊" => Ok(Difficulty::Easy),
            "neutral" | "ok" | "medium" | "😐" => Ok(Difficulty::Neutral),
            "hard" | "☹️" | "☹" => Ok(Difficulty::Hard),
            other => Err(crate::Error::InvalidInput(format!(
                "Unknown difficulty rating: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Difficulty::*;

    #[test]
    fn test_no_ratings_is_neutral() {
        assert_eq!(Difficulty::aggregate(Vec::new()), Neutral);
        assert_eq!(Difficulty::aggregate(vec![None, None]), Neutral);
    }

    #[test]
    fn test_uniform_ratings() {
        assert_eq!(Difficulty::aggregate(vec![Some(Easy), Some(Easy)]), Easy);
        assert_eq!(Difficulty::aggregate(vec![Some(Hard)]), Hard);
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        // 2.5 stays neutral
        assert_eq!(Difficulty::aggregate(vec![Some(Hard), Some(Neutral)]), Neutral);
        // 1.5 stays easy
        assert_eq!(Difficulty::aggregate(vec![Some(Easy), Some(Neutral)]), Easy);
        // 2.67 tips to hard
        assert_eq!(
            Difficulty::aggregate(vec![Some(Hard), Some(Hard), Some(Neutral)]),
            Hard
        );
    }

    #[test]
    fn test_unrated_sets_are_excluded() {
        assert_eq!(
            Difficulty::aggregate(vec![None, Some(Hard), None, Some(Hard)]),
            Hard
        );
    }

    #[test]
    fn test_parse_words_and_emoji() {
        assert_eq!("easy".parse::<Difficulty>().unwrap(), Easy);
        assert_eq!("HARD".parse::<Difficulty>().unwrap(), Hard);
        assert_eq!("😐".parse::<Difficulty>().unwrap(), Neutral);
        assert_eq!("☹️".parse::<Difficulty>().unwrap(), Hard);
        assert!("brutal".parse::<Difficulty>().is_err());
    }
}
