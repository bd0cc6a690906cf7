use thiserror::Error;

use super::basic::{Card, Rank};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComboError {
    #[error("No cards selected")]
    Empty,
    #[error("Threes cannot be part of a straight or consecutive pairs")]
    ThreeInRun,
    #[error("Invalid card combination")]
    InvalidShape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComboType {
    Single,
    Pair,
    Straight,
    #[serde(rename = "consecutive_pairs")]
    PairRun,
    /// Three of a kind.
    #[serde(rename = "three_of_a_kind")]
    SmallBomb,
    /// Four of a kind.
    #[serde(rename = "four_of_a_kind")]
    BigBomb,
}

impl ComboType {
    pub fn is_run(self) -> bool {
        matches!(self, ComboType::Straight | ComboType::PairRun)
    }

    pub fn name(self) -> &'static str {
        match self {
            ComboType::Single => "Single",
            ComboType::Pair => "Pair",
            ComboType::Straight => "Straight",
            ComboType::PairRun => "Consecutive Pairs",
            ComboType::SmallBomb => "Three of a Kind",
            ComboType::BigBomb => "Four of a Kind",
        }
    }
}

const MIN_STRAIGHT_LEN: usize = 5;
const MIN_PAIR_RUN_LEN: usize = 6;

/// A legally shaped set of cards played in one turn.
///
/// Cards are kept sorted by rank then suit, so the same selection always
/// produces the same group regardless of the order it was picked in.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CardGroup {
    cards: Vec<Card>,
    #[serde(rename = "type")]
    combo_type: ComboType,
    value: Rank,
}

impl CardGroup {
    pub fn from_cards(cards: &[Card]) -> Result<Self, ComboError> {
        if cards.is_empty() {
            return Err(ComboError::Empty);
        }

        let mut cards = cards.to_vec();
        cards.sort();

        let is_long = cards.len() >= MIN_STRAIGHT_LEN;
        if is_long && cards.iter().any(|card| card.rank == Rank::Three) {
            return Err(ComboError::ThreeInRun);
        }

        let combo_type = Self::classify(&cards).ok_or(ComboError::InvalidShape)?;
        // Sorted ascending, so the last card carries the group's value for
        // runs and any card does for same-rank groups.
        let value = cards[cards.len() - 1].rank;

        Ok(Self {
            cards,
            combo_type,
            value,
        })
    }

    fn classify(cards: &[Card]) -> Option<ComboType> {
        let all_same_rank = cards.iter().all(|card| card.rank == cards[0].rank);

        match cards.len() {
            1 => Some(ComboType::Single),
            2 if all_same_rank => Some(ComboType::Pair),
            3 if all_same_rank => Some(ComboType::SmallBomb),
            4 if all_same_rank => Some(ComboType::BigBomb),
            n if n >= MIN_STRAIGHT_LEN && Self::is_straight(cards) => Some(ComboType::Straight),
            n if n >= MIN_PAIR_RUN_LEN && n % 2 == 0 && Self::is_pair_run(cards) => {
                Some(ComboType::PairRun)
            }
            _ => None,
        }
    }

    fn is_straight(cards: &[Card]) -> bool {
        cards
            .windows(2)
            .all(|pair| pair[0].rank.precedes(pair[1].rank))
    }

    fn is_pair_run(cards: &[Card]) -> bool {
        let pairs: Vec<&[Card]> = cards.chunks(2).collect();
        pairs.iter().all(|pair| pair[0].rank == pair[1].rank)
            && pairs
                .windows(2)
                .all(|window| window[0][0].rank.precedes(window[1][0].rank))
    }

    /// Whether `self`, played on top of `table`, defeats it.
    ///
    /// Bombs cut across types; everything else needs the same type, and runs
    /// additionally need the same length.
    pub fn can_beat(&self, table: &CardGroup) -> bool {
        match (self.combo_type, table.combo_type) {
            (ComboType::BigBomb, ComboType::BigBomb) => self.value > table.value,
            (ComboType::BigBomb, _) => true,
            (ComboType::SmallBomb, ComboType::BigBomb) => false,
            (ComboType::SmallBomb, ComboType::SmallBomb) => self.value > table.value,
            (ComboType::SmallBomb, _) => true,
            (mine, theirs) if mine != theirs => false,
            (mine, _) if mine.is_run() && self.cards.len() != table.cards.len() => false,
            _ => self.value > table.value,
        }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn combo_type(&self) -> ComboType {
        self.combo_type
    }

    pub fn value(&self) -> Rank {
        self.value
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn contains(&self, card: &Card) -> bool {
        self.cards.contains(card)
    }
}
