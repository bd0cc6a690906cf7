// A Game is the authoritative state of one room: four seats, the hands dealt
// to them, whose turn it is and what sits on the table.
//
// Every public method takes the game's own lock for its whole body. Callers
// that also hold the hub lock must take the hub lock first.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use tracing::warn;

use crate::game::cards::{Card, CardGroup, ComboError, Deck, Rank, PLAYER_COUNT};
use crate::game::views::{GameResult, GameStateView, OtherPlayerView, PlayerResult, SelfView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerStatus {
    Waiting,
    Ready,
    Playing,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Waiting,
    Playing,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamMode {
    Unknown,
    OneVsThree,
    TwoVsTwo,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Game already started")]
    AlreadyStarted,
    #[error("Game is not in progress")]
    NotInProgress,
    #[error("Room is full")]
    RoomFull,
    #[error("Player is not seated in this game")]
    PlayerNotSeated,
    #[error("Not all four players are ready")]
    NotAllReady,
    #[error("It is not your turn")]
    NotYourTurn,
    #[error("Player has already played out all cards")]
    AlreadyFinished,
    #[error("Invalid card index: {0}")]
    InvalidCardIndex(usize),
    #[error("Card index selected more than once: {0}")]
    DuplicateCardIndex(usize),
    #[error("{0}")]
    InvalidCombination(ComboError),
    #[error("Selected cards cannot beat the cards on the table")]
    CannotBeat,
    #[error("The first play must include the four of hearts")]
    MustLeadWithOpeningCard,
    #[error("The last player to play cannot pass")]
    CannotPass,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub status: PlayerStatus,
    pub cards: Vec<Card>,
    /// 1 or 2 once the hand has been dealt.
    pub team: Option<u8>,
    pub position: usize,
    /// Cards this seat has played away during the hand.
    pub collected_cards: usize,
    /// Rounds this seat closed as the uncontested last player.
    pub rounds_won: usize,
}

impl Player {
    fn new(id: &str, name: &str, position: usize) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            status: PlayerStatus::Waiting,
            cards: Vec::new(),
            team: None,
            position,
            collected_cards: 0,
            rounds_won: 0,
        }
    }

    pub fn card_count(&self) -> usize {
        self.cards.len()
    }

    fn count_rank(&self, rank: Rank) -> usize {
        self.cards.iter().filter(|card| card.rank == rank).count()
    }

    fn holds_all_fours(&self) -> bool {
        self.count_rank(Rank::Four) == 4
    }
}

/// What a successful play or pass changed, beyond the table itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnOutcome {
    pub round_closed: bool,
    pub player_finished: bool,
    pub game_finished: bool,
}

#[derive(Debug)]
struct GameState {
    status: GameStatus,
    seats: [Option<Player>; PLAYER_COUNT],
    current_player: Option<usize>,
    last_player: Option<usize>,
    table: Option<CardGroup>,
    team_mode: TeamMode,
    finished_order: Vec<usize>,
    passes: usize,
    opened: bool,
}

impl GameState {
    fn new() -> Self {
        Self {
            status: GameStatus::Waiting,
            seats: std::array::from_fn(|_| None),
            current_player: None,
            last_player: None,
            table: None,
            team_mode: TeamMode::Unknown,
            finished_order: Vec::with_capacity(PLAYER_COUNT),
            passes: 0,
            opened: false,
        }
    }

    fn seat_of(&self, player_id: &str) -> Option<usize> {
        self.seats
            .iter()
            .position(|seat| seat.as_ref().is_some_and(|p| p.id == player_id))
    }

    fn players(&self) -> impl Iterator<Item = &Player> {
        self.seats.iter().flatten()
    }

    fn is_active(&self, seat: usize) -> bool {
        self.seats[seat]
            .as_ref()
            .is_some_and(|p| p.status == PlayerStatus::Playing)
    }

    fn active_count(&self) -> usize {
        (0..PLAYER_COUNT).filter(|&i| self.is_active(i)).count()
    }

    /// The next playing seat after `from`, wrapping around the table.
    fn next_active(&self, from: usize) -> Option<usize> {
        (1..=PLAYER_COUNT)
            .map(|step| (from + step) % PLAYER_COUNT)
            .find(|&seat| self.is_active(seat))
    }

    fn ready_count(&self) -> (usize, usize) {
        let seated = self.players().count();
        let ready = self
            .players()
            .filter(|p| p.status == PlayerStatus::Ready)
            .count();
        (seated, ready)
    }

    fn all_ready(&self) -> bool {
        self.ready_count() == (PLAYER_COUNT, PLAYER_COUNT)
    }

    fn begin(&mut self, hands: [Vec<Card>; PLAYER_COUNT]) -> Result<(), GameError> {
        if self.status != GameStatus::Waiting {
            return Err(GameError::AlreadyStarted);
        }
        if !self.all_ready() {
            return Err(GameError::NotAllReady);
        }

        for (seat, mut hand) in self.seats.iter_mut().zip(hands) {
            if let Some(player) = seat {
                hand.sort();
                player.cards = hand;
                player.status = PlayerStatus::Playing;
                player.team = None;
                player.collected_cards = 0;
                player.rounds_won = 0;
            }
        }

        self.determine_teams();

        let first = self.find_first_player();
        self.current_player = Some(first);
        self.last_player = Some(first);
        self.table = None;
        self.finished_order.clear();
        self.passes = 0;
        self.opened = false;
        self.status = GameStatus::Playing;
        Ok(())
    }

    /// Splits the table by who holds the two red threes.
    ///
    /// One seat with both plays alone against the other three. Otherwise the
    /// holders become opponents and the remaining seats, in seat order, join
    /// whichever team is smaller. With four seats and two holders that single
    /// pass always ends two against two.
    fn determine_teams(&mut self) {
        let holdings: Vec<usize> = self
            .seats
            .iter()
            .map(|seat| {
                seat.as_ref()
                    .map_or(0, |p| p.cards.iter().filter(|c| c.is_red_three()).count())
            })
            .collect();

        if let Some(solo) = holdings.iter().position(|&count| count == 2) {
            self.team_mode = TeamMode::OneVsThree;
            for (i, player) in self.seats.iter_mut().enumerate() {
                if let Some(player) = player {
                    player.team = Some(if i == solo { 1 } else { 2 });
                }
            }
            return;
        }

        self.team_mode = TeamMode::TwoVsTwo;
        let mut sizes = [0usize; 2];
        let mut next_team = 1u8;
        for (i, player) in self.seats.iter_mut().enumerate() {
            if let Some(player) = player {
                if holdings[i] == 1 {
                    player.team = Some(next_team);
                    sizes[usize::from(next_team - 1)] += 1;
                    next_team = 3 - next_team;
                }
            }
        }
        for (i, player) in self.seats.iter_mut().enumerate() {
            if let Some(player) = player {
                if holdings[i] == 0 {
                    let team = if sizes[0] <= sizes[1] { 1 } else { 2 };
                    player.team = Some(team);
                    sizes[usize::from(team - 1)] += 1;
                }
            }
        }
    }

    /// Whoever holds all four fours leads; otherwise the four of hearts does.
    fn find_first_player(&self) -> usize {
        let seat_where = |pred: fn(&Player) -> bool| {
            self.seats
                .iter()
                .position(|seat| seat.as_ref().is_some_and(pred))
        };
        seat_where(Player::holds_all_fours)
            .or_else(|| seat_where(|p| p.cards.contains(&Card::FOUR_OF_HEARTS)))
            .unwrap_or(0)
    }

    fn acting_seat(&self, player_id: &str) -> Result<usize, GameError> {
        if self.status != GameStatus::Playing {
            return Err(GameError::NotInProgress);
        }
        let seat = self
            .seat_of(player_id)
            .ok_or(GameError::PlayerNotSeated)?;
        if self.current_player != Some(seat) {
            return Err(GameError::NotYourTurn);
        }
        if self.seats[seat]
            .as_ref()
            .is_some_and(|p| p.status == PlayerStatus::Finished)
        {
            return Err(GameError::AlreadyFinished);
        }
        Ok(seat)
    }

    fn play(&mut self, seat: usize, indices: &[usize]) -> Result<TurnOutcome, GameError> {
        let player = self.seats[seat]
            .as_ref()
            .ok_or(GameError::PlayerNotSeated)?;

        let mut seen = HashSet::with_capacity(indices.len());
        for &idx in indices {
            if idx >= player.cards.len() {
                return Err(GameError::InvalidCardIndex(idx));
            }
            if !seen.insert(idx) {
                return Err(GameError::DuplicateCardIndex(idx));
            }
        }

        let selected: Vec<Card> = indices.iter().map(|&idx| player.cards[idx]).collect();
        let group = CardGroup::from_cards(&selected).map_err(GameError::InvalidCombination)?;

        if !self.opened {
            if !player.holds_all_fours() && !group.contains(&Card::FOUR_OF_HEARTS) {
                return Err(GameError::MustLeadWithOpeningCard);
            }
        } else if let Some(table) = &self.table {
            if !group.can_beat(table) {
                return Err(GameError::CannotBeat);
            }
        }

        let mut outcome = TurnOutcome::default();
        let played = group.len();
        let mut sorted = indices.to_vec();
        sorted.sort_unstable_by(|a, b| b.cmp(a));

        let player = self.seats[seat]
            .as_mut()
            .ok_or(GameError::PlayerNotSeated)?;
        for idx in sorted {
            player.cards.remove(idx);
        }
        player.collected_cards += played;
        let emptied = player.cards.is_empty();
        if emptied {
            player.status = PlayerStatus::Finished;
        }

        self.table = Some(group);
        self.last_player = Some(seat);
        self.passes = 0;
        self.opened = true;

        if emptied {
            outcome.player_finished = true;
            self.finished_order.push(seat);
            if self.check_game_end() {
                self.status = GameStatus::Finished;
                self.current_player = None;
                outcome.game_finished = true;
                return Ok(outcome);
            }
        }

        self.current_player = self.next_active(seat);
        Ok(outcome)
    }

    fn pass(&mut self, seat: usize) -> Result<TurnOutcome, GameError> {
        if self.last_player == Some(seat) {
            return Err(GameError::CannotPass);
        }

        let mut outcome = TurnOutcome::default();
        self.passes += 1;

        let last = self.last_player;
        let contenders = (0..PLAYER_COUNT)
            .filter(|&i| Some(i) != last && self.is_active(i))
            .count();

        match last {
            Some(winner) if self.passes >= contenders => {
                if let Some(player) = self.seats[winner].as_mut() {
                    player.rounds_won += 1;
                }
                let leader = if self.is_active(winner) {
                    Some(winner)
                } else {
                    self.next_active(winner)
                };
                self.table = None;
                self.passes = 0;
                self.current_player = leader;
                self.last_player = leader;
                outcome.round_closed = true;
            }
            _ => {
                self.current_player = self.next_active(seat);
            }
        }

        Ok(outcome)
    }

    fn team_with_two_finished(&self) -> Option<u8> {
        let mut finished = [0usize; 2];
        for &seat in &self.finished_order {
            if let Some(team) = self.seats[seat].as_ref().and_then(|p| p.team) {
                let slot = &mut finished[usize::from(team - 1)];
                *slot += 1;
                if *slot == 2 {
                    return Some(team);
                }
            }
        }
        None
    }

    fn check_game_end(&self) -> bool {
        match self.team_mode {
            TeamMode::OneVsThree => !self.finished_order.is_empty(),
            TeamMode::TwoVsTwo => {
                self.team_with_two_finished().is_some() || self.active_count() <= 1
            }
            TeamMode::Unknown => false,
        }
    }

    fn winning_team(&self) -> u8 {
        match self.team_mode {
            TeamMode::OneVsThree => self
                .finished_order
                .first()
                .and_then(|&seat| self.seats[seat].as_ref())
                .and_then(|p| p.team)
                .unwrap_or(2),
            _ => self.team_with_two_finished().unwrap_or_else(|| {
                let collected = |team: u8| -> usize {
                    self.players()
                        .filter(|p| p.team == Some(team))
                        .map(|p| p.collected_cards)
                        .sum()
                };
                if collected(1) > collected(2) {
                    1
                } else {
                    2
                }
            }),
        }
    }

    fn result(&self) -> Option<GameResult> {
        if self.status != GameStatus::Finished {
            return None;
        }
        let winning_team = self.winning_team();
        let players = self
            .players()
            .map(|p| PlayerResult {
                id: p.id.clone(),
                name: p.name.clone(),
                position: p.position,
                team: p.team,
                collected_cards: p.collected_cards,
                rounds_won: p.rounds_won,
                is_winner: p.team == Some(winning_team),
            })
            .collect();
        Some(GameResult {
            winning_team,
            team_mode: self.team_mode,
            finished_order: self.finished_order.clone(),
            players,
        })
    }

    fn view_for(&self, player_id: &str) -> Option<GameStateView> {
        let me = self.players().find(|p| p.id == player_id)?;
        let other_players = self
            .players()
            .filter(|p| p.id != player_id)
            .map(|p| OtherPlayerView {
                id: p.id.clone(),
                name: p.name.clone(),
                position: p.position,
                status: p.status,
                card_count: p.card_count(),
                collected_cards: p.collected_cards,
            })
            .collect();

        Some(GameStateView {
            status: self.status,
            current_player: self.current_player,
            last_player: self.last_player,
            player: SelfView {
                id: me.id.clone(),
                name: me.name.clone(),
                status: me.status,
                cards: me.cards.clone(),
                position: me.position,
                card_count: me.card_count(),
                collected_cards: me.collected_cards,
            },
            other_players,
            table_cards: self.table.clone(),
        })
    }
}

/// One room's game, guarded by its own lock.
#[derive(Debug)]
pub struct Game {
    id: String,
    state: Mutex<GameState>,
}

impl Game {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: Mutex::new(GameState::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GameState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!(room_id = %self.id, "Game lock poisoned, recovering state");
            poisoned.into_inner()
        })
    }

    /// Seats a player in the first free seat and returns the seat index.
    ///
    /// Re-adding a seated player only refreshes the display name.
    pub fn add_player(&self, player_id: &str, name: &str) -> Result<usize, GameError> {
        let mut state = self.lock();
        if state.status != GameStatus::Waiting {
            return Err(GameError::AlreadyStarted);
        }

        if let Some(seat) = state.seat_of(player_id) {
            if let Some(player) = state.seats[seat].as_mut() {
                player.name = name.to_string();
            }
            return Ok(seat);
        }

        let seat = state
            .seats
            .iter()
            .position(Option::is_none)
            .ok_or(GameError::RoomFull)?;
        state.seats[seat] = Some(Player::new(player_id, name, seat));
        Ok(seat)
    }

    /// Clears the player's seat, returning which seat it was.
    pub fn remove_player(&self, player_id: &str) -> Option<usize> {
        let mut state = self.lock();
        let seat = state.seat_of(player_id)?;
        state.seats[seat] = None;
        Some(seat)
    }

    pub fn set_ready(&self, player_id: &str) -> Result<(), GameError> {
        let mut state = self.lock();
        if state.status != GameStatus::Waiting {
            return Err(GameError::AlreadyStarted);
        }
        let seat = state
            .seat_of(player_id)
            .ok_or(GameError::PlayerNotSeated)?;
        if let Some(player) = state.seats[seat].as_mut() {
            player.status = PlayerStatus::Ready;
        }
        Ok(())
    }

    pub fn all_players_ready(&self) -> bool {
        self.lock().all_ready()
    }

    /// Shuffles a fresh deck, deals it and opens the hand.
    pub fn start_game(&self) -> Result<(), GameError> {
        let mut deck = Deck::new();
        deck.shuffle();
        self.start_with_hands(deck.deal())
    }

    /// Opens the hand with the given per-seat cards instead of a shuffled deal.
    pub fn start_with_hands(&self, hands: [Vec<Card>; PLAYER_COUNT]) -> Result<(), GameError> {
        self.lock().begin(hands)
    }

    /// Plays the cards at `indices` of the player's current hand.
    ///
    /// An empty selection is a pass.
    pub fn play_cards(&self, player_id: &str, indices: &[usize]) -> Result<TurnOutcome, GameError> {
        let mut state = self.lock();
        let seat = state.acting_seat(player_id)?;
        if indices.is_empty() {
            return state.pass(seat);
        }
        state.play(seat, indices)
    }

    pub fn pass(&self, player_id: &str) -> Result<TurnOutcome, GameError> {
        let mut state = self.lock();
        let seat = state.acting_seat(player_id)?;
        state.pass(seat)
    }

    pub fn status(&self) -> GameStatus {
        self.lock().status
    }

    pub fn current_player(&self) -> Option<usize> {
        self.lock().current_player
    }

    pub fn team_mode(&self) -> TeamMode {
        self.lock().team_mode
    }

    pub fn is_seated(&self, player_id: &str) -> bool {
        self.lock().seat_of(player_id).is_some()
    }

    pub fn player_status(&self, player_id: &str) -> Option<PlayerStatus> {
        let state = self.lock();
        let status = state.players().find(|p| p.id == player_id).map(|p| p.status);
        status
    }

    /// Final standings, once the game has finished.
    pub fn result(&self) -> Option<GameResult> {
        self.lock().result()
    }

    /// The game as seen by one seated player: their own hand, only counts
    /// for everyone else.
    pub fn view_for(&self, player_id: &str) -> Option<GameStateView> {
        self.lock().view_for(player_id)
    }

    /// Cards still held plus cards played away, across all seats.
    pub fn accounted_cards(&self) -> usize {
        let state = self.lock();
        let total: usize = state
            .players()
            .map(|p| p.card_count() + p.collected_cards)
            .sum();
        total
    }
}
