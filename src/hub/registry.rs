// Everything in here runs with the hub lock held. Methods are synchronous:
// outbound delivery is a non-blocking `try_send`, and a connection whose
// queue refuses a message is queued for reaping instead of being waited on.

use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, mpsc::error::TrySendError};
use tracing::{debug, error, info, warn};

use super::{ConnId, DropReason, HubError, HubEvent};
use crate::game::{Game, GameError, GameStatus, PlayerStatus, PLAYER_COUNT};
use crate::websockets::{RoomPlayer, ServerMessage};

/// A connection as the hub sees it once registered.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    pub conn_id: ConnId,
    pub player_id: String,
    pub player_name: String,
    pub sender: mpsc::Sender<String>,
}

#[derive(Debug)]
struct ClientEntry {
    player_id: String,
    player_name: String,
    sender: mpsc::Sender<String>,
    room_id: Option<String>,
}

#[derive(Debug)]
struct Room {
    /// Join order.
    members: Vec<ConnId>,
    game: Arc<Game>,
}

/// Listing entry for the rooms endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomSummary {
    pub id: String,
    pub players: Vec<RoomPlayer>,
    pub status: GameStatus,
    pub capacity: usize,
}

#[derive(Debug)]
pub(crate) struct HubState {
    clients: HashMap<ConnId, ClientEntry>,
    rooms: HashMap<String, Room>,
    dead: Vec<(ConnId, DropReason)>,
    events: broadcast::Sender<HubEvent>,
}

impl HubState {
    pub fn new(events: broadcast::Sender<HubEvent>) -> Self {
        Self {
            clients: HashMap::new(),
            rooms: HashMap::new(),
            dead: Vec::new(),
            events,
        }
    }

    fn emit(&self, event: HubEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub fn register(&mut self, client: ClientHandle) {
        info!(
            conn_id = %client.conn_id,
            player_id = %client.player_id,
            "Connection registered"
        );
        self.clients.insert(
            client.conn_id,
            ClientEntry {
                player_id: client.player_id.clone(),
                player_name: client.player_name,
                sender: client.sender,
                room_id: None,
            },
        );
        self.emit(HubEvent::ConnectionRegistered {
            conn_id: client.conn_id,
            player_id: client.player_id,
        });
    }

    /// Leaves any room and forgets the connection. Dropping its entry drops
    /// the only sender of its outbound queue, which ends its writer.
    pub fn unregister(&mut self, conn_id: ConnId) {
        if !self.clients.contains_key(&conn_id) {
            return;
        }
        let _ = self.leave(conn_id);
        if let Some(client) = self.clients.remove(&conn_id) {
            info!(conn_id = %conn_id, player_id = %client.player_id, "Connection unregistered");
            self.emit(HubEvent::ConnectionClosed {
                conn_id,
                player_id: client.player_id,
            });
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    // Delivery

    fn deliver(&mut self, conn_id: ConnId, payload: &str) {
        let Some(client) = self.clients.get(&conn_id) else {
            return;
        };
        match client.sender.try_send(payload.to_string()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => self.dead.push((conn_id, DropReason::QueueFull)),
            Err(TrySendError::Closed(_)) => self.dead.push((conn_id, DropReason::QueueClosed)),
        }
    }

    fn encode(message: &ServerMessage) -> Option<String> {
        match message.to_json() {
            Ok(json) => Some(json),
            Err(e) => {
                error!(message_type = message.type_name(), error = %e, "Failed to encode message");
                None
            }
        }
    }

    pub fn send_to(&mut self, conn_id: ConnId, message: &ServerMessage) {
        if let Some(payload) = Self::encode(message) {
            self.deliver(conn_id, &payload);
        }
    }

    fn broadcast_room(&mut self, room_id: &str, message: &ServerMessage, except: Option<ConnId>) {
        let Some(members) = self.rooms.get(room_id).map(|room| room.members.clone()) else {
            return;
        };
        let Some(payload) = Self::encode(message) else {
            return;
        };
        debug!(
            room_id = %room_id,
            message_type = message.type_name(),
            recipients = members.len(),
            "Broadcasting to room"
        );
        for conn_id in members.into_iter().filter(|m| Some(*m) != except) {
            self.deliver(conn_id, &payload);
        }
    }

    pub fn broadcast_all(&mut self, message: &ServerMessage) {
        let Some(payload) = Self::encode(message) else {
            return;
        };
        let everyone: Vec<ConnId> = self.clients.keys().copied().collect();
        for conn_id in everyone {
            self.deliver(conn_id, &payload);
        }
    }

    fn room_state_message(&self, room_id: &str) -> Option<ServerMessage> {
        let room = self.rooms.get(room_id)?;
        let players = room
            .members
            .iter()
            .filter_map(|conn_id| self.clients.get(conn_id))
            .map(|client| RoomPlayer {
                id: client.player_id.clone(),
                name: client.player_name.clone(),
                ready: room
                    .game
                    .player_status(&client.player_id)
                    .map(|status| status == PlayerStatus::Ready),
            })
            .collect();
        Some(ServerMessage::RoomState {
            room_id: room_id.to_string(),
            players,
        })
    }

    fn send_room_state(&mut self, room_id: &str, conn_id: ConnId) {
        if let Some(message) = self.room_state_message(room_id) {
            self.send_to(conn_id, &message);
        }
    }

    fn broadcast_room_state(&mut self, room_id: &str) {
        if let Some(message) = self.room_state_message(room_id) {
            self.broadcast_room(room_id, &message, None);
        }
    }

    /// Pushes every member their own view of the room's game.
    pub fn send_game_state(&mut self, room_id: &str) {
        let Some(room) = self.rooms.get(room_id) else {
            return;
        };
        let views: Vec<(ConnId, ServerMessage)> = room
            .members
            .iter()
            .filter_map(|conn_id| {
                let client = self.clients.get(conn_id)?;
                let view = room.game.view_for(&client.player_id)?;
                Some((*conn_id, ServerMessage::GameState(view)))
            })
            .collect();
        for (conn_id, message) in views {
            self.send_to(conn_id, &message);
        }
    }

    /// Drops every connection that refused a delivery, applying the same
    /// room cleanup as a normal disconnect. Cleanup broadcasts can turn up
    /// more dead connections, so this runs until the list is empty.
    pub fn reap_dead(&mut self) {
        while let Some((conn_id, reason)) = self.dead.pop() {
            if !self.clients.contains_key(&conn_id) {
                continue;
            }
            let _ = self.leave(conn_id);
            if let Some(client) = self.clients.remove(&conn_id) {
                warn!(
                    conn_id = %conn_id,
                    player_id = %client.player_id,
                    reason = ?reason,
                    "Dropping unresponsive connection"
                );
                self.emit(HubEvent::ConnectionDropped {
                    conn_id,
                    player_id: client.player_id,
                    reason,
                });
            }
        }
    }

    // Rooms

    fn member_of(&self, conn_id: ConnId) -> Result<(String, String, String), HubError> {
        let client = self.clients.get(&conn_id).ok_or(HubError::NotRegistered)?;
        let room_id = client.room_id.clone().ok_or(HubError::NotInRoom)?;
        Ok((client.player_id.clone(), client.player_name.clone(), room_id))
    }

    fn game_of(&self, room_id: &str) -> Result<Arc<Game>, HubError> {
        self.rooms
            .get(room_id)
            .map(|room| Arc::clone(&room.game))
            .ok_or_else(|| HubError::RoomNotFound(room_id.to_string()))
    }

    /// Whether `game` is still the game bound to `room_id`.
    pub fn is_current_game(&self, room_id: &str, game: &Arc<Game>) -> bool {
        self.rooms
            .get(room_id)
            .is_some_and(|room| Arc::ptr_eq(&room.game, game))
    }

    /// A waiting game with the given members seated, none ready.
    fn fresh_game(&self, room_id: &str, members: &[ConnId]) -> Game {
        let game = Game::new(room_id);
        for client in members.iter().filter_map(|m| self.clients.get(m)) {
            if let Err(e) = game.add_player(&client.player_id, &client.player_name) {
                warn!(room_id = %room_id, player_id = %client.player_id, error = %e, "Could not reseat player");
            }
        }
        game
    }

    fn replace_game(&mut self, room_id: &str) {
        let Some(members) = self.rooms.get(room_id).map(|room| room.members.clone()) else {
            return;
        };
        let game = Arc::new(self.fresh_game(room_id, &members));
        if let Some(room) = self.rooms.get_mut(room_id) {
            room.game = game;
        }
    }

    fn reset_if_finished(&mut self, room_id: &str) {
        let finished = self
            .rooms
            .get(room_id)
            .is_some_and(|room| room.game.status() == GameStatus::Finished);
        if finished {
            debug!(room_id = %room_id, "Resetting finished game");
            self.replace_game(room_id);
        }
    }

    /// A fresh `YYYYMMDDHHMMSS` id, suffixed `-2`, `-3`, ... if taken.
    pub fn generate_room_id(&self) -> String {
        let base = Utc::now().format("%Y%m%d%H%M%S").to_string();
        let mut candidate = base.clone();
        let mut n = 1;
        while self.rooms.contains_key(&candidate) {
            n += 1;
            candidate = format!("{}-{}", base, n);
        }
        candidate
    }

    pub fn join(&mut self, conn_id: ConnId, room_id: &str) -> Result<(), HubError> {
        let client = self.clients.get(&conn_id).ok_or(HubError::NotRegistered)?;
        if room_id.trim().is_empty() {
            return Err(HubError::BlankRoomId);
        }
        let player_id = client.player_id.clone();
        let player_name = client.player_name.clone();
        let current_room = client.room_id.clone();

        if current_room.as_deref() == Some(room_id) {
            // Already a member: make sure the seat exists and resend the room.
            let game = self.game_of(room_id)?;
            if game.status() == GameStatus::Waiting && !game.is_seated(&player_id) {
                game.add_player(&player_id, &player_name)?;
            }
            self.send_room_state(room_id, conn_id);
            return Ok(());
        }

        if let Some(room) = self.rooms.get(room_id) {
            if room.members.len() >= PLAYER_COUNT {
                return Err(HubError::RoomFull);
            }
            let duplicate = room
                .members
                .iter()
                .filter_map(|m| self.clients.get(m))
                .any(|member| member.player_id == player_id);
            if duplicate {
                return Err(HubError::DuplicatePlayer(player_id));
            }
            if room.game.status() == GameStatus::Playing {
                return Err(GameError::AlreadyStarted.into());
            }
        }

        if current_room.is_some() {
            self.leave(conn_id)?;
        }

        if !self.rooms.contains_key(room_id) {
            self.rooms.insert(
                room_id.to_string(),
                Room {
                    members: Vec::with_capacity(PLAYER_COUNT),
                    game: Arc::new(Game::new(room_id)),
                },
            );
            info!(room_id = %room_id, "Room created");
            self.emit(HubEvent::RoomCreated {
                room_id: room_id.to_string(),
            });
        }
        self.reset_if_finished(room_id);

        let game = self.game_of(room_id)?;
        if let Err(e) = game.add_player(&player_id, &player_name) {
            self.destroy_if_empty(room_id);
            return Err(e.into());
        }
        if let Some(room) = self.rooms.get_mut(room_id) {
            room.members.push(conn_id);
        }
        if let Some(client) = self.clients.get_mut(&conn_id) {
            client.room_id = Some(room_id.to_string());
        }

        info!(room_id = %room_id, player_id = %player_id, "Player joined room");
        self.broadcast_room(
            room_id,
            &ServerMessage::PlayerJoined {
                player_id,
                name: player_name,
            },
            Some(conn_id),
        );
        self.send_room_state(room_id, conn_id);
        Ok(())
    }

    /// Creates a room under a generated id and joins it.
    pub fn create(&mut self, conn_id: ConnId) -> Result<String, HubError> {
        if !self.clients.contains_key(&conn_id) {
            return Err(HubError::NotRegistered);
        }
        let room_id = self.generate_room_id();
        self.send_to(
            conn_id,
            &ServerMessage::RoomCreated {
                room_id: room_id.clone(),
            },
        );
        self.join(conn_id, &room_id)?;
        Ok(room_id)
    }

    fn destroy_if_empty(&mut self, room_id: &str) -> bool {
        let empty = self
            .rooms
            .get(room_id)
            .is_some_and(|room| room.members.is_empty());
        if empty {
            self.rooms.remove(room_id);
            info!(room_id = %room_id, "Room destroyed");
            self.emit(HubEvent::RoomDestroyed {
                room_id: room_id.to_string(),
            });
        }
        empty
    }

    pub fn leave(&mut self, conn_id: ConnId) -> Result<(), HubError> {
        let client = self
            .clients
            .get_mut(&conn_id)
            .ok_or(HubError::NotRegistered)?;
        let room_id = client.room_id.take().ok_or(HubError::NotInRoom)?;
        let player_id = client.player_id.clone();

        let Some(room) = self.rooms.get_mut(&room_id) else {
            return Ok(());
        };
        room.members.retain(|m| *m != conn_id);

        let aborted =
            room.game.status() == GameStatus::Playing && room.game.is_seated(&player_id);
        if !aborted {
            room.game.remove_player(&player_id);
        }
        info!(room_id = %room_id, player_id = %player_id, "Player left room");

        if self.destroy_if_empty(&room_id) {
            return Ok(());
        }

        if aborted {
            warn!(room_id = %room_id, player_id = %player_id, "Hand abandoned");
            self.replace_game(&room_id);
            self.emit(HubEvent::GameAborted {
                room_id: room_id.clone(),
                player_id: player_id.clone(),
            });
            self.broadcast_room(
                &room_id,
                &ServerMessage::GameAborted {
                    player_id: player_id.clone(),
                },
                None,
            );
        }

        self.broadcast_room(&room_id, &ServerMessage::PlayerLeft { player_id }, None);
        self.broadcast_room_state(&room_id);
        Ok(())
    }

    // Game actions

    /// Marks the player ready, seating them first if needed. Returns the game
    /// if this made all four ready and it started.
    pub fn ready(&mut self, conn_id: ConnId) -> Result<Option<(String, Arc<Game>)>, HubError> {
        let (player_id, player_name, room_id) = self.member_of(conn_id)?;
        self.reset_if_finished(&room_id);
        let game = self.game_of(&room_id)?;

        if !game.is_seated(&player_id) {
            game.add_player(&player_id, &player_name)?;
        }
        game.set_ready(&player_id)?;
        debug!(room_id = %room_id, player_id = %player_id, "Player ready");

        self.broadcast_room(
            &room_id,
            &ServerMessage::PlayerReady {
                player_id: player_id.clone(),
            },
            None,
        );
        self.broadcast_room_state(&room_id);

        if !game.all_players_ready() {
            return Ok(None);
        }

        game.start_game()?;
        info!(room_id = %room_id, team_mode = ?game.team_mode(), "Game started");
        self.emit(HubEvent::GameStarted {
            room_id: room_id.clone(),
        });
        self.broadcast_room(
            &room_id,
            &ServerMessage::GameStarted {
                current_player: game.current_player(),
            },
            None,
        );
        Ok(Some((room_id, game)))
    }

    pub fn play(&mut self, conn_id: ConnId, indices: &[usize]) -> Result<(), HubError> {
        if indices.is_empty() {
            return self.pass(conn_id);
        }
        let (player_id, _, room_id) = self.member_of(conn_id)?;
        let game = self.game_of(&room_id)?;

        let outcome = game.play_cards(&player_id, indices)?;
        debug!(room_id = %room_id, player_id = %player_id, cards = indices.len(), "Cards played");
        self.send_game_state(&room_id);

        if outcome.game_finished {
            if let Some(result) = game.result() {
                info!(room_id = %room_id, winning_team = result.winning_team, "Game finished");
                self.emit(HubEvent::GameFinished {
                    room_id: room_id.clone(),
                    winning_team: result.winning_team,
                });
                self.broadcast_room(&room_id, &ServerMessage::GameEnd { result }, None);
            }
        }
        Ok(())
    }

    pub fn pass(&mut self, conn_id: ConnId) -> Result<(), HubError> {
        let (player_id, _, room_id) = self.member_of(conn_id)?;
        let game = self.game_of(&room_id)?;

        let outcome = game.pass(&player_id)?;
        let current_player = game.current_player();
        debug!(room_id = %room_id, player_id = %player_id, "Player passed");

        self.broadcast_room(
            &room_id,
            &ServerMessage::PlayerPass {
                player_id,
                current_player,
            },
            None,
        );
        if outcome.round_closed {
            self.broadcast_room(&room_id, &ServerMessage::RoundEnd { current_player }, None);
        }
        self.send_game_state(&room_id);
        Ok(())
    }

    pub fn room_summaries(&self) -> Vec<RoomSummary> {
        let mut summaries: Vec<RoomSummary> = self
            .rooms
            .iter()
            .map(|(id, room)| RoomSummary {
                id: id.clone(),
                players: room
                    .members
                    .iter()
                    .filter_map(|m| self.clients.get(m))
                    .map(|client| RoomPlayer {
                        id: client.player_id.clone(),
                        name: client.player_name.clone(),
                        ready: None,
                    })
                    .collect(),
                status: room.game.status(),
                capacity: PLAYER_COUNT,
            })
            .collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Card;
    use uuid::Uuid;

    fn state() -> (HubState, broadcast::Receiver<HubEvent>) {
        let (events, rx) = broadcast::channel(64);
        (HubState::new(events), rx)
    }

    fn connect(state: &mut HubState, player_id: &str, queue: usize) -> (ConnId, mpsc::Receiver<String>) {
        let conn_id = Uuid::new_v4();
        let (sender, receiver) = mpsc::channel(queue);
        state.register(ClientHandle {
            conn_id,
            player_id: player_id.to_string(),
            player_name: player_id.to_uppercase(),
            sender,
        });
        (conn_id, receiver)
    }

    fn drain_types(rx: &mut mpsc::Receiver<String>) -> Vec<String> {
        let mut types = Vec::new();
        while let Ok(raw) = rx.try_recv() {
            let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
            types.push(value["type"].as_str().unwrap().to_string());
        }
        types
    }

    #[test]
    fn test_generated_room_ids_do_not_collide() {
        let (mut state, _events) = state();
        let (conn, _rx) = connect(&mut state, "alice", 16);

        let first = state.generate_room_id();
        assert_eq!(first.len(), 14);
        assert!(first.chars().all(|c| c.is_ascii_digit()));

        state.join(conn, &first).unwrap();
        let second = state.generate_room_id();
        if second.len() > 14 {
            assert_eq!(second, format!("{}-2", first));
        } else {
            // The clock ticked over between calls.
            assert_ne!(second, first);
        }
    }

    #[test]
    fn test_join_and_leave_messages() {
        let (mut state, mut events) = state();
        let (alice, mut alice_rx) = connect(&mut state, "alice", 16);
        let (bob, mut bob_rx) = connect(&mut state, "bob", 16);

        state.join(alice, "R1").unwrap();
        assert_eq!(drain_types(&mut alice_rx), vec!["room_state"]);

        state.join(bob, "R1").unwrap();
        assert_eq!(drain_types(&mut alice_rx), vec!["player_joined"]);
        assert_eq!(drain_types(&mut bob_rx), vec!["room_state"]);

        state.leave(bob).unwrap();
        assert_eq!(drain_types(&mut alice_rx), vec!["player_left", "room_state"]);
        assert_eq!(state.leave(bob), Err(HubError::NotInRoom));

        state.leave(alice).unwrap();
        assert!(state.room_summaries().is_empty());

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert!(seen.contains(&HubEvent::RoomCreated { room_id: "R1".into() }));
        assert!(seen.contains(&HubEvent::RoomDestroyed { room_id: "R1".into() }));
    }

    #[test]
    fn test_same_identity_cannot_join_twice() {
        let (mut state, _events) = state();
        let (first, _rx1) = connect(&mut state, "alice", 16);
        let (second, _rx2) = connect(&mut state, "alice", 16);

        state.join(first, "R1").unwrap();
        assert_eq!(
            state.join(second, "R1"),
            Err(HubError::DuplicatePlayer("alice".into()))
        );
    }

    #[test]
    fn test_rejoining_same_room_resends_state() {
        let (mut state, _events) = state();
        let (alice, mut rx) = connect(&mut state, "alice", 16);
        state.join(alice, "R1").unwrap();
        drain_types(&mut rx);

        state.join(alice, "R1").unwrap();
        assert_eq!(drain_types(&mut rx), vec!["room_state"]);
        assert_eq!(state.room_summaries()[0].players.len(), 1);
    }

    #[test]
    fn test_joining_another_room_leaves_the_first() {
        let (mut state, _events) = state();
        let (alice, _rx) = connect(&mut state, "alice", 16);
        state.join(alice, "R1").unwrap();
        state.join(alice, "R2").unwrap();

        let rooms = state.room_summaries();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].id, "R2");
    }

    #[test]
    fn test_full_queue_drops_connection() {
        let (mut state, mut events) = state();
        let (alice, _alice_rx) = connect(&mut state, "alice", 16);
        let (bob, _bob_rx) = connect(&mut state, "bob", 1);
        state.join(alice, "R1").unwrap();
        // bob's single slot is taken by his room_state.
        state.join(bob, "R1").unwrap();

        state.broadcast_all(&ServerMessage::notice("hello"));
        state.reap_dead();

        assert_eq!(state.client_count(), 1);
        assert_eq!(state.room_summaries()[0].players.len(), 1);

        let dropped = std::iter::from_fn(|| events.try_recv().ok()).any(|event| {
            event
                == HubEvent::ConnectionDropped {
                    conn_id: bob,
                    player_id: "bob".into(),
                    reason: DropReason::QueueFull,
                }
        });
        assert!(dropped);
    }

    #[test]
    fn test_closed_queue_is_reaped() {
        let (mut state, _events) = state();
        let (alice, alice_rx) = connect(&mut state, "alice", 16);
        drop(alice_rx);

        state.send_to(alice, &ServerMessage::notice("anyone there?"));
        state.reap_dead();
        assert_eq!(state.client_count(), 0);
    }

    #[test]
    fn test_blank_room_id_is_rejected() {
        let (mut state, _events) = state();
        let (alice, mut rx) = connect(&mut state, "alice", 16);

        assert_eq!(state.join(alice, ""), Err(HubError::BlankRoomId));
        assert_eq!(state.join(alice, "   "), Err(HubError::BlankRoomId));
        assert!(state.room_summaries().is_empty());
        assert!(drain_types(&mut rx).is_empty());
    }

    #[test]
    fn test_game_end_is_announced_and_ready_starts_a_rematch() {
        let (mut state, mut events) = state();
        let mut members = Vec::new();
        for id in ["alice", "bob", "charlie", "david"] {
            let (conn, rx) = connect(&mut state, id, 64);
            state.join(conn, "R1").unwrap();
            members.push((conn, rx));
        }

        let game = state.game_of("R1").unwrap();
        for id in ["alice", "bob", "charlie", "david"] {
            game.set_ready(id).unwrap();
        }
        let hands = ["4H 3H 3D", "5H 6S", "7H 8S", "9H TS"].map(|hand| {
            hand.split_whitespace()
                .map(|c| Card::from_string(c).unwrap())
                .collect::<Vec<_>>()
        });
        game.start_with_hands(hands).unwrap();

        let conn = |i: usize| members[i].0;
        let (alice, bob, charlie, david) = (conn(0), conn(1), conn(2), conn(3));
        // alice's sorted hand is 4H 3D 3H.
        state.play(alice, &[0]).unwrap();
        state.pass(bob).unwrap();
        state.pass(charlie).unwrap();
        state.pass(david).unwrap();
        for (_, rx) in members.iter_mut() {
            drain_types(rx);
        }

        state.play(alice, &[0, 1]).unwrap();
        for (_, rx) in members.iter_mut() {
            assert_eq!(drain_types(rx), vec!["game_state", "game_end"]);
        }
        let finished = std::iter::from_fn(|| events.try_recv().ok()).any(|event| {
            event
                == HubEvent::GameFinished {
                    room_id: "R1".into(),
                    winning_team: 1,
                }
        });
        assert!(finished);
        assert_eq!(state.room_summaries()[0].status, GameStatus::Finished);

        assert!(matches!(state.ready(alice), Ok(None)));
        assert_eq!(state.room_summaries()[0].status, GameStatus::Waiting);
        assert_eq!(
            state.play(bob, &[0]),
            Err(HubError::Game(GameError::NotInProgress))
        );
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let (mut state, _events) = state();
        let (alice, _rx) = connect(&mut state, "alice", 16);
        state.join(alice, "R1").unwrap();
        state.unregister(alice);
        state.unregister(alice);
        assert_eq!(state.client_count(), 0);
        assert!(state.room_summaries().is_empty());
    }
}
