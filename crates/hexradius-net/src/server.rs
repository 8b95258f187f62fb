//! The server: socket plumbing and the session task.
//!
//! The game state is owned by a single session task. Each accepted
//! connection gets a reader task feeding decoded messages into the
//! session's event channel and a writer task draining a per-connection
//! outbound queue, so all mutation happens serially in arrival order.

use crate::codec;
use hexradius_core::{
    ActionError, GameEngine, GameSettings, Message, Outbound, Player, PlayerAction, PlayerColour,
    PlayerInfo, Scenario, ScenarioError, VisibilityFilter, ADMIN_ID,
};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Bind address, e.g. `0.0.0.0:24567`.
    pub bind: String,
    /// Directory holding scenario files.
    pub scenario_dir: PathBuf,
    /// Initial map name (file stem under the scenario directory).
    pub map_name: String,
    /// RNG seed for the authoritative sequence.
    pub seed: u64,
}

/// Errors that keep the server from starting.
#[derive(Debug)]
pub enum ServerError {
    Io(std::io::Error),
    Scenario(ScenarioError),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerError::Io(err) => write!(f, "I/O error: {}", err),
            ServerError::Scenario(err) => write!(f, "Scenario error: {}", err),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Io(err)
    }
}

impl From<ScenarioError> for ServerError {
    fn from(err: ScenarioError) -> Self {
        ServerError::Scenario(err)
    }
}

type ConnId = u64;

/// Events multiplexed into the session task.
#[derive(Debug)]
enum SessionEvent {
    Connected {
        conn: ConnId,
        out: mpsc::UnboundedSender<Message>,
    },
    Inbound {
        conn: ConnId,
        msg: Message,
    },
    Disconnected {
        conn: ConnId,
        reason: String,
    },
}

/// Run the server until the process is stopped.
pub async fn run(config: ServerConfig) -> Result<(), ServerError> {
    let scenario = Scenario::load(scenario_path(&config.scenario_dir, &config.map_name)?)?;
    let listener = TcpListener::bind(&config.bind).await?;
    log::info!(
        "listening on {} with map '{}'",
        listener.local_addr()?,
        scenario.name
    );

    let (tx, rx) = mpsc::channel(256);
    tokio::spawn(accept_loop(listener, tx));

    let mut session = Session::new(scenario, config);
    session.run(rx).await;
    Ok(())
}

fn scenario_path(dir: &std::path::Path, name: &str) -> Result<PathBuf, ServerError> {
    // Map names come from clients; never let them escape the directory
    if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
        return Err(ServerError::Scenario(ScenarioError::Io(format!(
            "illegal map name '{}'",
            name
        ))));
    }
    Ok(dir.join(format!("{}.txt", name)))
}

async fn accept_loop(listener: TcpListener, tx: mpsc::Sender<SessionEvent>) {
    let mut next_conn: ConnId = 1;
    while let Ok((socket, addr)) = listener.accept().await {
        let conn = next_conn;
        next_conn += 1;
        log::info!("connection {} accepted from {}", conn, addr);

        let (read_half, write_half) = socket.into_split();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        if tx
            .send(SessionEvent::Connected { conn, out: out_tx })
            .await
            .is_err()
        {
            return;
        }
        tokio::spawn(connection_writer(write_half, out_rx));
        tokio::spawn(connection_reader(conn, read_half, tx.clone()));
    }
}

async fn connection_reader(
    conn: ConnId,
    mut read_half: tokio::net::tcp::OwnedReadHalf,
    tx: mpsc::Sender<SessionEvent>,
) {
    loop {
        match codec::read_frame(&mut read_half).await {
            Ok(msg) => {
                if tx.send(SessionEvent::Inbound { conn, msg }).await.is_err() {
                    return;
                }
            }
            Err(err) => {
                let _ = tx
                    .send(SessionEvent::Disconnected {
                        conn,
                        reason: err.to_string(),
                    })
                    .await;
                return;
            }
        }
    }
}

async fn connection_writer(
    mut write_half: tokio::net::tcp::OwnedWriteHalf,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        if let Err(err) = codec::write_frame(&mut write_half, &msg).await {
            log::debug!("write failed: {}", err);
            return;
        }
    }
}

struct ClientSlot {
    out: mpsc::UnboundedSender<Message>,
    player_id: Option<u16>,
}

/// The single task owning all session state.
struct Session {
    scenario: Scenario,
    scenario_dir: PathBuf,
    settings: GameSettings,
    seed: u64,
    clients: HashMap<ConnId, ClientSlot>,
    players: Vec<Player>,
    ai_seats: HashSet<u16>,
    next_player_id: u16,
    engine: Option<GameEngine>,
}

impl Session {
    fn new(scenario: Scenario, config: ServerConfig) -> Self {
        let settings = scenario.settings.clone();
        Self {
            scenario,
            scenario_dir: config.scenario_dir,
            settings,
            seed: config.seed,
            clients: HashMap::new(),
            players: Vec::new(),
            ai_seats: HashSet::new(),
            next_player_id: ADMIN_ID,
            engine: None,
        }
    }

    async fn run(&mut self, mut rx: mpsc::Receiver<SessionEvent>) {
        while let Some(event) = rx.recv().await {
            self.handle_event(event);
        }
    }

    fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Connected { conn, out } => {
                self.clients.insert(
                    conn,
                    ClientSlot {
                        out,
                        player_id: None,
                    },
                );
            }
            SessionEvent::Disconnected { conn, reason } => {
                log::info!("connection {} lost: {}", conn, reason);
                if let Some(slot) = self.clients.remove(&conn) {
                    if let Some(player_id) = slot.player_id {
                        self.depart(player_id, &reason);
                    }
                }
            }
            SessionEvent::Inbound { conn, msg } => self.handle_message(conn, msg),
        }
    }

    fn handle_message(&mut self, conn: ConnId, msg: Message) {
        match msg {
            Message::Init { player_name } => self.handle_init(conn, player_name),
            Message::ChangeColour { player_id, colour } => {
                self.handle_change_colour(conn, player_id, colour)
            }
            Message::ChangeSetting {
                fog_of_war,
                king_of_the_hill,
            } => self.handle_change_setting(conn, fog_of_war, king_of_the_hill),
            Message::ChangeMap { map_name } => self.handle_change_map(conn, map_name),
            Message::AddAi { name } => self.handle_add_ai(conn, name),
            Message::Kick {
                player_id,
                quit_msg,
            } => self.handle_kick(conn, player_id, quit_msg),
            Message::Begin { .. } => self.handle_begin(conn),
            Message::Move { from, to, .. } => {
                self.handle_action(conn, PlayerAction::Move { from, to })
            }
            Message::Use {
                at,
                power,
                power_direction,
                target,
                ..
            } => self.handle_action(
                conn,
                PlayerAction::Use {
                    at,
                    power,
                    direction: power_direction,
                    target,
                },
            ),
            Message::Resign => self.handle_action(conn, PlayerAction::Resign),
            other => {
                log::debug!("ignoring {} from connection {}", other.tag(), conn);
            }
        }
    }

    // --------------------------------------------------------------
    // Lobby
    // --------------------------------------------------------------

    fn handle_init(&mut self, conn: ConnId, player_name: String) {
        if player_name.is_empty() {
            self.drop_client(conn, "no player name supplied");
            return;
        }
        if self.slot_player(conn).is_some() {
            self.drop_client(conn, "duplicate INIT");
            return;
        }
        if self.players.len() >= self.settings.max_players as usize {
            self.drop_client(conn, "server is full");
            return;
        }

        let colour = self.pick_colour();
        let player_id = self.next_player_id;
        self.next_player_id += 1;
        let player = Player::new(player_id, player_name, colour);
        self.players.push(player.clone());
        if let Some(slot) = self.clients.get_mut(&conn) {
            slot.player_id = Some(player_id);
        }

        self.send_to_conn(
            conn,
            Message::GameInfo {
                player_id,
                players: self.player_infos(),
                map_name: self.scenario.name.clone(),
                fog_of_war: self.settings.fog_of_war,
                king_of_the_hill: self.settings.king_of_the_hill,
            },
        );
        self.broadcast_except(
            conn,
            Message::PlayerJoined {
                player: PlayerInfo::from(&player),
            },
        );
    }

    /// First free colour the scenario admits, spectator when all taken.
    fn pick_colour(&self) -> PlayerColour {
        let taken: HashSet<PlayerColour> = self.players.iter().map(|p| p.colour).collect();
        self.scenario
            .colours()
            .into_iter()
            .find(|c| !taken.contains(c))
            .unwrap_or(PlayerColour::Spectate)
    }

    fn handle_change_colour(&mut self, conn: ConnId, player_id: u16, colour: PlayerColour) {
        let sender = match self.slot_player(conn) {
            Some(id) => id,
            None => return,
        };
        if self.engine.is_some() || (sender != player_id && sender != ADMIN_ID) {
            self.send_to_conn(conn, Message::BadMove);
            return;
        }
        if let Some(player) = self.players.iter_mut().find(|p| p.id == player_id) {
            player.colour = colour;
            self.broadcast(Message::ChangeColour { player_id, colour });
        }
    }

    fn handle_change_setting(
        &mut self,
        conn: ConnId,
        fog_of_war: Option<bool>,
        king_of_the_hill: Option<bool>,
    ) {
        if !self.sender_is_admin(conn) || self.engine.is_some() {
            self.send_to_conn(conn, Message::BadMove);
            return;
        }
        let has_hills = self.scenario.board.tiles.values().any(|t| t.hill);
        if king_of_the_hill == Some(false) && has_hills {
            // The map's hill tiles only make sense in KOTH mode
            self.send_to_conn(conn, Message::BadMove);
            return;
        }
        if let Some(fog) = fog_of_war {
            self.settings.fog_of_war = fog;
        }
        if let Some(koth) = king_of_the_hill {
            self.settings.king_of_the_hill = koth;
        }
        self.broadcast(Message::ChangeSetting {
            fog_of_war,
            king_of_the_hill,
        });
    }

    fn handle_change_map(&mut self, conn: ConnId, map_name: String) {
        if !self.sender_is_admin(conn) || self.engine.is_some() {
            self.send_to_conn(conn, Message::BadMove);
            return;
        }
        let path = match scenario_path(&self.scenario_dir, &map_name) {
            Ok(path) => path,
            Err(err) => {
                log::warn!("rejected map name '{}': {}", map_name, err);
                self.send_to_conn(conn, Message::BadMove);
                return;
            }
        };
        match Scenario::load(path) {
            Ok(scenario) => {
                self.settings = scenario.settings.clone();
                self.scenario = scenario;
                self.broadcast(Message::ChangeMap { map_name });
            }
            Err(err) => {
                log::warn!("could not load map '{}': {}", map_name, err);
                self.send_to_conn(conn, Message::BadMove);
            }
        }
    }

    fn handle_add_ai(&mut self, conn: ConnId, name: String) {
        if !self.sender_is_admin(conn) || self.engine.is_some() {
            self.send_to_conn(conn, Message::BadMove);
            return;
        }
        if self.players.len() >= self.settings.max_players as usize {
            self.send_to_conn(conn, Message::BadMove);
            return;
        }
        let colour = self.pick_colour();
        let player_id = self.next_player_id;
        self.next_player_id += 1;
        let name = if name.is_empty() {
            format!("Computer {}", player_id)
        } else {
            name
        };
        let player = Player::new(player_id, name, colour);
        self.players.push(player.clone());
        self.ai_seats.insert(player_id);
        self.broadcast(Message::PlayerJoined {
            player: PlayerInfo::from(&player),
        });
        self.send_to_conn(conn, Message::Ok);
    }

    fn handle_kick(&mut self, conn: ConnId, player_id: u16, quit_msg: String) {
        if !self.sender_is_admin(conn) || player_id == ADMIN_ID {
            self.send_to_conn(conn, Message::BadMove);
            return;
        }
        let target_conn = self
            .clients
            .iter()
            .find(|(_, slot)| slot.player_id == Some(player_id))
            .map(|(conn, _)| *conn);
        if let Some(target) = target_conn {
            self.send_to_conn(
                target,
                Message::Quit {
                    quit_msg: quit_msg.clone(),
                },
            );
            self.clients.remove(&target);
        } else if !self.ai_seats.remove(&player_id) {
            self.send_to_conn(conn, Message::BadMove);
            return;
        }
        self.depart(player_id, &quit_msg);
    }

    fn handle_begin(&mut self, conn: ConnId) {
        if !self.sender_is_admin(conn) || self.engine.is_some() {
            self.send_to_conn(conn, Message::BadMove);
            return;
        }
        let playing: HashSet<PlayerColour> = self
            .players
            .iter()
            .filter(|p| p.colour.is_playing())
            .map(|p| p.colour)
            .collect();
        if playing.len() < 2 {
            self.send_to_conn(conn, Message::BadMove);
            return;
        }

        let mut scenario = self.scenario.clone();
        scenario.settings = self.settings.clone();
        let mut engine = GameEngine::new(&scenario, self.players.clone(), self.seed);
        let out = engine.begin();
        self.engine = Some(engine);
        self.route(out);
        self.drive_ai();
    }

    // --------------------------------------------------------------
    // In-game
    // --------------------------------------------------------------

    fn handle_action(&mut self, conn: ConnId, action: PlayerAction) {
        let player_id = match self.slot_player(conn) {
            Some(id) => id,
            None => {
                self.drop_client(conn, "action before INIT");
                return;
            }
        };
        let engine = match self.engine.as_mut() {
            Some(engine) => engine,
            None => {
                self.send_to_conn(conn, Message::BadMove);
                return;
            }
        };

        let was_use = matches!(action, PlayerAction::Use { .. });
        match engine.handle_action(player_id, action) {
            Ok(out) => {
                self.route(out);
                if was_use {
                    self.send_to_conn(conn, Message::Ok);
                }
                self.after_engine_step();
            }
            Err(ActionError::Fatal(err)) => {
                log::error!("fatal engine error: {}", err);
                self.broadcast(Message::GameOver { winner: None });
                self.engine = None;
            }
            Err(err) => {
                log::debug!("rejected action from player {}: {}", player_id, err);
                self.send_to_conn(conn, Message::BadMove);
            }
        }
    }

    /// A player left or was removed; forfeit their pawns.
    fn depart(&mut self, player_id: u16, reason: &str) {
        self.players.retain(|p| p.id != player_id);
        self.ai_seats.remove(&player_id);
        if let Some(engine) = self.engine.as_mut() {
            let out = engine.resign(player_id, reason, true);
            self.route(out);
            self.after_engine_step();
        } else {
            self.broadcast(Message::PlayerQuit {
                player_id,
                quit_msg: reason.to_string(),
            });
        }
    }

    /// Post-action bookkeeping: return to lobby after GOVER and let AI
    /// seats take their turns.
    fn after_engine_step(&mut self) {
        if self.engine.as_ref().map(|e| e.is_over()).unwrap_or(false) {
            self.engine = None;
            return;
        }
        self.drive_ai();
    }

    /// Run AI turns until a human is up or the game ends.
    fn drive_ai(&mut self) {
        loop {
            let Some(engine) = self.engine.as_mut() else { return };
            let Some(current) = engine.current_player() else { return };
            if !self.ai_seats.contains(&current) {
                return;
            }

            let out = match engine.ai_action(current) {
                Some(action) => match engine.handle_action(current, action) {
                    Ok(out) => out,
                    Err(err) => {
                        log::warn!("AI seat {} failed to act: {}", current, err);
                        engine.resign(current, "no legal move", true)
                    }
                },
                None => engine.resign(current, "no legal move", true),
            };
            self.route(out);
            if self.engine.as_ref().map(|e| e.is_over()).unwrap_or(true) {
                self.engine = None;
                return;
            }
        }
    }

    // --------------------------------------------------------------
    // Outbound plumbing
    // --------------------------------------------------------------

    fn route(&mut self, out: Vec<Outbound>) {
        for item in out {
            match item {
                Outbound::All(msg) => self.broadcast(msg),
                Outbound::Filtered(msg) => self.broadcast_filtered(msg),
            }
        }
    }

    fn broadcast(&self, msg: Message) {
        for slot in self.clients.values() {
            let _ = slot.out.send(msg.clone());
        }
    }

    fn broadcast_except(&self, skip: ConnId, msg: Message) {
        for (conn, slot) in &self.clients {
            if *conn != skip {
                let _ = slot.out.send(msg.clone());
            }
        }
    }

    /// Broadcast with per-client visibility filtering.
    fn broadcast_filtered(&self, msg: Message) {
        let Some(engine) = self.engine.as_ref() else {
            self.broadcast(msg);
            return;
        };
        for slot in self.clients.values() {
            let colour = slot
                .player_id
                .and_then(|id| self.players.iter().find(|p| p.id == id))
                .map(|p| p.colour)
                .unwrap_or(PlayerColour::Spectate);
            let filter = VisibilityFilter::compute(engine.state(), colour);
            let _ = slot.out.send(filter.filter_message(&msg));
        }
    }

    fn send_to_conn(&self, conn: ConnId, msg: Message) {
        if let Some(slot) = self.clients.get(&conn) {
            let _ = slot.out.send(msg);
        }
    }

    /// Disconnect a misbehaving client.
    fn drop_client(&mut self, conn: ConnId, reason: &str) {
        log::warn!("dropping connection {}: {}", conn, reason);
        self.send_to_conn(
            conn,
            Message::Quit {
                quit_msg: reason.to_string(),
            },
        );
        if let Some(slot) = self.clients.remove(&conn) {
            if let Some(player_id) = slot.player_id {
                self.depart(player_id, reason);
            }
        }
    }

    fn slot_player(&self, conn: ConnId) -> Option<u16> {
        self.clients.get(&conn).and_then(|slot| slot.player_id)
    }

    fn sender_is_admin(&self, conn: ConnId) -> bool {
        self.slot_player(conn) == Some(ADMIN_ID)
    }

    fn player_infos(&self) -> Vec<PlayerInfo> {
        self.players.iter().map(PlayerInfo::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexradius_core::HexCoord;

    const MAP: &str = "\
GRID 4 4
TILE 0 0 0
TILE 1 0 0
TILE 2 0 0
TILE 3 0 0
TILE 0 1 0
TILE 1 1 0
TILE 2 1 0
TILE 3 1 0
TILE 0 2 0
TILE 1 2 0
TILE 2 2 0
TILE 3 2 0
TILE 0 3 0
TILE 1 3 0
TILE 2 3 0
TILE 3 3 0
SPAWN 0 0 red
SPAWN 0 3 blue
";

    struct Harness {
        session: Session,
        rxs: HashMap<ConnId, mpsc::UnboundedReceiver<Message>>,
    }

    impl Harness {
        fn new() -> Self {
            let scenario = Scenario::parse("testmap", MAP).unwrap();
            let config = ServerConfig {
                bind: String::new(),
                scenario_dir: PathBuf::from("scenario"),
                map_name: "testmap".to_string(),
                seed: 21,
            };
            Self {
                session: Session::new(scenario, config),
                rxs: HashMap::new(),
            }
        }

        fn connect(&mut self, conn: ConnId) {
            let (tx, rx) = mpsc::unbounded_channel();
            self.session
                .handle_event(SessionEvent::Connected { conn, out: tx });
            self.rxs.insert(conn, rx);
        }

        fn send(&mut self, conn: ConnId, msg: Message) {
            self.session.handle_event(SessionEvent::Inbound { conn, msg });
        }

        fn drain(&mut self, conn: ConnId) -> Vec<Message> {
            let mut out = Vec::new();
            if let Some(rx) = self.rxs.get_mut(&conn) {
                while let Ok(msg) = rx.try_recv() {
                    out.push(msg);
                }
            }
            out
        }

        fn join(&mut self, conn: ConnId, name: &str) {
            self.connect(conn);
            self.send(
                conn,
                Message::Init {
                    player_name: name.to_string(),
                },
            );
        }
    }

    #[test]
    fn test_lobby_join_assigns_ids_and_colours() {
        let mut h = Harness::new();
        h.join(1, "alice");
        h.join(2, "bob");

        let alice_msgs = h.drain(1);
        match &alice_msgs[0] {
            Message::GameInfo {
                player_id, players, ..
            } => {
                assert_eq!(*player_id, ADMIN_ID);
                assert_eq!(players.len(), 1);
                assert_eq!(players[0].colour, PlayerColour::Red);
            }
            other => panic!("expected GINFO, got {}", other.tag()),
        }
        // Alice also saw bob join
        assert!(alice_msgs
            .iter()
            .any(|m| matches!(m, Message::PlayerJoined { .. })));

        let bob_msgs = h.drain(2);
        match &bob_msgs[0] {
            Message::GameInfo {
                player_id, players, ..
            } => {
                assert_eq!(*player_id, 2);
                assert_eq!(players.len(), 2);
            }
            other => panic!("expected GINFO, got {}", other.tag()),
        }
    }

    #[test]
    fn test_non_admin_lobby_commands_rejected() {
        let mut h = Harness::new();
        h.join(1, "alice");
        h.join(2, "bob");
        h.drain(1);
        h.drain(2);

        h.send(
            2,
            Message::ChangeSetting {
                fog_of_war: Some(true),
                king_of_the_hill: None,
            },
        );
        assert!(h.drain(2).iter().any(|m| matches!(m, Message::BadMove)));
        assert!(!h.session.settings.fog_of_war);

        h.send(
            2,
            Message::AddAi {
                name: "robot".to_string(),
            },
        );
        assert!(h.drain(2).iter().any(|m| matches!(m, Message::BadMove)));
    }

    #[test]
    fn test_admin_changes_settings() {
        let mut h = Harness::new();
        h.join(1, "alice");
        h.drain(1);

        h.send(
            1,
            Message::ChangeSetting {
                fog_of_war: Some(true),
                king_of_the_hill: None,
            },
        );
        assert!(h.session.settings.fog_of_war);
        assert!(h
            .drain(1)
            .iter()
            .any(|m| matches!(m, Message::ChangeSetting { .. })));
    }

    #[test]
    fn test_begin_requires_two_teams() {
        let mut h = Harness::new();
        h.join(1, "alice");
        h.drain(1);

        h.send(1, Message::Begin {
            cols: 0,
            rows: 0,
            tiles: vec![],
            players: vec![],
            colour: PlayerColour::Spectate,
        });
        assert!(h.drain(1).iter().any(|m| matches!(m, Message::BadMove)));
        assert!(h.session.engine.is_none());
    }

    #[test]
    fn test_begin_starts_game_and_first_turn() {
        let mut h = Harness::new();
        h.join(1, "alice");
        h.join(2, "bob");
        h.drain(1);
        h.drain(2);

        h.send(1, Message::Begin {
            cols: 0,
            rows: 0,
            tiles: vec![],
            players: vec![],
            colour: PlayerColour::Spectate,
        });
        assert!(h.session.engine.is_some());

        let msgs = h.drain(2);
        assert!(msgs.iter().any(|m| matches!(m, Message::Begin { .. })));
        assert!(msgs
            .iter()
            .any(|m| matches!(m, Message::Turn { player_id: 1 })));
    }

    #[test]
    fn test_game_flow_move_and_badmove() {
        let mut h = Harness::new();
        h.join(1, "alice");
        h.join(2, "bob");
        h.send(1, Message::Begin {
            cols: 0,
            rows: 0,
            tiles: vec![],
            players: vec![],
            colour: PlayerColour::Spectate,
        });
        h.drain(1);
        h.drain(2);

        // Bob tries to act out of turn
        h.send(
            2,
            Message::Move {
                from: HexCoord::new(0, 3),
                to: HexCoord::new(0, 2),
                power_rand_vals: vec![],
            },
        );
        assert!(h.drain(2).iter().any(|m| matches!(m, Message::BadMove)));

        // Alice moves legally; everyone gets the echo and a TURN
        h.send(
            1,
            Message::Move {
                from: HexCoord::new(0, 0),
                to: HexCoord::new(0, 1),
                power_rand_vals: vec![],
            },
        );
        let bob_msgs = h.drain(2);
        assert!(bob_msgs.iter().any(|m| matches!(m, Message::Move { .. })));
        assert!(bob_msgs
            .iter()
            .any(|m| matches!(m, Message::Turn { player_id: 2 })));
    }

    #[test]
    fn test_disconnect_mid_game_resigns() {
        let mut h = Harness::new();
        h.join(1, "alice");
        h.join(2, "bob");
        h.send(1, Message::Begin {
            cols: 0,
            rows: 0,
            tiles: vec![],
            players: vec![],
            colour: PlayerColour::Spectate,
        });
        h.drain(1);
        h.drain(2);

        h.session.handle_event(SessionEvent::Disconnected {
            conn: 2,
            reason: "read error".to_string(),
        });

        let msgs = h.drain(1);
        assert!(msgs
            .iter()
            .any(|m| matches!(m, Message::PlayerQuit { player_id: 2, .. })));
        assert!(msgs.iter().any(|m| matches!(m, Message::Destroy { .. })));
        assert!(msgs.iter().any(|m| matches!(
            m,
            Message::GameOver {
                winner: Some(PlayerColour::Red)
            }
        )));
        // Back in the lobby after GOVER
        assert!(h.session.engine.is_none());
    }

    #[test]
    fn test_ai_seat_plays_its_turn() {
        let mut h = Harness::new();
        h.join(1, "alice");
        h.send(
            1,
            Message::AddAi {
                name: "robot".to_string(),
            },
        );
        h.send(1, Message::Begin {
            cols: 0,
            rows: 0,
            tiles: vec![],
            players: vec![],
            colour: PlayerColour::Spectate,
        });
        h.drain(1);

        // Alice moves; the AI should answer immediately and hand the turn
        // back to her
        h.send(
            1,
            Message::Move {
                from: HexCoord::new(0, 0),
                to: HexCoord::new(0, 1),
                power_rand_vals: vec![],
            },
        );
        let msgs = h.drain(1);
        let turns: Vec<u16> = msgs
            .iter()
            .filter_map(|m| match m {
                Message::Turn { player_id } => Some(*player_id),
                _ => None,
            })
            .collect();
        assert_eq!(turns, vec![2, 1]);
    }

    #[test]
    fn test_fog_update_is_filtered_per_client() {
        let mut h = Harness::new();
        h.join(1, "alice");
        h.join(2, "bob");
        h.send(
            1,
            Message::ChangeSetting {
                fog_of_war: Some(true),
                king_of_the_hill: None,
            },
        );
        h.send(1, Message::Begin {
            cols: 0,
            rows: 0,
            tiles: vec![],
            players: vec![],
            colour: PlayerColour::Spectate,
        });

        // Each client's BEGIN shows its own pawn but not the far enemy
        let alice_begin = h
            .drain(1)
            .into_iter()
            .find_map(|m| match m {
                Message::Begin { tiles, colour, .. } => Some((tiles, colour)),
                _ => None,
            })
            .expect("alice got BEGIN");
        assert_eq!(alice_begin.1, PlayerColour::Red);
        assert!(alice_begin
            .0
            .iter()
            .all(|t| t.coord.distance(&HexCoord::new(0, 0)) <= 1));
    }
}
