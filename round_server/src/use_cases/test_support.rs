use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::{MapError, StatsError};
use crate::domain::ports::{Clock, MapRegistry, StatsSink, StatsStore};
use crate::domain::tuning::RoundTuning;
use crate::domain::{
    Arena, Block, FloorLayer, OnlinePlayer, PlayerId, PlayerStats, Position, Rank, RoundState,
    Spawn,
};
use crate::use_cases::world::{RoundContext, RoundWorld};

pub(crate) const DESERT: &str = "desert";
pub(crate) const WAITING: &str = "waiting";
pub(crate) const DESERT_DEATH_HEIGHT: i32 = 40;
pub(crate) const DESERT_START_MS: u64 = 1_700_000_000_000;

// Position of someone standing on the desert's sand floor.
pub(crate) fn on_desert_floor(x: f64, z: f64) -> Position {
    Position::new(x, 65.0, z)
}

#[derive(Clone)]
pub(crate) struct FakeMap {
    pub spawn: Option<Spawn>,
    pub death_height: i32,
    pub layers: Vec<FloorLayer>,
    pub loadable: bool,
}

// In-memory map registry with a configurable pool.
#[derive(Clone, Default)]
pub(crate) struct FakeMapRegistry {
    names: Vec<String>,
    maps: HashMap<String, FakeMap>,
    waiting: Option<String>,
}

impl FakeMapRegistry {
    pub(crate) fn empty() -> Self {
        Self::default()
    }

    // One desert game map plus a waiting map.
    pub(crate) fn desert() -> Self {
        Self::empty()
            .with_map(
                DESERT,
                FakeMap {
                    spawn: Some(Spawn {
                        x: 0,
                        y: 65,
                        z: 0,
                        yaw: 0.0,
                        pitch: 0.0,
                    }),
                    death_height: DESERT_DEATH_HEIGHT,
                    layers: vec![
                        FloorLayer {
                            y: 64,
                            block: Block::Sand,
                            from: [-8, -8],
                            to: [8, 8],
                        },
                        FloorLayer {
                            y: 63,
                            block: Block::Tnt,
                            from: [-8, -8],
                            to: [8, 8],
                        },
                    ],
                    loadable: true,
                },
            )
            .with_waiting_map(WAITING)
    }

    pub(crate) fn with_map(mut self, name: &str, map: FakeMap) -> Self {
        self.names.push(name.to_string());
        self.maps.insert(name.to_string(), map);
        self
    }

    pub(crate) fn with_waiting_map(mut self, name: &str) -> Self {
        self.waiting = Some(name.to_string());
        self
    }

    pub(crate) fn edit(mut self, name: &str, edit: impl FnOnce(&mut FakeMap)) -> Self {
        if let Some(map) = self.maps.get_mut(name) {
            edit(map);
        }
        self
    }
}

impl MapRegistry for FakeMapRegistry {
    fn list_maps(&self) -> Vec<String> {
        self.names.clone()
    }

    fn waiting_map(&self) -> Option<String> {
        self.waiting.clone()
    }

    fn load_map(&self, name: &str) -> Result<Arena, MapError> {
        match self.maps.get(name) {
            Some(map) if map.loadable => Ok(Arena::from_layers(name, &map.layers)),
            Some(_) => Err(MapError::Unloadable {
                name: name.to_string(),
                reason: "world folder missing".to_string(),
            }),
            None if name == WAITING => Ok(Arena::new(name)),
            None => Err(MapError::NotFound(name.to_string())),
        }
    }

    fn spawn_point(&self, name: &str) -> Option<Spawn> {
        if name == WAITING {
            return Some(Spawn {
                x: 100,
                y: 70,
                z: 100,
                yaw: 0.0,
                pitch: 0.0,
            });
        }
        self.maps.get(name).and_then(|map| map.spawn)
    }

    fn death_height(&self, name: &str) -> i32 {
        self.maps.get(name).map_or(0, |map| map.death_height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatsCall {
    Win(PlayerId),
    Loss(PlayerId),
    BestSurvival(PlayerId, u64),
}

// Statistics sink that records every fire-and-forget call.
#[derive(Clone, Default)]
pub(crate) struct RecordingStats {
    calls: Arc<Mutex<Vec<StatsCall>>>,
}

impl RecordingStats {
    pub(crate) fn calls(&self) -> Vec<StatsCall> {
        self.calls.lock().expect("stats mutex poisoned").clone()
    }

    fn push(&self, call: StatsCall) {
        self.calls.lock().expect("stats mutex poisoned").push(call);
    }
}

impl StatsSink for RecordingStats {
    fn record_win(&self, player_id: PlayerId) {
        self.push(StatsCall::Win(player_id));
    }

    fn record_loss(&self, player_id: PlayerId) {
        self.push(StatsCall::Loss(player_id));
    }

    fn update_best_survival_time(&self, player_id: PlayerId, survival_ms: u64) {
        self.push(StatsCall::BestSurvival(player_id, survival_ms));
    }
}

// Shared, manually advanced time source for deterministic survival times.
#[derive(Default)]
pub(crate) struct ManualClock(AtomicU64);

impl ManualClock {
    pub(crate) fn at(now_ms: u64) -> Self {
        Self(AtomicU64::new(now_ms))
    }

    pub(crate) fn advance(&self, millis: u64) {
        self.0.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_epoch_millis(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Copy, Default)]
pub(crate) struct FailureFlags {
    pub writes: bool,
    pub reads: bool,
}

// Statistics store fake that keeps rows in memory and can simulate backend outages.
#[derive(Clone, Default)]
pub(crate) struct RecordingStore {
    rows: Arc<Mutex<HashMap<PlayerId, PlayerStats>>>,
    failures: FailureFlags,
}

impl RecordingStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_failures(mut self, failures: FailureFlags) -> Self {
        self.failures = failures;
        self
    }

    pub(crate) fn row(&self, player_id: PlayerId) -> Option<PlayerStats> {
        let guard = self.rows.lock().expect("rows mutex poisoned");
        guard.get(&player_id).copied()
    }

    fn write(&self, player_id: PlayerId, update: impl FnOnce(&mut PlayerStats)) -> Result<(), StatsError> {
        if self.failures.writes {
            return Err(StatsError::Backend("write failed".to_string()));
        }
        let mut guard = self.rows.lock().expect("rows mutex poisoned");
        update(guard.entry(player_id).or_default());
        Ok(())
    }
}

#[async_trait]
impl StatsStore for RecordingStore {
    async fn record_win(&self, player_id: PlayerId) -> Result<(), StatsError> {
        self.write(player_id, |row| row.wins += 1)
    }

    async fn record_loss(&self, player_id: PlayerId) -> Result<(), StatsError> {
        self.write(player_id, |row| row.losses += 1)
    }

    async fn update_best_survival_time(
        &self,
        player_id: PlayerId,
        survival_ms: u64,
    ) -> Result<(), StatsError> {
        self.write(player_id, |row| {
            row.best_survival_ms = row.best_survival_ms.max(survival_ms)
        })
    }

    async fn fetch_stats(&self, player_id: PlayerId) -> Result<Option<PlayerStats>, StatsError> {
        if self.failures.reads {
            return Err(StatsError::Backend("read failed".to_string()));
        }
        Ok(self.row(player_id))
    }

    async fn fetch_rank(&self, _player_id: PlayerId) -> Result<Rank, StatsError> {
        if self.failures.reads {
            return Err(StatsError::Backend("read failed".to_string()));
        }
        Ok(Rank::Unranked)
    }
}

// Owns everything a `RoundContext` borrows so components can be tested in isolation.
pub(crate) struct Harness {
    pub state: RoundState,
    pub world: RoundWorld,
    pub maps: FakeMapRegistry,
    pub stats: RecordingStats,
    pub clock: ManualClock,
    pub tuning: RoundTuning,
}

impl Harness {
    pub(crate) fn new(maps: FakeMapRegistry) -> Self {
        Self {
            state: RoundState::default(),
            world: RoundWorld::default(),
            maps,
            stats: RecordingStats::default(),
            clock: ManualClock::at(DESERT_START_MS),
            tuning: RoundTuning::default(),
        }
    }

    pub(crate) fn ctx(&mut self) -> RoundContext<'_> {
        RoundContext {
            state: &mut self.state,
            world: &mut self.world,
            maps: &self.maps,
            stats: &self.stats,
            clock: &self.clock,
            tuning: &self.tuning,
        }
    }

    pub(crate) fn add_player(&mut self, name: &str) -> PlayerId {
        let id = Uuid::new_v4();
        self.world
            .players
            .insert(id, OnlinePlayer::new(id, name.to_string()));
        id
    }

    pub(crate) fn place(&mut self, player_id: PlayerId, map_name: &str, position: Position) {
        if let Some(player) = self.world.players.get_mut(&player_id) {
            player.map_name = map_name.to_string();
            player.position = position;
            player.grounded = true;
        }
    }
}
