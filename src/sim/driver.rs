//! Fixed timestep simulation driver
//!
//! One step is: physics step → collect collision starts → resolve merges →
//! apply merges → drain spawn requests → publish snapshot. Nothing mutates the
//! world while pairs are being scanned, and spawns never land mid-merge.

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::physics::{BodyId, BodyShape, BodySpec, PhysicsAdapter};
use super::registry::BodyRegistry;
use super::resolver::{SkipCounts, resolve};
use super::spawn::{SpawnController, SpawnRequest};
use super::tier::TierCatalog;
use super::world::CircleWorld;
use crate::error::MergeResult;
use crate::settings::Settings;

/// Something that happened during a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    Spawned {
        id: BodyId,
        tier: usize,
        position: Vec2,
    },
    Merged {
        a: BodyId,
        b: BodyId,
        into: BodyId,
        tier: usize,
        position: Vec2,
    },
    SpawnRejected {
        request: SpawnRequest,
        reason: String,
    },
}

/// Outcome of one fixed step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    /// 1-based step number
    pub step: u64,
    pub events: Vec<SimEvent>,
    pub skipped: SkipCounts,
    /// Requests still waiting after this step's drain
    pub pending_spawns: usize,
}

impl StepReport {
    pub fn merge_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SimEvent::Merged { .. }))
            .count()
    }

    pub fn spawn_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SimEvent::Spawned { .. }))
            .count()
    }
}

/// Read-only view of one live body for rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodySnapshot {
    pub id: BodyId,
    pub tier: usize,
    pub position: Vec2,
    pub visual: String,
}

/// Cloneable handle for producers on other threads (timers, input).
///
/// Requests are only picked up at the spawn drain point of the next step.
#[derive(Debug, Clone)]
pub struct SpawnSender(Sender<SpawnRequest>);

impl SpawnSender {
    /// Returns `false` once the simulation has been dropped
    pub fn send(&self, request: SpawnRequest) -> bool {
        self.0.send(request).is_ok()
    }
}

/// The gameplay loop around a physics adapter
pub struct Simulation<P: PhysicsAdapter = CircleWorld> {
    settings: Settings,
    catalog: TierCatalog,
    registry: BodyRegistry,
    spawner: SpawnController,
    physics: P,
    pending: VecDeque<SpawnRequest>,
    inbox: Receiver<SpawnRequest>,
    outbox: Sender<SpawnRequest>,
    walls: Vec<BodyId>,
    step_count: u64,
    accumulator: f32,
    snapshot: Vec<BodySnapshot>,
}

impl Simulation<CircleWorld> {
    /// Simulation on the built-in physics world
    pub fn new(settings: Settings, catalog: TierCatalog) -> MergeResult<Self> {
        let physics = CircleWorld::from_settings(&settings);
        Self::with_physics(settings, catalog, physics)
    }
}

impl<P: PhysicsAdapter> Simulation<P> {
    /// Simulation on any adapter. Walls are added here when enabled.
    pub fn with_physics(settings: Settings, catalog: TierCatalog, physics: P) -> MergeResult<Self> {
        settings.validate()?;
        let (outbox, inbox) = mpsc::channel();

        let mut sim = Self {
            spawner: SpawnController::from_settings(&settings),
            settings,
            catalog,
            registry: BodyRegistry::new(),
            physics,
            pending: VecDeque::new(),
            inbox,
            outbox,
            walls: Vec::new(),
            step_count: 0,
            accumulator: 0.0,
            snapshot: Vec::new(),
        };

        if sim.settings.walls {
            sim.build_walls();
        }

        log::info!(
            "Simulation ready: {} tiers, seed {}, {} walls",
            sim.catalog.tier_count(),
            sim.settings.seed,
            sim.walls.len()
        );
        Ok(sim)
    }

    /// Left, right and bottom walls just outside the play area
    fn build_walls(&mut self) {
        let area = self.settings.play_area;
        let t = self.settings.wall_thickness;
        let center = area.center();
        let side_height = area.height() + 2.0 * t;

        let walls = [
            BodySpec::fixed(
                BodyShape::rectangle(t, side_height),
                Vec2::new(area.min.x - t / 2.0, center.y),
            ),
            BodySpec::fixed(
                BodyShape::rectangle(t, side_height),
                Vec2::new(area.max.x + t / 2.0, center.y),
            ),
            BodySpec::fixed(
                BodyShape::rectangle(area.width() + 2.0 * t, t),
                Vec2::new(center.x, area.max.y + t / 2.0),
            ),
        ];
        for spec in &walls {
            let id = self.physics.add_body(spec);
            self.walls.push(id);
        }
    }

    /// Queue a drop; it is handled at the next spawn drain point
    pub fn enqueue_spawn(&mut self, request: SpawnRequest) {
        self.pending.push_back(request);
    }

    pub fn spawn_sender(&self) -> SpawnSender {
        SpawnSender(self.outbox.clone())
    }

    /// Run as many fixed steps as `frame_dt` covers, capped at `max_substeps`.
    /// A NaN or infinite frame time counts as zero.
    pub fn advance(&mut self, frame_dt: f32) -> Vec<StepReport> {
        if !frame_dt.is_finite() {
            log::warn!("Ignoring non-finite frame time {}", frame_dt);
            return Vec::new();
        }
        let dt = self.settings.fixed_dt;
        self.accumulator += frame_dt.clamp(0.0, 0.1);

        let mut reports = Vec::new();
        let mut substeps = 0;
        while self.accumulator >= dt && substeps < self.settings.max_substeps {
            reports.push(self.step());
            self.accumulator -= dt;
            substeps += 1;
        }
        reports
    }

    /// Run exactly `n` fixed steps
    pub fn run_steps(&mut self, n: u32) -> Vec<StepReport> {
        (0..n).map(|_| self.step()).collect()
    }

    /// Advance by one fixed step
    pub fn step(&mut self) -> StepReport {
        self.step_count += 1;
        let mut report = StepReport {
            step: self.step_count,
            ..Default::default()
        };

        let pairs = self.physics.step(self.settings.fixed_dt);

        let resolution = resolve(&pairs, &self.registry, &self.catalog, &self.physics);
        report.skipped = resolution.skipped;
        if resolution.skipped.total() > 0 {
            log::trace!(
                "Step {}: {} pairs, skipped {:?}",
                self.step_count,
                pairs.len(),
                resolution.skipped
            );
        }

        // Deferred until the whole scan is done
        for merge in &resolution.plan {
            let tier = match self.catalog.tier_at(merge.tier) {
                Ok(tier) => tier,
                Err(e) => {
                    log::error!("Skipping merge of {} and {}: {}", merge.a, merge.b, e);
                    continue;
                }
            };

            self.registry.mark_dead(merge.a);
            self.registry.mark_dead(merge.b);
            self.physics.remove_body(merge.a);
            self.physics.remove_body(merge.b);

            let into = self.physics.add_body(&tier.body_spec(merge.position));
            self.registry.register(into, tier.index);

            log::debug!(
                "Merged {} + {} -> {} ({}) at ({:.1}, {:.1})",
                merge.a,
                merge.b,
                into,
                tier.name,
                merge.position.x,
                merge.position.y
            );
            report.events.push(SimEvent::Merged {
                a: merge.a,
                b: merge.b,
                into,
                tier: tier.index,
                position: merge.position,
            });
        }

        self.drain_spawns(&mut report);
        report.pending_spawns = self.pending.len();

        self.publish_snapshot();
        report
    }

    fn drain_spawns(&mut self, report: &mut StepReport) {
        while let Ok(request) = self.inbox.try_recv() {
            self.pending.push_back(request);
        }

        let budget = self
            .settings
            .max_spawns_per_step
            .unwrap_or(usize::MAX)
            .min(self.pending.len());

        for request in self.pending.drain(..budget) {
            match self.spawner.request_spawn(&self.catalog, request) {
                Ok(inst) => {
                    let Ok(tier) = self.catalog.tier_at(inst.tier) else {
                        continue;
                    };
                    let id = self.physics.add_body(&tier.body_spec(inst.position));
                    self.registry.register(id, inst.tier);
                    log::debug!(
                        "Spawned {} ({}) at ({:.1}, {:.1})",
                        id,
                        tier.name,
                        inst.position.x,
                        inst.position.y
                    );
                    report.events.push(SimEvent::Spawned {
                        id,
                        tier: inst.tier,
                        position: inst.position,
                    });
                }
                Err(e) => {
                    log::warn!("Rejected spawn at ({}, {}): {}", request.x, request.y, e);
                    report.events.push(SimEvent::SpawnRejected {
                        request,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    fn publish_snapshot(&mut self) {
        self.snapshot.clear();
        for (id, tier) in self.registry.live() {
            let Some(k) = self.physics.kinematics(id) else {
                continue;
            };
            let visual = self
                .catalog
                .tier_at(tier)
                .map(|t| t.visual.clone())
                .unwrap_or_default();
            self.snapshot.push(BodySnapshot {
                id,
                tier,
                position: k.position,
                visual,
            });
        }
    }

    /// Live bodies as of the end of the last step, ascending by id
    pub fn snapshot(&self) -> &[BodySnapshot] {
        &self.snapshot
    }

    pub fn snapshot_json(&self) -> MergeResult<String> {
        Ok(serde_json::to_string(&self.snapshot)?)
    }

    pub fn registry(&self) -> &BodyRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &TierCatalog {
        &self.catalog
    }

    pub fn physics(&self) -> &P {
        &self.physics
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn walls(&self) -> &[BodyId] {
        &self.walls
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn pending_spawns(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::physics::{CollisionPair, Kinematics};
    use crate::sim::tier::TierDef;
    use std::collections::BTreeMap;

    /// Physics double that replays scripted pair lists, one per step
    #[derive(Default)]
    struct Scripted {
        bodies: BTreeMap<BodyId, Vec2>,
        script: VecDeque<Vec<(u32, u32)>>,
        removed: Vec<BodyId>,
        next_id: u32,
    }

    impl PhysicsAdapter for Scripted {
        fn add_body(&mut self, spec: &BodySpec) -> BodyId {
            self.next_id += 1;
            let id = BodyId(self.next_id);
            self.bodies.insert(id, spec.position);
            id
        }
        fn remove_body(&mut self, id: BodyId) {
            self.bodies.remove(&id);
            self.removed.push(id);
        }
        fn step(&mut self, _dt: f32) -> Vec<CollisionPair> {
            self.script
                .pop_front()
                .unwrap_or_default()
                .into_iter()
                .map(|(a, b)| CollisionPair::new(BodyId(a), BodyId(b)))
                .collect()
        }
        fn kinematics(&self, id: BodyId) -> Option<Kinematics> {
            self.bodies.get(&id).map(|&position| Kinematics {
                position,
                velocity: Vec2::ZERO,
            })
        }
        fn body_count(&self) -> usize {
            self.bodies.len()
        }
    }

    fn scripted_sim(script: Vec<Vec<(u32, u32)>>) -> Simulation<Scripted> {
        let settings = Settings {
            walls: false,
            drop_height: None,
            ..Settings::default()
        };
        let physics = Scripted {
            script: script.into(),
            ..Default::default()
        };
        Simulation::with_physics(settings, TierCatalog::fruit(), physics).unwrap()
    }

    #[test]
    fn test_spawn_happens_after_physics_step() {
        let mut sim = scripted_sim(vec![]);
        sim.enqueue_spawn(SpawnRequest::at(100.0, 50.0));
        assert_eq!(sim.registry().live_count(), 0);

        let report = sim.step();
        assert_eq!(report.spawn_count(), 1);
        assert_eq!(sim.snapshot().len(), 1);
        assert_eq!(sim.snapshot()[0].visual, "watermelon");
    }

    #[test]
    fn test_merge_replaces_two_with_one() {
        // Bodies 1 and 2 spawn in step 1, collide in step 2
        let mut sim = scripted_sim(vec![vec![], vec![(1, 2)]]);
        sim.enqueue_spawn(SpawnRequest::at(100.0, 50.0));
        sim.enqueue_spawn(SpawnRequest::at(110.0, 70.0));
        sim.step();

        let report = sim.step();
        assert_eq!(report.merge_count(), 1);
        assert_eq!(sim.registry().live_count(), 1);
        assert_eq!(sim.registry().live_count_of(1), 1);
        assert_eq!(sim.snapshot()[0].position, Vec2::new(105.0, 60.0));
        assert_eq!(sim.physics().removed, vec![BodyId(1), BodyId(2)]);
    }

    #[test]
    fn test_late_duplicate_pair_is_ignored() {
        let mut sim = scripted_sim(vec![vec![], vec![(1, 2)], vec![(2, 1), (1, 3)]]);
        for x in [100.0, 110.0, 120.0] {
            sim.enqueue_spawn(SpawnRequest::at(x, 50.0));
        }
        sim.step();
        sim.step();

        let report = sim.step();
        assert_eq!(report.merge_count(), 0);
        assert_eq!(report.skipped.stale, 2);
        assert_eq!(sim.physics().removed.len(), 2, "no double removal");
        assert!(sim.registry().is_alive(BodyId(3)));
    }

    #[test]
    fn test_three_way_cluster_leaves_one() {
        let mut sim = scripted_sim(vec![vec![], vec![(1, 2), (2, 3), (1, 3)]]);
        for x in [100.0, 110.0, 120.0] {
            sim.enqueue_spawn(SpawnRequest::at(x, 50.0));
        }
        sim.step();
        let report = sim.step();

        assert_eq!(report.merge_count(), 1);
        assert!(sim.registry().is_alive(BodyId(3)));
        assert_eq!(sim.registry().tier_of(BodyId(3)).unwrap(), 0);
        assert_eq!(sim.registry().live_count_of(1), 1);
    }

    #[test]
    fn test_rejected_spawn_does_not_stop_the_step() {
        let mut sim = scripted_sim(vec![]);
        sim.enqueue_spawn(SpawnRequest::with_tier(10.0, 10.0, 17));
        sim.enqueue_spawn(SpawnRequest::at(10.0, 10.0));
        let report = sim.step();
        assert_eq!(report.spawn_count(), 1);
        assert!(matches!(
            report.events[0],
            SimEvent::SpawnRejected { .. }
        ));
    }

    #[test]
    fn test_spawn_cap_keeps_rest_queued() {
        let settings = Settings {
            walls: false,
            max_spawns_per_step: Some(2),
            ..Settings::default()
        };
        let mut sim =
            Simulation::with_physics(settings, TierCatalog::fruit(), Scripted::default()).unwrap();
        for i in 0..5 {
            sim.enqueue_spawn(SpawnRequest::at(20.0 * i as f32 + 20.0, 0.0));
        }
        let report = sim.step();
        assert_eq!(report.spawn_count(), 2);
        assert_eq!(report.pending_spawns, 3);
        sim.run_steps(2);
        assert_eq!(sim.registry().live_count(), 5);
        assert_eq!(sim.pending_spawns(), 0);
    }

    #[test]
    fn test_spawn_sender_from_another_thread() {
        let mut sim = scripted_sim(vec![]);
        let sender = sim.spawn_sender();
        std::thread::spawn(move || {
            for i in 0..3 {
                assert!(sender.send(SpawnRequest::at(50.0 + i as f32, 0.0)));
            }
        })
        .join()
        .unwrap();

        let report = sim.step();
        assert_eq!(report.spawn_count(), 3);
    }

    #[test]
    fn test_advance_caps_substeps() {
        let mut sim = scripted_sim(vec![]);
        let dt = sim.settings().fixed_dt;
        assert!(sim.advance(dt * 0.5).is_empty());
        assert_eq!(sim.advance(dt * 0.6).len(), 1);
        // 0.1s worth of frame time at 60 Hz is 6 steps, within the cap
        assert_eq!(sim.advance(1.0).len(), 6);
        assert_eq!(sim.step_count(), 7);
    }

    #[test]
    fn test_advance_survives_non_finite_frame_time() {
        let mut sim = scripted_sim(vec![]);
        let dt = sim.settings().fixed_dt;
        assert!(sim.advance(dt * 0.5).is_empty());
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            assert!(sim.advance(bad).is_empty());
        }
        assert_eq!(sim.advance(1.0).len(), 6);
        assert_eq!(sim.step_count(), 6);
    }

    #[test]
    fn test_non_finite_spawn_is_rejected() {
        let mut sim = scripted_sim(vec![]);
        sim.enqueue_spawn(SpawnRequest::at(f32::NAN, 0.0));
        sim.enqueue_spawn(SpawnRequest::at(300.0, 0.0));
        let report = sim.step();

        assert_eq!(report.spawn_count(), 1);
        assert!(matches!(
            report.events[0],
            SimEvent::SpawnRejected { .. }
        ));
        assert_eq!(sim.physics().body_count(), 1);
        assert!(sim.snapshot()[0].position.is_finite());
    }

    #[test]
    fn test_huge_spawn_weights_do_not_crash_the_step() {
        let catalog = TierCatalog::new(vec![
            TierDef::new("a", 5.0, 0.1, f32::MAX),
            TierDef::new("b", 10.0, 0.1, f32::MAX),
            TierDef::new("c", 20.0, 0.1, 0.0),
        ])
        .unwrap();
        let settings = Settings {
            walls: false,
            ..Settings::default()
        };
        let mut sim = Simulation::with_physics(settings, catalog, Scripted::default()).unwrap();
        sim.enqueue_spawn(SpawnRequest::at(100.0, 0.0));
        let report = sim.step();
        assert_eq!(report.spawn_count(), 1);
    }

    #[test]
    fn test_walls_not_registered() {
        let sim = Simulation::new(Settings::default(), TierCatalog::fruit()).unwrap();
        assert_eq!(sim.walls().len(), 3);
        assert_eq!(sim.physics().body_count(), 3);
        assert_eq!(sim.registry().live_count(), 0);
    }
}
