// src/physics.rs
// ==============================================================================
// RAPIER HOST — ground plane, chassis bodies, per-tick vehicle + pipeline step
// ------------------------------------------------------------------------------
// Per tick, for every spawned vehicle:
//   1) VehicleDynamics::step reads the chassis (&RigidBody) and queries the
//      world through the QueryPipeline (own body excluded)
//   2) user forces are reset, then the accumulated forces are applied
// then the pipeline integrates once for all bodies.
// ==============================================================================

use std::collections::HashMap;

use rapier3d::prelude::*;
use tracing::{info, warn};

use crate::config::VehicleConfig;
use crate::drive::types::{
    ControlInput, ForceSink, Pose, Pt3, RayHit, RigidBodyView, SpatialQuery, Vec3,
};
use crate::error::ConfigError;
use crate::state::VehicleSnapshot;
use crate::vehicle::VehicleDynamics;

const GROUP_GROUND: Group = Group::from_bits_truncate(0b0001);
const GROUP_CHASSIS: Group = Group::from_bits_truncate(0b0010);

/// Bodies past this distance from the origin (or non-finite) are reset.
const WORLD_LIMIT: f32 = 1_000.0;

// ============================================
// ----- collaborator impls on rapier ---------
// ============================================

impl RigidBodyView for RigidBody {
    fn pose(&self) -> Pose { *self.position() }
    fn linear_velocity(&self) -> Vec3 { *self.linvel() }
    fn mass(&self) -> f32 { RigidBody::mass(self) }

    fn local_center_of_mass(&self) -> Pt3 {
        self.position().inverse_transform_point(self.center_of_mass())
    }

    fn world_center_of_mass(&self) -> Pt3 { *self.center_of_mass() }

    fn velocity_at_point(&self, point: &Pt3) -> Vec3 {
        RigidBody::velocity_at_point(self, point)
    }
}

impl ForceSink for RigidBody {
    fn add_force_at_position(&mut self, force: Vec3, point: Pt3) {
        self.add_force_at_point(force, point, true);
    }
    fn add_force(&mut self, force: Vec3) {
        RigidBody::add_force(self, force, true);
    }
    fn set_linear_velocity(&mut self, velocity: Vec3) {
        self.set_linvel(velocity, true);
    }
}

/// World view for one chassis: everything except its own colliders.
pub struct RapierQuery<'a> {
    pipeline: &'a QueryPipeline,
    bodies: &'a RigidBodySet,
    colliders: &'a ColliderSet,
    exclude: RigidBodyHandle,
}

impl<'a> RapierQuery<'a> {
    pub fn new(
        pipeline: &'a QueryPipeline,
        bodies: &'a RigidBodySet,
        colliders: &'a ColliderSet,
        exclude: RigidBodyHandle,
    ) -> Self {
        Self { pipeline, bodies, colliders, exclude }
    }

    fn filter(&self) -> QueryFilter<'a> {
        QueryFilter::default().exclude_rigid_body(self.exclude)
    }
}

impl SpatialQuery for RapierQuery<'_> {
    fn raycast(&self, origin: &Pt3, direction: &Vec3, max_distance: f32) -> Option<RayHit> {
        let ray = Ray::new(*origin, *direction);
        let (_, hit) = self.pipeline.cast_ray_and_get_normal(
            self.bodies,
            self.colliders,
            &ray,
            max_distance,
            true,
            self.filter(),
        )?;

        Some(RayHit {
            distance: hit.time_of_impact,
            point: ray.point_at(hit.time_of_impact),
            normal: hit.normal,
        })
    }

    fn overlap_check(&self, point: &Pt3, radius: f32) -> bool {
        let sphere_pose = Isometry::translation(point.x, point.y, point.z);
        self.pipeline
            .intersection_with_shape(self.bodies, self.colliders, &sphere_pose, &Ball::new(radius), self.filter())
            .is_some()
    }
}

// ============================================
// ----- world ----------------------------------
// ============================================

pub struct SpawnedVehicle {
    pub body: RigidBodyHandle,
    pub dynamics: VehicleDynamics,
}

/// `gravity` drives the integrator for every body. Each vehicle's
/// `VehicleConfig::gravity` only feeds its load estimator; `spawn_vehicle`
/// warns when the two disagree.
pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    pub pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub joints: ImpulseJointSet,
    pub multibody_joints: MultibodyJointSet,
    pub ccd: CCDSolver,
    pub query_pipeline: QueryPipeline,     // suspension rays + overlap checks
    pub vehicles: HashMap<String, SpawnedVehicle>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        Self::with_gravity(9.81)
    }

    /// World with gravity of `magnitude` m/s^2 along -Y.
    pub fn with_gravity(magnitude: Real) -> Self {
        let gravity = vector![0.0, -magnitude, 0.0];

        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        // Thin static slab whose top surface is exactly y = 0.
        let ground_rb = RigidBodyBuilder::fixed()
            .translation(vector![0.0, -0.1, 0.0])
            .build();
        let ground_handle = bodies.insert(ground_rb);

        let ground_collider = ColliderBuilder::cuboid(500.0, 0.1, 500.0)
            .collision_groups(InteractionGroups::new(GROUP_GROUND, GROUP_CHASSIS))
            .friction(1.2)
            .restitution(0.0)
            .build();
        colliders.insert_with_parent(ground_collider, ground_handle, &mut bodies);

        info!(bodies = bodies.len(), colliders = colliders.len(), "ground inserted");

        let mut query_pipeline = QueryPipeline::new();
        query_pipeline.update(&colliders);

        Self {
            gravity,
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders,
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            query_pipeline,
            vehicles: HashMap::new(),
        }
    }

    /// Insert a chassis box for `config` at `position` and prime its wheels.
    pub fn spawn_vehicle(
        &mut self,
        id: impl Into<String>,
        config: VehicleConfig,
        position: [f32; 3],
    ) -> Result<RigidBodyHandle, ConfigError> {
        let id = id.into();
        let dynamics = VehicleDynamics::new(config)?;
        let chassis = &dynamics.config().chassis;

        let world_gravity = -self.gravity.y;
        if (dynamics.config().gravity - world_gravity).abs() > 1e-3 {
            warn!(
                %id,
                config = dynamics.config().gravity,
                world = world_gravity,
                "vehicle gravity differs from world gravity; load estimate will not match"
            );
        }

        // Replacing an id: the old chassis must leave the query pipeline before priming.
        if let Some(old) = self.vehicles.remove(&id) {
            self.remove_body(old.body);
        }

        let [hx, hy, hz] = chassis.half_extents;
        let [cx, cy, cz] = chassis.com_offset;
        let volume = 8.0 * hx * hy * hz;
        let density = chassis.mass / volume;

        let rb = RigidBodyBuilder::dynamic()
            .translation(vector![position[0], position[1], position[2]])
            .ccd_enabled(true)
            .build();

        let collider = ColliderBuilder::cuboid(hx, hy, hz)
            .translation(vector![cx, cy, cz]) // COM offset
            .collision_groups(InteractionGroups::new(GROUP_CHASSIS, GROUP_GROUND))
            .active_events(ActiveEvents::empty())
            .density(density)
            .friction(0.0)
            .restitution(0.0)
            .build();

        let handle = self.bodies.insert(rb);
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);
        self.query_pipeline.update(&self.colliders);

        let mut spawned = SpawnedVehicle { body: handle, dynamics };
        if let Some(body) = self.bodies.get(handle) {
            let query = RapierQuery::new(&self.query_pipeline, &self.bodies, &self.colliders, handle);
            spawned.dynamics.prime(body, &query);
        }

        info!(%id, ?position, body = ?handle, "spawned vehicle");
        self.vehicles.insert(id, spawned);
        Ok(handle)
    }

    pub fn despawn_vehicle(&mut self, id: &str) -> bool {
        match self.vehicles.remove(id) {
            Some(v) => {
                self.remove_body(v.body);
                true
            }
            None => false,
        }
    }

    /// Store input for the next tick. Returns false for an unknown id.
    pub fn set_input(&mut self, id: &str, input: ControlInput) -> bool {
        match self.vehicles.get_mut(id) {
            Some(v) => {
                v.dynamics.set_input(input);
                true
            }
            None => false,
        }
    }

    pub fn vehicle(&self, id: &str) -> Option<&VehicleDynamics> {
        self.vehicles.get(id).map(|v| &v.dynamics)
    }

    pub fn body(&self, id: &str) -> Option<&RigidBody> {
        self.vehicles.get(id).and_then(|v| self.bodies.get(v.body))
    }

    pub fn snapshot(&self, id: &str) -> Option<VehicleSnapshot> {
        let v = self.vehicles.get(id)?;
        let body = self.bodies.get(v.body)?;
        Some(v.dynamics.snapshot(body))
    }

    /// Advance every vehicle and the pipeline by `dt`. A non-positive or
    /// non-finite `dt` leaves the whole world untouched.
    pub fn step(&mut self, dt: Real) {
        if !(dt > 0.0) || !dt.is_finite() {
            return;
        }

        // 1) Vehicle forces against the current world state
        self.query_pipeline.update(&self.colliders);

        for v in self.vehicles.values_mut() {
            {
                let Some(body) = self.bodies.get(v.body) else { continue };
                let query = RapierQuery::new(&self.query_pipeline, &self.bodies, &self.colliders, v.body);
                v.dynamics.step(dt, body, &query);
            }

            if let Some(body) = self.bodies.get_mut(v.body) {
                body.reset_forces(true);
                v.dynamics.apply_forces(body);
            }
        }

        // 2) Integrate
        self.pipeline.step(
            &self.gravity,
            &IntegrationParameters {
                dt,
                ..IntegrationParameters::default()
            },
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );

        // 3) Safety: bring back bodies that blew up
        let mut reset = Vec::new();
        for (handle, body) in self.bodies.iter_mut() {
            let pos = *body.translation();
            let bad = pos.iter().any(|c| !c.is_finite() || c.abs() > WORLD_LIMIT);
            if bad {
                let safe = vector![0.0, 1.0, 0.0];
                body.set_translation(safe, true);
                body.set_rotation(Rotation::identity(), true);
                body.set_linvel(vector![0.0, 0.0, 0.0], true);
                body.set_angvel(vector![0.0, 0.0, 0.0], true);
                body.reset_forces(true);
                warn!(?handle, ?pos, "reset exploding body");
                reset.push(handle);
            }
        }

        if !reset.is_empty() {
            self.query_pipeline.update(&self.colliders);
            for v in self.vehicles.values_mut().filter(|v| reset.contains(&v.body)) {
                if let Some(body) = self.bodies.get(v.body) {
                    let query = RapierQuery::new(&self.query_pipeline, &self.bodies, &self.colliders, v.body);
                    v.dynamics.prime(body, &query);
                }
            }
        }
    }

    fn remove_body(&mut self, handle: RigidBodyHandle) {
        self.bodies.remove(
            handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            true,
        );
        self.query_pipeline.update(&self.colliders);
    }
}
