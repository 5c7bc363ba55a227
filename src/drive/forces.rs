// ==============================================================================
// forces.rs — PER-TICK FORCE ACCUMULATOR
// ------------------------------------------------------------------------------
// Wheels and the orchestrator never touch the rigid body directly. They push
// additive contributions here; the orchestrator applies the whole batch once
// per tick through a ForceSink:
//   1) halt (velocity snap to zero), if any wheel requested it
//   2) point forces at their world application points
//   3) the summed central force
// Every contribution is additive, so the order wheels run in does not change
// the result.
// ==============================================================================

use crate::drive::types::{ForceSink, Pt3, Vec3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointForce {
    pub force: Vec3,
    pub point: Pt3,
}

#[derive(Clone, Debug, Default)]
pub struct ForceAccumulator {
    at_points: Vec<PointForce>,
    central: Vec3,
    halt: bool,
}

impl ForceAccumulator {
    /// Pre-size for `capacity` point forces so stepping does not allocate.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            at_points: Vec::with_capacity(capacity),
            central: Vec3::zeros(),
            halt: false,
        }
    }

    pub fn clear(&mut self) {
        self.at_points.clear();
        self.central = Vec3::zeros();
        self.halt = false;
    }

    pub fn add_at_point(&mut self, force: Vec3, point: Pt3) {
        if force.iter().all(|c| c.is_finite()) {
            self.at_points.push(PointForce { force, point });
        }
    }

    pub fn add_central(&mut self, force: Vec3) {
        if force.iter().all(|c| c.is_finite()) {
            self.central += force;
        }
    }

    /// Ask for the body's linear velocity to be zeroed before forces are applied.
    pub fn request_halt(&mut self) {
        self.halt = true;
    }

    pub fn halt_requested(&self) -> bool {
        self.halt
    }

    pub fn point_forces(&self) -> &[PointForce] {
        &self.at_points
    }

    pub fn central_force(&self) -> Vec3 {
        self.central
    }

    /// Net linear force of everything accumulated this tick.
    pub fn total_force(&self) -> Vec3 {
        self.at_points.iter().fold(self.central, |acc, p| acc + p.force)
    }

    pub fn is_empty(&self) -> bool {
        self.at_points.is_empty() && self.central == Vec3::zeros() && !self.halt
    }

    pub fn apply<S: ForceSink + ?Sized>(&self, sink: &mut S) {
        if self.halt {
            sink.set_linear_velocity(Vec3::zeros());
        }
        for p in &self.at_points {
            sink.add_force_at_position(p.force, p.point);
        }
        if self.central != Vec3::zeros() {
            sink.add_force(self.central);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
        sum: Vec3,
        velocity: Option<Vec3>,
    }

    impl ForceSink for Recorder {
        fn add_force_at_position(&mut self, force: Vec3, _point: Pt3) {
            self.calls.push("point");
            self.sum += force;
        }
        fn add_force(&mut self, force: Vec3) {
            self.calls.push("central");
            self.sum += force;
        }
        fn set_linear_velocity(&mut self, velocity: Vec3) {
            self.calls.push("halt");
            self.velocity = Some(velocity);
        }
    }

    #[test]
    fn applies_halt_first_then_forces() {
        let mut acc = ForceAccumulator::with_capacity(4);
        acc.add_at_point(Vec3::new(0.0, 10.0, 0.0), Pt3::new(1.0, 0.0, 0.0));
        acc.add_central(Vec3::new(-2.0, 0.0, 0.0));
        acc.request_halt();

        let mut rec = Recorder::default();
        acc.apply(&mut rec);

        assert_eq!(rec.calls, vec!["halt", "point", "central"]);
        assert_eq!(rec.velocity, Some(Vec3::zeros()));
        assert_relative_eq!(rec.sum, Vec3::new(-2.0, 10.0, 0.0));
    }

    #[test]
    fn order_of_contributions_does_not_matter() {
        let forces = [
            (Vec3::new(1.0, 2.0, 3.0), Pt3::origin()),
            (Vec3::new(-4.0, 0.5, 0.0), Pt3::new(0.0, 1.0, 0.0)),
            (Vec3::new(0.0, 0.0, -7.0), Pt3::new(2.0, 0.0, 0.0)),
        ];

        let mut a = ForceAccumulator::with_capacity(3);
        let mut b = ForceAccumulator::with_capacity(3);
        for (f, p) in forces {
            a.add_at_point(f, p);
        }
        for (f, p) in forces.iter().rev() {
            b.add_at_point(*f, *p);
        }
        assert_relative_eq!(a.total_force(), b.total_force());
    }

    #[test]
    fn non_finite_contributions_are_dropped() {
        let mut acc = ForceAccumulator::with_capacity(1);
        acc.add_at_point(Vec3::new(f32::NAN, 0.0, 0.0), Pt3::origin());
        acc.add_central(Vec3::new(0.0, f32::INFINITY, 0.0));
        assert!(acc.is_empty());
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut acc = ForceAccumulator::with_capacity(8);
        acc.add_at_point(Vec3::x(), Pt3::origin());
        acc.request_halt();
        acc.clear();
        assert!(acc.is_empty());
        assert!(acc.at_points.capacity() >= 8);
    }
}
