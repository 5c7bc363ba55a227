// ==============================================================================
// load_transfer.rs — STATIC + DYNAMIC WHEEL LOAD ESTIMATE
// ------------------------------------------------------------------------------
// Static share (per wheel, offsets relative to the center of gravity):
//     axle_load  = m * g * |z| / wheelbase.axle
//     wheel_load = axle_load * |x| / wheelbase.track
//
// Dynamic correction from last-tick chassis acceleration (chassis frame):
//     dF_long = m * a.z * h / wheelbase.axle
//     dF_lat  = m * a.x * h / wheelbase.track
//     wheel_load += sign(-z) * dF_long / 2 + sign(x) * dF_lat / 2
//
// The estimate feeds only the brake cap of each wheel. It is not wired into
// lateral grip.
// ==============================================================================

use crate::drive::types::Vec3;

const MIN_SPAN: f32 = 1e-4;

/// Extent of the wheel layout: `track` along chassis X, `axle` along chassis Z.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Wheelbase {
    pub track: f32,
    pub axle: f32,
}

impl Wheelbase {
    pub fn new(track: f32, axle: f32) -> Self {
        Self { track, axle }
    }

    /// Span of wheel offsets (chassis frame, relative to the center of gravity).
    pub fn from_offsets<'a, I>(offsets: I) -> Self
    where
        I: IntoIterator<Item = &'a Vec3>,
    {
        let mut it = offsets.into_iter();
        let Some(first) = it.next() else {
            return Self::default();
        };

        let (mut left, mut right) = (first.x, first.x);
        let (mut rear, mut front) = (first.z, first.z);
        for p in it {
            left = left.min(p.x);
            right = right.max(p.x);
            rear = rear.min(p.z);
            front = front.max(p.z);
        }

        Self {
            track: right - left,
            axle: front - rear,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.track <= MIN_SPAN || self.axle <= MIN_SPAN
    }
}

/// Per-tick chassis quantities the estimate needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadInputs {
    pub mass: f32,
    pub cg_height: f32,   // above the lowest wheel contact (m)
    pub local_accel: Vec3, // chassis frame (m/s^2)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadTransferEstimator {
    wheelbase: Wheelbase,
    gravity: f32,
}

impl LoadTransferEstimator {
    pub fn new(wheelbase: Wheelbase, gravity: f32) -> Self {
        Self {
            wheelbase,
            gravity: gravity.abs(),
        }
    }

    pub fn wheelbase(&self) -> Wheelbase {
        self.wheelbase
    }

    pub fn is_degenerate(&self) -> bool {
        self.wheelbase.is_degenerate()
    }

    pub fn static_load(&self, offset: &Vec3, mass: f32) -> f32 {
        if self.is_degenerate() {
            return 0.0;
        }
        let wb = self.wheelbase;
        let weight = mass * self.gravity;
        let axle_load = weight * (offset.z.abs() / wb.axle);
        axle_load * (offset.x.abs() / wb.track)
    }

    /// Returns `(dF_long, dF_lat)` for the whole chassis.
    pub fn transfer(&self, inputs: &LoadInputs) -> (f32, f32) {
        if self.is_degenerate() {
            return (0.0, 0.0);
        }
        let wb = self.wheelbase;
        let d_long = inputs.mass * inputs.local_accel.z * inputs.cg_height / wb.axle;
        let d_lat = inputs.mass * inputs.local_accel.x * inputs.cg_height / wb.track;
        (d_long, d_lat)
    }

    /// Estimated normal load (N) on the wheel at `offset`. Zero for a degenerate layout.
    pub fn wheel_load(&self, offset: &Vec3, inputs: &LoadInputs) -> f32 {
        if self.is_degenerate() {
            return 0.0;
        }
        let (d_long, d_lat) = self.transfer(inputs);

        let mut load = self.static_load(offset, inputs.mass);
        load += sign(-offset.z) * d_long * 0.5;
        load += sign(offset.x) * d_lat * 0.5;
        load
    }
}

// zero counts as positive
#[inline]
fn sign(v: f32) -> f32 {
    if v >= 0.0 { 1.0 } else { -1.0 }
}
