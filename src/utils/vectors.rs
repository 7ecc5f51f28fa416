use std::{fmt::Display, iter::Sum};

use auto_ops::{impl_op_ex, impl_op_ex_commutative};
use nalgebra::Vector4;
use serde::{Deserialize, Serialize};

/// A three-vector (typically a three-momentum) with `f64` components.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    /// The $`x`$ component.
    pub x: f64,
    /// The $`y`$ component.
    pub y: f64,
    /// The $`z`$ component.
    pub z: f64,
}

impl Vec3 {
    /// Create a new [`Vec3`] from its components.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
    /// The unit vector along $`x`$.
    pub const fn x_hat() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }
    /// The unit vector along $`y`$.
    pub const fn y_hat() -> Self {
        Self::new(0.0, 1.0, 0.0)
    }
    /// The unit vector along $`z`$.
    pub const fn z_hat() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }
    /// Promote this three-momentum to a four-momentum of a particle with the given `mass`.
    pub fn with_mass(&self, mass: f64) -> Vec4 {
        let e = (mass.powi(2) + self.mag2()).sqrt();
        Vec4::new(self.x, self.y, self.z, e)
    }
    /// Promote this three-momentum to a four-momentum with the given `energy`.
    pub fn with_energy(&self, energy: f64) -> Vec4 {
        Vec4::new(self.x, self.y, self.z, energy)
    }
    /// The dot product with `other`.
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }
    /// The cross product with `other`.
    pub fn cross(&self, other: &Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }
    /// The squared magnitude.
    pub fn mag2(&self) -> f64 {
        self.dot(self)
    }
    /// The magnitude.
    pub fn mag(&self) -> f64 {
        self.mag2().sqrt()
    }
    /// The cosine of the polar angle. Zero vectors have $`\cos\theta = 1`$, as in ROOT.
    pub fn costheta(&self) -> f64 {
        let mag = self.mag();
        if mag == 0.0 {
            1.0
        } else {
            self.z / mag
        }
    }
    /// The polar angle.
    pub fn theta(&self) -> f64 {
        self.costheta().acos()
    }
    /// The azimuthal angle in $`(-\pi, \pi]`$.
    pub fn phi(&self) -> f64 {
        self.y.atan2(self.x)
    }
    /// The unit vector along this vector.
    pub fn unit(&self) -> Self {
        self / self.mag()
    }
    /// A unit vector perpendicular to this one.
    pub fn orthogonal(&self) -> Self {
        let axis = if self.x.abs() < self.z.abs() {
            Self::x_hat()
        } else {
            Self::z_hat()
        };
        self.cross(&axis).unit()
    }
}

impl Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:6.3}, {:6.3}, {:6.3}]", self.x, self.y, self.z)
    }
}

impl_op_ex!(+ |a: &Vec3, b: &Vec3| -> Vec3 { Vec3::new(a.x + b.x, a.y + b.y, a.z + b.z) });
impl_op_ex!(-|a: &Vec3, b: &Vec3| -> Vec3 { Vec3::new(a.x - b.x, a.y - b.y, a.z - b.z) });
impl_op_ex!(-|a: &Vec3| -> Vec3 { Vec3::new(-a.x, -a.y, -a.z) });
impl_op_ex_commutative!(*|a: &Vec3, b: &f64| -> Vec3 { Vec3::new(a.x * b, a.y * b, a.z * b) });
impl_op_ex!(/ |a: &Vec3, b: &f64| -> Vec3 { Vec3::new(a.x / b, a.y / b, a.z / b) });

/// A four-vector (typically a four-momentum) stored as $`(p_x, p_y, p_z, E)`$.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec4 {
    /// The $`x`$ component of the momentum.
    pub px: f64,
    /// The $`y`$ component of the momentum.
    pub py: f64,
    /// The $`z`$ component of the momentum.
    pub pz: f64,
    /// The energy.
    pub e: f64,
}

impl Vec4 {
    /// Create a new [`Vec4`] from its components.
    pub const fn new(px: f64, py: f64, pz: f64, e: f64) -> Self {
        Self { px, py, pz, e }
    }
    /// The three-momentum.
    pub fn vec3(&self) -> Vec3 {
        Vec3::new(self.px, self.py, self.pz)
    }
    /// The velocity $`\vec{\beta} = \vec{p}/E`$.
    pub fn beta(&self) -> Vec3 {
        self.vec3() / self.e
    }
    /// The Lorentz factor $`\gamma = E/m`$.
    pub fn gamma(&self) -> f64 {
        self.e / self.m()
    }
    /// The squared invariant mass.
    pub fn m2(&self) -> f64 {
        self.e * self.e - self.vec3().mag2()
    }
    /// The invariant mass. Space-like vectors get a negative mass, as in ROOT.
    pub fn m(&self) -> f64 {
        let m2 = self.m2();
        if m2 < 0.0 {
            -(-m2).sqrt()
        } else {
            m2.sqrt()
        }
    }
    /// Boost this four-vector by the velocity `beta`. To go to the rest frame of a four-vector
    /// `p`, use `boost(&-p.beta())`.
    pub fn boost(&self, beta: &Vec3) -> Self {
        let b2 = beta.mag2();
        if b2 == 0.0 {
            return *self;
        }
        let gamma = 1.0 / (1.0 - b2).sqrt();
        let p3 =
            self.vec3() + beta * ((gamma - 1.0) * self.vec3().dot(beta) / b2 + gamma * self.e);
        p3.with_energy(gamma * (self.e + beta.dot(&self.vec3())))
    }
    /// A compact string representation used in diagnostics.
    pub fn to_p4_string(&self) -> String {
        format!(
            "[e = {:.5}; p = ({:.5}, {:.5}, {:.5}); m = {:.5}]",
            self.e,
            self.px,
            self.py,
            self.pz,
            self.m()
        )
    }
}

impl Display for Vec4 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_p4_string())
    }
}

impl From<Vec4> for Vector4<f64> {
    fn from(value: Vec4) -> Self {
        Vector4::new(value.px, value.py, value.pz, value.e)
    }
}

impl From<Vector4<f64>> for Vec4 {
    fn from(value: Vector4<f64>) -> Self {
        Vec4::new(value[0], value[1], value[2], value[3])
    }
}

impl Sum for Vec4 {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Vec4::default(), |acc, p4| acc + p4)
    }
}

impl<'a> Sum<&'a Vec4> for Vec4 {
    fn sum<I: Iterator<Item = &'a Vec4>>(iter: I) -> Self {
        iter.fold(Vec4::default(), |acc, p4| acc + p4)
    }
}

impl_op_ex!(+ |a: &Vec4, b: &Vec4| -> Vec4 {
    Vec4::new(a.px + b.px, a.py + b.py, a.pz + b.pz, a.e + b.e)
});
impl_op_ex!(-|a: &Vec4, b: &Vec4| -> Vec4 {
    Vec4::new(a.px - b.px, a.py - b.py, a.pz - b.pz, a.e - b.e)
});
impl_op_ex!(-|a: &Vec4| -> Vec4 { Vec4::new(-a.px, -a.py, -a.pz, -a.e) });
