use std::fmt::Display;

use nalgebra::{Matrix4, Vector4};

use crate::utils::vectors::{Vec3, Vec4};

/// A (proper, orthochronous) Lorentz transformation acting on four-vectors stored as
/// $`(p_x, p_y, p_z, E)`$.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LorentzTransform(Matrix4<f64>);

impl Default for LorentzTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl LorentzTransform {
    /// The identity transformation.
    pub fn identity() -> Self {
        Self(Matrix4::identity())
    }

    /// A pure boost by the velocity `beta`; equivalent to [`Vec4::boost`].
    pub fn boost(beta: &Vec3) -> Self {
        let b2 = beta.mag2();
        if b2 == 0.0 {
            return Self::identity();
        }
        let gamma = 1.0 / (1.0 - b2).sqrt();
        let b = [beta.x, beta.y, beta.z];
        Self(Matrix4::from_fn(|row, col| match (row, col) {
            (3, 3) => gamma,
            (3, j) => gamma * b[j],
            (i, 3) => gamma * b[i],
            (i, j) => {
                let delta = if i == j { 1.0 } else { 0.0 };
                delta + (gamma - 1.0) * b[i] * b[j] / b2
            }
        }))
    }

    /// The rotation into the frame spanned by the orthonormal, right-handed basis
    /// `(x_axis, y_axis, z_axis)`: the new components of a vector are its projections onto the
    /// three axes.
    pub fn rotation_from_axes(x_axis: &Vec3, y_axis: &Vec3, z_axis: &Vec3) -> Self {
        let axes = [x_axis, y_axis, z_axis];
        Self(Matrix4::from_fn(|row, col| match (row, col) {
            (3, 3) => 1.0,
            (3, _) | (_, 3) => 0.0,
            (i, 0) => axes[i].x,
            (i, 1) => axes[i].y,
            (i, _) => axes[i].z,
        }))
    }

    /// The transformation which first applies `self` and then `next`.
    pub fn then(&self, next: &Self) -> Self {
        Self(next.0 * self.0)
    }

    /// Apply this transformation to a four-vector.
    pub fn apply(&self, p4: &Vec4) -> Vec4 {
        (self.0 * Vector4::from(*p4)).into()
    }

    /// The underlying $`4\times 4`$ matrix.
    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.0
    }
}

impl Display for LorentzTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The transformation from the lab frame into the Gottfried-Jackson frame of the system `x`
/// produced by `beam`.
///
/// In the resulting frame `x` is at rest, the $`z`$-axis points along the beam direction and the
/// $`y`$-axis is normal to the production plane, $`\hat{y} \propto \vec{p}_{beam} \times
/// \vec{p}_X`$. If the beam and `x` are collinear, an arbitrary normal is chosen.
pub fn gj_transform(beam: &Vec4, x: &Vec4) -> LorentzTransform {
    let boost = LorentzTransform::boost(&-x.beta());
    let beam_rf = boost.apply(beam);
    let z_axis = beam_rf.vec3().unit();
    // the boost is along p_X, so the production-plane normal is the same in both frames
    let normal = beam.vec3().cross(&x.vec3());
    let y_axis = if normal.mag2() > 0.0 {
        normal.unit()
    } else {
        z_axis.orthogonal()
    };
    let x_axis = y_axis.cross(&z_axis);
    boost.then(&LorentzTransform::rotation_from_axes(
        &x_axis, &y_axis, &z_axis,
    ))
}

/// The transformation into the helicity frame of `daughter`, given in the frame of its parent.
///
/// The frame is first rotated such that the $`z`$-axis points along the daughter's momentum and
/// the $`y`$-axis along $`\hat{z}_{old} \times \vec{p}`$, and then boosted along the new
/// $`z`$-axis into the daughter's rest frame. A daughter moving along the old $`z`$-axis keeps
/// the old $`y`$-axis.
pub fn hf_transform(daughter: &Vec4) -> LorentzTransform {
    let p = daughter.vec3();
    let z_axis = p.unit();
    let normal = Vec3::z_hat().cross(&p);
    let y_axis = if normal.mag2() > 0.0 {
        normal.unit()
    } else {
        Vec3::y_hat()
    };
    let x_axis = y_axis.cross(&z_axis);
    let rotation = LorentzTransform::rotation_from_axes(&x_axis, &y_axis, &z_axis);
    rotation.then(&LorentzTransform::boost(&Vec3::new(
        0.0,
        0.0,
        -p.mag() / daughter.e,
    )))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn assert_p4_eq(a: &Vec4, b: &Vec4) {
        assert_relative_eq!(a.px, b.px, epsilon = 1e-10);
        assert_relative_eq!(a.py, b.py, epsilon = 1e-10);
        assert_relative_eq!(a.pz, b.pz, epsilon = 1e-10);
        assert_relative_eq!(a.e, b.e, epsilon = 1e-10);
    }

    #[test]
    fn test_boost_matches_vector_boost() {
        let pa = Vec4::new(3.0, 4.0, 5.0, 10.0);
        let pb = Vec4::new(3.4, 2.3, 1.2, 9.0);
        let transform = LorentzTransform::boost(&-pb.beta());
        assert_p4_eq(&transform.apply(&pa), &pa.boost(&-pb.beta()));
        assert_eq!(LorentzTransform::boost(&Vec3::default()), LorentzTransform::identity());
    }

    #[test]
    fn test_rotation_preserves_invariants() {
        let z = Vec3::new(1.0, 1.0, 0.0).unit();
        let y = Vec3::new(0.0, 0.0, 1.0);
        let x = y.cross(&z);
        let rotation = LorentzTransform::rotation_from_axes(&x, &y, &z);
        let p = Vec4::new(0.3, -0.2, 0.9, 2.0);
        let rotated = rotation.apply(&p);
        assert_relative_eq!(rotated.m2(), p.m2(), epsilon = 1e-12);
        assert_relative_eq!(rotated.e, p.e, epsilon = 1e-12);
        assert_relative_eq!(rotated.pz, p.vec3().dot(&z), epsilon = 1e-12);
        assert_relative_eq!(rotated.py, 0.9, epsilon = 1e-12);
    }

    #[test]
    fn test_composition_order() {
        let boost = LorentzTransform::boost(&Vec3::new(0.0, 0.0, 0.5));
        let rotation = LorentzTransform::rotation_from_axes(
            &Vec3::y_hat(),
            &Vec3::z_hat(),
            &Vec3::x_hat(),
        );
        let p = Vec4::new(0.1, 0.2, 0.3, 1.0);
        assert_p4_eq(
            &boost.then(&rotation).apply(&p),
            &rotation.apply(&boost.apply(&p)),
        );
    }

    #[test]
    fn test_gj_transform() {
        let beam = Vec3::new(0.0, 0.0, 190.0).with_mass(0.13957);
        let x = Vec3::new(0.25, -0.1, 185.0).with_mass(1.4);
        let gj = gj_transform(&beam, &x);
        let x_gj = gj.apply(&x);
        assert_p4_eq(&x_gj, &Vec4::new(0.0, 0.0, 0.0, x.m()));
        let beam_gj = gj.apply(&beam);
        assert_relative_eq!(beam_gj.px, 0.0, epsilon = 1e-8);
        assert_relative_eq!(beam_gj.py, 0.0, epsilon = 1e-8);
        assert!(beam_gj.pz > 0.0);
        assert_relative_eq!(beam_gj.m2(), beam.m2(), epsilon = 1e-6);
        // the production-plane normal becomes the y-axis
        let normal = beam.vec3().cross(&x.vec3()).unit();
        let normal_gj = gj.apply(&normal.with_energy(0.0));
        assert_relative_eq!(normal_gj.py, 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_gj_transform_collinear() {
        let beam = Vec3::new(0.0, 0.0, 10.0).with_mass(0.0);
        let x = Vec3::new(0.0, 0.0, 8.0).with_mass(1.0);
        let x_gj = gj_transform(&beam, &x).apply(&x);
        assert_p4_eq(&x_gj, &Vec4::new(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_hf_transform() {
        let daughter = Vec3::new(0.2, 0.3, -0.4).with_mass(0.77);
        let hf = hf_transform(&daughter);
        assert_p4_eq(&hf.apply(&daughter), &Vec4::new(0.0, 0.0, 0.0, 0.77));
        // a vector along the daughter's flight direction stays on the z-axis
        let along = (daughter.vec3().unit() * 0.1).with_mass(0.13957);
        let along_hf = hf.apply(&along);
        assert_relative_eq!(along_hf.px, 0.0, epsilon = 1e-10);
        assert_relative_eq!(along_hf.py, 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_hf_transform_along_z() {
        let daughter = Vec3::new(0.0, 0.0, -0.5).with_mass(0.5);
        let hf = hf_transform(&daughter);
        assert_p4_eq(&hf.apply(&daughter), &Vec4::new(0.0, 0.0, 0.0, 0.5));
    }
}
