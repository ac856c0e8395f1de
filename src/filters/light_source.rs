//! Light sources for `feDiffuseLighting` and `feSpecularLighting`.
//!
//! Positions are in user units. Angles are in degrees.

use crate::foundation::core::Point;

/// Minimal 3-vector for lighting math.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn normalize(self) -> Vec3 {
        let len = self.length();
        Vec3::new(self.x / len, self.y / len, self.z / len)
    }

    pub fn scale(self, k: f64) -> Vec3 {
        Vec3::new(self.x * k, self.y * k, self.z * k)
    }

    pub fn max_component(self) -> f64 {
        self.x.max(self.y).max(self.z)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LightSource {
    Distant {
        #[serde(default)]
        azimuth: f64,
        #[serde(default)]
        elevation: f64,
    },
    Point {
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
        #[serde(default)]
        z: f64,
    },
    Spot {
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
        #[serde(default)]
        z: f64,
        #[serde(default)]
        points_at_x: f64,
        #[serde(default)]
        points_at_y: f64,
        #[serde(default)]
        points_at_z: f64,
        #[serde(default = "default_spot_exponent")]
        specular_exponent: f64,
        /// No cone limit when absent.
        #[serde(default)]
        limiting_cone_angle: Option<f64>,
    },
}

fn default_spot_exponent() -> f64 {
    1.0
}

impl LightSource {
    pub fn distant(azimuth: f64, elevation: f64) -> Self {
        Self::Distant { azimuth, elevation }
    }

    pub fn point(x: f64, y: f64, z: f64) -> Self {
        Self::Point { x, y, z }
    }

    /// Unit vector from the surface point `(user, height)` towards the light.
    pub fn direction(&self, user: Point, height: f64) -> Vec3 {
        match *self {
            Self::Distant { azimuth, elevation } => {
                let (az, el) = (azimuth.to_radians(), elevation.to_radians());
                Vec3::new(az.cos() * el.cos(), az.sin() * el.cos(), el.sin())
            }
            Self::Point { x, y, z } | Self::Spot { x, y, z, .. } => {
                (Vec3::new(x, y, z) - Vec3::new(user.x, user.y, height)).normalize()
            }
        }
    }

    /// Light colour reaching the surface point; only spot lights attenuate `color`.
    pub fn color(&self, color: Vec3, user: Point, height: f64) -> Vec3 {
        let Self::Spot {
            x,
            y,
            z,
            points_at_x,
            points_at_y,
            points_at_z,
            specular_exponent,
            limiting_cone_angle,
        } = *self
        else {
            return color;
        };

        let pos = Vec3::new(x, y, z);
        let l = (pos - Vec3::new(user.x, user.y, height)).normalize();
        let s = (Vec3::new(points_at_x, points_at_y, points_at_z) - pos).normalize();
        let base = -l.dot(s);
        let outside_cone = limiting_cone_angle.is_some_and(|cone| base.acos() > cone.to_radians());
        if base < 0.0 || outside_cone {
            return Vec3::default();
        }
        color.scale(base.powf(specular_exponent))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/filters/light_source.rs"]
mod tests;
