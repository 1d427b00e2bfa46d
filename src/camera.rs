use crate::matrix::{self, Mat4};
use std::f32::consts::FRAC_PI_2;

/// View state of the painter: rotation angles, translation and the z
/// scaling applied to mesh depth. Changed only through the renderer's
/// setters; drawers read the composed matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    rotation: [f32; 3],
    translation: [f32; 3],
    z_factor: f32,
    depth_test: bool,
    random_z: bool,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera {
    pub fn new() -> Self {
        Self {
            rotation: [0.0; 3],
            translation: [0.0; 3],
            z_factor: 0.0,
            depth_test: false,
            random_z: false,
        }
    }

    pub fn rotate(&mut self, x: f32, y: f32, z: f32) {
        self.rotation = [x, y, z];
    }

    pub fn translate(&mut self, x: f32, y: f32, z: f32) {
        self.translation = [x, y, z];
    }

    pub fn set_z_factor(&mut self, z: f32) {
        self.z_factor = z;
    }

    pub fn set_depth_test(&mut self, on: bool) {
        self.depth_test = on;
    }

    pub fn set_random_z(&mut self, on: bool) {
        self.random_z = on;
    }

    pub fn rotation(&self) -> [f32; 3] {
        self.rotation
    }

    pub fn translation(&self) -> [f32; 3] {
        self.translation
    }

    pub fn z_factor(&self) -> f32 {
        self.z_factor
    }

    pub fn depth_test(&self) -> bool {
        self.depth_test
    }

    pub fn random_z(&self) -> bool {
        self.random_z
    }

    /// Maps logical pixel coordinates (y down, z = -1 on the drawing plane)
    /// into clip space for a `width` x `height` canvas.
    pub fn matrix(&self, width: f32, height: f32) -> Mat4 {
        let (w, h) = (width.max(1.0), height.max(1.0));
        let smoosh: Mat4 = [
            [2.0 / w, 0.0, 0.0, 0.0],
            [0.0, -2.0 / w, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [-1.0, h / w, 0.0, 1.0],
        ];
        let [tx, ty, tz] = self.translation;
        let [ax, ay, az] = self.rotation;

        let mut m = matrix::perspective(FRAC_PI_2, w / h, 0.01, 3000.0);
        m = matrix::multiply(&m, &matrix::translate(tx, ty, (tz - 1.0) * h / w));
        m = matrix::multiply(&m, &matrix::rotate_z(az));
        m = matrix::multiply(&m, &matrix::rotate_y(ay));
        m = matrix::multiply(&m, &matrix::rotate_x(ax));
        m = matrix::multiply(&m, &matrix::translate(0.0, 0.0, 1.0));
        matrix::multiply(&m, &smoosh)
    }
}
