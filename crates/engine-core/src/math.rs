//! 数学型
//!
//! 全クレートで同じglamバージョンを使うための再エクスポート

pub use glam::{EulerRot, Mat4, Quat, Vec3};
