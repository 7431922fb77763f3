//! Core types and utilities

pub mod vec3;

pub use vec3::{wind_direction, wind_normal, wind_side, Frame, Vec3};
