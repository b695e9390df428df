pub mod fingers;
pub mod handedness;
pub mod landmark;

pub use fingers::{count_extended_fingers, extended_fingers, Finger};
pub use handedness::{display_label, Handedness};
pub use landmark::{HandLandmarkIndex, HandLandmarks, Landmark};
