pub mod detection;
pub mod expression;

pub use detection::{BoundingBox, FaceDetection};
pub use expression::{Expression, ExpressionScores};
