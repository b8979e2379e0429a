mod action;
mod bind_pose;
mod skinning;

pub use action::*;
pub use bind_pose::*;
pub use skinning::*;
