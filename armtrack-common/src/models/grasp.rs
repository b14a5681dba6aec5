use std::fmt;

use serde::{Deserialize, Serialize};

/// The fixed steps of a grasp, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GraspStepKind {
    Approach,
    Grip,
    Lift,
    Transit,
    LowerAtTarget,
    Release,
    Retreat,
    ReturnHome,
}

impl GraspStepKind {
    pub const ORDER: [GraspStepKind; 8] = [
        GraspStepKind::Approach,
        GraspStepKind::Grip,
        GraspStepKind::Lift,
        GraspStepKind::Transit,
        GraspStepKind::LowerAtTarget,
        GraspStepKind::Release,
        GraspStepKind::Retreat,
        GraspStepKind::ReturnHome,
    ];
}

impl fmt::Display for GraspStepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GraspStepKind::Approach => "approach",
            GraspStepKind::Grip => "grip",
            GraspStepKind::Lift => "lift",
            GraspStepKind::Transit => "transit",
            GraspStepKind::LowerAtTarget => "lower_at_target",
            GraspStepKind::Release => "release",
            GraspStepKind::Retreat => "retreat",
            GraspStepKind::ReturnHome => "return_home",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GripperAction {
    Open,
    Close,
}
