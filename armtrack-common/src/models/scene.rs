use serde::{Deserialize, Serialize};

/// A tracked object as exposed to the reasoning service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub name: String,
    pub inrange: bool,
    pub position: [f64; 3],
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub palm_up: bool,
}

/// Snapshot of what the rig currently sees.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneInfo {
    pub objects: Vec<ObjectInfo>,
    #[serde(rename = "User", alias = "user", default)]
    pub user: UserInfo,
}

impl SceneInfo {
    /// Case-insensitive lookup; object names come from free text.
    pub fn find(&self, name: &str) -> Option<&ObjectInfo> {
        self.objects
            .iter()
            .find(|o| o.name.eq_ignore_ascii_case(name))
    }

    pub fn in_range(&self) -> impl Iterator<Item = &ObjectInfo> {
        self.objects.iter().filter(|o| o.inrange)
    }
}
