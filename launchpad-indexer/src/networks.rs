use serde::{Deserialize, Serialize};

/// A chain deployment the engine syncs, seeded once from configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub id: i32,
    pub name: String,
}
