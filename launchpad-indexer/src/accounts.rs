use serde::{Deserialize, Serialize};

/// An address that appeared as an event actor. Created once per address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i32,
    pub address: String,
}
