use serde_derive::Deserialize;
use serde_derive::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plant {
    pub name: String,
}

impl Plant {
    pub fn new(name: &str) -> Plant {
        return Plant {
            name: name.to_string(),
        };
    }
}
