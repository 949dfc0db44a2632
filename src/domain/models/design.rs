#[cfg(test)]
#[path = "design_test.rs"]
mod tests;

use serde_derive::Deserialize;
use serde_derive::Serialize;

use super::ImageState;

/// Milliseconds since the Unix epoch at creation. Doubles as the sort key.
pub type DesignId = u64;

/// One completed prompt-to-image generation round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignHistoryItem {
    pub id: DesignId,
    pub original_image: ImageState,
    pub prompt: String,
    pub generated_image: ImageState,
}

/// One lineage of edits rooted at a single uploaded image. History is
/// append-only and kept in creation order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignSession {
    pub id: DesignId,
    pub base_image: ImageState,
    pub history: Vec<DesignHistoryItem>,
}

impl DesignSession {
    pub fn new(id: DesignId, base_image: ImageState) -> DesignSession {
        return DesignSession {
            id,
            base_image,
            history: vec![],
        };
    }

    /// Returns a copy of the session with `item` appended. The receiver is
    /// left untouched.
    pub fn with_item(&self, item: DesignHistoryItem) -> DesignSession {
        let mut history = self.history.clone();
        history.push(item);

        return DesignSession {
            id: self.id,
            base_image: self.base_image.clone(),
            history,
        };
    }

    pub fn latest_design(&self) -> Option<&ImageState> {
        return self.history.last().map(|item| return &item.generated_image);
    }

    pub fn item(&self, item_id: DesignId) -> Option<&DesignHistoryItem> {
        return self.history.iter().find(|item| return item.id == item_id);
    }

    /// Largest id used by the session or any of its items.
    pub fn max_id(&self) -> DesignId {
        return self
            .history
            .iter()
            .map(|item| return item.id)
            .fold(self.id, DesignId::max);
    }
}
