#[cfg(test)]
#[path = "id_clock_test.rs"]
mod tests;

use chrono::Utc;

use crate::domain::models::DesignId;

/// Hands out millisecond timestamps that never repeat. When two ids are
/// requested within the same millisecond, the second is bumped forward by one.
#[derive(Debug, Default)]
pub struct IdClock {
    last: DesignId,
}

impl IdClock {
    /// Ids at or past this point are never handed out or trusted from
    /// storage. Millisecond timestamps stay far below it.
    pub const LIMIT: DesignId = i64::MAX as DesignId;

    pub fn new(last: DesignId) -> IdClock {
        return IdClock { last };
    }

    pub fn now_millis() -> DesignId {
        return Utc::now().timestamp_millis().max(0) as DesignId;
    }

    pub fn next(&mut self) -> DesignId {
        return self.next_at(IdClock::now_millis());
    }

    pub fn next_at(&mut self, now: DesignId) -> DesignId {
        let after = self.last.checked_add(1).unwrap_or(DesignId::MAX);
        self.last = now.max(after);
        return self.last;
    }

    /// Makes sure ids already in use are never handed out again.
    pub fn observe(&mut self, id: DesignId) {
        self.last = self.last.max(id);
    }

    /// Whether the clock can keep handing out fresh ids after `id`.
    pub fn accepts(id: DesignId) -> bool {
        return id < IdClock::LIMIT;
    }

    pub fn last(&self) -> DesignId {
        return self.last;
    }
}
