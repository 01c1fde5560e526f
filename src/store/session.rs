//! Session cells: which device, user, stage and group this client is

use parking_lot::Mutex;

use crate::model::TurnConfig;

/// One independently lockable optional id
#[derive(Debug, Default)]
pub struct SessionCell {
    value: Mutex<Option<String>>,
}

impl SessionCell {
    pub fn get(&self) -> Option<String> {
        self.value.lock().clone()
    }

    pub fn set(&self, value: impl Into<String>) {
        *self.value.lock() = Some(value.into());
    }

    pub fn reset(&self) {
        *self.value.lock() = None;
    }

    pub fn is_set(&self) -> bool {
        self.value.lock().is_some()
    }

    /// True if the cell holds exactly `value`
    pub fn is(&self, value: &str) -> bool {
        self.value.lock().as_deref() == Some(value)
    }
}

/// Identity of the local client within the replicated world
///
/// Each cell has its own lock. Reading two cells is not atomic with respect
/// to a concurrent writer.
#[derive(Debug, Default)]
pub struct Session {
    pub local_device_id: SessionCell,
    pub user_id: SessionCell,
    pub stage_id: SessionCell,
    pub group_id: SessionCell,
    pub stage_member_id: SessionCell,
    pub stage_device_id: SessionCell,
    turn: Mutex<TurnConfig>,
}

impl Session {
    pub fn turn(&self) -> TurnConfig {
        self.turn.lock().clone()
    }

    pub fn set_turn(&self, turn: TurnConfig) {
        *self.turn.lock() = turn;
    }

    /// Replace only the TURN url list, keeping the credentials
    pub fn set_turn_urls(&self, urls: Vec<String>) {
        self.turn.lock().urls = urls;
    }

    /// Forget everything tied to the current stage
    pub fn reset_stage(&self) {
        self.stage_id.reset();
        self.group_id.reset();
        self.stage_member_id.reset();
        self.stage_device_id.reset();
    }
}
