#[cfg(test)]
#[path = "active_view_test.rs"]
mod tests;

use crate::domain::models::DesignError;
use crate::domain::models::DesignHistoryItem;
use crate::domain::models::DesignSession;
use crate::domain::models::ImageState;
use crate::domain::models::Plant;

/// Identifies one prompt submission. Only the latest one may update the view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvocationToken(u64);

/// What is currently on screen: the image being edited, the latest design,
/// its plants, and the in-flight flags.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActiveView {
    pub original_image: Option<ImageState>,
    pub generated_image: Option<ImageState>,
    pub plants: Vec<Plant>,
    pub is_generating: bool,
    pub is_identifying: bool,
    pub error_message: Option<String>,
    invocation: u64,
}

impl ActiveView {
    pub fn show_upload(&mut self, image: ImageState) {
        self.replace(Some(image), None);
    }

    /// Plants are not persisted, so a resumed session always starts without
    /// them.
    pub fn show_session(&mut self, session: &DesignSession) {
        self.replace(
            Some(session.base_image.clone()),
            session.latest_design().cloned(),
        );
    }

    /// Uses a past design as the new image to edit.
    pub fn show_branch(&mut self, item: &DesignHistoryItem) {
        self.replace(Some(item.generated_image.clone()), None);
    }

    pub fn reset(&mut self) {
        self.replace(None, None);
    }

    pub fn show_error(&mut self, err: &DesignError) {
        self.error_message = Some(err.to_string());
    }

    pub fn is_busy(&self) -> bool {
        return self.is_generating || self.is_identifying;
    }

    pub fn is_current(&self, token: InvocationToken) -> bool {
        return self.invocation == token.0;
    }

    pub fn begin_generation(&mut self) -> InvocationToken {
        self.invocation += 1;
        self.is_generating = true;
        self.is_identifying = true;
        self.generated_image = None;
        self.plants = vec![];
        self.error_message = None;

        return InvocationToken(self.invocation);
    }

    /// The generating flag stays up until identification settles.
    pub fn apply_generated(&mut self, token: InvocationToken, image: ImageState) -> bool {
        if !self.is_current(token) {
            return false;
        }

        self.generated_image = Some(image);
        return true;
    }

    pub fn apply_generation_failure(&mut self, token: InvocationToken, err: &DesignError) -> bool {
        if !self.is_current(token) {
            return false;
        }

        self.generated_image = None;
        self.plants = vec![];
        self.error_message = Some(err.to_string());
        self.settle();
        return true;
    }

    pub fn apply_plants(&mut self, token: InvocationToken, plants: Vec<Plant>) -> bool {
        if !self.is_current(token) {
            return false;
        }

        self.plants = plants;
        self.settle();
        return true;
    }

    pub fn apply_identification_failure(
        &mut self,
        token: InvocationToken,
        warning: &DesignError,
    ) -> bool {
        if !self.is_current(token) {
            return false;
        }

        self.plants = vec![];
        self.error_message = Some(warning.to_string());
        self.settle();
        return true;
    }

    fn settle(&mut self) {
        self.is_generating = false;
        self.is_identifying = false;
    }

    // Any in-flight invocation loses the view once something else is shown.
    fn replace(&mut self, original: Option<ImageState>, generated: Option<ImageState>) {
        self.invocation += 1;
        self.original_image = original;
        self.generated_image = generated;
        self.plants = vec![];
        self.error_message = None;
        self.settle();
    }
}
