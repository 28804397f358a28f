//! `button_v1`: a labelled host-rendered button, visible while the
//! authority lets this user press it.

#[cfg(test)]
#[path = "button_test.rs"]
mod button_test;

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use super::{Stage, parse_init};
use crate::error::ElementError;
use crate::event::Intent;
use crate::scene::HandleId;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ButtonInit {
    label: String,
    can_be_clicked: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClickPermission {
    can_be_clicked: bool,
}

#[derive(Debug)]
pub struct Button {
    handle: HandleId,
    label: String,
    can_be_clicked: bool,
}

impl Button {
    /// # Errors
    ///
    /// `InvalidInitData` if `label` or `canBeClicked` has the wrong type.
    pub fn new(id: &str, init: &Value, stage: &mut Stage) -> Result<Self, ElementError> {
        let init: ButtonInit = parse_init(id, init)?;
        let handle = stage.scene.create_under("button_v1", stage.scene.root());
        Ok(Self { handle, label: init.label, can_be_clicked: init.can_be_clicked })
    }

    #[must_use]
    pub fn handle(&self) -> HandleId {
        self.handle
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Hosts only show buttons that can be clicked.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.can_be_clicked
    }

    pub fn on_event(&mut self, event: &str, data: &Value) {
        if event != "button.permissionChanged" {
            return;
        }
        match serde_json::from_value::<ClickPermission>(data.clone()) {
            Ok(permission) => self.can_be_clicked = permission.can_be_clicked,
            Err(err) => warn!(event, error = %err, "ignoring malformed button event"),
        }
    }

    pub fn click(&self, id: &str, stage: &mut Stage) {
        if self.can_be_clicked {
            stage.emit(Intent::new("button.click", id, json!({})));
        }
    }
}
