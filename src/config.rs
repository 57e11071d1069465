//! Element ids, class names and timing used by the widgets.
//!
//! Defaults match the ReelChoice templates. A TOML file can override any
//! field:
//!
//! ```toml
//! [dropdown]
//! hidden_class = "is-hidden"
//!
//! [rating]
//! pulse_ms = 200
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WidgetConfig {
    pub dropdown: DropdownConfig,
    pub rating: RatingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DropdownConfig {
    pub trigger_id: String,
    pub menu_id: String,
    pub hidden_class: String,
}

impl Default for DropdownConfig {
    fn default() -> Self {
        Self {
            trigger_id: "profileBtn".into(),
            menu_id: "profileMenu".into(),
            hidden_class: "hidden".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RatingConfig {
    pub container_id: String,
    pub score_field_id: String,
    /// Matched against descendants of the container, in document order.
    pub star_selector: String,
    pub value_attr: String,
    pub selected_class: String,
    pub unselected_class: String,
    /// Added on click and removed `pulse_ms` later.
    pub pulse_classes: Vec<String>,
    /// Added on click and left in place.
    pub transition_classes: Vec<String>,
    pub pulse_ms: i64,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            container_id: "stars".into(),
            score_field_id: "score-input".into(),
            star_selector: "svg".into(),
            value_attr: "data-value".into(),
            selected_class: "text-[#BA4040]".into(),
            unselected_class: "text-[#424242]".into(),
            pulse_classes: vec!["shadow-lg".into(), "scale-95".into()],
            transition_classes: vec!["transition-all".into()],
            pulse_ms: 150,
        }
    }
}

impl WidgetConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(source).map_err(|err| Error::Config(format!("invalid TOML: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|err| Error::Config(format!("cannot read {}: {err}", path.display())))?;
        Self::from_toml_str(&source)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|err| Error::Config(format!("cannot serialize: {err}")))
    }

    pub fn validate(&self) -> Result<()> {
        self.dropdown.validate()?;
        self.rating.validate()
    }
}

impl DropdownConfig {
    fn validate(&self) -> Result<()> {
        require_token("dropdown.trigger_id", &self.trigger_id)?;
        require_token("dropdown.menu_id", &self.menu_id)?;
        require_token("dropdown.hidden_class", &self.hidden_class)
    }
}

impl RatingConfig {
    fn validate(&self) -> Result<()> {
        require_token("rating.container_id", &self.container_id)?;
        require_token("rating.score_field_id", &self.score_field_id)?;
        require_token("rating.value_attr", &self.value_attr)?;
        require_token("rating.selected_class", &self.selected_class)?;
        require_token("rating.unselected_class", &self.unselected_class)?;
        if self.star_selector.trim().is_empty() {
            return Err(Error::Config("rating.star_selector must not be empty".into()));
        }
        if self.selected_class == self.unselected_class {
            return Err(Error::Config(
                "rating.selected_class and rating.unselected_class must differ".into(),
            ));
        }
        for class_name in self.pulse_classes.iter().chain(&self.transition_classes) {
            require_token("rating pulse/transition class", class_name)?;
        }
        if let Some(clash) = self
            .pulse_classes
            .iter()
            .find(|name| **name == self.selected_class || **name == self.unselected_class)
        {
            return Err(Error::Config(format!(
                "pulse class {clash:?} collides with a selection class"
            )));
        }
        if self.pulse_ms < 0 {
            return Err(Error::Config(format!(
                "rating.pulse_ms must be non-negative, got {}",
                self.pulse_ms
            )));
        }
        Ok(())
    }
}

/// Ids and class names are single whitespace-free tokens.
fn require_token(field: &str, value: &str) -> Result<()> {
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        return Err(Error::Config(format!(
            "{field} must be a non-empty token without whitespace, got {value:?}"
        )));
    }
    Ok(())
}
