//! Profile menu dropdown.
//!
//! The controller owns an explicit [`MenuState`]. The visibility class on the
//! menu element is only a projection of that state and is rewritten on every
//! transition.

use tracing::{debug, trace};

use crate::Result;
use crate::config::DropdownConfig;
use crate::dom::{Dom, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuState {
    Open,
    Closed,
}

impl MenuState {
    pub fn toggled(self) -> Self {
        match self {
            Self::Open => Self::Closed,
            Self::Closed => Self::Open,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DropdownController {
    trigger: NodeId,
    menu: NodeId,
    hidden_class: String,
    state: MenuState,
}

impl DropdownController {
    /// Looks up the trigger and menu by id. Returns `None` when either is
    /// missing, in which case the page simply has no dropdown behavior.
    pub fn attach(dom: &mut Dom, config: &DropdownConfig) -> Result<Option<Self>> {
        let (Some(trigger), Some(menu)) = (dom.by_id(&config.trigger_id), dom.by_id(&config.menu_id))
        else {
            debug!(
                trigger_id = %config.trigger_id,
                menu_id = %config.menu_id,
                "dropdown elements missing, not attaching"
            );
            return Ok(None);
        };
        Self::new(dom, trigger, menu, &config.hidden_class).map(Some)
    }

    /// Builds a controller over explicit elements. The starting state is read
    /// from markup: the menu is closed iff it carries `hidden_class`.
    pub fn new(dom: &mut Dom, trigger: NodeId, menu: NodeId, hidden_class: &str) -> Result<Self> {
        let state = if dom.class_contains(menu, hidden_class)? {
            MenuState::Closed
        } else {
            MenuState::Open
        };
        let controller = Self {
            trigger,
            menu,
            hidden_class: hidden_class.to_string(),
            state,
        };
        controller.render(dom)?;
        debug!(?state, "dropdown attached");
        Ok(controller)
    }

    pub fn trigger(&self) -> NodeId {
        self.trigger
    }

    pub fn menu(&self) -> NodeId {
        self.menu
    }

    pub fn state(&self) -> MenuState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == MenuState::Open
    }

    pub fn on_trigger_click(&mut self, dom: &mut Dom) -> Result<()> {
        self.set_state(dom, self.state.toggled())
    }

    /// Document-level click handler. Closes the menu unless the click landed
    /// on or inside the trigger or the menu.
    pub fn on_document_click(&mut self, dom: &mut Dom, target: NodeId) -> Result<()> {
        if dom.contains(self.trigger, target) || dom.contains(self.menu, target) {
            return Ok(());
        }
        self.close(dom)
    }

    pub fn open(&mut self, dom: &mut Dom) -> Result<()> {
        self.set_state(dom, MenuState::Open)
    }

    pub fn close(&mut self, dom: &mut Dom) -> Result<()> {
        self.set_state(dom, MenuState::Closed)
    }

    fn set_state(&mut self, dom: &mut Dom, state: MenuState) -> Result<()> {
        if self.state != state {
            trace!(from = ?self.state, to = ?state, "dropdown transition");
        }
        self.state = state;
        self.render(dom)
    }

    pub fn render(&self, dom: &mut Dom) -> Result<()> {
        match self.state {
            MenuState::Open => dom.class_remove(self.menu, &self.hidden_class),
            MenuState::Closed => dom.class_add(self.menu, &self.hidden_class),
        }
    }
}
