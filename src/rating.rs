//! Star rating input.
//!
//! The committed rating lives in the bound score field, which the surrounding
//! form owns and submits. The widget derives everything else from it: hover
//! previews a value without touching the field, and leaving the stars renders
//! whatever the field holds again.
//!
//! Star ranks are validated once, when the widget is built. A star without a
//! positive integer rank is a markup error and fails construction.

use std::collections::HashMap;

use tracing::{debug, trace, warn};

use crate::config::RatingConfig;
use crate::dom::{Dom, NodeId};
use crate::timers::{TimerAction, TimerId, TimerQueue};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingState {
    Uncommitted,
    Committed(u32),
}

impl RatingState {
    /// Reads a score field value. Anything that is not a positive integer
    /// counts as no rating.
    pub fn from_field(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Uncommitted;
        }
        match trimmed.parse::<u32>() {
            Ok(0) => Self::Uncommitted,
            Ok(value) => Self::Committed(value),
            Err(_) => {
                warn!(value = raw, "score field does not hold an integer, treating as unrated");
                Self::Uncommitted
            }
        }
    }

    /// The rating to render: the committed value, or 0.
    pub fn rating(self) -> u32 {
        match self {
            Self::Uncommitted => 0,
            Self::Committed(value) => value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Star {
    pub node: NodeId,
    pub value: u32,
}

#[derive(Debug, Clone)]
pub struct StarRatingWidget {
    stars: Vec<Star>,
    score_field: NodeId,
    config: RatingConfig,
    pulses: HashMap<NodeId, TimerId>,
}

impl StarRatingWidget {
    /// Finds the container and score field by id, builds the widget and
    /// renders the persisted rating. Missing elements give `Ok(None)`.
    pub fn attach(dom: &mut Dom, config: &RatingConfig) -> Result<Option<Self>> {
        let (Some(container), Some(score_field)) = (
            dom.by_id(&config.container_id),
            dom.by_id(&config.score_field_id),
        ) else {
            debug!(
                container_id = %config.container_id,
                score_field_id = %config.score_field_id,
                "rating elements missing, not attaching"
            );
            return Ok(None);
        };

        let widget = Self::new(dom, container, score_field, config.clone())?;
        widget.init(dom)?;
        Ok(Some(widget))
    }

    /// Collects the stars under `container` and validates their ranks. Does
    /// not render; call [`init`](Self::init) for that.
    pub fn new(dom: &Dom, container: NodeId, score_field: NodeId, config: RatingConfig) -> Result<Self> {
        let nodes = dom.query_selector_all_from(container, &config.star_selector)?;
        let mut stars = Vec::with_capacity(nodes.len());
        for (idx, node) in nodes.into_iter().enumerate() {
            let raw = dom.attr(node, &config.value_attr);
            let value = raw
                .as_deref()
                .and_then(parse_rank)
                .ok_or_else(|| Error::InvalidStarRank {
                    position: idx + 1,
                    raw: raw.clone().unwrap_or_default(),
                })?;
            stars.push(Star { node, value });
        }
        debug!(stars = stars.len(), "rating widget built");

        Ok(Self {
            stars,
            score_field,
            config,
            pulses: HashMap::new(),
        })
    }

    pub fn stars(&self) -> &[Star] {
        &self.stars
    }

    pub fn score_field(&self) -> NodeId {
        self.score_field
    }

    fn star(&self, index: usize) -> Result<Star> {
        self.stars
            .get(index)
            .copied()
            .ok_or_else(|| Error::Dom(format!("no star at index {index}")))
    }

    pub fn state(&self, dom: &Dom) -> Result<RatingState> {
        Ok(RatingState::from_field(&dom.value(self.score_field)?))
    }

    pub fn init(&self, dom: &mut Dom) -> Result<()> {
        let state = self.state(dom)?;
        debug!(?state, "rating widget initialized");
        self.set_stars(dom, state.rating())
    }

    /// Previews `stars[index]` without committing it.
    pub fn hover(&self, dom: &mut Dom, index: usize) -> Result<()> {
        let star = self.star(index)?;
        self.set_stars(dom, star.value)
    }

    pub fn unhover(&self, dom: &mut Dom) -> Result<()> {
        let state = self.state(dom)?;
        self.set_stars(dom, state.rating())
    }

    /// Commits `stars[index]` to the score field and pulses that star. A
    /// pulse still pending on the same star is replaced, so the emphasis
    /// lasts `pulse_ms` from the latest click.
    pub fn click(&mut self, dom: &mut Dom, timers: &mut TimerQueue, index: usize) -> Result<TimerId> {
        let star = self.star(index)?;
        dom.set_value(self.score_field, &star.value.to_string())?;
        self.set_stars(dom, star.value)?;

        for class_name in self
            .config
            .transition_classes
            .iter()
            .chain(&self.config.pulse_classes)
        {
            dom.class_add(star.node, class_name)?;
        }

        if let Some(previous) = self.pulses.remove(&star.node) {
            timers.clear_timeout(previous);
        }
        let id = timers.schedule_timeout(
            self.config.pulse_ms,
            TimerAction::RemoveClasses {
                node: star.node,
                classes: self.config.pulse_classes.clone(),
            },
        );
        self.pulses.insert(star.node, id);
        debug!(value = star.value, timer = id, "rating committed");
        Ok(id)
    }

    /// Forgets the pending pulse for `node` once timer `id` has run.
    pub fn pulse_elapsed(&mut self, node: NodeId, id: TimerId) {
        if self.pulses.get(&node) == Some(&id) {
            self.pulses.remove(&node);
        }
    }

    pub fn pending_pulse(&self, node: NodeId) -> Option<TimerId> {
        self.pulses.get(&node).copied()
    }

    /// Renders `rating` over every star: ranks up to `rating` get the
    /// selected class, the rest get the unselected class.
    pub fn set_stars(&self, dom: &mut Dom, rating: u32) -> Result<()> {
        trace!(rating, "render stars");
        let selected = &self.config.selected_class;
        let unselected = &self.config.unselected_class;
        for star in &self.stars {
            if star.value <= rating {
                dom.class_add(star.node, selected)?;
                dom.class_remove(star.node, unselected)?;
            } else {
                dom.class_add(star.node, unselected)?;
                dom.class_remove(star.node, selected)?;
            }
        }
        Ok(())
    }

    /// Ranks of the stars currently showing the selected class.
    pub fn selected_values(&self, dom: &Dom) -> Result<Vec<u32>> {
        let mut values = Vec::new();
        for star in &self.stars {
            if dom.class_contains(star.node, &self.config.selected_class)? {
                values.push(star.value);
            }
        }
        Ok(values)
    }
}

fn parse_rank(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|value| *value > 0)
}
