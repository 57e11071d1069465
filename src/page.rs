//! Deterministic page host for the widgets.
//!
//! A [`Page`] owns the parsed document, the listener registry and a virtual
//! clock. Firing document-ready attaches the dropdown and rating widgets.
//! After that, `click`/`hover`/`unhover` dispatch DOM-style events to them and
//! `advance_time` runs whatever timers have come due.

use tracing::debug;

use crate::config::WidgetConfig;
use crate::dom::{Dom, NodeId, truncate_chars};
use crate::dropdown::{DropdownController, MenuState};
use crate::events::{EventState, EventType, Listener, ListenerStore};
use crate::html::parse_html;
use crate::rating::{RatingState, StarRatingWidget};
use crate::timers::{PendingTimer, ScheduledTask, TimerAction, TimerQueue};
use crate::trace::TraceLog;
use crate::{Error, Result};

pub struct Page {
    dom: Dom,
    listeners: ListenerStore,
    timers: TimerQueue,
    config: WidgetConfig,
    dropdown: Option<DropdownController>,
    rating: Option<StarRatingWidget>,
    hovered: Option<NodeId>,
    ready_fired: bool,
    timer_step_limit: usize,
    trace: TraceLog,
}

impl Page {
    /// Parses `html` with the default configuration and fires document-ready.
    pub fn from_html(html: &str) -> Result<Self> {
        Self::from_html_with_config(html, WidgetConfig::default())
    }

    pub fn from_html_with_config(html: &str, config: WidgetConfig) -> Result<Self> {
        let mut page = Self::parse(html, config)?;
        page.dom_content_loaded()?;
        Ok(page)
    }

    /// Parses `html` without firing document-ready, so no widget is attached
    /// yet.
    pub fn parse(html: &str, config: WidgetConfig) -> Result<Self> {
        config.validate()?;
        let dom = parse_html(html)?;
        Ok(Self {
            dom,
            listeners: ListenerStore::default(),
            timers: TimerQueue::new(),
            config,
            dropdown: None,
            rating: None,
            hovered: None,
            ready_fired: false,
            timer_step_limit: 10_000,
            trace: TraceLog::default(),
        })
    }

    /// Fires the one-shot document-ready event. Returns `false` if it already
    /// fired.
    pub fn dom_content_loaded(&mut self) -> Result<bool> {
        if self.ready_fired {
            return Ok(false);
        }
        self.ready_fired = true;
        self.trace.event("[event] DOMContentLoaded".into());

        self.attach_dropdown()?;
        self.attach_rating()?;
        debug!(
            dropdown = self.dropdown.is_some(),
            rating = self.rating.is_some(),
            listeners = self.listeners.count(),
            "document ready"
        );
        Ok(true)
    }

    fn attach_dropdown(&mut self) -> Result<()> {
        let Some(controller) = DropdownController::attach(&mut self.dom, &self.config.dropdown)?
        else {
            return Ok(());
        };
        self.listeners
            .add(controller.trigger(), EventType::Click, Listener::DropdownTrigger);
        self.listeners
            .add(self.dom.root(), EventType::Click, Listener::DropdownDocument);
        self.dropdown = Some(controller);
        Ok(())
    }

    fn attach_rating(&mut self) -> Result<()> {
        let Some(widget) = StarRatingWidget::attach(&mut self.dom, &self.config.rating)? else {
            return Ok(());
        };
        for (idx, star) in widget.stars().iter().enumerate() {
            self.listeners
                .add(star.node, EventType::MouseEnter, Listener::StarEnter(idx));
            self.listeners
                .add(star.node, EventType::MouseLeave, Listener::StarLeave(idx));
            self.listeners
                .add(star.node, EventType::Click, Listener::StarClick(idx));
        }
        self.rating = Some(widget);
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.ready_fired
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    pub fn dropdown(&self) -> Option<&DropdownController> {
        self.dropdown.as_ref()
    }

    pub fn rating(&self) -> Option<&StarRatingWidget> {
        self.rating.as_ref()
    }

    pub fn menu_state(&self) -> Option<MenuState> {
        self.dropdown.as_ref().map(DropdownController::state)
    }

    pub fn rating_state(&self) -> Result<Option<RatingState>> {
        self.rating
            .as_ref()
            .map(|widget| widget.state(&self.dom))
            .transpose()
    }

    /// Ranks of the stars currently rendered as selected. Empty without a
    /// rating widget.
    pub fn selected_stars(&self) -> Result<Vec<u32>> {
        match &self.rating {
            Some(widget) => widget.selected_values(&self.dom),
            None => Ok(Vec::new()),
        }
    }

    pub fn click(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.dispatch_event(target, EventType::Click)
    }

    /// Moves the pointer onto the element. Elements the pointer leaves get
    /// `mouseleave` innermost first, then elements it newly enters get
    /// `mouseenter` outermost first. Ancestors shared by the old and new
    /// position get neither.
    pub fn hover(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.hovered == Some(target) {
            return Ok(());
        }
        let previous = self.hovered.take();
        let left = self.hover_chain(previous);
        let entered = self.hover_chain(Some(target));
        self.hovered = Some(target);

        for node in left.iter().filter(|node| !entered.contains(node)) {
            self.dispatch_event(*node, EventType::MouseLeave)?;
        }
        for node in entered.iter().rev().filter(|node| !left.contains(node)) {
            self.dispatch_event(*node, EventType::MouseEnter)?;
        }
        Ok(())
    }

    /// Moves the pointer off the page. Every element under it gets
    /// `mouseleave`, innermost first. No-op when nothing is hovered.
    pub fn unhover(&mut self) -> Result<()> {
        let previous = self.hovered.take();
        for node in self.hover_chain(previous) {
            self.dispatch_event(node, EventType::MouseLeave)?;
        }
        Ok(())
    }

    /// The hovered element and its ancestors, innermost first.
    fn hover_chain(&self, hovered: Option<NodeId>) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut cursor = hovered;
        while let Some(node) = cursor {
            chain.push(node);
            cursor = self.dom.parent(node);
        }
        chain
    }

    pub fn hovered(&self) -> Option<NodeId> {
        self.hovered
    }

    /// Sets a form control's live value without dispatching events, like a
    /// script assignment would.
    pub fn set_value(&mut self, selector: &str, value: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.dom.set_value(target, value)
    }

    /// Detaches the element from the document. Pending timers that target it
    /// still run.
    pub fn remove_element(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.hovered.is_some_and(|hovered| self.dom.contains(target, hovered)) {
            self.hovered = None;
        }
        self.dom.detach(target);
        Ok(())
    }

    fn dispatch_event(&mut self, target: NodeId, event_type: EventType) -> Result<()> {
        let mut event = EventState::new(event_type, target);

        let mut path = vec![target];
        if event_type.bubbles() {
            let mut cursor = self.dom.parent(target);
            while let Some(node) = cursor {
                path.push(node);
                cursor = self.dom.parent(node);
            }
        }

        for node in path {
            event.current_target = node;
            self.invoke_listeners(node, &event)?;
        }

        self.trace_event_done(&event);
        Ok(())
    }

    fn invoke_listeners(&mut self, node_id: NodeId, event: &EventState) -> Result<()> {
        let listeners = self.listeners.get(node_id, event.event_type);
        for listener in listeners {
            if self.trace.is_enabled() {
                let phase = if event.current_target == event.target {
                    "target"
                } else {
                    "bubble"
                };
                let line = format!(
                    "[event] {} target={} current={} phase={} listener={:?}",
                    event.event_type,
                    self.dom.node_label(event.target),
                    self.dom.node_label(event.current_target),
                    phase,
                    listener
                );
                self.trace.event(line);
            }
            self.run_listener(listener, event)?;
        }
        Ok(())
    }

    fn run_listener(&mut self, listener: Listener, event: &EventState) -> Result<()> {
        match listener {
            Listener::DropdownTrigger => {
                if let Some(dropdown) = self.dropdown.as_mut() {
                    dropdown.on_trigger_click(&mut self.dom)?;
                }
            }
            Listener::DropdownDocument => {
                if let Some(dropdown) = self.dropdown.as_mut() {
                    dropdown.on_document_click(&mut self.dom, event.target)?;
                }
            }
            Listener::StarEnter(idx) => {
                if let Some(widget) = self.rating.as_ref() {
                    widget.hover(&mut self.dom, idx)?;
                }
            }
            Listener::StarLeave(_) => {
                if let Some(widget) = self.rating.as_ref() {
                    widget.unhover(&mut self.dom)?;
                }
            }
            Listener::StarClick(idx) => {
                if let Some(widget) = self.rating.as_mut() {
                    let id = widget.click(&mut self.dom, &mut self.timers, idx)?;
                    if let Some(timer) = self.timers.pending().into_iter().find(|t| t.id == id) {
                        self.trace.timer(format!(
                            "[timer] schedule timeout id={} due_at={} delay_ms={}",
                            id,
                            timer.due_at,
                            timer.due_at - self.timers.now_ms()
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    fn trace_event_done(&mut self, event: &EventState) {
        if !self.trace.is_enabled() {
            return;
        }
        let line = format!(
            "[event] done {} target={} current={}",
            event.event_type,
            self.dom.node_label(event.target),
            self.dom.node_label(event.current_target),
        );
        self.trace.event(line);
    }

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace.set_enabled(enabled);
    }

    pub fn set_trace_events(&mut self, enabled: bool) {
        self.trace.set_events(enabled);
    }

    pub fn set_trace_timers(&mut self, enabled: bool) {
        self.trace.set_timers(enabled);
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        self.trace.set_limit(max_entries)
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        self.trace.take()
    }

    pub fn set_timer_step_limit(&mut self, max_steps: usize) -> Result<()> {
        if max_steps == 0 {
            return Err(Error::Timer(
                "set_timer_step_limit requires at least 1 step".into(),
            ));
        }
        self.timer_step_limit = max_steps;
        Ok(())
    }

    pub fn now_ms(&self) -> i64 {
        self.timers.now_ms()
    }

    pub fn pending_timers(&self) -> Vec<PendingTimer> {
        self.timers.pending()
    }

    pub fn clear_all_timers(&mut self) -> usize {
        let cleared = self.timers.clear_all();
        self.trace
            .timer(format!("[timer] clear_all cleared={cleared}"));
        cleared
    }

    pub fn advance_time(&mut self, delta_ms: i64) -> Result<()> {
        if delta_ms < 0 {
            return Err(Error::Timer(
                "advance_time requires non-negative milliseconds".into(),
            ));
        }
        let from = self.now_ms();
        let target = from.saturating_add(delta_ms);
        let ran = self.run_timer_queue(Some(target))?;
        self.timers.set_now(target);
        self.trace.timer(format!(
            "[timer] advance delta_ms={delta_ms} from={from} to={target} ran_due={ran}"
        ));
        Ok(())
    }

    pub fn advance_time_to(&mut self, target_ms: i64) -> Result<()> {
        let from = self.now_ms();
        if target_ms < from {
            return Err(Error::Timer(format!(
                "advance_time_to requires target >= now_ms (target={target_ms}, now_ms={from})"
            )));
        }
        let ran = self.run_timer_queue(Some(target_ms))?;
        self.timers.set_now(target_ms);
        self.trace.timer(format!(
            "[timer] advance_to from={from} to={target_ms} ran_due={ran}"
        ));
        Ok(())
    }

    /// Runs every pending timer, moving the clock to each one's due time.
    pub fn flush(&mut self) -> Result<()> {
        let from = self.now_ms();
        let ran = self.run_timer_queue(None)?;
        self.trace.timer(format!(
            "[timer] flush from={from} to={} ran={ran}",
            self.now_ms()
        ));
        Ok(())
    }

    pub fn run_due_timers(&mut self) -> Result<usize> {
        let ran = self.run_timer_queue(Some(self.now_ms()))?;
        self.trace
            .timer(format!("[timer] run_due now_ms={} ran={ran}", self.now_ms()));
        Ok(ran)
    }

    pub fn run_next_timer(&mut self) -> Result<bool> {
        let Some(task) = self.timers.pop_next(None) else {
            self.trace.timer("[timer] run_next none".into());
            return Ok(false);
        };
        self.execute_timer_task(task)?;
        Ok(true)
    }

    fn run_timer_queue(&mut self, due_limit: Option<i64>) -> Result<usize> {
        let mut steps = 0usize;
        while let Some(next) = self.timers.peek_next(due_limit) {
            steps += 1;
            if steps > self.timer_step_limit {
                return Err(self.timer_step_limit_error(steps, due_limit, next));
            }
            let Some(task) = self.timers.pop_next(due_limit) else {
                break;
            };
            self.execute_timer_task(task)?;
        }
        Ok(steps)
    }

    fn timer_step_limit_error(
        &self,
        steps: usize,
        due_limit: Option<i64>,
        next: &ScheduledTask,
    ) -> Error {
        let due_limit_desc = due_limit
            .map(|value| value.to_string())
            .unwrap_or_else(|| "none".into());
        Error::Timer(format!(
            "timer queue exceeded max steps: limit={}, steps={steps}, now_ms={}, due_limit={due_limit_desc}, pending_tasks={}, next_task=id={},due_at={}",
            self.timer_step_limit,
            self.now_ms(),
            self.timers.len(),
            next.id,
            next.due_at
        ))
    }

    fn execute_timer_task(&mut self, task: ScheduledTask) -> Result<()> {
        self.timers.set_now(task.due_at);
        self.trace.timer(format!(
            "[timer] run id={} due_at={} now_ms={}",
            task.id,
            task.due_at,
            self.now_ms()
        ));

        match task.action {
            TimerAction::RemoveClasses { node, classes } => {
                for class_name in &classes {
                    self.dom.class_remove(node, class_name)?;
                }
                if let Some(widget) = self.rating.as_mut() {
                    widget.pulse_elapsed(node, task.id);
                }
            }
        }
        Ok(())
    }

    pub fn value(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        self.dom.value(target)
    }

    pub fn has_class(&self, selector: &str, class_name: &str) -> Result<bool> {
        let target = self.select_one(selector)?;
        self.dom.class_contains(target, class_name)
    }

    pub fn class_list(&self, selector: &str) -> Result<Vec<String>> {
        let target = self.select_one(selector)?;
        self.dom.class_list(target)
    }

    pub fn assert_value(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.value(target)?;
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual,
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    /// Asserts whether the element carries `class_name`.
    pub fn assert_class(&self, selector: &str, class_name: &str, expected: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.class_contains(target, class_name)?;
        if actual != expected {
            let describe = |present: bool| {
                if present {
                    format!("class {class_name:?} present")
                } else {
                    format!("class {class_name:?} absent")
                }
            };
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: describe(expected),
                actual: describe(actual),
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_exists(&self, selector: &str) -> Result<()> {
        let _ = self.select_one(selector)?;
        Ok(())
    }

    pub fn dump_dom(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        self.dom
            .dump_node(target)
            .ok_or_else(|| Error::Dom(format!("{selector} matched a node outside the document")))
    }

    fn select_one(&self, selector: &str) -> Result<NodeId> {
        self.dom
            .query_selector(selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    fn node_snippet(&self, node_id: NodeId) -> String {
        truncate_chars(&self.dom.dump_node(node_id).unwrap_or_default(), 200)
    }
}
