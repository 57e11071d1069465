//! Profile dropdown and star-rating widgets for ReelChoice pages.
//!
//! The widgets run against an in-memory [`Page`]: markup is parsed into a
//! [`Dom`], document-ready attaches the components, and user input is replayed
//! with [`Page::click`], [`Page::hover`] and [`Page::unhover`]. Timed behavior
//! (the rating pulse) runs on a virtual clock advanced with
//! [`Page::advance_time`], so every scenario is deterministic.
//!
//! ```
//! use reelchoice_widgets::{MenuState, Page};
//!
//! let mut page = Page::from_html(
//!     r#"<button id="profileBtn">Me</button>
//!        <div id="profileMenu" class="hidden">...</div>
//!        <div id="stars"><svg data-value="1"></svg><svg data-value="2"></svg></div>
//!        <input type="hidden" id="score-input" value="">"#,
//! )?;
//!
//! page.click("#profileBtn")?;
//! assert_eq!(page.menu_state(), Some(MenuState::Open));
//!
//! page.click("[data-value='2']")?;
//! page.assert_value("#score-input", "2")?;
//! assert_eq!(page.menu_state(), Some(MenuState::Closed));
//!
//! page.advance_time(150)?;
//! page.assert_class("[data-value='2']", "shadow-lg", false)?;
//! # Ok::<(), reelchoice_widgets::Error>(())
//! ```
//!
//! The components can also be driven directly: [`DropdownController`] and
//! [`StarRatingWidget`] take the elements they work on as arguments.

pub mod config;
pub mod dom;
pub mod dropdown;
pub mod events;
pub mod html;
pub mod page;
pub mod rating;
pub(crate) mod selector;
pub mod timers;
pub(crate) mod trace;

pub use config::{DropdownConfig, RatingConfig, WidgetConfig};
pub use dom::{Dom, NodeId};
pub use dropdown::{DropdownController, MenuState};
pub use events::EventType;
pub use html::parse_html;
pub use page::Page;
pub use rating::{RatingState, Star, StarRatingWidget};
pub use timers::{PendingTimer, TimerAction, TimerId, TimerQueue};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("html parse error: {0}")]
    HtmlParse(String),
    #[error("selector not found: {0}")]
    SelectorNotFound(String),
    #[error("unsupported selector: {0}")]
    UnsupportedSelector(String),
    #[error("dom error: {0}")]
    Dom(String),
    #[error("configuration error: {0}")]
    Config(String),
    /// A star's rank attribute is missing or not a positive integer.
    /// `position` is 1-based in document order.
    #[error("star {position} has invalid rank {raw:?}")]
    InvalidStarRank { position: usize, raw: String },
    #[error("timer error: {0}")]
    Timer(String),
    #[error(
        "assertion failed for {selector}: expected {expected}, actual {actual}, snippet {dom_snippet}"
    )]
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },
}
