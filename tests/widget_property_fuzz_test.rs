mod common;

use common::{movie_page, star};
use proptest::collection::vec;
use proptest::prelude::*;
use proptest::test_runner::{FileFailurePersistence, TestCaseError, TestCaseResult};
use reelchoice_widgets::{MenuState, Page, RatingConfig, StarRatingWidget, parse_html};

const WIDGET_PROPTEST_REGRESSION_FILE: &str =
    "tests/proptest-regressions/widget_property_fuzz_test.txt";
const DEFAULT_WIDGET_PROPTEST_CASES: u32 = 128;
const STAR_COUNT: u32 = 5;

fn widget_proptest_cases() -> u32 {
    std::env::var("REELCHOICE_WIDGETS_PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_WIDGET_PROPTEST_CASES)
}

#[derive(Clone, Debug)]
enum PageAction {
    ClickTrigger,
    ClickAvatar,
    ClickMenuLink,
    ClickOutside,
    HoverStar(u32),
    HoverGlyph(u32),
    Unhover,
    ClickStar(u32),
    Advance(i64),
}

fn page_action_strategy() -> BoxedStrategy<PageAction> {
    prop_oneof![
        3 => Just(PageAction::ClickTrigger),
        1 => Just(PageAction::ClickAvatar),
        1 => Just(PageAction::ClickMenuLink),
        2 => Just(PageAction::ClickOutside),
        3 => (1..=STAR_COUNT).prop_map(PageAction::HoverStar),
        2 => (1..=STAR_COUNT).prop_map(PageAction::HoverGlyph),
        2 => Just(PageAction::Unhover),
        3 => (1..=STAR_COUNT).prop_map(PageAction::ClickStar),
        2 => (0i64..=200).prop_map(PageAction::Advance),
    ]
    .boxed()
}

fn page_action_sequence_strategy() -> BoxedStrategy<Vec<PageAction>> {
    vec(page_action_strategy(), 1..=32).boxed()
}

fn run_action(page: &mut Page, action: &PageAction) -> reelchoice_widgets::Result<()> {
    match action {
        PageAction::ClickTrigger => page.click("#profileBtn"),
        PageAction::ClickAvatar => page.click("#avatar"),
        PageAction::ClickMenuLink => page.click("#profile-link"),
        PageAction::ClickOutside => page.click("#title"),
        PageAction::HoverStar(value) => page.hover(&star(*value)),
        PageAction::HoverGlyph(value) => page.hover(&format!("{} path", star(*value))),
        PageAction::Unhover => page.unhover(),
        PageAction::ClickStar(value) => page.click(&star(*value)),
        PageAction::Advance(ms) => page.advance_time(*ms),
    }
}

fn fail(err: impl std::fmt::Debug) -> TestCaseError {
    TestCaseError::fail(format!("{err:?}"))
}

/// Replays `actions` against a model of the expected widget state and checks
/// the page after every step.
fn assert_page_matches_model(actions: &[PageAction]) -> TestCaseResult {
    let mut page = Page::from_html(&movie_page(STAR_COUNT, "")).map_err(fail)?;
    let mut open = false;
    let mut committed = 0u32;
    let mut displayed = 0u32;
    let mut hovered: Option<u32> = None;

    for (step, action) in actions.iter().enumerate() {
        run_action(&mut page, action).map_err(fail)?;

        match action {
            PageAction::ClickTrigger | PageAction::ClickAvatar => open = !open,
            PageAction::ClickMenuLink | PageAction::Advance(_) => {}
            PageAction::ClickOutside => open = false,
            PageAction::ClickStar(value) => {
                open = false;
                committed = *value;
                displayed = *value;
            }
            // Moving within the star already under the pointer fires nothing
            // on the star itself.
            PageAction::HoverStar(value) | PageAction::HoverGlyph(value) => {
                if hovered != Some(*value) {
                    hovered = Some(*value);
                    displayed = *value;
                }
            }
            PageAction::Unhover => {
                if hovered.take().is_some() {
                    displayed = committed;
                }
            }
        }

        let expected_menu = if open { MenuState::Open } else { MenuState::Closed };
        prop_assert_eq!(
            page.menu_state(),
            Some(expected_menu),
            "menu state after step {}: {:?}",
            step,
            action
        );
        prop_assert_eq!(
            page.has_class("#profileMenu", "hidden").map_err(fail)?,
            !open,
            "hidden class must project the menu state"
        );

        let expected_field = if committed == 0 {
            String::new()
        } else {
            committed.to_string()
        };
        prop_assert_eq!(page.value("#score-input").map_err(fail)?, expected_field);

        prop_assert_eq!(
            page.selected_stars().map_err(fail)?,
            (1..=displayed).collect::<Vec<_>>(),
            "selection after step {}: {:?}",
            step,
            action
        );

        for timer in page.pending_timers() {
            prop_assert!(timer.due_at > page.now_ms());
            prop_assert!(timer.due_at - page.now_ms() <= 150);
        }
    }

    page.flush().map_err(fail)?;
    for value in 1..=STAR_COUNT {
        prop_assert!(!page.has_class(&star(value), "shadow-lg").map_err(fail)?);
        prop_assert!(!page.has_class(&star(value), "scale-95").map_err(fail)?);
    }

    Ok(())
}

/// Renders `rating` with a widget built directly over `count` stars and checks
/// that selection is exactly `value <= rating`.
fn assert_render_is_threshold(count: u32, rating: u32) -> TestCaseResult {
    let mut html = String::from(r#"<div id="stars">"#);
    for value in 1..=count {
        html.push_str(&format!(r#"<svg data-value="{value}"></svg>"#));
    }
    html.push_str(r#"</div><input id="score-input">"#);

    let mut dom = parse_html(&html).map_err(fail)?;
    let config = RatingConfig::default();
    let widget = StarRatingWidget::attach(&mut dom, &config)
        .map_err(fail)?
        .ok_or_else(|| TestCaseError::fail("widget not attached"))?;

    widget.set_stars(&mut dom, rating).map_err(fail)?;
    for star in widget.stars() {
        let selected = dom
            .class_contains(star.node, &config.selected_class)
            .map_err(fail)?;
        let unselected = dom
            .class_contains(star.node, &config.unselected_class)
            .map_err(fail)?;
        prop_assert_eq!(selected, star.value <= rating);
        prop_assert_eq!(unselected, star.value > rating);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: widget_proptest_cases(),
        failure_persistence: Some(Box::new(
            FileFailurePersistence::Direct(WIDGET_PROPTEST_REGRESSION_FILE),
        )),
        .. ProptestConfig::default()
    })]

    #[test]
    fn page_actions_match_widget_model(actions in page_action_sequence_strategy()) {
        assert_page_matches_model(&actions)?;
    }

    #[test]
    fn star_rendering_is_a_threshold(count in 0u32..=10, rating in 0u32..=11) {
        assert_render_is_threshold(count, rating)?;
    }

    #[test]
    fn outside_click_always_ends_closed(
        prefix in vec(prop_oneof![Just(true), Just(false)], 0..=12),
    ) {
        let mut page = Page::from_html(&movie_page(STAR_COUNT, "")).map_err(fail)?;
        for toggle in &prefix {
            let selector = if *toggle { "#profileBtn" } else { "#logo" };
            page.click(selector).map_err(fail)?;
        }
        page.click("#content").map_err(fail)?;
        prop_assert_eq!(page.menu_state(), Some(MenuState::Closed));
    }
}
