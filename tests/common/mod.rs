#![allow(dead_code)]

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Routes library logs to the test writer. Filter with `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

pub const SELECTED: &str = "text-[#BA4040]";
pub const UNSELECTED: &str = "text-[#424242]";

/// Movie detail page as rendered by the ReelChoice templates, with `stars`
/// rating stars and the score field pre-filled with `score`.
pub fn movie_page(stars: u32, score: &str) -> String {
    let mut html = String::from(
        r#"<!DOCTYPE html>
<html>
<body>
  <header class="flex justify-between">
    <a href="/" id="logo">ReelChoice</a>
    <div class="relative">
      <button id="profileBtn" type="button" class="rounded-full">
        <img id="avatar" src="/static/img/avatar.png" alt="profile">
      </button>
      <div id="profileMenu" class="hidden absolute right-0">
        <a id="profile-link" href="/profile/">Profile</a>
        <a id="logout-link" href="/logout/">Log out</a>
      </div>
    </div>
  </header>
  <main id="content">
    <h1 id="title">Arrival</h1>
    <form id="rating-form" method="post" action="/movie/1/rate/">
      <div id="stars" class="flex gap-1">
"#,
    );
    for value in 1..=stars {
        html.push_str(&format!(
            "        <svg id=\"star-{value}\" data-value=\"{value}\" class=\"w-8 h-8 cursor-pointer\" viewBox=\"0 0 24 24\"><path d=\"M12 2l3 7h7l-6 4 2 7-6-4-6 4 2-7-6-4h7z\"/></svg>\n"
        ));
    }
    html.push_str(&format!(
        r#"      </div>
      <input type="hidden" name="score" id="score-input" value="{score}">
      <button type="submit" id="submit-rating">Rate</button>
    </form>
  </main>
  <script src="/static/js/profile-dropdown.js"></script>
  <script src="/static/js/stars-filled.js"></script>
</body>
</html>
"#
    ));
    html
}

pub fn star(value: u32) -> String {
    format!("#star-{value}")
}
