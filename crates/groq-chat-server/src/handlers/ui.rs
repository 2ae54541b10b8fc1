use axum::{extract::State, response::Html};
use std::sync::Arc;

use crate::config::{Settings, UiVariant};

const TEXTBOX_PAGE: &str = include_str!("../assets/textbox.html");
const CHAT_PAGE: &str = include_str!("../assets/chat.html");

pub async fn index(State(settings): State<Arc<Settings>>) -> Html<String> {
    Html(render_page(&settings))
}

pub fn render_page(settings: &Settings) -> String {
    let template = match settings.ui.variant {
        UiVariant::Textbox => TEXTBOX_PAGE,
        UiVariant::Chat => CHAT_PAGE,
    };

    template
        .replace("{{TITLE}}", &escape_html(&settings.ui.title))
        .replace("{{DESCRIPTION}}", &escape_html(&settings.ui.description))
        .replace("{{TEMPERATURE}}", &settings.llm.default_temperature.to_string())
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
