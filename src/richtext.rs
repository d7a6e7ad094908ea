//! Rich text runs and the inline style engine.
//!
//! A run is a contiguous span of text sharing one style/link combination.
//! [`InlineCollector`] folds a stream of inline markdown events into runs;
//! [`render`] is the inverse, producing markdown text with style markers.

use serde_json::{json, Value};

/// Inline style flags carried by a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextStyle {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub code: bool,
}

/// A contiguous span of text with one style/link combination.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RichText {
    pub content: String,
    pub style: TextStyle,
    pub link: Option<String>,
}

impl RichText {
    /// Create a run. Relative and anchor links are dropped silently; the
    /// remote API rejects anything that is not an absolute http(s) URL.
    pub fn new(content: impl Into<String>, style: TextStyle, link: Option<&str>) -> Self {
        Self {
            content: content.into(),
            style,
            link: link.filter(|url| is_absolute_url(url)).map(str::to_string),
        }
    }

    pub fn plain(content: impl Into<String>) -> Self {
        Self::new(content, TextStyle::default(), None)
    }

    /// Wire representation: a Notion `rich_text` array element.
    pub fn to_value(&self) -> Value {
        let mut text = json!({ "content": self.content });
        if let Some(url) = &self.link {
            text["link"] = json!({ "url": url });
        }
        json!({
            "type": "text",
            "text": text,
            "annotations": {
                "bold": self.style.bold,
                "italic": self.style.italic,
                "strikethrough": self.style.strikethrough,
                "code": self.style.code,
                "underline": false,
                "color": "default",
            },
        })
    }

    /// Parse one element of a `rich_text` array as returned by the API.
    pub fn from_value(value: &Value) -> Self {
        let content = value["plain_text"]
            .as_str()
            .or_else(|| value["text"]["content"].as_str())
            .unwrap_or_default();
        let ann = &value["annotations"];
        let style = TextStyle {
            bold: ann["bold"].as_bool().unwrap_or(false),
            italic: ann["italic"].as_bool().unwrap_or(false),
            strikethrough: ann["strikethrough"].as_bool().unwrap_or(false),
            code: ann["code"].as_bool().unwrap_or(false),
        };
        let link = value["href"]
            .as_str()
            .or_else(|| value["text"]["link"]["url"].as_str());
        RichText::new(content, style, link)
    }
}

fn is_absolute_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Render runs back to markdown text. Markers nest in a fixed order:
/// code, bold, italic, strikethrough, then the link wrapper. Emphasis
/// delimiters cannot sit against whitespace, so leading and trailing spaces
/// stay outside the markers.
pub fn render(runs: &[RichText]) -> String {
    let mut out = String::new();
    for run in runs {
        if run.style == TextStyle::default() && run.link.is_none() {
            out.push_str(&run.content);
            continue;
        }
        let core = run.content.trim_matches(' ');
        if core.is_empty() {
            out.push_str(&run.content);
            continue;
        }
        let lead = run.content.len() - run.content.trim_start_matches(' ').len();
        let trail = run.content.trim_end_matches(' ').len();
        out.push_str(&run.content[..lead]);

        let mut text = core.to_string();
        if run.style.code {
            text = format!("`{text}`");
        }
        if run.style.bold {
            text = format!("**{text}**");
        }
        if run.style.italic {
            text = format!("*{text}*");
        }
        if run.style.strikethrough {
            text = format!("~~{text}~~");
        }
        if let Some(url) = &run.link {
            text = format!("[{text}]({url})");
        }
        out.push_str(&text);
        out.push_str(&run.content[trail..]);
    }
    out
}

/// Accumulates inline events into runs while tracking one mutable style
/// state. Text events snapshot the current state; inline code emits its own
/// run with `code` merged in without toggling the shared state.
#[derive(Debug, Default)]
pub struct InlineCollector {
    runs: Vec<RichText>,
    style: TextStyle,
    url: Option<String>,
}

impl InlineCollector {
    pub fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.runs
            .push(RichText::new(text, self.style, self.url.as_deref()));
    }

    pub fn push_inline_code(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let style = TextStyle {
            code: true,
            ..self.style
        };
        self.runs.push(RichText::new(text, style, self.url.as_deref()));
    }

    pub fn set_bold(&mut self, on: bool) {
        self.style.bold = on;
    }

    pub fn set_italic(&mut self, on: bool) {
        self.style.italic = on;
    }

    pub fn set_strikethrough(&mut self, on: bool) {
        self.style.strikethrough = on;
    }

    pub fn open_link(&mut self, url: &str) {
        self.url = Some(url.to_string());
    }

    pub fn close_link(&mut self) {
        self.url = None;
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Take the accumulated runs, resetting the collector for the next block.
    pub fn take(&mut self) -> Vec<RichText> {
        self.style = TextStyle::default();
        self.url = None;
        std::mem::take(&mut self.runs)
    }
}
