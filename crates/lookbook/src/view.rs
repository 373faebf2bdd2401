//! Maps the driver's view state onto terminal output.

use console::Style;
use lookbook_mcp::{DriverState, RecommendationItem, ViewState};

/// One recommendation, resolved to display strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub key: String,
    pub title: String,
    pub price: String,
    pub score: String,
    pub reason: Option<String>,
    pub url: String,
}

impl Card {
    pub fn from_item(item: &RecommendationItem, index: usize) -> Self {
        Self {
            key: item.key(index),
            title: item.display_title().to_string(),
            price: item.display_price(),
            score: item.display_score(),
            reason: item.display_reason().map(str::to_string),
            url: item.image_url().to_string(),
        }
    }

    /// Render as an indented block, numbered from 1.
    pub fn render(&self, position: usize) -> String {
        let bold = Style::new().bold();
        let green = Style::new().green();
        let dim = Style::new().dim();

        let mut out = format!(
            "{:>3}. {}  {}\n",
            position,
            bold.apply_to(&self.title),
            green.apply_to(&self.price)
        );
        out.push_str(&format!(
            "     {} {}  {} {}\n",
            dim.apply_to("score"),
            self.score,
            dim.apply_to("key"),
            self.key
        ));
        if let Some(reason) = &self.reason {
            out.push_str(&format!("     {}\n", reason));
        }
        out.push_str(&format!("     {}\n", dim.apply_to(&self.url)));
        out
    }
}

/// Cards for every item, in server order.
pub fn cards(items: &[RecommendationItem]) -> Vec<Card> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| Card::from_item(item, index))
        .collect()
}

/// Full card list, or a notice when there is nothing to show.
pub fn render_cards(items: &[RecommendationItem]) -> String {
    if items.is_empty() {
        return "No recommendations found.\n".to_string();
    }
    cards(items)
        .iter()
        .enumerate()
        .map(|(index, card)| card.render(index + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One-line summary of where a submission is.
pub fn status_line(view: &ViewState) -> String {
    match view.state() {
        DriverState::Idle => match view.image() {
            Some(image) => format!("Ready to submit {}", image.name()),
            None => "Select an image".to_string(),
        },
        DriverState::Negotiating => "Opening session...".to_string(),
        DriverState::Invoking => "Requesting recommendations...".to_string(),
        DriverState::Interpreting => "Reading results...".to_string(),
        DriverState::Ready => match view.recommendations().len() {
            1 => "1 recommendation".to_string(),
            n => format!("{} recommendations", n),
        },
        DriverState::Failed => format!("Error: {}", view.error().unwrap_or("unknown failure")),
    }
}
