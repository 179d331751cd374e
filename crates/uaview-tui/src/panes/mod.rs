//! The dashboard panes.

pub mod attributes;
pub mod log;
pub mod table;
pub mod tree;

pub use attributes::AttributesPane;
pub use log::LogPane;
pub use table::TablePane;
pub use tree::TreePane;

use ratatui::widgets::{Block, BorderType, Borders};

use crate::theme;

/// Rounded pane frame with a title, highlighted when focused.
pub(crate) fn pane_block(title: String, focused: bool) -> Block<'static> {
    Block::default()
        .title(title)
        .title_style(theme::title_style())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border(focused))
}

/// Clamp a scroll offset so the last page stays full.
pub(crate) fn clamp_scroll(offset: usize, total: usize, visible: usize) -> usize {
    offset.min(total.saturating_sub(visible))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_never_passes_the_last_page() {
        assert_eq!(clamp_scroll(10, 12, 5), 7);
        assert_eq!(clamp_scroll(3, 12, 5), 3);
        assert_eq!(clamp_scroll(4, 2, 5), 0);
    }
}
