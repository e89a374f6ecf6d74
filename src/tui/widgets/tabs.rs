use crate::config::Config;
use crate::tui::widgets::color::{contrast_color, parse_color};
use crate::views::View;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Tabs;

pub fn render_tabs(f: &mut Frame, area: Rect, current_view: View, config: &Config) {
    let active_theme = config.get_active_theme();
    let highlight_bg = parse_color(&active_theme.highlight_bg);
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let tab_bg = parse_color(&active_theme.tab_bg);
    let tab_fg = contrast_color(tab_bg);

    // Padded spans on tab_bg make each tab look like a box
    let titles: Vec<Line> = View::ALL
        .iter()
        .map(|view| {
            Line::from(vec![
                Span::styled("  ", Style::default().bg(tab_bg)),
                Span::styled(view.title(), Style::default().fg(tab_fg).bg(tab_bg)),
                Span::styled("  ", Style::default().bg(tab_bg)),
            ])
        })
        .collect();

    let tabs = Tabs::new(titles)
        .select(current_view.index())
        .style(Style::default().fg(fg_color).bg(bg_color))
        .highlight_style(
            Style::default()
                .fg(contrast_color(highlight_bg))
                .bg(highlight_bg)
                .add_modifier(Modifier::BOLD),
        )
        .divider("  ")
        .padding("", "");

    f.render_widget(tabs, area);
}
