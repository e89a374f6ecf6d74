use ratatui::style::Color;

/// Parse a theme color.
///
/// Accepts the terminal's named colors (`gray`/`grey`, `darkgray`, `lightblue`,
/// ...), `#RRGGBB`, `#RGB` and `rgb(r, g, b)`. Anything else renders white.
pub fn parse_color(color_str: &str) -> Color {
    let s = color_str.trim().to_lowercase();

    match s.as_str() {
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "white" => Color::White,
        // ratatui has no light gray
        "gray" | "grey" | "lightgray" | "lightgrey" => Color::Gray,
        "darkgray" | "darkgrey" => Color::DarkGray,
        "lightred" => Color::LightRed,
        "lightgreen" => Color::LightGreen,
        "lightyellow" => Color::LightYellow,
        "lightblue" => Color::LightBlue,
        "lightmagenta" => Color::LightMagenta,
        "lightcyan" => Color::LightCyan,
        "reset" => Color::Reset,
        _ => s
            .strip_prefix('#')
            .and_then(parse_hex)
            .or_else(|| parse_rgb(&s))
            .unwrap_or(Color::White),
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(hex.get(range)?, 16).ok();

    match hex.len() {
        6 => Some(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
        3 => {
            let (r, g, b) = (channel(0..1)?, channel(1..2)?, channel(2..3)?);
            Some(Color::Rgb(r * 17, g * 17, b * 17))
        }
        _ => None,
    }
}

fn parse_rgb(s: &str) -> Option<Color> {
    let content = s.strip_prefix("rgb(")?.strip_suffix(')')?;
    let parts: Vec<u8> = content
        .split(',')
        .map(|part| part.trim().parse::<u8>())
        .collect::<Result<_, _>>()
        .ok()?;

    match parts.as_slice() {
        [r, g, b] => Some(Color::Rgb(*r, *g, *b)),
        _ => None,
    }
}

/// WCAG relative luminance of an RGB color, 0.0 (dark) to 1.0 (light)
fn relative_luminance(r: u8, g: u8, b: u8) -> f64 {
    let linear = |c: u8| {
        let c = c as f64 / 255.0;
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    0.2126 * linear(r) + 0.7152 * linear(g) + 0.0722 * linear(b)
}

/// Black or white, whichever reads better on `background`
pub fn contrast_color(background: Color) -> Color {
    let dark = match background {
        Color::Rgb(r, g, b) => relative_luminance(r, g, b) < 0.5,
        // Gray renders light in most terminals
        Color::Black | Color::Blue | Color::Magenta | Color::Red | Color::DarkGray => true,
        _ => false,
    };
    if dark { Color::White } else { Color::Black }
}

/// Theme name of [`contrast_color`]
pub fn contrast_color_name(background: Color) -> &'static str {
    match contrast_color(background) {
        Color::White => "white",
        _ => "black",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_supported_notation() {
        assert_eq!(parse_color(" Blue "), Color::Blue);
        assert_eq!(parse_color("grey"), Color::Gray);
        assert_eq!(parse_color("#1E1E2E"), Color::Rgb(0x1E, 0x1E, 0x2E));
        assert_eq!(parse_color("#fff"), Color::Rgb(255, 255, 255));
        assert_eq!(parse_color("rgb(10, 20, 30)"), Color::Rgb(10, 20, 30));
        assert_eq!(parse_color("rgb(10, 20)"), Color::White);
        assert_eq!(parse_color("chartreuse-ish"), Color::White);
    }

    #[test]
    fn contrast_picks_readable_text() {
        assert_eq!(contrast_color(Color::Black), Color::White);
        assert_eq!(contrast_color(Color::Yellow), Color::Black);
        assert_eq!(contrast_color(Color::Rgb(0x44, 0x44, 0x5A)), Color::White);
        assert_eq!(contrast_color_name(Color::Rgb(250, 250, 250)), "black");
    }
}
