use std::fmt::Display;

use console::{style, StyledObject};

pub type Styled = StyledObject<String>;

fn styled(text: impl Display) -> Styled {
    style(text.to_string())
}

pub fn bright(text: impl Display) -> Styled {
    styled(text).bright()
}

pub fn bright_green(text: impl Display) -> Styled {
    styled(text).bright().green()
}

pub fn bright_yellow(text: impl Display) -> Styled {
    styled(text).bright().yellow()
}

pub fn cyan(text: impl Display) -> Styled {
    styled(text).cyan()
}

pub fn dim(text: impl Display) -> Styled {
    styled(text).dim()
}

pub fn magenta_bold(text: impl Display) -> Styled {
    styled(text).magenta().bold()
}

/// Highlights non-zero counts; zero is dimmed.
pub fn count(value: usize) -> Styled {
    if value == 0 {
        dim(value)
    } else {
        bright_yellow(value)
    }
}
