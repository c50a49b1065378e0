use console::Style;
use vigil_common::types::Severity;
use vigil_common::Theme;

/// Card color for a severity, tuned to the terminal background.
pub fn severity(theme: Theme, severity: Severity) -> Style {
    match (theme, severity) {
        (Theme::Light, Severity::Critical) => Style::new().red().bold(),
        (Theme::Light, Severity::High) => Style::new().magenta(),
        (Theme::Light, Severity::Medium) => Style::new().blue(),
        (Theme::Dark, Severity::Critical) => Style::new().red().bright().bold(),
        (Theme::Dark, Severity::High) => Style::new().yellow().bright(),
        (Theme::Dark, Severity::Medium) => Style::new().cyan(),
        (Theme::System, Severity::Critical) => Style::new().red().bold(),
        (Theme::System, Severity::High) => Style::new().yellow(),
        (Theme::System, Severity::Medium) => Style::new(),
    }
}

pub fn emphasis(theme: Theme) -> Style {
    match theme {
        Theme::Dark => Style::new().white().bright().bold(),
        Theme::Light | Theme::System => Style::new().bold(),
    }
}
