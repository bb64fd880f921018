use clap::ValueEnum;

/// When to emit ANSI colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Color {
    Never,
    Always,
    Auto,
}

impl Color {
    pub fn is_enabled(self) -> bool {
        match self {
            Color::Never => false,
            Color::Always => true,
            Color::Auto => supports_color::on(supports_color::Stream::Stderr).is_some(),
        }
    }
}

/// Installs the color-eyre panic and error report handlers, themed according to `color`.
pub fn install_color_eyre(color: Color) -> color_eyre::Result<()> {
    if color.is_enabled() {
        color_eyre::install()
    } else {
        color_eyre::config::HookBuilder::new()
            .theme(color_eyre::config::Theme::new())
            .install()
    }
}
