use crate::command::Cli;

pub enum CommandOutput {
    Object(serde_json::Value),
}
pub type CommandResult = color_eyre::eyre::Result<CommandOutput>;

pub struct RenderConfig {
    pub quiet: bool,
}

impl RenderConfig {
    pub fn new(cli: &Cli) -> Self {
        Self { quiet: cli.quiet }
    }

    pub fn render_result(&self, result: CommandResult) -> color_eyre::eyre::Result<()> {
        match result {
            // Errors will be passed through to the caller, and rendered by color-eyre
            Err(e) => Err(e),

            Ok(_) if self.quiet => Ok(()),

            Ok(CommandOutput::Object(obj)) => {
                println!("{}", serde_json::to_string_pretty(&obj)?);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::eyre::eyre;

    use super::*;

    #[test]
    fn objects_render_and_errors_pass_through() {
        let config = RenderConfig { quiet: false };
        let object = CommandOutput::Object(serde_json::json!({ "token": "t1" }));
        assert!(config.render_result(Ok(object)).is_ok());

        let err = config
            .render_result(Err(eyre!("Login cancelled")))
            .unwrap_err();
        assert_eq!(err.to_string(), "Login cancelled");
    }

    #[test]
    fn quiet_suppresses_output() {
        let config = RenderConfig { quiet: true };
        let object = CommandOutput::Object(serde_json::Value::Null);
        assert!(config.render_result(Ok(object)).is_ok());
    }
}
