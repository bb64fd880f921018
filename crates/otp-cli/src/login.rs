use std::sync::Arc;

use color_eyre::eyre::{bail, Result};
use inquire::Text;
use otp_login::{
    AuthenticatedSession, ClientSettings, FlowSettings, FlowSnapshot, HttpOtpApi, LoginFlow,
    MemorySessionSink, TokioScheduler,
};
use tracing::{debug, info, warn};

use crate::{command::LoginArgs, render::CommandOutput};

enum CodeOutcome {
    Verified(AuthenticatedSession),
    Back,
    Quit,
}

pub(crate) async fn run(args: LoginArgs) -> crate::render::CommandResult {
    let client_settings = ClientSettings {
        api_url: args.server,
        otp_path: args.otp_path,
        ..Default::default()
    };
    let flow_settings = FlowSettings {
        resend_cooldown_seconds: args.resend_cooldown,
        default_expiry_seconds: args.code_expiry,
        ..Default::default()
    };
    debug!(?client_settings, ?flow_settings);

    let flow = LoginFlow::new(
        Arc::new(HttpOtpApi::new(&client_settings)?),
        Arc::new(MemorySessionSink::new()),
        Arc::new(TokioScheduler::current()?),
        flow_settings,
    );

    let session = login(&flow, args.identifier).await?;
    Ok(CommandOutput::Object(serde_json::to_value(session)?))
}

async fn login(flow: &LoginFlow, mut identifier: Option<String>) -> Result<AuthenticatedSession> {
    loop {
        let input = match identifier.take() {
            Some(value) => value,
            None => prompt("Phone number or email", None).await?,
        };

        if let Err(e) = flow.submit_identifier(&input).await {
            warn!("{e}");
            if let Some(retry_after) = e.retry_after() {
                eprintln!("Try again in {retry_after} seconds.");
            }
            continue;
        }

        let snapshot = flow.snapshot();
        if let Some(otp) = &snapshot.debug_otp {
            eprintln!("Debug code from server: {otp}");
        }
        if let Some(id) = &snapshot.identifier {
            eprintln!("Code sent to {id}.");
        }

        match enter_code(flow).await? {
            CodeOutcome::Verified(session) => return Ok(session),
            CodeOutcome::Back => flow.back(),
            CodeOutcome::Quit => {
                flow.back();
                bail!("Login cancelled");
            }
        }
    }
}

async fn enter_code(flow: &LoginFlow) -> Result<CodeOutcome> {
    loop {
        let help = status_line(&flow.snapshot());
        let input = prompt("Code", Some(help)).await?;

        match input.trim() {
            "q" => return Ok(CodeOutcome::Quit),
            "b" => return Ok(CodeOutcome::Back),
            "r" => match flow.resend().await {
                Ok(()) => info!("A new code was sent"),
                Err(e) => warn!("{e}"),
            },
            typed => {
                let code = flow.set_code_input(typed);
                match flow.submit_code(&code).await {
                    Ok(session) => return Ok(CodeOutcome::Verified(session)),
                    Err(e) => warn!("{e}"),
                }
            }
        }
    }
}

fn status_line(snapshot: &FlowSnapshot) -> String {
    let resend = if snapshot.can_resend {
        "r: resend".to_owned()
    } else {
        format!("resend in {}s", snapshot.resend_cooldown_seconds)
    };
    let expiry = if snapshot.code_expired {
        "code expired".to_owned()
    } else {
        format!("expires in {}s", snapshot.expires_in_seconds)
    };
    format!("{expiry}, {resend}, b: back, q: quit")
}

/// Runs the blocking prompt off the runtime thread so the countdown keeps ticking.
async fn prompt(message: &'static str, help: Option<String>) -> Result<String> {
    let answer = tokio::task::spawn_blocking(move || {
        let mut text = Text::new(message);
        if let Some(help) = help.as_deref() {
            text = text.with_help_message(help);
        }
        text.prompt()
    })
    .await??;
    Ok(answer)
}

#[cfg(test)]
mod tests {
    use otp_login::FlowPhase;

    use super::*;

    fn snapshot(cooldown: u32, expires_in: u32) -> FlowSnapshot {
        FlowSnapshot {
            phase: FlowPhase::AwaitingCode,
            identifier: None,
            attempt_state: None,
            resend_cooldown_seconds: cooldown,
            expires_in_seconds: expires_in,
            can_resend: cooldown == 0,
            code_expired: expires_in == 0,
            code_input: String::new(),
            error: None,
            debug_otp: None,
            tick_active: true,
        }
    }

    #[test]
    fn status_line_shows_countdowns() {
        assert_eq!(
            status_line(&snapshot(42, 250)),
            "expires in 250s, resend in 42s, b: back, q: quit"
        );
        assert_eq!(
            status_line(&snapshot(0, 0)),
            "code expired, r: resend, b: back, q: quit"
        );
    }
}
