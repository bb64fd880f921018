use clap::{Args, Parser, Subcommand};

use crate::color::Color;

pub const SERVER_ENV: &str = "OTP_SERVER";

#[derive(Parser, Clone)]
#[command(name = "otp", version, about = "One-time password login", long_about = None)]
pub struct Cli {
    // Optional as a workaround for https://github.com/clap-rs/clap/issues/3572
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short = 'c', long, global = true, value_enum, default_value_t = Color::Auto)]
    pub color: Color,

    #[arg(
        short = 'q',
        long,
        global = true,
        help = "Don't return anything to stdout."
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    #[command(long_about = "Log in with a code sent to a phone number or email address.")]
    Login(LoginArgs),
}

#[derive(Args, Clone)]
pub struct LoginArgs {
    #[arg(help = "Phone number or email address. Prompted for when omitted.")]
    pub identifier: Option<String>,

    #[arg(
        short = 's',
        long,
        env = SERVER_ENV,
        default_value = "http://localhost:3000",
        help = "Server URL"
    )]
    pub server: String,

    #[arg(long, default_value = "/api/auth/otp", help = "Route of the OTP endpoint")]
    pub otp_path: String,

    #[arg(
        long,
        env = "OTP_RESEND_COOLDOWN",
        default_value_t = 60,
        help = "Seconds before a new code may be requested"
    )]
    pub resend_cooldown: u32,

    #[arg(
        long,
        env = "OTP_CODE_EXPIRY",
        default_value_t = 300,
        help = "Code validity assumed when the server does not report one"
    )]
    pub code_expiry: u32,
}
