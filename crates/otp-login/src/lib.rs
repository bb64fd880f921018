#![doc = include_str!("../README.md")]

mod api;
mod controller;
mod error;
mod identifier;
mod scheduler;
mod session;
mod settings;
mod sink;

pub use api::{
    HttpOtpApi, OtpAction, OtpApi, OtpApiError, OtpErrorApiResponse, SendCodeApiResponse,
    SendCodeRequest, VerifyCodeApiResponse, VerifyCodeRequest,
};
pub use controller::{FlowSnapshot, LoginFlow};
pub use error::{FlowOperation, LoginFlowError, ValidationError};
pub use identifier::{
    sanitize_code_input, LoginIdentifier, OtpCode, MIN_PHONE_DIGITS, OTP_CODE_LENGTH,
};
pub use scheduler::{
    ManualScheduler, Scheduler, SchedulerError, TickFn, TickHandle, TokioScheduler,
};
pub use session::{AttemptState, AuthenticatedSession, FlowPhase, OtpSession};
pub use settings::{ClientSettings, FlowSettings};
pub use sink::{MemorySessionSink, SessionSink};
