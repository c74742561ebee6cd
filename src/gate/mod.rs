use std::net::IpAddr;

use strum_macros::{Display, EnumString};

use crate::models::RateDecision;

pub use composed::ComposedGate;
pub use fixed_window::FixedWindowGate;

mod composed;
mod fixed_window;

/// Cap for the fixed window policy on the image endpoint
pub const IMAGE_WINDOW_MAX_ADMISSIONS: u32 = 30;
pub const IMAGE_WINDOW_SECONDS: i64 = 60;

/// The per-request facts a policy is allowed to look at
#[derive(Debug, Clone)]
pub struct ClientRequest<'a> {
    pub ip: IpAddr,
    pub user_agent: Option<&'a str>,
    pub accept_language: Option<&'a str>,
    pub path_and_query: &'a str,
}

/// Admission contract shared by both gate revisions. A denial is a
/// normal return value carrying its cause, evaluation itself never
/// fails past the caller.
pub trait AdmissionPolicy: Send + Sync {
    fn evaluate(&self, request: &ClientRequest) -> RateDecision;
}

/// The two admission policies are alternatives, one is picked per
/// deployment through config and they are never stacked
#[derive(Display, Debug, Copy, Clone, PartialEq, Eq, EnumString)]
pub enum GatePolicy {
    #[strum(serialize = "fixed_window")]
    FixedWindow,
    #[strum(serialize = "composed")]
    Composed,
}

pub fn build_gate(policy: GatePolicy) -> Box<dyn AdmissionPolicy> {
    match policy {
        GatePolicy::FixedWindow => Box::new(FixedWindowGate::new(
            IMAGE_WINDOW_MAX_ADMISSIONS,
            IMAGE_WINDOW_SECONDS,
        )),
        GatePolicy::Composed => Box::new(ComposedGate::new(vec![])),
    }
}
