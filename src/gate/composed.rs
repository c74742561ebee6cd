use std::net::IpAddr;

use governor::{clock::QuantaClock, state::keyed::DefaultKeyedStateStore, Quota, RateLimiter};
use lazy_static::lazy_static;
use nonzero_ext::nonzero;
use regex::Regex;

use crate::gate::{AdmissionPolicy, ClientRequest};
use crate::models::{DenyReason, RateDecision};

type ClientLimiter = RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, QuantaClock>;

/// Bucket capacity per client; consumed one unit per request
const TOKEN_BUCKET_CAPACITY: u32 = 10;
/// Bucket refill per minute
const TOKEN_BUCKET_REFILL: u32 = 30;

/// User agent fragments that give away automated clients
const AGENT_SIGNATURES: [&str; 10] = [
    "bot",
    "crawler",
    "spider",
    "scrapy",
    "curl/",
    "wget/",
    "python-requests",
    "go-http-client",
    "headlesschrome",
    "phantomjs",
];

/// Coarse list of well known cloud egress ranges. Real browsers don't
/// come out of a datacenter, so these only ever see scripted traffic.
const HOSTING_RANGES: [(IpAddr, u8); 5] = [
    (IpAddr::V4(std::net::Ipv4Addr::new(3, 0, 0, 0)), 9),
    (IpAddr::V4(std::net::Ipv4Addr::new(13, 52, 0, 0)), 14),
    (IpAddr::V4(std::net::Ipv4Addr::new(34, 64, 0, 0)), 10),
    (IpAddr::V4(std::net::Ipv4Addr::new(35, 192, 0, 0)), 12),
    (IpAddr::V4(std::net::Ipv4Addr::new(52, 0, 0, 0)), 10),
];

lazy_static! {
    static ref ATTACK_SIGNATURES: Regex = Regex::new(
        r"(?i)(\.\./|%2e%2e%2f|<script|%3cscript|union\s+select|union%20select|sleep\s*\(|/etc/passwd)"
    )
    .unwrap();
}

/// The later gate revision: checks run in a fixed order and the first
/// failing one names the denial. Shield and agent detection come
/// before the token bucket so obviously hostile traffic never drains
/// a client's quota, and the two heuristics run last on otherwise
/// admitted requests.
pub struct ComposedGate {
    bucket: ClientLimiter,
    agent_allowlist: Vec<String>,
}

impl ComposedGate {
    pub fn new(agent_allowlist: Vec<String>) -> Self {
        let quota =
            Quota::per_minute(nonzero!(TOKEN_BUCKET_REFILL)).allow_burst(nonzero!(TOKEN_BUCKET_CAPACITY));
        Self {
            bucket: RateLimiter::keyed(quota),
            agent_allowlist,
        }
    }

    fn is_allowlisted(&self, user_agent: &str) -> bool {
        let lowered = user_agent.to_lowercase();
        self.agent_allowlist
            .iter()
            .any(|entry| lowered.contains(&entry.to_lowercase()))
    }

    fn is_automated_agent(&self, user_agent: Option<&str>) -> bool {
        let ua = match user_agent {
            // a client that doesn't even bother with a user agent
            // isn't a browser
            None => return true,
            Some(ua) => ua.to_lowercase(),
        };
        if user_agent.map(|ua| self.is_allowlisted(ua)).unwrap_or(false) {
            return false;
        }
        AGENT_SIGNATURES
            .iter()
            .any(|signature| ua.contains(signature))
    }
}

fn shield_triggered(path_and_query: &str) -> bool {
    ATTACK_SIGNATURES.is_match(path_and_query)
}

fn is_hosting_ip(ip: IpAddr) -> bool {
    let addr = match ip {
        IpAddr::V4(v4) => u32::from(v4),
        IpAddr::V6(_) => return false,
    };
    HOSTING_RANGES.iter().any(|(network, prefix)| {
        let network = match network {
            IpAddr::V4(v4) => u32::from(*v4),
            IpAddr::V6(_) => return false,
        };
        let shift = 32 - prefix;
        addr >> shift == network >> shift
    })
}

/// Agents that claim to be a browser but don't look like one
fn is_spoofed_agent(user_agent: Option<&str>, accept_language: Option<&str>) -> bool {
    let ua = match user_agent {
        // a missing agent is the automated-agent check's problem
        None => return false,
        Some(ua) => ua,
    };
    let chrome_without_webkit = ua.contains("Chrome/") && !ua.contains("AppleWebKit");
    // every real browser sends an Accept-Language
    let mute_browser = ua.starts_with("Mozilla/") && accept_language.is_none();
    chrome_without_webkit || mute_browser
}

impl AdmissionPolicy for ComposedGate {
    fn evaluate(&self, request: &ClientRequest) -> RateDecision {
        if shield_triggered(request.path_and_query) {
            return RateDecision::deny(DenyReason::Shield);
        }
        if self.is_automated_agent(request.user_agent) {
            return RateDecision::deny(DenyReason::Bot);
        }
        if self.bucket.check_key(&request.ip).is_err() {
            return RateDecision::deny(DenyReason::RateLimit);
        }
        if is_hosting_ip(request.ip) {
            return RateDecision::deny(DenyReason::HostingIp);
        }
        if is_spoofed_agent(request.user_agent, request.accept_language) {
            return RateDecision::deny(DenyReason::Bot);
        }
        RateDecision::allow()
    }
}
