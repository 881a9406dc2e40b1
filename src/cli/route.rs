//! `relay route`: compute a decision without invoking anything

use serde_json::json;

use crate::cli::setup::load_config_with_overrides;
use crate::cli::RouteArgs;
use crate::clock;
use crate::events::EventBus;
use crate::request::Constraints;
use crate::routing::{Router, RoutingRequest};

pub(crate) fn request_from_args(args: &RouteArgs) -> RoutingRequest {
    RoutingRequest::new(&args.domain, &args.task)
        .with_priority(args.priority)
        .with_tenant(&args.tenant)
        .with_constraints(Constraints {
            max_cost: args.max_cost,
            max_latency_ms: args.max_latency_ms,
            min_quality: args.min_quality,
            required_capabilities: args.capabilities.clone(),
        })
}

/// Handle `relay route`, returning the decision as pretty JSON.
pub fn handle_route(args: &RouteArgs, log_level: Option<&str>) -> anyhow::Result<String> {
    let config = load_config_with_overrides(&args.config, log_level)?;
    let router = Router::from_config(&config, clock::system(), EventBus::new())?;

    let request = request_from_args(args);
    let decision = router.route(&request)?;

    Ok(serde_json::to_string_pretty(&json!({
        "decision": decision.view(),
        "budget": router.budget(&request.tenant),
    }))?)
}
