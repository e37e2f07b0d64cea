//! `ferrywatch check`: one-shot connectivity probe.

use std::time::Duration;

use serde::Serialize;

use ferrywatch_config::profile_endpoint;
use ferrywatch_core::probe;

use crate::cli::{GlobalOpts, ScopeCmdArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Debug, Serialize)]
struct CheckReport {
    url: String,
    reachable: bool,
}

pub async fn handle(args: ScopeCmdArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let profile = config::resolve_profile(global)?;
    let endpoint = profile_endpoint(&profile)?;
    let scope = config::resolve_scope(&profile, &args.scope);
    let transport = util::transport(&profile, &[]);

    let url = probe(&transport, &endpoint, &scope, Duration::from_secs(global.timeout)).await?;
    tracing::debug!(url = %url, "event stream accepted connection");

    let report = CheckReport {
        url: util::websocket_url(&url)?.to_string(),
        reachable: true,
    };
    let rendered = match output::render_structured(global.output, &report)? {
        Some(json) => json,
        None => format!("ok  {}", report.url),
    };
    output::print_output(&rendered, global.quiet);
    Ok(())
}
