//! `ferrywatch watch`: run a watch session until interrupted.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;

use ferrywatch_config::profile_to_session_config;
use ferrywatch_core::{
    InvalidationMapper, Invalidator, QueryCache, RelationTable, SessionState, WatchSession,
};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::config;
use crate::error::CliError;
use crate::output::{self, Palette};

use super::util::{self, EventRow};

pub async fn handle(args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let profile = config::resolve_profile(global)?;
    let mut session_config = profile_to_session_config(&profile)?;
    if args.max_retries.is_some() {
        session_config.reconnect.max_retries = args.max_retries;
    }
    if args.direct_only {
        session_config.relations = RelationTable::direct_only();
    }

    let scope = config::resolve_scope(&profile, &args.scope);
    let url = util::websocket_url(&scope.to_url(&session_config.endpoint))?;
    let mapper = InvalidationMapper::new(Arc::new(session_config.relations.clone()));
    let cache: Arc<dyn Invalidator> = Arc::new(QueryCache::new());
    let session = WatchSession::new(session_config, util::transport(&profile, &args.headers), cache);

    let palette = Palette::new(global.color);
    let mut notifications = session.notifications();
    let mut state = session.state();

    session.start(scope)?;
    output::print_status(&format!("watching {url}"), global.quiet);

    let mut seen: u64 = 0;
    let outcome = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break Ok(()),
            changed = state.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let current = *state.borrow_and_update();
                output::print_status(&format!("stream {}", palette.state(current)), global.quiet);
                if current == SessionState::Closed {
                    break Err(CliError::RetriesExhausted { url: url.to_string() });
                }
            }
            received = notifications.recv() => match received {
                Ok(notification) => {
                    let keys = mapper.keys_for(&notification);
                    let rendered = match output::render_structured(
                        global.output,
                        &EventRow::new(&notification, &keys),
                    )? {
                        Some(json) => json,
                        None => util::event_line(&notification, &keys, palette),
                    };
                    output::print_output(&rendered, global.quiet);

                    seen += 1;
                    if args.count.is_some_and(|limit| seen >= limit) {
                        break Ok(());
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "output fell behind, notifications skipped");
                }
                Err(RecvError::Closed) => break Ok(()),
            },
        }
    };

    session.stop();

    if args.stats {
        let stats = session.stats();
        let rendered = match output::render_structured(global.output, &stats)? {
            Some(json) => json,
            None => format!(
                "frames {}  dispatched {}  dropped {}  keys {}  failures {}  reconnects {}",
                stats.frames_received,
                stats.notifications_dispatched,
                stats.frames_dropped,
                stats.keys_invalidated,
                stats.invalidate_failures,
                stats.reconnects,
            ),
        };
        if global.output == OutputFormat::Plain {
            output::print_status(&rendered, global.quiet);
        } else {
            output::print_output(&rendered, global.quiet);
        }
    }

    outcome
}
