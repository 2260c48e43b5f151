//! Headless rendering of the multi-stream grid to the log.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use gsg_core::MultiStreamSession;

/// Log the current display list and its grid geometry
pub fn report(session: &MultiStreamSession) {
    let display = session.display_list();
    if !display.loaded {
        info!("Streams not loaded yet");
        return;
    }

    let stream_count = display.len();
    let geometry = session.layout_for(stream_count);
    info!(
        streams = stream_count,
        columns = geometry.columns,
        rows = geometry.rows,
        tile_width = geometry.tile_width,
        tile_height = geometry.tile_height,
        top_padding = geometry.top_padding,
        "Grid"
    );

    for (position, stream) in display.streams.iter().enumerate() {
        info!(
            position,
            login = %stream.user_login,
            event = stream.is_event_stream,
            raid_train = stream.raid_train_index,
            viewers = stream.viewer_count,
            title = %stream.title,
            "Tile"
        );
    }
}

/// Report on `period` until `cancel` fires
pub async fn run(session: Arc<MultiStreamSession>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    loop {
        tokio::select! {
            () = cancel.cancelled() => return,
            _ = interval.tick() => report(&session),
        }
    }
}
