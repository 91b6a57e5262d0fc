use std::future::Future;

use crate::core::errors::Result;

/// Port for the room server.
pub trait RoomTransport {
    /// Fetch the current room content (raw markup).
    fn fetch_messages(&self) -> impl Future<Output = Result<String>>;

    /// Post one armored payload to the room.
    fn send(&self, payload: &str) -> impl Future<Output = Result<()>>;
}
