//! Outbound side of a chat transport.
use crate::dialogue::{Reply, SessionId};
use crate::result::Result;

/// Delivers replies to a user.
pub trait Transport: Send + Sync {
    /// Send one reply (text plus optional keyboard) to `session`.
    fn send(&self, session: SessionId, reply: &Reply) -> Result<()>;

    /// Send replies in order, stopping at the first failure.
    fn send_all(&self, session: SessionId, replies: &[Reply]) -> Result<()> {
        for reply in replies {
            self.send(session, reply)?;
        }
        Ok(())
    }
}
