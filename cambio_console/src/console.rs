//! Line-based terminal transport.
//!
//! Replies are printed as plain text; keyboards are printed below the text as rows
//! of `[label]` buttons the user can type back.
use std::io::{BufRead, Write};
use std::sync::Mutex;

use cambio_common::dialogue::{Reply, SessionId};
use cambio_common::session::SessionStore;
use cambio_common::{Result, Transport};
use log::debug;

/// Command restarting the dialogue.
pub const START_COMMAND: &str = "/start";
/// Command leaving the console.
pub const EXIT_COMMAND: &str = "/salir";
/// The single local conversation.
pub const LOCAL_SESSION: SessionId = SessionId(0);

/// Transport writing replies to any `Write`.
pub struct ConsoleTransport<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> ConsoleTransport<W> {
    /// Transport printing to `out`.
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Give back the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        Ok(self.out.into_inner()?)
    }
}

impl<W: Write + Send> Transport for ConsoleTransport<W> {
    fn send(&self, _session: SessionId, reply: &Reply) -> Result<()> {
        let mut out = self.out.lock()?;
        writeln!(out, "{}", reply.text)?;
        for row in reply.keyboard.iter().flatten() {
            let buttons: Vec<String> = row.iter().map(|label| format!("[{}]", label)).collect();
            writeln!(out, "  {}", buttons.join(" "))?;
        }
        out.flush()?;
        Ok(())
    }
}

/// Feed every input line to the local session until EOF or `/salir`.
///
/// A session left idle past the store's TTL starts over on the next line.
pub fn run<R: BufRead>(
    input: R,
    store: &mut SessionStore,
    transport: &dyn Transport,
) -> Result<()> {
    transport.send_all(LOCAL_SESSION, &store.start(LOCAL_SESSION))?;

    for line in input.lines() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text.eq_ignore_ascii_case(EXIT_COMMAND) {
            debug!("Exit requested");
            break;
        }

        store.evict_idle();
        let replies = if text.eq_ignore_ascii_case(START_COMMAND) {
            store.start(LOCAL_SESSION)
        } else {
            store.receive(LOCAL_SESSION, text)
        };
        transport.send_all(LOCAL_SESSION, &replies)?;
    }
    Ok(())
}
