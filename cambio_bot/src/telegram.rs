//! Telegram transport built on `teloxide`.
//!
//! The teloxide polling dispatcher runs on a tokio runtime owned by `main`.
//! `/start` (also `/start@bot`) becomes `Event::Start`, plain text becomes
//! `Event::Text`, and anything else is dropped. Every usable message is forwarded
//! as an [`Inbound`] into the crossbeam channel read by the session dispatcher, so
//! session workers stay on plain threads. Replies are sent from those threads by
//! blocking on the runtime handle.
use cambio_common::dialogue::{Event, Keyboard, Reply, SessionId};
use cambio_common::{CambioError, Result, Transport};
use crossbeam_channel::Sender;
use log::{debug, error, info};
use teloxide::prelude::*;
use teloxide::types::{KeyboardButton, KeyboardMarkup};
use teloxide::utils::command::BotCommands;
use tokio::runtime::Handle;

/// A user message addressed to one session.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    /// Conversation the message belongs to.
    pub session: SessionId,
    /// What the user sent.
    pub event: Event,
}

/// Commands the bot reacts to.
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    /// Start a new quote.
    Start,
}

/// Text event for a non-command message, `None` for commands.
pub fn text_event(text: &str) -> Option<Event> {
    if text.trim_start().starts_with('/') {
        None
    } else {
        Some(Event::Text(text.to_string()))
    }
}

/// One-time reply keyboard for `keyboard`, or `None` when it has no buttons.
pub fn keyboard_markup(keyboard: &Keyboard) -> Option<KeyboardMarkup> {
    let rows: Vec<Vec<KeyboardButton>> = keyboard
        .iter()
        .filter(|row| !row.is_empty())
        .map(|row| row.iter().map(KeyboardButton::new).collect())
        .collect();
    if rows.is_empty() {
        return None;
    }
    Some(KeyboardMarkup::new(rows).one_time_keyboard().resize_keyboard())
}

fn forward(tx: &Sender<Inbound>, chat: ChatId, event: Event) {
    let inbound = Inbound {
        session: SessionId(chat.0),
        event,
    };
    debug!("Inbound from {}: {:?}", inbound.session, inbound.event);
    if let Err(e) = tx.send(inbound) {
        error!("Dispatcher is gone, dropping message: {}", e);
    }
}

/// Poll Telegram and forward every usable message to `tx` until the runtime stops.
pub async fn receive_loop_with_channel(bot: Bot, tx: Sender<Inbound>) {
    let start_tx = tx.clone();
    let commands = dptree::entry().filter_command::<Command>().endpoint(
        move |msg: Message, cmd: Command| {
            let tx = start_tx.clone();
            async move {
                match cmd {
                    Command::Start => forward(&tx, msg.chat.id, Event::Start),
                }
                Ok::<(), teloxide::RequestError>(())
            }
        },
    );

    let texts = dptree::endpoint(move |msg: Message| {
        let tx = tx.clone();
        async move {
            match msg.text().and_then(text_event) {
                Some(event) => forward(&tx, msg.chat.id, event),
                None => debug!("Ignoring message from {}", msg.chat.id),
            }
            Ok::<(), teloxide::RequestError>(())
        }
    });

    let handler = Update::filter_message().branch(commands).branch(texts);

    info!("Telegram receiver started");
    Dispatcher::builder(bot, handler)
        .default_handler(|_| async {})
        .build()
        .dispatch()
        .await;
    info!("Telegram receiver stopping...");
}

/// Sends replies through the Bot API from non-async threads.
pub struct TelegramTransport {
    bot: Bot,
    runtime: Handle,
}

impl TelegramTransport {
    /// Transport sending with `bot` on the runtime behind `runtime`.
    pub fn new(bot: Bot, runtime: Handle) -> Self {
        Self { bot, runtime }
    }
}

impl Transport for TelegramTransport {
    fn send(&self, session: SessionId, reply: &Reply) -> Result<()> {
        let mut request = self.bot.send_message(ChatId(session.0), reply.text.clone());
        if let Some(markup) = reply.keyboard.as_ref().and_then(keyboard_markup) {
            request = request.reply_markup(markup);
        }
        self.runtime
            .block_on(async move { request.await })
            .map_err(|e| CambioError::Telegram(e.to_string()))?;
        Ok(())
    }
}
