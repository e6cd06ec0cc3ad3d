//! Per-session dialogue state machine.
//!
//! A session cycles through `Origin -> Destination -> Amount -> Final -> Origin`.
//! Each incoming text is normalised (trimmed, lower-cased) and handled by the
//! current stage, which answers with zero or more `Reply` values and may move the
//! session to the next stage. Errors at the amount stage are answered and leave
//! the stage unchanged so the user can simply send another amount.
//!
//! `Dialogue` holds only read-only collaborators; the mutable `Session` is passed
//! in by whoever owns it, which keeps a single writer per session.
use std::fmt;
use std::sync::Arc;

use log::{debug, info, warn};
use strum_macros::{Display, EnumString};

use crate::market::MarketRateProvider;
use crate::messages;
use crate::quote::{self, QuoteError};
use crate::rate_table::RateTable;

/// Identifier of a conversation (a Telegram chat, or the local console).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub i64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Dialogue step a session is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Stage {
    /// Waiting for the origin currency or balance type.
    Origin,
    /// Waiting for the destination currency or balance type.
    Destination,
    /// Waiting for a numeric amount.
    Amount,
    /// Quote delivered; waiting for "continue" or "another query".
    Final,
}

/// Mutable state of one conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Current stage.
    pub stage: Stage,
    /// Last chosen origin; left stale across restarts until overwritten.
    pub origin: Option<String>,
    /// Last chosen destination; left stale across restarts until overwritten.
    pub destination: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            stage: Stage::Origin,
            origin: None,
            destination: None,
        }
    }
}

/// Rows of button labels offered as quick choices.
pub type Keyboard = Vec<Vec<String>>;

/// One outgoing message.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Message text.
    pub text: String,
    /// Optional quick-choice keyboard.
    pub keyboard: Option<Keyboard>,
}

impl Reply {
    /// Plain text reply.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    /// Reply carrying a keyboard.
    pub fn with_keyboard(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }

    /// Flattened button labels, in display order.
    pub fn choices(&self) -> Vec<String> {
        self.keyboard
            .iter()
            .flatten()
            .flatten()
            .cloned()
            .collect()
    }
}

/// Input delivered by a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The initializing command (`/start`).
    Start,
    /// Any other user text.
    Text(String),
}

/// Recognised answers at the final stage.
enum FinalChoice {
    Continue,
    Restart,
    Unrecognized,
}

impl FinalChoice {
    fn parse(text: &str) -> Self {
        if text == messages::CONTINUE_BUTTON.to_lowercase() {
            FinalChoice::Continue
        } else if text == messages::RESTART_BUTTON.to_lowercase() {
            FinalChoice::Restart
        } else {
            FinalChoice::Unrecognized
        }
    }
}

/// The dialogue state machine and its read-only collaborators.
#[derive(Clone)]
pub struct Dialogue {
    rates: Arc<RateTable>,
    market: Arc<dyn MarketRateProvider>,
}

impl Dialogue {
    /// Build a dialogue over a loaded rate table and a market rate provider.
    pub fn new(rates: Arc<RateTable>, market: Arc<dyn MarketRateProvider>) -> Self {
        Self { rates, market }
    }

    /// Rate table backing the keyboards and quotes.
    pub fn rates(&self) -> &RateTable {
        &self.rates
    }

    /// Route a transport event to `start` or `receive`, creating the session on
    /// first contact. Text from a session that was never started (or was evicted)
    /// starts a fresh dialogue.
    pub fn dispatch(&self, id: SessionId, slot: &mut Option<Session>, event: Event) -> Vec<Reply> {
        match slot {
            Some(session) => match event {
                Event::Start => self.start(id, session),
                Event::Text(text) => self.receive(id, session, &text),
            },
            None => {
                info!("Session {}: new conversation", id);
                self.start(id, slot.insert(Session::default()))
            }
        }
    }

    /// Enter the origin stage and offer every known origin.
    pub fn start(&self, id: SessionId, session: &mut Session) -> Vec<Reply> {
        session.stage = Stage::Origin;
        debug!("Session {}: stage -> {}", id, session.stage);
        let origins = self.rates.distinct_origins();
        vec![Reply::with_keyboard(
            messages::WELCOME,
            messages::keyboard_rows(&origins, messages::ROW_WIDTH),
        )]
    }

    /// Handle one user text according to the session's stage.
    pub fn receive(&self, id: SessionId, session: &mut Session, text: &str) -> Vec<Reply> {
        let text = text.trim().to_lowercase();
        let replies = match session.stage {
            Stage::Origin => self.on_origin(session, text),
            Stage::Destination => self.on_destination(session, text),
            Stage::Amount => self.on_amount(id, session, &text),
            Stage::Final => match FinalChoice::parse(&text) {
                FinalChoice::Continue => {
                    session.stage = Stage::Origin;
                    vec![Reply::text(messages::HAND_OFF)]
                }
                FinalChoice::Restart => return self.start(id, session),
                FinalChoice::Unrecognized => {
                    debug!("Session {}: ignoring {:?} at final stage", id, text);
                    Vec::new()
                }
            },
        };
        debug!("Session {}: stage -> {}", id, session.stage);
        replies
    }

    fn on_origin(&self, session: &mut Session, origin: String) -> Vec<Reply> {
        let destinations = self.rates.destinations_for(&origin);
        session.origin = Some(origin);
        session.stage = Stage::Destination;
        vec![Reply::with_keyboard(
            messages::ASK_DESTINATION,
            messages::keyboard_rows(&destinations, messages::ROW_WIDTH),
        )]
    }

    fn on_destination(&self, session: &mut Session, destination: String) -> Vec<Reply> {
        session.destination = Some(destination);
        session.stage = Stage::Amount;
        vec![Reply::text(messages::ASK_AMOUNT)]
    }

    fn on_amount(&self, id: SessionId, session: &mut Session, text: &str) -> Vec<Reply> {
        let origin = session.origin.as_deref().unwrap_or_default();
        let destination = session.destination.as_deref().unwrap_or_default();

        let result = quote::parse_amount(text).and_then(|amount| {
            quote::compute(
                origin,
                destination,
                amount,
                self.rates.as_ref(),
                self.market.as_ref(),
            )
        });

        match result {
            Ok(quote) => {
                info!(
                    "Session {}: quoted {} {} -> {} = {:.2}",
                    id, quote.amount, quote.origin, quote.destination, quote.value
                );
                session.stage = Stage::Final;
                vec![
                    Reply::text(messages::quote_message(
                        quote.amount,
                        &quote.origin,
                        &quote.destination,
                        quote.value,
                    )),
                    Reply::with_keyboard(
                        messages::ASK_NEXT_STEP,
                        vec![vec![
                            messages::CONTINUE_BUTTON.to_string(),
                            messages::RESTART_BUTTON.to_string(),
                        ]],
                    ),
                ]
            }
            Err(err) => {
                match &err {
                    QuoteError::MarketRateUnavailable(_) => warn!("Session {}: {}", id, err),
                    _ => debug!("Session {}: {}", id, err),
                }
                vec![Reply::text(error_message(&err))]
            }
        }
    }
}

/// User-facing text for a recoverable quote failure.
pub fn error_message(err: &QuoteError) -> &'static str {
    match err {
        QuoteError::InvalidAmountFormat(_) => messages::INVALID_AMOUNT,
        QuoteError::MarketRateUnavailable(_) => messages::MARKET_RATE_UNAVAILABLE,
        QuoteError::NoRateForPair { .. } => messages::NO_RATE_FOR_PAIR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{FixedMarketRate, MarketRate, MarketRateError};
    use crate::rate_table::RateEntry;

    const ID: SessionId = SessionId(42);

    struct Unavailable;

    impl MarketRateProvider for Unavailable {
        fn fetch(&self) -> Result<MarketRate, MarketRateError> {
            Err(MarketRateError::Transport("timed out".into()))
        }
    }

    fn entry(origin: &str, destination: &str, commission_percent: f64) -> RateEntry {
        RateEntry {
            origin: origin.into(),
            destination: destination.into(),
            commission_percent,
        }
    }

    fn rates() -> Arc<RateTable> {
        Arc::new(RateTable::from_entries([
            entry("pesos", "usd", 95.0),
            entry("pesos", "usdt", 96.0),
            entry("usd", "pesos", 95.0),
            entry("eur", "usd", 98.0),
            entry("usdt", "usd", 99.0),
        ]))
    }

    fn dialogue() -> Dialogue {
        Dialogue::new(rates(), Arc::new(FixedMarketRate::new(1000.0, 1050.0)))
    }

    fn started(dialogue: &Dialogue) -> Session {
        let mut session = Session::default();
        dialogue.start(ID, &mut session);
        session
    }

    fn at_amount(dialogue: &Dialogue, origin: &str, destination: &str) -> Session {
        let mut session = started(dialogue);
        dialogue.receive(ID, &mut session, origin);
        dialogue.receive(ID, &mut session, destination);
        assert_eq!(session.stage, Stage::Amount);
        session
    }

    #[test]
    fn test_start_offers_all_origins() {
        let dialogue = dialogue();
        let mut session = Session {
            stage: Stage::Amount,
            ..Session::default()
        };
        let replies = dialogue.start(ID, &mut session);
        assert_eq!(session.stage, Stage::Origin);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].text, messages::WELCOME);
        assert_eq!(replies[0].choices(), dialogue.rates().distinct_origins());
        assert_eq!(
            replies[0].keyboard.as_ref().map(|k| k.len()),
            Some(2),
            "four origins fill two rows of three"
        );
    }

    #[test]
    fn test_origin_offers_its_destinations() {
        let dialogue = dialogue();
        let mut session = started(&dialogue);
        let replies = dialogue.receive(ID, &mut session, "  PESOS ");
        assert_eq!(session.stage, Stage::Destination);
        assert_eq!(session.origin.as_deref(), Some("pesos"));
        assert_eq!(replies[0].text, messages::ASK_DESTINATION);
        assert_eq!(replies[0].choices(), dialogue.rates().destinations_for("pesos"));
    }

    #[test]
    fn test_unknown_origin_offers_empty_keyboard() {
        let dialogue = dialogue();
        let mut session = started(&dialogue);
        let replies = dialogue.receive(ID, &mut session, "btc");
        assert_eq!(session.stage, Stage::Destination);
        assert!(replies[0].choices().is_empty());
    }

    #[test]
    fn test_destination_asks_amount() {
        let dialogue = dialogue();
        let mut session = started(&dialogue);
        dialogue.receive(ID, &mut session, "pesos");
        let replies = dialogue.receive(ID, &mut session, "USD");
        assert_eq!(session.stage, Stage::Amount);
        assert_eq!(session.destination.as_deref(), Some("usd"));
        assert_eq!(replies, vec![Reply::text(messages::ASK_AMOUNT)]);
    }

    #[test]
    fn test_invalid_amount_keeps_stage() {
        let dialogue = dialogue();
        let mut session = at_amount(&dialogue, "pesos", "usd");
        let before = session.clone();
        let replies = dialogue.receive(ID, &mut session, "diez mil");
        assert_eq!(replies, vec![Reply::text(messages::INVALID_AMOUNT)]);
        assert_eq!(session, before);
    }

    #[test]
    fn test_pesos_origin_quote() {
        let dialogue = dialogue();
        let mut session = at_amount(&dialogue, "pesos", "usd");
        let replies = dialogue.receive(ID, &mut session, "10000");
        assert_eq!(session.stage, Stage::Final);
        assert_eq!(replies.len(), 2);
        assert_eq!(
            replies[0].text,
            "El cambio de 10000.0 PESOS a USD es 9975000.00."
        );
        assert_eq!(replies[1].text, messages::ASK_NEXT_STEP);
        assert_eq!(
            replies[1].choices(),
            vec![messages::CONTINUE_BUTTON, messages::RESTART_BUTTON]
        );
    }

    #[test]
    fn test_pesos_destination_quote() {
        let dialogue = dialogue();
        let mut session = at_amount(&dialogue, "usd", "pesos");
        let replies = dialogue.receive(ID, &mut session, "100");
        assert_eq!(replies[0].text, "El cambio de 100.0 USD a PESOS es 95000.00.");
    }

    #[test]
    fn test_missing_pair_keeps_amount_stage() {
        let dialogue = dialogue();
        let mut session = at_amount(&dialogue, "eur", "pesos");
        let replies = dialogue.receive(ID, &mut session, "100");
        assert_eq!(replies, vec![Reply::text(messages::NO_RATE_FOR_PAIR)]);
        assert_eq!(session.stage, Stage::Amount);
    }

    #[test]
    fn test_market_unavailable_keeps_amount_stage() {
        let dialogue = Dialogue::new(rates(), Arc::new(Unavailable));
        let mut session = at_amount(&dialogue, "eur", "usd");
        let replies = dialogue.receive(ID, &mut session, "100");
        assert_eq!(replies, vec![Reply::text(messages::MARKET_RATE_UNAVAILABLE)]);
        assert_eq!(session.stage, Stage::Amount);
    }

    #[test]
    fn test_continue_hands_off_and_loops() {
        let dialogue = dialogue();
        let mut session = at_amount(&dialogue, "eur", "usd");
        dialogue.receive(ID, &mut session, "50");
        let replies = dialogue.receive(ID, &mut session, messages::CONTINUE_BUTTON);
        assert_eq!(replies, vec![Reply::text(messages::HAND_OFF)]);
        assert_eq!(session.stage, Stage::Origin);
        assert_eq!(session.origin.as_deref(), Some("eur"));
    }

    #[test]
    fn test_restart_is_idempotent() {
        let dialogue = dialogue();
        let mut session = at_amount(&dialogue, "usdt", "usd");
        dialogue.receive(ID, &mut session, "1");
        assert_eq!(session.stage, Stage::Final);

        let first = dialogue.receive(ID, &mut session, "Realizar otra consulta");
        assert_eq!(session.stage, Stage::Origin);

        session.stage = Stage::Final;
        session.origin = Some("pesos".into());
        let second = dialogue.receive(ID, &mut session, "realizar otra consulta");
        assert_eq!(session.stage, Stage::Origin);
        assert_eq!(first, second);
        assert_eq!(first[0].choices(), dialogue.rates().distinct_origins());
    }

    #[test]
    fn test_unrecognized_final_input_is_ignored() {
        let dialogue = dialogue();
        let mut session = at_amount(&dialogue, "eur", "usd");
        dialogue.receive(ID, &mut session, "10");
        let before = session.clone();
        assert!(dialogue.receive(ID, &mut session, "hola").is_empty());
        assert_eq!(session, before);
    }

    #[test]
    fn test_dispatch_creates_session_on_first_text() {
        let dialogue = dialogue();
        let mut slot = None;
        let replies = dialogue.dispatch(ID, &mut slot, Event::Text("pesos".into()));
        assert_eq!(replies[0].text, messages::WELCOME);
        assert_eq!(slot.map(|s| s.stage), Some(Stage::Origin));
    }

    #[test]
    fn test_dispatch_start_restarts_existing_session() {
        let dialogue = dialogue();
        let mut slot = Some(at_amount(&dialogue, "eur", "usd"));
        dialogue.dispatch(ID, &mut slot, Event::Start);
        assert_eq!(slot.as_ref().map(|s| s.stage), Some(Stage::Origin));
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Final.to_string(), "final");
        assert_eq!("amount".parse::<Stage>().ok(), Some(Stage::Amount));
    }
}
