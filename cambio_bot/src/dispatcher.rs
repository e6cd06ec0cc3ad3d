//! Routes inbound messages to per-session worker threads.
//!
//! Each live session gets a dedicated worker that owns its `Session` and consumes
//! that session's events from a channel, so a session's messages are processed in
//! the order received while different sessions run concurrently. A worker stops
//! when it is evicted for inactivity (`stop` signal) or when the dispatcher shuts
//! down (events channel closed, after draining what is already queued).
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use cambio_common::activity::ActivityMonitor;
use cambio_common::dialogue::{Dialogue, Event, Session, SessionId};
use cambio_common::{CambioError, Result, Transport};
use crossbeam_channel::{Receiver, Sender, select, unbounded};
use log::{debug, error, info, warn};

use crate::telegram::Inbound;

/// Worker loop for a single session.
///
/// Handles events from `events_rx` in order, sending every reply through
/// `transport`. Terminates when a stop signal arrives on `stop_rx` or the events
/// channel is closed. A failed send is logged and the session keeps going.
pub fn handle_session(
    dialogue: Dialogue,
    transport: Arc<dyn Transport>,
    id: SessionId,
    events_rx: Receiver<Event>,
    stop_rx: Receiver<()>,
) {
    let mut session: Option<Session> = None;

    loop {
        select! {
            recv(stop_rx) -> _ => break,
            recv(events_rx) -> msg => match msg {
                Ok(event) => {
                    let replies = dialogue.dispatch(id, &mut session, event);
                    if let Err(e) = transport.send_all(id, &replies) {
                        error!("Failed to reply to session {}: {}", id, e);
                    }
                }
                Err(_) => break,
            },
        }
    }
    debug!("Session {} worker stopped", id);
}

struct Worker {
    events: Sender<Event>,
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// Owner of every live session worker.
pub struct Dispatcher {
    dialogue: Dialogue,
    transport: Arc<dyn Transport>,
    activity: Arc<Mutex<ActivityMonitor>>,
    workers: HashMap<SessionId, Worker>,
}

impl Dispatcher {
    /// Dispatcher replying through `transport` and recording activity in `activity`.
    pub fn new(
        dialogue: Dialogue,
        transport: Arc<dyn Transport>,
        activity: Arc<Mutex<ActivityMonitor>>,
    ) -> Self {
        Self {
            dialogue,
            transport,
            activity,
            workers: HashMap::new(),
        }
    }

    fn spawn_worker(&self, id: SessionId) -> Worker {
        let (events, events_rx) = unbounded::<Event>();
        let (stop, stop_rx) = unbounded::<()>();
        let dialogue = self.dialogue.clone();
        let transport = Arc::clone(&self.transport);

        let handle = thread::spawn(move || {
            handle_session(dialogue, transport, id, events_rx, stop_rx);
        });
        info!("A worker has been created for session {}", id);
        Worker {
            events,
            stop,
            handle,
        }
    }

    /// Hand `inbound` to its session's worker, spawning one if needed.
    pub fn route(&mut self, inbound: Inbound) -> Result<()> {
        let Inbound { session: id, event } = inbound;
        self.activity.lock()?.touch(id);

        if !self.workers.contains_key(&id) {
            let worker = self.spawn_worker(id);
            self.workers.insert(id, worker);
        }

        let event = match self.workers.get(&id) {
            Some(worker) => match worker.events.send(event) {
                Ok(()) => return Ok(()),
                Err(returned) => returned.into_inner(),
            },
            None => event,
        };

        warn!("Worker for session {} is gone; starting a new one", id);
        let worker = self.spawn_worker(id);
        let sent = worker.events.send(event);
        self.workers.insert(id, worker);
        sent.map_err(|e| CambioError::ChannelSend(e.to_string()))
    }

    /// Stop and drop the worker of a session reported idle.
    ///
    /// The notice may be stale: a message routed after the timeout check puts the
    /// session back in the activity monitor, and such a session is kept.
    pub fn evict(&mut self, id: SessionId) -> Result<()> {
        if self.activity.lock()?.is_active(id) {
            debug!("Session {} became active again; not evicting", id);
            return Ok(());
        }
        if let Some(worker) = self.workers.remove(&id) {
            let _ = worker.stop.send(());
            info!("Session {} closed: idle timeout", id);
        }
        Ok(())
    }

    /// Number of sessions with a live worker.
    pub fn active_sessions(&self) -> usize {
        self.workers.len()
    }

    /// Close every worker after it has drained its queued events, and wait for them.
    pub fn shutdown(self) {
        info!("Stopping {} session workers", self.workers.len());
        for (id, worker) in self.workers {
            let Worker {
                events,
                stop,
                handle,
            } = worker;
            drop(events);
            if handle.join().is_err() {
                error!("Worker for session {} panicked", id);
            }
            drop(stop);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cambio_common::dialogue::Reply;
    use cambio_common::market::FixedMarketRate;
    use cambio_common::messages;
    use cambio_common::rate_table::{RateEntry, RateTable};
    use std::time::{Duration, Instant};

    struct RecordingTransport {
        sent: Mutex<Vec<(SessionId, Reply)>>,
        delivered_tx: Sender<()>,
        delivered_rx: Receiver<()>,
    }

    impl Default for RecordingTransport {
        fn default() -> Self {
            let (delivered_tx, delivered_rx) = unbounded();
            Self {
                sent: Mutex::new(Vec::new()),
                delivered_tx,
                delivered_rx,
            }
        }
    }

    impl RecordingTransport {
        /// Block until `count` more replies have been sent.
        fn wait_for(&self, count: usize) {
            for _ in 0..count {
                self.delivered_rx
                    .recv_timeout(Duration::from_secs(5))
                    .expect("reply not delivered");
            }
        }

        fn texts_for(&self, id: SessionId) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter(|(session, _)| *session == id)
                .map(|(_, reply)| reply.text.clone())
                .collect()
        }
    }

    impl Transport for RecordingTransport {
        fn send(&self, session: SessionId, reply: &Reply) -> Result<()> {
            self.sent.lock().unwrap().push((session, reply.clone()));
            let _ = self.delivered_tx.send(());
            Ok(())
        }
    }

    fn dispatcher(
        transport: Arc<RecordingTransport>,
    ) -> (Dispatcher, Arc<Mutex<ActivityMonitor>>) {
        let rates = RateTable::from_entries([
            RateEntry {
                origin: "pesos".into(),
                destination: "usd".into(),
                commission_percent: 95.0,
            },
            RateEntry {
                origin: "usd".into(),
                destination: "pesos".into(),
                commission_percent: 95.0,
            },
        ]);
        let dialogue = Dialogue::new(
            Arc::new(rates),
            Arc::new(FixedMarketRate::new(1000.0, 1050.0)),
        );
        let activity = Arc::new(Mutex::new(ActivityMonitor::new(Duration::from_secs(60))));
        let dispatcher = Dispatcher::new(dialogue, transport, Arc::clone(&activity));
        (dispatcher, activity)
    }

    fn inbound(id: i64, event: Event) -> Inbound {
        Inbound {
            session: SessionId(id),
            event,
        }
    }

    fn text(id: i64, text: &str) -> Inbound {
        inbound(id, Event::Text(text.into()))
    }

    /// Run the idle check as if the TTL had already elapsed.
    fn expire_all(activity: &Mutex<ActivityMonitor>) -> Vec<SessionId> {
        activity
            .lock()
            .unwrap()
            .check_timeouts_at(Instant::now() + Duration::from_secs(120))
    }

    #[test]
    fn test_sessions_are_processed_in_order() {
        let transport = Arc::new(RecordingTransport::default());
        let (mut dispatcher, activity) = dispatcher(Arc::clone(&transport));

        for msg in [
            inbound(1, Event::Start),
            inbound(2, Event::Start),
            text(1, "pesos"),
            text(2, "usd"),
            text(1, "usd"),
            text(2, "pesos"),
            text(1, "10000"),
            text(2, "100"),
        ] {
            dispatcher.route(msg).unwrap();
        }
        assert_eq!(dispatcher.active_sessions(), 2);
        assert_eq!(activity.lock().unwrap().len(), 2);
        dispatcher.shutdown();

        assert_eq!(
            transport.texts_for(SessionId(1)),
            vec![
                messages::WELCOME.to_string(),
                messages::ASK_DESTINATION.to_string(),
                messages::ASK_AMOUNT.to_string(),
                "El cambio de 10000.0 PESOS a USD es 9975000.00.".to_string(),
                messages::ASK_NEXT_STEP.to_string(),
            ]
        );
        assert_eq!(
            transport.texts_for(SessionId(2))[3],
            "El cambio de 100.0 USD a PESOS es 95000.00."
        );
    }

    #[test]
    fn test_evicted_session_starts_over() {
        let transport = Arc::new(RecordingTransport::default());
        let (mut dispatcher, activity) = dispatcher(Arc::clone(&transport));

        dispatcher.route(inbound(3, Event::Start)).unwrap();
        dispatcher.route(text(3, "pesos")).unwrap();
        transport.wait_for(2);
        assert_eq!(expire_all(&activity), vec![SessionId(3)]);
        dispatcher.evict(SessionId(3)).unwrap();
        assert_eq!(dispatcher.active_sessions(), 0);
        assert!(!activity.lock().unwrap().is_active(SessionId(3)));

        dispatcher.route(text(3, "usd")).unwrap();
        dispatcher.shutdown();

        assert_eq!(
            transport.texts_for(SessionId(3)),
            vec![
                messages::WELCOME.to_string(),
                messages::ASK_DESTINATION.to_string(),
                messages::WELCOME.to_string(),
            ]
        );
    }

    #[test]
    fn test_stale_idle_notice_keeps_session() {
        let transport = Arc::new(RecordingTransport::default());
        let (mut dispatcher, activity) = dispatcher(Arc::clone(&transport));

        dispatcher.route(inbound(4, Event::Start)).unwrap();
        assert_eq!(expire_all(&activity), vec![SessionId(4)]);
        // A message arrives between the idle check and the eviction.
        dispatcher.route(text(4, "pesos")).unwrap();
        dispatcher.evict(SessionId(4)).unwrap();

        assert_eq!(dispatcher.active_sessions(), 1);
        assert!(activity.lock().unwrap().is_active(SessionId(4)));

        dispatcher.route(text(4, "usd")).unwrap();
        dispatcher.shutdown();
        assert_eq!(
            transport.texts_for(SessionId(4)),
            vec![
                messages::WELCOME.to_string(),
                messages::ASK_DESTINATION.to_string(),
                messages::ASK_AMOUNT.to_string(),
            ]
        );
    }
}
