use crate::event::{Event, EventDispatcher, EventKind, Handler};
use crate::frame::{decode_message, DecodeError, Decoded, Frame};
use crate::history::FrameHistory;
use log::*;
use std::mem;
use std::sync::Arc;

/// Façade over the frame pipeline: decodes raw wire messages, maintains the
/// latest frame plus a bounded history of previously-latest frames, and
/// notifies subscribers.
///
/// Single-threaded by design: one message is fully decoded and dispatched
/// before the next, and `process_message`/`frame` are expected to run on
/// one logical thread of control.
pub struct Controller {
    dispatcher: EventDispatcher,
    history: FrameHistory,
    latest: Arc<Frame>,
}

impl Controller {
    pub fn new() -> Self {
        Controller {
            dispatcher: EventDispatcher::new(),
            history: FrameHistory::new(),
            latest: Arc::new(Frame::invalid()),
        }
    }

    pub fn subscribe(&mut self, kind: EventKind, handler: Handler) {
        self.dispatcher.subscribe(kind, handler);
    }

    pub fn unsubscribe(&mut self, kind: EventKind, handler: &Handler) {
        self.dispatcher.unsubscribe(kind, handler);
    }

    /// Handles one raw message from the transport.
    ///
    /// Control messages are skipped without touching any state. A decoded
    /// frame becomes the new latest, the previously latest frame moves into
    /// history, and subscribers get one `Frame` notification. Decode
    /// failures leave latest, history, and subscribers untouched and are
    /// returned to the caller.
    pub fn process_message(&mut self, raw: &str) -> Result<(), DecodeError> {
        let frame = match decode_message(raw) {
            Ok(Decoded::Frame(frame)) => Arc::new(frame),
            Ok(Decoded::Skip) => {
                trace!("skipping non-frame message");
                return Ok(());
            }
            Err(error) => {
                warn!("dropping undecodable message: {}", error);
                return Err(error);
            }
        };
        let previous = mem::replace(&mut self.latest, frame.clone());
        // The startup sentinel never enters history; a lookup past the
        // stored count already answers with the same sentinel.
        if previous.is_valid() {
            self.history.push(previous);
        }
        self.dispatcher.publish(&Event::Frame(frame));
        Ok(())
    }

    /// Frame at the given age. Age 0 is the latest frame; older ages walk
    /// the history of previously-latest frames. Never fails: any age
    /// without an entry answers with the invalid sentinel.
    pub fn frame(&self, age: usize) -> Arc<Frame> {
        if age == 0 {
            self.latest.clone()
        } else {
            self.history
                .get(age - 1)
                .unwrap_or_else(|| Arc::new(Frame::invalid()))
        }
    }

    pub fn latest_frame(&self) -> Arc<Frame> {
        self.frame(0)
    }

    // Connection lifecycle republication. The transport collaborator owns
    // the triggering rules and calls these as its socket state changes.

    pub fn on_init(&mut self) {
        self.dispatcher.publish(&Event::Init);
    }

    pub fn on_connected(&mut self) {
        info!("device transport connected");
        self.dispatcher.publish(&Event::Connected);
    }

    pub fn on_disconnected(&mut self) {
        info!("device transport disconnected");
        self.dispatcher.publish(&Event::Disconnected);
    }

    pub fn on_exit(&mut self) {
        self.dispatcher.publish(&Event::Exit);
    }
}

impl Default for Controller {
    fn default() -> Self {
        Controller::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn frame_message(id: i64) -> String {
        format!(
            r#"{{"id": {}, "timestamp": {}, "hands": [], "pointables": [], "gestures": []}}"#,
            id,
            id * 1000
        )
    }

    #[test]
    fn test_skip_changes_nothing() {
        let mut controller = Controller::new();
        let published = Arc::new(AtomicUsize::new(0));
        {
            let published = published.clone();
            controller.subscribe(
                EventKind::Frame,
                Arc::new(move |_event: &Event| {
                    published.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }
        controller.process_message(&frame_message(1)).unwrap();
        controller
            .process_message(r#"{"version": 6, "serviceVersion": "2.3.1"}"#)
            .unwrap();
        assert_eq!(controller.frame(0).id, 1);
        assert!(!controller.frame(1).is_valid());
        assert_eq!(published.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_latest_and_history_walk() {
        let mut controller = Controller::new();
        for id in 1..=3 {
            controller.process_message(&frame_message(id)).unwrap();
        }
        assert_eq!(controller.frame(0).id, 3);
        assert_eq!(controller.frame(1).id, 2);
        assert_eq!(controller.frame(2).id, 1);
        assert_eq!(controller.latest_frame().id, 3);
    }

    #[test]
    fn test_query_beyond_history_returns_sentinel() {
        let mut controller = Controller::new();
        for id in 1..=3 {
            controller.process_message(&frame_message(id)).unwrap();
        }
        let missing = controller.frame(10);
        assert!(!missing.is_valid());
        assert_eq!(missing.id, 0);
        assert!(missing.hands.is_empty());
    }

    #[test]
    fn test_history_bound() {
        let mut controller = Controller::new();
        for id in 1..=70 {
            controller.process_message(&frame_message(id)).unwrap();
        }
        // latest plus 60 previously-latest frames are addressable
        assert_eq!(controller.frame(0).id, 70);
        assert_eq!(controller.frame(60).id, 10);
        assert!(!controller.frame(61).is_valid());
    }

    #[test]
    fn test_decode_failure_leaves_state_unchanged() {
        let mut controller = Controller::new();
        let published = Arc::new(AtomicUsize::new(0));
        {
            let published = published.clone();
            controller.subscribe(
                EventKind::Frame,
                Arc::new(move |_event: &Event| {
                    published.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }
        controller.process_message(&frame_message(1)).unwrap();
        let bad_gesture = r#"{"id": 2, "timestamp": 2000,
            "gestures": [
                {"id": 1, "type": "circle", "state": "update", "duration": 0},
                {"id": 2, "type": "unknown", "state": "update", "duration": 0}]}"#;
        assert!(controller.process_message(bad_gesture).is_err());
        assert!(controller.process_message("{garbage").is_err());
        assert_eq!(controller.frame(0).id, 1);
        assert!(!controller.frame(1).is_valid());
        assert_eq!(published.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_frame_notification_carries_latest() {
        let mut controller = Controller::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = seen.clone();
            controller.subscribe(
                EventKind::Frame,
                Arc::new(move |event: &Event| {
                    let frame = event.frame().expect("frame event without frame");
                    seen.lock().unwrap().push(frame.id);
                }),
            );
        }
        controller.process_message(&frame_message(5)).unwrap();
        controller.process_message(&frame_message(6)).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![5, 6]);
    }

    #[test]
    fn test_lifecycle_events() {
        let mut controller = Controller::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for kind in [
            EventKind::Init,
            EventKind::Connected,
            EventKind::Disconnected,
            EventKind::Exit,
        ]
        .iter()
        {
            let seen = seen.clone();
            controller.subscribe(
                *kind,
                Arc::new(move |event: &Event| seen.lock().unwrap().push(event.kind())),
            );
        }
        controller.on_init();
        controller.on_connected();
        controller.on_disconnected();
        controller.on_exit();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                EventKind::Init,
                EventKind::Connected,
                EventKind::Disconnected,
                EventKind::Exit
            ]
        );
    }
}
