/*
 * Two-phase delivery of native messages to the embedding application. Until
 * the application installs its handler, every message is buffered; the
 * moment the handler is installed, the buffer is replayed in arrival order
 * and cleared, and every later message is forwarded immediately. Once the
 * dispatcher is closed, messages are dropped outright.
 *
 * The handler runs synchronously on the calling thread and may re-enter the
 * dispatcher (a handler is free to trigger work that produces new messages),
 * so no borrow is held while it executes.
 */
use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub(crate) struct MessageDispatcher<M> {
    handler: RefCell<Option<Rc<dyn Fn(&mut M)>>>,
    pending: RefCell<Vec<M>>,
    closed: Cell<bool>,
}

impl<M> MessageDispatcher<M> {
    pub(crate) fn new() -> Self {
        Self {
            handler: RefCell::new(None),
            pending: RefCell::new(Vec::new()),
            closed: Cell::new(false),
        }
    }

    /// Installs the handler and replays everything buffered so far, in the
    /// original arrival order. Returns false (and changes nothing) when a
    /// handler is already installed or the dispatcher has been closed.
    pub(crate) fn initialize(&self, handler: Rc<dyn Fn(&mut M)>) -> bool {
        if self.closed.get() {
            return false;
        }
        {
            let mut slot = self.handler.borrow_mut();
            if slot.is_some() {
                return false;
            }
            *slot = Some(handler);
        }

        let buffered = std::mem::take(&mut *self.pending.borrow_mut());
        for mut message in buffered {
            self.forward(&mut message);
        }
        true
    }

    /// Drops the handler and stops buffering; later messages are discarded.
    pub(crate) fn close(&self) {
        self.closed.set(true);
        *self.handler.borrow_mut() = None;
        self.pending.borrow_mut().clear();
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.handler.borrow().is_some()
    }

    /// Buffers `message` when no handler is installed yet and returns None;
    /// otherwise forwards it and hands it back so the caller can inspect
    /// what the handler did to it. Closed dispatchers swallow the message.
    pub(crate) fn dispatch(&self, message: M) -> Option<M> {
        if self.closed.get() {
            return None;
        }
        if !self.is_initialized() {
            self.pending.borrow_mut().push(message);
            return None;
        }
        let mut message = message;
        self.forward(&mut message);
        Some(message)
    }

    fn forward(&self, message: &mut M) {
        // Clone the handler out so it runs without any borrow held; it may
        // re-enter dispatch().
        let handler = self.handler.borrow().clone();
        if let Some(handler) = handler {
            handler(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct TestMessage {
        payload: u32,
        handled: bool,
    }

    fn message(payload: u32) -> TestMessage {
        TestMessage {
            payload,
            handled: false,
        }
    }

    #[test]
    fn messages_before_initialize_are_replayed_in_order_exactly_once() {
        // Arrange
        let dispatcher = MessageDispatcher::new();
        assert!(dispatcher.dispatch(message(1)).is_none());
        assert!(dispatcher.dispatch(message(2)).is_none());
        assert!(dispatcher.dispatch(message(3)).is_none());

        // Act
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        assert!(dispatcher.initialize(Rc::new(move |m: &mut TestMessage| {
            sink.borrow_mut().push(m.payload);
        })));

        // Assert
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);

        // A later message is forwarded immediately and the buffer is not
        // replayed again.
        assert!(dispatcher.dispatch(message(4)).is_some());
        assert_eq!(*seen.borrow(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn initialize_installs_the_handler_only_once() {
        let dispatcher: MessageDispatcher<TestMessage> = MessageDispatcher::new();
        let first = Rc::new(RefCell::new(0u32));
        let second = Rc::new(RefCell::new(0u32));

        let sink = Rc::clone(&first);
        assert!(dispatcher.initialize(Rc::new(move |_| *sink.borrow_mut() += 1)));
        let sink = Rc::clone(&second);
        assert!(!dispatcher.initialize(Rc::new(move |_| *sink.borrow_mut() += 1)));

        dispatcher.dispatch(message(1));
        assert_eq!(*first.borrow(), 1);
        assert_eq!(*second.borrow(), 0);
    }

    #[test]
    fn handler_mutations_are_visible_to_the_caller() {
        let dispatcher = MessageDispatcher::new();
        dispatcher.initialize(Rc::new(|m: &mut TestMessage| {
            if m.payload == 7 {
                m.handled = true;
            }
        }));

        let forwarded = dispatcher.dispatch(message(7)).expect("forwarded");
        assert!(forwarded.handled);
        let forwarded = dispatcher.dispatch(message(8)).expect("forwarded");
        assert!(!forwarded.handled);
    }

    #[test]
    fn handler_may_reenter_the_dispatcher() {
        let dispatcher = Rc::new(MessageDispatcher::new());
        let seen = Rc::new(RefCell::new(Vec::new()));

        let inner_dispatcher = Rc::clone(&dispatcher);
        let sink = Rc::clone(&seen);
        dispatcher.initialize(Rc::new(move |m: &mut TestMessage| {
            sink.borrow_mut().push(m.payload);
            if m.payload == 1 {
                // Re-entrant dispatch from inside the handler.
                inner_dispatcher.dispatch(message(2));
            }
        }));

        dispatcher.dispatch(message(1));
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn close_stops_forwarding_and_buffering() {
        let dispatcher = MessageDispatcher::new();
        let seen = Rc::new(RefCell::new(0u32));
        let sink = Rc::clone(&seen);
        dispatcher.initialize(Rc::new(move |_: &mut TestMessage| {
            *sink.borrow_mut() += 1
        }));

        dispatcher.close();
        assert!(!dispatcher.is_initialized());
        assert!(dispatcher.dispatch(message(1)).is_none());
        assert_eq!(*seen.borrow(), 0);

        // A closed dispatcher refuses re-initialization.
        assert!(!dispatcher.initialize(Rc::new(|_| {})));
    }
}
