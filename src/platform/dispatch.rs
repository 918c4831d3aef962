//! Delivery of window messages to the installed handler.

use super::{MessageHandler, WindowMessage};

use ::std::cell::{Cell, RefCell};
use ::tracing::{trace, warn};

/// Owns a window's [`MessageHandler`] and invokes it for each dispatched
/// message.
///
/// A message may arrive while the handler is still running, when an OS call
/// made by the handler pumps messages itself. The handler cannot be entered
/// twice, so such input is dropped. A device change is remembered instead and
/// delivered once the running handler returns, so no hot-plug is missed.
#[derive(Default)]
pub(crate) struct Dispatcher {
    handler: RefCell<Option<MessageHandler>>,
    device_change_pending: Cell<bool>,
}

impl Dispatcher {
    pub(crate) fn set_handler(&self, handler: MessageHandler) {
        match self.handler.try_borrow_mut() {
            Ok(mut current) => *current = Some(handler),
            Err(_) => warn!("Cannot replace the message handler while it is running"),
        }
    }

    pub(crate) fn dispatch(&self, message: &WindowMessage) {
        trace!(?message, "Dispatch message");
        let Ok(mut handler) = self.handler.try_borrow_mut() else {
            match message {
                WindowMessage::DeviceChange => self.device_change_pending.set(true),
                WindowMessage::Input(_) => warn!(?message, "Dropped re-entrant message"),
            }
            return;
        };
        let Some(handler) = handler.as_mut() else {
            return;
        };

        handler(message);
        while self.device_change_pending.replace(false) {
            trace!("Dispatch deferred device change");
            handler(&WindowMessage::DeviceChange);
        }
    }
}
