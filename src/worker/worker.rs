use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;
use log::{error, info, warn};

use crate::clock;
use crate::manager::dispatcher::Dispatcher;
use crate::models::message::Request;

/// Handles requests one at a time, in the order they were received.
///
/// `reply` is called with the full payload of every query request and must
/// deliver it before returning.
pub fn spawn_worker_thread<F>(
    receiver: Receiver<Request>,
    dispatcher: Dispatcher,
    mut reply: F,
) -> JoinHandle<()>
where
    F: FnMut(&str) -> anyhow::Result<()> + Send + 'static,
{
    thread::spawn(move || {
        for request in receiver.iter() {
            let verb = request.verb();
            let expects_reply = request.expects_reply();
            let handled = dispatcher.handle(request, clock::now_ms());
            if let Ok(payload) = &handled {
                debug_assert_eq!(payload.is_some(), expects_reply, "reply mismatch for `{}`", verb);
            }
            match handled {
                Ok(Some(payload)) => {
                    if let Err(e) = reply(&payload) {
                        error!("Failed to reply to `{}`: {:#}", verb, e);
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Dropped `{}` request: {}", verb, e),
            }
        }
        info!("Request channel closed, worker exiting.");
    })
}
