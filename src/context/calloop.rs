//! A [`DispatchContext`] backed by a `calloop` event loop.
//!
//! Shaped after `cosmic_config::calloop::ConfigWatchSource`, which
//! forwards filesystem-watcher events into a calloop channel event
//! source; here the same channel-plus-`EventSource` shape forwards
//! arbitrary dispatcher closures instead.

use calloop::channel::{self, Sender};

use crate::context::DispatchContext;

/// Hands closures posted via [`DispatchContext::post`] to whichever
/// calloop loop owns the paired [`CalloopDispatchSource`].
pub struct CalloopContext {
    sender: Sender<Box<dyn FnOnce() + Send>>,
}

impl CalloopContext {
    /// Build a context and the event source it feeds. Insert the
    /// source into the target calloop `EventLoop` before handing the
    /// context to `watch`.
    pub fn new() -> (Self, CalloopDispatchSource) {
        let (sender, channel) = channel::sync_channel(32);
        (Self { sender }, CalloopDispatchSource { channel })
    }
}

impl DispatchContext for CalloopContext {
    fn post(&self, job: Box<dyn FnOnce() + Send>) {
        if self.sender.send(job).is_err() {
            tracing::warn!("calloop dispatch context's event loop is gone, dropping callback");
        }
    }
}

/// The calloop-side half of a [`CalloopContext`]: register this with
/// an `EventLoop` and its handler will run each posted closure on the
/// loop's thread.
pub struct CalloopDispatchSource {
    channel: channel::Channel<Box<dyn FnOnce() + Send>>,
}

impl calloop::EventSource for CalloopDispatchSource {
    type Event = ();
    type Metadata = ();
    type Ret = ();
    type Error = calloop::channel::ChannelError;

    fn process_events<F>(
        &mut self,
        readiness: calloop::Readiness,
        token: calloop::Token,
        mut cb: F,
    ) -> Result<calloop::PostAction, Self::Error>
    where
        F: FnMut(Self::Event, &mut Self::Metadata) -> Self::Ret,
    {
        self.channel.process_events(readiness, token, |event, ()| match event {
            channel::Event::Msg(job) => {
                job();
                cb((), &mut ());
            }
            channel::Event::Closed => {}
        })
    }

    fn register(
        &mut self,
        poll: &mut calloop::Poll,
        token_factory: &mut calloop::TokenFactory,
    ) -> Result<(), calloop::Error> {
        self.channel.register(poll, token_factory)
    }

    fn reregister(
        &mut self,
        poll: &mut calloop::Poll,
        token_factory: &mut calloop::TokenFactory,
    ) -> Result<(), calloop::Error> {
        self.channel.reregister(poll, token_factory)
    }

    fn unregister(&mut self, poll: &mut calloop::Poll) -> Result<(), calloop::Error> {
        self.channel.unregister(poll)
    }
}
