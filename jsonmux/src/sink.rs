use std::sync::Mutex;

use futures_core::Stream;
use tokio::sync::Notify;

use crate::error::DemuxError;

#[derive(Debug)]
enum SingleState<T> {
    Pending,
    Resolved(T),
    Failed(DemuxError),
}

/// A per-field rendezvous that resolves to exactly one value.
///
/// Any number of tasks may call [`SingleSink::get`] before or after the
/// sink becomes terminal; all of them observe the same resolution.
#[derive(Debug)]
pub struct SingleSink<T> {
    state: Mutex<SingleState<T>>,
    notify: Notify,
}

impl<T> Default for SingleSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> SingleSink<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SingleState::Pending),
            notify: Notify::new(),
        }
    }

    /// Resolves the sink to `value`.
    ///
    /// # Panics
    /// Panics if the sink is already terminal (resolved or failed) — per
    /// the single-resolution invariant, this indicates a bug in the
    /// caller driving the sink, not a recoverable runtime condition.
    pub fn resolve(&self, value: T) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            assert!(
                matches!(*state, SingleState::Pending),
                "SingleSink::resolve called on an already-terminal sink: {}",
                DemuxError::AlreadyTerminal
            );
            *state = SingleState::Resolved(value);
        }
        self.notify.notify_waiters();
    }

    /// Fails the sink with `error`.
    ///
    /// # Panics
    /// See [`SingleSink::resolve`].
    pub fn fail(&self, error: DemuxError) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            assert!(
                matches!(*state, SingleState::Pending),
                "SingleSink::fail called on an already-terminal sink: {}",
                DemuxError::AlreadyTerminal
            );
            *state = SingleState::Failed(error);
        }
        self.notify.notify_waiters();
    }

    /// Awaits the terminal value. Returns immediately if already terminal.
    pub async fn get(&self) -> Result<T, DemuxError> {
        loop {
            let notified = self.notify.notified();
            {
                let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
                match &*state {
                    SingleState::Resolved(v) => return Ok(v.clone()),
                    SingleState::Failed(e) => return Err(e.clone()),
                    SingleState::Pending => {}
                }
            }
            notified.await;
        }
    }

    /// Non-suspending poll: `None` while still pending.
    #[must_use]
    pub fn try_get(&self) -> Option<Result<T, DemuxError>> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match &*state {
            SingleState::Resolved(v) => Some(Ok(v.clone())),
            SingleState::Failed(e) => Some(Err(e.clone())),
            SingleState::Pending => None,
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(
            *self.state.lock().unwrap_or_else(|e| e.into_inner()),
            SingleState::Pending
        )
    }
}

#[derive(Debug)]
enum Terminal {
    Closed,
    Failed(DemuxError),
}

#[derive(Debug, Default)]
struct StreamState<F> {
    fragments: Vec<F>,
    terminal: Option<Terminal>,
}

/// A per-field rendezvous emitting an ordered, replayable sequence of
/// fragments plus a terminal marker.
///
/// Fragments already pushed are never dropped: a cursor created after the
/// stream closes still replays the full sequence from the start.
#[derive(Debug)]
pub struct StreamSink<F> {
    state: Mutex<StreamState<F>>,
    notify: Notify,
}

impl<F> Default for StreamSink<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Clone> StreamSink<F> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StreamState {
                fragments: Vec::new(),
                terminal: None,
            }),
            notify: Notify::new(),
        }
    }

    /// Appends a fragment and wakes any waiting cursors.
    ///
    /// # Panics
    /// Panics if the stream is already closed or failed.
    pub fn push(&self, fragment: F) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            assert!(
                state.terminal.is_none(),
                "StreamSink::push called on an already-closed stream: {}",
                DemuxError::AlreadyTerminal
            );
            state.fragments.push(fragment);
        }
        self.notify.notify_waiters();
    }

    /// Marks the stream as successfully closed.
    ///
    /// # Panics
    /// See [`StreamSink::push`].
    pub fn close(&self) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            assert!(
                state.terminal.is_none(),
                "StreamSink::close called on an already-terminal stream: {}",
                DemuxError::AlreadyTerminal
            );
            state.terminal = Some(Terminal::Closed);
        }
        self.notify.notify_waiters();
    }

    /// Marks the stream as failed; iterators observe the fragments pushed
    /// so far, then this error.
    ///
    /// # Panics
    /// See [`StreamSink::push`].
    pub fn fail(&self, error: DemuxError) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            assert!(
                state.terminal.is_none(),
                "StreamSink::fail called on an already-terminal stream: {}",
                DemuxError::AlreadyTerminal
            );
            state.terminal = Some(Terminal::Failed(error));
        }
        self.notify.notify_waiters();
    }

    /// Returns a fresh cursor over this stream, starting from the first
    /// fragment regardless of when it attaches.
    #[must_use]
    pub fn iterate(&self) -> StreamCursor<'_, F> {
        StreamCursor {
            sink: self,
            pos: 0,
            done: false,
        }
    }

    /// The same fragments as [`StreamSink::iterate`], as a
    /// `futures_core::Stream` for `while let Some(x) = stream.next().await`
    /// consumption.
    pub fn stream(&self) -> impl Stream<Item = Result<F, DemuxError>> + '_ {
        async_stream::stream! {
            let mut cursor = self.iterate();
            while let Some(item) = cursor.next().await {
                yield item;
            }
        }
    }

    /// Replays fragments from index `from` without suspending: returns
    /// whatever has already been pushed, plus the terminal error if the
    /// stream has already failed. Does not await new fragments.
    #[must_use]
    pub fn replay_from(&self, from: usize) -> (Vec<F>, Option<DemuxError>) {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let fragments = state.fragments.get(from..).map(<[F]>::to_vec).unwrap_or_default();
        let error = match &state.terminal {
            Some(Terminal::Failed(e)) => Some(e.clone()),
            _ => None,
        };
        (fragments, error)
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .terminal
            .is_some()
    }
}

/// A replay cursor over a [`StreamSink`]'s fragments.
pub struct StreamCursor<'a, F> {
    sink: &'a StreamSink<F>,
    pos: usize,
    done: bool,
}

impl<'a, F: Clone> StreamCursor<'a, F> {
    /// Returns the next fragment, awaiting one if the cursor has caught up
    /// to the live tail. Returns `None` once the stream is closed and
    /// fully drained; returns the failure once, then `None` afterward.
    pub async fn next(&mut self) -> Option<Result<F, DemuxError>> {
        if self.done {
            return None;
        }
        loop {
            let notified = self.sink.notify.notified();
            {
                let state = self.sink.state.lock().unwrap_or_else(|e| e.into_inner());
                if self.pos < state.fragments.len() {
                    let fragment = state.fragments[self.pos].clone();
                    self.pos += 1;
                    return Some(Ok(fragment));
                }
                match &state.terminal {
                    None => {}
                    Some(Terminal::Closed) => {
                        self.done = true;
                        return None;
                    }
                    Some(Terminal::Failed(e)) => {
                        self.done = true;
                        return Some(Err(e.clone()));
                    }
                }
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn single_sink_resolves_once() {
        let sink: SingleSink<i32> = SingleSink::new();
        sink.resolve(42);
        assert_eq!(sink.get().await.unwrap(), 42);
        assert_eq!(sink.get().await.unwrap(), 42);
    }

    #[tokio::test]
    #[should_panic(expected = "already-terminal")]
    async fn single_sink_double_resolve_panics() {
        let sink: SingleSink<i32> = SingleSink::new();
        sink.resolve(1);
        sink.resolve(2);
    }

    #[tokio::test]
    async fn single_sink_awaiter_unblocks_on_resolve() {
        let sink = std::sync::Arc::new(SingleSink::<i32>::new());
        let waiter = tokio::spawn({
            let sink = sink.clone();
            async move { sink.get().await }
        });
        tokio::task::yield_now().await;
        sink.resolve(7);
        assert_eq!(waiter.await.unwrap().unwrap(), 7);
    }

    #[tokio::test]
    async fn stream_replays_to_late_consumer() {
        let sink: StreamSink<char> = StreamSink::new();
        sink.push('h');
        sink.push('i');
        sink.close();

        let mut cursor = sink.iterate();
        let mut out = String::new();
        while let Some(Ok(c)) = cursor.next().await {
            out.push(c);
        }
        assert_eq!(out, "hi");
    }

    #[tokio::test]
    async fn stream_fails_after_fragments() {
        let sink: StreamSink<char> = StreamSink::new();
        sink.push('h');
        sink.fail(DemuxError::ExtraneousInput);

        let mut cursor = sink.iterate();
        assert_eq!(cursor.next().await.unwrap().unwrap(), 'h');
        assert!(cursor.next().await.unwrap().is_err());
        assert!(cursor.next().await.is_none());
    }

    #[tokio::test]
    async fn stream_as_futures_stream() {
        use futures_util::StreamExt;

        let sink: StreamSink<char> = StreamSink::new();
        sink.push('o');
        sink.push('k');
        sink.close();

        let collected: Vec<char> = sink.stream().map(|r| r.unwrap()).collect().await;
        assert_eq!(collected, vec!['o', 'k']);
    }

    #[tokio::test]
    async fn replay_from_does_not_suspend() {
        let sink: StreamSink<char> = StreamSink::new();
        sink.push('a');
        sink.push('b');
        let (fragments, error) = sink.replay_from(1);
        assert_eq!(fragments, vec!['b']);
        assert!(error.is_none());
    }
}
