//! Fan-in of the results of concurrently fetched months.
//!
//! [`Collector::start`] spawns a listener before any producer exists, so nothing reported
//! early can get lost. Every producer gets a [`Reporter`] for its month which reports
//! exactly once: either the batch or the error handed to [`Reporter::accept`], or, when it
//! is dropped without reporting, an [`Error::Abandoned`] failure. The listener stops once
//! the last reporter is gone, which makes [`Collector::finalize`] wait for every producer.

use tokio::{
    sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};

use crate::{
    error::{Error, Result, WindowFailure},
    window::MonthKey,
};

enum Message<T> {
    Batch(Vec<T>),
    Failure(WindowFailure),
}

/// Everything reported by the producers of one fan-in.
#[derive(Debug)]
pub struct Collected<T> {
    /// All successful batches, in the order they arrived.
    pub items: Vec<T>,
    pub failures: Vec<WindowFailure>,
}

impl<T> Default for Collected<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            failures: Vec::new(),
        }
    }
}

pub struct Collector<T> {
    listener: JoinHandle<Collected<T>>,
}

impl<T: Send + 'static> Collector<T> {
    /// Start listening. Must be called within a tokio runtime.
    pub fn start() -> (Self, CollectorHandle<T>) {
        let (sender, receiver) = unbounded_channel();
        let listener = tokio::spawn(listen(receiver));
        (Self { listener }, CollectorHandle { sender })
    }

    /// Wait until every handle and reporter is dropped and hand out what was collected.
    pub async fn finalize(self) -> Result<Collected<T>> {
        Ok(self.listener.await?)
    }
}

async fn listen<T>(mut receiver: UnboundedReceiver<Message<T>>) -> Collected<T> {
    let mut collected = Collected::default();
    while let Some(message) = receiver.recv().await {
        match message {
            Message::Batch(items) => collected.items.extend(items),
            Message::Failure(failure) => collected.failures.push(failure),
        }
    }
    collected
}

/// Hands out reporters. The collector keeps listening as long as a handle is alive.
pub struct CollectorHandle<T> {
    sender: UnboundedSender<Message<T>>,
}

impl<T> Clone for CollectorHandle<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T> CollectorHandle<T> {
    pub fn reporter(&self, window: MonthKey) -> Reporter<T> {
        Reporter {
            window,
            sender: Some(self.sender.clone()),
        }
    }

    /// Report the outcome of `window` right away. Never blocks.
    pub fn accept(&self, window: MonthKey, result: Result<Vec<T>>) {
        self.reporter(window).accept(result);
    }
}

/// Reports the outcome of a single month.
pub struct Reporter<T> {
    window: MonthKey,
    sender: Option<UnboundedSender<Message<T>>>,
}

impl<T> Reporter<T> {
    pub fn accept(mut self, result: Result<Vec<T>>) {
        let message = match result {
            Ok(items) => Message::Batch(items),
            Err(error) => Message::Failure(WindowFailure {
                window: self.window,
                error,
            }),
        };
        self.send(message);
    }

    fn send(&mut self, message: Message<T>) {
        if let Some(sender) = self.sender.take() {
            // The listener outlives every sender, so this can't fail.
            let _ = sender.send(message);
        }
    }
}

impl<T> Drop for Reporter<T> {
    fn drop(&mut self) {
        let window = self.window;
        self.send(Message::Failure(WindowFailure {
            window,
            error: Error::Abandoned,
        }));
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn month(month: u32) -> MonthKey {
        MonthKey::new(2016, month).unwrap()
    }

    #[tokio::test]
    async fn test_collects_batches_and_failures() {
        let (collector, handle) = Collector::start();
        handle.accept(month(1), Ok(vec![1, 2]));
        handle
            .reporter(month(2))
            .accept(Err(Error::Parse(String::from("broken"))));
        handle.accept(month(3), Ok(vec![3]));
        drop(handle);
        let collected = collector.finalize().await.unwrap();
        assert_eq!(collected.items, vec![1, 2, 3]);
        assert_eq!(collected.failures.len(), 1);
        assert_eq!(collected.failures[0].window, month(2));
    }

    #[tokio::test]
    async fn test_finalize_waits_for_slow_reporters() {
        let (collector, handle) = Collector::start();
        for index in 1..=6 {
            let reporter = handle.reporter(month(index));
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(u64::from(index) * 10)).await;
                reporter.accept(Ok(vec![index]));
            });
        }
        drop(handle);
        let mut collected = collector.finalize().await.unwrap();
        collected.items.sort_unstable();
        assert_eq!(collected.items, vec![1, 2, 3, 4, 5, 6]);
        assert!(collected.failures.is_empty());
    }

    #[tokio::test]
    async fn test_dropped_reporter_is_a_failure() {
        let (collector, handle) = Collector::<u32>::start();
        let reporter = handle.reporter(month(4));
        let task = tokio::spawn(async move {
            let _reporter = reporter;
            panic!("the fetch task crashed");
        });
        assert!(task.await.is_err());
        drop(handle);
        let collected = collector.finalize().await.unwrap();
        assert!(collected.items.is_empty());
        assert_eq!(collected.failures.len(), 1);
        assert_eq!(collected.failures[0].window, month(4));
        assert!(matches!(collected.failures[0].error, Error::Abandoned));
    }
}
